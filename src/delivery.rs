use crate::error::DeliveryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Eq, PartialEq, Hash)]
pub struct ChannelId(pub u64);

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Eq, PartialEq, Hash)]
pub struct MessageId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound side of the chat platform. Implemented by the embedding binary;
/// the scheduler only ever calls `send`.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send(&self, channel_id: ChannelId, text: &str) -> Result<MessageId, DeliveryError>;
}
