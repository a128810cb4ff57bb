use crate::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod electricity;
mod history;
mod water;

pub use electricity::ElectricityFeedFetcher;
pub use history::{select_events, EventKind, HistoricalEvent, HistoryFeedFetcher};
pub use water::OutageFeedFetcher;

/// Every feed request carries its own deadline so nothing upstream can park
/// the scheduler indefinitely.
pub(crate) const FEED_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Eq, PartialEq, Hash)]
pub enum OutageKind {
    Current,
    Planned,
}

/// One water or electricity service interruption.
#[derive(Debug, Clone, Deserialize, Serialize, Eq, PartialEq, Hash)]
pub struct OutageRecord {
    pub kind: OutageKind,
    pub area_description: String,
    pub time_window: Option<String>,
}

/// A date-keyed source of historical events. Stateless; caching is layered
/// on top by the composer.
#[async_trait]
pub trait HistoryFeed: Send + Sync {
    async fn fetch(&self, month: u32, day: u32) -> Result<Vec<HistoricalEvent>, FetchError>;
}

/// A source of current/planned outage records. Stateless, like above.
#[async_trait]
pub trait OutageFeed: Send + Sync {
    async fn fetch(&self) -> Result<Vec<OutageRecord>, FetchError>;
}

pub(crate) fn time_window(start: Option<String>, end: Option<String>) -> Option<String> {
    match (start, end) {
        (None, None) => None,
        (start, end) => Some(format!(
            "{} \u{2192} {}",
            start.as_deref().unwrap_or("?"),
            end.as_deref().unwrap_or("?")
        )),
    }
}
