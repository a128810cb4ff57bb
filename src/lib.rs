//! Core engine for a bot that posts a daily, timezone-scheduled digest of
//! historical events (run through a text-generation backend in a rotating
//! Victorian voice) and Sofia utility outage notices.
//!
//! The chat platform, the generation backend and process supervision live in
//! the embedding binary; they reach this crate through [`DeliveryChannel`],
//! [`GenerationClient`] and the [`scheduler`] control channel.

pub mod cache;
pub mod commands;
pub mod compose;
pub mod config;
pub mod delivery;
pub mod error;
pub mod feeds;
pub mod scheduler;
pub mod status;
pub mod style;

pub use cache::FreshnessCache;
pub use commands::{BotCommand, CommandRegistry};
pub use compose::{ComposedMessage, ContentComposer, GenerationClient};
pub use config::{HeraldConfig, ScheduleConfig};
pub use delivery::{ChannelId, DeliveryChannel, MessageId};
pub use error::{ComposeError, ConfigError, DeliveryError, FetchError, GenerationError};
pub use feeds::{
    ElectricityFeedFetcher, EventKind, HistoricalEvent, HistoryFeed, HistoryFeedFetcher,
    OutageFeed, OutageFeedFetcher, OutageKind, OutageRecord,
};
pub use scheduler::SchedulerControlCommand;
pub use status::{RunOutcome, SchedulerStatus, StatusBoard};
pub use style::{StylePreset, StyleSelector};
