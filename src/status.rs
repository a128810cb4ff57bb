use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Result of the most recent compose+deliver run. Overwritten each run; only
/// the latest is kept for status queries.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RunOutcome {
    pub timestamp: DateTime<Utc>,
    pub succeeded: bool,
    pub error_summary: Option<String>,
}

impl RunOutcome {
    pub fn success() -> Self {
        Self {
            timestamp: Utc::now(),
            succeeded: true,
            error_summary: None,
        }
    }

    pub fn failure(summary: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            succeeded: false,
            error_summary: Some(summary.into()),
        }
    }

    pub fn describe(&self) -> String {
        match &self.error_summary {
            None => format!("last run at {} went out fine", self.timestamp.format("%Y-%m-%d %H:%M UTC")),
            Some(summary) => format!(
                "last run at {} failed: {summary}",
                self.timestamp.format("%Y-%m-%d %H:%M UTC")
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerStatus {
    pub next_fire_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<RunOutcome>,
}

/// Shared between the scheduler (sole writer) and the command layer
/// (readers). Passed around explicitly; there is no ambient singleton.
#[derive(Debug, Default)]
pub struct StatusBoard {
    inner: RwLock<SchedulerStatus>,
}

impl StatusBoard {
    pub async fn status(&self) -> SchedulerStatus {
        self.inner.read().await.clone()
    }

    pub(crate) async fn set_next_fire(&self, at: DateTime<Utc>) {
        self.inner.write().await.next_fire_at = Some(at);
    }

    pub(crate) async fn record_outcome(&self, outcome: RunOutcome) {
        self.inner.write().await.last_outcome = Some(outcome);
    }
}
