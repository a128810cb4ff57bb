use crate::compose::ContentComposer;
use crate::config::HeraldConfig;
use crate::delivery::{DeliveryChannel, MessageId};
use crate::error::{ComposeError, DeliveryError};
use crate::status::{RunOutcome, StatusBoard};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// One compose+deliver cycle, shared by the scheduled fire and manual
/// triggers. Never propagates an error: the outcome lands on the status
/// board and in the log, and the scheduler loop moves on.
pub(super) async fn run(
    composer: Arc<ContentComposer>,
    delivery: Arc<dyn DeliveryChannel>,
    config: Arc<HeraldConfig>,
    status: Arc<StatusBoard>,
) {
    log::info!("Starting daily history and outage run");
    let outcome = match run_once(&composer, delivery.as_ref(), &config).await {
        Ok(message_id) => {
            log::info!("Daily post delivered as message {message_id}");
            RunOutcome::success()
        }
        Err(err) => {
            log::error!("Daily run failed: {err}");
            RunOutcome::failure(err.to_string())
        }
    };
    status.record_outcome(outcome).await;
}

async fn run_once(
    composer: &ContentComposer,
    delivery: &dyn DeliveryChannel,
    config: &HeraldConfig,
) -> Result<MessageId, RunError> {
    let today = Utc::now()
        .with_timezone(&config.schedule.timezone)
        .date_naive();
    let message = composer.compose(today).await?;
    log::info!("Composed daily message in {} style", message.style.name());
    let message_id = delivery.send(config.channel_id, &message.text).await?;
    Ok(message_id)
}
