use crate::compose::ContentComposer;
use crate::config::HeraldConfig;
use crate::delivery::DeliveryChannel;
use crate::error::FetchError;
use crate::feeds::OutageRecord;
use crate::scheduler::daily;
use crate::status::{SchedulerStatus, StatusBoard};
use miette::{miette, Result};
use std::sync::Arc;
use tokio::sync::oneshot;
use SchedulerControlCommand::*;

/// Control surface the command layer drives. Queries carry a oneshot for
/// the reply; the manual trigger is fire-and-forget.
#[derive(Debug)]
pub enum SchedulerControlCommand {
    /// Run the compose+deliver path now, out of band. Does not move the
    /// next scheduled fire.
    TriggerDailyNow,
    CheckWaterOutages {
        return_send: oneshot::Sender<Result<Vec<OutageRecord>, FetchError>>,
    },
    CheckPowerOutages {
        return_send: oneshot::Sender<Result<Vec<OutageRecord>, FetchError>>,
    },
    GetStatus {
        return_send: oneshot::Sender<SchedulerStatus>,
    },
}

pub(super) async fn handle(
    command: SchedulerControlCommand,
    composer: Arc<ContentComposer>,
    delivery: Arc<dyn DeliveryChannel>,
    config: Arc<HeraldConfig>,
    status: Arc<StatusBoard>,
) -> Result<()> {
    match command {
        TriggerDailyNow => {
            daily::run(composer, delivery, config, status).await;
            Ok(())
        }
        CheckWaterOutages { return_send } => return_send
            .send(composer.water_outages().await)
            .map_err(|_| miette!("Water outage requester went away")),
        CheckPowerOutages { return_send } => return_send
            .send(composer.power_outages().await)
            .map_err(|_| miette!("Electricity outage requester went away")),
        GetStatus { return_send } => return_send
            .send(status.status().await)
            .map_err(|_| miette!("Status requester went away")),
    }
}
