use crate::compose::{render_outage_section, POWER_SECTION, WATER_SECTION};
use crate::error::FetchError;
use crate::feeds::OutageRecord;
use crate::scheduler::SchedulerControlCommand;
use crate::status::SchedulerStatus;
use miette::{miette, IntoDiagnostic, Result};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};

const NO_WATER_STOPS_REPLY: &str = "\u{1F4A7} No water stoppages scheduled at present. \
    The taps remain reliably operational, as nature intended.";
const NO_POWER_STOPS_REPLY: &str = "\u{1F50C} No electricity interruptions scheduled at \
    present. The grid hums along reliably.";

/// What the chat platform can ask of the core. The platform layer resolves
/// a command word through [`CommandRegistry::lookup`] and calls
/// [`BotCommand::run`]; there is no platform-specific registration here.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum BotCommand {
    /// Trigger today's post immediately without moving the schedule.
    PostNow,
    /// Current and planned water stoppages.
    CheckWater,
    /// Current and planned electricity outages.
    CheckPower,
    /// When the next post will fire.
    NextPost,
    /// Next fire time plus the most recent run outcome.
    Status,
}

impl BotCommand {
    /// Execute against the scheduler's control channel and return the reply
    /// text for the platform layer to send back.
    pub async fn run(
        self,
        sched_send: &mpsc::UnboundedSender<SchedulerControlCommand>,
    ) -> Result<String> {
        match self {
            BotCommand::PostNow => {
                sched_send
                    .send(SchedulerControlCommand::TriggerDailyNow)
                    .into_diagnostic()?;
                Ok("On it. Today's digest is being prepared.".to_string())
            }
            BotCommand::CheckWater => {
                let records = request_outages(sched_send, |return_send| {
                    SchedulerControlCommand::CheckWaterOutages { return_send }
                })
                .await?;
                Ok(render_outage_section(&WATER_SECTION, &records)
                    .unwrap_or_else(|| NO_WATER_STOPS_REPLY.to_string()))
            }
            BotCommand::CheckPower => {
                let records = request_outages(sched_send, |return_send| {
                    SchedulerControlCommand::CheckPowerOutages { return_send }
                })
                .await?;
                Ok(render_outage_section(&POWER_SECTION, &records)
                    .unwrap_or_else(|| NO_POWER_STOPS_REPLY.to_string()))
            }
            BotCommand::NextPost => {
                let status = request_status(sched_send).await?;
                Ok(match status.next_fire_at {
                    Some(at) => format!(
                        "Next post scheduled for: {}",
                        at.format("%Y-%m-%d %H:%M:%S UTC")
                    ),
                    None => "No daily post scheduled".to_string(),
                })
            }
            BotCommand::Status => {
                let status = request_status(sched_send).await?;
                let mut reply = String::from("Daily herald is running.");
                if let Some(at) = status.next_fire_at {
                    reply.push_str(&format!(
                        "\nNext post: {}",
                        at.format("%Y-%m-%d %H:%M UTC")
                    ));
                }
                match status.last_outcome {
                    Some(outcome) => reply.push_str(&format!("\n{}", outcome.describe())),
                    None => reply.push_str("\nNo runs so far today."),
                }
                Ok(reply)
            }
        }
    }
}

async fn request_status(
    sched_send: &mpsc::UnboundedSender<SchedulerControlCommand>,
) -> Result<SchedulerStatus> {
    let (return_send, return_recv) = oneshot::channel();
    sched_send
        .send(SchedulerControlCommand::GetStatus { return_send })
        .map_err(|_| miette!("Could not reach the scheduler"))?;
    return_recv.await.into_diagnostic()
}

async fn request_outages(
    sched_send: &mpsc::UnboundedSender<SchedulerControlCommand>,
    make_command: impl FnOnce(
        oneshot::Sender<Result<Vec<OutageRecord>, FetchError>>,
    ) -> SchedulerControlCommand,
) -> Result<Vec<OutageRecord>> {
    let (return_send, return_recv) = oneshot::channel();
    sched_send
        .send(make_command(return_send))
        .map_err(|_| miette!("Could not reach the scheduler"))?;
    return_recv.await.into_diagnostic()?.into_diagnostic()
}

/// Explicit command-word-to-handler table, built once at startup.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, BotCommand>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let handlers = HashMap::from([
            ("post_now", BotCommand::PostNow),
            ("check_water", BotCommand::CheckWater),
            ("check_power", BotCommand::CheckPower),
            ("next_post", BotCommand::NextPost),
            ("status", BotCommand::Status),
        ]);
        Self { handlers }
    }

    pub fn lookup(&self, name: &str) -> Option<BotCommand> {
        self.handlers.get(name).copied()
    }

    pub fn command_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
