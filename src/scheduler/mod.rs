use crate::compose::ContentComposer;
use crate::config::HeraldConfig;
use crate::delivery::DeliveryChannel;
use crate::status::StatusBoard;
use chrono::Utc;
use miette::{GraphicalReportHandler, IntoDiagnostic, Result};
use std::borrow::Borrow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_graceful_shutdown::SubsystemHandle;

mod controller;
mod daily;
mod util;

pub use controller::SchedulerControlCommand;

/// Long-lived scheduling subsystem: waits for the configured fire instant,
/// runs the compose+deliver cycle once per day, and services control
/// commands concurrently while waiting. On shutdown the pending wait is
/// dropped but in-flight runs are joined, not killed.
pub async fn subsystem_handler(
    config: Arc<HeraldConfig>,
    composer: Arc<ContentComposer>,
    delivery: Arc<dyn DeliveryChannel>,
    status: Arc<StatusBoard>,
    mut sched_recv: mpsc::UnboundedReceiver<SchedulerControlCommand>,
    subsys: SubsystemHandle,
) -> Result<()> {
    log::info!("Setting up scheduler service...");

    let mut next_fire_at = util::next_fire_after(
        Utc::now().with_timezone(&config.schedule.timezone),
        &config.schedule,
    );
    status.set_next_fire(next_fire_at.with_timezone(&Utc)).await;
    log::info!("First daily post scheduled for {next_fire_at}");

    let mut open_tasks = Vec::new();
    let spawn_task = |command: SchedulerControlCommand| {
        let (composer_clone, delivery_clone, config_clone, status_clone) = (
            composer.clone(),
            delivery.clone(),
            config.clone(),
            status.clone(),
        );
        tokio::spawn(async move {
            match controller::handle(
                command,
                composer_clone,
                delivery_clone,
                config_clone,
                status_clone,
            )
            .await
            {
                Ok(_) => {}
                Err(report) => {
                    let handler = GraphicalReportHandler::new();
                    let mut rendered_report = String::new();
                    handler
                        .render_report(&mut rendered_report, report.borrow())
                        .expect("Could not render error");
                    log::error!(
                        "Error in handling SchedulerControlCommand.\n{}",
                        rendered_report
                    );
                }
            }
        })
    };

    // main control loop
    loop {
        let until_fire = (next_fire_at.with_timezone(&Utc) - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        tokio::select! {
            _ = subsys.on_shutdown_requested() => break,
            _ = tokio::time::sleep(until_fire) => {
                log::info!("Fire instant {next_fire_at} reached");
                open_tasks.push(spawn_task(SchedulerControlCommand::TriggerDailyNow));

                // Advance from the fire instant, not the wall clock, so a
                // wake-up a hair early cannot double-fire; a long suspension
                // still lands on the next future occurrence.
                let basis = Utc::now()
                    .with_timezone(&config.schedule.timezone)
                    .max(next_fire_at);
                next_fire_at = util::next_fire_after(basis, &config.schedule);
                status.set_next_fire(next_fire_at.with_timezone(&Utc)).await;
                log::info!("Next daily post scheduled for {next_fire_at}");
            },
            command_opt = sched_recv.recv() => match command_opt {
                Some(command) => open_tasks.push(spawn_task(command)),
                None => subsys.on_shutdown_requested().await,
            },
        }

        // clean open_tasks to prevent memory leakage
        open_tasks.retain(|handle| !handle.is_finished());
    }

    log::info!("Shutting down scheduler service...");

    // process pending control commands; in-flight runs complete undisturbed
    sched_recv.close();
    while let Some(command) = sched_recv.recv().await {
        open_tasks.push(spawn_task(command));
    }

    log::debug!("{} open task(s) in scheduler service", open_tasks.len());
    for handle in open_tasks {
        handle.await.into_diagnostic()?;
    }

    log::info!("Shut down scheduler service");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::tests::{test_config, FixedHistory, FixedOutages, FlakyGeneration};
    use crate::delivery::{ChannelId, MessageId};
    use crate::error::DeliveryError;
    use crate::style::StyleSelector;
    use async_trait::async_trait;
    use tokio::sync::oneshot;
    use tokio_graceful_shutdown::Toplevel;

    struct NullDelivery;

    #[async_trait]
    impl DeliveryChannel for NullDelivery {
        async fn send(&self, _: ChannelId, _: &str) -> Result<MessageId, DeliveryError> {
            Ok(MessageId(1))
        }
    }

    fn test_composer(generation_failures: usize) -> Arc<ContentComposer> {
        Arc::new(ContentComposer::with_feeds(
            &test_config(),
            Arc::new(FixedHistory(Vec::new())),
            Arc::new(FixedOutages(Vec::new())),
            Arc::new(FixedOutages(Vec::new())),
            Arc::new(FlakyGeneration::new(generation_failures, "x")),
            StyleSelector::with_seed(7),
        ))
    }

    async fn query_status(
        sched_send: &mpsc::UnboundedSender<SchedulerControlCommand>,
    ) -> Result<crate::status::SchedulerStatus> {
        let (return_send, return_recv) = oneshot::channel();
        sched_send
            .send(SchedulerControlCommand::GetStatus { return_send })
            .into_diagnostic()?;
        return_recv.await.into_diagnostic()
    }

    #[tokio::test]
    async fn subsystem_answers_status_and_shuts_down() {
        let config = Arc::new(test_config());
        let composer = test_composer(0);
        let status = Arc::new(StatusBoard::default());
        let (sched_send, sched_recv) = mpsc::unbounded_channel();

        Toplevel::new()
            .start("scheduler", {
                let (config, composer, status) = (config.clone(), composer, status.clone());
                move |subsys| {
                    subsystem_handler(
                        config,
                        composer,
                        Arc::new(NullDelivery),
                        status,
                        sched_recv,
                        subsys,
                    )
                }
            })
            .start("probe", move |subsys| async move {
                let reported = query_status(&sched_send).await?;
                assert!(reported.next_fire_at.is_some());
                subsys.request_global_shutdown();
                Ok::<(), miette::Report>(())
            })
            .handle_shutdown_requests(Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_scheduled_run_still_advances_the_fire_time() {
        let config = Arc::new(test_config());
        // Generation never recovers, so the scheduled run exhausts its
        // retries and fails.
        let composer = test_composer(usize::MAX);
        let status = Arc::new(StatusBoard::default());
        let (sched_send, sched_recv) = mpsc::unbounded_channel();

        Toplevel::new()
            .start("scheduler", {
                let (config, composer, status) = (config.clone(), composer, status.clone());
                move |subsys| {
                    subsystem_handler(
                        config,
                        composer,
                        Arc::new(NullDelivery),
                        status,
                        sched_recv,
                        subsys,
                    )
                }
            })
            .start("probe", move |subsys| async move {
                let initial_fire = query_status(&sched_send)
                    .await?
                    .next_fire_at
                    .expect("first fire scheduled");

                // The paused clock fast-forwards through the wait and the
                // generation retry backoff; poll until the run has landed.
                let mut reported = query_status(&sched_send).await?;
                for _ in 0..48 {
                    if reported.last_outcome.is_some() {
                        break;
                    }
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    reported = query_status(&sched_send).await?;
                }

                let outcome = reported.last_outcome.expect("scheduled run finished");
                assert!(!outcome.succeeded);
                assert!(outcome.error_summary.is_some());

                let advanced = reported.next_fire_at.expect("next fire scheduled");
                assert!(advanced > initial_fire);

                subsys.request_global_shutdown();
                Ok::<(), miette::Report>(())
            })
            .handle_shutdown_requests(Duration::from_secs(5))
            .await
            .unwrap();
    }
}
