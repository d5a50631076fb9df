//! Recurring full-catalogue price runs.
//!
//! Each configured cron expression (UTC) triggers [`Orchestrator::run_batch`].
//! The orchestrator's own guard skips a trigger that fires while a previous
//! batch is still running.

use std::sync::Arc;

use lensmatch_pipeline::{BatchSummary, Orchestrator};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

pub struct PriceScheduler {
    scheduler: JobScheduler,
    orchestrator: Arc<Orchestrator>,
}

impl PriceScheduler {
    /// Registers one job per cron expression and starts the scheduler.
    ///
    /// The returned handle must be kept alive for the lifetime of the
    /// process; call [`PriceScheduler::shutdown`] to stop it.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if an expression does not parse or the
    /// scheduler cannot be started.
    pub async fn start(
        orchestrator: Arc<Orchestrator>,
        crons: &[String],
    ) -> Result<Self, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;

        for cron in crons {
            let orchestrator = Arc::clone(&orchestrator);
            let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
                let orchestrator = Arc::clone(&orchestrator);
                Box::pin(async move {
                    tracing::info!("scheduler: starting price batch");
                    if let Some(summary) = orchestrator.run_batch().await {
                        tracing::info!(
                            succeeded = summary.succeeded,
                            failed = summary.failed,
                            "scheduler: price batch finished"
                        );
                    }
                })
            })?;
            scheduler.add(job).await?;
            tracing::info!(cron = %cron, "scheduler: price batch registered");
        }

        scheduler.start().await?;
        Ok(Self {
            scheduler,
            orchestrator,
        })
    }

    /// Runs a batch immediately, outside the cron cadence.
    pub async fn run_now(&self) -> Option<BatchSummary> {
        self.orchestrator.run_batch().await
    }

    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the scheduler fails to stop cleanly.
    pub async fn shutdown(mut self) -> Result<(), JobSchedulerError> {
        self.scheduler.shutdown().await
    }
}
