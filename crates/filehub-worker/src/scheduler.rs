//! Cron scheduler for periodic maintenance tasks.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use filehub_core::config::{TrashConfig, WorkerConfig};
use filehub_core::error::AppError;

use crate::executor::{JobExecutor, JobRun};
use crate::jobs::{CollaboratorSweepHandler, TrashSweepHandler};

/// Cron-based scheduler that runs registered jobs in-process
pub struct CronScheduler {
    scheduler: JobScheduler,
    executor: Arc<JobExecutor>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("job_types", &self.executor.registered_types())
            .finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(executor: Arc<JobExecutor>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler, executor })
    }

    /// Register the trash and collaborator sweeps on their configured schedules
    pub async fn register_default_tasks(
        &self,
        trash: &TrashConfig,
        worker: &WorkerConfig,
    ) -> Result<(), AppError> {
        self.register(TrashSweepHandler::JOB_TYPE, &trash.sweep_cron)
            .await?;
        self.register(CollaboratorSweepHandler::JOB_TYPE, &worker.collaborator_sweep_cron)
            .await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Run `job_type` on the six-field cron `schedule`
    pub async fn register(&self, job_type: &str, schedule: &str) -> Result<(), AppError> {
        if !self.executor.has_handler(job_type) {
            return Err(AppError::configuration(format!(
                "No handler registered for scheduled job '{job_type}'"
            )));
        }

        let executor = Arc::clone(&self.executor);
        let name = job_type.to_string();
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let executor = Arc::clone(&executor);
            let run = JobRun::now(name.clone());
            Box::pin(async move {
                match executor.execute(&run).await {
                    Ok(summary) => {
                        tracing::debug!(run_id = %run.id, job_type = %run.job_type, ?summary, "Job completed");
                    }
                    Err(e) => {
                        tracing::error!(run_id = %run.id, job_type = %run.job_type, error = %e, "Job failed");
                    }
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid schedule '{schedule}' for {job_type}: {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {job_type} schedule: {e}")))?;

        tracing::info!(job_type, schedule, "Registered scheduled job");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}
