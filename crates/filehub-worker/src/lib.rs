//! Scheduled maintenance for FileHub sharing.
//!
//! This crate provides:
//! - A job executor that dispatches a run to the handler registered for it
//! - A cron scheduler that triggers runs on configured schedules
//! - The cleanup handlers: trash retention sweep and expired grant sweep

pub mod executor;
pub mod jobs;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, JobHandler, JobRun};
pub use scheduler::CronScheduler;
