//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether scheduled jobs run in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron expression for the expired-collaborator sweep.
    #[serde(default = "default_collaborator_cron")]
    pub collaborator_sweep_cron: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            collaborator_sweep_cron: default_collaborator_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_collaborator_cron() -> String {
    "0 15 * * * *".to_string()
}
