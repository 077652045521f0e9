//! Trash retention configuration.

use serde::{Deserialize, Serialize};

/// Trash retention and sweep schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashConfig {
    /// Days an item stays in the trash before the sweep purges it.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Cron expression (with seconds) for the expired-trash sweep.
    #[serde(default = "default_sweep_cron")]
    pub sweep_cron: String,
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            sweep_cron: default_sweep_cron(),
        }
    }
}

fn default_retention_days() -> u32 {
    30
}

fn default_sweep_cron() -> String {
    "0 0 3 * * *".to_string()
}
