//! Share link configuration.

use serde::{Deserialize, Serialize};

/// Share link behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharingConfig {
    /// Whether collaborators holding the editor role may create share
    /// links on resources they do not own.
    #[serde(default)]
    pub allow_editor_links: bool,
    /// Attempts at generating a unique token before giving up.
    #[serde(default = "default_token_attempts")]
    pub token_attempts: u32,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            allow_editor_links: false,
            token_attempts: default_token_attempts(),
        }
    }
}

fn default_token_attempts() -> u32 {
    3
}
