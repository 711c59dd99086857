//! Content source configuration types.

use super::defaults::{default_boss_id, default_category_id, default_content_timeout_secs};
use serde::{Deserialize, Serialize};

/// Settings for the external boss/question provider.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ContentConfig {
    /// Timeout for content source calls (seconds). Failure or timeout falls
    /// back to the bundled content so game start never blocks.
    #[serde(default = "default_content_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Boss requested for newly created rooms
    #[serde(default = "default_boss_id")]
    pub default_boss_id: String,
    /// Question category requested when the boss does not name one
    #[serde(default = "default_category_id")]
    pub default_category_id: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_content_timeout_secs(),
            default_boss_id: default_boss_id(),
            default_category_id: default_category_id(),
        }
    }
}
