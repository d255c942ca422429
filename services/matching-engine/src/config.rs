//! Engine configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bounded recent-trades history kept per instrument
    pub trade_history: usize,
    /// Maximum levels per side in published depth events; full snapshots
    /// requested directly are never truncated
    pub depth_levels: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trade_history: 1000,
            depth_levels: 50,
        }
    }
}
