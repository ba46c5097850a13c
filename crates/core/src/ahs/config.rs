//! AHS configuration and constants.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// RTT assumed for both `min_rtt` and `last_rtt` before any sample arrives.
pub const INITIAL_RTT_ESTIMATE: Duration = Duration::from_secs(1);

/// Window (in segments) AHS forces on the connection.
pub const STATIC_WINDOW: u32 = 65_000;

/// Configuration for the AHS controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AhsConfig {
    /// Window pinned on every ACK and congestion event, also reported as
    /// ssthresh and undo window.
    /// Default: 65000 segments
    pub static_window: u32,
    /// RTT estimate before the first sample.
    /// Default: 1 second
    pub initial_rtt: Duration,
}

impl Default for AhsConfig {
    fn default() -> Self {
        Self {
            static_window: STATIC_WINDOW,
            initial_rtt: INITIAL_RTT_ESTIMATE,
        }
    }
}

impl AhsConfig {
    pub fn new(static_window: u32) -> Self {
        Self {
            static_window,
            ..Self::default()
        }
    }
}
