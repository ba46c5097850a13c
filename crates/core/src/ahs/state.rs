//! Per-connection AHS state.

use std::time::Duration;

use super::config::INITIAL_RTT_ESTIMATE;

/// Private AHS data attached to one connection.
///
/// `min_rtt` is a running minimum over every sample seen since init, so
/// `min_rtt <= last_rtt` holds once the first sample arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AhsState {
    /// Whether the static-window override is active.
    pub enabled: bool,
    /// Reserved congestion indicator. No handler reads or writes it; hosts
    /// that classify loss or ECN signals may set it.
    pub congestion_observed: bool,
    /// Smallest RTT observed since init.
    pub min_rtt: Duration,
    /// Most recent valid RTT sample.
    pub last_rtt: Duration,
}

impl Default for AhsState {
    fn default() -> Self {
        Self::new(INITIAL_RTT_ESTIMATE)
    }
}

impl AhsState {
    pub(super) fn new(initial_rtt: Duration) -> Self {
        Self {
            enabled: true,
            congestion_observed: false,
            min_rtt: initial_rtt,
            last_rtt: initial_rtt,
        }
    }

    /// Record an RTT sample. Non-positive samples leave `last_rtt` as is, but
    /// the running minimum is refreshed regardless.
    pub(super) fn record_rtt(&mut self, rtt_us: i64) {
        if rtt_us > 0 {
            self.last_rtt = Duration::from_micros(rtt_us as u64);
        }
        self.min_rtt = self.min_rtt.min(self.last_rtt);
    }
}
