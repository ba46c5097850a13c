use std::time::Duration;

/// RTT placeholder meaning "no sample yet".
pub(crate) const RTT_UNSET: Duration = Duration::from_micros(0x7fff_ffff);

/// Per-connection Veno state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenoState {
    /// Whether Veno's own calculation is active (only in the `Open` state).
    pub doing_veno_now: bool,
    /// RTT samples seen. Saturates.
    pub cntrtt: u16,
    /// Minimum RTT over the current round, reset after each window update.
    pub minrtt: Duration,
    /// Minimum RTT ever observed, the propagation delay estimate.
    pub basertt: Duration,
    /// Toggle that lets the congestive state grow the window every other RTT.
    pub inc: bool,
    /// Backlog estimate scaled by `1 << V_PARAM_SHIFT`.
    pub diff: u32,
}

impl Default for VenoState {
    fn default() -> Self {
        Self {
            doing_veno_now: true,
            cntrtt: 0,
            minrtt: RTT_UNSET,
            basertt: RTT_UNSET,
            inc: true,
            diff: 0,
        }
    }
}

impl VenoState {
    pub(super) fn enable(&mut self) {
        self.doing_veno_now = true;
        self.minrtt = RTT_UNSET;
    }

    pub(super) fn disable(&mut self) {
        self.doing_veno_now = false;
    }

    pub(super) fn reset(&mut self) {
        self.basertt = RTT_UNSET;
        self.inc = true;
        self.enable();
    }
}
