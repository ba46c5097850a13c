//! Veno controller implementation.

use std::mem::size_of;
use std::time::Duration;

use crate::congestion_control::{CongestionOps, CA_PRIV_SIZE};
use crate::connection::{AckSample, CaEvent, CaState, TcpSock};

use super::state::VenoState;

/// Fixed-point shift applied to the backlog estimate.
pub const V_PARAM_SHIFT: u32 = 1;

/// Backlog threshold (3 segments, scaled) separating random from congestive loss.
pub const BETA: u32 = 3 << V_PARAM_SHIFT;

const _: () = assert!(size_of::<VenoState>() <= CA_PRIV_SIZE);

/// Veno congestion controller.
#[derive(Debug, Clone, Default)]
pub struct VenoController {
    state: VenoState,
}

impl VenoController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &VenoState {
        &self.state
    }

    /// Whether the last estimate put the path in the non-congestive state.
    pub fn is_non_congestive(&self) -> bool {
        self.state.diff < BETA
    }

    fn update_diff(&mut self, cwnd: u32) {
        let base = self.state.basertt.as_micros() as u64;
        let rtt = (self.state.minrtt.as_micros() as u64).max(1);
        let target = (cwnd as u64 * base) << V_PARAM_SHIFT;
        let target = target / rtt;
        let scaled_cwnd = (cwnd as u64) << V_PARAM_SHIFT;
        self.state.diff = scaled_cwnd.saturating_sub(target).min(u32::MAX as u64) as u32;
    }
}

impl CongestionOps for VenoController {
    fn name(&self) -> &'static str {
        "veno"
    }

    fn private_size(&self) -> usize {
        size_of::<VenoState>()
    }

    fn on_init(&mut self, _tp: &mut TcpSock) {
        self.state.reset();
    }

    fn on_ack_with_rtt(&mut self, _tp: &mut TcpSock, sample: AckSample) {
        if sample.rtt_us < 0 {
            return;
        }

        // Never allow a zero-length RTT.
        let vrtt = Duration::from_micros(sample.rtt_us as u64 + 1);
        self.state.basertt = self.state.basertt.min(vrtt);
        self.state.minrtt = self.state.minrtt.min(vrtt);
        self.state.cntrtt = self.state.cntrtt.saturating_add(1);
    }

    fn on_state_transition(&mut self, _tp: &mut TcpSock, new_state: CaState) {
        if new_state == CaState::Open {
            self.state.enable();
        } else {
            self.state.disable();
        }
    }

    fn on_cwnd_event(&mut self, _tp: &mut TcpSock, event: CaEvent) {
        if matches!(event, CaEvent::CwndRestart | CaEvent::TxStart) {
            self.state.reset();
        }
    }

    fn cong_avoid(&mut self, tp: &mut TcpSock, _ack: u32, acked: u32) {
        if !self.state.doing_veno_now {
            tp.reno_cong_avoid(acked);
            return;
        }

        // Limited by the application, not the window.
        if !tp.is_cwnd_limited() {
            return;
        }

        if self.state.cntrtt <= 2 {
            // Not enough samples for an estimate yet.
            tp.reno_cong_avoid(acked);
        } else {
            self.update_diff(tp.snd_cwnd);

            let mut acked = acked;
            if tp.in_slow_start() {
                acked = tp.slow_start(acked);
            }

            if acked > 0 {
                if self.state.diff < BETA {
                    // Non-congestive: one segment per RTT.
                    let w = tp.snd_cwnd;
                    tp.cong_avoid_ai(w, acked);
                } else if tp.snd_cwnd_cnt >= tp.snd_cwnd {
                    // Congestive: one segment every other RTT.
                    if self.state.inc && tp.snd_cwnd < tp.snd_cwnd_clamp {
                        tp.snd_cwnd += 1;
                        self.state.inc = false;
                    } else {
                        self.state.inc = true;
                    }
                    tp.snd_cwnd_cnt = 0;
                } else {
                    tp.snd_cwnd_cnt = tp.snd_cwnd_cnt.saturating_add(acked);
                }
            }

            tp.snd_cwnd = tp.snd_cwnd.clamp(2, tp.snd_cwnd_clamp.max(2));
        }

        self.state.minrtt = super::state::RTT_UNSET;
    }

    fn ssthresh(&self, tp: &TcpSock) -> u32 {
        if self.state.diff < BETA {
            // Random loss: cut by 1/5.
            ((tp.snd_cwnd as u64 * 4 / 5) as u32).max(2)
        } else {
            (tp.snd_cwnd >> 1).max(2)
        }
    }

    fn undo_cwnd(&self, tp: &TcpSock) -> u32 {
        tp.reno_undo_cwnd()
    }

    fn min_rtt(&self) -> Option<Duration> {
        (self.state.cntrtt > 0).then_some(self.state.basertt)
    }
}
