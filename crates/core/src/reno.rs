//! Reno congestion controller, the host's always-available default.

use crate::congestion_control::CongestionOps;
use crate::connection::TcpSock;

/// Stateless Reno: slow start, additive increase, halve on loss.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenoController;

impl RenoController {
    pub fn new() -> Self {
        Self
    }
}

impl CongestionOps for RenoController {
    fn name(&self) -> &'static str {
        "reno"
    }

    fn private_size(&self) -> usize {
        0
    }

    fn on_init(&mut self, _tp: &mut TcpSock) {}

    fn cong_avoid(&mut self, tp: &mut TcpSock, _ack: u32, acked: u32) {
        tp.reno_cong_avoid(acked);
    }

    fn ssthresh(&self, tp: &TcpSock) -> u32 {
        (tp.snd_cwnd >> 1).max(2)
    }

    fn undo_cwnd(&self, tp: &TcpSock) -> u32 {
        tp.reno_undo_cwnd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(100, 50)]
    #[case(5, 2)]
    #[case(3, 2)]
    #[case(1, 2)]
    fn test_ssthresh_halves_with_floor(#[case] cwnd: u32, #[case] expected: u32) {
        let tp = TcpSock {
            snd_cwnd: cwnd,
            ..TcpSock::new()
        };
        assert_eq!(RenoController::new().ssthresh(&tp), expected);
    }

    #[test]
    fn test_cong_avoid_grows_window() {
        let mut tp = TcpSock {
            max_packets_out: 10,
            ..TcpSock::new()
        };
        let mut reno = RenoController::new();
        reno.on_init(&mut tp);
        reno.cong_avoid(&mut tp, 0, 4);
        assert_eq!(tp.snd_cwnd, 14);
    }
}
