//! Host-side connection fields that congestion control strategies read and mutate.
//!
//! The host transport owns a [`TcpSock`] per connection. Strategies are handed
//! `&mut TcpSock` for the duration of a single handler call and never keep a
//! reference to it afterwards.
//!
//! All window arithmetic here saturates instead of wrapping, so malformed
//! counters from the host can never overflow the window.

use std::fmt;

/// Initial congestion window, in segments.
pub const TCP_INIT_CWND: u32 = 10;

/// Slow start threshold value meaning "not yet set".
pub const TCP_INFINITE_SSTHRESH: u32 = 0x7fff_ffff;

/// Phase of the host's loss-recovery state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaState {
    /// Nothing bad has been observed recently.
    #[default]
    Open,
    /// Duplicate ACKs or SACKs were seen, reordering suspected.
    Disorder,
    /// The window is being reduced due to a congestion notification (ECN or local).
    Cwr,
    /// Fast retransmit in progress.
    Recovery,
    /// A retransmission timeout fired.
    Loss,
}

impl fmt::Display for CaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaState::Open => f.pad("open"),
            CaState::Disorder => f.pad("disorder"),
            CaState::Cwr => f.pad("cwr"),
            CaState::Recovery => f.pad("recovery"),
            CaState::Loss => f.pad("loss"),
        }
    }
}

/// Congestion-relevant events the host reports through `on_cwnd_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaEvent {
    /// First transmission when no packets are in flight.
    TxStart,
    /// Congestion window restart after an idle period.
    CwndRestart,
    /// End of a congestion window reduction.
    CompleteCwr,
    /// Retransmission timeout, the connection enters loss state.
    Loss,
    /// An ECN-capable packet arrived without a CE mark.
    EcnNoCe,
    /// A packet arrived carrying a CE mark.
    EcnIsCe,
}

impl fmt::Display for CaEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaEvent::TxStart => f.pad("tx-start"),
            CaEvent::CwndRestart => f.pad("cwnd-restart"),
            CaEvent::CompleteCwr => f.pad("complete-cwr"),
            CaEvent::Loss => f.pad("loss"),
            CaEvent::EcnNoCe => f.pad("ecn-no-ce"),
            CaEvent::EcnIsCe => f.pad("ecn-is-ce"),
        }
    }
}

/// Per-ACK sample handed to `on_ack_with_rtt`.
///
/// `rtt_us` is signed: zero or a negative value means the ACK carried no usable
/// RTT measurement (e.g. it acknowledged only retransmitted segments).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckSample {
    pub pkts_acked: u32,
    pub rtt_us: i64,
}

impl AckSample {
    pub fn new(pkts_acked: u32, rtt_us: i64) -> Self {
        Self { pkts_acked, rtt_us }
    }

    /// Sample for an ACK that carried no RTT measurement.
    pub fn without_rtt(pkts_acked: u32) -> Self {
        Self {
            pkts_acked,
            rtt_us: -1,
        }
    }
}

/// Window fields of a connection, owned by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSock {
    /// Congestion window, in segments.
    pub snd_cwnd: u32,
    /// Slow start threshold, in segments.
    pub snd_ssthresh: u32,
    /// Linear increase counter.
    pub snd_cwnd_cnt: u32,
    /// Upper bound the window may never exceed.
    pub snd_cwnd_clamp: u32,
    /// Window before the last reduction, consulted on undo.
    pub prior_cwnd: u32,
    /// Largest number of packets in flight during the last window.
    pub max_packets_out: u32,
    /// Whether the sender was limited by cwnd (rather than the application) outside slow start.
    pub is_cwnd_limited: bool,
    /// Current loss-recovery phase.
    pub ca_state: CaState,
}

impl Default for TcpSock {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpSock {
    pub fn new() -> Self {
        Self {
            snd_cwnd: TCP_INIT_CWND,
            snd_ssthresh: TCP_INFINITE_SSTHRESH,
            snd_cwnd_cnt: 0,
            snd_cwnd_clamp: u32::MAX,
            prior_cwnd: 0,
            max_packets_out: 0,
            is_cwnd_limited: false,
            ca_state: CaState::Open,
        }
    }

    pub fn in_slow_start(&self) -> bool {
        self.snd_cwnd < self.snd_ssthresh
    }

    /// Whether window growth is warranted.
    ///
    /// During slow start the window may keep doubling as long as it stays
    /// below twice what was actually put in flight.
    pub fn is_cwnd_limited(&self) -> bool {
        if self.in_slow_start() {
            return self.snd_cwnd < self.max_packets_out.saturating_mul(2);
        }
        self.is_cwnd_limited
    }

    /// Exponential growth capped at `snd_ssthresh`. Returns the acked segments
    /// left over once the threshold is reached.
    pub fn slow_start(&mut self, acked: u32) -> u32 {
        let cwnd = self
            .snd_cwnd
            .saturating_add(acked)
            .min(self.snd_ssthresh);
        let used = cwnd.saturating_sub(self.snd_cwnd);
        self.snd_cwnd = cwnd.min(self.snd_cwnd_clamp);
        acked.saturating_sub(used)
    }

    /// Additive increase: one segment for every `w` segments acknowledged.
    pub fn cong_avoid_ai(&mut self, w: u32, acked: u32) {
        let w = w.max(1);
        if self.snd_cwnd_cnt >= w {
            self.snd_cwnd_cnt = 0;
            self.snd_cwnd = self.snd_cwnd.saturating_add(1);
        }

        self.snd_cwnd_cnt = self.snd_cwnd_cnt.saturating_add(acked);
        if self.snd_cwnd_cnt >= w {
            let delta = self.snd_cwnd_cnt / w;
            self.snd_cwnd_cnt -= delta * w;
            self.snd_cwnd = self.snd_cwnd.saturating_add(delta);
        }
        self.snd_cwnd = self.snd_cwnd.min(self.snd_cwnd_clamp);
    }

    /// Classic Reno growth: slow start, then one segment per RTT.
    pub fn reno_cong_avoid(&mut self, acked: u32) {
        if !self.is_cwnd_limited() {
            return;
        }

        let mut acked = acked;
        if self.in_slow_start() {
            acked = self.slow_start(acked);
            if acked == 0 {
                return;
            }
        }
        let w = self.snd_cwnd;
        self.cong_avoid_ai(w, acked);
    }

    /// Window to restore after a spurious reduction, shared by Reno-like algorithms.
    pub fn reno_undo_cwnd(&self) -> u32 {
        self.snd_cwnd.max(self.prior_cwnd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limited(cwnd: u32, ssthresh: u32) -> TcpSock {
        TcpSock {
            snd_cwnd: cwnd,
            snd_ssthresh: ssthresh,
            max_packets_out: cwnd,
            is_cwnd_limited: true,
            ..TcpSock::new()
        }
    }

    #[test]
    fn test_defaults() {
        let tp = TcpSock::new();
        assert_eq!(tp.snd_cwnd, TCP_INIT_CWND);
        assert_eq!(tp.snd_ssthresh, TCP_INFINITE_SSTHRESH);
        assert_eq!(tp.ca_state, CaState::Open);
        assert!(tp.in_slow_start());
        // Nothing has been sent yet
        assert!(!tp.is_cwnd_limited());
    }

    #[test]
    fn test_slow_start_stops_at_ssthresh() {
        let mut tp = limited(10, 14);
        let leftover = tp.slow_start(6);
        assert_eq!(tp.snd_cwnd, 14);
        assert_eq!(leftover, 2);
    }

    #[test]
    fn test_slow_start_respects_clamp() {
        let mut tp = limited(10, 100);
        tp.snd_cwnd_clamp = 12;
        tp.slow_start(5);
        assert_eq!(tp.snd_cwnd, 12);
    }

    #[test]
    fn test_cong_avoid_ai_one_segment_per_window() {
        let mut tp = limited(10, 5);
        for _ in 0..9 {
            tp.cong_avoid_ai(10, 1);
        }
        assert_eq!(tp.snd_cwnd, 10);
        tp.cong_avoid_ai(10, 1);
        assert_eq!(tp.snd_cwnd, 11);
        assert_eq!(tp.snd_cwnd_cnt, 0);
    }

    #[test]
    fn test_cong_avoid_ai_large_ack_stretch() {
        let mut tp = limited(10, 5);
        tp.cong_avoid_ai(10, 25);
        assert_eq!(tp.snd_cwnd, 12);
        assert_eq!(tp.snd_cwnd_cnt, 5);
    }

    #[test]
    fn test_reno_cong_avoid_requires_cwnd_limited() {
        let mut tp = limited(10, 5);
        tp.is_cwnd_limited = false;
        tp.reno_cong_avoid(100);
        assert_eq!(tp.snd_cwnd, 10);
    }

    #[test]
    fn test_reno_cong_avoid_slow_start_then_linear() {
        let mut tp = limited(10, 12);
        tp.reno_cong_avoid(4);
        // Two segments consumed by slow start, two carried into additive increase
        assert_eq!(tp.snd_cwnd, 12);
        assert_eq!(tp.snd_cwnd_cnt, 2);
    }

    #[test]
    fn test_saturating_arithmetic() {
        let mut tp = limited(u32::MAX - 1, u32::MAX);
        tp.max_packets_out = u32::MAX;
        tp.reno_cong_avoid(u32::MAX);
        assert_eq!(tp.snd_cwnd, u32::MAX);
    }

    #[test]
    fn test_reno_undo_cwnd() {
        let mut tp = limited(5, 5);
        tp.prior_cwnd = 20;
        assert_eq!(tp.reno_undo_cwnd(), 20);
        tp.prior_cwnd = 2;
        assert_eq!(tp.reno_undo_cwnd(), 5);
    }
}
