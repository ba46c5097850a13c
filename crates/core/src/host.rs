//! Reference host driver.
//!
//! [`Connection`] plays the role of a transport stack's input path: it owns the
//! window fields and one strategy, and invokes the strategy's handlers at the
//! points a TCP sender would. Calls on one `Connection` are serialized by
//! `&mut self`; separate connections share nothing.

use crate::congestion_control::{CongestionControlStats, CongestionOps};
use crate::connection::{AckSample, CaEvent, CaState, TcpSock};
use crate::errors::RegistryError;
use crate::registry::CongestionControlRegistry;

pub struct Connection {
    tp: TcpSock,
    ops: Box<dyn CongestionOps>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("algorithm", &self.ops.name())
            .field("tp", &self.tp)
            .finish()
    }
}

impl Connection {
    /// Attach `ops` to a fresh connection and initialize it.
    pub fn new(ops: Box<dyn CongestionOps>) -> Self {
        Self::with_sock(TcpSock::new(), ops)
    }

    /// Attach `ops` to a connection with pre-set window fields.
    pub fn with_sock(mut tp: TcpSock, mut ops: Box<dyn CongestionOps>) -> Self {
        ops.on_init(&mut tp);
        tracing::debug!(algorithm = ops.name(), cwnd = tp.snd_cwnd, "connection opened");
        Self { tp, ops }
    }

    /// Open a connection using a registered algorithm.
    pub fn from_registry(
        registry: &CongestionControlRegistry,
        name: &str,
    ) -> Result<Self, RegistryError> {
        Ok(Self::new(registry.instantiate(name)?))
    }

    pub fn sock(&self) -> &TcpSock {
        &self.tp
    }

    /// Host-side access to the window fields between handler calls.
    pub fn sock_mut(&mut self) -> &mut TcpSock {
        &mut self.tp
    }

    pub fn ops(&self) -> &dyn CongestionOps {
        self.ops.as_ref()
    }

    pub fn cwnd(&self) -> u32 {
        self.tp.snd_cwnd
    }

    pub fn ssthresh(&self) -> u32 {
        self.tp.snd_ssthresh
    }

    /// New data acknowledged. The RTT sample goes to the strategy first; the
    /// window only grows through `cong_avoid` outside of loss recovery.
    pub fn on_ack(&mut self, ack_seq: u32, acked: u32, rtt_us: i64) {
        self.ops
            .on_ack_with_rtt(&mut self.tp, AckSample::new(acked, rtt_us));
        if self.tp.ca_state == CaState::Open {
            self.ops.cong_avoid(&mut self.tp, ack_seq, acked);
        }
    }

    pub fn set_ca_state(&mut self, new_state: CaState) {
        self.ops.on_state_transition(&mut self.tp, new_state);
        self.tp.ca_state = new_state;
    }

    pub fn cwnd_event(&mut self, event: CaEvent) {
        self.ops.on_cwnd_event(&mut self.tp, event);
    }

    /// Fast retransmit: adopt the strategy's threshold and reduce towards it.
    pub fn enter_recovery(&mut self) {
        self.tp.prior_cwnd = self.tp.snd_cwnd;
        self.tp.snd_ssthresh = self.ops.ssthresh(&self.tp);
        self.tp.snd_cwnd = self.tp.snd_cwnd.min(self.tp.snd_ssthresh);
        self.tp.snd_cwnd_cnt = 0;
        self.set_ca_state(CaState::Recovery);
        tracing::debug!(
            cwnd = self.tp.snd_cwnd,
            ssthresh = self.tp.snd_ssthresh,
            "entered recovery"
        );
    }

    pub fn exit_recovery(&mut self) {
        self.tp.snd_cwnd = self.tp.snd_ssthresh;
        self.set_ca_state(CaState::Open);
    }

    /// Retransmission timeout: the strategy is told about the loss, then the
    /// window collapses to one segment until ACKs arrive again.
    pub fn on_retransmit_timeout(&mut self) {
        self.tp.prior_cwnd = self.tp.snd_cwnd;
        self.tp.snd_ssthresh = self.ops.ssthresh(&self.tp);
        self.ops.on_cwnd_event(&mut self.tp, CaEvent::Loss);
        self.tp.snd_cwnd = 1;
        self.tp.snd_cwnd_cnt = 0;
        self.set_ca_state(CaState::Loss);
        tracing::debug!(ssthresh = self.tp.snd_ssthresh, "retransmission timeout");
    }

    /// The last reduction was spurious: restore what the strategy asks for.
    pub fn undo(&mut self) {
        self.tp.snd_cwnd = self.ops.undo_cwnd(&self.tp);
        self.set_ca_state(CaState::Open);
        tracing::debug!(cwnd = self.tp.snd_cwnd, "cwnd reduction undone");
    }

    pub fn stats(&self) -> CongestionControlStats {
        self.ops.stats(&self.tp)
    }
}
