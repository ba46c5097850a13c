//! AHS controller implementation.

use std::mem::size_of;
use std::time::Duration;

use crate::congestion_control::{CongestionOps, CA_PRIV_SIZE};
use crate::connection::{AckSample, CaEvent, CaState, TcpSock};
use crate::veno::{VenoController, VenoState};

use super::config::AhsConfig;
use super::state::AhsState;

const _: () = assert!(size_of::<AhsState>() + size_of::<VenoState>() <= CA_PRIV_SIZE);

/// Static-window congestion controller with a baseline fallback.
///
/// The baseline (`B`, Veno by default) is initialized alongside AHS and is fed
/// the same RTT samples, state transitions and events so its estimates are
/// current if the fallback is ever taken. It only gets to write the window
/// through `cong_avoid` while AHS is disabled; everywhere else AHS writes last.
#[derive(Debug, Clone)]
pub struct AhsController<B = VenoController> {
    config: AhsConfig,
    state: AhsState,
    baseline: B,
}

impl Default for AhsController<VenoController> {
    fn default() -> Self {
        Self::new(AhsConfig::default())
    }
}

impl AhsController<VenoController> {
    /// Create an AHS controller falling back to Veno.
    pub fn new(config: AhsConfig) -> Self {
        Self::with_baseline(config, VenoController::new())
    }
}

impl<B: CongestionOps> AhsController<B> {
    /// Create an AHS controller with a custom baseline algorithm.
    pub fn with_baseline(config: AhsConfig, baseline: B) -> Self {
        let state = AhsState::new(config.initial_rtt);
        Self {
            config,
            state,
            baseline,
        }
    }

    pub fn state(&self) -> &AhsState {
        &self.state
    }

    /// Mutable access for hosts that manage the enable or congestion flags themselves.
    pub fn state_mut(&mut self) -> &mut AhsState {
        &mut self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    /// Host override of the static-window mode. The next state transition
    /// re-enables it.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.state.enabled != enabled {
            tracing::debug!(enabled, "AHS override toggled by host");
        }
        self.state.enabled = enabled;
    }

    pub fn baseline(&self) -> &B {
        &self.baseline
    }

    pub fn static_window(&self) -> u32 {
        self.config.static_window
    }
}

impl<B: CongestionOps> CongestionOps for AhsController<B> {
    fn name(&self) -> &'static str {
        "ahs"
    }

    fn private_size(&self) -> usize {
        size_of::<AhsState>() + self.baseline.private_size()
    }

    fn on_init(&mut self, tp: &mut TcpSock) {
        self.baseline.on_init(tp);
        self.state = AhsState::new(self.config.initial_rtt);
        tracing::debug!(
            static_window = self.config.static_window,
            initial_rtt_ms = self.config.initial_rtt.as_millis() as u64,
            "AHS initialized"
        );
    }

    /// Records the RTT sample and pins the window. The window ignores RTT:
    /// the link is assumed lossy, not congested.
    fn on_ack_with_rtt(&mut self, tp: &mut TcpSock, sample: AckSample) {
        self.baseline.on_ack_with_rtt(tp, sample);
        self.state.record_rtt(sample.rtt_us);
        tp.snd_cwnd = self.config.static_window;
        tracing::trace!(
            pkts_acked = sample.pkts_acked,
            rtt_us = sample.rtt_us,
            min_rtt_us = self.state.min_rtt.as_micros() as u64,
            cwnd = tp.snd_cwnd,
            "AHS ack"
        );
    }

    fn on_state_transition(&mut self, tp: &mut TcpSock, new_state: CaState) {
        self.baseline.on_state_transition(tp, new_state);
        // Always on, whatever phase is entered.
        self.state.enabled = true;
        tracing::debug!(%new_state, "AHS state transition");
    }

    fn on_cwnd_event(&mut self, tp: &mut TcpSock, event: CaEvent) {
        self.baseline.on_cwnd_event(tp, event);
        tp.snd_cwnd = self.config.static_window;
        tracing::trace!(%event, cwnd = tp.snd_cwnd, "AHS cwnd event");
    }

    fn cong_avoid(&mut self, tp: &mut TcpSock, ack: u32, acked: u32) {
        if !self.state.enabled {
            self.baseline.cong_avoid(tp, ack, acked);
            tracing::trace!(
                baseline = self.baseline.name(),
                cwnd = tp.snd_cwnd,
                "AHS disabled, delegated congestion avoidance"
            );
            return;
        }

        tp.snd_cwnd = self.config.static_window;
    }

    fn ssthresh(&self, _tp: &TcpSock) -> u32 {
        self.config.static_window
    }

    fn undo_cwnd(&self, _tp: &TcpSock) -> u32 {
        self.config.static_window
    }

    fn min_rtt(&self) -> Option<Duration> {
        Some(self.state.min_rtt)
    }

    fn last_rtt(&self) -> Option<Duration> {
        Some(self.state.last_rtt)
    }
}
