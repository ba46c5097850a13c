//! Pluggable congestion control interface.
//!
//! A host transport stack drives a strategy through the fixed set of event
//! handlers in [`CongestionOps`]: connection initialization, ACK processing,
//! loss-recovery state transitions, congestion events and window queries.
//!
//! ## Design
//!
//! Built-in algorithms are dispatched through the [`CongestionController`]
//! enum since all of them are known at compile time; third-party algorithms
//! go through `Box<dyn CongestionOps>` via the
//! [`registry`](crate::registry::CongestionControlRegistry).
//!
//! Every handler receives the host's [`TcpSock`] by mutable reference for the
//! duration of the call only. The host must serialize calls for a single
//! connection, so strategies keep plain (non-atomic) per-connection state.
//!
//! ## Supported Algorithms
//!
//! - **AHS** (default): pins the window to a static size on every ACK and
//!   congestion event, assuming losses on the link are not caused by congestion.
//!   Falls back to Veno when disabled.
//! - **Veno**: delay-based Reno refinement that distinguishes congestive from
//!   random loss by estimating the backlog queued along the path.
//! - **Reno**: the host's classic loss-based algorithm.
//!
//! ## Usage
//!
//! ```
//! use tcp_ahs::congestion_control::{CongestionControlConfig, CongestionOps};
//! use tcp_ahs::connection::{AckSample, TcpSock};
//!
//! let mut tp = TcpSock::new();
//! let mut controller = CongestionControlConfig::default().build();
//! controller.on_init(&mut tp);
//! controller.on_ack_with_rtt(&mut tp, AckSample::new(1, 50_000));
//! assert_eq!(tp.snd_cwnd, 65_000);
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ahs::{AhsConfig, AhsController};
use crate::connection::{AckSample, CaEvent, CaState, TcpSock};
use crate::errors::ConfigError;
use crate::reno::RenoController;
use crate::veno::VenoController;

/// Bytes the host reserves per connection for a strategy's private state.
pub const CA_PRIV_SIZE: usize = 13 * std::mem::size_of::<u64>();

// =============================================================================
// Algorithm Identification
// =============================================================================

/// Identifies a built-in congestion control algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum CongestionControlAlgorithm {
    /// Static window for lossy but uncongested links, with a Veno fallback.
    #[default]
    Ahs,
    /// Delay-based Reno refinement for wireless access networks.
    Veno,
    /// Classic loss-based additive increase / multiplicative decrease.
    Reno,
}

impl CongestionControlAlgorithm {
    /// Name under which the algorithm is registered with the host.
    pub fn name(&self) -> &'static str {
        match self {
            CongestionControlAlgorithm::Ahs => "ahs",
            CongestionControlAlgorithm::Veno => "veno",
            CongestionControlAlgorithm::Reno => "reno",
        }
    }
}

impl fmt::Display for CongestionControlAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for CongestionControlAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ahs" => Ok(CongestionControlAlgorithm::Ahs),
            "veno" => Ok(CongestionControlAlgorithm::Veno),
            "reno" => Ok(CongestionControlAlgorithm::Reno),
            _ => Err(ConfigError::UnknownAlgorithm(s.to_string())),
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Algorithm-agnostic snapshot of a connection's congestion state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CongestionControlStats {
    /// Registered name of the algorithm.
    pub algorithm: &'static str,
    /// Current congestion window (segments).
    pub cwnd: u32,
    /// Current slow start threshold (segments).
    pub ssthresh: u32,
    /// Loss-recovery phase the host is in.
    pub ca_state: CaState,
    /// Minimum RTT observed, if the algorithm tracks one.
    pub min_rtt: Option<Duration>,
    /// Most recent RTT sample, if the algorithm tracks one.
    pub last_rtt: Option<Duration>,
}

// =============================================================================
// Congestion Control Trait
// =============================================================================

/// The callback table a host transport invokes on a per-connection strategy.
///
/// One value of an implementing type exists per connection and owns that
/// connection's private state. Handlers are synchronous, never block and
/// cannot fail.
pub trait CongestionOps: Send {
    /// Name identifying the strategy to the host's registry.
    fn name(&self) -> &'static str;

    /// Size of the private per-connection state, checked against [`CA_PRIV_SIZE`].
    fn private_size(&self) -> usize;

    // =========================================================================
    // Event Handlers
    // =========================================================================

    /// Called once when the connection's congestion state is allocated,
    /// before any other handler.
    fn on_init(&mut self, tp: &mut TcpSock);

    /// Called when new ACKs advance the window.
    fn cong_avoid(&mut self, tp: &mut TcpSock, ack: u32, acked: u32);

    /// Called when an ACK provides timing information.
    fn on_ack_with_rtt(&mut self, _tp: &mut TcpSock, _sample: AckSample) {}

    /// Called before the host's loss-recovery state machine enters `new_state`.
    fn on_state_transition(&mut self, _tp: &mut TcpSock, _new_state: CaState) {}

    /// Called when a congestion-relevant event fires.
    fn on_cwnd_event(&mut self, _tp: &mut TcpSock, _event: CaEvent) {}

    // =========================================================================
    // Window Queries
    // =========================================================================

    /// Slow start threshold to adopt on loss.
    fn ssthresh(&self, tp: &TcpSock) -> u32;

    /// Window to restore after a reduction is judged spurious.
    fn undo_cwnd(&self, tp: &TcpSock) -> u32;

    /// Minimum RTT observed on this connection, if tracked.
    fn min_rtt(&self) -> Option<Duration> {
        None
    }

    /// Last RTT sample observed on this connection, if tracked.
    fn last_rtt(&self) -> Option<Duration> {
        None
    }

    fn stats(&self, tp: &TcpSock) -> CongestionControlStats {
        CongestionControlStats {
            algorithm: self.name(),
            cwnd: tp.snd_cwnd,
            ssthresh: tp.snd_ssthresh,
            ca_state: tp.ca_state,
            min_rtt: self.min_rtt(),
            last_rtt: self.last_rtt(),
        }
    }
}

impl<C: CongestionOps + ?Sized> CongestionOps for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn private_size(&self) -> usize {
        (**self).private_size()
    }

    fn on_init(&mut self, tp: &mut TcpSock) {
        (**self).on_init(tp)
    }

    fn cong_avoid(&mut self, tp: &mut TcpSock, ack: u32, acked: u32) {
        (**self).cong_avoid(tp, ack, acked)
    }

    fn on_ack_with_rtt(&mut self, tp: &mut TcpSock, sample: AckSample) {
        (**self).on_ack_with_rtt(tp, sample)
    }

    fn on_state_transition(&mut self, tp: &mut TcpSock, new_state: CaState) {
        (**self).on_state_transition(tp, new_state)
    }

    fn on_cwnd_event(&mut self, tp: &mut TcpSock, event: CaEvent) {
        (**self).on_cwnd_event(tp, event)
    }

    fn ssthresh(&self, tp: &TcpSock) -> u32 {
        (**self).ssthresh(tp)
    }

    fn undo_cwnd(&self, tp: &TcpSock) -> u32 {
        (**self).undo_cwnd(tp)
    }

    fn min_rtt(&self) -> Option<Duration> {
        (**self).min_rtt()
    }

    fn last_rtt(&self) -> Option<Duration> {
        (**self).last_rtt()
    }

    fn stats(&self, tp: &TcpSock) -> CongestionControlStats {
        (**self).stats(tp)
    }
}

// =============================================================================
// Congestion Controller Enum (Dispatch)
// =============================================================================

/// Congestion controller that dispatches to one of the built-in algorithms.
#[derive(Debug, Clone)]
pub enum CongestionController {
    /// AHS static-window controller.
    Ahs(AhsController),
    /// Veno controller.
    Veno(VenoController),
    /// Reno controller.
    Reno(RenoController),
}

impl CongestionOps for CongestionController {
    fn name(&self) -> &'static str {
        match self {
            Self::Ahs(c) => c.name(),
            Self::Veno(c) => c.name(),
            Self::Reno(c) => c.name(),
        }
    }

    fn private_size(&self) -> usize {
        match self {
            Self::Ahs(c) => c.private_size(),
            Self::Veno(c) => c.private_size(),
            Self::Reno(c) => c.private_size(),
        }
    }

    fn on_init(&mut self, tp: &mut TcpSock) {
        match self {
            Self::Ahs(c) => c.on_init(tp),
            Self::Veno(c) => c.on_init(tp),
            Self::Reno(c) => c.on_init(tp),
        }
    }

    fn cong_avoid(&mut self, tp: &mut TcpSock, ack: u32, acked: u32) {
        match self {
            Self::Ahs(c) => c.cong_avoid(tp, ack, acked),
            Self::Veno(c) => c.cong_avoid(tp, ack, acked),
            Self::Reno(c) => c.cong_avoid(tp, ack, acked),
        }
    }

    fn on_ack_with_rtt(&mut self, tp: &mut TcpSock, sample: AckSample) {
        match self {
            Self::Ahs(c) => c.on_ack_with_rtt(tp, sample),
            Self::Veno(c) => c.on_ack_with_rtt(tp, sample),
            Self::Reno(c) => c.on_ack_with_rtt(tp, sample),
        }
    }

    fn on_state_transition(&mut self, tp: &mut TcpSock, new_state: CaState) {
        match self {
            Self::Ahs(c) => c.on_state_transition(tp, new_state),
            Self::Veno(c) => c.on_state_transition(tp, new_state),
            Self::Reno(c) => c.on_state_transition(tp, new_state),
        }
    }

    fn on_cwnd_event(&mut self, tp: &mut TcpSock, event: CaEvent) {
        match self {
            Self::Ahs(c) => c.on_cwnd_event(tp, event),
            Self::Veno(c) => c.on_cwnd_event(tp, event),
            Self::Reno(c) => c.on_cwnd_event(tp, event),
        }
    }

    fn ssthresh(&self, tp: &TcpSock) -> u32 {
        match self {
            Self::Ahs(c) => c.ssthresh(tp),
            Self::Veno(c) => c.ssthresh(tp),
            Self::Reno(c) => c.ssthresh(tp),
        }
    }

    fn undo_cwnd(&self, tp: &TcpSock) -> u32 {
        match self {
            Self::Ahs(c) => c.undo_cwnd(tp),
            Self::Veno(c) => c.undo_cwnd(tp),
            Self::Reno(c) => c.undo_cwnd(tp),
        }
    }

    fn min_rtt(&self) -> Option<Duration> {
        match self {
            Self::Ahs(c) => c.min_rtt(),
            Self::Veno(c) => c.min_rtt(),
            Self::Reno(c) => c.min_rtt(),
        }
    }

    fn last_rtt(&self) -> Option<Duration> {
        match self {
            Self::Ahs(c) => c.last_rtt(),
            Self::Veno(c) => c.last_rtt(),
            Self::Reno(c) => c.last_rtt(),
        }
    }
}

impl CongestionController {
    pub fn algorithm(&self) -> CongestionControlAlgorithm {
        match self {
            Self::Ahs(_) => CongestionControlAlgorithm::Ahs,
            Self::Veno(_) => CongestionControlAlgorithm::Veno,
            Self::Reno(_) => CongestionControlAlgorithm::Reno,
        }
    }

    /// Get a reference to the inner AHS controller if applicable.
    pub fn as_ahs(&self) -> Option<&AhsController> {
        match self {
            Self::Ahs(c) => Some(c),
            Self::Veno(_) | Self::Reno(_) => None,
        }
    }

    /// Get a mutable reference to the inner AHS controller if applicable.
    pub fn as_ahs_mut(&mut self) -> Option<&mut AhsController> {
        match self {
            Self::Ahs(c) => Some(c),
            Self::Veno(_) | Self::Reno(_) => None,
        }
    }

    /// Get a reference to the inner Veno controller if applicable.
    pub fn as_veno(&self) -> Option<&VenoController> {
        match self {
            Self::Veno(c) => Some(c),
            Self::Ahs(_) | Self::Reno(_) => None,
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for creating congestion controllers.
///
/// ```
/// use std::time::Duration;
/// use tcp_ahs::congestion_control::{CongestionControlAlgorithm, CongestionControlConfig};
///
/// let config = CongestionControlConfig::new(CongestionControlAlgorithm::Ahs)
///     .with_static_window(32_000)
///     .with_initial_rtt(Duration::from_millis(500));
/// let controller = config.build();
/// assert_eq!(controller.algorithm(), CongestionControlAlgorithm::Ahs);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CongestionControlConfig {
    /// Which algorithm to use.
    pub algorithm: CongestionControlAlgorithm,
    /// AHS specific configuration.
    pub ahs: AhsConfig,
}

impl Default for CongestionControlConfig {
    fn default() -> Self {
        Self {
            algorithm: CongestionControlAlgorithm::Ahs,
            ahs: AhsConfig::default(),
        }
    }
}

impl CongestionControlConfig {
    /// Create a new configuration for the specified algorithm with defaults.
    pub fn new(algorithm: CongestionControlAlgorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    /// Create an AHS configuration from an existing `AhsConfig`.
    pub fn from_ahs_config(config: AhsConfig) -> Self {
        Self {
            algorithm: CongestionControlAlgorithm::Ahs,
            ahs: config,
        }
    }

    /// Set the window AHS pins the connection to.
    pub fn with_static_window(mut self, window: u32) -> Self {
        self.ahs.static_window = window;
        self
    }

    /// Set the RTT estimate AHS starts from before any sample arrives.
    pub fn with_initial_rtt(mut self, rtt: Duration) -> Self {
        self.ahs.initial_rtt = rtt;
        self
    }

    /// Build a congestion controller from this configuration.
    pub fn build(&self) -> CongestionController {
        match self.algorithm {
            CongestionControlAlgorithm::Ahs => {
                CongestionController::Ahs(AhsController::new(self.ahs.clone()))
            }
            CongestionControlAlgorithm::Veno => CongestionController::Veno(VenoController::new()),
            CongestionControlAlgorithm::Reno => CongestionController::Reno(RenoController::new()),
        }
    }

    /// Build a boxed controller, as handed out by the registry.
    pub fn build_boxed(&self) -> Box<dyn CongestionOps> {
        Box::new(self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ahs::{INITIAL_RTT_ESTIMATE, STATIC_WINDOW};
    use rstest::rstest;

    #[rstest]
    #[case("ahs", CongestionControlAlgorithm::Ahs)]
    #[case("AHS", CongestionControlAlgorithm::Ahs)]
    #[case(" veno ", CongestionControlAlgorithm::Veno)]
    #[case("Reno", CongestionControlAlgorithm::Reno)]
    fn test_algorithm_from_str(#[case] input: &str, #[case] expected: CongestionControlAlgorithm) {
        assert_eq!(input.parse::<CongestionControlAlgorithm>().unwrap(), expected);
    }

    #[test]
    fn test_algorithm_from_str_unknown() {
        let err = "cubic".parse::<CongestionControlAlgorithm>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAlgorithm(name) if name == "cubic"));
    }

    #[test]
    fn test_algorithm_display_matches_name() {
        for algo in [
            CongestionControlAlgorithm::Ahs,
            CongestionControlAlgorithm::Veno,
            CongestionControlAlgorithm::Reno,
        ] {
            assert_eq!(algo.to_string(), algo.name());
        }
    }

    #[test]
    fn test_default_config_is_ahs() {
        let config = CongestionControlConfig::default();
        assert_eq!(config.algorithm, CongestionControlAlgorithm::Ahs);
        assert_eq!(config.ahs.static_window, STATIC_WINDOW);
        assert_eq!(config.ahs.initial_rtt, INITIAL_RTT_ESTIMATE);
    }

    #[rstest]
    #[case(CongestionControlAlgorithm::Ahs, "ahs")]
    #[case(CongestionControlAlgorithm::Veno, "veno")]
    #[case(CongestionControlAlgorithm::Reno, "reno")]
    fn test_build_dispatches(#[case] algo: CongestionControlAlgorithm, #[case] name: &str) {
        let controller = CongestionControlConfig::new(algo).build();
        assert_eq!(controller.algorithm(), algo);
        assert_eq!(controller.name(), name);
        assert!(controller.private_size() <= CA_PRIV_SIZE);
    }

    #[test]
    fn test_builder_overrides_ahs_settings() {
        let config = CongestionControlConfig::default()
            .with_static_window(1_000)
            .with_initial_rtt(Duration::from_millis(200));
        let mut controller = config.build();
        let mut tp = TcpSock::new();
        controller.on_init(&mut tp);
        controller.on_cwnd_event(&mut tp, CaEvent::Loss);
        assert_eq!(tp.snd_cwnd, 1_000);
        assert_eq!(controller.min_rtt(), Some(Duration::from_millis(200)));
    }

    #[test]
    fn test_boxed_controller_forwards() {
        let mut controller = CongestionControlConfig::default().build_boxed();
        let mut tp = TcpSock::new();
        controller.on_init(&mut tp);
        controller.on_ack_with_rtt(&mut tp, AckSample::new(3, 40_000));

        let stats = controller.stats(&tp);
        assert_eq!(stats.algorithm, "ahs");
        assert_eq!(stats.cwnd, STATIC_WINDOW);
        assert_eq!(stats.last_rtt, Some(Duration::from_millis(40)));
        assert_eq!(stats.min_rtt, Some(Duration::from_millis(40)));
    }

    /// Strategy that reports its own snapshot instead of the default one.
    struct CustomStats;

    impl CongestionOps for CustomStats {
        fn name(&self) -> &'static str {
            "custom-stats"
        }

        fn private_size(&self) -> usize {
            0
        }

        fn on_init(&mut self, _tp: &mut TcpSock) {}

        fn cong_avoid(&mut self, _tp: &mut TcpSock, _ack: u32, _acked: u32) {}

        fn ssthresh(&self, tp: &TcpSock) -> u32 {
            tp.snd_cwnd
        }

        fn undo_cwnd(&self, tp: &TcpSock) -> u32 {
            tp.snd_cwnd
        }

        fn stats(&self, tp: &TcpSock) -> CongestionControlStats {
            CongestionControlStats {
                algorithm: self.name(),
                cwnd: 777,
                ssthresh: tp.snd_ssthresh,
                ca_state: tp.ca_state,
                min_rtt: None,
                last_rtt: None,
            }
        }
    }

    #[test]
    fn test_boxed_controller_forwards_stats_override() {
        let tp = TcpSock::new();
        let direct = CustomStats.stats(&tp);
        let boxed: Box<dyn CongestionOps> = Box::new(CustomStats);
        let via_box = boxed.stats(&tp);
        assert_eq!(direct.cwnd, 777);
        assert_eq!(via_box, direct);
    }

    #[test]
    fn test_as_accessors() {
        let ahs = CongestionControlConfig::new(CongestionControlAlgorithm::Ahs).build();
        assert!(ahs.as_ahs().is_some());
        assert!(ahs.as_veno().is_none());

        let veno = CongestionControlConfig::new(CongestionControlAlgorithm::Veno).build();
        assert!(veno.as_ahs().is_none());
        assert!(veno.as_veno().is_some());
    }
}
