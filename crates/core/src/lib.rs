//! Pluggable congestion control strategies for a TCP-like transport.
//!
//! The centerpiece is [`ahs`], a strategy that assumes losses on the link are
//! caused by bit errors rather than congestion and therefore pins the send
//! window to a static size, falling back to [`veno`] when disabled.

/// AHS static-window congestion control.
pub mod ahs;

/// Congestion control configuration: CLI arguments, config files and logging setup.
pub mod config;

/// The strategy interface, built-in algorithm dispatch and controller configuration.
pub mod congestion_control;

/// Window fields and recovery phases owned by the host connection.
pub mod connection;

pub mod errors;

/// Reference host that drives a strategy through a connection's lifetime.
pub mod host;

/// Name to implementation mapping owned by the host.
pub mod registry;

/// Reno congestion control.
pub mod reno;

/// Tracing and logging infrastructure.
#[cfg_attr(test, allow(dead_code))]
pub mod tracing;

/// Veno congestion control, the baseline AHS falls back to.
pub mod veno;

pub use congestion_control::{
    CongestionControlAlgorithm, CongestionControlConfig, CongestionController, CongestionOps,
};
pub use host::Connection;
pub use registry::CongestionControlRegistry;
