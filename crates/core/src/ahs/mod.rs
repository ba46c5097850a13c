//! AHS static-window congestion controller.
//!
//! An enhancement of TCP Veno for links whose losses come from bit errors
//! (e.g. wireless) rather than queue overflow. Instead of shrinking the window
//! on loss, every ACK and every congestion event pins the window to a fixed,
//! large size. RTT is still tracked (minimum and last sample) for diagnostics.
//!
//! ## Fallback
//!
//! The controller carries an `enabled` flag. While it is set, the static
//! window applies; when cleared, `cong_avoid` hands the connection to the
//! baseline algorithm (Veno by default) and returns its result unmodified.
//!
//! Note that every loss-recovery state transition re-asserts `enabled`, and no
//! handler here ever clears it. Only a host override
//! ([`AhsController::set_enabled`]) can reach the fallback path.
//!
//! ## Private state
//!
//! [`AhsState`] plus the embedded baseline state must fit in the per-connection
//! area the host reserves ([`CA_PRIV_SIZE`](crate::congestion_control::CA_PRIV_SIZE));
//! this is checked at compile time for the default baseline.

mod config;
mod controller;
mod state;


pub use config::{AhsConfig, INITIAL_RTT_ESTIMATE, STATIC_WINDOW};
pub use controller::AhsController;
pub use state::AhsState;
