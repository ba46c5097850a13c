//! TCP Veno congestion controller.
//!
//! Based on C. P. Fu, S. C. Liew, "TCP Veno: TCP Enhancement for Transmission
//! over Wireless Access Networks", IEEE JSAC, Feb. 2003.
//!
//! ## Key Concepts
//!
//! Veno keeps Reno's window growth but estimates the backlog `N` queued at the
//! bottleneck from the gap between the expected and actual throughput:
//!
//! ```text
//! N = cwnd * (rtt - base_rtt) / rtt
//! ```
//!
//! | Backlog | Interpretation | Growth | Loss response |
//! |---------|----------------|--------|---------------|
//! | `N < beta` | non-congestive (random loss) | +1 per RTT | cwnd * 4/5 |
//! | `N >= beta` | congestive | +1 every other RTT | cwnd / 2 |
//!
//! Veno only runs while the connection is in the `Open` state; in any other
//! recovery phase, or until enough RTT samples have arrived, it behaves like Reno.

mod controller;
mod state;

pub use controller::{VenoController, BETA, V_PARAM_SHIFT};
pub use state::VenoState;
