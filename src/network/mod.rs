//! Network Module
//!
//! Transport session and request correlation.
//!
//! ## Architecture
//! - `Session`: one owned TCP connection plus the decode buffer
//! - `Correlator`: pending-call tracking, deadlines, and dispatch under
//!   the configured connection policy

mod session;
mod correlator;

pub use session::Session;
pub use correlator::{Correlator, PendingCall, PendingTable};
