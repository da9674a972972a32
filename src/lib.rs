//! # DriftKV Client
//!
//! An asynchronous TCP client for the DriftKV text protocol:
//! - `SET key` / `GET key` commands with CRLF-delimited framing
//! - Expiring entries via the `duration:` header
//! - Chunked transfer framing for values larger than 4 KB
//! - Per-call or serialized shared-connection dispatch with deadlines
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Client Facade                           │
//! │                 (connect / set / get / close)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Correlator                              │
//! │        (pending-call table, deadlines, FIFO dispatch)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Encoder   │          │   Session   │
//!   │  (Command)  │          │ (TCP + buf) │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │   Decoder   │
//!                           │ (Response)  │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ClientError, Result};
pub use config::{ClientConfig, ConnectionPolicy};
pub use client::Client;
pub use protocol::{Command, Response, Status};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the DriftKV client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
