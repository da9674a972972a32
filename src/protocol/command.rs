//! Command definitions
//!
//! Represents commands sent to the server.

use bytes::Bytes;

/// Command verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Set,
    Get,
}

impl Verb {
    /// Lower-case wire token for the verb
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Set => "set",
            Verb::Get => "get",
        }
    }
}

/// A command to send to the server
///
/// Immutable once constructed. Key validation happens at encode time,
/// before any I/O is attempted.
#[derive(Debug, Clone)]
pub enum Command {
    /// Store a value under a key, with optional expiration in seconds
    Set {
        key: String,
        value: Bytes,
        expire_secs: Option<u64>,
    },

    /// Fetch the value stored under a key
    Get { key: String },
}

impl Command {
    /// Get the command verb
    pub fn verb(&self) -> Verb {
        match self {
            Command::Set { .. } => Verb::Set,
            Command::Get { .. } => Verb::Get,
        }
    }

    /// Get the command key
    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. } => key,
            Command::Get { key } => key,
        }
    }
}
