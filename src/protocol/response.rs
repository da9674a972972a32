//! Response definitions
//!
//! Represents decoded responses from the server.

use crate::error::{ClientError, Result};

/// Response status tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Err,
}

/// A decoded response
///
/// `lines` holds the payload lines that followed the status line, in wire
/// order, excluding the terminating blank line. For a get reply the first
/// line is the blank value marker and the second is the value itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status token from the first line
    pub status: Status,

    /// Payload lines, in order
    pub lines: Vec<String>,
}

impl Response {
    /// Create a response from a status and payload lines
    pub fn new(status: Status, lines: Vec<String>) -> Self {
        Self { status, lines }
    }

    /// Extract the logical value carried by an `OK` response
    ///
    /// - `["", value, ..]` is a get reply; the value may be empty, which
    ///   means the key is absent or expired
    /// - `[message, ..]` with a non-empty first line is a set confirmation
    /// - no payload at all also means "key not found"
    pub fn value(&self) -> String {
        match self.lines.as_slice() {
            [first, second, ..] if first.is_empty() => second.clone(),
            [first, ..] => first.clone(),
            [] => String::new(),
        }
    }

    /// Convert the response into the caller-facing result
    ///
    /// `Err` status becomes a typed [`ClientError::Server`] carrying the
    /// detail line, so an empty `Ok` value can only ever mean "key not
    /// found" and never masks a failure.
    pub fn into_result(mut self) -> Result<String> {
        match self.status {
            Status::Ok => Ok(self.value()),
            Status::Err => Err(ClientError::Server {
                detail: if self.lines.is_empty() {
                    String::new()
                } else {
                    self.lines.remove(0)
                },
            }),
        }
    }
}
