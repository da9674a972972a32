//! Client Facade
//!
//! The public connect/set/get/close surface. Composes the encoder, the
//! transport session, and the correlator; carries no retry logic of its
//! own, so every failure surfaces to the caller as a typed error.

use bytes::Bytes;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::network::Correlator;
use crate::protocol::{encode_command, Command};

/// Handle to a DriftKV server
pub struct Client {
    correlator: Correlator,
    config: ClientConfig,
}

impl Client {
    /// Connect to a server with default settings
    pub async fn connect(addr: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::builder().server_addr(addr).build()).await
    }

    /// Connect to a server with explicit configuration
    ///
    /// Under the shared policy the connection is established here, so a
    /// dead server fails fast; under per-call each operation dials its
    /// own connection.
    pub async fn with_config(config: ClientConfig) -> Result<Self> {
        let correlator = Correlator::connect(&config).await?;
        Ok(Self { correlator, config })
    }

    /// Store a value under a key
    ///
    /// `expire_secs` limits how long the server keeps the entry; without
    /// it the server applies its own default. Returns the server's
    /// confirmation message verbatim.
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<Bytes>,
        expire_secs: Option<u64>,
    ) -> Result<String> {
        let command = Command::Set {
            key: key.to_string(),
            value: value.into(),
            expire_secs,
        };
        self.dispatch(&command).await
    }

    /// Fetch the value stored under a key
    ///
    /// Returns an empty string if the key is absent or expired. A failed
    /// call is always a typed error, never an empty-looking success.
    pub async fn get(&self, key: &str) -> Result<String> {
        let command = Command::Get {
            key: key.to_string(),
        };
        self.dispatch(&command).await
    }

    /// Number of calls currently in flight
    pub fn pending_calls(&self) -> usize {
        self.correlator.pending_calls()
    }

    /// Close the client
    ///
    /// Idempotent. Outstanding shared-policy calls fail with
    /// `ConnectionClosed`; subsequent calls fail the same way.
    pub fn close(&self) {
        self.correlator.close();
    }

    async fn dispatch(&self, command: &Command) -> Result<String> {
        let frame = encode_command(command)?;
        tracing::trace!("Dispatching {} {}", command.verb().as_str(), command.key());
        let response = self
            .correlator
            .call(frame, self.config.call_timeout())
            .await?;
        response.into_result()
    }
}
