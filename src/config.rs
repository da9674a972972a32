//! Configuration for the DriftKV client
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

/// How calls are mapped onto TCP connections
///
/// The wire protocol carries no request-correlation identifier, so an
/// arbitrary response can never be matched to an arbitrary pending call.
/// Both policies below make the pairing unambiguous by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPolicy {
    /// Each call opens a private connection (default)
    ///
    /// The single response observed on the connection is the reply to the
    /// single request written on it.
    PerCall,

    /// One shared connection serves calls strictly in issue order
    ///
    /// A new frame is not written until the previous call's response has
    /// been fully decoded, so the first response after a write belongs to
    /// that write.
    Shared,
}

/// Main configuration for a client instance
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Server address (host:port)
    pub server_addr: String,

    /// Connection establishment timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Per-call deadline covering write and response (milliseconds)
    pub call_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Dispatch Configuration
    // -------------------------------------------------------------------------
    /// Connection policy for dispatching calls
    pub policy: ConnectionPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:6411".to_string(),
            connect_timeout_ms: 5000,
            call_timeout_ms: 10_000,
            policy: ConnectionPolicy::PerCall,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Connection establishment timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Per-call deadline as a [`Duration`]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the server address (host:port)
    pub fn server_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server_addr = addr.into();
        self
    }

    /// Set the connection establishment timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the per-call deadline (in milliseconds)
    pub fn call_timeout_ms(mut self, ms: u64) -> Self {
        self.config.call_timeout_ms = ms;
        self
    }

    /// Set the connection policy
    pub fn policy(mut self, policy: ConnectionPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
