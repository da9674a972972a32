//! Transport Session
//!
//! Owns one TCP connection to the server. The session writes encoded
//! frames and feeds inbound bytes to the response decoder; it never
//! interprets payloads itself.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{self, Instant};

use crate::error::{ClientError, Result};
use crate::protocol::{Response, ResponseDecoder};

/// Socket read size per syscall
const READ_BUFFER_SIZE: usize = 4096;

/// One TCP connection plus its decode buffer
pub struct Session {
    /// The owned socket; `None` once closed
    stream: Option<TcpStream>,

    /// Stateful response decoder holding partially-received bytes
    decoder: ResponseDecoder,

    /// Peer address for logging
    peer_addr: String,
}

impl Session {
    /// Open a connection to the server
    ///
    /// Refused, unreachable, and timed-out connects all surface as
    /// `Connection` errors.
    pub async fn open(addr: &str, connect_timeout: Duration) -> Result<Self> {
        let stream = time::timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::Connection(format!("connect to {} timed out", addr)))?
            .map_err(|e| ClientError::Connection(format!("connect to {} failed: {}", addr, e)))?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        tracing::debug!("Session established to {}", addr);

        Ok(Self {
            stream: Some(stream),
            decoder: ResponseDecoder::new(),
            peer_addr: addr.to_string(),
        })
    }

    /// Write one encoded frame and flush it
    pub async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(ClientError::ConnectionClosed)?;
        stream.write_all(frame).await?;
        stream.flush().await?;
        tracing::trace!("Wrote {} byte frame to {}", frame.len(), self.peer_addr);
        Ok(())
    }

    /// Read until one complete response decodes, or the deadline passes
    ///
    /// Peer close completes the response when the buffered bytes form one
    /// (some servers terminate by closing); otherwise it surfaces as
    /// `ConnectionClosed` rather than a hang. On deadline expiry the
    /// socket is closed, not reused.
    pub async fn read_response(&mut self, deadline: Instant) -> Result<Response> {
        let mut read_buf = [0u8; READ_BUFFER_SIZE];

        loop {
            if let Some(response) = self.decoder.try_decode()? {
                tracing::trace!("Decoded response from {}", self.peer_addr);
                return Ok(response);
            }

            let stream = self.stream.as_mut().ok_or(ClientError::ConnectionClosed)?;
            let outcome = time::timeout_at(deadline, stream.read(&mut read_buf)).await;
            let read = match outcome {
                Ok(result) => result?,
                Err(_) => {
                    self.close();
                    return Err(ClientError::TimedOut);
                }
            };

            if read == 0 {
                return match self.decoder.decode_eof()? {
                    Some(response) => Ok(response),
                    None => Err(ClientError::ConnectionClosed),
                };
            }

            self.decoder.feed(&read_buf[..read]);
        }
    }

    /// Close the session, releasing the socket
    ///
    /// Idempotent; safe on all paths including errors.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("Session to {} closed", self.peer_addr);
        }
    }

    /// Whether the socket is still open
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
