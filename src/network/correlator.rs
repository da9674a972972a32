//! Request Correlator
//!
//! Matches in-flight calls to their eventual responses. The wire protocol
//! carries no correlation identifier, so the pairing must be unambiguous
//! by construction:
//!
//! - **Per-call**: every call opens a private session, writes one frame,
//!   and awaits the one response on it.
//! - **Shared**: a single driver task owns the session and serves calls
//!   from a FIFO queue; a frame is not written until the previous call's
//!   response has been fully decoded, so completion follows issue order.
//!
//! Every issued call resolves exactly once: with a response, `TimedOut`,
//! or a transport error. The pending-call table tracks calls from issue
//! to terminal resolution; a drop guard removes the entry even when the
//! caller is cancelled mid-await.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::{ClientConfig, ConnectionPolicy};
use crate::error::{ClientError, Result};
use crate::protocol::Response;
use super::Session;

/// Queue depth for the shared-connection driver
const CALL_QUEUE_DEPTH: usize = 32;

// =============================================================================
// Pending-Call Table
// =============================================================================

/// Bookkeeping for one in-flight call
#[derive(Debug, Clone)]
pub struct PendingCall {
    /// Monotonically increasing call id
    pub id: u64,

    /// When the call was issued
    pub issued_at: Instant,

    /// When the call gives up
    pub deadline: Instant,
}

/// Table of in-flight calls
///
/// Inserted on issue, removed on terminal resolution; never resolved
/// twice. Exposed so callers can verify no call leaks.
pub struct PendingTable {
    calls: Mutex<HashMap<u64, PendingCall>>,
    next_id: AtomicU64,
}

impl PendingTable {
    fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new call; the returned guard removes it on drop
    fn issue(self: &Arc<Self>, deadline: Instant) -> PendingGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let call = PendingCall {
            id,
            issued_at: Instant::now(),
            deadline,
        };
        self.calls.lock().insert(id, call);
        PendingGuard {
            table: Arc::clone(self),
            id,
        }
    }

    /// Number of calls currently in flight
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// Whether no calls are in flight
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

/// Removes a pending call from the table on any exit path
struct PendingGuard {
    table: Arc<PendingTable>,
    id: u64,
}

impl PendingGuard {
    fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.table.calls.lock().remove(&self.id).is_some() {
            tracing::trace!("Call {} resolved", self.id);
        }
    }
}

// =============================================================================
// Correlator
// =============================================================================

/// A call queued for the shared-connection driver
struct QueuedCall {
    frame: Bytes,
    deadline: Instant,
    reply: oneshot::Sender<Result<Response>>,
}

/// Dispatch mode, fixed at connect time from the configured policy
enum Mode {
    /// A private session per call
    PerCall {
        addr: String,
        connect_timeout: Duration,
    },

    /// One driver task owns the session; calls are served in FIFO order
    Shared {
        queue: mpsc::Sender<QueuedCall>,
        driver: JoinHandle<()>,
    },
}

/// Tracks in-flight calls and dispatches them under the configured policy
pub struct Correlator {
    mode: Mode,
    table: Arc<PendingTable>,
    closed: AtomicBool,
}

impl Correlator {
    /// Set up dispatch for the configured policy
    ///
    /// Under the shared policy the session is established eagerly so a
    /// refused or unreachable server surfaces immediately; under per-call
    /// each call dials its own session.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let mode = match config.policy {
            ConnectionPolicy::PerCall => Mode::PerCall {
                addr: config.server_addr.clone(),
                connect_timeout: config.connect_timeout(),
            },
            ConnectionPolicy::Shared => {
                let session = Session::open(&config.server_addr, config.connect_timeout()).await?;
                let (queue, calls) = mpsc::channel(CALL_QUEUE_DEPTH);
                let driver = tokio::spawn(drive(session, calls));
                Mode::Shared { queue, driver }
            }
        };

        Ok(Self {
            mode,
            table: Arc::new(PendingTable::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Issue a call and await its response or the deadline
    ///
    /// The call is tracked in the pending table from issue until it
    /// resolves; a response arriving after the deadline is discarded by
    /// the driver, never delivered to another caller.
    pub async fn call(&self, frame: Bytes, timeout: Duration) -> Result<Response> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::ConnectionClosed);
        }

        let deadline = Instant::now() + timeout;
        let guard = self.table.issue(deadline);
        tracing::trace!("Issued call {}", guard.id());

        match &self.mode {
            Mode::PerCall {
                addr,
                connect_timeout,
            } => call_once(addr, *connect_timeout, &frame, deadline).await,
            Mode::Shared { queue, .. } => shared_call(queue, frame, deadline).await,
        }
        // guard drops here, removing the call from the table exactly once
    }

    /// Number of calls currently in flight
    pub fn pending_calls(&self) -> usize {
        self.table.len()
    }

    /// Close the correlator
    ///
    /// Idempotent. Under the shared policy the driver is stopped and its
    /// session dropped; every still-pending call fails with
    /// `ConnectionClosed`. Subsequent calls fail the same way.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Mode::Shared { driver, .. } = &self.mode {
            driver.abort();
            tracing::debug!("Shared session closing; pending calls will fail");
        }
    }
}

impl Drop for Correlator {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// Dispatch paths
// =============================================================================

/// Per-call dispatch: private session, one request, one response
async fn call_once(
    addr: &str,
    connect_timeout: Duration,
    frame: &Bytes,
    deadline: Instant,
) -> Result<Response> {
    let mut session = Session::open(addr, connect_timeout).await?;
    session.write_frame(frame).await?;
    let response = session.read_response(deadline).await;
    session.close();
    response
}

/// Shared dispatch: enqueue for the driver and await the outcome
async fn shared_call(
    queue: &mpsc::Sender<QueuedCall>,
    frame: Bytes,
    deadline: Instant,
) -> Result<Response> {
    let (reply, outcome) = oneshot::channel();
    queue
        .send(QueuedCall {
            frame,
            deadline,
            reply,
        })
        .await
        .map_err(|_| ClientError::ConnectionClosed)?;

    match time::timeout_at(deadline, outcome).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(ClientError::ConnectionClosed),
        Err(_) => Err(ClientError::TimedOut),
    }
}

/// Shared-connection driver loop
///
/// Serves queued calls strictly one at a time: write, then decode the
/// response, then take the next call. Any read failure leaves the stream
/// position unknown, so the session is torn down rather than risking a
/// stale response being matched to a later call.
async fn drive(mut session: Session, mut queue: mpsc::Receiver<QueuedCall>) {
    while let Some(call) = queue.recv().await {
        if Instant::now() >= call.deadline {
            let _ = call.reply.send(Err(ClientError::TimedOut));
            continue;
        }

        if let Err(error) = session.write_frame(&call.frame).await {
            let _ = call.reply.send(Err(error));
            break;
        }

        match session.read_response(call.deadline).await {
            Ok(response) => {
                if call.reply.send(Ok(response)).is_err() {
                    // The stream is still in sync; only this caller is gone.
                    tracing::warn!("Discarding response for an abandoned call");
                }
            }
            Err(error) => {
                let _ = call.reply.send(Err(error));
                break;
            }
        }
    }

    session.close();
    queue.close();
    while let Ok(call) = queue.try_recv() {
        let _ = call.reply.send(Err(ClientError::ConnectionClosed));
    }
}
