//! Lifecycle of streaming calls.
//!
//! Each streaming call owns a [`Session`] that starts [`Open`](StreamState::Open), becomes
//! [`Active`](StreamState::Active) as items flow, and ends in exactly one terminal state:
//! [`Completed`](StreamState::Completed), [`Cancelled`](StreamState::Cancelled) or
//! [`Failed`](StreamState::Failed). Terminal transitions consume the session, so a finished
//! session cannot be advanced again.

use crate::backend::{KeySnapshot, KvBackend};
use crate::handler::validate_key;
use crate::proto::kv::{ListKeysResponse, PutRequest};
use crate::tracing_shim::{debug, info, warn};
use futures::{Stream, StreamExt as _};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tonic::Status;

/// Which streaming operation a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Server-streaming key enumeration.
    ListKeys,
    /// Client-streaming bulk write.
    PutMultiple,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ListKeys => "list_keys",
            Self::PutMultiple => "put_multiple",
        })
    }
}

/// The state of a streaming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    /// The call has started but no item has been sent or received.
    Open,
    /// At least one item has been sent or received.
    Active,
    /// The producer signaled end-of-input, or the snapshot was exhausted.
    Completed,
    /// The other side went away before the stream finished.
    Cancelled,
    /// The stream was aborted because of an error.
    Failed,
}

/// How a streaming call ended.
#[must_use]
#[derive(Debug)]
pub enum SessionOutcome {
    /// Every item was processed.
    Completed {
        /// The number of items sent or applied.
        items: u64,
    },
    /// The other side detached before the stream finished.
    Cancelled {
        /// The number of items sent or applied before the detach was noticed.
        items: u64,
    },
    /// The stream was aborted.
    Failed {
        /// The number of items sent or applied before the failure.
        items: u64,
        /// The error reported to the caller.
        status: Status,
    },
}

impl SessionOutcome {
    /// The number of items sent or applied before the session ended.
    pub const fn items(&self) -> u64 {
        match self {
            Self::Completed { items } | Self::Cancelled { items } | Self::Failed { items, .. } => {
                *items
            }
        }
    }

    /// The terminal state this outcome corresponds to.
    pub const fn state(&self) -> StreamState {
        match self {
            Self::Completed { .. } => StreamState::Completed,
            Self::Cancelled { .. } => StreamState::Cancelled,
            Self::Failed { .. } => StreamState::Failed,
        }
    }

    /// Convert into the result reported to the caller: the item count on completion, an error
    /// otherwise.
    pub fn into_result(self) -> Result<u64, Status> {
        match self {
            Self::Completed { items } => Ok(items),
            Self::Cancelled { items } => Err(Status::cancelled(format!(
                "stream cancelled after {items} items"
            ))),
            Self::Failed { status, .. } => Err(status),
        }
    }
}

/// Ephemeral state of one streaming call.
#[derive(Debug)]
pub struct Session {
    kind: StreamKind,
    state: StreamState,
    items: u64,
}

impl Session {
    /// Begin a new session.
    pub const fn open(kind: StreamKind) -> Self {
        Self {
            kind,
            state: StreamState::Open,
            items: 0,
        }
    }

    /// The operation this session belongs to.
    pub const fn kind(&self) -> StreamKind {
        self.kind
    }

    /// The current state. Always `Open` or `Active`, as terminal transitions consume the session.
    pub const fn state(&self) -> StreamState {
        self.state
    }

    /// The number of items processed so far.
    pub const fn items(&self) -> u64 {
        self.items
    }

    /// Record one item sent or received.
    pub fn advance(&mut self) {
        self.state = StreamState::Active;
        self.items += 1;
    }

    /// End the session successfully.
    pub fn complete(self) -> SessionOutcome {
        debug!(kind = %self.kind, items = self.items, "stream completed");
        SessionOutcome::Completed { items: self.items }
    }

    /// End the session because the other side detached.
    pub fn cancel(self) -> SessionOutcome {
        info!(kind = %self.kind, items = self.items, "stream cancelled");
        SessionOutcome::Cancelled { items: self.items }
    }

    /// End the session with an error.
    pub fn fail(self, status: Status) -> SessionOutcome {
        warn!(
            kind = %self.kind,
            items = self.items,
            code = ?status.code(),
            error = status.message(),
            "stream failed",
        );
        SessionOutcome::Failed {
            items: self.items,
            status,
        }
    }
}

/// Send every key in `snapshot` to `tx`, one message per key.
///
/// `tx` should be bounded: sending waits for the consumer to make room, so a slow consumer slows
/// the emitter down rather than growing a buffer. Once the receiving half is dropped the
/// remaining keys are discarded and the session is reported as cancelled.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(keys = snapshot.len())))]
pub async fn emit_keys(
    mut snapshot: KeySnapshot,
    tx: mpsc::Sender<Result<ListKeysResponse, Status>>,
) -> SessionOutcome {
    let mut session = Session::open(StreamKind::ListKeys);

    while let Some(key) = snapshot.next() {
        if tx.send(Ok(ListKeysResponse { key })).await.is_err() {
            return session.cancel();
        }
        session.advance();

        if snapshot.len() != 0 && tx.is_closed() {
            return session.cancel();
        }
    }

    session.complete()
}

/// Apply every pair in `pairs` to `backend` as it arrives.
///
/// Each write is applied on its own; the pairs are not applied atomically as a group. If the
/// stream yields an error the connection is considered broken: consumption stops and the writes
/// already applied are kept. A pair with an empty key fails the session.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub async fn ingest_pairs<Backend, S>(backend: &Backend, mut pairs: S) -> SessionOutcome
where
    Backend: KvBackend + ?Sized,
    S: Stream<Item = Result<PutRequest, Status>> + Unpin,
{
    let mut session = Session::open(StreamKind::PutMultiple);

    while let Some(pair) = pairs.next().await {
        let PutRequest { key, value } = match pair {
            Ok(pair) => pair,
            Err(_status) => {
                debug!(
                    code = ?_status.code(),
                    error = _status.message(),
                    "inbound stream broken",
                );
                return session.cancel();
            }
        };
        if let Err(status) = validate_key(&key) {
            return session.fail(status);
        }
        let _was_update = backend.put(key, value);
        session.advance();
    }

    session.complete()
}

/// Running totals of the streaming calls served by one store.
#[derive(Debug, Default)]
pub struct SessionStats {
    active: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicU64,
    failed: AtomicU64,
}

/// A point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounts {
    /// Sessions that have started and not yet ended.
    pub active: u64,
    /// Sessions that ended as [`Completed`](StreamState::Completed).
    pub completed: u64,
    /// Sessions that ended as [`Cancelled`](StreamState::Cancelled).
    pub cancelled: u64,
    /// Sessions that ended as [`Failed`](StreamState::Failed).
    pub failed: u64,
}

impl SessionStats {
    /// Start with every count at zero.
    #[inline]
    pub const fn new() -> Self {
        Self {
            active: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Read the current counts.
    pub fn counts(&self) -> SessionCounts {
        SessionCounts {
            active: self.active.load(Ordering::Acquire),
            completed: self.completed.load(Ordering::Acquire),
            cancelled: self.cancelled.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
        }
    }

    /// Count a session as active until the returned guard is finished or dropped.
    pub fn track(self: &Arc<Self>) -> SessionGuard {
        let _previous = self.active.fetch_add(1, Ordering::AcqRel);
        SessionGuard {
            stats: Arc::clone(self),
            finished: false,
        }
    }
}

/// Keeps one session counted as active.
///
/// A guard dropped without [`finish`](Self::finish) counts as cancelled: the task running the
/// session was dropped, which happens when the connection carrying the call goes away.
#[must_use]
#[derive(Debug)]
pub struct SessionGuard {
    stats: Arc<SessionStats>,
    finished: bool,
}

impl SessionGuard {
    /// Record how the session ended.
    pub fn finish(mut self, outcome: &SessionOutcome) {
        let counter = match outcome.state() {
            StreamState::Completed => &self.stats.completed,
            StreamState::Failed => &self.stats.failed,
            StreamState::Open | StreamState::Active | StreamState::Cancelled => {
                &self.stats.cancelled
            }
        };
        let _previous = counter.fetch_add(1, Ordering::AcqRel);
        self.finished = true;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.finished {
            info!("stream dropped before it ended");
            let _previous = self.stats.cancelled.fetch_add(1, Ordering::AcqRel);
        }
        let _previous = self.stats.active.fetch_sub(1, Ordering::AcqRel);
    }
}
