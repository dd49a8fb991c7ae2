//! Pending replies and the per-call-kind wait slots.
//!
//! The receiver thread deposits replies here; callers block on the slot for
//! the call kind they issued. One mutex guards the queue and the closed flag,
//! and each call kind has its own condition variable.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use wav_player_proto::{CallKind, Reply};

/// Replies not yet claimed, in arrival order.
///
/// Lookup by kind removes the oldest entry of that kind (FIFO per kind).
#[derive(Debug, Default)]
pub(crate) struct PendingReplies {
    entries: VecDeque<(CallKind, Reply)>,
}

impl PendingReplies {
    pub(crate) fn push(&mut self, kind: CallKind, reply: Reply) {
        self.entries.push_back((kind, reply));
    }

    pub(crate) fn take(&mut self, kind: CallKind) -> Option<Reply> {
        let idx = self.entries.iter().position(|(k, _)| *k == kind)?;
        self.entries.remove(idx).map(|(_, reply)| reply)
    }

    /// Replies available across all kinds.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Default)]
struct SlotState {
    pending: PendingReplies,
    closed: bool,
}

/// Why a wait ended without a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitError {
    TimedOut,
    Closed,
}

#[derive(Debug, Default)]
pub(crate) struct ReplySlots {
    state: Mutex<SlotState>,
    start_ready: Condvar,
    stop_ready: Condvar,
}

impl ReplySlots {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, kind: CallKind) -> &Condvar {
        match kind {
            CallKind::Start => &self.start_ready,
            CallKind::Stop => &self.stop_ready,
        }
    }

    /// Queue a reply and wake whoever waits on its kind.
    pub(crate) fn deliver(&self, kind: CallKind, reply: Reply) {
        let mut g = self.lock();
        g.pending.push(kind, reply);
        let available = g.pending.len();
        drop(g);
        tracing::trace!(%kind, available, "reply queued");
        self.slot(kind).notify_all();
    }

    /// Mark the connection gone and wake every waiter.
    pub(crate) fn close(&self) {
        let mut g = self.lock();
        g.closed = true;
        drop(g);
        for kind in CallKind::ALL {
            self.slot(kind).notify_all();
        }
    }

    pub(crate) fn available(&self) -> usize {
        self.lock().pending.len()
    }

    /// Block until a reply of `kind` is queued, the connection closes, or
    /// `timeout` elapses.
    ///
    /// A reply already queued before the call is returned immediately. A reply
    /// queued before the close is still returned.
    pub(crate) fn wait_for(&self, kind: CallKind, timeout: Duration) -> Result<Reply, WaitError> {
        let deadline = Instant::now() + timeout;
        let cv = self.slot(kind);
        let mut g = self.lock();
        loop {
            if let Some(reply) = g.pending.take(kind) {
                return Ok(reply);
            }
            if g.closed {
                return Err(WaitError::Closed);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(WaitError::TimedOut);
            }
            let (ng, _timeout) = cv
                .wait_timeout(g, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            g = ng;
        }
    }
}
