//! Per-session connection state shared by the caller and the receiver thread.

use std::fmt;
use std::io::{self, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use crossbeam_channel::Sender;

use crate::registry::SessionId;
use crate::reply_queue::ReplySlots;

/// Completion notification posted through [`OnComplete::Notify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCompleted {
    pub session: SessionId,
}

/// What to do when the service reports that a playback finished.
///
/// Delivery happens on the session's receiver thread, at most once.
/// A callback must not block; it may call back into the player.
pub enum OnComplete {
    /// Invoke a closure. Captured state plays the role of user data.
    Callback(Box<dyn FnOnce(SessionId) + Send + 'static>),
    /// Post a [`PlaybackCompleted`] to a channel drained by the application.
    Notify(Sender<PlaybackCompleted>),
}

impl OnComplete {
    pub fn callback(f: impl FnOnce(SessionId) + Send + 'static) -> Self {
        OnComplete::Callback(Box::new(f))
    }

    pub fn notify(tx: Sender<PlaybackCompleted>) -> Self {
        OnComplete::Notify(tx)
    }

    pub(crate) fn fire(self, session: SessionId) {
        match self {
            OnComplete::Callback(f) => f(session),
            OnComplete::Notify(tx) => {
                if tx.send(PlaybackCompleted { session }).is_err() {
                    tracing::debug!(%session, "completion receiver dropped");
                }
            }
        }
    }
}

impl fmt::Debug for OnComplete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnComplete::Callback(_) => f.write_str("OnComplete::Callback(..)"),
            OnComplete::Notify(_) => f.write_str("OnComplete::Notify(..)"),
        }
    }
}

/// One playback session's socket, reply slots and completion handler.
///
/// Shared between the registry, the calling thread and the receiver thread.
/// The socket is shut down once by [`Connection::close`]; the descriptor is
/// released when the last owner drops.
pub(crate) struct Connection {
    id: SessionId,
    stream: Mutex<UnixStream>,
    slots: ReplySlots,
    on_complete: Mutex<Option<OnComplete>>,
    remote_handle: OnceLock<i64>,
    closed: AtomicBool,
}

impl Connection {
    pub(crate) fn new(id: SessionId, stream: UnixStream, on_complete: Option<OnComplete>) -> Self {
        Self {
            id,
            stream: Mutex::new(stream),
            slots: ReplySlots::default(),
            on_complete: Mutex::new(on_complete),
            remote_handle: OnceLock::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> SessionId {
        self.id
    }

    pub(crate) fn slots(&self) -> &ReplySlots {
        &self.slots
    }

    /// Second handle on the socket for the receiver thread.
    pub(crate) fn reader(&self) -> io::Result<UnixStream> {
        self.stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_clone()
    }

    /// Write one framed request.
    pub(crate) fn send(&self, bytes: &[u8]) -> io::Result<()> {
        if self.is_closed() {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("session {} is closed", self.id),
            ));
        }
        let mut stream = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        stream.write_all(bytes)?;
        stream.flush()
    }

    /// Service-side playback handle, known once start succeeded.
    pub(crate) fn remote_handle(&self) -> Option<i64> {
        self.remote_handle.get().copied()
    }

    pub(crate) fn set_remote_handle(&self, handle: i64) {
        if self.remote_handle.set(handle).is_err() {
            tracing::warn!(session = %self.id, handle, "remote handle already set");
        }
    }

    /// Take the completion handler; returns `None` after the first call.
    pub(crate) fn take_completion(&self) -> Option<OnComplete> {
        self.on_complete
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Shut the socket down and wake every waiter. Only the first call acts.
    ///
    /// The receiver's read side observes end of stream and exits.
    pub(crate) fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let stream = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = stream.shutdown(Shutdown::Both) {
            if e.kind() != io::ErrorKind::NotConnected {
                tracing::debug!(session = %self.id, "socket shutdown: {e}");
            }
        }
        drop(stream);
        self.slots.close();
        tracing::debug!(
            session = %self.id,
            unclaimed = self.slots.available(),
            "connection closed"
        );
        true
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("remote_handle", &self.remote_handle.get())
            .field("closed", &self.is_closed())
            .finish()
    }
}
