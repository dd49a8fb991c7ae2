//! Receiver thread: one per connection, owns every read from the socket.
//!
//! Replies are queued for the waiting caller. A completion event removes the
//! session from the registry, runs the completion handler and closes the
//! connection. If `stop` or `shutdown` already released the session, the
//! event is ignored and the handler never runs. End of stream or a read
//! error also closes the connection and wakes any waiter. The thread holds
//! its own reference to the connection, so whichever of the caller and the
//! receiver finishes last frees it.

use std::io;
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Weak};

use wav_player_proto::{EventKind, MessageBuffer, ParseResult, Unit};

use crate::connection::Connection;
use crate::registry::HandleRegistry;

/// Terminal states of the receive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    EventReceived,
    StreamClosed,
}

/// Start the receiver for `conn`, reading from `reader`.
pub(crate) fn spawn(
    conn: Arc<Connection>,
    reader: UnixStream,
    registry: Weak<HandleRegistry>,
    read_quantum: usize,
) -> io::Result<()> {
    let name = format!("wav-player-rx-{}", conn.id());
    std::thread::Builder::new()
        .name(name)
        .spawn(move || run(conn, reader, registry, read_quantum))?;
    Ok(())
}

fn run(
    conn: Arc<Connection>,
    mut reader: UnixStream,
    registry: Weak<HandleRegistry>,
    read_quantum: usize,
) {
    let session = conn.id();
    let mut buf = MessageBuffer::new(read_quantum);

    let exit = loop {
        match buf.read_from(&mut reader) {
            Ok(0) => {
                tracing::debug!(%session, "end of stream");
                break Exit::StreamClosed;
            }
            Ok(n) => tracing::trace!(%session, bytes = n, "read"),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                if !conn.is_closed() {
                    tracing::warn!(%session, "receive failed: {e}");
                }
                break Exit::StreamClosed;
            }
        }

        match drain_units(&mut buf, &conn) {
            Ok(None) => {}
            Ok(Some(event)) => {
                if dispatch_event(&conn, &registry, event) {
                    break Exit::EventReceived;
                }
            }
            Err(e) => {
                tracing::warn!(%session, "receive loop aborted: {e}");
                break Exit::StreamClosed;
            }
        }
    };

    if exit == Exit::StreamClosed {
        if let Some(registry) = registry.upgrade() {
            registry.remove(&conn);
        }
        conn.close();
    }
    tracing::debug!(%session, ?exit, "receiver exited");
}

/// Decode every complete unit in `buf`, queueing replies.
///
/// Returns the first event seen. Replies behind the event are still queued.
/// Undecodable units are logged and skipped. Fails only if a parse step would
/// make no forward progress.
fn drain_units(buf: &mut MessageBuffer, conn: &Connection) -> io::Result<Option<EventKind>> {
    let mut event = None;
    loop {
        match buf.next_unit() {
            ParseResult::Incomplete => return Ok(event),
            ParseResult::Complete { consumed: 0, .. }
            | ParseResult::Invalid { consumed: 0, .. } => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "parser made no progress",
                ));
            }
            ParseResult::Invalid { error, consumed } => {
                tracing::warn!(session = %conn.id(), bytes = consumed, "dropping unit: {error}");
                buf.consume(consumed);
            }
            ParseResult::Complete { unit, consumed } => {
                buf.consume(consumed);
                match unit {
                    Unit::Reply { kind, reply } => conn.slots().deliver(kind, reply),
                    Unit::Event(kind) if event.is_none() => event = Some(kind),
                    Unit::Event(kind) => {
                        tracing::debug!(session = %conn.id(), ?kind, "extra event ignored")
                    }
                }
            }
        }
    }
}

/// Handle an event. Returns `true` if it ended the session.
///
/// Only the path that removes the session from the registry runs the
/// completion handler; a session already released by `stop` keeps reading
/// until the stop path closes the socket.
fn dispatch_event(
    conn: &Arc<Connection>,
    registry: &Weak<HandleRegistry>,
    event: EventKind,
) -> bool {
    let session = conn.id();
    match event {
        EventKind::PlaybackCompleted => {
            let owned = registry.upgrade().is_some_and(|registry| registry.remove(conn));
            if !owned {
                tracing::debug!(%session, "completion for released session ignored");
                return false;
            }
            tracing::info!(%session, "playback completed");
            if let Some(handler) = conn.take_completion() {
                handler.fire(session);
            }
        }
    }
    conn.close();
    true
}
