//! Request/reply exchange on one connection.

use std::time::Duration;

use wav_player_proto::{Reply, Request, encode_request};

use crate::connection::Connection;
use crate::error::CallError;
use crate::reply_queue::WaitError;

/// Send `request` and wait at most `timeout` for the reply of the same kind.
///
/// The connection's receiver must already be running. Replies are matched by
/// call kind only, so at most one call per kind may be in flight.
pub(crate) fn call(
    conn: &Connection,
    request: &Request,
    timeout: Duration,
) -> Result<Reply, CallError> {
    let kind = request.kind();
    let bytes = encode_request(request).map_err(|source| CallError::Encode { kind, source })?;
    conn.send(&bytes).map_err(|source| CallError::Write { kind, source })?;
    tracing::debug!(session = %conn.id(), %kind, bytes = bytes.len(), "request sent");

    let reply = conn.slots().wait_for(kind, timeout).map_err(|e| match e {
        WaitError::TimedOut => CallError::Timeout { kind, timeout },
        WaitError::Closed => CallError::ConnectionClosed { kind },
    })?;
    tracing::debug!(
        session = %conn.id(),
        %kind,
        code = i32::from(reply.result),
        "reply received"
    );
    Ok(reply)
}
