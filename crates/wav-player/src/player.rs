//! Public playback entry points.

use std::path::Path;
use std::sync::Arc;

use wav_player_proto::{CallKind, PlaybackRoute, Request, StartRequest, StopRequest};

use crate::config::PlayerConfig;
use crate::connection::{Connection, OnComplete};
use crate::driver;
use crate::error::{CallError, Result, WavPlayerError, check_status};
use crate::params::{SoundType, StreamInfo, normalize_path};
use crate::receiver;
use crate::registry::{HandleRegistry, SessionId};
use crate::transport::{Connector, UnixConnector};

/// Client for the out-of-process sound service.
///
/// Owns the table of live sessions. Each started playback gets its own
/// connection and receiver thread; [`WavPlayer::stop`] looks the session up
/// again by id. Dropping the player closes every live session.
pub struct WavPlayer<C: Connector = UnixConnector> {
    config: PlayerConfig,
    connector: C,
    registry: Arc<HandleRegistry>,
}

impl WavPlayer<UnixConnector> {
    /// Player talking to the socket named in `config`.
    pub fn new(config: PlayerConfig) -> Self {
        let connector = UnixConnector::new(config.socket_path.clone());
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> WavPlayer<C> {
    pub fn with_connector(config: PlayerConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            registry: Arc::new(HandleRegistry::default()),
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Play `path` once, routed by legacy sound type.
    pub fn start(
        &self,
        path: impl AsRef<Path>,
        sound_type: SoundType,
        on_complete: Option<OnComplete>,
    ) -> Result<SessionId> {
        let route = PlaybackRoute::SoundType {
            sound_type: sound_type.name().to_string(),
        };
        self.start_session("start", path.as_ref(), route, 1, on_complete)
    }

    /// Play `path` once on the given stream.
    pub fn start_with_stream_info(
        &self,
        path: impl AsRef<Path>,
        stream: &StreamInfo,
        on_complete: Option<OnComplete>,
    ) -> Result<SessionId> {
        self.start_stream("start_with_stream_info", path.as_ref(), stream, 1, on_complete)
    }

    /// Play `path` `loop_count` times on the given stream; `0` loops until stopped.
    pub fn start_loop(
        &self,
        path: impl AsRef<Path>,
        stream: &StreamInfo,
        loop_count: u32,
        on_complete: Option<OnComplete>,
    ) -> Result<SessionId> {
        self.start_stream("start_loop", path.as_ref(), stream, loop_count, on_complete)
    }

    /// Stop a playback and release its session.
    ///
    /// The session is gone afterwards even if the service reports a failure.
    /// The completion handler is dropped without running.
    pub fn stop(&self, id: SessionId) -> Result<()> {
        let Some(conn) = self.registry.find(id) else {
            return Err(WavPlayerError::InvalidOperation(format!("unknown session {id}")));
        };
        let Some(handle) = conn.remote_handle() else {
            return Err(WavPlayerError::InvalidOperation(format!(
                "session {id} is still starting"
            )));
        };
        if !self.registry.remove(&conn) {
            return Err(WavPlayerError::InvalidOperation(format!("unknown session {id}")));
        }
        drop(conn.take_completion());

        let outcome = driver::call(
            &conn,
            &Request::Stop(StopRequest { handle }),
            self.config.reply_timeout,
        );
        conn.close();
        let reply = outcome.inspect_err(|e| tracing::warn!(session = %id, "stop failed: {e}"))?;
        check_status("stop", reply.result)?;
        tracing::info!(session = %id, handle, "playback stopped");
        Ok(())
    }

    /// Number of sessions still registered.
    pub fn live_sessions(&self) -> usize {
        self.registry.len()
    }

    /// Close every live session. Completion handlers of closed sessions never run.
    pub fn shutdown(&self) {
        let live = self.registry.drain();
        if live.is_empty() {
            return;
        }
        tracing::info!(sessions = live.len(), "closing live sessions");
        for conn in live {
            drop(conn.take_completion());
            conn.close();
        }
    }

    fn start_stream(
        &self,
        op: &'static str,
        path: &Path,
        stream: &StreamInfo,
        loop_count: u32,
        on_complete: Option<OnComplete>,
    ) -> Result<SessionId> {
        if !stream.is_available_for_wav() {
            tracing::error!(
                op,
                stream_type = stream.stream_type(),
                "stream not available for wav playback"
            );
            return Err(WavPlayerError::NotSupportedType);
        }
        let route = PlaybackRoute::Stream {
            stream_type: stream.stream_type().to_string(),
            stream_index: stream.index(),
        };
        self.start_session(op, path, route, loop_count, on_complete)
    }

    fn start_session(
        &self,
        op: &'static str,
        path: &Path,
        route: PlaybackRoute,
        loop_count: u32,
        on_complete: Option<OnComplete>,
    ) -> Result<SessionId> {
        let path = normalize_path(path).inspect_err(|e| tracing::error!(op, "{e}"))?;
        let stream = self.connector.connect().map_err(|e| {
            let err = WavPlayerError::InvalidOperation(format!("connect: {e}"));
            tracing::error!(op, "{err}");
            err
        })?;

        let conn = self
            .registry
            .insert_with(|id| Connection::new(id, stream, on_complete));
        let request = Request::Start(StartRequest {
            path,
            route,
            loop_count,
            client_pid: std::process::id(),
        });

        match self.request_start(op, &conn, &request) {
            Ok(handle) => {
                tracing::info!(session = %conn.id(), handle, loop_count, "playback started");
                Ok(conn.id())
            }
            Err(e) => {
                self.registry.remove(&conn);
                conn.close();
                Err(e)
            }
        }
    }

    /// Start the receiver, send the start request and record the handle.
    fn request_start(
        &self,
        op: &'static str,
        conn: &Arc<Connection>,
        request: &Request,
    ) -> Result<i64> {
        let reader = conn
            .reader()
            .map_err(|e| WavPlayerError::InvalidOperation(format!("clone socket: {e}")))?;
        receiver::spawn(
            conn.clone(),
            reader,
            Arc::downgrade(&self.registry),
            self.config.read_quantum,
        )
        .map_err(|e| WavPlayerError::InvalidOperation(format!("spawn receiver: {e}")))?;

        let reply = driver::call(conn, request, self.config.reply_timeout).map_err(|e| {
            tracing::error!(op, session = %conn.id(), "{e}");
            WavPlayerError::from(e)
        })?;
        check_status(op, reply.result)?;
        let handle = reply.handle().ok_or_else(|| {
            let e = CallError::MalformedReply {
                kind: CallKind::Start,
                reason: "missing handle".to_string(),
            };
            tracing::error!(op, session = %conn.id(), "{e}");
            WavPlayerError::from(e)
        })?;
        conn.set_remote_handle(handle);
        Ok(handle)
    }
}

impl<C: Connector> Drop for WavPlayer<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
