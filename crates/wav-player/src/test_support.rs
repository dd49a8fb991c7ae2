//! Scripted in-process sound service for tests.

use std::io::{self, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use wav_player_proto::{
    CallKind, EventKind, MessageBuffer, Reply, Request, ServiceStatus, TERMINATOR, decode_request,
    encode_event, encode_reply,
};

use crate::{Connector, PlayerConfig, WavPlayer};

/// How the fake service answers requests.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Script {
    /// Accept every request.
    Serve,
    /// Read requests, never answer.
    Silent,
    /// Hang up after the first request.
    HangUp,
    /// Answer every request with this status.
    Reject(ServiceStatus),
    /// Answer start with the reply and a completion event in one write.
    ReplyThenComplete,
    /// Answer stop with a completion event followed by the reply, in one write.
    CompleteOnStop,
}

struct Shared {
    script: Script,
    connections: AtomicUsize,
    next_handle: AtomicI64,
    peers: Mutex<Vec<UnixStream>>,
    requests: Sender<Request>,
}

pub(crate) struct FakeService {
    shared: Arc<Shared>,
    requests: Receiver<Request>,
}

impl FakeService {
    pub(crate) fn new(script: Script) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            shared: Arc::new(Shared {
                script,
                connections: AtomicUsize::new(0),
                next_handle: AtomicI64::new(100),
                peers: Mutex::new(Vec::new()),
                requests: tx,
            }),
            requests: rx,
        }
    }

    pub(crate) fn player(&self, reply_timeout: Duration) -> WavPlayer<PairConnector> {
        let config = PlayerConfig {
            reply_timeout,
            ..PlayerConfig::default()
        };
        WavPlayer::with_connector(
            config,
            PairConnector {
                shared: self.shared.clone(),
            },
        )
    }

    pub(crate) fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    pub(crate) fn next_request(&self) -> Request {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("service saw no request")
    }

    /// Push an event on the most recently opened connection.
    pub(crate) fn send_event(&self, event: EventKind) {
        let peers = self.shared.peers.lock().unwrap();
        let mut peer = peers.last().expect("no connection");
        peer.write_all(&encode_event(event).unwrap()).unwrap();
    }
}

/// Connects each session to a fresh socket pair served by a service thread.
pub(crate) struct PairConnector {
    shared: Arc<Shared>,
}

impl Connector for PairConnector {
    fn connect(&self) -> io::Result<UnixStream> {
        let (local, peer) = UnixStream::pair()?;
        self.shared.connections.fetch_add(1, Ordering::SeqCst);
        self.shared.peers.lock().unwrap().push(peer.try_clone()?);
        let shared = self.shared.clone();
        std::thread::spawn(move || serve(&shared, peer));
        Ok(local)
    }
}

fn serve(shared: &Shared, mut stream: UnixStream) {
    let mut buf = MessageBuffer::default();
    loop {
        match buf.read_from(&mut stream) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        while let Some(pos) = buf.pending().iter().position(|&b| b == TERMINATOR) {
            let request = decode_request(&buf.pending()[..pos]).expect("client sent bad request");
            buf.consume(pos + 1);
            let kind = request.kind();
            let _ = shared.requests.send(request);

            let out = match shared.script {
                Script::Silent => continue,
                Script::HangUp => {
                    let _ = stream.shutdown(Shutdown::Both);
                    return;
                }
                Script::Reject(status) => encode_reply(kind, &Reply::new(status)),
                Script::Serve => encode_reply(kind, &accept(shared, kind)),
                Script::ReplyThenComplete => {
                    let mut out = encode_reply(kind, &accept(shared, kind)).unwrap();
                    if kind == CallKind::Start {
                        out.extend(encode_event(EventKind::PlaybackCompleted).unwrap());
                    }
                    Ok(out)
                }
                Script::CompleteOnStop if kind == CallKind::Stop => {
                    let mut out = encode_event(EventKind::PlaybackCompleted).unwrap();
                    out.extend(encode_reply(kind, &accept(shared, kind)).unwrap());
                    Ok(out)
                }
                Script::CompleteOnStop => encode_reply(kind, &accept(shared, kind)),
            };
            if stream.write_all(&out.unwrap()).is_err() {
                return;
            }
        }
    }
}

fn accept(shared: &Shared, kind: CallKind) -> Reply {
    let reply = Reply::new(ServiceStatus::Ok);
    match kind {
        CallKind::Start => {
            reply.with_field("handle", shared.next_handle.fetch_add(1, Ordering::SeqCst))
        }
        CallKind::Stop => reply,
    }
}
