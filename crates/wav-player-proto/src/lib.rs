//! Shared protocol primitives for the `wav-player` client and the sound service.
//!
//! Every unit on the wire is a single JSON object terminated by one NUL byte.
//! Units are written back to back with no other delimiter, so a reader finds
//! boundaries by scanning for the terminator.
//!
//! Unit shapes:
//! - request: `{"tag": <call>, ...fields}`
//! - reply:   `{"tag": <call>, "result": <status>, ...output fields}`
//! - event:   `{"tag": -1, "event": <event type>}`
//!
//! Call tags are `1` (start) and `2` (stop). The event tag is a sentinel that
//! never names a call.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

mod buffer;
mod parser;

pub use buffer::{DEFAULT_READ_QUANTUM, MessageBuffer};
pub use parser::{ParseResult, decode_unit, parse_unit};

/// Byte that ends every unit.
pub const TERMINATOR: u8 = 0;

/// Tag value carried by asynchronous event units.
pub const EVENT_TAG: i64 = -1;

/// Request categories understood by the sound service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Start,
    Stop,
}

impl CallKind {
    pub const ALL: [CallKind; 2] = [CallKind::Start, CallKind::Stop];

    /// Wire tag for this call.
    pub fn tag(self) -> i64 {
        match self {
            CallKind::Start => 1,
            CallKind::Stop => 2,
        }
    }

    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            1 => Some(CallKind::Start),
            2 => Some(CallKind::Stop),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CallKind::Start => "start",
            CallKind::Stop => "stop",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unsolicited notifications pushed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Playback ran to the end (all loops done).
    PlaybackCompleted,
}

impl EventKind {
    pub fn code(self) -> i64 {
        match self {
            EventKind::PlaybackCompleted => 1,
        }
    }

    pub fn from_code(code: i64) -> io::Result<Self> {
        match code {
            1 => Ok(EventKind::PlaybackCompleted),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown event type {code}"),
            )),
        }
    }
}

/// Result code carried by every reply unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ServiceStatus {
    Ok,
    InvalidArgument,
    InvalidPointer,
    Internal,
    /// The service could not decode the file.
    UnsupportedMediaType,
    /// Stream policy rejected the request.
    UnsupportedStreamType,
    Unknown(i32),
}

impl From<i32> for ServiceStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => ServiceStatus::Ok,
            1 => ServiceStatus::InvalidArgument,
            2 => ServiceStatus::InvalidPointer,
            3 => ServiceStatus::Internal,
            4 => ServiceStatus::UnsupportedMediaType,
            5 => ServiceStatus::UnsupportedStreamType,
            other => ServiceStatus::Unknown(other),
        }
    }
}

impl From<ServiceStatus> for i32 {
    fn from(status: ServiceStatus) -> Self {
        match status {
            ServiceStatus::Ok => 0,
            ServiceStatus::InvalidArgument => 1,
            ServiceStatus::InvalidPointer => 2,
            ServiceStatus::Internal => 3,
            ServiceStatus::UnsupportedMediaType => 4,
            ServiceStatus::UnsupportedStreamType => 5,
            ServiceStatus::Unknown(code) => code,
        }
    }
}

/// Where the service should route a playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaybackRoute {
    /// Legacy volume-type routing (`"media"`, `"alarm"`, ...).
    SoundType { sound_type: String },
    /// Stream-policy routing by stream type and stream index.
    Stream {
        stream_type: String,
        stream_index: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    /// Absolute path of the file to play.
    pub path: String,
    pub route: PlaybackRoute,
    /// Number of times to play the file, `0` meaning forever.
    pub loop_count: u32,
    pub client_pid: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRequest {
    /// Service-side playback handle from the start reply.
    pub handle: i64,
}

/// A request unit ready to be framed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Start(StartRequest),
    Stop(StopRequest),
}

impl Request {
    pub fn kind(&self) -> CallKind {
        match self {
            Request::Start(_) => CallKind::Start,
            Request::Stop(_) => CallKind::Stop,
        }
    }
}

/// A reply unit: a result code plus whatever output fields the call produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub result: ServiceStatus,
    pub fields: Map<String, Value>,
}

impl Reply {
    pub fn new(result: ServiceStatus) -> Self {
        Self {
            result,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Service-side playback handle (start replies only).
    pub fn handle(&self) -> Option<i64> {
        self.fields.get("handle").and_then(Value::as_i64)
    }
}

/// One decoded inbound unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Unit {
    Reply { kind: CallKind, reply: Reply },
    Event(EventKind),
}

#[derive(Serialize)]
struct Tagged<'a, T> {
    tag: i64,
    #[serde(flatten)]
    body: &'a T,
}

fn frame<T: Serialize>(tag: i64, body: &T) -> io::Result<Vec<u8>> {
    let mut out = serde_json::to_vec(&Tagged { tag, body })?;
    out.push(TERMINATOR);
    Ok(out)
}

/// Encode a request into a framed unit (JSON + terminator).
pub fn encode_request(request: &Request) -> io::Result<Vec<u8>> {
    let tag = request.kind().tag();
    match request {
        Request::Start(body) => frame(tag, body),
        Request::Stop(body) => frame(tag, body),
    }
}

/// Encode a reply unit for `kind`.
pub fn encode_reply(kind: CallKind, reply: &Reply) -> io::Result<Vec<u8>> {
    let mut body = reply.fields.clone();
    body.insert("result".to_string(), Value::from(i32::from(reply.result)));
    frame(kind.tag(), &body)
}

/// Encode an event unit.
pub fn encode_event(event: EventKind) -> io::Result<Vec<u8>> {
    #[derive(Serialize)]
    struct EventBody {
        event: i64,
    }
    frame(EVENT_TAG, &EventBody { event: event.code() })
}

/// Decode a request from message bytes (terminator already stripped).
pub fn decode_request(message: &[u8]) -> io::Result<Request> {
    let mut object: Map<String, Value> = serde_json::from_slice(message)?;
    let tag = take_tag(&mut object)?;
    let kind = CallKind::from_tag(tag).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, format!("unknown call tag {tag}"))
    })?;
    let body = Value::Object(object);
    let request = match kind {
        CallKind::Start => Request::Start(serde_json::from_value(body)?),
        CallKind::Stop => Request::Stop(serde_json::from_value(body)?),
    };
    Ok(request)
}

pub(crate) fn take_tag(object: &mut Map<String, Value>) -> io::Result<i64> {
    object
        .remove("tag")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing integer tag"))
}
