//! Error taxonomy returned by the public player operations.

use std::io;
use std::time::Duration;

use wav_player_proto::{CallKind, ServiceStatus};

/// Errors returned by [`crate::WavPlayer`] operations.
#[derive(Debug, thiserror::Error)]
pub enum WavPlayerError {
    /// Bad caller input, rejected before any I/O.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Transport, allocation or protocol failure, reply timeout, or unknown session.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// The service could not decode the file.
    #[error("format not supported")]
    FormatNotSupported,
    /// The stream type was rejected by policy.
    #[error("stream type not supported")]
    NotSupportedType,
}

/// Coarse classification of [`WavPlayerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidParameter,
    InvalidOperation,
    FormatNotSupported,
    NotSupportedType,
}

impl WavPlayerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WavPlayerError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            WavPlayerError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            WavPlayerError::FormatNotSupported => ErrorKind::FormatNotSupported,
            WavPlayerError::NotSupportedType => ErrorKind::NotSupportedType,
        }
    }
}

pub type Result<T> = std::result::Result<T, WavPlayerError>;

/// Failures of a single request/reply exchange on one connection.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CallError {
    #[error("{kind} request write failed: {source}")]
    Write {
        kind: CallKind,
        #[source]
        source: io::Error,
    },
    #[error("{kind} request encoding failed: {source}")]
    Encode {
        kind: CallKind,
        #[source]
        source: io::Error,
    },
    #[error("no {kind} reply within {timeout:?}")]
    Timeout { kind: CallKind, timeout: Duration },
    #[error("connection closed while waiting for {kind} reply")]
    ConnectionClosed { kind: CallKind },
    #[error("malformed {kind} reply: {reason}")]
    MalformedReply { kind: CallKind, reason: String },
}

impl From<CallError> for WavPlayerError {
    fn from(e: CallError) -> Self {
        WavPlayerError::InvalidOperation(e.to_string())
    }
}

/// Map a reply status onto the public taxonomy, logging every failure.
pub(crate) fn check_status(op: &str, status: ServiceStatus) -> Result<()> {
    let err = match status {
        ServiceStatus::Ok => return Ok(()),
        ServiceStatus::InvalidArgument | ServiceStatus::InvalidPointer => {
            WavPlayerError::InvalidParameter(format!("service rejected {op} arguments"))
        }
        ServiceStatus::Internal => {
            WavPlayerError::InvalidOperation(format!("service failed {op}"))
        }
        ServiceStatus::UnsupportedMediaType => WavPlayerError::FormatNotSupported,
        ServiceStatus::UnsupportedStreamType => WavPlayerError::NotSupportedType,
        ServiceStatus::Unknown(code) => {
            WavPlayerError::InvalidOperation(format!("service returned unknown code {code}"))
        }
    };
    tracing::error!(
        op,
        code = i32::from(status),
        kind = ?err.kind(),
        "{err}"
    );
    Err(err)
}
