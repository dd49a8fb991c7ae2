//! Connection establishment.

use std::io;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

/// Opens a connected byte stream to the sound service.
///
/// Every playback session gets its own stream.
pub trait Connector: Send + Sync {
    fn connect(&self) -> io::Result<UnixStream>;
}

/// Connects to a Unix domain socket path.
#[derive(Clone, Debug)]
pub struct UnixConnector {
    path: PathBuf,
}

impl UnixConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Connector for UnixConnector {
    fn connect(&self) -> io::Result<UnixStream> {
        UnixStream::connect(&self.path).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("connect {}: {e}", self.path.display()),
            )
        })
    }
}
