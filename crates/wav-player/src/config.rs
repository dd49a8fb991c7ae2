//! Client configuration.
//!
//! Defaults work without a file; a TOML file can override any field.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, WavPlayerError};

/// Default sound service socket.
pub const DEFAULT_SOCKET_PATH: &str = "/run/sound/wav-player.sock";
/// Bound on every reply wait.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Tuning and endpoint settings for [`crate::WavPlayer`].
#[derive(Clone, Debug)]
pub struct PlayerConfig {
    /// Unix socket of the sound service.
    pub socket_path: PathBuf,
    /// How long a call waits for its reply.
    pub reply_timeout: Duration,
    /// Receive buffer growth step in bytes.
    pub read_quantum: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            read_quantum: wav_player_proto::DEFAULT_READ_QUANTUM,
        }
    }
}

/// On-disk shape; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlayerConfigFile {
    socket_path: Option<PathBuf>,
    reply_timeout_ms: Option<u64>,
    read_quantum: Option<usize>,
}

impl PlayerConfig {
    /// Load configuration from a TOML file, filling gaps with defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            WavPlayerError::InvalidParameter(format!("read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&raw).map_err(|e| match e {
            WavPlayerError::InvalidParameter(msg) => {
                WavPlayerError::InvalidParameter(format!("config {}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let file: PlayerConfigFile = toml::from_str(raw)
            .map_err(|e| WavPlayerError::InvalidParameter(format!("parse config: {e}")))?;
        let mut cfg = Self::default();
        if let Some(path) = file.socket_path {
            cfg.socket_path = path;
        }
        if let Some(ms) = file.reply_timeout_ms {
            if ms == 0 {
                return Err(WavPlayerError::InvalidParameter(
                    "reply_timeout_ms must be positive".to_string(),
                ));
            }
            cfg.reply_timeout = Duration::from_millis(ms);
        }
        if let Some(quantum) = file.read_quantum {
            if quantum == 0 {
                return Err(WavPlayerError::InvalidParameter(
                    "read_quantum must be positive".to_string(),
                ));
            }
            cfg.read_quantum = quantum;
        }
        Ok(cfg)
    }
}
