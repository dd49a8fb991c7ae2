//! Caller inputs checked before any I/O: sound types, stream info, paths.

use std::path::{Path, PathBuf};

use crate::error::{Result, WavPlayerError};

/// Longest absolute path accepted, in bytes.
pub const PATH_MAX: usize = 4096;

/// Legacy volume-type routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundType {
    System,
    Notification,
    Alarm,
    Ringtone,
    Media,
    Call,
    Voip,
    Voice,
}

impl SoundType {
    pub const ALL: [SoundType; 8] = [
        SoundType::System,
        SoundType::Notification,
        SoundType::Alarm,
        SoundType::Ringtone,
        SoundType::Media,
        SoundType::Call,
        SoundType::Voip,
        SoundType::Voice,
    ];

    /// Name sent to the service.
    pub fn name(self) -> &'static str {
        match self {
            SoundType::System => "system",
            SoundType::Notification => "notification",
            SoundType::Alarm => "alarm",
            SoundType::Ringtone => "ringtone",
            SoundType::Media => "media",
            SoundType::Call => "call",
            SoundType::Voip => "voip",
            SoundType::Voice => "voice",
        }
    }
}

impl TryFrom<i32> for SoundType {
    type Error = WavPlayerError;

    fn try_from(raw: i32) -> Result<Self> {
        usize::try_from(raw)
            .ok()
            .and_then(|idx| SoundType::ALL.get(idx).copied())
            .ok_or_else(|| {
                WavPlayerError::InvalidParameter(format!("sound type {raw} out of range"))
            })
    }
}

/// Stream types the service will not play wav files on.
const WAV_UNAVAILABLE_STREAM_TYPES: &[&str] = &["voip", "voice-recognition"];

/// Stream-policy routing: a stream type plus the policy-assigned index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    stream_type: String,
    index: i32,
}

impl StreamInfo {
    pub fn new(stream_type: impl Into<String>, index: i32) -> Self {
        Self {
            stream_type: stream_type.into(),
            index,
        }
    }

    pub fn stream_type(&self) -> &str {
        &self.stream_type
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    /// Whether wav playback may use this stream.
    pub fn is_available_for_wav(&self) -> bool {
        !WAV_UNAVAILABLE_STREAM_TYPES.contains(&self.stream_type.as_str())
    }
}

/// Resolve `path` to the absolute form sent to the service.
///
/// Relative paths are joined onto the current working directory.
pub(crate) fn normalize_path(path: &Path) -> Result<String> {
    if path.as_os_str().is_empty() {
        return Err(WavPlayerError::InvalidParameter("empty path".to_string()));
    }
    let absolute: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|e| {
            WavPlayerError::InvalidOperation(format!("resolve working directory: {e}"))
        })?;
        cwd.join(path)
    };
    let Some(text) = absolute.to_str() else {
        return Err(WavPlayerError::InvalidParameter(format!(
            "path is not valid UTF-8: {}",
            absolute.display()
        )));
    };
    if text.contains('\0') {
        return Err(WavPlayerError::InvalidParameter("path contains NUL".to_string()));
    }
    if text.len() > PATH_MAX {
        return Err(WavPlayerError::InvalidParameter(format!(
            "path longer than {PATH_MAX} bytes"
        )));
    }
    Ok(text.to_string())
}
