//! Client for an out-of-process wav playback service.
//!
//! Each playback runs over its own socket connection. A start request is
//! answered synchronously with a reply; the completion of the playback is
//! pushed later as an event and delivered through [`OnComplete`].

pub mod config;
mod connection;
mod driver;
pub mod error;
mod params;
mod player;
mod receiver;
mod registry;
mod reply_queue;
#[cfg(test)]
mod test_support;
mod transport;

pub use config::PlayerConfig;
pub use connection::{OnComplete, PlaybackCompleted};
pub use error::{ErrorKind, Result, WavPlayerError};
pub use params::{PATH_MAX, SoundType, StreamInfo};
pub use player::WavPlayer;
pub use registry::SessionId;
pub use transport::{Connector, UnixConnector};
