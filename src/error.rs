//! Error types for the media listener

use crate::platform::PlayerId;
use thiserror::Error;

/// Result type alias for listener operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while registering or simulating playback
#[derive(Error, Debug)]
pub enum Error {
    /// Trigger or listener configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The host could not parse a player selector
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// The host does not own a player with this handle
    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),

    /// Registration attempted on a listener that has been destroyed
    #[error("Listener has been destroyed")]
    Destroyed,
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}
