//! Error types for seek and position control

use thiserror::Error;

/// Playback errors
///
/// Public seek operations never return these to UI callers. They surface
/// from the audio engine adapter and from configuration loading, and the
/// controller logs and absorbs them.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The audio engine rejected a call
    #[error("Audio engine error: {0}")]
    Engine(String),

    /// Chapter index outside the loaded chapter list
    #[error("Invalid chapter index: {0}")]
    InvalidChapterIndex(usize),

    /// Position that is not a finite number of seconds
    #[error("Invalid position: {0}")]
    InvalidPosition(f64),

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for PlaybackError {
    fn from(err: config::ConfigError) -> Self {
        PlaybackError::Config(err.to_string())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
