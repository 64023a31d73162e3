//! Error types for slide playback

use thiserror::Error;

/// Playback errors
///
/// None of these stop the show: the playback path logs and degrades.
/// They surface from setup calls (config, playlist parsing) and from
/// the injected platform capabilities.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Engine configuration rejected by `EngineConfig::validate`
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Playlist document could not be decoded
    #[error("Playlist parse error: {0}")]
    Playlist(#[from] serde_json::Error),

    /// Segmented-streaming adapter could not be loaded
    #[error("Streaming adapter unavailable: {0}")]
    AdapterUnavailable(String),

    /// Media primitive refused an operation outright
    #[error("Media primitive error: {0}")]
    Primitive(String),

    /// Platform volume service failed
    #[error("System audio error: {0}")]
    SystemAudio(String),

    /// Log store rejected an entry
    #[error("Log sink error: {0}")]
    Sink(String),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
