/// Kiosk error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KioskError>;

#[derive(Debug, Error)]
pub enum KioskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Playback error: {0}")]
    Playback(#[from] signage_playback::PlaybackError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}
