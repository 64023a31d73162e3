//! Platform-agnostic media traits
//!
//! The engine never decodes anything itself. The host supplies:
//! - a [`MediaBackend`] that creates one [`MediaPrimitive`] per video slide
//!   and, when asked, loads a [`StreamAdapter`] for HLS
//! - optionally a [`SystemAudio`] volume service
//!
//! Primitive notifications come back in through [`MediaEvent`].

use crate::error::{PlaybackError, Result};
use crate::types::AdapterConfig;

/// MIME types identifying an HLS manifest
pub const HLS_MIME_TYPES: [&str; 2] = ["application/vnd.apple.mpegurl", "application/x-mpegurl"];

/// Notifications from the media primitive (or an attached adapter)
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata,
    CanPlay,
    Play,
    Pause,
    Progress,
    VolumeChange,
    /// Details are read back through [`MediaPrimitive::error_code`]
    Error,
    Waiting,
    Stalled,
    Ended,
    Resize,

    /// The last `play()` request started playback
    PlayResolved,

    /// The last `play()` request was refused (e.g. autoplay policy)
    PlayRejected { reason: String },

    /// Error reported by the streaming adapter
    AdapterError { fatal: bool, details: String },
}

/// Single decode/render unit driven by a video controller
///
/// Times are in seconds, matching what media elements report.
pub trait MediaPrimitive {
    /// Point the primitive at a new source and start loading it
    fn set_source(&mut self, src: &str, media_type: Option<&str>);

    /// Request playback
    ///
    /// The outcome is delivered later as [`MediaEvent::PlayResolved`] or
    /// [`MediaEvent::PlayRejected`]. An `Err` means the request could not
    /// even be issued and counts as a rejection.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, seconds: f64);

    /// Total duration; NaN or infinite while unknown or for live streams
    fn duration(&self) -> f64;

    fn volume(&self) -> f64;

    /// Volume in [0.0, 1.0]
    fn set_volume(&mut self, volume: f64);

    fn muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    /// Intrinsic (width, height) once metadata is loaded
    fn video_size(&self) -> Option<(u32, u32)>;

    /// End of the last buffered range, in seconds
    fn buffered_end(&self) -> f64 {
        0.0
    }

    /// Native error code of the last error, if any
    fn error_code(&self) -> Option<u16>;

    /// Whether the primitive can decode this MIME type natively
    fn can_play_type(&self, mime: &str) -> bool;
}

/// Segmented-streaming adapter feeding a manifest into a primitive
pub trait StreamAdapter {
    fn is_supported(&self) -> bool;

    fn load_source(&mut self, url: &str);

    fn attach_media(&mut self, media: &mut dyn MediaPrimitive);

    /// Release everything; called exactly once when the slide is left
    fn destroy(&mut self);
}

/// Platform volume service
pub trait SystemAudio {
    fn set_muted(&mut self, muted: bool) -> Result<()>;

    /// Volume level 0-100
    fn set_volume(&mut self, level: u8) -> Result<()>;
}

/// Factory for per-slide media resources
pub trait MediaBackend {
    /// Create a fresh primitive for one video slide activation
    fn create_primitive(&mut self) -> Box<dyn MediaPrimitive>;

    /// Load the streaming adapter
    ///
    /// Only called for HLS sources the primitive cannot play natively.
    fn load_stream_adapter(&mut self, config: &AdapterConfig) -> Result<Box<dyn StreamAdapter>> {
        let _ = config;
        Err(PlaybackError::AdapterUnavailable(
            "no streaming adapter on this platform".to_string(),
        ))
    }
}

/// Whether a primitive plays HLS without an adapter
pub fn supports_native_hls(primitive: &dyn MediaPrimitive) -> bool {
    HLS_MIME_TYPES
        .iter()
        .any(|mime| primitive.can_play_type(mime))
}
