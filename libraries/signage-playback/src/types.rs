//! Core types for playback orchestration

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Display deployment profile
///
/// Selects the fallback slide duration when a record carries none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayProfile {
    /// Desk or development display (5s slides)
    #[default]
    Local,

    /// Unattended kiosk display (7s slides)
    Kiosk,
}

impl DisplayProfile {
    /// Fallback duration for image and text slides
    pub fn default_slide_duration(self) -> Duration {
        match self {
            DisplayProfile::Local => Duration::from_secs(5),
            DisplayProfile::Kiosk => Duration::from_secs(7),
        }
    }
}

/// Autoplay negotiation state of a video slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoplayMode {
    /// First play attempt not yet resolved
    Pending,

    /// Playing with audio
    SoundGranted,

    /// Playing muted, waiting for an input gesture to request sound
    MutedFallback,

    /// Even muted playback was refused; retried on the next readiness event
    Blocked,
}

/// Media error taxonomy surfaced to the caller
///
/// Mapped from the primitive's native error code (1-4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "kebab-case")]
pub enum MediaErrorKind {
    #[error("MEDIA_ERR_ABORTED")]
    Aborted,

    #[error("MEDIA_ERR_NETWORK")]
    Network,

    #[error("MEDIA_ERR_DECODE")]
    Decode,

    #[error("MEDIA_ERR_SRC_NOT_SUPPORTED")]
    SrcNotSupported,

    /// Code outside the known range (0 when the primitive reported none)
    #[error("MediaError(code={0})")]
    Unknown(u16),
}

impl MediaErrorKind {
    /// Map a native error code
    pub fn from_code(code: Option<u16>) -> Self {
        match code {
            Some(1) => MediaErrorKind::Aborted,
            Some(2) => MediaErrorKind::Network,
            Some(3) => MediaErrorKind::Decode,
            Some(4) => MediaErrorKind::SrcNotSupported,
            Some(other) => MediaErrorKind::Unknown(other),
            None => MediaErrorKind::Unknown(0),
        }
    }
}

/// Configuration handed to the streaming adapter constructor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Start fetching segments as soon as the source is loaded (default: true)
    pub auto_start_load: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            auto_start_load: true,
        }
    }
}

/// Configuration for the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deployment profile (default: Local)
    pub profile: DisplayProfile,

    /// Overrides the profile's slide duration when set
    pub default_slide_duration_ms: Option<u64>,

    /// Watchdog sampling interval (default: 2000)
    pub watchdog_interval_ms: u64,

    /// Time without progress before a video is declared stalled (default: 8000)
    pub stall_threshold_ms: u64,

    /// Absolute cap on a single video slide (default: 10 minutes)
    pub video_ceiling_ms: u64,

    /// Try autoplay with audio first (default: true)
    pub start_with_sound: bool,

    /// Streaming adapter options
    pub adapter: AdapterConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: DisplayProfile::Local,
            default_slide_duration_ms: None,
            watchdog_interval_ms: 2_000,
            stall_threshold_ms: 8_000,
            video_ceiling_ms: 10 * 60 * 1_000,
            start_with_sound: true,
            adapter: AdapterConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Kiosk profile with otherwise default settings
    pub fn kiosk() -> Self {
        Self {
            profile: DisplayProfile::Kiosk,
            ..Self::default()
        }
    }

    /// Duration used for image/text slides without their own
    pub fn default_slide_duration(&self) -> Duration {
        self.default_slide_duration_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.profile.default_slide_duration())
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    pub fn stall_threshold(&self) -> Duration {
        Duration::from_millis(self.stall_threshold_ms)
    }

    pub fn video_ceiling(&self) -> Duration {
        Duration::from_millis(self.video_ceiling_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.default_slide_duration_ms == Some(0) {
            return Err(PlaybackError::InvalidConfig(
                "default_slide_duration_ms must be positive".to_string(),
            ));
        }

        if self.watchdog_interval_ms == 0 {
            return Err(PlaybackError::InvalidConfig(
                "watchdog_interval_ms must be positive".to_string(),
            ));
        }

        if self.stall_threshold_ms < self.watchdog_interval_ms {
            return Err(PlaybackError::InvalidConfig(format!(
                "stall_threshold_ms ({}) is shorter than watchdog_interval_ms ({})",
                self.stall_threshold_ms, self.watchdog_interval_ms
            )));
        }

        if self.video_ceiling_ms == 0 {
            return Err(PlaybackError::InvalidConfig(
                "video_ceiling_ms must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
