/// Kiosk configuration
use crate::error::{KioskError, Result};
use serde::{Deserialize, Serialize};
use signage_playback::{parse_playlist, EngineConfig, SlideRecord};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KioskSettings {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default = "default_playlist")]
    pub playlist: PlaylistSettings,

    #[serde(default = "default_simulation")]
    pub simulation: SimulationSettings,

    #[serde(default = "default_log")]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaylistSettings {
    /// Playlist document; the built-in offline slide is shown when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Base for relative slide locators
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// Length of every simulated (non-live) clip
    #[serde(default = "default_clip_seconds")]
    pub clip_seconds: f64,

    /// Whether the simulated display lets video start with sound
    #[serde(default)]
    pub allow_sound_autoplay: bool,

    /// Whether the simulated media element plays HLS without an adapter
    #[serde(default)]
    pub native_hls: bool,

    /// Host tick cadence
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,

    #[serde(default)]
    pub start_index: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogSettings {
    /// Entries kept by the in-memory diagnostic log
    #[serde(default = "default_log_capacity")]
    pub capacity: usize,
}

impl KioskSettings {
    /// Load configuration from file and environment
    ///
    /// Without an explicit path, `signage.toml` in the working directory is
    /// used when present. Environment variables prefixed with `SIGNAGE_`
    /// override file values; nested keys use `__`
    /// (`SIGNAGE_ENGINE__STALL_THRESHOLD_MS=10000`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        let config_path = path.map_or_else(|| PathBuf::from("signage.toml"), Path::to_path_buf);
        if config_path.exists() {
            info!(path = %config_path.display(), "Loading configuration");
            settings = settings.add_source(config::File::from(config_path));
        } else if path.is_some() {
            return Err(KioskError::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("SIGNAGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| KioskError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| KioskError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;

        if !self.simulation.clip_seconds.is_finite() || self.simulation.clip_seconds <= 0.0 {
            return Err(KioskError::Config(format!(
                "simulation.clip_seconds must be positive, got {}",
                self.simulation.clip_seconds
            )));
        }

        if self.simulation.step_ms == 0 {
            return Err(KioskError::Config(
                "simulation.step_ms must be at least 1".to_string(),
            ));
        }

        if self.log.capacity == 0 {
            return Err(KioskError::Config(
                "log.capacity must be at least 1".to_string(),
            ));
        }

        self.base_url()?;
        Ok(())
    }

    pub fn base_url(&self) -> Result<Option<Url>> {
        self.playlist
            .base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(KioskError::from)
    }

    /// Read and normalize the configured playlist
    pub fn load_playlist(&self) -> Result<Vec<SlideRecord>> {
        let Some(path) = &self.playlist.path else {
            info!("No playlist configured, showing the offline slide");
            return Ok(offline_playlist());
        };

        let json = std::fs::read_to_string(path)?;
        let base = self.base_url()?;
        let records = parse_playlist(&json, base.as_ref())?;

        if records.is_empty() {
            warn!(path = %path.display(), "Playlist has no displayable slides");
        } else {
            info!(path = %path.display(), slides = records.len(), "Playlist loaded");
        }
        Ok(records)
    }
}

/// Shown when no playlist has been configured
pub fn offline_playlist() -> Vec<SlideRecord> {
    vec![SlideRecord::image("local-slide", "slide-offline.png")
        .with_title("Local Slide")
        .with_media_type("image/png")
        .with_duration(5.0)]
}

// Default values
fn default_playlist() -> PlaylistSettings {
    PlaylistSettings {
        path: None,
        base_url: None,
    }
}

fn default_simulation() -> SimulationSettings {
    SimulationSettings {
        clip_seconds: default_clip_seconds(),
        allow_sound_autoplay: false,
        native_hls: false,
        step_ms: default_step_ms(),
        start_index: 0,
    }
}

fn default_clip_seconds() -> f64 {
    30.0
}

fn default_step_ms() -> u64 {
    100
}

fn default_log() -> LogSettings {
    LogSettings {
        capacity: default_log_capacity(),
    }
}

fn default_log_capacity() -> usize {
    500
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            playlist: default_playlist(),
            simulation: default_simulation(),
            log: default_log(),
        }
    }
}
