//! Signage Playback - Slideshow Orchestration
//!
//! Platform-agnostic playback engine for unattended signage displays.
//!
//! This crate provides:
//! - Slide scheduling (wrap-around navigation, pause, per-slide timers)
//! - Video playback control (autoplay negotiation, muted fallback, unmute)
//! - Stall watchdog and hard ceiling for videos that never end
//! - HLS support through an injected streaming adapter
//! - Playlist normalization (kind classification, duration sanitization)
//! - Diagnostic log sink
//!
//! # Architecture
//!
//! `signage-playback` never renders or decodes anything:
//! - No dependency on a windowing system or browser
//! - No threads, no async runtime, no wall clock in the playback path
//! - Works under any host event loop that can report monotonic time
//!
//! Platform-specific code (media elements, streaming adapters, system volume)
//! is provided via traits. The host forwards media events and input into the
//! [`Slideshow`], calls [`Slideshow::tick`] by [`Slideshow::next_deadline`],
//! and renders [`Slideshow::presentation`].
//!
//! # Example: Image Slideshow
//!
//! ```rust
//! use signage_playback::{EngineConfig, MediaBackend, MediaPrimitive, SlideRecord, Slideshow};
//! use std::time::Duration;
//!
//! # struct NoVideo;
//! # impl MediaBackend for NoVideo {
//! #     fn create_primitive(&mut self) -> Box<dyn MediaPrimitive> { unreachable!() }
//! # }
//! let mut show = Slideshow::new(EngineConfig::default(), Box::new(NoVideo)).unwrap();
//!
//! show.start(
//!     vec![
//!         SlideRecord::image("welcome", "https://cdn.example/welcome.png"),
//!         SlideRecord::image("menu", "https://cdn.example/menu.jpg").with_duration(7.0),
//!     ],
//!     0,
//!     Duration::ZERO,
//! );
//!
//! // Default image duration is 5 seconds
//! assert_eq!(show.next_deadline(), Some(Duration::from_secs(5)));
//! show.tick(Duration::from_secs(5));
//! assert_eq!(show.index(), 1);
//! ```
//!
//! # Example: Playlist Document
//!
//! ```rust
//! use signage_playback::{parse_playlist, SlideKind};
//! use url::Url;
//!
//! let base = Url::parse("https://cdn.example/signage/").unwrap();
//! let slides = parse_playlist(
//!     r#"{"items": [
//!         {"id": "promo", "type": "video/mp4", "src": "promo.mp4"},
//!         {"src": "poster.jpg", "durationMs": 8000}
//!     ]}"#,
//!     Some(&base),
//! )
//! .unwrap();
//!
//! assert_eq!(slides[0].kind, SlideKind::Video);
//! assert_eq!(slides[0].src, "https://cdn.example/signage/promo.mp4");
//! assert_eq!(slides[1].duration, Some(8.0));
//! ```

mod clock;
mod controller;
mod error;
pub mod events;
pub mod input;
pub mod media;
mod playlist;
pub mod record;
mod scheduler;
pub mod sink;
pub mod types;
mod watchdog;

// Public exports
pub use clock::ClockTimer;
pub use controller::{VideoController, VideoOutcome, VideoState};
pub use error::{PlaybackError, Result};
pub use events::{ChangeCause, SlideshowEvent};
pub use input::{InputEvent, Intent, Key};
pub use media::{MediaBackend, MediaEvent, MediaPrimitive, StreamAdapter, SystemAudio};
pub use playlist::parse_playlist;
pub use record::{classify, Fit, SlideKind, SlideRecord};
pub use scheduler::{Advancement, ImageEvent, Presentation, Slideshow};
pub use sink::{LogEntry, LogSink, MemoryLogSink, StoredLogEntry};
pub use types::{AdapterConfig, AutoplayMode, DisplayProfile, EngineConfig, MediaErrorKind};
pub use watchdog::{StallWatchdog, WatchdogVerdict};
