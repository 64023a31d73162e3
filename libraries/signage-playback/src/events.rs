//! Slideshow events
//!
//! Event-based communication for UI synchronization. The scheduler queues
//! events as they happen; the host drains them once per frame with
//! `Slideshow::drain_events`.

use crate::record::SlideKind;
use crate::types::{AutoplayMode, MediaErrorKind};
use serde::{Deserialize, Serialize};

/// Why the active slide changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeCause {
    /// Slideshow mounted or restarted on its first slide
    Start,

    /// Image/text display time elapsed
    Timer,

    /// Video reached its natural end
    VideoEnded,

    /// Watchdog saw no progress for the stall threshold
    VideoStalled,

    /// Video exceeded the hard ceiling
    VideoCeiling,

    /// Operator pressed previous/next
    Navigation,

    /// Playlist was replaced and the active slide differs
    PlaylistReplaced,
}

/// Events emitted by the slideshow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SlideshowEvent {
    /// A new slide became active
    SlideChanged {
        index: usize,
        slide_id: String,
        kind: SlideKind,
        cause: ChangeCause,
    },

    /// Playlist replaced
    PlaylistChanged {
        /// New playlist length
        length: usize,
    },

    /// Playlist has no entries; nothing is scheduled
    PlaylistEmpty,

    /// Pause toggled
    PauseChanged { paused: bool },

    /// Host should leave the playback view
    ExitRequested,

    /// Video autoplay negotiation moved to a new mode
    AutoplayChanged { slide_id: String, mode: AutoplayMode },

    /// Video reported a media error (playback is not interrupted)
    MediaError {
        slide_id: String,
        error: MediaErrorKind,
    },

    /// Image asset failed to decode (the slide still advances on schedule)
    ImageFailed { slide_id: String },
}
