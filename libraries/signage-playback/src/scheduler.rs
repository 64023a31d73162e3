//! Slide scheduler
//!
//! [`Slideshow`] is the single source of truth for what is on screen and
//! when it changes. It owns the playlist, the current index, the pause flag
//! and exactly one advancement mechanism for the active slide:
//! - image and text slides arm a [`ClockTimer`]
//! - video slides mount a [`VideoController`] and advance on its outcome
//!
//! The scheduler is driven by the host: every entry point takes the current
//! monotonic time, and [`Slideshow::next_deadline`] says when the next
//! [`Slideshow::tick`] is needed.

use crate::clock::ClockTimer;
use crate::controller::{unmute_system_audio, VideoController, VideoState};
use crate::error::Result;
use crate::events::{ChangeCause, SlideshowEvent};
use crate::input::{InputEvent, Intent};
use crate::media::{MediaBackend, MediaEvent, SystemAudio};
use crate::record::{Fit, SlideKind, SlideRecord};
use crate::sink::{Diagnostics, LogSink};
use crate::types::{AutoplayMode, EngineConfig, MediaErrorKind};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Decode outcome of the active image, reported by the host renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEvent {
    Loaded { width: u32, height: u32 },
    Failed,
}

/// Which advancement mechanism is armed for the active slide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advancement {
    /// Nothing armed (empty playlist, or image/text while paused)
    None,
    Clock,
    Video,
}

/// What the host should render right now
#[derive(Debug, Clone, Copy)]
pub enum Presentation<'a> {
    Empty,
    Image {
        record: &'a SlideRecord,
        /// Locator to show; `None` when the record has neither src nor poster
        src: Option<&'a str>,
        fit: Fit,
        failed: bool,
    },
    Text {
        record: &'a SlideRecord,
    },
    Video {
        record: &'a SlideRecord,
        state: &'a VideoState,
        autoplay: AutoplayMode,
        fit: Fit,
        show_unmute_hint: bool,
    },
}

/// Per-slide advancement mechanism; replacing it drops the previous one
enum Advancer {
    Idle,
    Clock(ClockTimer),
    Video(Box<VideoController>),
}

#[derive(Debug, Default)]
struct ImageStatus {
    fit: Option<Fit>,
    failed: bool,
}

/// Everything owned by the active slide
struct Activation {
    index: usize,
    slide_id: String,
    kind: SlideKind,
    advancer: Advancer,
    image: ImageStatus,
    published_mode: AutoplayMode,
    published_error: Option<MediaErrorKind>,
}

/// Slideshow scheduler
pub struct Slideshow {
    playlist: Vec<SlideRecord>,
    index: usize,
    paused: bool,
    config: EngineConfig,
    backend: Box<dyn MediaBackend>,
    system_audio: Option<Box<dyn SystemAudio>>,
    log: Diagnostics,
    active: Option<Activation>,
    pending_events: Vec<SlideshowEvent>,
}

impl Slideshow {
    /// Create an idle slideshow; call [`Slideshow::start`] to mount a playlist
    pub fn new(config: EngineConfig, backend: Box<dyn MediaBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            playlist: Vec::new(),
            index: 0,
            paused: false,
            config,
            backend,
            system_audio: None,
            log: Diagnostics::default(),
            active: None,
            pending_events: Vec::new(),
        })
    }

    /// Mirror lifecycle records into a diagnostic sink
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log = Diagnostics::new(Some(sink));
        self
    }

    /// Platform volume service used when the operator unmutes
    pub fn with_system_audio(mut self, audio: Box<dyn SystemAudio>) -> Self {
        self.system_audio = Some(audio);
        self
    }

    /// Mount a playlist and activate `start_index` (clamped)
    pub fn start(&mut self, playlist: Vec<SlideRecord>, start_index: usize, now: Duration) {
        self.log.set_now(now);
        self.active = None;
        self.playlist = playlist;
        self.index = clamp_index(start_index, self.playlist.len());

        info!(
            slides = self.playlist.len(),
            start = self.index,
            "Slideshow started"
        );
        self.log.info(json!({
            "event": "start",
            "length": self.playlist.len(),
            "index": self.index,
        }));
        self.pending_events.push(SlideshowEvent::PlaylistChanged {
            length: self.playlist.len(),
        });

        if self.playlist.is_empty() {
            self.report_empty();
        } else {
            self.activate(now, ChangeCause::Start);
        }
    }

    /// Replace the playlist
    ///
    /// The index is clamped. When the record now at the index is the one
    /// already showing, its activation is kept; otherwise the old mechanism
    /// is released and the new slide activated.
    pub fn set_playlist(&mut self, playlist: Vec<SlideRecord>, now: Duration) {
        self.log.set_now(now);
        let showing = self
            .active
            .as_ref()
            .and_then(|active| self.playlist.get(active.index))
            .cloned();

        self.playlist = playlist;
        self.index = clamp_index(self.index, self.playlist.len());

        self.log.info(json!({
            "event": "playlist",
            "length": self.playlist.len(),
            "index": self.index,
        }));
        self.pending_events.push(SlideshowEvent::PlaylistChanged {
            length: self.playlist.len(),
        });

        if self.playlist.is_empty() {
            self.active = None;
            self.report_empty();
            return;
        }

        let unchanged = showing
            .as_ref()
            .is_some_and(|old| same_content(old, &self.playlist[self.index]));
        if unchanged {
            if let Some(active) = self.active.as_mut() {
                active.index = self.index;
            }
            return;
        }

        self.activate(now, ChangeCause::PlaylistReplaced);
    }

    /// Advance to the next slide, wrapping around
    pub fn next(&mut self, now: Duration) {
        self.log.set_now(now);
        let len = self.playlist.len();
        if len == 0 {
            return;
        }
        self.index = (self.index + 1) % len;
        self.activate(now, ChangeCause::Navigation);
    }

    /// Go back one slide, wrapping around
    pub fn prev(&mut self, now: Duration) {
        self.log.set_now(now);
        let len = self.playlist.len();
        if len == 0 {
            return;
        }
        self.index = (self.index + len - 1) % len;
        self.activate(now, ChangeCause::Navigation);
    }

    pub fn toggle_pause(&mut self, now: Duration) {
        self.set_paused(!self.paused, now);
    }

    /// Suspend or resume automatic advancement
    ///
    /// Resuming an image/text slide arms a fresh full-duration timer. A video
    /// outcome latched during the pause is acted on immediately.
    pub fn set_paused(&mut self, paused: bool, now: Duration) {
        self.log.set_now(now);
        if self.paused == paused {
            return;
        }
        self.paused = paused;

        self.log.info(json!({
            "event": if paused { "pause-slideshow" } else { "resume-slideshow" },
            "index": self.index,
        }));
        self.pending_events
            .push(SlideshowEvent::PauseChanged { paused });

        let default = self.config.default_slide_duration();
        let mut latched = None;
        if let Some(active) = self.active.as_mut() {
            if let Advancer::Video(controller) = &active.advancer {
                latched = controller.outcome();
            } else if paused {
                active.advancer = Advancer::Idle;
            } else {
                let duration = self.playlist[active.index].display_duration(default);
                active.advancer = Advancer::Clock(ClockTimer::arm(now, duration));
            }
        }

        if paused {
            return;
        }
        if let Some(outcome) = latched {
            self.advance(now, outcome.into());
        }
    }

    /// Ask the host to leave the playback view
    pub fn exit(&mut self) {
        info!("Exit requested");
        self.log.info(json!({ "event": "exit", "index": self.index }));
        self.pending_events.push(SlideshowEvent::ExitRequested);
    }

    /// Release the active slide's timer or controller
    pub fn unmount(&mut self) {
        if self.active.take().is_some() {
            self.log.info(json!({ "event": "unmount", "index": self.index }));
        }
    }

    /// Drive timers, the video watchdog and the ceiling
    pub fn tick(&mut self, now: Duration) {
        self.log.set_now(now);
        let paused = self.paused;
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let cause = match &mut active.advancer {
            Advancer::Idle => None,
            Advancer::Clock(timer) => timer.is_due(now).then_some(ChangeCause::Timer),
            Advancer::Video(controller) => {
                controller.tick(now);
                if paused {
                    None
                } else {
                    controller.outcome().map(ChangeCause::from)
                }
            }
        };

        self.publish_video_changes();
        if let Some(cause) = cause {
            self.advance(now, cause);
        }
    }

    /// Deliver a primitive or adapter event to the active video
    pub fn handle_media_event(&mut self, event: MediaEvent, now: Duration) {
        self.log.set_now(now);
        let paused = self.paused;
        let Some(Activation {
            advancer: Advancer::Video(controller),
            ..
        }) = self.active.as_mut()
        else {
            debug!(?event, "Media event with no active video");
            return;
        };

        controller.handle_event(event, now);
        let cause = if paused {
            None
        } else {
            controller.outcome().map(ChangeCause::from)
        };

        self.publish_video_changes();
        if let Some(cause) = cause {
            self.advance(now, cause);
        }
    }

    /// Apply operator input
    ///
    /// Navigation and exit always act. Any other qualifying gesture is first
    /// offered to a muted video as an unmute request; only if it is not
    /// consumed there does the pause key toggle pause.
    pub fn handle_input(&mut self, input: InputEvent, now: Duration) {
        self.log.set_now(now);
        match input.intent() {
            Some(Intent::Previous) => self.prev(now),
            Some(Intent::Next) => self.next(now),
            Some(Intent::Exit) => self.exit(),
            intent => {
                if input.is_unmute_gesture() && self.offer_unmute_gesture(now) {
                    return;
                }
                if intent == Some(Intent::TogglePause) {
                    self.toggle_pause(now);
                }
            }
        }
    }

    /// Report the decode outcome of an image slide
    pub fn handle_image_event(&mut self, slide_id: &str, event: ImageEvent) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.kind != SlideKind::Image || active.slide_id != slide_id {
            debug!(slide = slide_id, "Ignoring image event for inactive slide");
            return;
        }

        match event {
            ImageEvent::Loaded { width, height } => {
                let requested = self.playlist[active.index].fit;
                let fit = Fit::for_image(requested, width, height);
                active.image.fit = Some(fit);
                self.log.info(json!({
                    "event": "image-loaded",
                    "slide": slide_id,
                    "width": width,
                    "height": height,
                    "fit": fit,
                }));
            }
            ImageEvent::Failed => {
                active.image.failed = true;
                self.log.error(json!({
                    "event": "image-error",
                    "slide": slide_id,
                    "src": self.playlist[active.index].display_src(),
                }));
                self.pending_events.push(SlideshowEvent::ImageFailed {
                    slide_id: slide_id.to_string(),
                });
            }
        }
    }

    /// When the host should call [`Slideshow::tick`] next
    pub fn next_deadline(&self) -> Option<Duration> {
        match &self.active.as_ref()?.advancer {
            Advancer::Idle => None,
            Advancer::Clock(timer) => Some(timer.deadline()),
            Advancer::Video(controller) => controller.next_deadline(),
        }
    }

    pub fn advancement(&self) -> Advancement {
        match self.active.as_ref().map(|active| &active.advancer) {
            None | Some(Advancer::Idle) => Advancement::None,
            Some(Advancer::Clock(_)) => Advancement::Clock,
            Some(Advancer::Video(_)) => Advancement::Video,
        }
    }

    /// Take all events queued since the last drain
    pub fn drain_events(&mut self) -> Vec<SlideshowEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn current(&self) -> Option<&SlideRecord> {
        self.playlist.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.playlist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlist.is_empty()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn playlist(&self) -> &[SlideRecord] {
        &self.playlist
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Controller of the active video slide
    pub fn video(&self) -> Option<&VideoController> {
        match &self.active.as_ref()?.advancer {
            Advancer::Video(controller) => Some(controller.as_ref()),
            _ => None,
        }
    }

    /// Operator controls (seek, volume, mute) of the active video slide
    pub fn video_mut(&mut self) -> Option<&mut VideoController> {
        match &mut self.active.as_mut()?.advancer {
            Advancer::Video(controller) => Some(controller.as_mut()),
            _ => None,
        }
    }

    pub fn presentation(&self) -> Presentation<'_> {
        let Some(active) = self.active.as_ref() else {
            return Presentation::Empty;
        };
        let Some(record) = self.playlist.get(active.index) else {
            return Presentation::Empty;
        };

        match (record.kind, &active.advancer) {
            (SlideKind::Video, Advancer::Video(controller)) => Presentation::Video {
                record,
                state: controller.state(),
                autoplay: controller.autoplay_mode(),
                fit: controller.fit(),
                show_unmute_hint: controller.show_unmute_hint(),
            },
            (SlideKind::Video, _) => Presentation::Empty,
            (SlideKind::Text, _) => Presentation::Text { record },
            (SlideKind::Image, _) => Presentation::Image {
                record,
                src: record.display_src(),
                fit: active.image.fit.unwrap_or(record.fit.unwrap_or_default()),
                failed: active.image.failed,
            },
        }
    }

    fn advance(&mut self, now: Duration, cause: ChangeCause) {
        let len = self.playlist.len();
        if len == 0 {
            return;
        }
        self.index = (self.index + 1) % len;
        self.activate(now, cause);
    }

    /// Tear down the active slide, then arm the slide at `self.index`
    fn activate(&mut self, now: Duration, cause: ChangeCause) {
        self.active = None;

        let Some(record) = self.playlist.get(self.index) else {
            return;
        };

        let advancer = match record.kind {
            SlideKind::Video => Advancer::Video(Box::new(VideoController::mount(
                record,
                self.backend.as_mut(),
                &self.config,
                self.log.clone(),
                now,
            ))),
            SlideKind::Image | SlideKind::Text if self.paused => Advancer::Idle,
            SlideKind::Image | SlideKind::Text => Advancer::Clock(ClockTimer::arm(
                now,
                record.display_duration(self.config.default_slide_duration()),
            )),
        };

        debug!(index = self.index, slide = %record.id, ?cause, "Slide activated");
        self.log.info(json!({
            "event": "slide",
            "index": self.index,
            "slide": record.id,
            "kind": record.kind,
            "cause": cause,
        }));
        self.pending_events.push(SlideshowEvent::SlideChanged {
            index: self.index,
            slide_id: record.id.clone(),
            kind: record.kind,
            cause,
        });

        self.active = Some(Activation {
            index: self.index,
            slide_id: record.id.clone(),
            kind: record.kind,
            advancer,
            image: ImageStatus::default(),
            published_mode: AutoplayMode::Pending,
            published_error: None,
        });
        self.publish_video_changes();
    }

    fn offer_unmute_gesture(&mut self, now: Duration) -> bool {
        let Some(Activation {
            advancer: Advancer::Video(controller),
            ..
        }) = self.active.as_mut()
        else {
            return false;
        };
        if !controller.handle_gesture(now) {
            return false;
        }

        if let Some(audio) = self.system_audio.as_mut() {
            unmute_system_audio(audio.as_mut());
        }
        self.publish_video_changes();
        true
    }

    /// Queue events for autoplay-mode and media-error changes of the video
    fn publish_video_changes(&mut self) {
        let Some(Activation {
            advancer: Advancer::Video(controller),
            slide_id,
            published_mode,
            published_error,
            ..
        }) = self.active.as_mut()
        else {
            return;
        };

        let mode = controller.autoplay_mode();
        if mode != *published_mode {
            *published_mode = mode;
            self.pending_events.push(SlideshowEvent::AutoplayChanged {
                slide_id: slide_id.clone(),
                mode,
            });
        }

        let error = controller.state().error;
        if error != *published_error {
            *published_error = error;
            if let Some(error) = error {
                self.pending_events.push(SlideshowEvent::MediaError {
                    slide_id: slide_id.clone(),
                    error,
                });
            }
        }
    }

    fn report_empty(&mut self) {
        info!("Playlist is empty");
        self.log.info(json!({ "event": "empty" }));
        self.pending_events.push(SlideshowEvent::PlaylistEmpty);
    }
}

fn clamp_index(index: usize, len: usize) -> usize {
    index.min(len.saturating_sub(1))
}

fn same_content(a: &SlideRecord, b: &SlideRecord) -> bool {
    a.id == b.id && a.kind == b.kind && a.src == b.src
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaPrimitive;

    struct NullPrimitive;

    impl MediaPrimitive for NullPrimitive {
        fn set_source(&mut self, _src: &str, _media_type: Option<&str>) {}
        fn play(&mut self) -> Result<()> {
            Ok(())
        }
        fn pause(&mut self) {}
        fn current_time(&self) -> f64 {
            0.0
        }
        fn set_current_time(&mut self, _seconds: f64) {}
        fn duration(&self) -> f64 {
            f64::NAN
        }
        fn volume(&self) -> f64 {
            1.0
        }
        fn set_volume(&mut self, _volume: f64) {}
        fn muted(&self) -> bool {
            false
        }
        fn set_muted(&mut self, _muted: bool) {}
        fn video_size(&self) -> Option<(u32, u32)> {
            None
        }
        fn error_code(&self) -> Option<u16> {
            None
        }
        fn can_play_type(&self, _mime: &str) -> bool {
            false
        }
    }

    struct NullBackend;

    impl MediaBackend for NullBackend {
        fn create_primitive(&mut self) -> Box<dyn MediaPrimitive> {
            Box::new(NullPrimitive)
        }
    }

    fn slideshow() -> Slideshow {
        Slideshow::new(EngineConfig::default(), Box::new(NullBackend)).unwrap()
    }

    fn images(n: usize) -> Vec<SlideRecord> {
        (0..n)
            .map(|i| SlideRecord::image(format!("s{i}"), format!("https://x/{i}.png")))
            .collect()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig {
            watchdog_interval_ms: 0,
            ..EngineConfig::default()
        };
        assert!(Slideshow::new(config, Box::new(NullBackend)).is_err());
    }

    #[test]
    fn start_clamps_index() {
        let mut show = slideshow();
        show.start(images(3), 10, Duration::ZERO);
        assert_eq!(show.index(), 2);
        assert_eq!(show.advancement(), Advancement::Clock);
    }

    #[test]
    fn empty_playlist_arms_nothing() {
        let mut show = slideshow();
        show.start(Vec::new(), 0, Duration::ZERO);
        assert_eq!(show.advancement(), Advancement::None);
        assert_eq!(show.next_deadline(), None);
        assert!(matches!(show.presentation(), Presentation::Empty));
        assert!(show
            .drain_events()
            .contains(&SlideshowEvent::PlaylistEmpty));

        show.next(Duration::ZERO);
        show.prev(Duration::ZERO);
        assert_eq!(show.index(), 0);
        assert!(show.drain_events().is_empty());
    }

    #[test]
    fn paused_image_is_idle() {
        let mut show = slideshow();
        show.start(images(2), 0, Duration::ZERO);
        show.set_paused(true, Duration::from_secs(1));
        assert_eq!(show.advancement(), Advancement::None);

        show.tick(Duration::from_secs(60));
        assert_eq!(show.index(), 0);

        // Navigation still works while paused and stays unarmed
        show.next(Duration::from_secs(61));
        assert_eq!(show.index(), 1);
        assert_eq!(show.advancement(), Advancement::None);
    }

    #[test]
    fn image_fit_overridden_for_portrait() {
        let mut show = slideshow();
        let record = SlideRecord::image("p", "https://x/p.png").with_fit(Fit::Cover);
        show.start(vec![record], 0, Duration::ZERO);

        show.handle_image_event("other", ImageEvent::Failed);
        show.handle_image_event("p", ImageEvent::Loaded { width: 600, height: 900 });

        match show.presentation() {
            Presentation::Image { fit, failed, .. } => {
                assert_eq!(fit, Fit::Contain);
                assert!(!failed);
            }
            other => panic!("unexpected presentation: {other:?}"),
        }
    }

    #[test]
    fn same_slide_survives_playlist_replace() {
        let mut show = slideshow();
        show.start(images(3), 1, Duration::ZERO);
        let deadline = show.next_deadline();
        show.drain_events();

        let mut replacement = images(3);
        replacement.push(SlideRecord::text("t", "hello"));
        show.set_playlist(replacement, Duration::from_secs(2));

        assert_eq!(show.next_deadline(), deadline);
        assert_eq!(
            show.drain_events(),
            [SlideshowEvent::PlaylistChanged { length: 4 }]
        );
    }
}
