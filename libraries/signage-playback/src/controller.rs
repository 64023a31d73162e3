//! Video playback controller
//!
//! Drives one media primitive for the lifetime of one video slide:
//! - negotiates autoplay (sound first, one muted fallback, gesture unmute)
//! - attaches a streaming adapter for HLS the primitive cannot play
//! - projects primitive events into a renderer-agnostic [`VideoState`]
//! - runs the stall watchdog and the hard ceiling
//!
//! The controller never advances anything itself. It latches a terminal
//! [`VideoOutcome`] which the scheduler acts on when not paused. Dropping
//! the controller tears everything down.

use crate::events::ChangeCause;
use crate::media::{
    supports_native_hls, MediaBackend, MediaEvent, MediaPrimitive, StreamAdapter, SystemAudio,
};
use crate::record::{Fit, SlideRecord};
use crate::sink::Diagnostics;
use crate::types::{AdapterConfig, AutoplayMode, EngineConfig, MediaErrorKind};
use crate::watchdog::{StallWatchdog, WatchdogVerdict};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// System volume requested when the operator unmutes
const SYSTEM_UNMUTE_VOLUME: u8 = 80;

/// Normalized playback state of the active video
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoState {
    /// Metadata loaded
    pub ready: bool,
    pub playing: bool,
    /// Seconds; 0 while unknown
    pub duration: f64,
    pub current_time: f64,
    /// End of buffered media, seconds
    pub buffered: f64,
    pub volume: f64,
    pub muted: bool,
    pub error: Option<MediaErrorKind>,
}

impl Default for VideoState {
    fn default() -> Self {
        Self {
            ready: false,
            playing: false,
            duration: 0.0,
            current_time: 0.0,
            buffered: 0.0,
            volume: 1.0,
            muted: false,
            error: None,
        }
    }
}

/// Terminal signal of a video slide; the first one latched wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoOutcome {
    Ended,
    Stalled,
    Ceiling,
}

impl From<VideoOutcome> for ChangeCause {
    fn from(outcome: VideoOutcome) -> Self {
        match outcome {
            VideoOutcome::Ended => ChangeCause::VideoEnded,
            VideoOutcome::Stalled => ChangeCause::VideoStalled,
            VideoOutcome::Ceiling => ChangeCause::VideoCeiling,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayAttempt {
    /// Initial attempt with audio
    Sound,
    /// Muted attempt (fallback, retry, or muted start)
    Muted,
    /// Re-invoked play after an unmute gesture
    Unmute,
}

impl PlayAttempt {
    fn label(self) -> &'static str {
        match self {
            PlayAttempt::Sound => "sound",
            PlayAttempt::Muted => "muted",
            PlayAttempt::Unmute => "unmute",
        }
    }
}

/// Live only while the controller sits in muted fallback
#[derive(Debug)]
struct UnmuteSubscription {
    since: Duration,
}

/// Controller for one active video slide
pub struct VideoController {
    slide_id: String,
    src: String,
    primitive: Box<dyn MediaPrimitive>,
    adapter: Option<Box<dyn StreamAdapter>>,
    state: VideoState,
    autoplay: AutoplayMode,
    outstanding: Option<PlayAttempt>,
    unmute: Option<UnmuteSubscription>,
    requested_fit: Option<Fit>,
    fit: Fit,
    watchdog: StallWatchdog,
    stuck: bool,
    ceiling_at: Duration,
    outcome: Option<VideoOutcome>,
    log: Diagnostics,
}

impl VideoController {
    /// Create the primitive, load the source and issue the first play request
    pub(crate) fn mount(
        record: &SlideRecord,
        backend: &mut dyn MediaBackend,
        config: &EngineConfig,
        log: Diagnostics,
        now: Duration,
    ) -> Self {
        let mut primitive = backend.create_primitive();

        let adapter = if record.is_hls() && !supports_native_hls(primitive.as_ref()) {
            attach_stream_adapter(record, primitive.as_mut(), backend, &config.adapter, &log)
        } else {
            primitive.set_source(&record.src, record.media_type.as_deref());
            None
        };

        log.info(json!({
            "event": "sourcechange",
            "slide": record.id,
            "src": record.src,
            "type": record.media_type,
            "adapter": adapter.is_some(),
        }));

        let position = finite_or_zero(primitive.current_time());
        let mut controller = Self {
            slide_id: record.id.clone(),
            src: record.src.clone(),
            primitive,
            adapter,
            state: VideoState::default(),
            autoplay: AutoplayMode::Pending,
            outstanding: None,
            unmute: None,
            requested_fit: record.fit,
            fit: Fit::for_video(record.fit, None),
            watchdog: StallWatchdog::arm(
                now,
                position,
                config.watchdog_interval(),
                config.stall_threshold(),
            ),
            stuck: false,
            ceiling_at: now + config.video_ceiling(),
            outcome: None,
            log,
        };

        let first = if config.start_with_sound {
            PlayAttempt::Sound
        } else {
            PlayAttempt::Muted
        };
        controller.issue_play(first, now);
        controller
    }

    pub fn slide_id(&self) -> &str {
        &self.slide_id
    }

    pub fn state(&self) -> &VideoState {
        &self.state
    }

    pub fn autoplay_mode(&self) -> AutoplayMode {
        self.autoplay
    }

    pub fn fit(&self) -> Fit {
        self.fit
    }

    /// Whether the host should show the "press OK for sound" hint
    pub fn show_unmute_hint(&self) -> bool {
        self.unmute.is_some()
    }

    pub fn has_stream_adapter(&self) -> bool {
        self.adapter.is_some()
    }

    /// Latched terminal signal, if any
    pub fn outcome(&self) -> Option<VideoOutcome> {
        self.outcome
    }

    /// Next instant the controller needs a tick (watchdog sample or ceiling)
    pub fn next_deadline(&self) -> Option<Duration> {
        if self.outcome.is_some() {
            return None;
        }
        Some(self.watchdog.next_sample_at().min(self.ceiling_at))
    }

    /// Map one primitive/adapter event into state
    pub(crate) fn handle_event(&mut self, event: MediaEvent, now: Duration) {
        match event {
            MediaEvent::LoadedMetadata => {
                self.state.ready = true;
                self.state.duration = finite_or_zero(self.primitive.duration());
                self.refresh_fit();
                self.log.info(json!({
                    "event": "loadedmetadata",
                    "slide": self.slide_id,
                    "duration": self.state.duration,
                }));
                self.retry_if_blocked(now);
            }
            MediaEvent::CanPlay => self.retry_if_blocked(now),
            MediaEvent::Play => {
                self.state.playing = true;
                self.log
                    .info(json!({ "event": "play", "slide": self.slide_id }));
            }
            MediaEvent::Pause => {
                self.state.playing = false;
                self.state.current_time = finite_or_zero(self.primitive.current_time());
                self.log.info(json!({
                    "event": "pause",
                    "slide": self.slide_id,
                    "position": self.state.current_time,
                }));
            }
            MediaEvent::Progress => {
                self.state.buffered = finite_or_zero(self.primitive.buffered_end());
            }
            MediaEvent::VolumeChange => {
                self.state.volume = self.primitive.volume();
                self.state.muted = self.primitive.muted();
            }
            MediaEvent::Error => {
                let code = self.primitive.error_code();
                let error = MediaErrorKind::from_code(code);
                self.state.error = Some(error);
                self.log.error(json!({
                    "event": "error",
                    "slide": self.slide_id,
                    "code": code,
                    "message": error.to_string(),
                    "src": self.src,
                }));
            }
            MediaEvent::Waiting => {
                self.log
                    .info(json!({ "event": "waiting", "slide": self.slide_id }));
            }
            MediaEvent::Stalled => {
                self.log
                    .info(json!({ "event": "stalled", "slide": self.slide_id }));
            }
            MediaEvent::Ended => {
                self.state.playing = false;
                self.state.current_time = finite_or_zero(self.primitive.current_time());
                self.finish(VideoOutcome::Ended);
            }
            MediaEvent::Resize => self.refresh_fit(),
            MediaEvent::PlayResolved => self.on_play_resolved(now),
            MediaEvent::PlayRejected { reason } => self.on_play_rejected(&reason, now),
            MediaEvent::AdapterError { fatal, details } => {
                self.log.error(json!({
                    "event": "adapter-error",
                    "slide": self.slide_id,
                    "fatal": fatal,
                    "details": details,
                }));
            }
        }
    }

    /// Frame-cadence update: position projection, watchdog, ceiling
    pub(crate) fn tick(&mut self, now: Duration) {
        let position = finite_or_zero(self.primitive.current_time());
        if self.state.playing {
            self.state.current_time = position;
        }

        if self.outcome.is_some() {
            return;
        }

        match self.watchdog.poll(now, position) {
            Some(WatchdogVerdict::Progressing) if self.stuck => {
                self.stuck = false;
                self.log.info(json!({
                    "event": "watchdog-recovered",
                    "slide": self.slide_id,
                    "position": position,
                }));
            }
            Some(WatchdogVerdict::Stuck { stuck_for }) if !self.stuck => {
                self.stuck = true;
                self.log.info(json!({
                    "event": "watchdog-stuck",
                    "slide": self.slide_id,
                    "position": position,
                    "stuckMs": stuck_for.as_millis() as u64,
                }));
            }
            Some(WatchdogVerdict::Stalled { stuck_for }) => {
                self.log.error(json!({
                    "event": "watchdog-stall",
                    "slide": self.slide_id,
                    "position": position,
                    "stuckMs": stuck_for.as_millis() as u64,
                }));
                self.finish(VideoOutcome::Stalled);
            }
            _ => {}
        }

        if self.outcome.is_none() && now >= self.ceiling_at {
            self.log.error(json!({
                "event": "ceiling",
                "slide": self.slide_id,
                "position": position,
            }));
            self.finish(VideoOutcome::Ceiling);
        }
    }

    /// Offer an input gesture
    ///
    /// Only acts while in muted fallback: unmutes, switches to sound and
    /// re-invokes play. Returns whether the gesture was consumed.
    pub(crate) fn handle_gesture(&mut self, now: Duration) -> bool {
        let Some(subscription) = self.unmute.take() else {
            return false;
        };

        self.log.info(json!({
            "event": "unmute",
            "slide": self.slide_id,
            "mutedForMs": now.saturating_sub(subscription.since).as_millis() as u64,
        }));

        self.primitive.set_muted(false);
        self.primitive.set_volume(1.0);
        self.state.muted = false;
        self.state.volume = 1.0;
        self.set_mode(AutoplayMode::SoundGranted);

        self.outstanding = Some(PlayAttempt::Unmute);
        if let Err(e) = self.primitive.play() {
            self.on_play_rejected(&e.to_string(), now);
        }
        true
    }

    /// Jump to `seconds`, clamped to the known duration
    pub fn seek(&mut self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        let mut target = seconds.max(0.0);
        if self.state.duration > 0.0 {
            target = target.min(self.state.duration);
        }
        self.primitive.set_current_time(target);
        self.state.current_time = target;
        self.log.info(json!({
            "event": "seek",
            "slide": self.slide_id,
            "position": target,
        }));
    }

    /// Seek relative to the current position
    pub fn step(&mut self, delta: f64) {
        let position = finite_or_zero(self.primitive.current_time());
        self.seek(position + delta);
    }

    /// Volume in [0.0, 1.0]; out-of-range values are clamped
    pub fn set_volume(&mut self, volume: f64) {
        if volume.is_nan() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.primitive.set_volume(volume);
        self.state.volume = volume;
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.primitive.set_muted(muted);
        self.state.muted = muted;
    }

    fn issue_play(&mut self, attempt: PlayAttempt, now: Duration) {
        let muted = attempt == PlayAttempt::Muted;
        self.primitive.set_muted(muted);
        self.state.muted = muted;
        self.outstanding = Some(attempt);

        self.log.info(json!({
            "event": "play-request",
            "slide": self.slide_id,
            "attempt": attempt.label(),
        }));

        if let Err(e) = self.primitive.play() {
            self.on_play_rejected(&e.to_string(), now);
        }
    }

    fn on_play_resolved(&mut self, now: Duration) {
        match self.outstanding.take() {
            Some(PlayAttempt::Sound | PlayAttempt::Unmute) => {
                self.set_mode(AutoplayMode::SoundGranted);
            }
            Some(PlayAttempt::Muted) => {
                self.set_mode(AutoplayMode::MutedFallback);
                self.unmute = Some(UnmuteSubscription { since: now });
            }
            None => debug!(slide = %self.slide_id, "Play resolved with no request outstanding"),
        }
    }

    fn on_play_rejected(&mut self, reason: &str, now: Duration) {
        let Some(attempt) = self.outstanding.take() else {
            debug!(slide = %self.slide_id, reason, "Play rejected with no request outstanding");
            return;
        };

        self.log.info(json!({
            "event": "play-rejected",
            "slide": self.slide_id,
            "attempt": attempt.label(),
            "reason": reason,
        }));

        match attempt {
            // Sound refused (or lost again after a gesture): keep motion going muted
            PlayAttempt::Sound | PlayAttempt::Unmute => self.issue_play(PlayAttempt::Muted, now),
            PlayAttempt::Muted => self.set_mode(AutoplayMode::Blocked),
        }
    }

    fn retry_if_blocked(&mut self, now: Duration) {
        if self.autoplay == AutoplayMode::Blocked && self.outstanding.is_none() {
            self.issue_play(PlayAttempt::Muted, now);
        }
    }

    fn set_mode(&mut self, mode: AutoplayMode) {
        if self.autoplay == mode {
            return;
        }
        self.autoplay = mode;
        if mode != AutoplayMode::MutedFallback {
            self.unmute = None;
        }
        self.log.info(json!({
            "event": "autoplay",
            "slide": self.slide_id,
            "mode": mode,
        }));
    }

    fn refresh_fit(&mut self) {
        self.fit = Fit::for_video(self.requested_fit, self.primitive.video_size());
    }

    fn finish(&mut self, outcome: VideoOutcome) {
        if self.outcome.is_some() {
            return;
        }
        self.outcome = Some(outcome);
        self.log.info(json!({
            "event": "finished",
            "slide": self.slide_id,
            "outcome": outcome,
        }));
    }
}

impl Drop for VideoController {
    fn drop(&mut self) {
        self.unmute = None;
        if let Some(mut adapter) = self.adapter.take() {
            adapter.destroy();
        }
        self.primitive.pause();
        self.log.info(json!({
            "event": "teardown",
            "slide": self.slide_id,
            "position": finite_or_zero(self.primitive.current_time()),
        }));
    }
}

/// Ask the platform volume service for sound; failures only get logged
pub(crate) fn unmute_system_audio(audio: &mut dyn SystemAudio) {
    if let Err(e) = audio.set_muted(false) {
        debug!(error = %e, "System audio unmute failed");
    }
    if let Err(e) = audio.set_volume(SYSTEM_UNMUTE_VOLUME) {
        debug!(error = %e, "System audio volume request failed");
    }
}

fn attach_stream_adapter(
    record: &SlideRecord,
    primitive: &mut dyn MediaPrimitive,
    backend: &mut dyn MediaBackend,
    config: &AdapterConfig,
    log: &Diagnostics,
) -> Option<Box<dyn StreamAdapter>> {
    match backend.load_stream_adapter(config) {
        Ok(mut adapter) if adapter.is_supported() => {
            adapter.load_source(&record.src);
            adapter.attach_media(primitive);
            log.info(json!({ "event": "adapter-attached", "slide": record.id }));
            Some(adapter)
        }
        Ok(mut adapter) => {
            adapter.destroy();
            log.error(json!({ "event": "adapter-unsupported", "slide": record.id }));
            None
        }
        Err(e) => {
            log.error(json!({
                "event": "adapter-load-failed",
                "slide": record.id,
                "message": e.to_string(),
            }));
            None
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
