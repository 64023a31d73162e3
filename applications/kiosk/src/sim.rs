//! Simulated media stack
//!
//! Stands in for the display's media element when running headless. Clips
//! play against the host clock, report metadata as soon as a source is set
//! and end after `clip_seconds`. HLS sources are treated as live streams
//! that never end. Sound autoplay can be refused until the first user
//! gesture to exercise the muted fallback, and HLS either plays natively or
//! through a simulated adapter.
//!
//! Every primitive gets a generation number. Events raised by a primitive
//! that has since been replaced are discarded, so a torn-down video can
//! never leak events into its successor.

use crate::settings::SimulationSettings;
use signage_playback::media::HLS_MIME_TYPES;
use signage_playback::{
    AdapterConfig, MediaBackend, MediaEvent, MediaPrimitive, PlaybackError, Result,
    StreamAdapter, SystemAudio,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};

const SIMULATED_SIZE: (u32, u32) = (1920, 1080);

#[derive(Debug)]
struct Clip {
    generation: u64,
    src: Option<String>,
    live: bool,
    playing: bool,
    ended: bool,
    /// Position at `anchor_at`
    anchor_position: f64,
    anchor_at: Duration,
    muted: bool,
    volume: f64,
}

impl Clip {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            src: None,
            live: false,
            playing: false,
            ended: false,
            anchor_position: 0.0,
            anchor_at: Duration::ZERO,
            muted: false,
            volume: 1.0,
        }
    }

    fn position(&self, now: Duration, length: f64) -> f64 {
        let position = if self.playing {
            self.anchor_position + now.saturating_sub(self.anchor_at).as_secs_f64()
        } else {
            self.anchor_position
        };
        if self.live {
            position
        } else {
            position.min(length)
        }
    }
}

type ClipParts<'a> = (&'a mut Clip, &'a mut VecDeque<(u64, MediaEvent)>, Duration, f64);

#[derive(Debug)]
struct SimState {
    settings: SimulationSettings,
    now: Duration,
    generation: u64,
    /// Set by the first user gesture; lifts the sound autoplay restriction
    user_activated: bool,
    clip: Option<Clip>,
    events: VecDeque<(u64, MediaEvent)>,
}

impl SimState {
    /// Split borrow of the clip owned by `generation` plus the event queue
    fn parts(&mut self, generation: u64) -> Option<ClipParts<'_>> {
        let length = self.settings.clip_seconds;
        let now = self.now;
        let clip = self
            .clip
            .as_mut()
            .filter(|clip| clip.generation == generation)?;
        Some((clip, &mut self.events, now, length))
    }
}

/// Host-side handle to the simulation: drives its clock and collects events
#[derive(Clone)]
pub struct SimHandle(Rc<RefCell<SimState>>);

impl SimHandle {
    /// Move the simulated clock forward; finished clips raise `Ended`
    pub fn advance_to(&self, now: Duration) {
        let mut state = self.0.borrow_mut();
        state.now = now;

        let generation = state.generation;
        let Some((clip, events, now, length)) = state.parts(generation) else {
            return;
        };
        if clip.playing && !clip.live && !clip.ended && clip.position(now, length) >= length {
            clip.anchor_position = length;
            clip.anchor_at = now;
            clip.playing = false;
            clip.ended = true;
            events.push_back((generation, MediaEvent::Pause));
            events.push_back((generation, MediaEvent::Ended));
        }
    }

    /// Pending events of the current primitive, oldest first
    pub fn take_events(&self) -> Vec<MediaEvent> {
        let mut state = self.0.borrow_mut();
        let current = state.generation;
        state
            .events
            .drain(..)
            .filter_map(|(generation, event)| (generation == current).then_some(event))
            .collect()
    }

    /// Record a user gesture, as a browser grants user activation
    pub fn register_gesture(&self) {
        self.0.borrow_mut().user_activated = true;
    }

    pub fn now(&self) -> Duration {
        self.0.borrow().now
    }

    /// Number of primitives created so far
    pub fn primitives_created(&self) -> u64 {
        self.0.borrow().generation
    }
}

/// Media backend producing simulated primitives
pub struct SimulatedBackend {
    state: Rc<RefCell<SimState>>,
}

impl SimulatedBackend {
    pub fn new(settings: SimulationSettings) -> (Self, SimHandle) {
        let state = Rc::new(RefCell::new(SimState {
            settings,
            now: Duration::ZERO,
            generation: 0,
            user_activated: false,
            clip: None,
            events: VecDeque::new(),
        }));
        (
            Self {
                state: state.clone(),
            },
            SimHandle(state),
        )
    }
}

impl MediaBackend for SimulatedBackend {
    fn create_primitive(&mut self) -> Box<dyn MediaPrimitive> {
        let mut state = self.state.borrow_mut();
        state.generation += 1;
        let generation = state.generation;
        state.clip = Some(Clip::new(generation));
        debug!(generation, "Simulated primitive created");

        Box::new(SimulatedMedia {
            generation,
            state: self.state.clone(),
        })
    }

    fn load_stream_adapter(&mut self, config: &AdapterConfig) -> Result<Box<dyn StreamAdapter>> {
        let generation = self.state.borrow().generation;
        Ok(Box::new(SimulatedAdapter {
            generation,
            state: self.state.clone(),
            auto_start_load: config.auto_start_load,
            manifest: None,
        }))
    }
}

/// Simulated media element
pub struct SimulatedMedia {
    generation: u64,
    state: Rc<RefCell<SimState>>,
}

impl SimulatedMedia {
    fn read<R>(&self, default: R, f: impl FnOnce(&Clip, Duration, f64) -> R) -> R {
        let state = self.state.borrow();
        match state.clip.as_ref().filter(|clip| clip.generation == self.generation) {
            Some(clip) => f(clip, state.now, state.settings.clip_seconds),
            None => default,
        }
    }
}

impl MediaPrimitive for SimulatedMedia {
    fn set_source(&mut self, src: &str, media_type: Option<&str>) {
        let mut state = self.state.borrow_mut();
        let Some((clip, events, _, _)) = state.parts(self.generation) else {
            return;
        };

        clip.src = Some(src.to_string());
        clip.live = media_type
            .is_some_and(|t| HLS_MIME_TYPES.iter().any(|hls| t.eq_ignore_ascii_case(hls)))
            || src.to_ascii_lowercase().contains(".m3u8");
        events.push_back((self.generation, MediaEvent::LoadedMetadata));
        events.push_back((self.generation, MediaEvent::CanPlay));
        debug!(src, live = clip.live, "Simulated source set");
    }

    fn play(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let allow_sound = state.settings.allow_sound_autoplay || state.user_activated;
        let Some((clip, events, now, _)) = state.parts(self.generation) else {
            return Err(PlaybackError::Primitive("media element released".to_string()));
        };

        if clip.src.is_none() {
            return Err(PlaybackError::Primitive("no source loaded".to_string()));
        }

        if !clip.muted && !allow_sound {
            events.push_back((
                self.generation,
                MediaEvent::PlayRejected {
                    reason: "NotAllowedError: play() with sound requires a user gesture".to_string(),
                },
            ));
            return Ok(());
        }

        if !clip.playing && !clip.ended {
            clip.playing = true;
            clip.anchor_at = now;
            events.push_back((self.generation, MediaEvent::Play));
        }
        events.push_back((self.generation, MediaEvent::PlayResolved));
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.state.borrow_mut();
        let Some((clip, events, now, length)) = state.parts(self.generation) else {
            return;
        };
        if clip.playing {
            clip.anchor_position = clip.position(now, length);
            clip.anchor_at = now;
            clip.playing = false;
            events.push_back((self.generation, MediaEvent::Pause));
        }
    }

    fn current_time(&self) -> f64 {
        self.read(0.0, |clip, now, length| clip.position(now, length))
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut state = self.state.borrow_mut();
        if let Some((clip, _, now, _)) = state.parts(self.generation) {
            clip.anchor_position = seconds.max(0.0);
            clip.anchor_at = now;
            clip.ended = false;
        }
    }

    fn duration(&self) -> f64 {
        self.read(f64::NAN, |clip, _, length| match (&clip.src, clip.live) {
            (None, _) => f64::NAN,
            (Some(_), true) => f64::INFINITY,
            (Some(_), false) => length,
        })
    }

    fn volume(&self) -> f64 {
        self.read(1.0, |clip, _, _| clip.volume)
    }

    fn set_volume(&mut self, volume: f64) {
        let mut state = self.state.borrow_mut();
        if let Some((clip, events, _, _)) = state.parts(self.generation) {
            clip.volume = volume.clamp(0.0, 1.0);
            events.push_back((self.generation, MediaEvent::VolumeChange));
        }
    }

    fn muted(&self) -> bool {
        self.read(false, |clip, _, _| clip.muted)
    }

    fn set_muted(&mut self, muted: bool) {
        let mut state = self.state.borrow_mut();
        if let Some((clip, events, _, _)) = state.parts(self.generation) {
            if clip.muted != muted {
                clip.muted = muted;
                events.push_back((self.generation, MediaEvent::VolumeChange));
            }
        }
    }

    fn video_size(&self) -> Option<(u32, u32)> {
        self.read(None, |clip, _, _| clip.src.as_ref().map(|_| SIMULATED_SIZE))
    }

    fn buffered_end(&self) -> f64 {
        self.duration().min(self.current_time() + 10.0)
    }

    fn error_code(&self) -> Option<u16> {
        None
    }

    fn can_play_type(&self, mime: &str) -> bool {
        if HLS_MIME_TYPES.iter().any(|hls| mime.eq_ignore_ascii_case(hls)) {
            self.state.borrow().settings.native_hls
        } else {
            mime.starts_with("video/")
        }
    }
}

/// Simulated segmented-streaming adapter
pub struct SimulatedAdapter {
    generation: u64,
    state: Rc<RefCell<SimState>>,
    auto_start_load: bool,
    manifest: Option<String>,
}

impl StreamAdapter for SimulatedAdapter {
    fn is_supported(&self) -> bool {
        true
    }

    fn load_source(&mut self, url: &str) {
        self.manifest = Some(url.to_string());
    }

    fn attach_media(&mut self, _media: &mut dyn MediaPrimitive) {
        let mut state = self.state.borrow_mut();
        let Some((clip, events, _, _)) = state.parts(self.generation) else {
            return;
        };

        clip.src.clone_from(&self.manifest);
        clip.live = true;
        if self.auto_start_load && clip.src.is_some() {
            events.push_back((self.generation, MediaEvent::LoadedMetadata));
            events.push_back((self.generation, MediaEvent::CanPlay));
        }
        info!(manifest = ?self.manifest, "Simulated stream adapter attached");
    }

    fn destroy(&mut self) {
        info!(manifest = ?self.manifest, "Simulated stream adapter destroyed");
    }
}

/// System volume service that only logs
pub struct SimulatedSystemAudio;

impl SystemAudio for SimulatedSystemAudio {
    fn set_muted(&mut self, muted: bool) -> Result<()> {
        info!(muted, "System audio mute requested");
        Ok(())
    }

    fn set_volume(&mut self, level: u8) -> Result<()> {
        info!(level, "System audio volume requested");
        Ok(())
    }
}
