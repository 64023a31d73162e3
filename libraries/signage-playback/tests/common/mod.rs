//! Shared mocks for the integration tests
//!
//! Every primitive and adapter created by [`MockBackend`] records into the
//! same [`Probe`], so tests can inspect what the engine did after handing
//! ownership away.

#![allow(dead_code)]

use signage_playback::{
    AdapterConfig, EngineConfig, MediaBackend, MediaPrimitive, PlaybackError, Result,
    SlideRecord, Slideshow, StreamAdapter, SystemAudio,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug)]
pub struct Probe {
    pub primitives_created: usize,
    pub sources: Vec<String>,
    /// Muted flag at the time of each play() call
    pub plays: Vec<bool>,
    pub pauses: usize,
    pub muted: bool,
    pub volume: f64,
    pub position: f64,
    pub duration: f64,
    pub size: Option<(u32, u32)>,
    pub error_code: Option<u16>,
    pub native_hls: bool,
    pub adapter_available: bool,
    pub adapters_created: usize,
    pub adapter_sources: Vec<String>,
    pub adapters_attached: usize,
    pub adapters_destroyed: usize,
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            primitives_created: 0,
            sources: Vec::new(),
            plays: Vec::new(),
            pauses: 0,
            muted: false,
            volume: 1.0,
            position: 0.0,
            duration: f64::NAN,
            size: None,
            error_code: None,
            native_hls: false,
            adapter_available: true,
            adapters_created: 0,
            adapter_sources: Vec::new(),
            adapters_attached: 0,
            adapters_destroyed: 0,
        }
    }
}

pub type SharedProbe = Rc<RefCell<Probe>>;

pub struct MockPrimitive {
    probe: SharedProbe,
}

impl MediaPrimitive for MockPrimitive {
    fn set_source(&mut self, src: &str, _media_type: Option<&str>) {
        self.probe.borrow_mut().sources.push(src.to_string());
    }

    fn play(&mut self) -> Result<()> {
        let mut probe = self.probe.borrow_mut();
        let muted = probe.muted;
        probe.plays.push(muted);
        Ok(())
    }

    fn pause(&mut self) {
        self.probe.borrow_mut().pauses += 1;
    }

    fn current_time(&self) -> f64 {
        self.probe.borrow().position
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.probe.borrow_mut().position = seconds;
    }

    fn duration(&self) -> f64 {
        self.probe.borrow().duration
    }

    fn volume(&self) -> f64 {
        self.probe.borrow().volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.probe.borrow_mut().volume = volume;
    }

    fn muted(&self) -> bool {
        self.probe.borrow().muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.probe.borrow_mut().muted = muted;
    }

    fn video_size(&self) -> Option<(u32, u32)> {
        self.probe.borrow().size
    }

    fn error_code(&self) -> Option<u16> {
        self.probe.borrow().error_code
    }

    fn can_play_type(&self, mime: &str) -> bool {
        self.probe.borrow().native_hls && mime.contains("mpegurl")
    }
}

pub struct MockAdapter {
    probe: SharedProbe,
}

impl StreamAdapter for MockAdapter {
    fn is_supported(&self) -> bool {
        true
    }

    fn load_source(&mut self, url: &str) {
        self.probe.borrow_mut().adapter_sources.push(url.to_string());
    }

    fn attach_media(&mut self, _media: &mut dyn MediaPrimitive) {
        self.probe.borrow_mut().adapters_attached += 1;
    }

    fn destroy(&mut self) {
        self.probe.borrow_mut().adapters_destroyed += 1;
    }
}

pub struct MockBackend {
    probe: SharedProbe,
}

impl MediaBackend for MockBackend {
    fn create_primitive(&mut self) -> Box<dyn MediaPrimitive> {
        self.probe.borrow_mut().primitives_created += 1;
        Box::new(MockPrimitive {
            probe: self.probe.clone(),
        })
    }

    fn load_stream_adapter(&mut self, _config: &AdapterConfig) -> Result<Box<dyn StreamAdapter>> {
        if !self.probe.borrow().adapter_available {
            return Err(PlaybackError::AdapterUnavailable("not bundled".to_string()));
        }
        self.probe.borrow_mut().adapters_created += 1;
        Ok(Box::new(MockAdapter {
            probe: self.probe.clone(),
        }))
    }
}

/// System volume service recording every request
pub struct MockSystemAudio {
    pub calls: Rc<RefCell<Vec<String>>>,
    pub fail: bool,
}

impl SystemAudio for MockSystemAudio {
    fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.calls.borrow_mut().push(format!("muted:{muted}"));
        if self.fail {
            return Err(PlaybackError::SystemAudio("service unavailable".to_string()));
        }
        Ok(())
    }

    fn set_volume(&mut self, level: u8) -> Result<()> {
        self.calls.borrow_mut().push(format!("volume:{level}"));
        if self.fail {
            return Err(PlaybackError::SystemAudio("service unavailable".to_string()));
        }
        Ok(())
    }
}

pub fn mock_backend() -> (Box<dyn MediaBackend>, SharedProbe) {
    let probe = SharedProbe::default();
    (
        Box::new(MockBackend {
            probe: probe.clone(),
        }),
        probe,
    )
}

/// Slideshow over mocks, started at index 0 at time zero
pub fn start_show(config: EngineConfig, playlist: Vec<SlideRecord>) -> (Slideshow, SharedProbe) {
    let (backend, probe) = mock_backend();
    let mut show = Slideshow::new(config, backend).unwrap();
    show.start(playlist, 0, Duration::ZERO);
    (show, probe)
}

pub fn image(id: &str) -> SlideRecord {
    SlideRecord::image(id, format!("https://cdn.example/{id}.png"))
}

pub fn video(id: &str) -> SlideRecord {
    SlideRecord::video(id, format!("https://cdn.example/{id}.mp4"))
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

pub fn secs(seconds: u64) -> Duration {
    Duration::from_secs(seconds)
}
