//! Kiosk run loops
//!
//! [`Kiosk`] wires a [`Slideshow`] to the simulated media stack and feeds it
//! time, media events and operator input. Two drivers are provided:
//! - [`Kiosk::run_for`] steps virtual time as fast as possible (dry run)
//! - [`Kiosk::run_realtime`] follows the wall clock under tokio and reads
//!   operator commands from stdin

use crate::error::Result;
use crate::settings::KioskSettings;
use crate::sim::{SimHandle, SimulatedBackend, SimulatedSystemAudio};
use serde::Serialize;
use signage_playback::{
    ChangeCause, InputEvent, Key, MemoryLogSink, SlideRecord, Slideshow, SlideshowEvent,
    StoredLogEntry,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// Upper bound on media-event round trips per host step
const MAX_PUMP_ROUNDS: usize = 16;

/// One slide change observed by the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideChange {
    pub at: Duration,
    pub index: usize,
    pub slide_id: String,
    pub cause: ChangeCause,
}

/// Summary of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub elapsed: Duration,
    pub changes: Vec<SlideChange>,
    pub exit_requested: bool,
}

pub struct Kiosk {
    show: Slideshow,
    sim: SimHandle,
    sink: Arc<MemoryLogSink>,
    step: Duration,
    now: Duration,
    report: RunReport,
}

impl Kiosk {
    /// Build the engine over the simulated backend and start the playlist
    pub fn new(settings: &KioskSettings, playlist: Vec<SlideRecord>) -> Result<Self> {
        settings.validate()?;

        let (backend, sim) = SimulatedBackend::new(settings.simulation.clone());
        let sink = Arc::new(MemoryLogSink::new(settings.log.capacity));
        let show = Slideshow::new(settings.engine.clone(), Box::new(backend))?
            .with_log_sink(sink.clone())
            .with_system_audio(Box::new(SimulatedSystemAudio));

        let mut kiosk = Self {
            show,
            sim,
            sink,
            step: Duration::from_millis(settings.simulation.step_ms),
            now: Duration::ZERO,
            report: RunReport::default(),
        };

        kiosk
            .show
            .start(playlist, settings.simulation.start_index, Duration::ZERO);
        kiosk.pump_media();
        kiosk.collect_events();
        Ok(kiosk)
    }

    pub fn slideshow(&self) -> &Slideshow {
        &self.show
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn log_entries(&self) -> Vec<StoredLogEntry> {
        self.sink.entries()
    }

    pub fn primitives_created(&self) -> u64 {
        self.sim.primitives_created()
    }

    /// Advance the host clock to `now` and let the engine react
    pub fn step_to(&mut self, now: Duration) {
        self.now = self.now.max(now);
        self.sim.advance_to(self.now);
        self.pump_media();
        self.show.tick(self.now);
        self.pump_media();
        self.collect_events();
    }

    /// Deliver one operator input at the current time
    pub fn input(&mut self, input: InputEvent) {
        debug!(?input, "Operator input");
        if input.is_unmute_gesture() {
            self.sim.register_gesture();
        }
        self.show.handle_input(input, self.now);
        self.pump_media();
        self.collect_events();
    }

    /// Run on virtual time until `duration` has passed or exit is requested
    pub fn run_for(&mut self, duration: Duration) -> RunReport {
        let end = self.now + duration;
        info!(seconds = duration.as_secs_f64(), "Dry run started");

        while self.now < end && !self.report.exit_requested {
            let target = self.next_wake().min(end);
            self.step_to(target);
        }

        self.report.elapsed = self.now;
        self.report.clone()
    }

    /// Run on the wall clock, reading commands from stdin
    ///
    /// Stops on exit request, ctrl-c, or when `limit` has elapsed. A stdin
    /// read still pending at that point keeps the runtime alive until the
    /// next line arrives.
    pub async fn run_realtime(&mut self, limit: Option<Duration>) -> Result<RunReport> {
        let origin = tokio::time::Instant::now() - self.now;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;

        info!("Realtime run started; commands: n, p, space, enter, click, q");

        loop {
            if self.report.exit_requested || limit.is_some_and(|limit| self.now >= limit) {
                break;
            }

            let mut wake = self.next_wake();
            if let Some(limit) = limit {
                wake = wake.min(limit);
            }

            tokio::select! {
                () = tokio::time::sleep_until(origin + wake) => {
                    self.step_to(origin.elapsed());
                }
                line = lines.next_line(), if stdin_open => {
                    self.step_to(origin.elapsed());
                    match line? {
                        Some(line) => match parse_command(&line) {
                            Some(input) => self.input(input),
                            None => warn!(command = line.trim(), "Unknown command"),
                        },
                        None => {
                            debug!("Stdin closed");
                            stdin_open = false;
                        }
                    }
                }
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    info!("Interrupted");
                    break;
                }
            }
        }

        self.show.unmount();
        self.report.elapsed = self.now;
        Ok(self.report.clone())
    }

    /// Next host wake-up: the engine deadline, capped by the tick cadence
    fn next_wake(&self) -> Duration {
        let cadence = self.now + self.step;
        self.show
            .next_deadline()
            .filter(|deadline| *deadline > self.now)
            .map_or(cadence, |deadline| deadline.min(cadence))
    }

    fn pump_media(&mut self) {
        for _ in 0..MAX_PUMP_ROUNDS {
            let events = self.sim.take_events();
            if events.is_empty() {
                return;
            }
            for event in events {
                self.show.handle_media_event(event, self.now);
            }
        }
        warn!("Media events still pending after {} rounds", MAX_PUMP_ROUNDS);
    }

    fn collect_events(&mut self) {
        for event in self.show.drain_events() {
            match event {
                SlideshowEvent::SlideChanged {
                    index,
                    slide_id,
                    kind,
                    cause,
                } => {
                    info!(at = ?self.now, index, slide = %slide_id, ?kind, ?cause, "Slide");
                    self.report.changes.push(SlideChange {
                        at: self.now,
                        index,
                        slide_id,
                        cause,
                    });
                }
                SlideshowEvent::ExitRequested => {
                    info!("Exit requested");
                    self.report.exit_requested = true;
                }
                SlideshowEvent::PlaylistEmpty => warn!("Nothing to show: playlist is empty"),
                SlideshowEvent::AutoplayChanged { slide_id, mode } => {
                    info!(slide = %slide_id, ?mode, "Autoplay");
                }
                SlideshowEvent::MediaError { slide_id, error } => {
                    warn!(slide = %slide_id, %error, "Media error");
                }
                SlideshowEvent::ImageFailed { slide_id } => {
                    warn!(slide = %slide_id, "Image failed to load");
                }
                other => debug!(?other, "Slideshow event"),
            }
        }
    }
}

/// Map an operator command line to an input
pub fn parse_command(line: &str) -> Option<InputEvent> {
    let command = line.trim();
    let input = match command.to_ascii_lowercase().as_str() {
        "" | "ok" | "enter" => InputEvent::Key(Key::Enter),
        "n" | "next" | "right" => InputEvent::Key(Key::ArrowRight),
        "p" | "prev" | "left" => InputEvent::Key(Key::ArrowLeft),
        "s" | "space" | "pause" => InputEvent::Key(Key::Space),
        "q" | "quit" | "back" => InputEvent::Key(Key::Back),
        "click" | "tap" => InputEvent::Pointer,
        _ => match Key::from_name(command) {
            Key::Other => return None,
            key => InputEvent::Key(key),
        },
    };
    Some(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands() {
        assert_eq!(parse_command(""), Some(InputEvent::Key(Key::Enter)));
        assert_eq!(parse_command(" n "), Some(InputEvent::Key(Key::ArrowRight)));
        assert_eq!(parse_command("Q"), Some(InputEvent::Key(Key::Back)));
        assert_eq!(parse_command("click"), Some(InputEvent::Pointer));
        assert_eq!(
            parse_command("MediaPlayPause"),
            Some(InputEvent::Key(Key::MediaPlayPause))
        );
        assert_eq!(parse_command("jump"), None);
    }
}
