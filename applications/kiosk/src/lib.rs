//! Signage Kiosk Library
//!
//! Headless host for the `signage-playback` engine: settings loading, a
//! simulated media backend, and the virtual-time and realtime run loops.
//!
//! This library exposes the core components for testing purposes.

pub mod error;
pub mod runner;
pub mod settings;
pub mod sim;

// Re-export commonly used types for convenience
pub use error::{KioskError, Result};
pub use runner::{Kiosk, RunReport, SlideChange};
pub use settings::{KioskSettings, LogSettings, PlaylistSettings, SimulationSettings};
pub use sim::{SimHandle, SimulatedBackend};
