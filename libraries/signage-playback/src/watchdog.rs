//! Stall watchdog
//!
//! Samples the media position on a fixed grid. A sample that shows no
//! movement counts as stuck since the last sample that did move; once that
//! span reaches the threshold the watchdog trips, exactly once.

use std::time::Duration;

/// Positions closer than this are treated as unchanged
const POSITION_EPSILON: f64 = 1e-3;

/// Outcome of one watchdog sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WatchdogVerdict {
    /// Position moved since the previous sample
    Progressing,

    /// No movement yet, but below the threshold
    Stuck { stuck_for: Duration },

    /// No movement for at least the threshold; the slide should be abandoned
    Stalled { stuck_for: Duration },
}

#[derive(Debug, Clone)]
pub struct StallWatchdog {
    interval: Duration,
    threshold: Duration,
    next_sample_at: Duration,
    last_position: f64,
    last_progress_at: Duration,
    tripped: bool,
}

impl StallWatchdog {
    /// Start watching from `now` at the given media position
    pub fn arm(now: Duration, position: f64, interval: Duration, threshold: Duration) -> Self {
        Self {
            interval,
            threshold,
            next_sample_at: now + interval,
            last_position: position,
            last_progress_at: now,
            tripped: false,
        }
    }

    /// When the next sample is due
    pub fn next_sample_at(&self) -> Duration {
        self.next_sample_at
    }

    /// Take a sample if one is due
    ///
    /// Returns `None` between samples and after the watchdog has tripped.
    /// Late calls take a single sample and realign to the sampling grid.
    pub fn poll(&mut self, now: Duration, position: f64) -> Option<WatchdogVerdict> {
        if self.tripped || now < self.next_sample_at {
            return None;
        }

        while self.next_sample_at <= now {
            self.next_sample_at += self.interval;
        }

        if (position - self.last_position).abs() > POSITION_EPSILON {
            self.last_position = position;
            self.last_progress_at = now;
            return Some(WatchdogVerdict::Progressing);
        }

        let stuck_for = now - self.last_progress_at;
        if stuck_for >= self.threshold {
            self.tripped = true;
            Some(WatchdogVerdict::Stalled { stuck_for })
        } else {
            Some(WatchdogVerdict::Stuck { stuck_for })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn watchdog() -> StallWatchdog {
        StallWatchdog::arm(Duration::ZERO, 0.0, secs(2), secs(8))
    }

    #[test]
    fn trips_on_fourth_unchanged_sample() {
        let mut dog = watchdog();
        assert_eq!(
            dog.poll(secs(2), 0.0),
            Some(WatchdogVerdict::Stuck { stuck_for: secs(2) })
        );
        assert_eq!(
            dog.poll(secs(4), 0.0),
            Some(WatchdogVerdict::Stuck { stuck_for: secs(4) })
        );
        assert_eq!(
            dog.poll(secs(6), 0.0),
            Some(WatchdogVerdict::Stuck { stuck_for: secs(6) })
        );
        assert_eq!(
            dog.poll(secs(8), 0.0),
            Some(WatchdogVerdict::Stalled { stuck_for: secs(8) })
        );
        assert_eq!(dog.poll(secs(10), 0.0), None);
    }

    #[test]
    fn no_sample_between_intervals() {
        let mut dog = watchdog();
        assert_eq!(dog.poll(Duration::from_millis(1_999), 0.0), None);
        assert_eq!(dog.next_sample_at(), secs(2));
    }

    #[test]
    fn progress_resets_stuck_span() {
        let mut dog = watchdog();
        dog.poll(secs(2), 0.0);
        dog.poll(secs(4), 0.0);
        assert_eq!(dog.poll(secs(6), 1.5), Some(WatchdogVerdict::Progressing));
        assert_eq!(
            dog.poll(secs(8), 1.5),
            Some(WatchdogVerdict::Stuck { stuck_for: secs(2) })
        );
        assert_eq!(
            dog.poll(secs(14), 1.5),
            Some(WatchdogVerdict::Stalled { stuck_for: secs(8) })
        );
    }

    #[test]
    fn backwards_jump_counts_as_movement() {
        let mut dog = StallWatchdog::arm(Duration::ZERO, 30.0, secs(2), secs(8));
        assert_eq!(dog.poll(secs(2), 0.5), Some(WatchdogVerdict::Progressing));
    }

    #[test]
    fn late_poll_realigns_to_grid() {
        let mut dog = watchdog();
        dog.poll(Duration::from_millis(5_300), 0.0);
        assert_eq!(dog.next_sample_at(), secs(6));
    }
}
