use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::TimerSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Idle,
    Running {
        started: Instant,
        accumulated: Duration,
    },
    Paused {
        accumulated: Duration,
    },
}

/// Start/pause/reset walk timer.
///
/// Time only accumulates while running. Every call takes `now` explicitly so
/// the caller decides which clock drives it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stopwatch {
    state: State,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    pub fn start(&mut self, now: Instant) {
        let accumulated = match self.state {
            State::Running { .. } => return,
            State::Idle => Duration::ZERO,
            State::Paused { accumulated } => accumulated,
        };
        self.state = State::Running {
            started: now,
            accumulated,
        };
    }

    pub fn pause(&mut self, now: Instant) {
        if let State::Running { .. } = self.state {
            self.state = State::Paused {
                accumulated: self.elapsed(now),
            };
        }
    }

    pub fn toggle(&mut self, now: Instant) {
        if self.is_running() {
            self.pause(now);
        } else {
            self.start(now);
        }
    }

    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.state {
            State::Idle => Duration::ZERO,
            State::Running {
                started,
                accumulated,
            } => accumulated + now.saturating_duration_since(started),
            State::Paused { accumulated } => accumulated,
        }
    }

    /// `start_time` is re-based so that `wall_now - start_time` equals the
    /// accumulated running time.
    pub fn snapshot(&self, now: Instant, wall_now: DateTime<Utc>) -> TimerSnapshot {
        let elapsed = self.elapsed(now);
        let start_time = match self.state {
            State::Idle => None,
            _ => chrono::Duration::from_std(elapsed)
                .ok()
                .and_then(|d| wall_now.checked_sub_signed(d)),
        };
        TimerSnapshot {
            start_time,
            duration: elapsed.as_secs(),
            is_running: self.is_running(),
        }
    }
}

/// `MM:SS`, or `HH:MM:SS` from one hour on.
pub fn format_clock(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(t0: Instant, secs: u64) -> Instant {
        t0 + Duration::from_secs(secs)
    }

    #[test]
    fn test_pause_and_resume_accumulates_running_time_only() {
        let t0 = Instant::now();
        let mut watch = Stopwatch::new();

        watch.start(t0);
        watch.pause(at(t0, 5));
        watch.start(at(t0, 10));

        assert_eq!(watch.elapsed(at(t0, 12)), Duration::from_secs(7));
    }

    #[test]
    fn test_idle_snapshot() {
        let watch = Stopwatch::new();
        let snapshot = watch.snapshot(Instant::now(), Utc::now());
        assert_eq!(snapshot.start_time, None);
        assert_eq!(snapshot.duration, 0);
        assert!(!snapshot.is_running);
    }

    #[test]
    fn test_snapshot_rebases_start_time() {
        let t0 = Instant::now();
        let wall = Utc::now();
        let mut watch = Stopwatch::new();
        watch.start(t0);
        watch.pause(at(t0, 5));
        watch.start(at(t0, 10));

        let snapshot = watch.snapshot(at(t0, 12), wall);
        assert_eq!(snapshot.duration, 7);
        assert!(snapshot.is_running);
        assert_eq!(snapshot.start_time, Some(wall - chrono::Duration::seconds(7)));
    }

    #[test]
    fn test_duration_is_floored() {
        let t0 = Instant::now();
        let mut watch = Stopwatch::new();
        watch.start(t0);
        let snapshot = watch.snapshot(t0 + Duration::from_millis(2_999), Utc::now());
        assert_eq!(snapshot.duration, 2);
    }

    #[test]
    fn test_toggle_and_reset() {
        let t0 = Instant::now();
        let mut watch = Stopwatch::new();
        watch.toggle(t0);
        assert!(watch.is_running());
        watch.toggle(at(t0, 3));
        assert!(!watch.is_running());
        assert_eq!(watch.elapsed(at(t0, 100)), Duration::from_secs(3));

        watch.reset();
        assert_eq!(watch.elapsed(at(t0, 100)), Duration::ZERO);
    }

    #[test]
    fn test_start_while_running_keeps_original_start() {
        let t0 = Instant::now();
        let mut watch = Stopwatch::new();
        watch.start(t0);
        watch.start(at(t0, 4));
        assert_eq!(watch.elapsed(at(t0, 6)), Duration::from_secs(6));
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Duration::from_secs(0)), "00:00");
        assert_eq!(format_clock(Duration::from_secs(75)), "01:15");
        assert_eq!(format_clock(Duration::from_secs(3_725)), "01:02:05");
    }
}
