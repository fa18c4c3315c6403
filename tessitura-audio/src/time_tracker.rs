use std::time::Duration;

/// Rewind reaches full speed after this many seconds.
const REWIND_RAMP_SECS: f64 = 4.0;
/// Full rewind speed, as a multiple of real time.
const REWIND_MAX_SPEED: f64 = 50.0;

/// Maps wall-clock time onto the recording timeline:
/// `elapsed = offset + (now - anchor)` while running.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeTracker {
    anchor: Option<(Duration, f64)>,
}

impl TimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, now: Duration, elapsed: f64) {
        self.anchor = Some((now, elapsed));
    }

    pub fn stop(&mut self) {
        self.anchor = None;
    }

    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn elapsed_at(&self, now: Duration) -> Option<f64> {
        self.anchor
            .map(|(at, offset)| offset + now.saturating_sub(at).as_secs_f64())
    }
}

/// Rewind speed after `since_start` seconds of rewinding.
pub fn rewind_speed(since_start: f64) -> f64 {
    REWIND_MAX_SPEED.powf((since_start / REWIND_RAMP_SECS).clamp(0.0, 1.0))
}

/// An accelerating rewind toward zero.
#[derive(Debug, Clone, Copy)]
pub struct Rewind {
    started: Duration,
    last_frame: Duration,
}

impl Rewind {
    pub fn start(now: Duration) -> Self {
        Self {
            started: now,
            last_frame: now,
        }
    }

    /// Advance to `now`, returning the new (never negative) position.
    pub fn step(&mut self, now: Duration, elapsed: f64) -> f64 {
        let delta = now.saturating_sub(self.last_frame).as_secs_f64();
        let since = now.saturating_sub(self.started).as_secs_f64();
        self.last_frame = now;
        (elapsed - delta * rewind_speed(since)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn elapsed_is_offset_plus_wall_time() {
        let mut t = TimeTracker::new();
        assert_eq!(t.elapsed_at(ms(10)), None);
        t.start(ms(1_000), 12.0);
        assert!((t.elapsed_at(ms(3_500)).unwrap() - 14.5).abs() < 1e-9);
        t.stop();
        assert!(!t.is_running());
    }

    #[test]
    fn rewind_speed_curve() {
        assert_eq!(rewind_speed(0.0), 1.0);
        assert!((rewind_speed(2.0) - 50f64.sqrt()).abs() < 1e-9);
        assert_eq!(rewind_speed(4.0), 50.0);
        assert_eq!(rewind_speed(30.0), 50.0);
    }

    #[test]
    fn rewind_from_two_minutes_reaches_zero_quickly() {
        let mut r = Rewind::start(ms(0));
        let mut pos = 120.0;
        let mut now = 0;
        while pos > 0.0 {
            now += 16;
            let next = r.step(ms(now), pos);
            assert!(next < pos);
            pos = next;
            assert!(now < 10_000, "rewind took too long");
        }
        assert!(now > 4_000);
    }
}
