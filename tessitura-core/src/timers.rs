//! Every pending timeout and interval of the orchestrator, in one place.
//!
//! Each kind has at most one deadline: arming a kind replaces whatever was
//! armed before, so a timer can never be scheduled twice.

use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    /// End of warmup (pre-roll) phase.
    WarmupEnd,
    /// End of the preparing countdown; recording begins.
    PreparingEnd,
    /// Recording reached its maximum length.
    AutoStop,
    /// Grace pause between the end of a looped take and its restart.
    LoopWait,
    /// Conductor takes over after the engaging countdown.
    EngagingCountdown,
    /// Conductor step interval.
    ConductorTick,
    /// The current vocal cue expires.
    VocalSignalExpiry,
    /// Trailing edge of the prompt push throttle.
    PromptRefresh,
    /// One-second steps of the auto-loop countdown.
    AutoLoopCountdown,
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Duration,
    every: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct Timers {
    deadlines: BTreeMap<TimerKind, Deadline>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire once, `after` from `now`.
    pub fn arm(&mut self, kind: TimerKind, now: Duration, after: Duration) {
        self.deadlines.insert(
            kind,
            Deadline {
                at: now + after,
                every: None,
            },
        );
    }

    /// Fire every `every`, first at `now + every`.
    pub fn arm_every(&mut self, kind: TimerKind, now: Duration, every: Duration) {
        self.deadlines.insert(
            kind,
            Deadline {
                at: now + every,
                every: Some(every),
            },
        );
    }

    /// Returns whether the kind was armed.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.deadlines.remove(&kind).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.deadlines.clear();
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.deadlines.contains_key(&kind)
    }

    pub fn remaining(&self, kind: TimerKind, now: Duration) -> Option<Duration> {
        self.deadlines
            .get(&kind)
            .map(|d| d.at.saturating_sub(now))
    }

    /// Take the earliest due timer, if any. One-shots are removed; intervals
    /// are re-armed past `now` (missed periods are skipped, not replayed).
    pub fn pop_due(&mut self, now: Duration) -> Option<TimerKind> {
        let (&kind, &deadline) = self
            .deadlines
            .iter()
            .filter(|(_, d)| d.at <= now)
            .min_by_key(|(_, d)| d.at)?;
        match deadline.every {
            Some(every) if !every.is_zero() => {
                let mut at = deadline.at + every;
                if at <= now {
                    at = now + every;
                }
                self.deadlines.insert(kind, Deadline { at, every: Some(every) });
            }
            _ => {
                self.deadlines.remove(&kind);
            }
        }
        Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn one_shot_fires_once() {
        let mut t = Timers::new();
        t.arm(TimerKind::AutoStop, ms(0), ms(100));
        assert_eq!(t.pop_due(ms(99)), None);
        assert_eq!(t.pop_due(ms(100)), Some(TimerKind::AutoStop));
        assert_eq!(t.pop_due(ms(500)), None);
    }

    #[test]
    fn rearming_replaces() {
        let mut t = Timers::new();
        t.arm(TimerKind::LoopWait, ms(0), ms(100));
        t.arm(TimerKind::LoopWait, ms(0), ms(300));
        assert_eq!(t.pop_due(ms(200)), None);
        assert_eq!(t.pop_due(ms(300)), Some(TimerKind::LoopWait));
        assert_eq!(t.pop_due(ms(300)), None);
    }

    #[test]
    fn due_timers_pop_in_deadline_order() {
        let mut t = Timers::new();
        t.arm(TimerKind::PromptRefresh, ms(0), ms(50));
        t.arm(TimerKind::WarmupEnd, ms(0), ms(80));
        t.arm(TimerKind::AutoStop, ms(0), ms(10));
        assert_eq!(t.pop_due(ms(100)), Some(TimerKind::AutoStop));
        assert_eq!(t.pop_due(ms(100)), Some(TimerKind::PromptRefresh));
        assert_eq!(t.pop_due(ms(100)), Some(TimerKind::WarmupEnd));
        assert_eq!(t.pop_due(ms(100)), None);
    }

    #[test]
    fn interval_skips_missed_periods() {
        let mut t = Timers::new();
        t.arm_every(TimerKind::ConductorTick, ms(0), ms(200));
        assert_eq!(t.pop_due(ms(1_000)), Some(TimerKind::ConductorTick));
        assert_eq!(t.pop_due(ms(1_000)), None);
        assert_eq!(t.remaining(TimerKind::ConductorTick, ms(1_000)), Some(ms(200)));
        assert!(t.cancel(TimerKind::ConductorTick));
        assert!(!t.cancel(TimerKind::ConductorTick));
    }
}
