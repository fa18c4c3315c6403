//! Playback of the recorded take: play, seek, loop, rewind, and the
//! per-frame time tracker.

use std::time::Duration;

use tessitura_audio::{fade_factor, Rewind};
use tessitura_types::{Event, PlaybackSnapshot, PlaybackState};

use super::{Orchestrator, FADE_TIME_CONSTANT, VOLUME_TIME_CONSTANT};
use crate::error::SessionError;
use crate::timers::TimerKind;

/// Offsets this close to the end restart from the top.
const END_TOLERANCE_SECS: f64 = 0.1;
/// Rewinding from closer to zero than this is a no-op.
const REWIND_MIN_SECS: f64 = 0.05;

impl Orchestrator {
    /// Play the recorded take from `offset` seconds.
    pub fn play_recording(&mut self, offset: f64) -> Result<(), SessionError> {
        let duration = self.recorded_duration().ok_or(SessionError::NoRecording)?;
        let paused_playback =
            self.state == PlaybackState::Paused && self.resume_to == Some(PlaybackState::Playing);
        if !paused_playback {
            self.require(
                "play",
                &[
                    PlaybackState::Stopped,
                    PlaybackState::Playing,
                    PlaybackState::LoopWaiting,
                ],
            )?;
        }
        self.cancel_auto_loop();
        self.resume_to = None;
        self.paused_timers.clear();

        let offset = if offset >= duration - END_TOLERANCE_SECS {
            0.0
        } else {
            offset.max(0.0)
        };
        let now = self.now();
        self.start_playback(offset, now);
        Ok(())
    }

    /// Schedule the take from `offset` and start tracking time from there.
    pub(super) fn start_playback(&mut self, offset: f64, now: Duration) {
        self.scheduler.stop_all_sources();
        self.timers.cancel(TimerKind::LoopWait);
        let at = self.output_time(now);
        if let Some(take) = &self.take {
            let segment = &take.segment;
            if segment.end_secs() > offset {
                let into = (offset - segment.start_time_secs).max(0.0);
                let delay = (segment.start_time_secs - offset).max(0.0);
                self.scheduler.play_buffer_range(
                    segment.buffer.clone(),
                    into,
                    segment.duration_secs - into,
                    at + delay,
                );
            }
        }
        self.elapsed = offset;
        self.tracker.start(now, offset);
        self.applied_status = None;
        self.conductor.reset_cursor();
        self.set_state(PlaybackState::Playing);
        self.arm_conductor(now);
    }

    /// Move the playhead. Playing re-schedules from the new position.
    pub fn seek(&mut self, to: f64) -> Result<(), SessionError> {
        self.require(
            "seek",
            &[
                PlaybackState::Stopped,
                PlaybackState::Paused,
                PlaybackState::Playing,
                PlaybackState::LoopWaiting,
            ],
        )?;
        // A paused take keeps recording contiguous audio; only paused
        // playback has a playhead to move.
        if self.state == PlaybackState::Paused && self.resume_to != Some(PlaybackState::Playing) {
            return Err(SessionError::InvalidState {
                action: "seek",
                state: self.state,
            });
        }
        let limit = self
            .recorded_duration()
            .unwrap_or(0.0)
            .max(self.session.transport.total_secs());
        let to = to.clamp(0.0, limit);
        log::debug!(target: "session", "seek to {:.2}s", to);
        self.elapsed = to;

        match self.state {
            PlaybackState::Playing | PlaybackState::LoopWaiting if self.take.is_some() => {
                let now = self.now();
                self.start_playback(to, now);
            }
            _ => {}
        }
        Ok(())
    }

    pub fn set_loop(&mut self, on: bool) -> Result<(), SessionError> {
        if self.looping == on {
            return Ok(());
        }
        self.looping = on;
        self.emit(Event::LoopChanged(on));

        match self.state {
            PlaybackState::Stopped if on && self.take.is_some() => {
                self.play_recording(0.0)?;
            }
            PlaybackState::LoopWaiting if !on => {
                self.timers.cancel(TimerKind::LoopWait);
                self.set_state(PlaybackState::Stopped);
            }
            _ => {}
        }
        Ok(())
    }

    /// Run the playhead back to zero with an accelerating tape-rewind curve.
    pub fn start_rewind(&mut self) -> Result<(), SessionError> {
        self.require("rewind", &[PlaybackState::Stopped])?;
        if self.elapsed <= REWIND_MIN_SECS {
            self.elapsed = 0.0;
            return Ok(());
        }
        self.cancel_auto_loop();
        self.rewind = Some(Rewind::start(self.now()));
        self.set_state(PlaybackState::Rewinding);
        Ok(())
    }

    /// Stop and forget the recorded take.
    pub fn clear_recording(&mut self) {
        self.stop(false, true);
        self.drop_take();
    }

    pub(super) fn drop_take(&mut self) {
        self.cancel_auto_loop();
        self.take = None;
        self.snapshots.clear();
        self.elapsed = 0.0;
        self.emit(Event::RecordingCleared);
    }

    /// One time-tracker frame.
    pub(super) fn track_frame(&mut self, now: Duration) {
        if !self.state.is_tracking() {
            return;
        }
        let Some(elapsed) = self.tracker.elapsed_at(now) else {
            return;
        };

        match self.state {
            PlaybackState::Recording => {
                self.elapsed = elapsed;
                let snapshot = PlaybackSnapshot::capture(
                    elapsed,
                    &self.session,
                    self.stage.as_ref().map(|s| s.name.as_str()),
                    self.stage.as_ref().is_some_and(|s| s.is_ai),
                );
                if !self.snapshots.append(snapshot) {
                    log::trace!(target: "session", "snapshot at {:.3}s skipped", elapsed);
                }
            }
            PlaybackState::Playing => {
                if let Some(duration) = self.recorded_duration() {
                    if elapsed >= duration {
                        self.finish_playback(now, duration);
                        return;
                    }
                }
                self.elapsed = elapsed;
                self.replay_snapshot(elapsed);
            }
            _ => self.elapsed = elapsed,
        }
        self.update_gain();
    }

    fn replay_snapshot(&mut self, elapsed: f64) {
        let Some(snapshot) = self.snapshots.find_at_or_before(elapsed).cloned() else {
            return;
        };
        let applied = snapshot.apply(&mut self.session);
        if applied.prompts_changed {
            self.emit(Event::ConductorKnobsUpdate(self.session.prompts.clone()));
        }
        if applied.instruments_changed {
            self.emit(Event::ConductorInstrumentsUpdate(self.session.instruments.clone()));
        }
        if snapshot.status_message != self.applied_status {
            if let Some(name) = &snapshot.status_message {
                self.emit(Event::ConductorStageChanged {
                    name: name.clone(),
                    is_ai: snapshot.is_ai_phase,
                });
            }
            self.applied_status = snapshot.status_message;
        }
    }

    fn finish_playback(&mut self, now: Duration, duration: f64) {
        self.scheduler.stop_all_sources();
        self.tracker.stop();
        self.timers.cancel(TimerKind::ConductorTick);
        self.elapsed = duration;
        if self.looping {
            self.timers.arm(TimerKind::LoopWait, now, self.timing.loop_wait);
            self.set_state(PlaybackState::LoopWaiting);
        } else {
            self.set_state(PlaybackState::Stopped);
        }
    }

    pub(super) fn rewind_frame(&mut self, now: Duration) {
        if self.state != PlaybackState::Rewinding {
            return;
        }
        let Some(rewind) = self.rewind.as_mut() else {
            return;
        };
        self.elapsed = rewind.step(now, self.elapsed);
        if self.elapsed <= 0.0 {
            self.elapsed = 0.0;
            self.rewind = None;
            self.set_state(PlaybackState::Stopped);
        }
    }

    /// Follow the fade envelope; silent while warming up.
    fn update_gain(&mut self) {
        let target = self.gain_target();
        self.scheduler.set_master_target(target, FADE_TIME_CONSTANT);
    }

    fn gain_target(&self) -> f32 {
        if self.state.is_pre_roll() {
            return 0.0;
        }
        let transport = &self.session.transport;
        fade_factor(
            self.elapsed,
            transport.total_secs(),
            transport.fade_in_secs,
            transport.fade_out_secs,
        ) * transport.volume
    }

    pub(super) fn apply_volume(&mut self) {
        if matches!(self.state, PlaybackState::Recording | PlaybackState::Playing) {
            let target = self.gain_target();
            self.scheduler.set_master_target(target, VOLUME_TIME_CONSTANT);
        }
    }

    pub(super) fn start_auto_loop(&mut self, now: Duration) {
        let grace = self.timing.auto_loop_grace_secs;
        if grace == 0 || self.take.is_none() {
            return;
        }
        self.auto_loop_remaining = grace;
        self.timers
            .arm_every(TimerKind::AutoLoopCountdown, now, Duration::from_secs(1));
        self.emit(Event::AutoLoopCountdown {
            remaining_secs: grace,
        });
    }

    pub(super) fn auto_loop_step(&mut self, now: Duration) {
        self.auto_loop_remaining = self.auto_loop_remaining.saturating_sub(1);
        if self.auto_loop_remaining > 0 {
            self.emit(Event::AutoLoopCountdown {
                remaining_secs: self.auto_loop_remaining,
            });
            return;
        }
        self.timers.cancel(TimerKind::AutoLoopCountdown);
        if self.state != PlaybackState::Stopped || self.take.is_none() {
            return;
        }
        log::info!(target: "session", "auto-loop engaged");
        self.looping = true;
        self.emit(Event::LoopChanged(true));
        self.emit(Event::AutoLoopEngaged);
        self.start_playback(0.0, now);
    }

    pub(super) fn cancel_auto_loop(&mut self) {
        if self.timers.cancel(TimerKind::AutoLoopCountdown) {
            log::debug!(target: "session", "auto-loop cancelled");
        }
        self.auto_loop_remaining = 0;
    }
}
