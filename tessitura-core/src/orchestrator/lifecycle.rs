//! Record, stop, pause and resume; the live session and the planner race.

use std::time::Duration;

use crossbeam_channel::TryRecvError;

use tessitura_types::{Event, PlanSource, PlaybackState};

use super::{Orchestrator, StageLabel};
use crate::conductor::ConductorPhase;
use crate::error::SessionError;
use crate::payload::build_weighted_prompts;
use crate::presets::apply_genre_presets;
use crate::service::{parse_plan, PlanRequest, SessionEvent};
use crate::timers::TimerKind;

/// One-shot timers that survive a pause.
const PAUSABLE_TIMERS: [TimerKind; 3] = [
    TimerKind::AutoStop,
    TimerKind::WarmupEnd,
    TimerKind::PreparingEnd,
];

impl Orchestrator {
    /// Start a new take. Any running session is stopped and its take
    /// discarded first.
    pub fn record(&mut self) -> Result<(), SessionError> {
        let settings = &self.session.settings;
        settings.validate().map_err(SessionError::InvalidSettings)?;
        if !self.styles.is_valid_style(&settings.genre, &settings.style) {
            return Err(SessionError::InvalidSettings(format!(
                "style {} does not belong to {}",
                settings.style, settings.genre
            )));
        }
        if self.session.instruments.enabled_count() == 0 {
            return Err(SessionError::NoActiveChannels);
        }

        self.stop(false, true);
        self.drop_take();
        let now = self.now();

        if self.conductor.is_enabled() {
            apply_genre_presets(&mut self.session);
            self.emit(Event::ConductorKnobsUpdate(self.session.prompts.clone()));
            self.emit(Event::ConductorInstrumentsUpdate(self.session.instruments.clone()));
        }
        self.conductor.build_fallback_plan(&self.session);
        self.stage = None;
        self.elapsed = 0.0;
        self.set_state(PlaybackState::Loading);

        self.generation = self.generation.next();
        log::info!(target: "session", "connecting generation session {}", self.generation);
        let mut live = match self
            .generation_service
            .connect(self.generation, self.inbox_tx.clone())
        {
            Ok(live) => live,
            Err(e) => {
                log::warn!(target: "session", "connect failed: {}", e);
                self.set_state(PlaybackState::Stopped);
                return Err(e.into());
            }
        };
        let prompts = build_weighted_prompts(&self.session, self.vocal_signal);
        if let Err(e) = live.set_weighted_prompts(&prompts).and_then(|()| live.play()) {
            log::warn!(target: "session", "generation session refused to start: {}", e);
            live.close();
            self.set_state(PlaybackState::Stopped);
            return Err(e.into());
        }
        self.live = Some(live);
        self.last_prompt_push = Some(now);
        self.scheduler.reset_stream_cursor();

        if self.conductor.is_enabled() {
            self.begin_warmup(now);
        } else {
            self.begin_recording(now);
        }
        Ok(())
    }

    fn begin_warmup(&mut self, now: Duration) {
        let warmup = self
            .timing
            .warmup_duration(self.session.transport.max_duration_minutes);
        self.timers.arm(TimerKind::WarmupEnd, now, warmup);
        self.tracker.start(now, 0.0);
        self.scheduler.set_master_immediately(0.0);
        self.set_state(PlaybackState::Warmup);
        self.emit(Event::WarmupStarted {
            total_ms: (warmup + self.timing.preparing).as_millis() as u64,
            warmup_ms: warmup.as_millis() as u64,
        });

        if self.conductor.planner_available() {
            if let Some(planner) = self.planner.as_mut() {
                log::debug!(target: "conductor", "requesting plan");
                self.pending_plan = Some(planner.request_plan(PlanRequest::from_session(&self.session)));
            }
        }
        self.arm_conductor(now);
    }

    pub(super) fn begin_preparing(&mut self, now: Duration) {
        // A reply that has not arrived by now is too late.
        self.pending_plan = None;
        self.timers.cancel(TimerKind::WarmupEnd);
        self.timers.arm(TimerKind::PreparingEnd, now, self.timing.preparing);
        self.set_state(PlaybackState::Preparing);
    }

    pub(super) fn begin_recording(&mut self, now: Duration) {
        self.elapsed = 0.0;
        self.tracker.start(now, 0.0);
        self.conductor.reset_cursor();
        self.scheduler.start_recording();
        let minutes = self.session.transport.max_duration_minutes;
        self.timers
            .arm(TimerKind::AutoStop, now, self.timing.auto_stop_after(minutes));
        self.set_state(PlaybackState::Recording);

        if self.conductor.is_active() {
            self.announce_current_stage();
        }
        self.arm_conductor(now);
    }

    /// End whatever is running. With `save` a take being recorded becomes
    /// the recording; without it the take is thrown away. Calling it again
    /// does nothing.
    pub fn stop(&mut self, save: bool, reset_to_zero: bool) {
        let now = self.now();
        self.timers.cancel_all();
        self.paused_timers.clear();
        self.resume_to = None;
        self.pending_plan = None;
        if let Some(elapsed) = self.tracker.elapsed_at(now) {
            self.elapsed = elapsed;
        }
        self.tracker.stop();
        self.rewind = None;
        self.auto_loop_remaining = 0;

        if let Some(mut live) = self.live.take() {
            log::info!(target: "session", "closing generation session {}", self.generation);
            live.close();
        }
        self.scheduler.stop_all_sources();
        self.scheduler.reset_stream_cursor();
        self.conductor.clear_hands();
        if self.conductor.phase() == ConductorPhase::Engaging {
            self.conductor.activate();
        }
        if self.vocal_signal.take().is_some() {
            self.emit(Event::VocalSignalReceived(None));
        }
        if reset_to_zero {
            self.elapsed = 0.0;
        }

        let mut finished = None;
        if self.scheduler.is_recording() {
            if save {
                finished = self.scheduler.finish_recording();
                if finished.is_none() {
                    log::warn!(target: "session", "take was empty or unreadable, nothing saved");
                }
            } else {
                log::debug!(target: "session", "discarding take");
                self.scheduler.discard_recording();
                self.snapshots.clear();
            }
        }

        self.set_state(PlaybackState::Stopped);

        if let Some(take) = finished {
            let duration_secs = take.segment.end_secs();
            self.snapshots.seal();
            self.take = Some(take);
            log::info!(target: "session", "recording available ({:.1}s)", duration_secs);
            self.emit(Event::RecordingAvailable { duration_secs });
            if !self.looping {
                self.start_auto_loop(now);
            }
        }
    }

    pub(super) fn auto_stop(&mut self, now: Duration) {
        log::info!(target: "session", "maximum duration reached");
        self.stop(true, false);
        self.emit(Event::RecordingFinishedAuto);
        if self.looping && self.take.is_some() {
            self.start_playback(0.0, now);
        }
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.require(
            "pause",
            &[
                PlaybackState::Recording,
                PlaybackState::Playing,
                PlaybackState::Warmup,
                PlaybackState::Preparing,
            ],
        )?;
        let now = self.now();
        if let Some(elapsed) = self.tracker.elapsed_at(now) {
            self.elapsed = elapsed;
        }
        self.paused_timers = PAUSABLE_TIMERS
            .iter()
            .filter_map(|&kind| self.timers.remaining(kind, now).map(|left| (kind, left)))
            .collect();
        for &kind in &PAUSABLE_TIMERS {
            self.timers.cancel(kind);
        }
        self.timers.cancel(TimerKind::ConductorTick);
        self.tracker.stop();
        self.scheduler.stop_all_sources();
        self.scheduler.reset_stream_cursor();
        if self.state == PlaybackState::Recording {
            self.scheduler.pause_recording();
        }
        self.resume_to = Some(self.state);
        self.set_state(PlaybackState::Paused);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.require("resume", &[PlaybackState::Paused])?;
        let Some(target) = self.resume_to.take() else {
            return Err(SessionError::InvalidState {
                action: "resume",
                state: self.state,
            });
        };
        let now = self.now();
        for (kind, left) in std::mem::take(&mut self.paused_timers) {
            self.timers.arm(kind, now, left);
        }

        if target == PlaybackState::Playing {
            self.start_playback(self.elapsed, now);
            return Ok(());
        }
        if target == PlaybackState::Recording {
            self.scheduler.resume_recording();
        }
        self.tracker.start(now, self.elapsed);
        self.set_state(target);
        self.arm_conductor(now);
        Ok(())
    }

    /// Enable or disable the conductor.
    pub fn set_conductor(&mut self, enabled: bool) {
        let now = self.now();
        if !enabled {
            if self.conductor.is_enabled() {
                log::info!(target: "conductor", "released");
            }
            self.conductor.deactivate();
            self.timers.cancel(TimerKind::ConductorTick);
            self.timers.cancel(TimerKind::EngagingCountdown);
            return;
        }
        if self.conductor.is_enabled() {
            return;
        }

        if self.state.is_live() {
            // Too late for the planner; take over from the local plan.
            self.conductor.set_planner_available(false);
            if self.conductor.plan().is_empty() {
                self.conductor.build_fallback_plan(&self.session);
            }
            self.conductor.begin_engaging();
            self.timers
                .arm(TimerKind::EngagingCountdown, now, self.timing.engaging);
            self.emit(Event::ConductorEngaging {
                countdown_ms: self.timing.engaging.as_millis() as u64,
            });
        } else {
            self.conductor.activate();
            match self.planner.as_mut() {
                Some(planner) => self.pending_handshake = Some(planner.check_availability()),
                None => self.emit(Event::HandshakeResult(false)),
            }
        }
        self.arm_conductor(now);
    }

    pub(super) fn finish_engaging(&mut self) {
        log::info!(target: "conductor", "engaged");
        self.conductor.activate();
        self.emit(Event::ConductorEngaged);
        self.announce_current_stage();
    }

    fn announce_current_stage(&mut self) {
        let is_ai = self.conductor.plan_source() == PlanSource::Planner;
        if let Some(stage) = self.conductor.current_stage() {
            let name = stage.stage_name.clone();
            self.stage = Some(StageLabel {
                name: name.clone(),
                is_ai,
            });
            self.emit(Event::ConductorStageChanged { name, is_ai });
        }
    }

    /// Keep the conductor timer running while it has something to drive.
    pub(super) fn arm_conductor(&mut self, now: Duration) {
        if self.conductor.is_enabled()
            && self.state.is_tracking()
            && !self.timers.is_armed(TimerKind::ConductorTick)
        {
            self.timers
                .arm_every(TimerKind::ConductorTick, now, self.timing.conductor_interval);
        }
    }

    pub(super) fn conductor_step(&mut self, now: Duration) {
        if !self.conductor.is_active() || !self.state.is_tracking() {
            return;
        }
        let drive = self.state != PlaybackState::Playing;
        let at = if self.state.is_pre_roll() { 0.0 } else { self.elapsed };
        let out = self.conductor.tick(&mut self.session, at, now, drive);

        if let Some(change) = out.stage_changed {
            // During replay the snapshots carry the stage label.
            if drive {
                self.stage = Some(StageLabel {
                    name: change.name.clone(),
                    is_ai: change.is_ai,
                });
                self.emit(Event::ConductorStageChanged {
                    name: change.name,
                    is_ai: change.is_ai,
                });
            }
        }
        if out.prompts_changed {
            self.emit(Event::ConductorKnobsUpdate(self.session.prompts.clone()));
        }
        if out.instruments_changed {
            self.emit(Event::ConductorInstrumentsUpdate(self.session.instruments.clone()));
            self.guard_generation_mode();
        }
        if let Some(vowel) = out.vocal_cue {
            self.vocal_signal = Some(vowel);
            self.timers
                .arm(TimerKind::VocalSignalExpiry, now, self.timing.vocal_signal);
            self.emit(Event::VocalSignalReceived(Some(vowel)));
        }
        if out.prompts_changed || out.instruments_changed || out.vocal_cue.is_some() {
            self.request_prompt_refresh(now);
        }
    }

    /// Handle everything the live session sent since the last tick.
    pub(super) fn drain_inbox(&mut self, now: Duration) {
        while let Ok(msg) = self.inbox_rx.try_recv() {
            if msg.generation != self.generation || self.live.is_none() {
                log::debug!(
                    target: "session",
                    "dropping message from stale session {}",
                    msg.generation
                );
                continue;
            }
            match msg.event {
                SessionEvent::AudioChunk(pcm) => {
                    if !self.state.is_live() {
                        continue;
                    }
                    let at = self.output_time(now);
                    if let Err(e) = self.scheduler.enqueue_generated_chunk(&pcm, at) {
                        log::warn!(target: "audio::scheduler", "dropping chunk: {}", e);
                    }
                }
                SessionEvent::Error(reason) => {
                    log::warn!(target: "session", "generation session error: {}", reason);
                    self.stop(true, false);
                }
                SessionEvent::Closed => {
                    log::info!(target: "session", "generation session closed");
                    self.stop(true, false);
                }
            }
        }
    }

    pub(super) fn poll_planner(&mut self, now: Duration) {
        if let Some(rx) = &self.pending_handshake {
            let reply = match rx.try_recv() {
                Ok(available) => Some(available),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(false),
            };
            if let Some(available) = reply {
                self.pending_handshake = None;
                log::info!(target: "conductor", "planner available: {}", available);
                self.conductor.set_planner_available(available);
                self.emit(Event::HandshakeResult(available));
            }
        }

        if self.state != PlaybackState::Warmup {
            return;
        }
        let Some(rx) = &self.pending_plan else {
            return;
        };
        let reply = match rx.try_recv() {
            Ok(reply) => reply,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                log::debug!(target: "conductor", "planner went away, keeping fallback plan");
                self.pending_plan = None;
                return;
            }
        };
        self.pending_plan = None;
        match reply.and_then(|text| parse_plan(&text)) {
            Ok(stages) => {
                self.conductor.adopt_plan(stages);
                self.begin_preparing(now);
            }
            Err(e) => {
                log::debug!(target: "conductor", "plan unusable ({}), keeping fallback plan", e);
            }
        }
    }
}
