//! UI intents and the prompt payload pushed to the live session.

use std::time::Duration;

use tessitura_types::{reduce_session, Event, GenerationMode, Intent, PlaybackState};

use super::Orchestrator;
use crate::error::SessionError;
use crate::payload::build_weighted_prompts;
use crate::timers::TimerKind;

impl Orchestrator {
    /// Apply a UI intent. Refused intents leave everything untouched.
    pub fn dispatch(&mut self, intent: Intent) -> Result<(), SessionError> {
        if intent.edits_parameters() && self.state == PlaybackState::Playing {
            return Err(SessionError::InvalidState {
                action: "edit parameters",
                state: self.state,
            });
        }

        // Stop settles the auto-loop itself: it cancels the old countdown
        // and starts one for the take it finishes.
        let settles_auto_loop = matches!(intent, Intent::Stop);
        let result = self.apply_intent(intent);
        // Any accepted user action cancels a pending auto-loop.
        if result.is_ok() && !settles_auto_loop {
            self.cancel_auto_loop();
        }
        result
    }

    fn apply_intent(&mut self, intent: Intent) -> Result<(), SessionError> {
        match intent {
            Intent::Record => self.record(),
            Intent::Stop => {
                self.stop(true, false);
                Ok(())
            }
            Intent::Pause => self.pause(),
            Intent::Resume => self.resume(),
            Intent::Play => self.play_recording(self.elapsed),
            Intent::Seek(to) => self.seek(to),
            Intent::SetLoop(on) => self.set_loop(on),
            Intent::Rewind => self.start_rewind(),
            Intent::ClearRecording => {
                self.clear_recording();
                Ok(())
            }
            Intent::SetConductor(enabled) => {
                self.set_conductor(enabled);
                Ok(())
            }
            Intent::NotifyUserInteraction(field) => {
                let now = self.now();
                self.conductor.note_interaction(&field, now);
                Ok(())
            }
            Intent::SetGlobalSettings(update) => {
                let mut candidate = self.session.settings.clone();
                update.apply_to(&mut candidate);
                if !self.styles.is_valid_style(&candidate.genre, &candidate.style) {
                    return Err(SessionError::InvalidSettings(format!(
                        "style {} does not belong to {}",
                        candidate.style, candidate.genre
                    )));
                }
                self.reduce(Intent::SetGlobalSettings(update));
                Ok(())
            }
            other => {
                self.reduce(other);
                Ok(())
            }
        }
    }

    fn reduce(&mut self, intent: Intent) {
        let now = self.now();
        let Some(reduced) = reduce_session(&intent, &mut self.session) else {
            return;
        };

        // A hand on a control holds the conductor off it for a while.
        match &intent {
            Intent::SetPromptWeight(id, _) => self.conductor.note_interaction(id.as_str(), now),
            Intent::SetChannelActive(role, _) | Intent::SetChannelWeight(role, _) => {
                self.conductor.note_interaction(role.key(), now)
            }
            Intent::SetVolume(_) => self.apply_volume(),
            _ => {}
        }

        if reduced.mode_reverted || matches!(intent, Intent::SetGenerationMode(_)) {
            log::debug!(target: "session", "generation mode {}", self.session.generation_mode);
            self.emit(Event::ModeChanged(self.session.generation_mode));
        }
        if reduced.any() {
            self.request_prompt_refresh(now);
        }
    }

    /// Vocalization needs an audible voice; fall back to quality otherwise.
    pub(super) fn guard_generation_mode(&mut self) {
        let mode = self.session.generation_mode;
        let effective = self.session.effective_mode(mode);
        if effective != mode {
            log::info!(target: "session", "no vocal instrument left, {} -> {}", mode, effective);
            self.session.generation_mode = GenerationMode::Quality;
            self.emit(Event::ModeChanged(self.session.generation_mode));
        }
    }

    /// Push the prompt payload now, or at the end of the refresh window if
    /// one was pushed recently.
    pub(super) fn request_prompt_refresh(&mut self, now: Duration) {
        if self.live.is_none() {
            return;
        }
        match self.last_prompt_push {
            Some(last) if now.saturating_sub(last) < self.timing.prompt_refresh => {
                if !self.timers.is_armed(TimerKind::PromptRefresh) {
                    let wait = self.timing.prompt_refresh - now.saturating_sub(last);
                    self.timers.arm(TimerKind::PromptRefresh, now, wait);
                }
            }
            _ => self.push_prompts(now),
        }
    }

    pub(super) fn push_prompts(&mut self, now: Duration) {
        let Some(live) = self.live.as_mut() else {
            return;
        };
        let prompts = build_weighted_prompts(&self.session, self.vocal_signal);
        if let Err(e) = live.set_weighted_prompts(&prompts) {
            log::warn!(target: "session", "prompt update rejected: {}", e);
        }
        self.last_prompt_push = Some(now);
        // This push covers whatever the pending refresh would have sent.
        self.timers.cancel(TimerKind::PromptRefresh);
    }
}
