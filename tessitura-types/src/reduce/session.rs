use crate::{GenerationMode, Intent, SessionState};

/// What a reducer touched, so the caller can refresh and notify.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reduced {
    pub prompts: bool,
    pub instruments: bool,
    pub settings: bool,
    /// The generation mode had to be reverted (vocalization without a voice).
    pub mode_reverted: bool,
}

impl Reduced {
    pub fn any(&self) -> bool {
        self.prompts || self.instruments || self.settings || self.mode_reverted
    }
}

/// Apply a parameter intent. Returns `None` for intents that are not
/// session-parameter edits.
pub fn reduce_session(intent: &Intent, session: &mut SessionState) -> Option<Reduced> {
    let mut out = Reduced::default();
    match intent {
        Intent::SetPromptWeight(id, weight) => {
            if let Some(prompt) = session.prompts.get_mut(id) {
                prompt.set_weight(*weight);
                out.prompts = true;
            }
        }
        Intent::SetPrompts(prompts) => {
            session.prompts = prompts.clone();
            for p in session.prompts.values_mut() {
                let w = p.weight;
                p.set_weight(w);
            }
            out.prompts = true;
        }
        Intent::SetInstruments(instruments) => {
            session.instruments = instruments.clone();
            out.instruments = true;
        }
        Intent::SetChannelActive(role, active) => {
            session.instruments.get_mut(*role).set_active(*active);
            out.instruments = true;
        }
        Intent::SetChannelWeight(role, weight) => {
            session.instruments.get_mut(*role).set_weight(*weight);
            out.instruments = true;
        }
        Intent::SetGlobalSettings(update) => {
            out.settings = update.apply_to(&mut session.settings);
        }
        Intent::SetEvolution(evolution) => {
            session.set_evolution(*evolution);
            out.settings = true;
        }
        Intent::SetSeed(seed) => {
            session.settings.seed = *seed;
            out.settings = true;
        }
        Intent::SetSpecialInstruction(text) => {
            session.special_instruction = text
                .as_ref()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty());
            out.settings = true;
        }
        Intent::LockChannels(locked) => {
            session.channels_locked = *locked;
        }
        Intent::SetGenerationMode(mode) => {
            let effective = session.effective_mode(*mode);
            out.mode_reverted = effective != *mode;
            out.settings = session.generation_mode != effective;
            session.generation_mode = effective;
        }
        Intent::SetMaxDuration(minutes) => {
            session.transport.max_duration_minutes = (*minutes).max(1);
        }
        Intent::SetFades {
            fade_in_secs,
            fade_out_secs,
        } => {
            session.transport.fade_in_secs = fade_in_secs.max(0.0);
            session.transport.fade_out_secs = fade_out_secs.max(0.0);
        }
        Intent::SetVolume(volume) => {
            session.transport.volume = volume.clamp(0.0, 1.0);
        }
        _ => return None,
    }

    // Losing the last voice drops vocalization.
    if out.instruments
        && session.generation_mode == GenerationMode::Vocalization
        && !session.instruments.is_vocal_instrument_active()
    {
        session.generation_mode = GenerationMode::Quality;
        out.mode_reverted = true;
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChannelRole, GlobalSettingsUpdate, PromptId};

    #[test]
    fn prompt_weight_is_clamped() {
        let mut s = SessionState::new();
        let r = reduce_session(&Intent::SetPromptWeight(PromptId::indexed(2), 5.0), &mut s).unwrap();
        assert!(r.prompts);
        assert_eq!(s.prompts[&PromptId::indexed(2)].weight, 2.0);
    }

    #[test]
    fn unknown_prompt_is_ignored() {
        let mut s = SessionState::new();
        let r = reduce_session(&Intent::SetPromptWeight(PromptId::new("x"), 1.0), &mut s).unwrap();
        assert!(!r.any());
    }

    #[test]
    fn channel_mute_and_restore() {
        let mut s = SessionState::new();
        reduce_session(&Intent::SetChannelWeight(ChannelRole::Lead, 1.5), &mut s);
        reduce_session(&Intent::SetChannelActive(ChannelRole::Lead, false), &mut s);
        assert_eq!(s.instruments.lead.weight, 0.0);
        reduce_session(&Intent::SetChannelActive(ChannelRole::Lead, true), &mut s);
        assert_eq!(s.instruments.lead.weight, 1.5);
    }

    #[test]
    fn vocalization_reverts_without_voice() {
        let mut s = SessionState::new();
        let r = reduce_session(&Intent::SetGenerationMode(GenerationMode::Vocalization), &mut s)
            .unwrap();
        assert!(r.mode_reverted);
        assert_eq!(s.generation_mode, GenerationMode::Quality);

        s.instruments.lead.instrument = "Choir".into();
        reduce_session(&Intent::SetGenerationMode(GenerationMode::Vocalization), &mut s);
        assert_eq!(s.generation_mode, GenerationMode::Vocalization);

        let r = reduce_session(&Intent::SetChannelActive(ChannelRole::Lead, false), &mut s).unwrap();
        assert!(r.mode_reverted);
        assert_eq!(s.generation_mode, GenerationMode::Quality);
    }

    #[test]
    fn blank_special_instruction_clears() {
        let mut s = SessionState::new();
        reduce_session(&Intent::SetSpecialInstruction(Some("  ".into())), &mut s);
        assert!(s.special_instruction.is_none());
        reduce_session(&Intent::SetSpecialInstruction(Some(" Take Five ".into())), &mut s);
        assert_eq!(s.special_instruction.as_deref(), Some("Take Five"));
    }

    #[test]
    fn settings_update_and_transport() {
        let mut s = SessionState::new();
        let update = GlobalSettingsUpdate {
            genre: Some("Rock".into()),
            ..Default::default()
        };
        assert!(reduce_session(&Intent::SetGlobalSettings(update), &mut s).unwrap().settings);
        reduce_session(&Intent::SetMaxDuration(0), &mut s);
        assert_eq!(s.transport.max_duration_minutes, 1);
        reduce_session(&Intent::SetVolume(1.4), &mut s);
        assert_eq!(s.transport.volume, 1.0);
        assert!(reduce_session(&Intent::Stop, &mut s).is_none());
    }
}
