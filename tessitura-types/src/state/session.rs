use serde::{Deserialize, Serialize};

use super::channel::InstrumentSet;
use super::playback::GenerationMode;
use super::prompt::{default_prompts, PromptMap};
use super::settings::{GlobalSettings, TransportSettings};

/// Range of the evolution control.
pub const EVOLUTION_RANGE: std::ops::RangeInclusive<f32> = -10.0..=10.0;

/// Everything the user (or the conductor) can edit about a session.
///
/// Owned by the orchestrator and lent to the conductor, the snapshot
/// recorder and the payload builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub prompts: PromptMap,
    pub instruments: InstrumentSet,
    pub settings: GlobalSettings,
    pub transport: TransportSettings,
    pub generation_mode: GenerationMode,
    /// -10.0 ..= 10.0; higher means busier, faster-moving performances.
    pub evolution: f32,
    /// When set, the conductor may not reassign instruments.
    pub channels_locked: bool,
    /// Free-text reference used when guidance asks for direct recreation.
    pub special_instruction: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            prompts: default_prompts(),
            instruments: InstrumentSet::default(),
            settings: GlobalSettings::default(),
            transport: TransportSettings::default(),
            generation_mode: GenerationMode::Quality,
            evolution: 0.0,
            channels_locked: false,
            special_instruction: None,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_evolution(&mut self, evolution: f32) {
        self.evolution = evolution.clamp(*EVOLUTION_RANGE.start(), *EVOLUTION_RANGE.end());
    }

    /// Mode actually usable with the current ensemble: vocalization needs
    /// an audible vocal instrument.
    pub fn effective_mode(&self, requested: GenerationMode) -> GenerationMode {
        if requested == GenerationMode::Vocalization && !self.instruments.is_vocal_instrument_active()
        {
            GenerationMode::Quality
        } else {
            requested
        }
    }

    /// Weight of the prompt with the given text, 0 if absent.
    pub fn prompt_weight(&self, text: &str) -> f32 {
        self.prompts
            .values()
            .find(|p| p.text == text)
            .map(|p| p.weight)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evolution_is_clamped() {
        let mut s = SessionState::new();
        s.set_evolution(25.0);
        assert_eq!(s.evolution, 10.0);
        s.set_evolution(-11.0);
        assert_eq!(s.evolution, -10.0);
    }

    #[test]
    fn vocalization_needs_a_voice() {
        let mut s = SessionState::new();
        assert_eq!(s.effective_mode(GenerationMode::Vocalization), GenerationMode::Quality);
        s.instruments.lead.instrument = "Solo Voice".into();
        assert_eq!(
            s.effective_mode(GenerationMode::Vocalization),
            GenerationMode::Vocalization
        );
        assert_eq!(s.effective_mode(GenerationMode::Diversity), GenerationMode::Diversity);
    }
}
