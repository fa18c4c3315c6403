use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::PromptId;

/// Weight above which a prompt (or channel) counts as audible.
pub const ACTIVE_THRESHOLD: f32 = 0.01;

/// Upper bound for prompt and channel weights.
pub const MAX_WEIGHT: f32 = 2.0;

/// A named musical nuance with a weight the generation service honours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: PromptId,
    pub text: String,
    /// 0.0 ..= 2.0
    pub weight: f32,
    /// Always `weight / 2`; the knob's display value.
    pub volume: f32,
    pub color: String,
}

impl Prompt {
    pub fn new(id: PromptId, text: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            weight: 0.0,
            volume: 0.0,
            color: color.into(),
        }
    }

    /// Set the weight, clamped to the valid range. Keeps `volume` in sync.
    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight.clamp(0.0, MAX_WEIGHT);
        self.volume = self.weight / 2.0;
    }

    pub fn is_active(&self) -> bool {
        self.weight > ACTIVE_THRESHOLD
    }
}

/// Prompts keyed by id. Ordered so iteration (and payload order) is stable.
pub type PromptMap = BTreeMap<PromptId, Prompt>;

const DEFAULT_PROMPTS: [(&str, &str); 18] = [
    ("Guidance", "#ffffff"),
    ("Density", "#ff6600"),
    ("Dynamics", "#ff8800"),
    ("Groove", "#ffaa00"),
    ("Attack", "#ffcc00"),
    ("Staccato", "#ffea00"),
    ("Brightness", "#00ccff"),
    ("Complexity", "#00aaff"),
    ("Ornamentation", "#0088ff"),
    ("Variation", "#0066ff"),
    ("Glide", "#0044ff"),
    ("Presence", "#0022ff"),
    ("Space", "#3dffab"),
    ("Organic", "#d8ff3e"),
    ("Texture", "#ffdd28"),
    ("Width", "#3dffab"),
    ("Atmosphere", "#d8ff3e"),
    ("Authenticity", "#00ff88"),
];

/// The eighteen stock nuances, all at weight 0.
pub fn default_prompts() -> PromptMap {
    DEFAULT_PROMPTS
        .iter()
        .enumerate()
        .map(|(i, (text, color))| {
            let id = PromptId::indexed(i);
            (id.clone(), Prompt::new(id, *text, *color))
        })
        .collect()
}

/// Look up a prompt by its display text (plan targets address prompts by name).
pub fn prompt_by_text<'a>(prompts: &'a PromptMap, text: &str) -> Option<&'a Prompt> {
    prompts.values().find(|p| p.text == text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompts_are_silent_and_ordered() {
        let prompts = default_prompts();
        assert_eq!(prompts.len(), 18);
        assert!(prompts.values().all(|p| p.weight == 0.0 && !p.is_active()));
        assert_eq!(prompts[&PromptId::indexed(0)].text, "Guidance");
        assert_eq!(prompts[&PromptId::indexed(17)].text, "Authenticity");
    }

    #[test]
    fn set_weight_clamps_and_tracks_volume() {
        let mut p = Prompt::new(PromptId::indexed(0), "Guidance", "#fff");
        p.set_weight(3.0);
        assert_eq!(p.weight, 2.0);
        assert_eq!(p.volume, 1.0);
        p.set_weight(-1.0);
        assert_eq!(p.weight, 0.0);
        p.set_weight(0.6);
        assert!((p.volume - 0.3).abs() < 1e-6);
        assert!(p.is_active());
    }

    #[test]
    fn lookup_by_text() {
        let prompts = default_prompts();
        let p = prompt_by_text(&prompts, "Groove").unwrap();
        assert_eq!(p.id, PromptId::indexed(3));
        assert!(prompt_by_text(&prompts, "Nope").is_none());
    }
}
