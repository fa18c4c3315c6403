//! Starting points for a conducted take, derived from mode, genre and mood.

use tessitura_types::{ChannelRole, GenerationMode, SessionState};

use crate::conductor::active_limit;

const NUANCES: [&str; 18] = [
    "Guidance",
    "Density",
    "Dynamics",
    "Groove",
    "Attack",
    "Staccato",
    "Brightness",
    "Complexity",
    "Ornamentation",
    "Variation",
    "Glide",
    "Presence",
    "Space",
    "Organic",
    "Texture",
    "Width",
    "Atmosphere",
    "Authenticity",
];

struct Weights([f32; 18]);

impl Weights {
    fn new() -> Self {
        let mut w = [0.0; 18];
        w[0] = 1.0;
        Self(w)
    }

    fn slot(&mut self, name: &str) -> &mut f32 {
        let idx = NUANCES.iter().position(|n| *n == name).unwrap_or(0);
        &mut self.0[idx]
    }

    fn set(&mut self, pairs: &[(&str, f32)]) {
        for (name, v) in pairs {
            *self.slot(name) = *v;
        }
    }

    fn add(&mut self, pairs: &[(&str, f32)]) {
        for (name, v) in pairs {
            *self.slot(name) += *v;
        }
    }
}

fn preset_weights(session: &SessionState) -> Weights {
    let mut w = Weights::new();
    match session.generation_mode {
        GenerationMode::Quality => w.set(&[
            ("Guidance", 1.3),
            ("Authenticity", 1.6),
            ("Dynamics", 1.4),
            ("Presence", 1.2),
        ]),
        GenerationMode::Diversity => w.set(&[
            ("Variation", 1.8),
            ("Ornamentation", 1.6),
            ("Complexity", 1.5),
            ("Groove", 1.4),
        ]),
        GenerationMode::Vocalization => w.set(&[
            ("Texture", 1.7),
            ("Organic", 1.8),
            ("Space", 1.6),
            ("Dynamics", 1.4),
            ("Authenticity", 1.5),
        ]),
    }

    let g = session.settings.genre.to_lowercase();
    if g.contains("jazz") {
        w.add(&[
            ("Groove", 0.6),
            ("Complexity", 0.4),
            ("Dynamics", 0.2),
            ("Ornamentation", 0.3),
            ("Organic", 0.5),
            ("Space", 0.2),
        ]);
    } else if g.contains("electronic") || g.contains("gaming") {
        w.add(&[
            ("Density", 0.8),
            ("Attack", 0.5),
            ("Groove", 0.7),
            ("Brightness", 0.4),
            ("Texture", 0.4),
            ("Atmosphere", 0.5),
        ]);
    } else if g.contains("rock") || g.contains("pop") {
        w.add(&[
            ("Attack", 0.6),
            ("Dynamics", 0.5),
            ("Groove", 0.4),
            ("Presence", 0.3),
            ("Width", 0.3),
            ("Authenticity", 0.2),
        ]);
    } else if g.contains("spiritual") || g.contains("classic") {
        w.add(&[
            ("Space", 0.5),
            ("Atmosphere", 0.4),
            ("Dynamics", 0.3),
            ("Organic", 0.6),
            ("Authenticity", 0.4),
        ]);
    } else {
        w.add(&[
            ("Dynamics", 0.3),
            ("Space", 0.2),
            ("Organic", 0.4),
            ("Atmosphere", 0.1),
            ("Variation", 0.2),
        ]);
    }

    match session.settings.mood.as_str() {
        "Aggressive" => w.add(&[("Attack", 0.8), ("Density", 0.6)]),
        "Calm" => w.add(&[("Space", 0.8), ("Dynamics", -0.4), ("Density", -0.5)]),
        "Epic" | "Cinematic" => w.add(&[("Width", 0.8), ("Atmosphere", 0.8), ("Dynamics", 0.6)]),
        "Ethereal" => w.add(&[("Space", 0.9), ("Atmosphere", 0.9), ("Authenticity", 0.5)]),
        _ => {}
    }

    if session.instruments.is_vocal_instrument_active() {
        w.add(&[("Authenticity", 0.8)]);
    }
    w
}

/// Reset prompts and channel weights to the preset for the session's mode,
/// genre and mood. Only the strongest `active_limit` nuances stay audible.
pub fn apply_genre_presets(session: &mut SessionState) {
    let weights = preset_weights(session);
    let limit = active_limit(session.evolution, session.prompts.len());

    let mut ranked: Vec<(&str, f32)> = NUANCES
        .iter()
        .zip(weights.0)
        .filter(|(name, v)| *v > 0.0 || **name == "Guidance")
        .map(|(name, v)| (*name, v))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(limit);

    for prompt in session.prompts.values_mut() {
        let weight = ranked
            .iter()
            .find(|(name, _)| *name == prompt.text)
            .map(|(_, v)| *v)
            .unwrap_or(0.0);
        prompt.set_weight(weight);
    }

    for role in ChannelRole::ALL {
        session.instruments.get_mut(role).weight = 1.0;
    }
    let g = session.settings.genre.to_lowercase();
    let ins = &mut session.instruments;
    if g.contains("ambient") || g.contains("spiritual") {
        ins.rhythm.weight = 0.4;
        ins.bass.weight = 0.7;
    } else if g.contains("electronic") || g.contains("gaming") {
        ins.rhythm.weight = 1.2;
    } else if g.contains("romanian") {
        ins.lead.weight = 1.2;
        ins.rhythm.weight = 1.1;
    }
    log::debug!(
        target: "conductor",
        "presets applied for {} / {} ({} nuances)",
        session.settings.genre,
        session.generation_mode,
        ranked.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audible(session: &SessionState) -> Vec<(String, f32)> {
        let mut v: Vec<_> = session
            .prompts
            .values()
            .filter(|p| p.is_active())
            .map(|p| (p.text.clone(), p.weight))
            .collect();
        v.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        v
    }

    #[test]
    fn jazz_quality_keeps_top_seven_at_zero_evolution() {
        let mut session = SessionState::new();
        apply_genre_presets(&mut session);
        let a = audible(&session);
        assert_eq!(a.len(), 7);
        assert_eq!(a[0], ("Authenticity".to_string(), 1.6));
        assert!(a.iter().any(|(n, _)| n == "Dynamics"));
        assert!(a.iter().any(|(n, _)| n == "Guidance"));
    }

    #[test]
    fn evolution_widens_the_palette() {
        let mut session = SessionState::new();
        session.set_evolution(-10.0);
        apply_genre_presets(&mut session);
        assert_eq!(audible(&session).len(), 3);
    }

    #[test]
    fn calm_mood_can_silence_a_nuance() {
        let mut session = SessionState::new();
        session.settings.genre = "Folk".into();
        session.settings.mood = "Calm".into();
        session.set_evolution(10.0);
        apply_genre_presets(&mut session);
        assert_eq!(session.prompt_weight("Density"), 0.0);
    }

    #[test]
    fn genre_shapes_channel_weights() {
        let mut session = SessionState::new();
        session.settings.genre = "Ambient".into();
        session.instruments.lead.weight = 0.2;
        apply_genre_presets(&mut session);
        assert_eq!(session.instruments.lead.weight, 1.0);
        assert_eq!(session.instruments.rhythm.weight, 0.4);
        assert_eq!(session.instruments.bass.weight, 0.7);
    }

    #[test]
    fn weights_stay_in_range() {
        let mut session = SessionState::new();
        session.settings.genre = "Electronic".into();
        session.settings.mood = "Aggressive".into();
        session.generation_mode = GenerationMode::Diversity;
        apply_genre_presets(&mut session);
        assert!(session.prompts.values().all(|p| (0.0..=2.0).contains(&p.weight)));
    }
}
