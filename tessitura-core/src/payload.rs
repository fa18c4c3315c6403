//! The weighted-prompt payload sent to the generation session: one anchor
//! fragment describing the piece, one fragment per channel, one per audible
//! nuance.

use tessitura_types::{GenerationMode, SessionState};

use crate::service::WeightedPrompt;

const ANCHOR_WEIGHT: f32 = 5.0;
const INSTRUMENT_SCALE: f32 = 3.5;
const EMPHASIZED_SCALE: f32 = 1.0;
const BACKGROUND_SCALE: f32 = 0.5;
const MIN_NUANCE_WEIGHT: f32 = 0.01;

/// Nuances each mode gives full weight to.
fn emphasized_nuances(mode: GenerationMode) -> &'static [&'static str] {
    match mode {
        GenerationMode::Quality => &["Authenticity", "Presence", "Brightness", "Dynamics", "Guidance"],
        GenerationMode::Diversity => &["Variation", "Ornamentation", "Complexity", "Groove", "Atmosphere"],
        GenerationMode::Vocalization => &["Texture", "Density", "Dynamics", "Space", "Organic"],
    }
}

/// Language the vocal line should lean on for a genre.
pub fn regional_language(genre: &str, style: &str) -> &'static str {
    match genre.to_lowercase().as_str() {
        "romanian" => "Romanian",
        "indian" => "Hindi/Sanskrit",
        "spiritual" => "Liturgical Latin/Greek",
        "african" => "Swahili/Yoruba",
        "irish" => "Irish Gaelic",
        "spanish" => "Spanish/Portuguese",
        "oriental" => {
            let s = style.to_lowercase();
            if s.contains("japanese") {
                "Japanese"
            } else if s.contains("chinese") {
                "Mandarin"
            } else if s.contains("arabic") {
                "Arabic"
            } else {
                "Oriental Phonemes"
            }
        }
        _ => "English",
    }
}

/// Text of the anchor fragment.
pub fn anchor_text(session: &SessionState, vocal_signal: Option<char>) -> String {
    let s = &session.settings;
    let mut anchor = format!(
        "ANCHOR: {}, {}, {}bpm, {}, {}",
        s.genre, s.style, s.bpm, s.meter, s.key
    );
    if s.seed != 0 {
        anchor.push_str(&format!(", SEED: {}", s.seed));
    }
    if s.has_mood() {
        anchor.push_str(&format!(". Mood: {}", s.mood));
    }

    let guidance = session
        .prompts
        .values()
        .find(|p| p.text == "Guidance")
        .map(|p| p.weight)
        .unwrap_or(1.0);
    let reference = session
        .special_instruction
        .as_deref()
        .unwrap_or("Popular genre standard");
    if guidance < 0.5 {
        anchor.push_str(". MODE: ABSOLUTE_ORIGINALITY. DO_NOT_REFERENCE_EXISTING_SONGS. CREATE_FROM_SCRATCH: TRUE");
    } else if guidance > 1.5 {
        anchor.push_str(&format!(
            ". MODE: DIRECT_RECREATION_PRIORITY. PERFORM_COVER_OR_CLONE_OF: \"{}\"",
            reference
        ));
    } else {
        anchor.push_str(&format!(
            ". MODE: INSPIRED_VARIATION. USE_INFLUENCES_FROM: \"{}\"",
            reference
        ));
    }

    let active_mix: Vec<&str> = session
        .instruments
        .iter()
        .filter(|(_, c)| c.active)
        .map(|(role, _)| role.label())
        .collect();
    anchor.push_str(&format!(". ACTIVE_MIX: [{}]", active_mix.join(", ")));

    let mode = session.generation_mode;
    if mode == GenerationMode::Vocalization {
        anchor.push_str(&format!(
            ". MODE: VOCAL_EMPHASIS. LIRA_RULES: Vowel=Sustain, Consonant=StartWord. LANGUAGE: {}",
            regional_language(&s.genre, &s.style)
        ));
        if let Some(v) = vocal_signal {
            anchor.push_str(&format!(". VOCAL_SIGNAL: {}", v));
        }
    } else {
        anchor.push_str(&format!(". GENERATION_ENGINE_MODE: {}", mode));
    }

    if mode == GenerationMode::Vocalization || session.instruments.is_vocal_instrument_active() {
        anchor.push_str(". ENHANCE_VOCAL_TEXTURE: TRUE");
    }
    anchor
}

/// Full payload: anchor, then the five channels, then audible nuances.
pub fn build_weighted_prompts(session: &SessionState, vocal_signal: Option<char>) -> Vec<WeightedPrompt> {
    let mut payload = vec![WeightedPrompt::new(anchor_text(session, vocal_signal), ANCHOR_WEIGHT)];

    for (role, channel) in session.instruments.iter() {
        let name = if channel.instrument.is_empty() {
            "None"
        } else {
            channel.instrument.as_str()
        };
        let weight = if channel.active && channel.visible {
            channel.weight * INSTRUMENT_SCALE
        } else {
            0.0
        };
        payload.push(WeightedPrompt::new(
            format!("INSTRUMENT {}: {}", role.label(), name),
            weight,
        ));
    }

    let emphasized = emphasized_nuances(session.generation_mode);
    payload.extend(session.prompts.values().filter_map(|p| {
        let scale = if emphasized.contains(&p.text.as_str()) {
            EMPHASIZED_SCALE
        } else {
            BACKGROUND_SCALE
        };
        let weight = p.weight * scale;
        (weight > MIN_NUANCE_WEIGHT).then(|| WeightedPrompt::new(format!("Nuance: {}", p.text), weight))
    }));

    payload
}
