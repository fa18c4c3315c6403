use rand::seq::SliceRandom;
use rand::Rng;

use tessitura_types::{
    ChannelRole, ParameterTarget, PerformancePlanStage, SessionState, STAGE_SECONDS,
};

use super::active_limit;

const SOLO_PROBABILITY: f64 = 0.15;
const DUET_PROBABILITY: f64 = 0.20;
const TRIO_PROBABILITY: f64 = 0.20;
const DROP_PROBABILITY: f64 = 0.2;

const SOLO_WEIGHT: f32 = 2.0;
const DUET_WEIGHT: f32 = 1.4;
const TRIO_WEIGHT: f32 = 1.2;
const FULL_WEIGHT: f32 = 1.0;

/// Build a plan locally when no planner reply is available: one stage per
/// 15 seconds, cycling through solos, duets, trios and full sections.
///
/// Only visible channels take part. No visible channel means no plan.
pub fn fallback_plan<R: Rng>(session: &SessionState, rng: &mut R) -> Vec<PerformancePlanStage> {
    let enabled: Vec<ChannelRole> = ChannelRole::ALL
        .into_iter()
        .filter(|role| session.instruments.get(*role).visible)
        .collect();
    if enabled.is_empty() {
        return Vec::new();
    }

    let total_secs = session.transport.total_secs();
    let stage_count = (total_secs / STAGE_SECONDS).ceil().max(1.0) as usize;
    let prompt_texts: Vec<&str> = session.prompts.values().map(|p| p.text.as_str()).collect();
    let limit = active_limit(session.evolution, prompt_texts.len());
    let name_of = |role: ChannelRole| {
        let instrument = &session.instruments.get(role).instrument;
        if instrument.is_empty() {
            role.label().to_string()
        } else {
            instrument.clone()
        }
    };

    let drop_leaves_a_voice = enabled.contains(&ChannelRole::Rhythm)
        && enabled
            .iter()
            .any(|r| !matches!(r, ChannelRole::Rhythm | ChannelRole::Bass));

    let mut stages = Vec::with_capacity(stage_count);
    for i in 0..stage_count {
        let start = i as f64 * STAGE_SECONDS;

        let mut order: Vec<usize> = (0..prompt_texts.len()).collect();
        order.shuffle(rng);
        let mut targets: Vec<ParameterTarget> = prompt_texts
            .iter()
            .map(|text| ParameterTarget::new(*text, 0.0))
            .collect();
        for &idx in order.iter().take(limit) {
            targets[idx].target_value = Some(0.4 + rng.gen::<f32>() * 1.6);
        }

        let mut picks = enabled.clone();
        picks.shuffle(rng);
        let n = enabled.len();
        let r: f64 = rng.gen();
        let trio_cut = SOLO_PROBABILITY + DUET_PROBABILITY + if n >= 3 { TRIO_PROBABILITY } else { 0.0 };

        let mut full_mix = false;
        let (name, playing, weight) = if i > 0 && r < SOLO_PROBABILITY {
            (format!("{} Solo", name_of(picks[0])), &picks[..1], SOLO_WEIGHT)
        } else if i > 0 && n >= 2 && r < SOLO_PROBABILITY + DUET_PROBABILITY {
            let name = format!("{} & {} Duet", name_of(picks[0]), name_of(picks[1]));
            (name, &picks[..2], DUET_WEIGHT)
        } else if i > 0 && n >= 3 && r < trio_cut {
            let name = format!(
                "{}, {} & {} Trio",
                name_of(picks[0]),
                name_of(picks[1]),
                name_of(picks[2])
            );
            (name, &picks[..3], TRIO_WEIGHT)
        } else {
            full_mix = true;
            ("Full Mix Section".to_string(), &enabled[..], FULL_WEIGHT)
        };

        let mut stage = PerformancePlanStage::new(name, start);
        stage.targets = targets;
        for role in ChannelRole::ALL {
            let on = playing.contains(&role);
            stage.set_channel(role, on, if on { weight } else { 0.0 });
        }

        // A drop thins a full mix; it must leave something playing.
        if full_mix && i > 1 && drop_leaves_a_voice && rng.gen_bool(DROP_PROBABILITY) {
            stage.set_channel(ChannelRole::Rhythm, false, 0.0);
            stage.set_channel(ChannelRole::Bass, false, 0.0);
            stage.stage_name = "The Drop (Minimalist)".to_string();
        }

        stages.push(stage);
    }
    stages
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn one_stage_per_fifteen_seconds() {
        let session = SessionState::new();
        let plan = fallback_plan(&session, &mut StdRng::seed_from_u64(1));
        assert_eq!(plan.len(), 12);
        for (i, stage) in plan.iter().enumerate() {
            assert_eq!(stage.stage_start_time_sec, i as f64 * 15.0);
            assert_eq!(stage.targets.len(), 18);
        }
        assert_eq!(plan[0].stage_name, "Full Mix Section");
        assert!(plan[0].active_channels.iter().all(|(_, a)| *a == Some(true)));
    }

    #[test]
    fn prompt_targets_respect_active_limit() {
        let session = SessionState::new();
        let limit = active_limit(session.evolution, 18);
        let plan = fallback_plan(&session, &mut StdRng::seed_from_u64(9));
        for stage in &plan {
            let audible: Vec<f32> = stage
                .targets
                .iter()
                .filter_map(|t| t.target_value)
                .filter(|v| *v > 0.0)
                .collect();
            assert_eq!(audible.len(), limit);
            assert!(audible.iter().all(|v| (0.4..=2.0).contains(v)));
        }
    }

    #[test]
    fn stage_weights_match_stage_kind() {
        let session = SessionState::new();
        for seed in 0..20 {
            let plan = fallback_plan(&session, &mut StdRng::seed_from_u64(seed));
            for stage in &plan {
                let on: Vec<f32> = stage
                    .channel_weights
                    .iter()
                    .filter_map(|(_, w)| *w)
                    .filter(|w| *w > 0.0)
                    .collect();
                let name = &stage.stage_name;
                if name.ends_with("Solo") {
                    assert_eq!(on, vec![2.0]);
                } else if name.ends_with("Duet") {
                    assert_eq!(on, vec![1.4, 1.4]);
                } else if name.ends_with("Trio") {
                    assert_eq!(on, vec![1.2, 1.2, 1.2]);
                } else if name == "The Drop (Minimalist)" {
                    assert_eq!(stage.active_channels.rhythm, Some(false));
                    assert_eq!(stage.active_channels.bass, Some(false));
                    for role in [ChannelRole::Lead, ChannelRole::Alto, ChannelRole::Harmonic] {
                        assert_eq!(*stage.active_channels.get(role), Some(true));
                        assert_eq!(*stage.channel_weights.get(role), Some(1.0));
                    }
                } else {
                    assert_eq!(name, "Full Mix Section");
                    assert!(on.iter().all(|w| *w == 1.0));
                }
            }
        }
    }

    #[test]
    fn every_stage_keeps_someone_playing() {
        let mut long = SessionState::new();
        long.transport.max_duration_minutes = 10;
        let mut rhythm_section = long.clone();
        for role in [ChannelRole::Lead, ChannelRole::Alto, ChannelRole::Harmonic] {
            rhythm_section.instruments.get_mut(role).visible = false;
        }
        for session in [&long, &rhythm_section] {
            for seed in 0..200 {
                let plan = fallback_plan(session, &mut StdRng::seed_from_u64(seed));
                for stage in &plan {
                    assert!(
                        stage.active_channels.iter().any(|(_, a)| *a == Some(true)),
                        "seed {} stage at {}s is silent: {}",
                        seed,
                        stage.stage_start_time_sec,
                        stage.stage_name
                    );
                }
            }
        }
    }

    #[test]
    fn hidden_channels_never_play() {
        let mut session = SessionState::new();
        session.instruments.alto.visible = false;
        session.instruments.rhythm.visible = false;
        for seed in 0..20 {
            let plan = fallback_plan(&session, &mut StdRng::seed_from_u64(seed));
            for stage in &plan {
                assert_eq!(stage.active_channels.alto, Some(false));
                assert_eq!(stage.active_channels.rhythm, Some(false));
                assert_ne!(stage.stage_name, "The Drop (Minimalist)");
            }
        }
    }

    #[test]
    fn no_visible_channels_means_no_plan() {
        let mut session = SessionState::new();
        for role in ChannelRole::ALL {
            session.instruments.get_mut(role).visible = false;
        }
        assert!(fallback_plan(&session, &mut StdRng::seed_from_u64(1)).is_empty());
    }

    #[test]
    fn single_channel_only_solos_or_full_mix() {
        let mut session = SessionState::new();
        for role in [ChannelRole::Alto, ChannelRole::Harmonic, ChannelRole::Bass, ChannelRole::Rhythm] {
            session.instruments.get_mut(role).visible = false;
        }
        session.transport.max_duration_minutes = 10;
        let plan = fallback_plan(&session, &mut StdRng::seed_from_u64(4));
        assert_eq!(plan.len(), 40);
        assert!(plan
            .iter()
            .all(|s| s.stage_name == "Piano Solo" || s.stage_name == "Full Mix Section"));
    }
}
