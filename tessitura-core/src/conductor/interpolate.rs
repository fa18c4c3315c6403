use std::time::Duration;

use tessitura_types::{ChannelRole, PromptId, SessionState, MAX_WEIGHT};

use super::Conductor;

/// Most prompts the conductor moves at once.
const MAX_HANDS: usize = 2;
const PROMPT_BASE_STEP: f32 = 0.05;
const PROMPT_TOLERANCE: f32 = 0.01;
const CHANNEL_STEP: f32 = 0.05;
const CHANNEL_TOLERANCE: f32 = 0.005;
/// Float drift allowed when deciding the last step lands on the target.
const ARRIVAL_SLACK: f32 = 1e-4;

fn step_toward(current: f32, target: f32, step: f32) -> f32 {
    let diff = target - current;
    if diff.abs() <= step + ARRIVAL_SLACK {
        target
    } else {
        (current + diff.signum() * step).clamp(0.0, MAX_WEIGHT)
    }
}

impl Conductor {
    /// Move prompts and channels one step toward the current stage.
    /// Returns (prompts changed, instruments changed).
    pub(super) fn interpolate(&mut self, session: &mut SessionState, now: Duration) -> (bool, bool) {
        let Some(stage) = self.plan.get(self.cursor) else {
            return (false, false);
        };
        let evolution = session.evolution;
        let step = PROMPT_BASE_STEP * (1.0 + evolution / 10.0);

        // Prompts: a missing target leaves the prompt alone.
        let needing: Vec<PromptId> = session
            .prompts
            .values()
            .filter(|p| !self.cooling_down(p.id.as_str(), now, evolution))
            .filter(|p| {
                stage
                    .target_for(&p.text)
                    .is_some_and(|t| (t.clamp(0.0, MAX_WEIGHT) - p.weight).abs() > PROMPT_TOLERANCE)
            })
            .map(|p| p.id.clone())
            .collect();

        self.active_hands.retain(|id| needing.contains(id));
        for id in &needing {
            if self.active_hands.len() >= MAX_HANDS {
                break;
            }
            if !self.active_hands.contains(id) {
                self.active_hands.push(id.clone());
            }
        }

        let mut prompts_changed = false;
        for id in &self.active_hands {
            if let Some(prompt) = session.prompts.get_mut(id) {
                if let Some(target) = stage.target_for(&prompt.text) {
                    let next = step_toward(prompt.weight, target.clamp(0.0, MAX_WEIGHT), step);
                    prompt.set_weight(next);
                    prompts_changed = true;
                }
            }
        }

        // Channels
        let mut instruments_changed = false;
        for role in ChannelRole::ALL {
            if self.cooling_down(role.key(), now, evolution) {
                continue;
            }
            let ch = session.instruments.get_mut(role);
            if !ch.visible {
                if ch.active || ch.weight > 0.0 {
                    ch.active = false;
                    ch.weight = 0.0;
                    instruments_changed = true;
                }
                continue;
            }

            let target_weight = stage
                .channel_weights
                .get(role)
                .unwrap_or(ch.weight)
                .clamp(0.0, MAX_WEIGHT);
            if (target_weight - ch.weight).abs() > CHANNEL_TOLERANCE {
                ch.weight = step_toward(ch.weight, target_weight, CHANNEL_STEP);
                instruments_changed = true;
            }

            let planned_active = (*stage.active_channels.get(role)).unwrap_or(ch.active);
            let effective = planned_active && target_weight > PROMPT_TOLERANCE;
            if ch.active != effective {
                ch.active = effective;
                instruments_changed = true;
            }
        }

        (prompts_changed, instruments_changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessitura_types::{ParameterTarget, PerformancePlanStage};

    fn conductor_with(stage: PerformancePlanStage) -> Conductor {
        let mut c = Conductor::new(Some(3));
        c.adopt_plan(vec![stage]);
        c.activate();
        c
    }

    fn weight(s: &SessionState, text: &str) -> f32 {
        s.prompt_weight(text)
    }

    #[test]
    fn at_most_two_prompts_move_per_step() {
        let mut stage = PerformancePlanStage::new("Intro", 0.0);
        for name in ["Density", "Groove", "Space"] {
            stage.targets.push(ParameterTarget::new(name, 1.0));
        }
        let mut c = conductor_with(stage);
        let mut s = SessionState::new();

        let (p, _) = c.interpolate(&mut s, Duration::ZERO);
        assert!(p);
        let moved = ["Density", "Groove", "Space"]
            .iter()
            .filter(|n| weight(&s, n) > 0.0)
            .count();
        assert_eq!(moved, 2);
        assert!((weight(&s, "Density") - 0.05).abs() < 1e-6);
    }

    #[test]
    fn prompts_converge_without_overshoot() {
        let mut stage = PerformancePlanStage::new("Intro", 0.0);
        stage.targets.push(ParameterTarget::new("Groove", 0.42));
        stage.targets.push(ParameterTarget::new("Space", 2.0));
        let mut c = conductor_with(stage);
        let mut s = SessionState::new();
        s.set_evolution(10.0); // step 0.1

        let mut prev = 0.0;
        for _ in 0..100 {
            c.interpolate(&mut s, Duration::ZERO);
            let g = weight(&s, "Groove");
            assert!(g >= prev && g <= 0.42 + 1e-6);
            prev = g;
        }
        assert!((weight(&s, "Groove") - 0.42).abs() < 1e-6);
        assert_eq!(weight(&s, "Space"), 2.0);
    }

    #[test]
    fn freed_hand_moves_to_the_next_prompt() {
        let mut stage = PerformancePlanStage::new("Intro", 0.0);
        for name in ["Density", "Groove", "Space"] {
            stage.targets.push(ParameterTarget::new(name, 0.1));
        }
        let mut c = conductor_with(stage);
        let mut s = SessionState::new();
        for _ in 0..6 {
            c.interpolate(&mut s, Duration::ZERO);
        }
        for name in ["Density", "Groove", "Space"] {
            assert!((weight(&s, name) - 0.1).abs() < 1e-6, "{}", name);
        }
    }

    #[test]
    fn manual_edit_starts_a_cooldown() {
        let mut stage = PerformancePlanStage::new("Intro", 0.0);
        stage.targets.push(ParameterTarget::new("Guidance", 1.0));
        stage.channel_weights.bass = Some(0.0);
        let mut c = conductor_with(stage);
        let mut s = SessionState::new();
        let guidance = PromptId::indexed(0);

        c.note_interaction(guidance.as_str(), Duration::from_secs(100));
        c.note_interaction("bass", Duration::from_secs(100));
        c.interpolate(&mut s, Duration::from_secs(105));
        assert_eq!(s.prompts[&guidance].weight, 0.0);
        assert_eq!(s.instruments.bass.weight, 1.0);

        // 10 s cooldown at evolution 0
        c.interpolate(&mut s, Duration::from_secs(110));
        assert!(s.prompts[&guidance].weight > 0.0);
        assert!(s.instruments.bass.weight < 1.0);
    }

    #[test]
    fn channels_follow_plan_and_hidden_are_forced_off() {
        let mut stage = PerformancePlanStage::new("Solo", 0.0);
        for role in ChannelRole::ALL {
            stage.set_channel(role, role == ChannelRole::Lead, if role == ChannelRole::Lead { 2.0 } else { 0.0 });
        }
        let mut c = conductor_with(stage);
        let mut s = SessionState::new();
        s.instruments.alto.visible = false;

        let (_, changed) = c.interpolate(&mut s, Duration::ZERO);
        assert!(changed);
        assert!(!s.instruments.alto.active);
        assert_eq!(s.instruments.alto.weight, 0.0);
        // target weight 0 means inactive right away, weight glides down
        assert!(!s.instruments.bass.active);
        assert!((s.instruments.bass.weight - 0.95).abs() < 1e-6);
        assert!(s.instruments.lead.active);
        assert!((s.instruments.lead.weight - 1.05).abs() < 1e-6);

        for _ in 0..40 {
            c.interpolate(&mut s, Duration::ZERO);
        }
        assert_eq!(s.instruments.lead.weight, 2.0);
        assert_eq!(s.instruments.bass.weight, 0.0);
    }

    #[test]
    fn repeated_steps_land_exactly_on_target() {
        let mut stage = PerformancePlanStage::new("Climb", 0.0);
        stage.targets.push(ParameterTarget::new("Groove", 2.0));
        stage.set_channel(ChannelRole::Bass, true, 2.0);
        let mut c = conductor_with(stage);
        let mut s = SessionState::new();
        let groove = s
            .prompts
            .values()
            .find(|p| p.text == "Groove")
            .map(|p| p.id.clone())
            .unwrap();
        s.prompts.get_mut(&groove).unwrap().set_weight(1.0);

        for _ in 0..40 {
            c.interpolate(&mut s, Duration::ZERO);
        }
        assert_eq!(weight(&s, "Groove"), 2.0);
        assert_eq!(s.instruments.bass.weight, 2.0);
    }

    #[test]
    fn step_toward_absorbs_float_drift() {
        let mut w = 1.0f32;
        for _ in 0..19 {
            w += 0.05;
        }
        assert_eq!(step_toward(w, 2.0, 0.05), 2.0);
        assert!((step_toward(1.0, 2.0, 0.05) - 1.05).abs() < 1e-6);
        assert_eq!(step_toward(0.02, 0.0, 0.05), 0.0);
    }

    #[test]
    fn missing_channel_fields_keep_current_values() {
        let mut stage = PerformancePlanStage::new("Sparse", 0.0);
        stage.active_channels.rhythm = Some(false);
        let mut c = conductor_with(stage);
        let mut s = SessionState::new();
        s.instruments.lead.weight = 1.3;

        c.interpolate(&mut s, Duration::ZERO);
        assert_eq!(s.instruments.lead.weight, 1.3);
        assert!(s.instruments.lead.active);
        assert!(!s.instruments.rhythm.active);
        assert_eq!(s.instruments.rhythm.weight, 1.0);
    }
}
