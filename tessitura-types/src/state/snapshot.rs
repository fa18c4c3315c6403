use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::channel::ChannelMap;
use super::session::SessionState;
use crate::PromptId;

/// Smallest weight change that counts as a change when replaying.
const APPLY_EPSILON: f32 = 0.001;

/// Session parameters captured at a point of the recording timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    /// Seconds from the start of the recording.
    pub timestamp_secs: f64,
    pub prompt_weights: BTreeMap<PromptId, f32>,
    pub channel_weights: ChannelMap<f32>,
    pub channel_active: ChannelMap<bool>,
    /// Conductor stage shown at this moment, if any.
    pub status_message: Option<String>,
    /// Whether the stage came from the planner rather than the fallback plan.
    pub is_ai_phase: bool,
}

/// What changed when a snapshot was applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotApplied {
    pub prompts_changed: bool,
    pub instruments_changed: bool,
}

impl PlaybackSnapshot {
    pub fn capture(
        timestamp_secs: f64,
        session: &SessionState,
        status_message: Option<&str>,
        is_ai_phase: bool,
    ) -> Self {
        Self {
            timestamp_secs,
            prompt_weights: session
                .prompts
                .iter()
                .map(|(id, p)| (id.clone(), p.weight))
                .collect(),
            channel_weights: session.instruments.map(|c| c.weight),
            channel_active: session.instruments.map(|c| c.active),
            status_message: status_message.map(str::to_owned),
            is_ai_phase,
        }
    }

    /// Write the captured values back into the session.
    pub fn apply(&self, session: &mut SessionState) -> SnapshotApplied {
        let mut out = SnapshotApplied::default();

        for (id, &weight) in &self.prompt_weights {
            if let Some(prompt) = session.prompts.get_mut(id) {
                if (prompt.weight - weight).abs() > APPLY_EPSILON {
                    prompt.set_weight(weight);
                    out.prompts_changed = true;
                }
            }
        }

        for (role, &weight) in self.channel_weights.iter() {
            let active = *self.channel_active.get(role);
            let channel = session.instruments.get_mut(role);
            if channel.active != active || (channel.weight - weight).abs() > APPLY_EPSILON {
                channel.active = active;
                channel.weight = weight;
                out.instruments_changed = true;
            }
        }

        out
    }
}
