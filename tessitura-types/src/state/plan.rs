use serde::{Deserialize, Serialize};

use super::channel::{ChannelMap, ChannelRole};

/// Length of one fallback-plan stage.
pub const STAGE_SECONDS: f64 = 15.0;

/// Move one prompt toward a value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterTarget {
    /// Display text of the prompt ("Groove", "Space", ...).
    pub parameter_name: String,
    /// Missing means "leave the prompt where it is".
    pub target_value: Option<f32>,
}

impl ParameterTarget {
    pub fn new(parameter_name: impl Into<String>, target_value: f32) -> Self {
        Self {
            parameter_name: parameter_name.into(),
            target_value: Some(target_value),
        }
    }
}

/// One section of the performance plan.
///
/// Channel entries and target values are optional; anything left out keeps
/// its current value when the stage is interpolated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformancePlanStage {
    pub stage_name: String,
    pub stage_start_time_sec: f64,
    pub active_channels: ChannelMap<Option<bool>>,
    pub channel_weights: ChannelMap<Option<f32>>,
    pub targets: Vec<ParameterTarget>,
}

impl PerformancePlanStage {
    pub fn new(stage_name: impl Into<String>, stage_start_time_sec: f64) -> Self {
        Self {
            stage_name: stage_name.into(),
            stage_start_time_sec,
            ..Default::default()
        }
    }

    pub fn target_for(&self, parameter_name: &str) -> Option<f32> {
        self.targets
            .iter()
            .find(|t| t.parameter_name == parameter_name)
            .and_then(|t| t.target_value)
    }

    pub fn set_channel(&mut self, role: ChannelRole, active: bool, weight: f32) {
        *self.active_channels.get_mut(role) = Some(active);
        *self.channel_weights.get_mut(role) = Some(weight);
    }
}

/// Where the current plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlanSource {
    #[default]
    Fallback,
    Planner,
}

/// Wire shape of a planner reply: `{ "plan": [stage, ...] }`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanResponse {
    pub plan: Vec<PerformancePlanStage>,
}

impl PlanResponse {
    /// Stages in start-time order.
    pub fn into_stages(self) -> Vec<PerformancePlanStage> {
        let mut stages = self.plan;
        stages.sort_by(|a, b| a.stage_start_time_sec.total_cmp(&b.stage_start_time_sec));
        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_keep_current() {
        let json = r#"{
            "plan": [
                { "stageName": "Intro", "stageStartTimeSec": 0,
                  "activeChannels": { "lead": true },
                  "targets": [ { "parameterName": "Groove" } ] }
            ]
        }"#;
        let resp: PlanResponse = serde_json::from_str(json).unwrap();
        let stage = &resp.plan[0];
        assert_eq!(stage.active_channels.lead, Some(true));
        assert_eq!(stage.active_channels.bass, None);
        assert_eq!(stage.channel_weights.lead, None);
        assert_eq!(stage.target_for("Groove"), None);
        assert_eq!(stage.target_for("Space"), None);
    }

    #[test]
    fn stages_sorted_by_start() {
        let resp = PlanResponse {
            plan: vec![
                PerformancePlanStage::new("B", 30.0),
                PerformancePlanStage::new("A", 0.0),
            ],
        };
        let stages = resp.into_stages();
        assert_eq!(stages[0].stage_name, "A");
        assert_eq!(stages[1].stage_name, "B");
    }

    #[test]
    fn empty_object_is_empty_plan() {
        let resp: PlanResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.plan.is_empty());
    }
}
