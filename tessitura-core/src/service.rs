//! Contracts with the outside world: the streaming generation service, the
//! planner that drafts a performance plan, and the style catalog.

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use tessitura_types::{
    ChannelRole, PerformancePlanStage, PlanResponse, SessionGeneration, SessionState,
};

use crate::error::ServiceError;

/// One entry of the prompt payload pushed to the generation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedPrompt {
    pub text: String,
    pub weight: f32,
}

impl WeightedPrompt {
    pub fn new(text: impl Into<String>, weight: f32) -> Self {
        Self {
            text: text.into(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// 16-bit little-endian interleaved PCM.
    AudioChunk(Vec<u8>),
    Error(String),
    Closed,
}

/// A message from a live session, tagged with the generation it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub generation: SessionGeneration,
    pub event: SessionEvent,
}

/// A connected streaming session.
pub trait LiveSession {
    fn set_weighted_prompts(&mut self, prompts: &[WeightedPrompt]) -> Result<(), ServiceError>;
    fn play(&mut self) -> Result<(), ServiceError>;
    fn close(&mut self);
}

/// Opens streaming sessions. Audio and errors arrive on `inbox`, tagged with
/// `generation`.
pub trait GenerationService {
    fn connect(
        &mut self,
        generation: SessionGeneration,
        inbox: Sender<InboundMessage>,
    ) -> Result<Box<dyn LiveSession>, ServiceError>;
}

/// What the planner is told about the take.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub duration_minutes: u32,
    /// Visible channels and the instrument each plays.
    pub channels: Vec<(ChannelRole, String)>,
    pub vocal_available: bool,
}

impl PlanRequest {
    pub fn from_session(session: &SessionState) -> Self {
        Self {
            duration_minutes: session.transport.max_duration_minutes,
            channels: session
                .instruments
                .iter()
                .filter(|(_, c)| c.visible)
                .map(|(role, c)| {
                    let name = if c.instrument.is_empty() {
                        role.label().to_string()
                    } else {
                        c.instrument.clone()
                    };
                    (role, name)
                })
                .collect(),
            vocal_available: session.instruments.is_vocal_instrument_active(),
        }
    }

    /// Natural-language instructions for a text-completion planner.
    pub fn instructions(&self) -> String {
        let channels = self
            .channels
            .iter()
            .map(|(role, name)| {
                format!("{} instrument is currently: \"{}\"", role.key().to_uppercase(), name)
            })
            .collect::<Vec<_>>()
            .join(". ");
        format!(
            "Plan performance for {}m track.\n\
             Goal: musical storytelling with clear narrative progression \
             (Introduction -> Development -> Climax/Bridge -> Resolution).\n\
             Only refer to the instruments in the enabled channels list.\n\
             ENABLED CHANNELS: {}.\n\
             VOCAL INSTRUMENT STATUS: {}.\n\
             Cycle between Solo (one channel), Duet (two), Trio (three) and Full Mix \
             (all enabled channels). Name stages after the instruments, e.g. \
             \"Electric Guitar Solo\".\n\
             Respond with a JSON object containing a 'plan' array of stages with \
             stageName, stageStartTimeSec, activeChannels, channelWeights and \
             targets [{{parameterName, targetValue}}].",
            self.duration_minutes,
            channels,
            if self.vocal_available { "AVAILABLE" } else { "UNAVAILABLE" },
        )
    }
}

/// Drafts performance plans. Replies arrive on the returned channels; the
/// orchestrator polls them and never blocks.
pub trait PlanningService {
    /// Resolves to whether the planner can take requests right now.
    fn check_availability(&mut self) -> Receiver<bool>;
    /// Resolves to the planner's raw JSON reply.
    fn request_plan(&mut self, request: PlanRequest) -> Receiver<Result<String, ServiceError>>;
}

/// Parse a planner reply into stages ordered by start time. Tolerates a
/// markdown code fence around the JSON.
pub fn parse_plan(text: &str) -> Result<Vec<PerformancePlanStage>, ServiceError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed);
    let response: PlanResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::Malformed(e.to_string()))?;
    let stages = response.into_stages();
    if stages.is_empty() {
        return Err(ServiceError::Malformed("plan has no stages".into()));
    }
    Ok(stages)
}

/// Knows which styles belong to which genre.
pub trait StyleCatalog {
    fn is_valid_style(&self, genre: &str, style: &str) -> bool;
}

/// Accepts any non-empty style.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnyStyle;

impl StyleCatalog for AnyStyle {
    fn is_valid_style(&self, _genre: &str, style: &str) -> bool {
        !style.trim().is_empty()
    }
}
