use serde::{Deserialize, Serialize};

/// Where the session/recording lifecycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Loading,
    Warmup,
    Preparing,
    Recording,
    Playing,
    Paused,
    LoopWaiting,
    Rewinding,
}

impl PlaybackState {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Loading => "loading",
            PlaybackState::Warmup => "warmup",
            PlaybackState::Preparing => "preparing",
            PlaybackState::Recording => "recording",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::LoopWaiting => "loop-waiting",
            PlaybackState::Rewinding => "rewinding",
        }
    }

    /// A generation session is connected (or connecting).
    pub fn is_live(self) -> bool {
        matches!(
            self,
            PlaybackState::Loading
                | PlaybackState::Warmup
                | PlaybackState::Preparing
                | PlaybackState::Recording
        )
    }

    /// States in which the time tracker advances.
    pub fn is_tracking(self) -> bool {
        matches!(
            self,
            PlaybackState::Warmup
                | PlaybackState::Preparing
                | PlaybackState::Recording
                | PlaybackState::Playing
        )
    }

    /// Audio is being held back: generated but not yet part of the take.
    pub fn is_pre_roll(self) -> bool {
        matches!(self, PlaybackState::Warmup | PlaybackState::Preparing)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flavour of generation requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GenerationMode {
    #[default]
    Quality,
    Diversity,
    Vocalization,
}

impl GenerationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationMode::Quality => "QUALITY",
            GenerationMode::Diversity => "DIVERSITY",
            GenerationMode::Vocalization => "VOCALIZATION",
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
