//! UI intents and outgoing events.
//!
//! Intents are what the UI asks for; events are what the orchestrator
//! announces. Event names follow the kebab-case contract the UI listens on.

use serde::{Deserialize, Serialize};

use crate::state::{
    ChannelRole, GenerationMode, GlobalSettingsUpdate, InstrumentSet, PlaybackState, PromptMap,
};
use crate::PromptId;

/// A request from the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    // Transport
    Record,
    Stop,
    Pause,
    Resume,
    /// Play the recording from the current position.
    Play,
    Seek(f64),
    SetLoop(bool),
    /// Rewind to the start ("back to start" button).
    Rewind,
    ClearRecording,

    // Transport settings
    SetVolume(f32),
    SetMaxDuration(u32),
    SetFades { fade_in_secs: f64, fade_out_secs: f64 },

    // Session parameters
    SetPromptWeight(PromptId, f32),
    SetPrompts(PromptMap),
    SetInstruments(InstrumentSet),
    SetChannelActive(ChannelRole, bool),
    SetChannelWeight(ChannelRole, f32),
    SetGlobalSettings(GlobalSettingsUpdate),
    SetEvolution(f32),
    SetSeed(u32),
    SetSpecialInstruction(Option<String>),
    LockChannels(bool),
    SetGenerationMode(GenerationMode),

    // Conductor
    SetConductor(bool),
    /// The user touched a field by hand; the conductor leaves it alone for a while.
    NotifyUserInteraction(String),
}

impl Intent {
    /// Intents that edit session parameters (rejected while replaying a take).
    pub fn edits_parameters(&self) -> bool {
        matches!(
            self,
            Intent::SetPromptWeight(..)
                | Intent::SetPrompts(_)
                | Intent::SetInstruments(_)
                | Intent::SetChannelActive(..)
                | Intent::SetChannelWeight(..)
        )
    }
}

/// Something the UI should know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    PlaybackStateChanged(PlaybackState),
    RecordingAvailable { duration_secs: f64 },
    RecordingCleared,
    RecordingFinishedAuto,
    ConductorKnobsUpdate(PromptMap),
    ConductorInstrumentsUpdate(InstrumentSet),
    ConductorStageChanged { name: String, is_ai: bool },
    VocalSignalReceived(Option<char>),
    LoopChanged(bool),
    ModeChanged(GenerationMode),
    WarmupStarted { total_ms: u64, warmup_ms: u64 },
    HandshakeResult(bool),
    ConductorEngaging { countdown_ms: u64 },
    ConductorEngaged,
    AutoLoopCountdown { remaining_secs: u32 },
    AutoLoopEngaged,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::PlaybackStateChanged(_) => "playback-state-changed",
            Event::RecordingAvailable { .. } => "recording-available",
            Event::RecordingCleared => "recording-cleared",
            Event::RecordingFinishedAuto => "recording-finished-auto",
            Event::ConductorKnobsUpdate(_) => "conductor-knobs-update",
            Event::ConductorInstrumentsUpdate(_) => "conductor-instruments-update",
            Event::ConductorStageChanged { .. } => "conductor-stage-changed",
            Event::VocalSignalReceived(_) => "vocal-signal-received",
            Event::LoopChanged(_) => "loop-changed",
            Event::ModeChanged(_) => "mode-changed",
            Event::WarmupStarted { .. } => "warmup-started",
            Event::HandshakeResult(_) => "handshake-result",
            Event::ConductorEngaging { .. } => "conductor-engaging",
            Event::ConductorEngaged => "conductor-engaged",
            Event::AutoLoopCountdown { .. } => "auto-loop-countdown",
            Event::AutoLoopEngaged => "auto-loop-engaged",
        }
    }
}
