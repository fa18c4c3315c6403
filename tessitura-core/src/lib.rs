//! # tessitura-core
//!
//! The orchestrator: owns the session state, drives the generation session,
//! records and replays takes, and runs the conductor that performs the
//! session when the user hands over control.
//!
//! Everything is single-threaded. The host calls [`Orchestrator::tick`] once
//! per frame; external services answer through crossbeam channels that the
//! tick drains.

pub mod clock;
pub mod conductor;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod orchestrator;
pub mod payload;
pub mod presets;
pub mod service;
pub mod timers;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, EngineSettings, Timing};
pub use error::{ServiceError, SessionError};
pub use events::EventBus;
pub use orchestrator::Orchestrator;
pub use service::{
    AnyStyle, GenerationService, InboundMessage, LiveSession, PlanRequest, PlanningService,
    SessionEvent, StyleCatalog, WeightedPrompt,
};

pub use tessitura_audio as audio;
pub use tessitura_types as types;
