//! # tessitura-types
//!
//! Shared type definitions for the tessitura orchestrator.
//! This crate contains the session data model, UI intents and events, and the
//! pure reducers used by tessitura-core to apply intents to session state.

pub mod action;
pub mod reduce;
pub mod state;

pub use action::*;
pub use reduce::{reduce_session, Reduced};

// Re-export all state types at crate root for convenience
pub use state::*;

/// Unique identifier for a weighted prompt ("nuance").
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct PromptId(String);

impl PromptId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id of the n-th default prompt (`prompt-{n}`).
    pub fn indexed(index: usize) -> Self {
        Self(format!("prompt-{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PromptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PromptId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Monotonic counter identifying one generation session.
///
/// Messages from a session carry the generation they were created under;
/// anything tagged with an older generation is stale and dropped.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SessionGeneration(u64);

impl SessionGeneration {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
    pub fn get(self) -> u64 {
        self.0
    }
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for SessionGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
