use thiserror::Error;

use tessitura_types::PlaybackState;

/// Failure reported by an external service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("session closed")]
    Closed,
}

/// Why an intent or lifecycle operation was refused.
///
/// Refusals happen before any state is touched; service failures are
/// reported after the orchestrator has already fallen back to `stopped`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    InvalidSettings(String),
    #[error("no active channels")]
    NoActiveChannels,
    #[error("no recording available")]
    NoRecording,
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: PlaybackState,
    },
    #[error("generation session failed: {0}")]
    Service(#[from] ServiceError),
    #[error("export failed: {0}")]
    Export(String),
}
