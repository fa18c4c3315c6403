//! Pure state-mutation reducers for session parameters.
//!
//! Reducers mutate `SessionState` only. They do NOT:
//! - Touch playback state or timers
//! - Emit events
//! - Push prompts to the generation service
//!
//! The orchestrator calls them after deciding an intent is allowed, then
//! takes care of the side effects itself.

mod session;

pub use session::{reduce_session, Reduced};
