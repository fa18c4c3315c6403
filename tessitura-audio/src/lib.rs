//! # tessitura-audio
//!
//! Audio side of the orchestrator: decoding streamed PCM, scheduling
//! buffers on the output clock, the master gain and fade envelope, the
//! recording tap, and the recording timeline (snapshot log, time tracker).
//!
//! Nothing here owns a clock. Callers pass the current output time in
//! seconds; that keeps the whole crate deterministic under test.

pub mod buffer;
pub mod error;
pub mod gain;
pub mod recorder;
pub mod scheduler;
pub mod sink;
pub mod snapshot_log;
pub mod time_tracker;

pub use buffer::{decode_pcm16, decode_wav, encode_wav, AudioBuffer};
pub use error::AudioError;
pub use gain::{fade_factor, GainParam};
pub use recorder::{RecordedTake, RecordingSegment, RecordingTap};
pub use scheduler::{AudioScheduler, SchedulerConfig, SourceId};
pub use sink::{AudioSink, NullSink, OutputLevels};
pub use snapshot_log::SnapshotLog;
pub use time_tracker::{rewind_speed, Rewind, TimeTracker};
