use std::sync::Arc;

use crate::buffer::{decode_wav, encode_wav, AudioBuffer};

/// A recorded stretch of the timeline.
#[derive(Debug, Clone)]
pub struct RecordingSegment {
    /// Position on the recording timeline, in seconds.
    pub start_time_secs: f64,
    pub duration_secs: f64,
    pub buffer: Arc<AudioBuffer>,
}

impl RecordingSegment {
    pub fn end_secs(&self) -> f64 {
        self.start_time_secs + self.duration_secs
    }
}

/// A finished take: the encoded file plus the decoded segment for playback.
#[derive(Debug, Clone)]
pub struct RecordedTake {
    pub wav: Vec<u8>,
    pub segment: RecordingSegment,
}

/// Captures the raw (pre-fade, pre-volume) bus while armed.
#[derive(Debug)]
pub struct RecordingTap {
    sample_rate: u32,
    channels: u16,
    armed: bool,
    paused: bool,
    samples: Vec<f32>,
}

impl RecordingTap {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            armed: false,
            paused: false,
            samples: Vec::new(),
        }
    }

    /// Arm and discard anything captured before.
    pub fn start(&mut self) {
        self.samples.clear();
        self.armed = true;
        self.paused = false;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_capturing(&self) -> bool {
        self.armed && !self.paused
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn captured_secs(&self) -> f64 {
        self.samples.len() as f64 / (f64::from(self.sample_rate) * f64::from(self.channels))
    }

    pub fn capture(&mut self, frames: &[f32]) {
        if self.is_capturing() {
            self.samples.extend_from_slice(frames);
        }
    }

    /// Disarm without producing a take.
    pub fn discard(&mut self) {
        self.armed = false;
        self.paused = false;
        self.samples.clear();
    }

    /// Disarm and turn the capture into a take. The take goes through the
    /// encoded blob so playback hears exactly what an export contains.
    /// Returns `None` for an empty or undecodable capture.
    pub fn finish(&mut self) -> Option<RecordedTake> {
        if !self.armed {
            return None;
        }
        self.armed = false;
        self.paused = false;
        let samples = std::mem::take(&mut self.samples);
        if samples.is_empty() {
            return None;
        }
        let captured = AudioBuffer::new(self.sample_rate, self.channels, samples);
        let wav = match encode_wav(&captured) {
            Ok(wav) => wav,
            Err(e) => {
                log::warn!(target: "audio::recorder", "dropping take: {}", e);
                return None;
            }
        };
        let buffer = match decode_wav(&wav) {
            Ok(buffer) => buffer,
            Err(e) => {
                log::warn!(target: "audio::recorder", "recorded blob did not decode: {}", e);
                return None;
            }
        };
        let segment = RecordingSegment {
            start_time_secs: 0.0,
            duration_secs: buffer.duration_secs(),
            buffer: Arc::new(buffer),
        };
        Some(RecordedTake { wav, segment })
    }
}
