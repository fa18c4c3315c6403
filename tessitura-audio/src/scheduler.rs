//! Output-clock scheduling of streamed chunks and recorded buffers.
//!
//! Signal path: every source mixes into a raw bus; the raw bus feeds the
//! recording tap (pre-fade) and the master gain stage, which writes to the
//! destination sink.

use std::sync::Arc;

use crate::buffer::{decode_pcm16, AudioBuffer};
use crate::gain::GainParam;
use crate::recorder::{RecordedTake, RecordingTap};
use crate::sink::{AudioSink, NullSink, OutputLevels};
use crate::AudioError;

/// Largest block rendered in one pass.
const MAX_RENDER_FRAMES: u64 = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Head start given to the first chunk of a session.
    pub buffering_latency_secs: f64,
    /// Head start after the stream cursor fell behind the output clock.
    pub underrun_margin_secs: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            buffering_latency_secs: 0.2,
            underrun_margin_secs: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    /// Chunk of the live generation stream.
    Stream,
    /// Range of a recorded buffer.
    Playback,
}

struct ScheduledSource {
    id: SourceId,
    kind: SourceKind,
    buffer: Arc<AudioBuffer>,
    /// Output-clock time the source starts at.
    start_at: f64,
    /// Seconds into the buffer.
    offset: f64,
    duration: f64,
}

pub struct AudioScheduler {
    config: SchedulerConfig,
    next_start_time: Option<f64>,
    sources: Vec<ScheduledSource>,
    next_source_id: u64,
    master: GainParam,
    tap: RecordingTap,
    destination: Box<dyn AudioSink>,
    rendered_frames: u64,
    levels: OutputLevels,
}

impl AudioScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let tap = RecordingTap::new(config.sample_rate, config.channels);
        Self {
            config,
            next_start_time: None,
            sources: Vec::new(),
            next_source_id: 0,
            master: GainParam::default(),
            tap,
            destination: Box::new(NullSink),
            rendered_frames: 0,
            levels: OutputLevels::default(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Replace the output destination (device, file writer, analyser).
    pub fn set_destination(&mut self, destination: Box<dyn AudioSink>) {
        self.destination = destination;
    }

    /// Output-clock time rendered so far.
    pub fn rendered_until(&self) -> f64 {
        self.rendered_frames as f64 / f64::from(self.config.sample_rate)
    }

    pub fn next_start_time(&self) -> Option<f64> {
        self.next_start_time
    }

    /// Forget the stream cursor; the next chunk re-buffers.
    pub fn reset_stream_cursor(&mut self) {
        self.next_start_time = None;
    }

    fn push_source(
        &mut self,
        kind: SourceKind,
        buffer: Arc<AudioBuffer>,
        start_at: f64,
        offset: f64,
        duration: f64,
    ) -> SourceId {
        let id = SourceId(self.next_source_id);
        self.next_source_id += 1;
        self.sources.push(ScheduledSource {
            id,
            kind,
            buffer,
            start_at,
            offset,
            duration,
        });
        id
    }

    /// Decode a streamed PCM chunk and queue it right after the previous one.
    pub fn enqueue_generated_chunk(&mut self, pcm: &[u8], now: f64) -> Result<SourceId, AudioError> {
        let buffer = decode_pcm16(pcm, self.config.sample_rate, self.config.channels)?;
        let start_at = match self.next_start_time {
            None => now + self.config.buffering_latency_secs,
            Some(t) if t < now => {
                log::debug!(target: "audio::scheduler", "stream underrun ({:.3}s behind)", now - t);
                now + self.config.underrun_margin_secs
            }
            Some(t) => t,
        };
        let duration = buffer.duration_secs();
        self.next_start_time = Some(start_at + duration);
        Ok(self.push_source(SourceKind::Stream, Arc::new(buffer), start_at, 0.0, duration))
    }

    /// Schedule `duration` seconds of `buffer`, starting `offset` seconds in,
    /// at output time `at`.
    pub fn play_buffer_range(
        &mut self,
        buffer: Arc<AudioBuffer>,
        offset: f64,
        duration: f64,
        at: f64,
    ) -> SourceId {
        let offset = offset.clamp(0.0, buffer.duration_secs());
        let duration = duration.clamp(0.0, buffer.duration_secs() - offset);
        self.push_source(SourceKind::Playback, buffer, at, offset, duration)
    }

    /// Stop every scheduled source at once.
    pub fn stop_all_sources(&mut self) {
        if !self.sources.is_empty() {
            log::debug!(target: "audio::scheduler", "stopping {} sources", self.sources.len());
        }
        self.sources.clear();
    }

    pub fn active_source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn playback_source_count(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.kind == SourceKind::Playback)
            .count()
    }

    pub fn is_scheduled(&self, id: SourceId) -> bool {
        self.sources.iter().any(|s| s.id == id)
    }

    pub fn master_gain(&self) -> &GainParam {
        &self.master
    }

    pub fn set_master_target(&mut self, value: f32, time_constant: f32) {
        self.master.set_target_at_time(value, time_constant);
    }

    pub fn set_master_immediately(&mut self, value: f32) {
        self.master.set_value(value);
    }

    pub fn output_levels(&self) -> OutputLevels {
        self.levels
    }

    pub fn start_recording(&mut self) {
        self.tap.start();
    }

    pub fn pause_recording(&mut self) {
        self.tap.pause();
    }

    pub fn resume_recording(&mut self) {
        self.tap.resume();
    }

    pub fn is_recording(&self) -> bool {
        self.tap.is_armed()
    }

    pub fn finish_recording(&mut self) -> Option<RecordedTake> {
        self.tap.finish()
    }

    pub fn discard_recording(&mut self) {
        self.tap.discard();
    }

    /// Render everything up to output time `until`.
    pub fn render(&mut self, until: f64) {
        let target = (until.max(0.0) * f64::from(self.config.sample_rate)).floor() as u64;
        while self.rendered_frames < target {
            let end = target.min(self.rendered_frames + MAX_RENDER_FRAMES);
            self.render_block(self.rendered_frames, end);
            self.rendered_frames = end;
        }
    }

    fn render_block(&mut self, start: u64, end: u64) {
        let sr = f64::from(self.config.sample_rate);
        let ch = self.config.channels.max(1) as usize;
        let mut mix = vec![0.0f32; (end - start) as usize * ch];

        for src in &self.sources {
            let src_start = (src.start_at * sr).round() as i64;
            let src_end = src_start + (src.duration * sr).round() as i64;
            let lo = (start as i64).max(src_start);
            let hi = (end as i64).min(src_end);
            if lo >= hi {
                continue;
            }
            let buf_sr = f64::from(src.buffer.sample_rate());
            let offset_frames = (src.offset * buf_sr).round() as i64;
            for f in lo..hi {
                let rel = f - src_start;
                let bf = if src.buffer.sample_rate() == self.config.sample_rate {
                    offset_frames + rel
                } else {
                    offset_frames + (rel as f64 * buf_sr / sr).floor() as i64
                };
                let base = (f - start as i64) as usize * ch;
                for c in 0..ch {
                    mix[base + c] += src.buffer.sample(bf as usize, c);
                }
            }
        }

        self.tap.capture(&mix);

        let dt = 1.0 / sr as f32;
        for frame in mix.chunks_exact_mut(ch) {
            let g = self.master.advance(dt);
            for s in frame {
                *s *= g;
            }
        }
        self.levels = OutputLevels::measure(&mix, self.config.channels);
        self.destination.write(&mix, self.config.channels);

        // onended
        self.sources.retain(|s| {
            let src_end = ((s.start_at + s.duration) * sr).round() as i64;
            src_end > end as i64
        });
    }
}
