//! Offline stand-in for a streaming music model. Each session runs a worker
//! thread that renders a drone, one partial per instrument channel, loud in
//! proportion to that channel's prompt weight.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;

use tessitura_core::types::SessionGeneration;
use tessitura_core::{
    GenerationService, InboundMessage, LiveSession, ServiceError, SessionEvent, WeightedPrompt,
};

const CHUNK: Duration = Duration::from_millis(250);
const ROOT_HZ: f64 = 220.0;
/// Lead, alto, harmonic, bass, rhythm.
const PARTIALS: [f64; 5] = [2.0, 1.5, 1.25, 0.5, 4.0];
const HEADROOM: f64 = 0.3;
const CHANNEL_PREFIX: &str = "INSTRUMENT ";

type Voice = [f32; 5];

pub struct ToneService {
    sample_rate: u32,
    channels: u16,
}

impl ToneService {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
        }
    }
}

impl GenerationService for ToneService {
    fn connect(
        &mut self,
        generation: SessionGeneration,
        inbox: Sender<InboundMessage>,
    ) -> Result<Box<dyn LiveSession>, ServiceError> {
        log::info!(target: "tone", "tone session {} connected", generation);
        Ok(Box::new(ToneSession {
            generation,
            inbox,
            voice: Arc::new(Mutex::new([0.0; 5])),
            stop: Arc::new(AtomicBool::new(false)),
            started: false,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }))
    }
}

struct ToneSession {
    generation: SessionGeneration,
    inbox: Sender<InboundMessage>,
    voice: Arc<Mutex<Voice>>,
    stop: Arc<AtomicBool>,
    started: bool,
    sample_rate: u32,
    channels: u16,
}

impl LiveSession for ToneSession {
    fn set_weighted_prompts(&mut self, prompts: &[WeightedPrompt]) -> Result<(), ServiceError> {
        let mut voice = self.voice.lock().map_err(|_| ServiceError::Closed)?;
        *voice = voice_from_prompts(prompts);
        Ok(())
    }

    fn play(&mut self) -> Result<(), ServiceError> {
        if self.started {
            return Ok(());
        }
        self.started = true;

        let generation = self.generation;
        let inbox = self.inbox.clone();
        let voice = Arc::clone(&self.voice);
        let stop = Arc::clone(&self.stop);
        let sample_rate = self.sample_rate;
        let channels = self.channels;
        let frames = (f64::from(sample_rate) * CHUNK.as_secs_f64()) as usize;

        thread::Builder::new()
            .name(format!("tone-{}", generation))
            .spawn(move || {
                let mut cursor = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    let Ok(current) = voice.lock().map(|v| *v) else {
                        break;
                    };
                    let pcm = render(&current, cursor, frames, sample_rate, channels);
                    cursor += frames as u64;
                    let message = InboundMessage {
                        generation,
                        event: SessionEvent::AudioChunk(pcm),
                    };
                    if inbox.send(message).is_err() {
                        break;
                    }
                    thread::sleep(CHUNK);
                }
                log::debug!(target: "tone", "tone session {} worker exiting", generation);
            })
            .map_err(|e| ServiceError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for ToneSession {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Channel prompt weights in role order; everything else is ignored.
fn voice_from_prompts(prompts: &[WeightedPrompt]) -> Voice {
    let mut voice = [0.0; 5];
    let channel_weights = prompts
        .iter()
        .filter(|p| p.text.starts_with(CHANNEL_PREFIX))
        .map(|p| p.weight.max(0.0));
    for (slot, weight) in voice.iter_mut().zip(channel_weights) {
        *slot = weight;
    }
    voice
}

/// 16-bit little-endian interleaved PCM starting at frame `start`.
fn render(voice: &Voice, start: u64, frames: usize, sample_rate: u32, channels: u16) -> Vec<u8> {
    let total: f32 = voice.iter().sum();
    let norm = HEADROOM / f64::from(total.max(1.0));
    let rate = f64::from(sample_rate.max(1));
    let mut out = Vec::with_capacity(frames * channels as usize * 2);
    for i in 0..frames {
        let t = (start + i as u64) as f64 / rate;
        let sample: f64 = voice
            .iter()
            .zip(PARTIALS)
            .map(|(amp, ratio)| f64::from(*amp) * (TAU * ROOT_HZ * ratio * t).sin())
            .sum();
        let value = ((sample * norm).clamp(-1.0, 1.0) * f64::from(i16::MAX)) as i16;
        for _ in 0..channels {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(label: &str, weight: f32) -> WeightedPrompt {
        WeightedPrompt::new(format!("{}{}: Piano", CHANNEL_PREFIX, label), weight)
    }

    #[test]
    fn voice_reads_only_channel_prompts() {
        let prompts = vec![
            WeightedPrompt::new("ANCHOR: Jazz", 1.0),
            channel("Lead", 0.8),
            channel("Alto", 0.0),
            channel("Harmonic", 0.4),
            WeightedPrompt::new("Nuance: Space", 1.2),
        ];
        assert_eq!(voice_from_prompts(&prompts), [0.8, 0.0, 0.4, 0.0, 0.0]);
    }

    #[test]
    fn silent_voice_renders_silence() {
        let pcm = render(&[0.0; 5], 0, 100, 8_000, 2);
        assert_eq!(pcm.len(), 100 * 2 * 2);
        assert!(pcm.iter().all(|b| *b == 0));
    }

    #[test]
    fn rendering_is_continuous_across_chunks() {
        let voice = [1.0, 0.5, 0.0, 0.0, 0.0];
        let whole = render(&voice, 0, 200, 8_000, 1);
        let mut split = render(&voice, 0, 120, 8_000, 1);
        split.extend(render(&voice, 120, 80, 8_000, 1));
        assert_eq!(whole, split);
        assert!(whole.iter().any(|b| *b != 0));
    }

    #[test]
    fn session_streams_tagged_chunks_until_closed() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut service = ToneService::new(8_000, 2);
        let generation = SessionGeneration::new(3);
        let mut session = service.connect(generation, tx).unwrap();
        session.set_weighted_prompts(&[channel("Lead", 1.0)]).unwrap();
        session.play().unwrap();

        let message = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(message.generation, generation);
        match message.event {
            SessionEvent::AudioChunk(pcm) => assert_eq!(pcm.len(), 2_000 * 2 * 2),
            other => panic!("unexpected {:?}", other),
        }
        session.close();
    }
}
