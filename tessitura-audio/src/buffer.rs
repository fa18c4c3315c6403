use std::io::Cursor;

use crate::AudioError;

/// Interleaved float audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
}

impl AudioBuffer {
    /// `samples` is interleaved; a trailing partial frame is dropped.
    pub fn new(sample_rate: u32, channels: u16, mut samples: Vec<f32>) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);
        Self {
            sample_rate,
            channels,
            samples,
        }
    }

    pub fn silent(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self::new(sample_rate, channels, vec![0.0; frames * channels.max(1) as usize])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Sample for an output channel. Mono buffers feed every output channel;
    /// extra buffer channels beyond the output are ignored.
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        if frame >= self.frames() {
            return 0.0;
        }
        let ch = channel.min(self.channels as usize - 1);
        self.samples[frame * self.channels as usize + ch]
    }
}

/// Decode signed 16-bit little-endian interleaved PCM, as streamed by the
/// generation service.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<AudioBuffer, AudioError> {
    if bytes.is_empty() {
        return Err(AudioError::EmptyChunk);
    }
    let frame_bytes = 2 * channels.max(1) as usize;
    if bytes.len() % frame_bytes != 0 {
        return Err(AudioError::MisalignedPcm {
            len: bytes.len(),
            channels,
        });
    }
    let samples = bytes
        .chunks_exact(2)
        .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / 32768.0)
        .collect();
    Ok(AudioBuffer::new(sample_rate, channels, samples))
}

/// Encode a buffer as a 32-bit float WAV file in memory.
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>, AudioError> {
    let spec = hound::WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| AudioError::Encode(format!("Failed to create WAV writer: {}", e)))?;
        for &sample in buffer.samples() {
            writer
                .write_sample(sample)
                .map_err(|e| AudioError::Encode(format!("Failed to write sample: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| AudioError::Encode(format!("Failed to finalize WAV: {}", e)))?;
    }
    Ok(cursor.into_inner())
}

/// Decode an in-memory WAV file (integer or float samples).
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer, AudioError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| AudioError::Decode(e.to_string()))?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()
                .map_err(|e| AudioError::Decode(e.to_string()))?
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::Decode(e.to_string()))?,
    };
    Ok(AudioBuffer::new(spec.sample_rate, spec.channels, samples))
}
