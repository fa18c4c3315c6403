use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tessitura_core::audio::AudioSink;

/// Writes the master output to a WAV file as it is rendered. The header is
/// finalized when the sink is dropped.
pub struct WavMonitor {
    writer: hound::WavWriter<BufWriter<File>>,
    channels: u16,
    failed: bool,
}

impl WavMonitor {
    pub fn create(path: &Path, sample_rate: u32, channels: u16) -> Result<Self, hound::Error> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        Ok(Self {
            writer: hound::WavWriter::create(path, spec)?,
            channels,
            failed: false,
        })
    }
}

impl AudioSink for WavMonitor {
    fn write(&mut self, frames: &[f32], channels: u16) {
        if self.failed || channels != self.channels {
            return;
        }
        for s in frames {
            let value = (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            if let Err(e) = self.writer.write_sample(value) {
                log::warn!(target: "monitor", "monitor write failed, disabling: {}", e);
                self.failed = true;
                return;
            }
        }
    }
}
