/// Final destination of the master output: an audio device, a file, an
/// analysis node.
pub trait AudioSink {
    /// `frames` is interleaved with `channels` samples per frame.
    fn write(&mut self, frames: &[f32], channels: u16);
}

/// Discards everything. Used headless and in tests.
#[derive(Debug, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn write(&mut self, _frames: &[f32], _channels: u16) {}
}

/// Peak levels of the last rendered block, per side.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutputLevels {
    pub left: f32,
    pub right: f32,
}

impl OutputLevels {
    pub fn measure(frames: &[f32], channels: u16) -> Self {
        let channels = channels.max(1) as usize;
        let mut levels = Self::default();
        for frame in frames.chunks_exact(channels) {
            levels.left = levels.left.max(frame[0].abs());
            levels.right = levels.right.max(frame[channels.min(2) - 1].abs());
        }
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_peaks_per_side() {
        let levels = OutputLevels::measure(&[0.1, -0.4, -0.3, 0.2], 2);
        assert_eq!(levels, OutputLevels { left: 0.3, right: 0.4 });
    }

    #[test]
    fn mono_mirrors_left() {
        let levels = OutputLevels::measure(&[0.5, -0.7], 1);
        assert_eq!(levels.left, 0.7);
        assert_eq!(levels.right, 0.7);
    }
}
