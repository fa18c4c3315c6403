use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("empty audio chunk")]
    EmptyChunk,
    #[error("PCM chunk of {len} bytes is not a whole number of {channels}-channel 16-bit frames")]
    MisalignedPcm { len: usize, channels: u16 },
    #[error("WAV encode failed: {0}")]
    Encode(String),
    #[error("WAV decode failed: {0}")]
    Decode(String),
}
