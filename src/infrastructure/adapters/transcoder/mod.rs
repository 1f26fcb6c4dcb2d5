//! Transcoder Adapter - 录音转标准 WAV

mod wav_encoder;

pub use wav_encoder::*;
