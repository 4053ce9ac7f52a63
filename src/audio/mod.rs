//! Audio Module
//!
//! WAV decoding and encoding, channel mixing, resampling, and the
//! fixed-length loading used by the dataset stages.

pub mod wav;
pub mod converter;
pub mod loader;

pub use wav::{WavAudio, AudioFormat, AudioHeader, AudioData};
pub use converter::{AudioConverter, pad_or_trim};
pub use loader::{LoadedAudio, load_audio, load_mono};
