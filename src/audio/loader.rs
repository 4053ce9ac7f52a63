//! Loading audio files into analysis-ready mono waveforms

use std::path::Path;
use crate::audio::{AudioConverter, AudioData, WavAudio, pad_or_trim};
use crate::error::Result;

/// A mono waveform at a known sample rate
#[derive(Debug, Clone)]
pub struct LoadedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Duration of the source file, before resampling
    pub source_duration: f64,
}

impl LoadedAudio {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Decode, mix down and resample a file without touching its length
pub fn load_mono<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<LoadedAudio> {
    let mut audio = WavAudio::from_file(path)?;
    let source_duration = audio.duration();

    audio.mix_to_mono();
    if audio.sample_rate() != sample_rate {
        audio = AudioConverter::convert_sample_rate(&audio, sample_rate)?;
    }

    let samples = match audio.data {
        AudioData::Mono(data) => data.to_vec(),
        multi @ AudioData::MultiChannel(_) => multi.to_mono().to_vec(),
    };

    Ok(LoadedAudio { samples, sample_rate, source_duration })
}

/// Load a dataset example: the waveform is forced to
/// `floor(source_duration * sample_rate)` samples, zero-padding short
/// resampler output and truncating long output.
pub fn load_audio<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<LoadedAudio> {
    let mut loaded = load_mono(path, sample_rate)?;
    let expected_len = (loaded.source_duration * sample_rate as f64) as usize;
    loaded.samples = pad_or_trim(&loaded.samples, expected_len, 0.0);
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFormat;
    use ndarray::Array1;
    use tempfile::TempDir;

    fn write_tone(path: &Path, sample_rate: u32, len: usize) {
        let data = Array1::from_shape_fn(len, |i| {
            (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin() * 0.5
        });
        WavAudio::new_mono(sample_rate, data, AudioFormat::Int(16))
            .save_to_file(path)
            .unwrap();
    }

    #[test]
    fn test_load_at_native_rate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_tone(&path, 16000, 8000);

        let audio = load_audio(&path, 16000).unwrap();
        assert_eq!(audio.len(), 8000);
        assert!((audio.source_duration - 0.5).abs() < 1e-9);
        assert!(audio.samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_load_resamples_to_expected_length() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone_48k.wav");
        write_tone(&path, 48000, 24000);

        let audio = load_audio(&path, 16000).unwrap();
        assert_eq!(audio.sample_rate, 16000);
        assert_eq!(audio.len(), 8000);
    }

    #[test]
    fn test_load_four_channel_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quad.wav");
        let data = ndarray::Array2::from_shape_fn((8000, 4), |(i, ch)| {
            let tone = (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin() * 0.5;
            if ch % 2 == 0 { tone } else { 0.0 }
        });
        WavAudio::new_multichannel(16000, data, AudioFormat::Int(16))
            .unwrap()
            .save_to_file(&path)
            .unwrap();

        let audio = load_audio(&path, 16000).unwrap();
        assert_eq!(audio.len(), 8000);
        let peak = audio.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(load_audio(dir.path().join("nope.wav"), 16000).is_err());
    }
}
