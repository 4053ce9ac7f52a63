//! Signal Processing Module
//!
//! STFT, mel spectrograms, A-weighted loudness and YIN pitch tracking.

pub mod stft;
pub mod mel;
pub mod loudness;
pub mod pitch;

pub use stft::{FramePadding, Stft, hann_window, fft_frequencies};
pub use mel::{MelConfig, MelExtractor, MelSpectrogram, power_to_db};
pub use loudness::{LoudnessConfig, LoudnessExtractor, a_weighting, expected_frames};
pub use pitch::{PitchConfig, PitchEstimator, PitchTrack};

use crate::config::Config;

/// Frame-rate aligned features of one waveform
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFeatures {
    pub f0_hz: Vec<f32>,
    pub f0_confidence: Vec<f32>,
    pub loudness_db: Vec<f32>,
}

/// Pitch and loudness analysis sharing one configuration
#[derive(Debug)]
pub struct FeatureExtractor {
    pitch: PitchEstimator,
    loudness: LoudnessExtractor,
}

impl FeatureExtractor {
    pub fn new(config: &Config) -> Self {
        let features = &config.features;

        let pitch = PitchEstimator::new(PitchConfig {
            sample_rate: config.sample_rate(),
            frame_rate: config.frame_rate(),
            frame_size: features.f0_frame_size,
            fmin: features.f0_min_hz,
            fmax: features.f0_max_hz,
            threshold: features.yin_threshold,
        });

        let loudness = LoudnessExtractor::new(LoudnessConfig {
            sample_rate: config.sample_rate(),
            frame_rate: config.frame_rate(),
            n_fft: features.loudness_n_fft,
            ref_db: features.ref_db,
            range_db: features.range_db,
        });

        Self { pitch, loudness }
    }

    pub fn extract(&self, audio: &[f32]) -> AudioFeatures {
        let PitchTrack { f0_hz, confidence } = self.pitch.compute(audio);
        let loudness_db = self.loudness.compute(audio);

        AudioFeatures {
            f0_hz,
            f0_confidence: confidence,
            loudness_db,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_lengths_match() {
        let extractor = FeatureExtractor::new(&Config::default());
        let features = extractor.extract(&vec![0.0; 16000]);
        assert_eq!(features.f0_hz.len(), 250);
        assert_eq!(features.f0_confidence.len(), 250);
        assert_eq!(features.loudness_db.len(), 250);
    }
}
