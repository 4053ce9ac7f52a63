//! Perceptual loudness per analysis frame
//!
//! Mean A-weighted power in dB over all FFT bins of each frame, relative to
//! `ref_db` and floored at `-range_db`.

use super::stft::{fft_frequencies, FramePadding, Stft};
use crate::audio::pad_or_trim;

const AMIN: f32 = 1e-20;
const A_WEIGHTING_MIN_DB: f32 = -80.0;

#[derive(Debug, Clone)]
pub struct LoudnessConfig {
    pub sample_rate: u32,
    pub frame_rate: u32,
    pub n_fft: usize,
    pub ref_db: f32,
    pub range_db: f32,
}

#[derive(Debug)]
pub struct LoudnessExtractor {
    config: LoudnessConfig,
    stft: Stft,
    a_weighting: Vec<f32>,
}

impl LoudnessExtractor {
    pub fn new(config: LoudnessConfig) -> Self {
        let hop = (config.sample_rate / config.frame_rate) as usize;
        let stft = Stft::new(config.n_fft, hop, FramePadding::End);
        let a_weighting = fft_frequencies(config.sample_rate, config.n_fft)
            .into_iter()
            .map(a_weighting)
            .collect();

        Self { config, stft, a_weighting }
    }

    /// Loudness in dB, one value per frame, `floor(duration * frame_rate)` frames
    pub fn compute(&self, audio: &[f32]) -> Vec<f32> {
        let LoudnessConfig { sample_rate, frame_rate, ref_db, range_db, .. } = self.config;

        let loudness: Vec<f32> = self
            .stft
            .magnitude(audio)
            .into_iter()
            .map(|frame| {
                let total: f32 = frame
                    .iter()
                    .zip(&self.a_weighting)
                    .map(|(&amp, &weight)| {
                        let db = 20.0 * amp.max(AMIN).log10() + weight - ref_db;
                        db.max(-range_db)
                    })
                    .sum();
                total / frame.len() as f32
            })
            .collect();

        let expected_len = expected_frames(audio.len(), sample_rate, frame_rate);
        pad_or_trim(&loudness, expected_len, -range_db)
    }
}

/// `floor(n_samples / sample_rate * frame_rate)`
pub fn expected_frames(n_samples: usize, sample_rate: u32, frame_rate: u32) -> usize {
    (n_samples as f64 / sample_rate as f64 * frame_rate as f64) as usize
}

/// IEC 61672 A-weighting in dB, floored at -80 dB
pub fn a_weighting(freq: f32) -> f32 {
    const C: [f64; 4] = [
        12194.217 * 12194.217,
        20.598997 * 20.598997,
        107.65265 * 107.65265,
        737.86223 * 737.86223,
    ];

    if freq <= 0.0 {
        return A_WEIGHTING_MIN_DB;
    }

    let f_sq = (freq as f64) * (freq as f64);
    let weight = 2.0
        + 20.0
            * (C[0].log10() + 2.0 * f_sq.log10()
                - (f_sq + C[0]).log10()
                - (f_sq + C[1]).log10()
                - 0.5 * (f_sq + C[2]).log10()
                - 0.5 * (f_sq + C[3]).log10());

    (weight as f32).max(A_WEIGHTING_MIN_DB)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn extractor() -> LoudnessExtractor {
        LoudnessExtractor::new(LoudnessConfig {
            sample_rate: 16000,
            frame_rate: 250,
            n_fft: 2048,
            ref_db: 20.7,
            range_db: 80.0,
        })
    }

    #[test]
    fn test_a_weighting_reference_points() {
        // 0 dB at 1 kHz by definition
        assert!(a_weighting(1000.0).abs() < 0.01);
        assert!((a_weighting(100.0) + 19.1).abs() < 0.1);
        assert_eq!(a_weighting(0.0), -80.0);
    }

    #[test]
    fn test_silence_is_floor() {
        let loudness = extractor().compute(&vec![0.0; 8000]);
        assert_eq!(loudness.len(), 125);
        assert!(loudness.iter().all(|&v| v == -80.0));
    }

    #[test]
    fn test_tone_louder_than_silence() {
        let tone: Vec<f32> = (0..16000)
            .map(|i| 0.5 * (2.0 * PI * 1000.0 * i as f32 / 16000.0).sin())
            .collect();
        let loudness = extractor().compute(&tone);
        assert_eq!(loudness.len(), 250);
        assert!(loudness[125] > -80.0);

        let quiet: Vec<f32> = tone.iter().map(|s| s * 0.01).collect();
        let quiet_loudness = extractor().compute(&quiet);
        assert!(loudness[125] > quiet_loudness[125]);
    }

    #[test]
    fn test_expected_frames() {
        assert_eq!(expected_frames(64000, 16000, 250), 1000);
        assert_eq!(expected_frames(8000, 16000, 250), 125);
        assert_eq!(expected_frames(0, 16000, 250), 0);
    }
}
