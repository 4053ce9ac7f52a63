//! Mel filterbank and log-mel spectrograms
//!
//! Follows librosa's defaults: Slaney mel scale (`htk=False`) with Slaney
//! area normalization, power spectrogram input, `power_to_db` with
//! `ref = 1.0`, `amin = 1e-10`.

use super::stft::{fft_frequencies, FramePadding, Stft};

const AMIN: f32 = 1e-10;

#[derive(Debug, Clone)]
pub struct MelConfig {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub fmin: f32,
    /// Defaults to `sample_rate / 2`
    pub fmax: Option<f32>,
}

/// A mel spectrogram laid out `[mel band][frame]`
#[derive(Debug, Clone, PartialEq)]
pub struct MelSpectrogram {
    pub data: Vec<Vec<f32>>,
}

impl MelSpectrogram {
    pub fn n_mels(&self) -> usize {
        self.data.len()
    }

    pub fn n_frames(&self) -> usize {
        self.data.first().map_or(0, |band| band.len())
    }

    pub fn min_max(&self) -> (f32, f32) {
        self.data
            .iter()
            .flatten()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }
}

/// Precomputed STFT plan and filterbank
#[derive(Debug)]
pub struct MelExtractor {
    config: MelConfig,
    stft: Stft,
    mel_basis: Vec<Vec<f32>>,
}

impl MelExtractor {
    pub fn new(config: MelConfig) -> Self {
        let fmax = config.fmax.unwrap_or(config.sample_rate as f32 / 2.0);
        let mel_basis = mel_filterbank(config.sample_rate, config.n_fft, config.n_mels, config.fmin, fmax);
        let stft = Stft::new(config.n_fft, config.hop_length, FramePadding::Center);

        Self { config, stft, mel_basis }
    }

    pub fn config(&self) -> &MelConfig {
        &self.config
    }

    /// Mel-scaled power spectrogram
    pub fn power(&self, samples: &[f32]) -> MelSpectrogram {
        let power = self.stft.power(samples);

        let data = self
            .mel_basis
            .iter()
            .map(|filter| {
                power
                    .iter()
                    .map(|frame| filter.iter().zip(frame).map(|(w, p)| w * p).sum())
                    .collect()
            })
            .collect();

        MelSpectrogram { data }
    }

    /// Mel power converted to decibels, floored at `max - top_db`
    pub fn log_power(&self, samples: &[f32], top_db: Option<f32>) -> MelSpectrogram {
        let mut mel = self.power(samples);
        power_to_db(&mut mel.data, 1.0, top_db);
        mel
    }
}

/// In-place `10 * log10(max(amin, S) / ref)`, optionally clipped to `top_db` below the peak
pub fn power_to_db(spec: &mut [Vec<f32>], reference: f32, top_db: Option<f32>) {
    let ref_db = 10.0 * reference.max(AMIN).log10();

    let mut peak = f32::NEG_INFINITY;
    for v in spec.iter_mut().flatten() {
        *v = 10.0 * v.max(AMIN).log10() - ref_db;
        peak = peak.max(*v);
    }

    if let Some(top_db) = top_db {
        let floor = peak - top_db;
        for v in spec.iter_mut().flatten() {
            *v = v.max(floor);
        }
    }
}

/// Slaney mel scale: linear below 1 kHz, logarithmic above
pub fn hz_to_mel(hz: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    const LOGSTEP: f32 = 0.068_751_74; // ln(6.4) / 27

    if hz < MIN_LOG_HZ {
        hz / F_SP
    } else {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / LOGSTEP
    }
}

pub fn mel_to_hz(mel: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    const LOGSTEP: f32 = 0.068_751_74;

    if mel < MIN_LOG_MEL {
        mel * F_SP
    } else {
        MIN_LOG_HZ * ((mel - MIN_LOG_MEL) * LOGSTEP).exp()
    }
}

/// Triangular filters `[n_mels][n_fft / 2 + 1]`, area-normalized
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f32, fmax: f32) -> Vec<Vec<f32>> {
    let fft_freqs = fft_frequencies(sample_rate, n_fft);

    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    let hz_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();

    (0..n_mels)
        .map(|i| {
            let (lower, center, upper) = (hz_points[i], hz_points[i + 1], hz_points[i + 2]);
            let enorm = 2.0 / (upper - lower);

            fft_freqs
                .iter()
                .map(|&f| {
                    let rising = (f - lower) / (center - lower);
                    let falling = (upper - f) / (upper - center);
                    rising.min(falling).max(0.0) * enorm
                })
                .collect()
        })
        .collect()
}
