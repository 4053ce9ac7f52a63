//! Fundamental frequency estimation (YIN)
//!
//! One estimate per analysis frame, frames centered on `t * hop` with zero
//! padding at the edges. Confidence is `1 - d'(tau)` of the chosen lag,
//! where `d'` is the cumulative mean normalized difference.

use rayon::prelude::*;
use super::loudness::expected_frames;

#[derive(Debug, Clone)]
pub struct PitchConfig {
    pub sample_rate: u32,
    pub frame_rate: u32,
    pub frame_size: usize,
    pub fmin: f32,
    pub fmax: f32,
    pub threshold: f32,
}

/// f0 and its confidence, one value per frame each
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchTrack {
    pub f0_hz: Vec<f32>,
    pub confidence: Vec<f32>,
}

impl PitchTrack {
    pub fn len(&self) -> usize {
        self.f0_hz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.f0_hz.is_empty()
    }
}

#[derive(Debug)]
pub struct PitchEstimator {
    config: PitchConfig,
    hop: usize,
    tau_min: usize,
    tau_max: usize,
}

impl PitchEstimator {
    pub fn new(config: PitchConfig) -> Self {
        let sr = config.sample_rate as f32;
        let hop = (config.sample_rate / config.frame_rate) as usize;
        let tau_max = ((sr / config.fmin) as usize).min(config.frame_size / 2);
        let tau_min = ((sr / config.fmax) as usize).clamp(2, tau_max.saturating_sub(1).max(2));

        Self { config, hop, tau_min, tau_max }
    }

    pub fn compute(&self, audio: &[f32]) -> PitchTrack {
        let n_frames = expected_frames(audio.len(), self.config.sample_rate, self.config.frame_rate);
        let half = self.config.frame_size / 2;

        let estimates: Vec<(f32, f32)> = (0..n_frames)
            .into_par_iter()
            .map(|t| {
                let start = (t * self.hop) as isize - half as isize;
                let frame: Vec<f32> = (0..self.config.frame_size)
                    .map(|j| {
                        let idx = start + j as isize;
                        if idx >= 0 && (idx as usize) < audio.len() { audio[idx as usize] } else { 0.0 }
                    })
                    .collect();
                self.estimate_frame(&frame)
            })
            .collect();

        let (f0_hz, confidence) = estimates.into_iter().unzip();
        PitchTrack { f0_hz, confidence }
    }

    /// Returns `(f0_hz, confidence)`; silent frames give `(0, 0)`
    fn estimate_frame(&self, frame: &[f32]) -> (f32, f32) {
        if frame.iter().all(|&s| s == 0.0) {
            return (0.0, 0.0);
        }

        let cmnd = self.cumulative_mean_normalized_difference(frame);

        let mut chosen = None;
        let mut tau = self.tau_min;
        while tau <= self.tau_max {
            if cmnd[tau] < self.config.threshold {
                while tau < self.tau_max && cmnd[tau + 1] < cmnd[tau] {
                    tau += 1;
                }
                chosen = Some(tau);
                break;
            }
            tau += 1;
        }

        // No dip under the threshold: fall back to the global minimum
        let tau = chosen.unwrap_or_else(|| {
            (self.tau_min..=self.tau_max)
                .min_by(|&a, &b| cmnd[a].total_cmp(&cmnd[b]))
                .unwrap_or(self.tau_min)
        });

        let refined = parabolic_interpolation(&cmnd, tau);
        let f0 = if refined > 0.0 { self.config.sample_rate as f32 / refined } else { 0.0 };
        let confidence = (1.0 - cmnd[tau]).clamp(0.0, 1.0);

        (f0, confidence)
    }

    fn cumulative_mean_normalized_difference(&self, frame: &[f32]) -> Vec<f32> {
        let window = frame.len() - self.tau_max;

        let mut diff = vec![0.0f32; self.tau_max + 1];
        for (tau, d) in diff.iter_mut().enumerate().skip(1) {
            *d = (0..window)
                .map(|j| {
                    let delta = frame[j] - frame[j + tau];
                    delta * delta
                })
                .sum();
        }

        let mut cmnd = vec![1.0f32; self.tau_max + 1];
        let mut running = 0.0f32;
        for tau in 1..=self.tau_max {
            running += diff[tau];
            cmnd[tau] = if running > 0.0 { diff[tau] * tau as f32 / running } else { 1.0 };
        }
        cmnd
    }
}

fn parabolic_interpolation(values: &[f32], tau: usize) -> f32 {
    if tau == 0 || tau + 1 >= values.len() {
        return tau as f32;
    }

    let (s0, s1, s2) = (values[tau - 1], values[tau], values[tau + 1]);
    let denom = s0 - 2.0 * s1 + s2;
    if denom.abs() < f32::EPSILON {
        return tau as f32;
    }

    let shift = 0.5 * (s0 - s2) / denom;
    tau as f32 + shift.clamp(-1.0, 1.0)
}
