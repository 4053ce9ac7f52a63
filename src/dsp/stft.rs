//! Short-time Fourier transform

use std::f32::consts::PI;
use std::sync::Arc;
use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// How the signal is padded before framing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePadding {
    /// Zero-pad `n_fft / 2` on both sides so frame `t` is centered on sample `t * hop`
    Center,
    /// Zero-pad the tail so the last frame covers the last sample; frames start at 0
    End,
}

/// Planned STFT with a periodic Hann window
pub struct Stft {
    n_fft: usize,
    hop_length: usize,
    padding: FramePadding,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl std::fmt::Debug for Stft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stft")
            .field("n_fft", &self.n_fft)
            .field("hop_length", &self.hop_length)
            .field("padding", &self.padding)
            .finish()
    }
}

impl Stft {
    pub fn new(n_fft: usize, hop_length: usize, padding: FramePadding) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n_fft);

        Self {
            n_fft,
            hop_length,
            padding,
            window: hann_window(n_fft),
            fft,
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    /// Number of non-negative frequency bins
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Frame count produced for a signal of `len` samples
    pub fn n_frames(&self, len: usize) -> usize {
        match self.padding {
            FramePadding::Center => 1 + len / self.hop_length,
            FramePadding::End => len.div_ceil(self.hop_length),
        }
    }

    /// Complex spectrum per frame, `[frame][bin]`
    pub fn transform(&self, signal: &[f32]) -> Vec<Vec<Complex<f32>>> {
        let offset = match self.padding {
            FramePadding::Center => self.n_fft / 2,
            FramePadding::End => 0,
        };
        let n_frames = self.n_frames(signal.len());

        (0..n_frames)
            .into_par_iter()
            .map(|t| {
                // Position of the frame's first sample in the unpadded signal
                let start = (t * self.hop_length) as isize - offset as isize;

                let mut buffer: Vec<Complex<f32>> = (0..self.n_fft)
                    .map(|j| {
                        let idx = start + j as isize;
                        let sample = if idx >= 0 && (idx as usize) < signal.len() {
                            signal[idx as usize] * self.window[j]
                        } else {
                            0.0
                        };
                        Complex::new(sample, 0.0)
                    })
                    .collect();

                self.fft.process(&mut buffer);
                buffer.truncate(self.n_bins());
                buffer
            })
            .collect()
    }

    /// `|X|^2` per frame, `[frame][bin]`
    pub fn power(&self, signal: &[f32]) -> Vec<Vec<f32>> {
        self.transform(signal)
            .into_iter()
            .map(|frame| frame.iter().map(|c| c.norm_sqr()).collect())
            .collect()
    }

    /// `|X|` per frame, `[frame][bin]`
    pub fn magnitude(&self, signal: &[f32]) -> Vec<Vec<f32>> {
        self.transform(signal)
            .into_iter()
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
            .collect()
    }
}

/// Periodic Hann window
pub fn hann_window(length: usize) -> Vec<f32> {
    (0..length)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / length as f32).cos()))
        .collect()
}

/// Center frequency of every non-negative FFT bin
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f32> {
    (0..=n_fft / 2)
        .map(|i| i as f32 * sample_rate as f32 / n_fft as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let window = hann_window(4);
        assert_eq!(window.len(), 4);
        assert!(window[0].abs() < 1e-6);
        assert!((window[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_frame_counts() {
        let centered = Stft::new(1024, 64, FramePadding::Center);
        assert_eq!(centered.n_frames(22050), 1 + 22050 / 64);
        assert_eq!(centered.n_frames(0), 1);

        let end = Stft::new(2048, 64, FramePadding::End);
        assert_eq!(end.n_frames(16000), 250);
        assert_eq!(end.n_frames(16001), 251);
        assert_eq!(end.n_frames(0), 0);
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let sample_rate = 16000;
        let n_fft = 512;
        // Exactly bin 32
        let freq = 32.0 * sample_rate as f32 / n_fft as f32;
        let signal: Vec<f32> = (0..4096)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();

        let stft = Stft::new(n_fft, 128, FramePadding::Center);
        let power = stft.power(&signal);
        assert_eq!(power[0].len(), 257);

        let frame = &power[power.len() / 2];
        let peak = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 32);
    }

    #[test]
    fn test_silence_is_zero() {
        let stft = Stft::new(256, 64, FramePadding::End);
        let mag = stft.magnitude(&vec![0.0; 1000]);
        assert_eq!(mag.len(), 16);
        assert!(mag.iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn test_fft_frequencies() {
        let freqs = fft_frequencies(16000, 2048);
        assert_eq!(freqs.len(), 1025);
        assert_eq!(freqs[0], 0.0);
        assert_eq!(freqs[1024], 8000.0);
    }
}
