//! Audio Format Converter

use ndarray::{Array1, Array2};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use crate::audio::{AudioData, WavAudio};
use crate::error::{PrepError, Result};

pub struct AudioConverter;

impl AudioConverter {
    /// Convert sample rate with a windowed-sinc resampler; downsampling
    /// low-passes below the new Nyquist frequency first
    pub fn convert_sample_rate(audio: &WavAudio, target_sample_rate: u32) -> Result<WavAudio> {
        if audio.sample_rate() == target_sample_rate {
            return Ok(audio.clone());
        }
        if target_sample_rate == 0 {
            return Err(PrepError::audio("Target sample rate cannot be 0"));
        }

        let ratio = target_sample_rate as f64 / audio.sample_rate() as f64;
        let new_length = (audio.data().len() as f64 * ratio) as usize;

        let new_data = match audio.data() {
            AudioData::Mono(data) => {
                AudioData::Mono(Array1::from(Self::resample_channel(&data.to_vec(), ratio, new_length)?))
            }
            AudioData::MultiChannel(data) => {
                let mut resampled = Array2::zeros((new_length, data.ncols()));
                for (ch, column) in data.columns().into_iter().enumerate() {
                    let channel = Self::resample_channel(&column.to_vec(), ratio, new_length)?;
                    resampled.column_mut(ch).assign(&Array1::from(channel));
                }
                AudioData::MultiChannel(resampled)
            }
        };

        let mut new_audio = audio.clone();
        new_audio.header.sample_rate = target_sample_rate;
        new_audio.header.total_samples = new_length as u32;
        new_audio.header.duration = new_length as f64 / target_sample_rate as f64;
        new_audio.data = new_data;
        Ok(new_audio)
    }

    /// Resample a whole clip in one chunk, flushing the filter tail and
    /// dropping its leading delay so output sample 0 lines up with input sample 0
    fn resample_channel(data: &[f32], ratio: f64, new_length: usize) -> Result<Vec<f32>> {
        if data.is_empty() {
            return Ok(vec![0.0; new_length]);
        }

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, data.len(), 1)
            .map_err(|e| PrepError::audio(format!("Failed to create resampler: {}", e)))?;
        let delay = resampler.output_delay();

        let mut output = resampler
            .process(&[data], None)
            .map_err(|e| PrepError::audio(format!("Resampling failed: {}", e)))?
            .swap_remove(0);

        while output.len() < delay + new_length {
            let tail = resampler
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| PrepError::audio(format!("Resampling failed: {}", e)))?
                .swap_remove(0);
            if tail.is_empty() {
                break;
            }
            output.extend(tail);
        }

        let start = delay.min(output.len());
        Ok(pad_or_trim(&output[start..], new_length, 0.0))
    }
}

/// Zero-pad or truncate `data` to exactly `expected_len` samples
pub fn pad_or_trim(data: &[f32], expected_len: usize, pad_value: f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(expected_len);
    out.extend_from_slice(&data[..data.len().min(expected_len)]);
    out.resize(expected_len, pad_value);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFormat;

    #[test]
    fn test_resample_same_rate() {
        let data = Array1::from(vec![0.1, 0.2, 0.3]);
        let audio = WavAudio::new_mono(16000, data, AudioFormat::Float32);
        let result = AudioConverter::convert_sample_rate(&audio, 16000).unwrap();
        assert_eq!(result.sample_rate(), 16000);
        assert_eq!(result.data().len(), 3);
    }

    fn tone(sample_rate: u32, hz: f32, len: usize) -> Array1<f32> {
        Array1::from_shape_fn(len, |i| {
            (2.0 * std::f32::consts::PI * hz * i as f32 / sample_rate as f32).sin() * 0.5
        })
    }

    /// RMS of the middle half, away from edge ringing
    fn middle_rms(audio: &WavAudio) -> f32 {
        let AudioData::Mono(d) = audio.data() else { panic!("Expected mono data") };
        let mid = &d.as_slice().unwrap()[d.len() / 4..3 * d.len() / 4];
        (mid.iter().map(|s| s * s).sum::<f32>() / mid.len() as f32).sqrt()
    }

    #[test]
    fn test_resample_upsample_keeps_tone() {
        let audio = WavAudio::new_mono(8000, tone(8000, 220.0, 4000), AudioFormat::Float32);
        let result = AudioConverter::convert_sample_rate(&audio, 16000).unwrap();
        assert_eq!(result.sample_rate(), 16000);
        assert_eq!(result.data().len(), 8000);
        // 0.5 amplitude sine
        assert!((middle_rms(&result) - 0.3536).abs() < 0.02);
    }

    #[test]
    fn test_resample_downsample_length() {
        let data = Array1::from_elem(32000, 0.25f32);
        let audio = WavAudio::new_mono(32000, data, AudioFormat::Float32);
        let result = AudioConverter::convert_sample_rate(&audio, 16000).unwrap();
        assert_eq!(result.data().len(), 16000);
        assert!((result.duration() - 1.0).abs() < 1e-9);
        let AudioData::Mono(d) = result.data() else { panic!("Expected mono data") };
        assert!((d[8000] - 0.25).abs() < 1e-2);
    }

    #[test]
    fn test_downsample_suppresses_content_above_nyquist() {
        // 7 kHz would fold to 1 kHz at an 8 kHz output rate
        let audio = WavAudio::new_mono(32000, tone(32000, 7000.0, 16000), AudioFormat::Float32);
        let result = AudioConverter::convert_sample_rate(&audio, 8000).unwrap();
        assert_eq!(result.data().len(), 4000);
        assert!(middle_rms(&result) < 0.02);

        let audio = WavAudio::new_mono(32000, tone(32000, 440.0, 16000), AudioFormat::Float32);
        let result = AudioConverter::convert_sample_rate(&audio, 8000).unwrap();
        assert!(middle_rms(&result) > 0.3);
    }

    #[test]
    fn test_resample_multichannel() {
        let data = Array2::from_shape_fn((3200, 3), |(_, ch)| 0.1 * (ch as f32 + 1.0));
        let audio = WavAudio::new_multichannel(16000, data, AudioFormat::Float32).unwrap();
        let result = AudioConverter::convert_sample_rate(&audio, 8000).unwrap();
        assert_eq!(result.channels(), 3);
        assert_eq!(result.data().len(), 1600);
    }

    #[test]
    fn test_pad_or_trim() {
        assert_eq!(pad_or_trim(&[1.0, 2.0], 4, 0.0), vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(pad_or_trim(&[1.0, 2.0, 3.0], 2, 0.0), vec![1.0, 2.0]);
        assert_eq!(pad_or_trim(&[], 2, -80.0), vec![-80.0, -80.0]);
    }
}
