//! WAV audio file reading and writing

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use hound::{SampleFormat, WavReader, WavWriter};
use ndarray::{Array1, Array2, Axis};
use crate::error::{PrepError, Result};

/// Sample encoding of a WAV file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// Signed integer PCM with the given bit depth
    Int(u16),
    Float32,
}

impl AudioFormat {
    pub fn name(&self) -> String {
        match self {
            AudioFormat::Int(bits) => format!("int{}", bits),
            AudioFormat::Float32 => "float32".to_string(),
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        match self {
            AudioFormat::Int(bits) => *bits,
            AudioFormat::Float32 => 32,
        }
    }

    /// Largest representable integer value, used to map PCM onto [-1, 1]
    pub fn max_value(&self) -> f32 {
        match self {
            AudioFormat::Int(bits) => ((1i64 << (bits - 1)) - 1) as f32,
            AudioFormat::Float32 => 1.0,
        }
    }

    pub fn to_sample_format(self) -> SampleFormat {
        match self {
            AudioFormat::Int(_) => SampleFormat::Int,
            AudioFormat::Float32 => SampleFormat::Float,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioHeader {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: AudioFormat,
    pub total_samples: u32,
    pub duration: f64,
}

impl AudioHeader {
    pub fn new(sample_rate: u32, channels: u16, format: AudioFormat, total_samples: u32) -> Self {
        let duration = if sample_rate == 0 { 0.0 } else { total_samples as f64 / sample_rate as f64 };

        Self {
            sample_rate,
            channels,
            format,
            total_samples,
            duration,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(PrepError::audio("Sample rate cannot be 0"));
        }

        if self.channels == 0 {
            return Err(PrepError::audio("Channel count cannot be 0"));
        }

        Ok(())
    }

    pub fn to_wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.format.bits_per_sample(),
            sample_format: self.format.to_sample_format(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WavAudio {
    pub header: AudioHeader,
    pub data: AudioData,
}

#[derive(Debug, Clone)]
pub enum AudioData {
    Mono(Array1<f32>),
    /// Shape `(frames, channels)`
    MultiChannel(Array2<f32>),
}

impl AudioData {
    pub fn len(&self) -> usize {
        match self {
            AudioData::Mono(data) => data.len(),
            AudioData::MultiChannel(data) => data.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channels(&self) -> u16 {
        match self {
            AudioData::Mono(_) => 1,
            AudioData::MultiChannel(data) => data.ncols() as u16,
        }
    }

    /// Average all channels into one
    pub fn to_mono(&self) -> Array1<f32> {
        match self {
            AudioData::Mono(data) => data.clone(),
            AudioData::MultiChannel(data) => data
                .mean_axis(Axis(1))
                .unwrap_or_else(|| Array1::zeros(0)),
        }
    }
}

impl WavAudio {
    /// Decode a WAV file into normalized f32 samples
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path)
            .map_err(|e| PrepError::audio(format!("Cannot open audio file {}: {}", path.display(), e)))?;

        let reader = WavReader::new(BufReader::new(file))
            .map_err(|e| PrepError::audio(format!("Cannot read WAV file {}: {}", path.display(), e)))?;

        Self::from_reader(reader)
    }

    fn from_reader<R: std::io::Read>(mut reader: WavReader<R>) -> Result<Self> {
        let spec = reader.spec();

        let format = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, bits @ 8..=32) => AudioFormat::Int(bits),
            (SampleFormat::Float, 32) => AudioFormat::Float32,
            (sample_format, bits) => {
                return Err(PrepError::audio(format!(
                    "Unsupported sample format: {:?} at {} bits", sample_format, bits
                )));
            }
        };

        let header = AudioHeader::new(
            spec.sample_rate,
            spec.channels,
            format,
            reader.duration(),
        );
        header.validate()?;

        let samples: Vec<f32> = match format {
            AudioFormat::Int(_) => {
                let scale = format.max_value();
                reader.samples::<i32>()
                    .map(|sample| sample.map(|s| s as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| PrepError::audio(format!("Failed to read sample: {}", e)))?
            }
            AudioFormat::Float32 => {
                reader.samples::<f32>()
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| PrepError::audio(format!("Failed to read sample: {}", e)))?
            }
        };

        let channels = spec.channels as usize;
        let data = if channels == 1 {
            AudioData::Mono(Array1::from(samples))
        } else {
            // Interleaved frames; a trailing partial frame is dropped
            let frames = samples.len() / channels;
            let mut samples = samples;
            samples.truncate(frames * channels);
            let interleaved = Array2::from_shape_vec((frames, channels), samples)
                .map_err(|e| PrepError::audio(format!("Malformed {}-channel data: {}", channels, e)))?;
            AudioData::MultiChannel(interleaved)
        };

        Ok(WavAudio { header, data })
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let spec = self.header.to_wav_spec();
        let mut writer = WavWriter::create(path, spec)
            .map_err(|e| PrepError::audio(format!("Cannot create output file {}: {}", path.display(), e)))?;

        let interleaved: Vec<f32> = match &self.data {
            AudioData::Mono(data) => data.to_vec(),
            AudioData::MultiChannel(data) => data.iter().copied().collect(),
        };

        for sample in interleaved {
            let clamped = sample.clamp(-1.0, 1.0);
            match self.header.format {
                AudioFormat::Float32 => writer.write_sample(clamped)?,
                AudioFormat::Int(_) => {
                    let scaled = (clamped * self.header.format.max_value()).round() as i32;
                    writer.write_sample(scaled)?
                }
            }
        }

        writer.finalize()?;
        Ok(())
    }

    pub fn new_mono(sample_rate: u32, data: Array1<f32>, format: AudioFormat) -> Self {
        let header = AudioHeader::new(sample_rate, 1, format, data.len() as u32);
        WavAudio { header, data: AudioData::Mono(data) }
    }

    /// `data` is laid out `(frames, channels)`
    pub fn new_multichannel(sample_rate: u32, data: Array2<f32>, format: AudioFormat) -> Result<Self> {
        let channels = u16::try_from(data.ncols())
            .ok()
            .filter(|&c| c > 0)
            .ok_or_else(|| PrepError::audio(format!("Unsupported channel count: {}", data.ncols())))?;

        let header = AudioHeader::new(sample_rate, channels, format, data.nrows() as u32);
        Ok(WavAudio { header, data: AudioData::MultiChannel(data) })
    }

    pub fn data(&self) -> &AudioData {
        &self.data
    }

    pub fn sample_rate(&self) -> u32 {
        self.header.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.header.channels
    }

    pub fn total_samples(&self) -> u32 {
        self.header.total_samples
    }

    pub fn duration(&self) -> f64 {
        self.header.duration
    }

    pub fn format(&self) -> AudioFormat {
        self.header.format
    }

    /// Collapse to a single channel in place
    pub fn mix_to_mono(&mut self) {
        if self.channels() > 1 {
            self.data = AudioData::Mono(self.data.to_mono());
            self.header.channels = 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_audio_format() {
        assert_eq!(AudioFormat::Int(16).name(), "int16");
        assert_eq!(AudioFormat::Int(16).max_value(), 32767.0);
        assert_eq!(AudioFormat::Int(8).max_value(), 127.0);
        assert_eq!(AudioFormat::Int(32).max_value(), 2147483647.0);
        assert_eq!(AudioFormat::Float32.name(), "float32");
        assert_eq!(AudioFormat::Float32.bits_per_sample(), 32);
    }

    #[test]
    fn test_audio_header_validation() {
        let header = AudioHeader::new(16000, 1, AudioFormat::Float32, 1000);
        assert!(header.validate().is_ok());
        assert!((header.duration - 0.0625).abs() < f64::EPSILON);

        assert!(AudioHeader::new(0, 1, AudioFormat::Float32, 1000).validate().is_err());
        assert!(AudioHeader::new(16000, 6, AudioFormat::Float32, 1000).validate().is_ok());
        assert!(AudioHeader::new(16000, 0, AudioFormat::Float32, 1000).validate().is_err());
    }

    #[test]
    fn test_stereo_to_mono_averages() {
        let stereo = AudioData::MultiChannel(Array2::from(vec![[0.2, 0.4], [-1.0, 1.0]]));
        let mono = stereo.to_mono();
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!(mono[1].abs() < 1e-6);
    }

    #[test]
    fn test_empty_channel_layout_rejected() {
        let data = Array2::<f32>::zeros((10, 0));
        assert!(WavAudio::new_multichannel(16000, data, AudioFormat::Float32).is_err());
    }

    #[test]
    fn test_int16_normalized_by_format_max() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("full_scale.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for s in [i16::MAX, 0, -16384] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let audio = WavAudio::from_file(&path).unwrap();
        assert_eq!(audio.format(), AudioFormat::Int(16));
        match audio.data() {
            AudioData::Mono(data) => {
                assert_eq!(data[0], 1.0);
                assert_eq!(data[1], 0.0);
                assert!((data[2] - (-16384.0 / 32767.0)).abs() < 1e-7);
            }
            _ => panic!("Expected mono data"),
        }
    }

    #[test]
    fn test_stereo_file_mixes_to_mono() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");

        let data = Array2::from(vec![[0.5, 0.5], [0.25, -0.25], [1.0, 0.0]]);
        WavAudio::new_multichannel(8000, data, AudioFormat::Float32).unwrap()
            .save_to_file(&path).unwrap();

        let mut audio = WavAudio::from_file(&path).unwrap();
        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.total_samples(), 3);

        audio.mix_to_mono();
        assert_eq!(audio.channels(), 1);
        match audio.data() {
            AudioData::Mono(mono) => assert_eq!(mono.to_vec(), vec![0.5, 0.0, 0.5]),
            _ => panic!("Expected mono data"),
        }
    }

    #[test]
    fn test_four_channel_file_mixes_to_mono() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quad.wav");

        let spec = hound::WavSpec {
            channels: 4,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..8000 {
            for s in [8192i16, -8192, 16384, 0] {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();

        let mut audio = WavAudio::from_file(&path).unwrap();
        assert_eq!(audio.channels(), 4);
        assert_eq!(audio.total_samples(), 8000);
        assert!((audio.duration() - 0.5).abs() < 1e-9);

        audio.mix_to_mono();
        match audio.data() {
            AudioData::Mono(mono) => {
                assert_eq!(mono.len(), 8000);
                assert!((mono[0] - 4096.0 / 32767.0).abs() < 1e-6);
            }
            _ => panic!("Expected mono data"),
        }
    }

    #[test]
    fn test_unreadable_file_is_audio_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"definitely not RIFF").unwrap();

        let err = WavAudio::from_file(&path).unwrap_err();
        assert!(matches!(err, PrepError::Audio { .. }));
    }
}
