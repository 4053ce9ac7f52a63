//! Configuration management for dataset preparation

use crate::error::{PrepError, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "examples.json";
pub const AUDIO_DIR: &str = "audio";
pub const PARTIAL_FILE: &str = "partial.tfrecord";
pub const COMPLETE_FILE: &str = "complete.tfrecord";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub features: FeatureConfig,
    pub spectrogram: SpectrogramConfig,
    pub encoder: EncoderConfig,
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub dataset_dir: PathBuf,
    pub split: String,
    pub sample_rate: u32,
    pub frame_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub loudness_n_fft: usize,
    pub ref_db: f32,
    pub range_db: f32,
    pub f0_min_hz: f32,
    pub f0_max_hz: f32,
    pub f0_frame_size: usize,
    pub yin_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    pub dir: PathBuf,
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub top_db: f32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub batch_size: usize,
    pub example_secs: f32,
    pub inference_threads: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub error_policy: ErrorPolicy,
    pub verbose: bool,
}

/// What a stage does when one item fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Stop the run at the first failure
    #[default]
    Abort,
    /// Skip the failed item and report it at the end
    Collect,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("nsynth_guitar"),
            split: "train".to_string(),
            sample_rate: 16000,
            frame_rate: 250,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            loudness_n_fft: 2048,
            ref_db: 20.7,
            range_db: 80.0,
            f0_min_hz: 32.70,
            f0_max_hz: 1975.5,
            f0_frame_size: 1024,
            yin_threshold: 0.15,
        }
    }
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("static"),
            sample_rate: 22050,
            n_fft: 1024,
            hop_length: 64,
            n_mels: 256,
            top_db: 80.0,
            width: 400,
            height: 300,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            example_secs: 4.0,
            inference_threads: num_cpus::get().min(4),
        }
    }
}

impl Config {
    /// `{dataset_dir}/{split}`
    pub fn split_dir(&self) -> PathBuf {
        self.dataset.dataset_dir.join(&self.dataset.split)
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.split_dir().join(AUDIO_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.split_dir().join(MANIFEST_FILE)
    }

    pub fn partial_path(&self) -> PathBuf {
        self.split_dir().join(PARTIAL_FILE)
    }

    pub fn complete_path(&self) -> PathBuf {
        self.split_dir().join(COMPLETE_FILE)
    }

    pub fn sample_rate(&self) -> u32 {
        self.dataset.sample_rate
    }

    pub fn frame_rate(&self) -> u32 {
        self.dataset.frame_rate
    }

    /// Samples between two analysis frames
    pub fn hop_size(&self) -> usize {
        (self.dataset.sample_rate / self.dataset.frame_rate) as usize
    }

    pub fn verbose(&self) -> bool {
        self.processing.verbose
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.processing.error_policy
    }

    /// Create config from command line arguments and an optional config file
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = if let Some(config_path) = &args.config_file {
            Self::from_file(config_path)?
        } else {
            Self::default()
        };

        // Command line arguments override config file settings
        config.processing.verbose |= args.verbose;
        if args.keep_going {
            config.processing.error_policy = ErrorPolicy::Collect;
        }

        match &args.command {
            Command::Spectrograms(spec) => {
                if let Some(dir) = &spec.dir {
                    config.spectrogram.dir = dir.clone();
                }
            }
            Command::Partial(dataset) | Command::Complete(dataset) | Command::Prepare(dataset) => {
                dataset.apply(&mut config);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load config from TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PrepError::config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| PrepError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Save config to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PrepError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| PrepError::config(format!("Failed to write config file: {}", e)))
    }

    /// Validate configuration parameter validity
    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [
            ("Sample rate", self.dataset.sample_rate),
            ("Spectrogram sample rate", self.spectrogram.sample_rate),
        ] {
            if rate == 0 {
                return Err(PrepError::config(format!("{} must be greater than 0", name)));
            }
            if rate > 192000 {
                return Err(PrepError::config(format!("{} cannot exceed 192000 Hz", name)));
            }
        }

        if self.dataset.frame_rate == 0 || self.dataset.frame_rate > self.dataset.sample_rate {
            return Err(PrepError::config("Frame rate must be in range (0, sample_rate]"));
        }
        if self.dataset.sample_rate % self.dataset.frame_rate != 0 {
            return Err(PrepError::config(format!(
                "Frame rate {} must divide sample rate {}",
                self.dataset.frame_rate, self.dataset.sample_rate
            )));
        }
        if self.dataset.split.is_empty() {
            return Err(PrepError::config("Split name cannot be empty"));
        }

        if self.features.loudness_n_fft == 0 || self.features.f0_frame_size < 4 {
            return Err(PrepError::config("Feature frame sizes must be positive"));
        }
        if self.features.range_db <= 0.0 {
            return Err(PrepError::config("Loudness range must be greater than 0 dB"));
        }
        if !(self.features.f0_min_hz > 0.0 && self.features.f0_min_hz < self.features.f0_max_hz) {
            return Err(PrepError::config("f0 range must satisfy 0 < min < max"));
        }
        if !(0.0..1.0).contains(&self.features.yin_threshold) {
            return Err(PrepError::config("YIN threshold must be in range [0.0, 1.0)"));
        }

        let spec = &self.spectrogram;
        if spec.n_fft == 0 || spec.n_mels == 0 {
            return Err(PrepError::config("Spectrogram FFT size and mel band count must be greater than 0"));
        }
        if spec.hop_length == 0 || spec.hop_length > spec.n_fft {
            return Err(PrepError::config("Hop length must be in range (0, n_fft]"));
        }
        if spec.width == 0 || spec.height == 0 {
            return Err(PrepError::config("Image size must be greater than 0"));
        }

        if self.encoder.batch_size == 0 {
            return Err(PrepError::config("Batch size must be greater than 0"));
        }
        if self.encoder.example_secs <= 0.0 {
            return Err(PrepError::config("Example length must be greater than 0 seconds"));
        }
        if self.encoder.inference_threads == 0 {
            return Err(PrepError::config("Inference thread count must be greater than 0"));
        }
        if self.encoder.inference_threads > num_cpus::get() * 2 {
            return Err(PrepError::config("Inference thread count cannot exceed 2x logical CPU cores"));
        }

        Ok(())
    }

    /// Create default config file
    pub fn create_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::default().save_to_file(path)
    }
}

#[derive(Debug, Parser)]
#[command(name = "ddsp-dataprep", about = "Spectrogram and TFRecord preparation for DDSP", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short = 'c', long = "config", global = true, help = "Config file path (TOML format)")]
    pub config_file: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose", global = true, help = "Enable verbose output mode")]
    pub verbose: bool,

    #[arg(long = "keep-going", global = true, help = "Skip failed items instead of aborting the run")]
    pub keep_going: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a mel-spectrogram PNG next to every WAV file in a directory
    Spectrograms(SpectrogramArgs),
    /// Build partial.tfrecord from audio files and examples.json
    Partial(DatasetArgs),
    /// Build complete.tfrecord by encoding partial.tfrecord
    Complete(DatasetArgs),
    /// Run the partial and complete stages back to back
    Prepare(DatasetArgs),
}

#[derive(Debug, Clone, ClapArgs)]
pub struct SpectrogramArgs {
    #[arg(short = 'd', long = "dir", help = "Directory with WAV files [default: static]")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct DatasetArgs {
    #[arg(short = 'd', long = "dataset-dir", help = "Dataset root directory [default: nsynth_guitar]")]
    pub dataset_dir: Option<PathBuf>,

    #[arg(short = 's', long = "split", help = "Split name under the dataset root [default: train]")]
    pub split: Option<String>,

    #[arg(short = 'r', long = "sample-rate", help = "Target audio sample rate in Hz [default: 16000]")]
    pub sample_rate: Option<u32>,

    #[arg(short = 'f', long = "frame-rate", help = "Feature frame rate in Hz [default: 250]")]
    pub frame_rate: Option<u32>,
}

impl DatasetArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.dataset_dir {
            config.dataset.dataset_dir = dir.clone();
        }
        if let Some(split) = &self.split {
            config.dataset.split = split.clone();
        }
        if let Some(sample_rate) = self.sample_rate {
            config.dataset.sample_rate = sample_rate;
        }
        if let Some(frame_rate) = self.frame_rate {
            config.dataset.frame_rate = frame_rate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sample_rate(), 16000);
        assert_eq!(config.frame_rate(), 250);
        assert_eq!(config.hop_size(), 64);
        assert_eq!(config.spectrogram.n_fft, 1024);
        assert_eq!(config.spectrogram.hop_length, 64);
        assert_eq!(config.spectrogram.n_mels, 256);
        assert_eq!(config.encoder.batch_size, 1);
        assert_eq!(config.error_policy(), ErrorPolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_paths() {
        let config = Config::default();
        assert_eq!(config.split_dir(), PathBuf::from("nsynth_guitar/train"));
        assert_eq!(config.audio_dir(), PathBuf::from("nsynth_guitar/train/audio"));
        assert_eq!(config.manifest_path(), PathBuf::from("nsynth_guitar/train/examples.json"));
        assert_eq!(config.partial_path(), PathBuf::from("nsynth_guitar/train/partial.tfrecord"));
        assert_eq!(config.complete_path(), PathBuf::from("nsynth_guitar/train/complete.tfrecord"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.dataset.sample_rate = 0;
        assert!(config.validate().is_err());
        config.dataset.sample_rate = 16000;

        config.dataset.frame_rate = 300;
        assert!(config.validate().is_err());
        config.dataset.frame_rate = 250;

        config.spectrogram.hop_length = 2048;
        assert!(config.validate().is_err());
        config.spectrogram.hop_length = 64;

        config.encoder.batch_size = 0;
        assert!(config.validate().is_err());
        config.encoder.batch_size = 1;

        config.features.f0_min_hz = 3000.0;
        assert!(config.validate().is_err());
        config.features.f0_min_hz = 32.70;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.dataset.split = "valid".to_string();
        config.processing.error_policy = ErrorPolicy::Collect;

        assert!(config.save_to_file(&config_path).is_ok());
        assert!(config_path.exists());

        let loaded = Config::from_file(&config_path).unwrap();
        assert_eq!(loaded.dataset.split, "valid");
        assert_eq!(loaded.error_policy(), ErrorPolicy::Collect);
        assert_eq!(loaded.spectrogram.n_mels, config.spectrogram.n_mels);
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "[dataset]\nsplit = \"test\"\n").unwrap();

        let config = Config::from_file(&config_path).unwrap();
        assert_eq!(config.dataset.split, "test");
        assert_eq!(config.sample_rate(), 16000);
        assert_eq!(config.features.loudness_n_fft, 2048);
    }

    #[test]
    fn test_args_override() {
        let args = Args::parse_from([
            "ddsp-dataprep", "--keep-going", "partial", "--split", "valid", "--sample-rate", "8000",
        ]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.dataset.split, "valid");
        assert_eq!(config.sample_rate(), 8000);
        assert_eq!(config.frame_rate(), 250);
        assert_eq!(config.error_policy(), ErrorPolicy::Collect);
    }
}
