//! ddsp-dataprep - Dataset Preparation for DDSP Timbre Transfer
//!
//! Renders mel-spectrogram previews of WAV files and builds the two
//! TFRecord datasets used to train and evaluate DDSP autoencoders: partial
//! records (audio, f0, loudness) and complete records (plus encoder outputs).

pub mod audio;
pub mod config;
pub mod dsp;
pub mod encoder;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod record;
pub mod spectrogram;

pub use config::{Args, Command, Config, ErrorPolicy};
pub use error::{PrepError, Result};
pub use pipeline::{CompleteStage, PartialStage, StageReport};
pub use spectrogram::SpectrogramGenerator;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Info by default, debug when verbose; `RUST_LOG` refines either
pub fn init_logging(verbose: bool) {
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init()
        .ok();
}

pub fn get_library_info() -> LibraryInfo {
    LibraryInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        onnx: cfg!(feature = "onnx"),
    }
}

#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Whether the ONNX encoder is compiled in
    pub onnx: bool,
}

impl std::fmt::Display for LibraryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} v{} - {}", self.name, self.version, self.description)?;
        if !self.onnx {
            write!(f, " (without ONNX encoder)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_info() {
        let info = get_library_info();
        assert_eq!(info.name, "ddsp-dataprep");
        assert!(info.to_string().contains(VERSION));
    }
}
