//! Encoder Module
//!
//! The complete-record stage only needs `encode`: partial records in,
//! scaled features and a latent sequence out. Models sit behind the
//! [`Encoder`] trait; the ONNX-backed implementation is behind the `onnx`
//! cargo feature.

pub mod checkpoint;
pub mod preprocess;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use checkpoint::{EncoderGraph, OperativeConfig, RestoredModel, restore};
pub use preprocess::{Preprocessor, hz_to_midi};
#[cfg(feature = "onnx")]
pub use onnx::OnnxEncoder;

use std::path::Path;
use crate::config::Config;
use crate::error::Result;
use crate::record::PartialRecord;

/// Model outputs for one record of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderOutput {
    pub f0_scaled: Vec<f32>,
    pub ld_scaled: Vec<f32>,
    /// Latent sequence flattened row-major
    pub z: Vec<f32>,
}

pub trait Encoder {
    /// Inference only; returns one output per input record, in order
    fn encode(&mut self, batch: &[PartialRecord]) -> Result<Vec<EncoderOutput>>;
}

impl<E: Encoder + ?Sized> Encoder for Box<E> {
    fn encode(&mut self, batch: &[PartialRecord]) -> Result<Vec<EncoderOutput>> {
        (**self).encode(batch)
    }
}

impl<E: Encoder + ?Sized> Encoder for &mut E {
    fn encode(&mut self, batch: &[PartialRecord]) -> Result<Vec<EncoderOutput>> {
        (**self).encode(batch)
    }
}

/// Restore the newest model exported into `split_dir`
#[cfg(feature = "onnx")]
pub fn load_encoder(config: &Config, split_dir: &Path) -> Result<Box<dyn Encoder>> {
    let restored = restore(split_dir)?;
    log::info!("Restoring checkpoint {} (step {})", restored.checkpoint.display(), restored.step);
    Ok(Box::new(OnnxEncoder::new(&restored, config.encoder.inference_threads)?))
}

#[cfg(not(feature = "onnx"))]
pub fn load_encoder(_config: &Config, split_dir: &Path) -> Result<Box<dyn Encoder>> {
    let restored = restore(split_dir)?;
    Err(crate::error::PrepError::model(format!(
        "Checkpoint {} needs the ONNX encoder; rebuild with `--features onnx`",
        restored.checkpoint.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Encoder for Echo {
        fn encode(&mut self, batch: &[PartialRecord]) -> Result<Vec<EncoderOutput>> {
            Ok(batch
                .iter()
                .map(|r| EncoderOutput { f0_scaled: r.f0_hz.clone(), ld_scaled: r.loudness_db.clone(), z: vec![] })
                .collect())
        }
    }

    #[test]
    fn test_boxed_encoder_delegates() {
        let mut boxed: Box<dyn Encoder> = Box::new(Echo);
        let record = PartialRecord {
            sample_name: "x".into(),
            note_number: 1,
            velocity: 2,
            instrument_source: 0,
            qualities: vec![],
            audio: vec![],
            f0_hz: vec![1.0],
            f0_confidence: vec![1.0],
            loudness_db: vec![-3.0],
        };
        let out = boxed.encode(std::slice::from_ref(&record)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ld_scaled, vec![-3.0]);
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_load_without_onnx_feature_reports_model_error() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("ckpt-3.onnx"), b"").unwrap();
        let err = load_encoder(&Config::default(), dir.path()).err().unwrap();
        assert!(err.to_string().contains("onnx"));
    }
}
