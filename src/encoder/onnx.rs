//! ONNX Runtime encoder
//!
//! Runs an exported encoder graph on batches of partial records. The graph
//! takes one `[batch, samples]` f32 audio tensor and produces a
//! `[batch, frames, z_dims]` latent tensor; f0 and loudness scaling are
//! computed on the host with the restored preprocessor.

use std::path::Path;
use ndarray::{Array2, Axis};
use onnxruntime::{
    GraphOptimizationLevel, LoggingLevel,
    environment::Environment,
    session::Session,
    tensor::OrtOwnedTensor,
};
use crate::error::{PrepError, Result};
use crate::record::PartialRecord;
use super::checkpoint::{EncoderGraph, RestoredModel};
use super::preprocess::Preprocessor;
use super::{Encoder, EncoderOutput};

pub struct OnnxEncoder {
    session: Session<'static>,
    graph: EncoderGraph,
    preprocessor: Preprocessor,
    z_index: usize,
}

impl std::fmt::Debug for OnnxEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEncoder")
            .field("graph", &self.graph)
            .field("preprocessor", &self.preprocessor)
            .field("z_index", &self.z_index)
            .finish()
    }
}

impl OnnxEncoder {
    pub fn new(restored: &RestoredModel, inference_threads: usize) -> Result<Self> {
        let model_path = restored.checkpoint.as_path();
        if !model_path.exists() {
            return Err(PrepError::model(format!("Checkpoint does not exist: {}", model_path.display())));
        }

        // Session borrows both for its whole life; one encoder lives per run
        let environment: &'static Environment = Box::leak(Box::new(
            Environment::builder()
                .with_name("ddsp-dataprep")
                .with_log_level(LoggingLevel::Warning)
                .build()?,
        ));
        let model_path: &'static Path = Box::leak(model_path.to_path_buf().into_boxed_path());

        let session = environment
            .new_session_builder()?
            .with_optimization_level(GraphOptimizationLevel::All)?
            .with_number_threads(inference_threads.clamp(1, i16::MAX as usize) as i16)?
            .with_model_from_file(model_path)?;

        let input_names: Vec<&str> = session.inputs.iter().map(|i| i.name.as_str()).collect();
        let output_names: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        log::info!("Encoder inputs: {:?}", input_names);
        log::info!("Encoder outputs: {:?}", output_names);

        let graph = restored.operative_config.encoder.clone();
        if input_names != [graph.audio_input.as_str()] {
            return Err(PrepError::model(format!(
                "Encoder must take the single input '{}', found {:?}", graph.audio_input, input_names
            )));
        }
        let z_index = output_names
            .iter()
            .position(|name| *name == graph.z_output)
            .ok_or_else(|| PrepError::model(format!("Encoder has no output '{}'", graph.z_output)))?;

        Ok(Self {
            session,
            graph,
            preprocessor: restored.operative_config.preprocessor,
            z_index,
        })
    }
}

impl Encoder for OnnxEncoder {
    fn encode(&mut self, batch: &[PartialRecord]) -> Result<Vec<EncoderOutput>> {
        let Some(first) = batch.first() else { return Ok(Vec::new()) };
        let n_samples = first.audio.len();

        let mut flat = Vec::with_capacity(batch.len() * n_samples);
        for record in batch {
            if record.audio.len() != n_samples {
                return Err(PrepError::model(format!(
                    "Ragged batch: '{}' has {} samples, expected {}",
                    record.sample_name, record.audio.len(), n_samples
                )));
            }
            flat.extend_from_slice(&record.audio);
        }
        let input = Array2::from_shape_vec((batch.len(), n_samples), flat)
            .map_err(|e| PrepError::model(format!("Input tensor shape: {}", e)))?;

        log::debug!("Encoding batch of {} ({} samples each)", batch.len(), n_samples);
        let outputs: Vec<OrtOwnedTensor<f32, _>> = self.session.run(vec![input])?;
        let z = outputs
            .get(self.z_index)
            .ok_or_else(|| PrepError::model(format!("Missing output '{}'", self.graph.z_output)))?;

        if z.ndim() == 0 || z.shape()[0] != batch.len() {
            return Err(PrepError::model(format!(
                "Output '{}' has shape {:?}, expected leading dimension {}",
                self.graph.z_output, z.shape(), batch.len()
            )));
        }

        Ok(batch
            .iter()
            .zip(z.axis_iter(Axis(0)))
            .map(|(record, latent)| EncoderOutput {
                f0_scaled: self.preprocessor.scale_f0(&record.f0_hz),
                ld_scaled: self.preprocessor.scale_db(&record.loudness_db),
                z: latent.iter().copied().collect(),
            })
            .collect())
    }
}
