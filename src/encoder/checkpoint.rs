//! Locating the newest exported model and its operative configuration
//!
//! A trained split directory holds `ckpt-{step}.onnx` exports and
//! `operative_config-{step}.toml` files. The highest step wins.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{PrepError, Result};
use super::preprocess::Preprocessor;

const CHECKPOINT_PREFIX: &str = "ckpt-";
const CHECKPOINT_EXT: &str = "onnx";
const OPERATIVE_CONFIG_PREFIX: &str = "operative_config-";
const OPERATIVE_CONFIG_EXT: &str = "toml";

/// Settings the model was trained with; unknown keys are skipped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperativeConfig {
    pub preprocessor: Preprocessor,
    pub encoder: EncoderGraph,
}

/// Tensor names of the exported encoder graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderGraph {
    pub audio_input: String,
    pub z_output: String,
}

impl Default for EncoderGraph {
    fn default() -> Self {
        Self {
            audio_input: "audio".to_string(),
            z_output: "z".to_string(),
        }
    }
}

impl OperativeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PrepError::config(format!("Cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| PrepError::config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

/// Everything needed to rebuild the encoder of a split
#[derive(Debug, Clone)]
pub struct RestoredModel {
    pub checkpoint: PathBuf,
    pub step: u64,
    pub operative_config: OperativeConfig,
    pub operative_config_path: Option<PathBuf>,
}

/// Find the latest checkpoint and, when present, the latest operative config
pub fn restore<P: AsRef<Path>>(split_dir: P) -> Result<RestoredModel> {
    let split_dir = split_dir.as_ref();

    let (step, checkpoint) = latest_checkpoint(split_dir)?.ok_or_else(|| {
        PrepError::model(format!(
            "No {}<step>.{} checkpoint in {}", CHECKPOINT_PREFIX, CHECKPOINT_EXT, split_dir.display()
        ))
    })?;

    let operative_config_path = latest_operative_config(split_dir)?;
    let operative_config = match &operative_config_path {
        Some(path) => {
            log::info!("Using operative config {}", path.display());
            OperativeConfig::from_file(path)?
        }
        None => {
            log::warn!("No operative config in {}, using defaults", split_dir.display());
            OperativeConfig::default()
        }
    };

    Ok(RestoredModel { checkpoint, step, operative_config, operative_config_path })
}

pub fn latest_checkpoint(dir: &Path) -> Result<Option<(u64, PathBuf)>> {
    latest_by_step(dir, CHECKPOINT_PREFIX, CHECKPOINT_EXT)
}

pub fn latest_operative_config(dir: &Path) -> Result<Option<PathBuf>> {
    Ok(latest_by_step(dir, OPERATIVE_CONFIG_PREFIX, OPERATIVE_CONFIG_EXT)?.map(|(_, path)| path))
}

fn latest_by_step(dir: &Path, prefix: &str, ext: &str) -> Result<Option<(u64, PathBuf)>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| PrepError::model(format!("Cannot list {}: {}", dir.display(), e)))?;

    let mut best: Option<(u64, PathBuf)> = None;
    for entry in entries {
        let path = entry?.path();
        let Some(step) = parse_step(&path, prefix, ext) else { continue };
        if best.as_ref().is_none_or(|(best_step, _)| step > *best_step) {
            best = Some((step, path));
        }
    }
    Ok(best)
}

/// `{prefix}{digits}.{ext}` -> digits
fn parse_step(path: &Path, prefix: &str, ext: &str) -> Option<u64> {
    if path.extension()?.to_str()? != ext {
        return None;
    }
    path.file_stem()?.to_str()?.strip_prefix(prefix)?.parse().ok()
}
