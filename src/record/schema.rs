//! Typed views of the partial and complete dataset records

use crate::dsp::AudioFeatures;
use crate::error::{PrepError, Result};
use crate::manifest::ManifestEntry;
use super::example::{Example, Feature};

/// Feature names as they appear in the serialized examples
pub mod fields {
    pub const SAMPLE_NAME: &str = "sample_name";
    pub const NOTE_NUMBER: &str = "note_number";
    pub const VELOCITY: &str = "velocity";
    pub const INSTRUMENT_SOURCE: &str = "instrument_source";
    pub const QUALITIES: &str = "qualities";
    pub const AUDIO: &str = "audio";
    pub const F0_HZ: &str = "f0_hz";
    pub const F0_CONFIDENCE: &str = "f0_confidence";
    pub const LOUDNESS_DB: &str = "loudness_db";
    pub const F0_SCALED: &str = "f0_scaled";
    pub const LD_SCALED: &str = "ld_scaled";
    pub const Z: &str = "z";
}

/// One sample with its manifest metadata and frame-rate features
#[derive(Debug, Clone, PartialEq)]
pub struct PartialRecord {
    pub sample_name: String,
    pub note_number: i64,
    pub velocity: i64,
    pub instrument_source: i64,
    pub qualities: Vec<i64>,
    pub audio: Vec<f32>,
    pub f0_hz: Vec<f32>,
    pub f0_confidence: Vec<f32>,
    pub loudness_db: Vec<f32>,
}

/// A partial record extended with encoder outputs
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteRecord {
    pub base: PartialRecord,
    pub f0_scaled: Vec<f32>,
    pub ld_scaled: Vec<f32>,
    /// Latent sequence flattened row-major
    pub z: Vec<f32>,
}

impl PartialRecord {
    pub fn new(sample_name: &str, entry: &ManifestEntry, audio: Vec<f32>, features: AudioFeatures) -> Self {
        Self {
            sample_name: sample_name.to_string(),
            note_number: entry.pitch,
            velocity: entry.velocity,
            instrument_source: entry.instrument_source,
            qualities: entry.qualities.clone(),
            audio,
            f0_hz: features.f0_hz,
            f0_confidence: features.f0_confidence,
            loudness_db: features.loudness_db,
        }
    }

    pub fn to_example(&self) -> Example {
        let mut example = Example::new();
        self.fill_example(&mut example);
        example
    }

    fn fill_example(&self, example: &mut Example) {
        example.insert(fields::SAMPLE_NAME, Feature::bytes([self.sample_name.as_bytes().to_vec()]));
        example.insert(fields::NOTE_NUMBER, Feature::int64s(vec![self.note_number]));
        example.insert(fields::VELOCITY, Feature::int64s(vec![self.velocity]));
        example.insert(fields::INSTRUMENT_SOURCE, Feature::int64s(vec![self.instrument_source]));
        example.insert(fields::QUALITIES, Feature::int64s(self.qualities.clone()));
        example.insert(fields::AUDIO, Feature::floats(self.audio.clone()));
        example.insert(fields::F0_HZ, Feature::floats(self.f0_hz.clone()));
        example.insert(fields::F0_CONFIDENCE, Feature::floats(self.f0_confidence.clone()));
        example.insert(fields::LOUDNESS_DB, Feature::floats(self.loudness_db.clone()));
    }

    pub fn from_example(example: &Example) -> Result<Self> {
        let sample_name = String::from_utf8(example.bytes(fields::SAMPLE_NAME)?.to_vec())
            .map_err(|e| PrepError::record(format!("sample_name is not UTF-8: {}", e)))?;

        Ok(Self {
            sample_name,
            note_number: example.int64(fields::NOTE_NUMBER)?,
            velocity: example.int64(fields::VELOCITY)?,
            instrument_source: example.int64(fields::INSTRUMENT_SOURCE)?,
            qualities: example.int64_list(fields::QUALITIES)?.to_vec(),
            audio: example.float_list(fields::AUDIO)?.to_vec(),
            f0_hz: example.float_list(fields::F0_HZ)?.to_vec(),
            f0_confidence: example.float_list(fields::F0_CONFIDENCE)?.to_vec(),
            loudness_db: example.float_list(fields::LOUDNESS_DB)?.to_vec(),
        })
    }

    /// Number of feature frames
    pub fn n_frames(&self) -> usize {
        self.f0_hz.len()
    }
}

impl CompleteRecord {
    pub fn to_example(&self) -> Example {
        let mut example = Example::new();
        self.base.fill_example(&mut example);
        example.insert(fields::F0_SCALED, Feature::floats(self.f0_scaled.clone()));
        example.insert(fields::LD_SCALED, Feature::floats(self.ld_scaled.clone()));
        example.insert(fields::Z, Feature::floats(self.z.clone()));
        example
    }

    pub fn from_example(example: &Example) -> Result<Self> {
        Ok(Self {
            base: PartialRecord::from_example(example)?,
            f0_scaled: example.float_list(fields::F0_SCALED)?.to_vec(),
            ld_scaled: example.float_list(fields::LD_SCALED)?.to_vec(),
            z: example.float_list(fields::Z)?.to_vec(),
        })
    }
}
