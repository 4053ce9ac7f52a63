//! Feature scaling applied before the encoder network
//!
//! `f0_scaled = hz_to_midi(f0_hz) / f0_range` and
//! `ld_scaled = loudness_db / db_range + 1`, both landing roughly in [0, 1].

use serde::{Deserialize, Serialize};

pub const F0_RANGE: f32 = 127.0;
pub const DB_RANGE: f32 = 80.0;

/// MIDI note number of a frequency; non-positive frequencies map to 0.
/// Frequencies below 8.18 Hz give negative note numbers.
pub fn hz_to_midi(hz: f32) -> f32 {
    if hz <= 0.0 {
        return 0.0;
    }
    12.0 * (hz.log2() - 440.0f32.log2()) + 69.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preprocessor {
    pub f0_range: f32,
    pub db_range: f32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self { f0_range: F0_RANGE, db_range: DB_RANGE }
    }
}

impl Preprocessor {
    pub fn scale_f0(&self, f0_hz: &[f32]) -> Vec<f32> {
        f0_hz.iter().map(|&f| hz_to_midi(f) / self.f0_range).collect()
    }

    pub fn scale_db(&self, loudness_db: &[f32]) -> Vec<f32> {
        loudness_db.iter().map(|&db| db / self.db_range + 1.0).collect()
    }
}
