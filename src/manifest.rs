//! Dataset manifest (`examples.json`)
//!
//! A JSON object mapping sample keys to their metadata. The file's key
//! order is the processing order, so it is captured explicitly as a list
//! next to the lookup map.

use std::collections::HashMap;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::{PrepError, Result};

/// Metadata of one sample; unknown JSON keys are ignored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub pitch: i64,
    pub velocity: i64,
    pub instrument_source: i64,
    pub qualities: Vec<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct Manifest {
    keys: Vec<String>,
    entries: HashMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PrepError::manifest(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        // serde_json's preserve_order keeps the document's key order here
        let value: serde_json::Value = serde_json::from_str(content)?;
        let object = value
            .as_object()
            .ok_or_else(|| PrepError::manifest("Top level must be a JSON object"))?;

        let mut manifest = Manifest::default();
        for (key, raw) in object {
            let entry: ManifestEntry = serde_json::from_value(raw.clone())
                .map_err(|e| PrepError::manifest(format!("Entry '{}': {}", key, e)))?;
            manifest.push(key.clone(), entry)?;
        }
        Ok(manifest)
    }

    /// Append an entry at the end of the processing order
    pub fn push(&mut self, key: String, entry: ManifestEntry) -> Result<()> {
        if self.entries.contains_key(&key) {
            return Err(PrepError::manifest(format!("Duplicate key '{}'", key)));
        }
        self.keys.push(key.clone());
        self.entries.insert(key, entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.get(key)
    }

    /// Entries in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.keys
            .iter()
            .filter_map(move |key| self.entries.get(key).map(|entry| (key.as_str(), entry)))
    }
}
