//! Batched reading of partial records
//!
//! Every file whose name starts with the pattern's file name (for example
//! `partial.tfrecord`, `partial.tfrecord-00001-of-00004`) is read in name
//! order. Each record must hold exactly `example_secs` worth of audio and
//! feature frames.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use prost::Message;
use crate::error::{PrepError, Result};
use super::example::Example;
use super::schema::{fields, PartialRecord};
use super::tfrecord::RecordReader;

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub sample_rate: u32,
    pub frame_rate: u32,
    pub example_secs: f32,
}

impl ProviderConfig {
    pub fn audio_len(&self) -> usize {
        (self.example_secs as f64 * self.sample_rate as f64).round() as usize
    }

    pub fn n_frames(&self) -> usize {
        (self.example_secs as f64 * self.frame_rate as f64).round() as usize
    }
}

#[derive(Debug)]
pub struct PartialRecordProvider {
    files: Vec<PathBuf>,
    config: ProviderConfig,
}

impl PartialRecordProvider {
    /// Resolve `file_pattern` as a path prefix
    pub fn new<P: AsRef<Path>>(file_pattern: P, config: ProviderConfig) -> Result<Self> {
        let pattern = file_pattern.as_ref();
        let dir = match pattern.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let prefix = pattern
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PrepError::record(format!("Invalid file pattern: {}", pattern.display())))?;

        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
            .map_err(|e| PrepError::record(format!("Cannot list {}: {}", dir.display(), e)))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|entry| entry.file_name().to_str().is_some_and(|name| name.starts_with(prefix)))
            .map(|entry| entry.path())
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(PrepError::record(format!("No files match {}*", pattern.display())));
        }

        log::debug!("Partial record files: {:?}", files);
        Ok(Self { files, config })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Unshuffled, single-pass batches; the last batch may be short
    pub fn batches(&self, batch_size: usize) -> Batches {
        Batches {
            files: self.files.clone().into_iter(),
            reader: None,
            current: PathBuf::new(),
            index: 0,
            config: self.config.clone(),
            batch_size: batch_size.max(1),
            pending: Vec::with_capacity(batch_size.max(1)),
            deferred: None,
            done: false,
        }
    }

    /// Count the records across all files without decoding them
    pub fn count_records(&self) -> Result<usize> {
        let mut total = 0;
        for path in &self.files {
            for record in RecordReader::open(path)? {
                record?;
                total += 1;
            }
        }
        Ok(total)
    }
}

/// Why a batch could not be produced
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// One record is unusable; iteration continues with the next one
    #[error("{error}")]
    Record { item: String, error: PrepError },
    /// The record stream itself is unreadable; iteration ends
    #[error(transparent)]
    Stream(PrepError),
}

impl BatchError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, BatchError::Stream(_))
    }
}

impl From<BatchError> for PrepError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Record { error, .. } | BatchError::Stream(error) => error,
        }
    }
}

/// Iterator over record batches
pub struct Batches {
    files: std::vec::IntoIter<PathBuf>,
    reader: Option<RecordReader<BufReader<File>>>,
    current: PathBuf,
    index: usize,
    config: ProviderConfig,
    batch_size: usize,
    pending: Vec<PartialRecord>,
    deferred: Option<BatchError>,
    done: bool,
}

impl Batches {
    fn next_record(&mut self) -> std::result::Result<Option<PartialRecord>, BatchError> {
        loop {
            if let Some(reader) = self.reader.as_mut() {
                if let Some(bytes) = reader.read_record().map_err(BatchError::Stream)? {
                    self.index += 1;
                    let location = format!("{}#{}", self.current.display(), self.index);

                    let example = Example::decode(bytes.as_slice())
                        .map_err(|e| BatchError::Record { item: location.clone(), error: e.into() })?;
                    let record = PartialRecord::from_example(&example)
                        .map_err(|error| BatchError::Record { item: location, error })?;
                    validate_lengths(&record, &self.config)
                        .map_err(|error| BatchError::Record { item: record.sample_name.clone(), error })?;
                    return Ok(Some(record));
                }
            }

            match self.files.next() {
                Some(path) => {
                    self.reader = Some(RecordReader::open(&path).map_err(BatchError::Stream)?);
                    self.current = path;
                    self.index = 0;
                }
                None => return Ok(None),
            }
        }
    }
}

impl Iterator for Batches {
    type Item = std::result::Result<Vec<PartialRecord>, BatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.deferred.take() {
            return Some(Err(err));
        }
        if self.done {
            return None;
        }

        while self.pending.len() < self.batch_size {
            match self.next_record() {
                Ok(Some(record)) => self.pending.push(record),
                Ok(None) => {
                    self.done = true;
                    break;
                }
                // Records read so far stay pending for the next batch
                Err(err) if !err.is_fatal() => return Some(Err(err)),
                Err(err) => {
                    self.done = true;
                    if self.pending.is_empty() {
                        return Some(Err(err));
                    }
                    self.deferred = Some(err);
                    break;
                }
            }
        }

        if self.pending.is_empty() {
            None
        } else {
            Some(Ok(std::mem::take(&mut self.pending)))
        }
    }
}

fn validate_lengths(record: &PartialRecord, config: &ProviderConfig) -> Result<()> {
    let audio_len = config.audio_len();
    let n_frames = config.n_frames();

    let checks = [
        (fields::AUDIO, record.audio.len(), audio_len),
        (fields::F0_HZ, record.f0_hz.len(), n_frames),
        (fields::F0_CONFIDENCE, record.f0_confidence.len(), n_frames),
        (fields::LOUDNESS_DB, record.loudness_db.len(), n_frames),
    ];

    for (name, actual, expected) in checks {
        if actual != expected {
            return Err(PrepError::record(format!(
                "Record '{}': feature '{}' has {} values, expected {}",
                record.sample_name, name, actual, expected
            )));
        }
    }
    Ok(())
}
