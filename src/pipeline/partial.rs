//! Partial record stage
//!
//! Reads `{split}/examples.json`, and for every entry in manifest order
//! loads `{split}/audio/{key}.wav`, extracts f0, confidence and loudness,
//! and appends one example to `{split}/partial.tfrecord`.

use std::time::Instant;
use crate::audio::load_audio;
use crate::config::Config;
use crate::dsp::FeatureExtractor;
use crate::error::Result;
use crate::manifest::{Manifest, ManifestEntry};
use crate::record::{PartialRecord, RecordWriter};
use super::StageReport;

pub struct PartialStage<'a> {
    config: &'a Config,
    extractor: FeatureExtractor,
}

impl<'a> PartialStage<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config, extractor: FeatureExtractor::new(config) }
    }

    pub fn run(&self) -> Result<StageReport> {
        let manifest = Manifest::from_file(self.config.manifest_path())?;
        self.run_manifest(&manifest)
    }

    /// Build records for an already loaded manifest
    pub fn run_manifest(&self, manifest: &Manifest) -> Result<StageReport> {
        let output = self.config.partial_path();
        log::info!("Writing {} partial records to {}", manifest.len(), output.display());

        let mut report = StageReport::new("Partial");
        let mut writer = RecordWriter::create(&output)?;
        let steps = manifest.len();

        for (step, (key, entry)) in manifest.iter().enumerate() {
            let start = Instant::now();
            let record = match self.build_record(key, entry) {
                Ok(record) => record,
                Err(e) => {
                    report.handle_failure(self.config.error_policy(), key, e)?;
                    continue;
                }
            };
            // A failed write leaves the file unusable, so it always aborts
            writer.write_example(&record.to_example())?;

            let elapsed = start.elapsed();
            log::info!("{}/{} - sample_name: {} - elapsed_time: {:.3}", step + 1, steps, key, elapsed.as_secs_f64());
            report.record_success(elapsed);
        }

        writer.finish()?;
        Ok(report.finish())
    }

    pub fn build_record(&self, key: &str, entry: &ManifestEntry) -> Result<PartialRecord> {
        let path = self.config.audio_dir().join(format!("{}.wav", key));
        let audio = load_audio(&path, self.config.sample_rate())?;
        log::debug!(
            "{}: {} samples ({:.3}s source)",
            key, audio.samples.len(), audio.source_duration
        );

        let features = self.extractor.extract(&audio.samples);
        Ok(PartialRecord::new(key, entry, audio.samples, features))
    }
}
