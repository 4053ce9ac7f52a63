//! Complete record stage
//!
//! restore -> (next batch | end) -> encode -> write -> next batch.
//! Partial records are read unshuffled in a single pass, every encoder
//! output is merged with its source record, and the result is appended to
//! `{split}/complete.tfrecord`.

use std::time::Instant;
use crate::config::Config;
use crate::encoder::{Encoder, EncoderOutput, load_encoder};
use crate::error::{PrepError, Result};
use crate::record::{BatchError, CompleteRecord, PartialRecord, PartialRecordProvider, ProviderConfig, RecordWriter};
use super::StageReport;

pub struct CompleteStage<'a, E: Encoder> {
    config: &'a Config,
    encoder: E,
}

impl<'a> CompleteStage<'a, Box<dyn Encoder>> {
    /// Restore the newest checkpoint of the configured split
    pub fn restore(config: &'a Config) -> Result<Self> {
        let encoder = load_encoder(config, &config.split_dir())?;
        Ok(Self::new(config, encoder))
    }
}

impl<'a, E: Encoder> CompleteStage<'a, E> {
    pub fn new(config: &'a Config, encoder: E) -> Self {
        Self { config, encoder }
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            sample_rate: self.config.sample_rate(),
            frame_rate: self.config.frame_rate(),
            example_secs: self.config.encoder.example_secs,
        }
    }

    pub fn run(&mut self) -> Result<StageReport> {
        let provider = PartialRecordProvider::new(self.config.partial_path(), self.provider_config())?;
        let output = self.config.complete_path();
        log::info!("Encoding {} file(s) into {}", provider.files().len(), output.display());

        let policy = self.config.error_policy();
        let mut report = StageReport::new("Complete");
        let mut writer = RecordWriter::create(&output)?;
        let mut step = 0;

        for batch in provider.batches(self.config.encoder.batch_size) {
            let start = Instant::now();
            let batch = match batch {
                Ok(batch) => batch,
                Err(BatchError::Record { item, error }) => {
                    report.handle_failure(policy, &item, error)?;
                    continue;
                }
                Err(BatchError::Stream(e)) => {
                    // Nothing past a framing or IO error can be read
                    report.handle_failure(policy, &self.config.partial_path().display().to_string(), e)?;
                    break;
                }
            };

            let names = batch_names(&batch);
            let records = match self.encode_batch(batch) {
                Ok(records) => records,
                Err(e) => {
                    report.handle_failure(policy, &names, e)?;
                    continue;
                }
            };

            for record in &records {
                writer.write_example(&record.to_example())?;
            }

            let elapsed = start.elapsed();
            let per_record = elapsed / records.len().max(1) as u32;
            for record in &records {
                step += 1;
                log::info!(
                    "{} - sample_name: {} - elapsed_time: {:.3}",
                    step, record.base.sample_name, per_record.as_secs_f64()
                );
                report.record_success(per_record);
            }
        }

        writer.finish()?;
        Ok(report.finish())
    }

    /// Encode one batch and merge the outputs with their source records
    pub fn encode_batch(&mut self, batch: Vec<PartialRecord>) -> Result<Vec<CompleteRecord>> {
        let outputs = self.encoder.encode(&batch)?;
        if outputs.len() != batch.len() {
            return Err(PrepError::model(format!(
                "Encoder returned {} outputs for a batch of {}", outputs.len(), batch.len()
            )));
        }
        batch.into_iter().zip(outputs).map(|(base, output)| merge(base, output)).collect()
    }
}

fn merge(base: PartialRecord, output: EncoderOutput) -> Result<CompleteRecord> {
    let n_frames = base.n_frames();
    if output.f0_scaled.len() != n_frames || output.ld_scaled.len() != n_frames {
        return Err(PrepError::model(format!(
            "Record '{}': scaled features have {}/{} frames, expected {}",
            base.sample_name, output.f0_scaled.len(), output.ld_scaled.len(), n_frames
        )));
    }
    Ok(CompleteRecord {
        base,
        f0_scaled: output.f0_scaled,
        ld_scaled: output.ld_scaled,
        z: output.z,
    })
}

fn batch_names(batch: &[PartialRecord]) -> String {
    batch.iter().map(|r| r.sample_name.as_str()).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Preprocessor;
    use crate::record::RecordReader;
    use tempfile::TempDir;

    const Z_DIMS: usize = 4;

    struct Scaling {
        preprocessor: Preprocessor,
        calls: usize,
    }

    impl Encoder for Scaling {
        fn encode(&mut self, batch: &[PartialRecord]) -> Result<Vec<EncoderOutput>> {
            self.calls += 1;
            Ok(batch
                .iter()
                .map(|r| EncoderOutput {
                    f0_scaled: self.preprocessor.scale_f0(&r.f0_hz),
                    ld_scaled: self.preprocessor.scale_db(&r.loudness_db),
                    z: vec![0.5; r.n_frames() * Z_DIMS],
                })
                .collect())
        }
    }

    struct Failing;

    impl Encoder for Failing {
        fn encode(&mut self, _batch: &[PartialRecord]) -> Result<Vec<EncoderOutput>> {
            Err(PrepError::model("session lost"))
        }
    }

    fn config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.dataset.dataset_dir = dir.to_path_buf();
        config.dataset.sample_rate = 100;
        config.dataset.frame_rate = 10;
        config.encoder.example_secs = 1.0;
        std::fs::create_dir_all(config.split_dir()).unwrap();
        config
    }

    fn record(name: &str) -> PartialRecord {
        PartialRecord {
            sample_name: name.to_string(),
            note_number: 64,
            velocity: 75,
            instrument_source: 2,
            qualities: vec![0, 0, 1],
            audio: vec![0.25; 100],
            f0_hz: vec![440.0; 10],
            f0_confidence: vec![0.8; 10],
            loudness_db: vec![-40.0; 10],
        }
    }

    fn write_partial(config: &Config, records: &[PartialRecord]) {
        let mut writer = RecordWriter::create(config.partial_path()).unwrap();
        for r in records {
            writer.write_example(&r.to_example()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn read_complete(config: &Config) -> Vec<CompleteRecord> {
        let mut reader = RecordReader::open(config.complete_path()).unwrap();
        let mut records = Vec::new();
        while let Some(example) = reader.read_example().unwrap() {
            records.push(CompleteRecord::from_example(&example).unwrap());
        }
        records
    }

    #[test]
    fn test_complete_copies_every_partial_record() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        let partial = vec![record("one"), record("two"), record("three")];
        write_partial(&config, &partial);

        let mut encoder = Scaling { preprocessor: Preprocessor::default(), calls: 0 };
        let report = CompleteStage::new(&config, &mut encoder).run().unwrap();
        assert_eq!(report.written, 3);
        assert_eq!(encoder.calls, 3);

        let complete = read_complete(&config);
        assert_eq!(complete.len(), partial.len());
        for (c, p) in complete.iter().zip(&partial) {
            assert_eq!(&c.base, p);
            assert_eq!(c.ld_scaled, vec![0.5; 10]);
            assert_eq!(c.z.len(), 10 * Z_DIMS);
        }
    }

    #[test]
    fn test_encoder_failure_policy() {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path());
        write_partial(&config, &[record("one")]);

        assert!(CompleteStage::new(&config, Failing).run().is_err());

        config.processing.error_policy = crate::config::ErrorPolicy::Collect;
        let report = CompleteStage::new(&config, Failing).run().unwrap();
        assert_eq!(report.written, 0);
        assert_eq!(report.failures[0].item, "one");
    }

    #[test]
    fn test_bad_record_skipped_under_collect() {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path());
        config.processing.error_policy = crate::config::ErrorPolicy::Collect;
        let mut bad = record("bad");
        bad.f0_hz.truncate(5);
        write_partial(&config, &[bad, record("good1"), record("good2")]);

        let mut encoder = Scaling { preprocessor: Preprocessor::default(), calls: 0 };
        let report = CompleteStage::new(&config, &mut encoder).run().unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item, "bad");

        let names: Vec<String> = read_complete(&config).into_iter().map(|r| r.base.sample_name).collect();
        assert_eq!(names, vec!["good1", "good2"]);
    }

    #[test]
    fn test_bad_record_aborts_by_default() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        let mut bad = record("bad");
        bad.audio.truncate(10);
        write_partial(&config, &[record("good"), bad]);

        let err = CompleteStage::new(&config, Scaling { preprocessor: Preprocessor::default(), calls: 0 })
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_missing_partial_file() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        assert!(CompleteStage::new(&config, Failing).run().is_err());
    }

    #[test]
    fn test_merge_rejects_wrong_frame_count() {
        let output = EncoderOutput { f0_scaled: vec![0.0; 3], ld_scaled: vec![0.0; 10], z: vec![] };
        assert!(merge(record("x"), output).is_err());
    }
}
