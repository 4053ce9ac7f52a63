//! Spectrogram Module
//!
//! Renders a log-mel spectrogram PNG next to every WAV file of a directory.
//! Outputs share the WAV's base name and are overwritten on every run.

pub mod colormap;
pub mod render;

pub use colormap::inferno;
pub use render::{render_rgb, write_png};

use std::path::{Path, PathBuf};
use std::time::Instant;
use indicatif::{ProgressBar, ProgressStyle};
use crate::audio::load_mono;
use crate::config::{ErrorPolicy, SpectrogramConfig};
use crate::dsp::{MelConfig, MelExtractor};
use crate::error::{PrepError, Result};
use crate::pipeline::StageReport;

#[derive(Debug)]
pub struct SpectrogramGenerator {
    config: SpectrogramConfig,
    extractor: MelExtractor,
    policy: ErrorPolicy,
    show_progress: bool,
}

impl SpectrogramGenerator {
    pub fn new(config: &SpectrogramConfig, policy: ErrorPolicy) -> Self {
        let extractor = MelExtractor::new(MelConfig {
            sample_rate: config.sample_rate,
            n_fft: config.n_fft,
            hop_length: config.hop_length,
            n_mels: config.n_mels,
            fmin: 0.0,
            fmax: None,
        });
        Self { config: config.clone(), extractor, policy, show_progress: true }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Render every WAV in `dir`, in file name order
    pub fn run<P: AsRef<Path>>(&self, dir: P) -> Result<StageReport> {
        let files = list_wav_files(dir.as_ref())?;
        log::info!("Rendering {} spectrogram(s) in {}", files.len(), dir.as_ref().display());

        let progress = self.progress_bar(files.len())?;
        let mut report = StageReport::new("Spectrograms");

        for path in &files {
            let start = Instant::now();
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            progress.set_message(name.clone());

            match self.render_file(path) {
                Ok(output) => {
                    log::debug!("{} -> {}", path.display(), output.display());
                    report.record_success(start.elapsed());
                }
                Err(e) => {
                    if let Err(e) = report.handle_failure(self.policy, &name, e) {
                        progress.abandon();
                        return Err(e);
                    }
                }
            }
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(report.finish())
    }

    /// Render one file to `{stem}.png` beside it
    pub fn render_file(&self, path: &Path) -> Result<PathBuf> {
        let audio = load_mono(path, self.config.sample_rate)?;
        let mel = self.extractor.log_power(&audio.samples, Some(self.config.top_db));

        let pixels = render_rgb(&mel, self.config.width, self.config.height)
            .map_err(|e| PrepError::render(format!("{}: {}", path.display(), e)))?;
        let output = path.with_extension("png");
        write_png(&output, &pixels, self.config.width, self.config.height)?;
        Ok(output)
    }

    fn progress_bar(&self, len: usize) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let progress = ProgressBar::new(len as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| PrepError::render(format!("Progress template: {}", e)))?
                .progress_chars("#>-"),
        );
        Ok(progress)
    }
}

/// Regular files ending in `.wav` (any case), sorted by path
pub fn list_wav_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| PrepError::audio(format!("Cannot list {}: {}", dir.display(), e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        // Suffix match, so a file named just `.wav` counts too
        if entry.file_name().to_string_lossy().to_ascii_lowercase().ends_with(".wav") {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
