//! Pipeline Module
//!
//! The two dataset stages. Each owns its output file for the duration of a
//! run and reports per-item timing plus an aggregate [`StageReport`].

pub mod complete;
pub mod partial;

pub use complete::CompleteStage;
pub use partial::PartialStage;

use std::time::{Duration, Instant};
use crate::config::ErrorPolicy;
use crate::error::{PrepError, Result};

/// An item skipped under [`ErrorPolicy::Collect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub item: String,
    pub error: String,
}

/// Outcome of one stage run
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: &'static str,
    pub written: usize,
    pub failures: Vec<Failure>,
    pub total_time: Duration,
    item_time: Duration,
    started: Instant,
}

impl StageReport {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            written: 0,
            failures: Vec::new(),
            total_time: Duration::ZERO,
            item_time: Duration::ZERO,
            started: Instant::now(),
        }
    }

    pub fn record_success(&mut self, elapsed: Duration) {
        self.written += 1;
        self.item_time += elapsed;
    }

    /// Apply `policy` to a failed item: propagate it, or log and keep it
    pub fn handle_failure(&mut self, policy: ErrorPolicy, item: &str, error: PrepError) -> Result<()> {
        match policy {
            ErrorPolicy::Abort => Err(error),
            ErrorPolicy::Collect => {
                log::warn!("{}: skipping '{}': {}", self.stage, item, error);
                self.failures.push(Failure { item: item.to_string(), error: error.to_string() });
                Ok(())
            }
        }
    }

    pub fn finish(mut self) -> Self {
        self.total_time = self.started.elapsed();
        self
    }

    /// Mean time per written item
    pub fn mean_time(&self) -> Duration {
        if self.written == 0 {
            Duration::ZERO
        } else {
            self.item_time / self.written as u32
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn print_summary(&self) {
        println!("=== {} Complete ===", self.stage);
        println!("Records: {}", self.written);
        println!("Time: {:.2}s", self.total_time.as_secs_f64());
        println!("Mean per record: {:.3}s", self.mean_time().as_secs_f64());
        if !self.failures.is_empty() {
            println!("Skipped: {}", self.failures.len());
            for failure in &self.failures {
                println!("  {} - {}", failure.item, failure.error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_propagates() {
        let mut report = StageReport::new("Test");
        let err = report.handle_failure(ErrorPolicy::Abort, "x", PrepError::audio("bad")).unwrap_err();
        assert!(matches!(err, PrepError::Audio { .. }));
        assert!(report.is_clean());
    }

    #[test]
    fn test_collect_keeps_going() {
        let mut report = StageReport::new("Test");
        report.handle_failure(ErrorPolicy::Collect, "x", PrepError::audio("bad")).unwrap();
        report.record_success(Duration::from_millis(10));
        report.record_success(Duration::from_millis(30));
        let report = report.finish();

        assert_eq!(report.written, 2);
        assert_eq!(report.failures, vec![Failure { item: "x".into(), error: "Audio error: bad".into() }]);
        assert_eq!(report.mean_time(), Duration::from_millis(20));
    }

    #[test]
    fn test_mean_of_empty_report() {
        assert_eq!(StageReport::new("Test").finish().mean_time(), Duration::ZERO);
    }
}
