//! Per-run counters and the final report.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Counters for one traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Identifier of the run, also attached to its log span.
    pub run_id: Uuid,
    /// When the traversal started.
    pub started_at: DateTime<Utc>,
    /// When the snapshot was taken.
    pub finished_at: DateTime<Utc>,
    /// Files handed to the orchestrator.
    pub attempted: usize,
    /// Files converted and written.
    pub succeeded: usize,
    /// Files whose primary-model attempt failed, whatever happened next.
    pub failed_initially: usize,
    /// Files converted by the fallback model.
    pub fallback_used: usize,
    /// Files that could not be converted.
    pub failed: usize,
    /// Paths of the files that could not be converted, in processing order.
    pub failed_files: Vec<PathBuf>,
    /// Successful conversions per model.
    pub per_model_success_counts: BTreeMap<String, usize>,
}

impl RunSummary {
    /// `attempted == succeeded + failed` and one failed path per failure.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.attempted == self.succeeded + self.failed && self.failed_files.len() == self.failed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Migration summary (run {})", self.run_id)?;
        writeln!(f, "  Attempted:         {}", self.attempted)?;
        writeln!(f, "  Succeeded:         {}", self.succeeded)?;
        writeln!(f, "  Failed:            {}", self.failed)?;
        writeln!(f, "  Primary failures:  {}", self.failed_initially)?;
        writeln!(f, "  Fallback used:     {}", self.fallback_used)?;
        if !self.per_model_success_counts.is_empty() {
            writeln!(f, "  Successes by model:")?;
            for (model, count) in &self.per_model_success_counts {
                writeln!(f, "    {model}: {count}")?;
            }
        }
        if !self.failed_files.is_empty() {
            writeln!(f, "  Failed files:")?;
            for path in &self.failed_files {
                writeln!(f, "    {}", path.display())?;
            }
        }
        Ok(())
    }
}

/// Accumulates counters while files are processed one at a time.
#[derive(Debug)]
pub struct SummaryAggregator {
    summary: RunSummary,
}

impl SummaryAggregator {
    /// Starts an empty aggregation.
    #[must_use]
    pub fn new(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            summary: RunSummary {
                run_id,
                started_at,
                finished_at: started_at,
                attempted: 0,
                succeeded: 0,
                failed_initially: 0,
                fallback_used: 0,
                failed: 0,
                failed_files: Vec::new(),
                per_model_success_counts: BTreeMap::new(),
            },
        }
    }

    /// A file is about to be sent to the orchestrator.
    pub fn record_attempt(&mut self) {
        self.summary.attempted += 1;
    }

    /// The primary model failed for the current file.
    pub fn record_initial_failure(&mut self) {
        self.summary.failed_initially += 1;
    }

    /// The current file was converted and written.
    pub fn record_success(&mut self, used_fallback: bool, model: &str) {
        self.summary.succeeded += 1;
        if used_fallback {
            self.summary.fallback_used += 1;
        }
        let counts = &mut self.summary.per_model_success_counts;
        *counts.entry(model.to_string()).or_default() += 1;
    }

    /// The current file could not be converted.
    pub fn record_failure(&mut self, path: PathBuf) {
        self.summary.failed += 1;
        self.summary.failed_files.push(path);
    }

    /// Copy of the counters, stamped with `finished_at`.
    #[must_use]
    pub fn snapshot(&self, finished_at: DateTime<Utc>) -> RunSummary {
        RunSummary {
            finished_at,
            ..self.summary.clone()
        }
    }
}
