use super::{ArtifactOutcome, HealingOrchestrator};
use crate::error::{ConfigError, MendError, Result};
use crate::handler::ArtifactKind;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

// ─── Progress and report types ──────────────────────────────────────────────

/// Emitted after each file finishes, whatever its outcome.
#[derive(Debug)]
pub struct BatchProgress<'a> {
    /// 1-based position of the file just finished.
    pub index: usize,
    pub total: usize,
    pub path: &'a Path,
    /// Wall time since the batch started.
    pub elapsed: Duration,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchFailure {
    pub source: PathBuf,
    pub reason: String,
}

/// Partition of a finished batch. Every admitted source lands in exactly
/// one of the three lists.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Artifact paths written and validated during this batch.
    pub generated_files: Vec<PathBuf>,
    /// Artifacts that already existed and passed validation untouched.
    pub up_to_date: Vec<PathBuf>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.generated_files.len() + self.up_to_date.len() + self.failures.len()
    }
}

// ─── Exclusion ──────────────────────────────────────────────────────────────

/// Compile raw exclude globs, surfacing bad patterns as config errors.
pub fn compile_globs(raw: &[String]) -> Result<Vec<glob::Pattern>> {
    let mut patterns = Vec::with_capacity(raw.len());
    for text in raw {
        let pattern = glob::Pattern::new(text).map_err(|err| {
            MendError::Config(ConfigError::Validation(format!(
                "bad exclude glob {text:?}: {err}"
            )))
        })?;
        patterns.push(pattern);
    }
    Ok(patterns)
}

/// Drop sources matching any exclusion pattern, preserving order.
pub fn filter_excluded(sources: &[PathBuf], patterns: &[glob::Pattern]) -> Vec<PathBuf> {
    sources
        .iter()
        .filter(|path| !patterns.iter().any(|p| p.matches_path(path)))
        .cloned()
        .collect()
}

// ─── Runner ─────────────────────────────────────────────────────────────────

/// Sequential batch driver. One file's exhaustion never aborts its siblings;
/// only a fatal provider error stops the walk early.
pub struct BatchRunner {
    orchestrator: HealingOrchestrator,
    exclude: Vec<glob::Pattern>,
}

impl BatchRunner {
    pub fn new(orchestrator: HealingOrchestrator, exclude_globs: &[String]) -> Result<Self> {
        Ok(Self {
            orchestrator,
            exclude: compile_globs(exclude_globs)?,
        })
    }

    /// Process `sources` in order, skipping excluded paths up front.
    /// `on_progress` fires once per processed file.
    pub async fn run<F>(
        &self,
        sources: &[PathBuf],
        kind: ArtifactKind,
        mut on_progress: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(&BatchProgress<'_>),
    {
        let started_at = Utc::now();
        let clock = Instant::now();

        let admitted = filter_excluded(sources, &self.exclude);
        let skipped = sources.len() - admitted.len();
        if skipped > 0 {
            info!(skipped, "excluded sources before processing");
        }
        let total = admitted.len();

        let mut generated_files = Vec::new();
        let mut up_to_date = Vec::new();
        let mut failures = Vec::new();

        for (position, source) in admitted.iter().enumerate() {
            // Fatal provider errors are the only Err `process` lets through;
            // continuing the batch would hit the same wall per file.
            let report = self.orchestrator.process(source, kind).await?;
            match report.outcome {
                ArtifactOutcome::UpToDate => up_to_date.push(report.artifact),
                ArtifactOutcome::Generated { .. } => generated_files.push(report.artifact),
                ArtifactOutcome::Failed { reason } => failures.push(BatchFailure {
                    source: report.source,
                    reason: reason.to_string(),
                }),
            }
            on_progress(&BatchProgress {
                index: position + 1,
                total,
                path: source,
                elapsed: clock.elapsed(),
            });
        }

        Ok(BatchReport {
            started_at,
            finished_at: Utc::now(),
            generated_files,
            up_to_date,
            failures,
        })
    }
}
