pub mod batch;

pub use batch::{
    BatchFailure, BatchProgress, BatchReport, BatchRunner, compile_globs, filter_excluded,
};

use crate::error::Result;
use crate::handler::{
    ArtifactHandler, ArtifactKind, FixRequest, GenerateRequest, HandlerRegistry, ValidateRequest,
};
use crate::store::SandboxedStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default ceiling on heal attempts per artifact.
pub const DEFAULT_MAX_HEAL_ATTEMPTS: usize = 3;

// ─── Lifecycle types ────────────────────────────────────────────────────────

/// Stations an artifact passes through. Used for transition logging; the
/// counters on [`ArtifactOutcome`] carry the numbers that matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactState {
    Init,
    CheckExisting,
    Generate,
    Validate,
    Heal,
    Done,
    Failed,
}

/// How processing one source file ended.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactOutcome {
    /// An artifact already existed and validated clean. No oracle calls.
    UpToDate,
    /// A fresh artifact was written and validated.
    Generated { heal_attempts: usize },
    /// The artifact could not be brought to a valid state.
    Failed { reason: ArtifactFailure },
}

/// Terminal failure reasons that do not abort the surrounding batch.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFailure {
    #[error("oracle produced no artifact content")]
    NothingGenerated,

    #[error("artifact failed validation and healing is disabled: {verdict}")]
    HealingDisabled { verdict: String },

    #[error("artifact still failing after {attempts} heal attempts: {verdict}")]
    AttemptsExhausted { attempts: usize, verdict: String },

    #[error("heal attempt {attempt} produced an empty fix")]
    EmptyFix { attempt: usize },

    #[error("{message}")]
    Error { message: String },
}

/// Record of one orchestrated source file.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ArtifactReport {
    pub source: PathBuf,
    pub artifact: PathBuf,
    pub kind: ArtifactKind,
    pub outcome: ArtifactOutcome,
}

// ─── Orchestrator ───────────────────────────────────────────────────────────

/// Drives one source file from `Init` to `Done` or `Failed`. A valid
/// existing artifact is reused with zero oracle calls; an invalid one keeps
/// its content and goes straight into healing; an absent one is generated
/// first. Healing is bounded by the configured attempt budget.
pub struct HealingOrchestrator {
    store: Arc<SandboxedStore>,
    registry: Arc<HandlerRegistry>,
    healing_enabled: bool,
    max_heal_attempts: usize,
}

impl HealingOrchestrator {
    pub fn new(
        store: Arc<SandboxedStore>,
        registry: Arc<HandlerRegistry>,
        healing_enabled: bool,
        max_heal_attempts: usize,
    ) -> Self {
        Self {
            store,
            registry,
            healing_enabled,
            max_heal_attempts,
        }
    }

    /// Process one source file. Ordinary failures (exhausted attempts, empty
    /// fixes, unreadable files) come back as a `Failed` outcome so sibling
    /// files keep going; only fatal provider errors surface as `Err`.
    pub async fn process(&self, source_path: &Path, kind: ArtifactKind) -> Result<ArtifactReport> {
        let handler = self.registry.get(kind)?;
        let artifact_path = handler.artifact_path(source_path);

        let outcome = match self
            .process_inner(handler.as_ref(), source_path, &artifact_path)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) if err.is_fatal_provider() => {
                warn!(source = %source_path.display(), error = %err, "fatal provider error, aborting");
                return Err(err);
            }
            Err(err) => ArtifactOutcome::Failed {
                reason: ArtifactFailure::Error {
                    message: err.to_string(),
                },
            },
        };

        match &outcome {
            ArtifactOutcome::UpToDate => {
                info!(state = %ArtifactState::Done, artifact = %artifact_path.display(), "artifact up to date")
            }
            ArtifactOutcome::Generated { heal_attempts } => {
                info!(state = %ArtifactState::Done, artifact = %artifact_path.display(), heal_attempts, "artifact generated")
            }
            ArtifactOutcome::Failed { reason } => {
                warn!(state = %ArtifactState::Failed, source = %source_path.display(), %reason, "artifact failed")
            }
        }

        Ok(ArtifactReport {
            source: source_path.to_path_buf(),
            artifact: artifact_path,
            kind,
            outcome,
        })
    }

    async fn process_inner(
        &self,
        handler: &dyn ArtifactHandler,
        source_path: &Path,
        artifact_path: &Path,
    ) -> Result<ArtifactOutcome> {
        debug!(state = %ArtifactState::Init, source = %source_path.display(), kind = %handler.kind(), "processing source");

        // An existing artifact that validates clean costs zero oracle calls.
        // An invalid one keeps its content as the healing starting point.
        debug!(state = %ArtifactState::CheckExisting, artifact = %artifact_path.display(), "checking existing artifact");
        let (mut current, mut verdict) = match self.store.read_if_exists(artifact_path).await? {
            Some(existing) => {
                let verdict = handler
                    .validate(&ValidateRequest {
                        source_path,
                        artifact_path,
                        artifact: &existing,
                    })
                    .await?;
                let Some(verdict) = verdict else {
                    return Ok(ArtifactOutcome::UpToDate);
                };
                debug!(artifact = %artifact_path.display(), %verdict, "existing artifact failed validation, healing in place");
                (existing, Some(verdict))
            }
            None => {
                debug!(state = %ArtifactState::Generate, source = %source_path.display(), "generating artifact");
                let source = self.store.read(source_path).await?;
                let current = handler
                    .generate(&GenerateRequest {
                        source_path,
                        source: &source,
                        artifact_path,
                    })
                    .await?;
                if current.trim().is_empty() {
                    return Ok(ArtifactOutcome::Failed {
                        reason: ArtifactFailure::NothingGenerated,
                    });
                }
                // Written before validation so command-backed validators see
                // the real file on disk.
                self.store.write(artifact_path, &current).await?;

                debug!(state = %ArtifactState::Validate, artifact = %artifact_path.display(), "validating artifact");
                let verdict = handler
                    .validate(&ValidateRequest {
                        source_path,
                        artifact_path,
                        artifact: &current,
                    })
                    .await?;
                (current, verdict)
            }
        };

        let mut heal_attempts = 0usize;
        loop {
            let Some(reason) = verdict else {
                return Ok(ArtifactOutcome::Generated { heal_attempts });
            };

            if !self.healing_enabled {
                return Ok(ArtifactOutcome::Failed {
                    reason: ArtifactFailure::HealingDisabled { verdict: reason },
                });
            }
            if heal_attempts >= self.max_heal_attempts {
                return Ok(ArtifactOutcome::Failed {
                    reason: ArtifactFailure::AttemptsExhausted {
                        attempts: heal_attempts,
                        verdict: reason,
                    },
                });
            }

            heal_attempts += 1;
            debug!(state = %ArtifactState::Heal, attempt = heal_attempts, artifact = %artifact_path.display(), "healing artifact");
            // The source is re-read each attempt: it may have changed since
            // generation, and the fix must target what is on disk now.
            let fresh_source = self.store.read(source_path).await?;
            let fixed = handler
                .fix(&FixRequest {
                    source_path,
                    source: &fresh_source,
                    artifact_path,
                    current: &current,
                    verdict: &reason,
                })
                .await?;
            if fixed.trim().is_empty() {
                return Ok(ArtifactOutcome::Failed {
                    reason: ArtifactFailure::EmptyFix {
                        attempt: heal_attempts,
                    },
                });
            }
            current = fixed;
            self.store.write(artifact_path, &current).await?;

            debug!(state = %ArtifactState::Validate, artifact = %artifact_path.display(), heal_attempts, "validating artifact");
            verdict = handler
                .validate(&ValidateRequest {
                    source_path,
                    artifact_path,
                    artifact: &current,
                })
                .await?;
        }
    }
}
