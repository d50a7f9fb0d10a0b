pub mod command;
pub mod docs;

pub use command::{CommandOutcome, ValidationCommand};
pub use docs::DocHandler;
pub use unit_tests::UnitTestHandler;

use crate::error::HandlerError;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

// ─── Kinds and verdicts ─────────────────────────────────────────────────────

/// The artifact families the orchestrator knows how to produce.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ArtifactKind {
    UnitTests,
    Docs,
}

/// Validation outcome. `None` means the artifact passed; `Some` carries the
/// diagnostic text fed back to the oracle during healing.
pub type Verdict = Option<String>;

// ─── Per-call inputs ────────────────────────────────────────────────────────

/// Inputs for a first-time generation.
pub struct GenerateRequest<'a> {
    /// Source path relative to the project root.
    pub source_path: &'a Path,
    /// Redacted source content, read by the caller.
    pub source: &'a str,
    /// Where the artifact will be written, relative to the project root.
    pub artifact_path: &'a Path,
}

/// Inputs for validating a written artifact.
pub struct ValidateRequest<'a> {
    pub source_path: &'a Path,
    pub artifact_path: &'a Path,
    /// Current artifact content as it exists on disk.
    pub artifact: &'a str,
}

/// Inputs for one healing attempt.
pub struct FixRequest<'a> {
    pub source_path: &'a Path,
    /// Fresh source read taken just before this attempt.
    pub source: &'a str,
    pub artifact_path: &'a Path,
    /// The artifact content that failed validation.
    pub current: &'a str,
    /// Diagnostic text from the failing validation.
    pub verdict: &'a str,
}

// ─── Handler trait ──────────────────────────────────────────────────────────

/// One artifact family: how to derive its path, produce it, judge it, and
/// repair it. Implementations own their oracle access and prompts; callers
/// supply only file content and paths.
pub trait ArtifactHandler: Send + Sync {
    fn kind(&self) -> ArtifactKind;

    /// Sibling path the artifact lives at for a given source file.
    fn artifact_path(&self, source_path: &Path) -> PathBuf;

    /// Produce artifact content from scratch. An empty result means the
    /// oracle declined to generate anything.
    fn generate<'a>(
        &'a self,
        req: &'a GenerateRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, HandlerError>> + Send + 'a>>;

    /// Judge the artifact currently on disk.
    fn validate<'a>(
        &'a self,
        req: &'a ValidateRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Verdict, HandlerError>> + Send + 'a>>;

    /// Produce a repaired artifact from the failing one and its verdict. An
    /// empty result means the oracle had no fix to offer.
    fn fix<'a>(
        &'a self,
        req: &'a FixRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, HandlerError>> + Send + 'a>>;
}

pub(crate) fn prompt_error(err: anyhow::Error) -> HandlerError {
    HandlerError::Prompt {
        message: format!("{err:#}"),
    }
}

// ─── Registry ───────────────────────────────────────────────────────────────

/// Handler lookup table, built once at startup. Keys come from each
/// handler's own `kind()`.
pub struct HandlerRegistry {
    handlers: HashMap<ArtifactKind, Arc<dyn ArtifactHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler. Replaces any existing handler of the same kind.
    pub fn register(&mut self, handler: Arc<dyn ArtifactHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn get(&self, kind: ArtifactKind) -> Result<Arc<dyn ArtifactHandler>, HandlerError> {
        self.handlers
            .get(&kind)
            .cloned()
            .ok_or(HandlerError::UnknownKind {
                kind: kind.to_string(),
            })
    }

    pub fn kinds(&self) -> Vec<ArtifactKind> {
        let mut kinds: Vec<ArtifactKind> = self.handlers.keys().copied().collect();
        kinds.sort_by_key(|k| k.to_string());
        kinds
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
