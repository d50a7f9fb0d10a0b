use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use mendforge::error::HandlerError;
use mendforge::handler::{
    ArtifactHandler, ArtifactKind, FixRequest, GenerateRequest, ValidateRequest, Verdict,
};
use mendforge::orchestrator::{ArtifactFailure, ArtifactOutcome};

use crate::support::{self, ScriptedHandler};

#[tokio::test]
async fn existing_valid_artifact_costs_no_generation() {
    let (tmp, store) = support::project();
    std::fs::write(tmp.path().join("src/math.test.ts"), "existing tests").expect("write artifact");
    let handler = Arc::new(ScriptedHandler::healthy("unused"));
    let orchestrator = support::orchestrator_with(store, handler.clone(), true, 3);

    let report = orchestrator
        .process(Path::new("src/math.ts"), ArtifactKind::UnitTests)
        .await
        .expect("process");

    assert_eq!(report.outcome, ArtifactOutcome::UpToDate);
    assert_eq!(report.artifact, PathBuf::from("src/math.test.ts"));
    assert_eq!(handler.generate_calls(), 0);
    assert_eq!(handler.validate_calls(), 1);
    assert_eq!(handler.fix_calls(), 0);
}

#[tokio::test]
async fn fresh_artifact_is_written_and_validated() {
    let (tmp, store) = support::project();
    let handler = Arc::new(ScriptedHandler::healthy("test('adds', () => {});"));
    let orchestrator = support::orchestrator_with(store, handler.clone(), true, 3);

    let report = orchestrator
        .process(Path::new("src/math.ts"), ArtifactKind::UnitTests)
        .await
        .expect("process");

    assert_eq!(report.outcome, ArtifactOutcome::Generated { heal_attempts: 0 });
    assert_eq!(handler.generate_calls(), 1);
    assert_eq!(handler.validate_calls(), 1);
    let on_disk =
        std::fs::read_to_string(tmp.path().join("src/math.test.ts")).expect("read artifact");
    assert_eq!(on_disk, "test('adds', () => {});");
}

#[tokio::test]
async fn single_heal_attempt_recovers_a_failing_artifact() {
    let (tmp, store) = support::project();
    let handler = Arc::new(ScriptedHandler::new(
        "broken tests",
        "fixed tests",
        vec![Some("expected 3, got 4".to_string())],
        None,
    ));
    let orchestrator = support::orchestrator_with(store, handler.clone(), true, 3);

    let report = orchestrator
        .process(Path::new("src/math.ts"), ArtifactKind::UnitTests)
        .await
        .expect("process");

    assert_eq!(report.outcome, ArtifactOutcome::Generated { heal_attempts: 1 });
    assert_eq!(handler.validate_calls(), 2);
    assert_eq!(handler.fix_calls(), 1);
    assert_eq!(handler.fix_verdicts(), vec!["expected 3, got 4"]);
    assert_eq!(handler.fix_sources(), vec![support::SOURCE_TEXT]);
    let on_disk =
        std::fs::read_to_string(tmp.path().join("src/math.test.ts")).expect("read artifact");
    assert_eq!(on_disk, "fixed tests");
}

#[tokio::test]
async fn attempt_budget_is_exhausted_after_three_heals() {
    let (tmp, store) = support::project();
    let handler = Arc::new(ScriptedHandler::always_failing(
        "bad tests",
        "still bad",
        "assertion failed: expected 3",
    ));
    let orchestrator = support::orchestrator_with(store, handler.clone(), true, 3);

    let report = orchestrator
        .process(Path::new("src/math.ts"), ArtifactKind::UnitTests)
        .await
        .expect("process");

    assert_eq!(
        report.outcome,
        ArtifactOutcome::Failed {
            reason: ArtifactFailure::AttemptsExhausted {
                attempts: 3,
                verdict: "assertion failed: expected 3".to_string(),
            },
        }
    );
    assert_eq!(handler.validate_calls(), 4);
    assert_eq!(handler.fix_calls(), 3);
    // The last fix is still on disk for inspection.
    let on_disk =
        std::fs::read_to_string(tmp.path().join("src/math.test.ts")).expect("read artifact");
    assert_eq!(on_disk, "still bad");
}

#[tokio::test]
async fn disabled_healing_reports_the_first_verdict() {
    let (_tmp, store) = support::project();
    let handler = Arc::new(ScriptedHandler::always_failing(
        "bad tests",
        "unused",
        "missing assertions",
    ));
    let orchestrator = support::orchestrator_with(store, handler.clone(), false, 3);

    let report = orchestrator
        .process(Path::new("src/math.ts"), ArtifactKind::UnitTests)
        .await
        .expect("process");

    assert_eq!(
        report.outcome,
        ArtifactOutcome::Failed {
            reason: ArtifactFailure::HealingDisabled {
                verdict: "missing assertions".to_string(),
            },
        }
    );
    assert_eq!(handler.validate_calls(), 1);
    assert_eq!(handler.fix_calls(), 0);
}

#[tokio::test]
async fn empty_fix_fails_immediately() {
    let (_tmp, store) = support::project();
    let handler = Arc::new(ScriptedHandler::always_failing(
        "bad tests",
        "",
        "broken import",
    ));
    let orchestrator = support::orchestrator_with(store, handler.clone(), true, 3);

    let report = orchestrator
        .process(Path::new("src/math.ts"), ArtifactKind::UnitTests)
        .await
        .expect("process");

    assert_eq!(
        report.outcome,
        ArtifactOutcome::Failed {
            reason: ArtifactFailure::EmptyFix { attempt: 1 },
        }
    );
    assert_eq!(handler.fix_calls(), 1);
    assert_eq!(handler.validate_calls(), 1);
}

#[tokio::test]
async fn empty_generation_never_touches_disk() {
    let (tmp, store) = support::project();
    let handler = Arc::new(ScriptedHandler::healthy(""));
    let orchestrator = support::orchestrator_with(store, handler.clone(), true, 3);

    let report = orchestrator
        .process(Path::new("src/math.ts"), ArtifactKind::UnitTests)
        .await
        .expect("process");

    assert_eq!(
        report.outcome,
        ArtifactOutcome::Failed {
            reason: ArtifactFailure::NothingGenerated,
        }
    );
    assert_eq!(handler.validate_calls(), 0);
    assert!(!tmp.path().join("src/math.test.ts").exists());
}

#[tokio::test]
async fn invalid_existing_artifact_is_healed_in_place() {
    let (tmp, store) = support::project();
    std::fs::write(tmp.path().join("src/math.test.ts"), "outdated tests").expect("write artifact");
    let handler = Arc::new(ScriptedHandler::new(
        "unused generation",
        "repaired tests",
        vec![Some("missing export".to_string())],
        None,
    ));
    let orchestrator = support::orchestrator_with(store, handler.clone(), true, 3);

    let report = orchestrator
        .process(Path::new("src/math.ts"), ArtifactKind::UnitTests)
        .await
        .expect("process");

    assert_eq!(report.outcome, ArtifactOutcome::Generated { heal_attempts: 1 });
    assert_eq!(handler.generate_calls(), 0);
    assert_eq!(handler.fix_calls(), 1);
    assert_eq!(handler.validate_calls(), 2);
    // The fix starts from the on-disk content, not a blank slate.
    assert_eq!(handler.fix_currents(), vec!["outdated tests"]);
    assert_eq!(handler.fix_verdicts(), vec!["missing export"]);
    let on_disk =
        std::fs::read_to_string(tmp.path().join("src/math.test.ts")).expect("read artifact");
    assert_eq!(on_disk, "repaired tests");
}

#[tokio::test]
async fn unreadable_source_is_a_per_file_failure() {
    let (_tmp, store) = support::project();
    let handler = Arc::new(ScriptedHandler::healthy("unused"));
    let orchestrator = support::orchestrator_with(store, handler.clone(), true, 3);

    let report = orchestrator
        .process(Path::new("src/ghost.ts"), ArtifactKind::UnitTests)
        .await
        .expect("missing sources must not abort the run");

    assert!(matches!(
        report.outcome,
        ArtifactOutcome::Failed {
            reason: ArtifactFailure::Error { .. },
        }
    ));
    assert_eq!(handler.generate_calls(), 0);
    assert_eq!(handler.validate_calls(), 0);
}

// ─── Fresh source re-read ───────────────────────────────────────────────────

/// Rewrites the source file while failing the first validation, so the test
/// can observe which source text the fix step receives.
struct SourceEditingHandler {
    source_on_disk: PathBuf,
    edited_source: &'static str,
    failed_once: AtomicBool,
    seen_fix_sources: Mutex<Vec<String>>,
}

impl SourceEditingHandler {
    fn new(source_on_disk: PathBuf, edited_source: &'static str) -> Self {
        Self {
            source_on_disk,
            edited_source,
            failed_once: AtomicBool::new(false),
            seen_fix_sources: Mutex::new(Vec::new()),
        }
    }

    fn fix_sources(&self) -> Vec<String> {
        self.seen_fix_sources
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl ArtifactHandler for SourceEditingHandler {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::UnitTests
    }

    fn artifact_path(&self, source_path: &Path) -> PathBuf {
        source_path.with_extension("test.ts")
    }

    fn generate<'a>(
        &'a self,
        _req: &'a GenerateRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, HandlerError>> + Send + 'a>> {
        Box::pin(async move { Ok("const first = 1;".to_string()) })
    }

    fn validate<'a>(
        &'a self,
        _req: &'a ValidateRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Verdict, HandlerError>> + Send + 'a>> {
        let verdict = if self.failed_once.swap(true, Ordering::SeqCst) {
            None
        } else {
            std::fs::write(&self.source_on_disk, self.edited_source).expect("edit source");
            Some("references a stale export".to_string())
        };
        Box::pin(async move { Ok(verdict) })
    }

    fn fix<'a>(
        &'a self,
        req: &'a FixRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, HandlerError>> + Send + 'a>> {
        self.seen_fix_sources
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(req.source.to_string());
        Box::pin(async move { Ok("const second = 2;".to_string()) })
    }
}

#[tokio::test]
async fn fix_sees_source_edits_made_after_generation() {
    let (tmp, store) = support::project();
    let edited = "export const renamed = 2;\n";
    let handler = Arc::new(SourceEditingHandler::new(
        tmp.path().join("src/math.ts"),
        edited,
    ));
    let orchestrator = support::orchestrator_with(store, handler.clone(), true, 3);

    let report = orchestrator
        .process(Path::new("src/math.ts"), ArtifactKind::UnitTests)
        .await
        .expect("process");

    assert_eq!(report.outcome, ArtifactOutcome::Generated { heal_attempts: 1 });
    assert_eq!(handler.fix_sources(), vec![edited]);
}
