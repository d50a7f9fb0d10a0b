use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::engine::ConversationEngine;
use crate::handler::{
    ArtifactKind, DocHandler, HandlerRegistry, UnitTestHandler, ValidateRequest, ValidationCommand,
};
use crate::oracle::{NullOracle, OpenAiOracle, Oracle, ReliableOracle};
use crate::orchestrator::{BatchRunner, HealingOrchestrator, compile_globs, filter_excluded};
use crate::prompt::PromptEngine;
use crate::store::SandboxedStore;
use crate::ui;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub async fn dispatch(cli: Cli, mut config: Config) -> Result<()> {
    match cli.command {
        Commands::Run {
            targets,
            kind,
            no_heal,
            max_attempts,
            max_iterations,
            dry_run,
        } => {
            if no_heal {
                config.healing.enabled = false;
            }
            if let Some(attempts) = max_attempts {
                config.healing.max_attempts = attempts;
            }
            if let Some(iterations) = max_iterations {
                config.engine.max_iterations = iterations;
            }
            run_generate(&config, &targets, kind, dry_run).await
        }
        Commands::Check { targets, kind } => run_check(&config, &targets, kind).await,
    }
}

// ─── Commands ───────────────────────────────────────────────────────────────

async fn run_generate(
    config: &Config,
    targets: &[String],
    kind: ArtifactKind,
    dry_run: bool,
) -> Result<()> {
    let root = config.project_root();
    let admitted = collect_sources(config, &root, targets)?;
    if admitted.is_empty() {
        println!("{}", ui::warn("no source files matched"));
        return Ok(());
    }

    if dry_run {
        let title = format!("Would process {} file(s) as {kind}", admitted.len());
        println!("{}", ui::header(title));
        for path in &admitted {
            println!("  {}", ui::value(path.display()));
        }
        return Ok(());
    }

    let store = Arc::new(
        SandboxedStore::new(&root)
            .with_context(|| format!("project root {} is not usable", root.display()))?,
    );
    let api_key = config.api_key()?;
    let base = OpenAiOracle::new(
        &config.oracle.base_url,
        &api_key,
        Duration::from_secs(config.oracle.request_timeout_secs),
    )?;
    let oracle: Arc<dyn Oracle> = Arc::new(ReliableOracle::new(
        Arc::new(base),
        config.oracle.max_retries,
    ));
    let registry = build_registry(config, &store, oracle, &root)?;
    let orchestrator = HealingOrchestrator::new(
        store,
        registry,
        config.healing.enabled,
        config.healing.max_attempts,
    );
    let runner = BatchRunner::new(orchestrator, &config.project.exclude)?;

    info!(
        files = admitted.len(),
        kind = %kind,
        model = %config.oracle.model,
        "starting batch"
    );
    let report = runner
        .run(&admitted, kind, |progress| {
            println!(
                "{} [{}/{}] {} {}",
                ui::accent("•"),
                progress.index,
                progress.total,
                progress.path.display(),
                ui::dim(format!("({:.1}s)", progress.elapsed.as_secs_f64())),
            );
        })
        .await?;

    println!();
    println!("{}", ui::header("Batch summary"));
    println!("  generated:  {}", ui::success(report.generated_files.len()));
    println!("  up to date: {}", ui::value(report.up_to_date.len()));
    let failed = if report.failures.is_empty() {
        "0".to_string()
    } else {
        ui::warn(report.failures.len())
    };
    println!("  failed:     {failed}");
    for failure in &report.failures {
        println!(
            "  {} {} {}",
            ui::warn("✗"),
            failure.source.display(),
            ui::dim(first_line(&failure.reason)),
        );
    }
    if !report.failures.is_empty() {
        bail!(
            "{} of {} file(s) failed",
            report.failures.len(),
            report.processed()
        );
    }
    Ok(())
}

async fn run_check(config: &Config, targets: &[String], kind: ArtifactKind) -> Result<()> {
    let root = config.project_root();
    let admitted = collect_sources(config, &root, targets)?;
    if admitted.is_empty() {
        println!("{}", ui::warn("no source files matched"));
        return Ok(());
    }

    let store = Arc::new(
        SandboxedStore::new(&root)
            .with_context(|| format!("project root {} is not usable", root.display()))?,
    );
    // Check never generates, so no real provider is wired in.
    let registry = build_registry(config, &store, Arc::new(NullOracle), &root)?;
    let handler = registry.get(kind)?;

    let mut passed = 0usize;
    let mut failures: Vec<(PathBuf, String)> = Vec::new();
    for source in &admitted {
        let artifact_path = handler.artifact_path(source);
        match store.read_if_exists(&artifact_path).await? {
            None => failures.push((
                source.clone(),
                format!("missing artifact {}", artifact_path.display()),
            )),
            Some(artifact) => {
                let verdict = handler
                    .validate(&ValidateRequest {
                        source_path: source,
                        artifact_path: &artifact_path,
                        artifact: &artifact,
                    })
                    .await?;
                match verdict {
                    None => {
                        passed += 1;
                        println!("{} {}", ui::success("✓"), artifact_path.display());
                    }
                    Some(verdict) => {
                        failures.push((artifact_path, first_line(&verdict).to_string()));
                    }
                }
            }
        }
    }

    for (path, reason) in &failures {
        println!("{} {} {}", ui::warn("✗"), path.display(), ui::dim(reason));
    }
    let failed = if failures.is_empty() {
        "0".to_string()
    } else {
        ui::warn(failures.len())
    };
    println!();
    println!("{} passed, {failed} failed", ui::value(passed));
    if !failures.is_empty() {
        bail!("{} artifact(s) failed validation", failures.len());
    }
    Ok(())
}

// ─── Wiring helpers ─────────────────────────────────────────────────────────

fn build_registry(
    config: &Config,
    store: &Arc<SandboxedStore>,
    oracle: Arc<dyn Oracle>,
    root: &Path,
) -> Result<Arc<HandlerRegistry>> {
    let prompts = Arc::new(PromptEngine::new()?);
    let validation = config
        .handlers
        .unit_tests
        .validate_command
        .as_ref()
        .map(|template| {
            ValidationCommand::new(template, config.handlers.unit_tests.timeout_secs, root)
        });

    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(UnitTestHandler::new(
        ConversationEngine::new(store.clone(), config.engine.max_iterations),
        prompts.clone(),
        oracle.clone(),
        config.oracle.model.clone(),
        config.oracle.temperature,
        validation,
    )));
    registry.register(Arc::new(DocHandler::new(
        ConversationEngine::new(store.clone(), config.engine.max_iterations),
        prompts,
        oracle,
        config.oracle.model.clone(),
        config.oracle.temperature,
    )));
    Ok(Arc::new(registry))
}

/// Expand CLI targets (or the configured includes) into a deduplicated,
/// exclusion-filtered list of project-relative source paths.
fn collect_sources(config: &Config, root: &Path, targets: &[String]) -> Result<Vec<PathBuf>> {
    let patterns: Vec<String> = if targets.is_empty() {
        config.project.include.clone()
    } else {
        targets.to_vec()
    };
    let sources = expand_targets(root, &patterns)?;
    let exclude = compile_globs(&config.project.exclude)?;
    Ok(filter_excluded(&sources, &exclude))
}

fn expand_targets(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for pattern in patterns {
        let rooted = root.join(pattern);
        let rooted = rooted.to_string_lossy();
        let mut matched = false;
        for entry in
            glob::glob(&rooted).with_context(|| format!("bad target pattern: {pattern}"))?
        {
            let path = entry.with_context(|| format!("unreadable match for {pattern}"))?;
            if path.is_file() {
                matched = true;
                let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                sources.push(relative);
            }
        }
        // A literal path with no matches still goes through, so the batch
        // records a per-file failure instead of silently skipping it.
        if !matched && !pattern.contains(['*', '?', '[']) {
            sources.push(PathBuf::from(pattern));
        }
    }
    sources.sort();
    sources.dedup();
    Ok(sources)
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
