use super::{
    ArtifactHandler, ArtifactKind, FixRequest, GenerateRequest, ValidateRequest, Verdict,
    prompt_error,
};
use crate::engine::{ConversationEngine, EngineRunParams};
use crate::error::HandlerError;
use crate::oracle::Oracle;
use crate::prompt::PromptEngine;
use crate::protocol::ArtifactAction;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

const ARTIFACT_LABEL: &str = "documentation";

/// Produces sibling markdown reference docs. Validation is structural: docs
/// have no runnable form, so the check is shape, not execution.
pub struct DocHandler {
    engine: ConversationEngine,
    prompts: Arc<PromptEngine>,
    oracle: Arc<dyn Oracle>,
    model: String,
    temperature: f64,
}

impl DocHandler {
    pub fn new(
        engine: ConversationEngine,
        prompts: Arc<PromptEngine>,
        oracle: Arc<dyn Oracle>,
        model: impl Into<String>,
        temperature: f64,
    ) -> Self {
        Self {
            engine,
            prompts,
            oracle,
            model: model.into(),
            temperature,
        }
    }

    fn run_params<'a>(&'a self, system: &'a str, user: &'a str) -> EngineRunParams<'a> {
        EngineRunParams {
            oracle: &*self.oracle,
            model: &self.model,
            temperature: self.temperature,
            system_prompt: system,
            user_prompt: user,
        }
    }
}

impl ArtifactHandler for DocHandler {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Docs
    }

    /// `src/math.ts` becomes `src/math.md`.
    fn artifact_path(&self, source_path: &Path) -> PathBuf {
        source_path.with_extension("md")
    }

    fn generate<'a>(
        &'a self,
        req: &'a GenerateRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, HandlerError>> + Send + 'a>> {
        Box::pin(async move {
            let system = self
                .prompts
                .protocol_system(ARTIFACT_LABEL)
                .map_err(prompt_error)?;
            let user = self
                .prompts
                .doc_generation(
                    &req.source_path.display().to_string(),
                    req.source,
                    &req.artifact_path.display().to_string(),
                )
                .map_err(prompt_error)?;
            Ok(self.engine.run(self.run_params(&system, &user)).await?)
        })
    }

    fn validate<'a>(
        &'a self,
        req: &'a ValidateRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Verdict, HandlerError>> + Send + 'a>> {
        Box::pin(async move { Ok(structural_verdict(req.artifact)) })
    }

    fn fix<'a>(
        &'a self,
        req: &'a FixRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, HandlerError>> + Send + 'a>> {
        Box::pin(async move {
            let system = self
                .prompts
                .protocol_system(ARTIFACT_LABEL)
                .map_err(prompt_error)?;
            let user = self
                .prompts
                .healing(
                    &req.artifact_path.display().to_string(),
                    req.verdict,
                    req.current,
                    &req.source_path.display().to_string(),
                    req.source,
                )
                .map_err(prompt_error)?;
            let current = req.current.to_string();
            let code = self
                .engine
                .run_with_interceptor(self.run_params(&system, &user), move |result| {
                    (result.action == ArtifactAction::Success && result.code.trim().is_empty())
                        .then(|| current.clone())
                })
                .await?;
            Ok(code)
        })
    }
}

fn structural_verdict(artifact: &str) -> Verdict {
    let trimmed = artifact.trim();
    if trimmed.is_empty() {
        return Some("documentation file is empty".to_string());
    }
    if trimmed.starts_with("```") {
        return Some(
            "documentation is wrapped in a code fence instead of markdown prose".to_string(),
        );
    }
    if !trimmed.starts_with("# ") {
        return Some("documentation must start with a level-one heading".to_string());
    }
    None
}
