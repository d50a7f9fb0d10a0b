pub mod resolver;

use crate::error::EngineError;
use crate::oracle::{CompletionRequest, Oracle};
use crate::protocol::{ArtifactResult, ChatMessage, OracleReply, strip_code_fences};
use crate::store::SandboxedStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default conversation budget per engine run.
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Absolute ceiling regardless of configuration.
const ITERATION_HARD_CAP: usize = 25;

/// Bounded multi-turn exchange with the oracle.
///
/// Each run owns a private transcript: system prompt, user prompt, then one
/// oracle turn per iteration. A turn either requests file context (resolved
/// through the sandboxed store and appended as a user message) or delivers a
/// terminal artifact. The run ends on an artifact, a protocol violation, or
/// budget exhaustion; nothing is retried inside a run.
pub struct ConversationEngine {
    store: Arc<SandboxedStore>,
    max_iterations: usize,
}

/// Per-run inputs. The oracle is borrowed per run so one engine can serve
/// many runs against different providers.
pub struct EngineRunParams<'a> {
    pub oracle: &'a dyn Oracle,
    pub model: &'a str,
    pub temperature: f64,
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
}

impl ConversationEngine {
    pub fn new(store: Arc<SandboxedStore>, max_iterations: usize) -> Self {
        Self {
            store,
            max_iterations: max_iterations.clamp(1, ITERATION_HARD_CAP),
        }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Run to completion, returning the artifact code with any whole-body
    /// markdown fence stripped.
    pub async fn run(&self, params: EngineRunParams<'_>) -> Result<String, EngineError> {
        self.run_with_interceptor(params, |_| None).await
    }

    /// Run with a success interceptor. When the oracle delivers an artifact,
    /// `on_success` sees the parsed result first; returning `Some` replaces
    /// the run's output, returning `None` falls back to the default fence
    /// stripping.
    pub async fn run_with_interceptor<F>(
        &self,
        params: EngineRunParams<'_>,
        on_success: F,
    ) -> Result<String, EngineError>
    where
        F: Fn(&ArtifactResult) -> Option<String> + Send,
    {
        let mut transcript = vec![
            ChatMessage::system(params.system_prompt),
            ChatMessage::user(params.user_prompt),
        ];
        let mut iteration = 0usize;

        loop {
            if iteration >= self.max_iterations {
                return Err(EngineError::IterationBudgetExceeded {
                    limit: self.max_iterations,
                });
            }
            iteration += 1;

            let request = CompletionRequest {
                model: params.model,
                temperature: params.temperature,
                messages: &transcript,
            };
            let completion = params.oracle.complete(&request).await?;

            let choice = completion
                .choices
                .into_iter()
                .next()
                .ok_or(EngineError::EmptyOracleResponse)?;
            let raw = choice.message.content.unwrap_or_default();
            if raw.trim().is_empty() {
                return Err(EngineError::InvalidOracleResponse);
            }

            // A turn that fails to parse is immediately fatal for the run.
            // Feeding parse errors back to the oracle hides real protocol
            // drift, so the strict path is taken instead.
            let reply = OracleReply::parse(&raw).map_err(|err| {
                warn!(iteration, "oracle broke protocol: {err:#}");
                EngineError::MalformedProtocolResponse(format!("{err:#}"))
            })?;

            match reply {
                OracleReply::Artifact(result) => {
                    debug!(iteration, action = %result.action, "terminal artifact turn");
                    if let Some(replacement) = on_success(&result) {
                        return Ok(replacement);
                    }
                    return Ok(strip_code_fences(&result.code));
                }
                OracleReply::FileRequest { files } => {
                    debug!(iteration, requested = files.len(), "file request turn");
                    // The raw assistant turn stays in the transcript so the
                    // oracle keeps its own reasoning in view next turn.
                    transcript.push(ChatMessage::assistant(raw));
                    let resolved = resolver::resolve_requested_files(&self.store, &files).await;
                    transcript.push(ChatMessage::user(resolver::render_context_message(
                        &resolved,
                    )));
                }
            }
        }
    }
}
