use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `mendforge`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum MendError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Oracle / Provider ───────────────────────────────────────────────
    #[error("oracle: {0}")]
    Oracle(#[from] OracleError),

    // ── Conversation engine ─────────────────────────────────────────────
    #[error("engine: {0}")]
    Engine(#[from] EngineError),

    // ── File store ──────────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Artifact handlers ───────────────────────────────────────────────
    #[error("handler: {0}")]
    Handler(#[from] HandlerError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MendError {
    /// True when the underlying cause is a provider failure that retrying or
    /// healing cannot recover from (rate limit, exhausted quota, bad
    /// credentials). Callers abort the current run instead of looping.
    pub fn is_fatal_provider(&self) -> bool {
        match self {
            Self::Oracle(err) => err.is_fatal(),
            Self::Engine(EngineError::Oracle(err)) => err.is_fatal(),
            Self::Handler(HandlerError::Engine(EngineError::Oracle(err))) => err.is_fatal(),
            _ => false,
        }
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Oracle / Provider errors ───────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("provider {provider} request failed: {message}")]
    Request { provider: String, message: String },

    #[error("provider {provider} rate-limited (retry after {retry_after_secs}s)")]
    RateLimited {
        provider: String,
        retry_after_secs: u64,
    },

    #[error("provider {provider} quota exhausted")]
    QuotaExhausted { provider: String },

    #[error("provider {provider} authentication failed")]
    Auth { provider: String },

    #[error("provider {provider} returned an unreadable completion: {message}")]
    Decode { provider: String, message: String },
}

impl OracleError {
    /// Fatal provider failures skip every retry and healing layer: the next
    /// attempt would hit the same wall.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::QuotaExhausted { .. } | Self::Auth { .. } => true,
            Self::Request { message, .. } => has_quota_or_auth_marker(message),
            Self::Decode { .. } => false,
        }
    }
}

/// Quota and authentication failures do not always arrive as clean status
/// codes; some providers bury them in the error body.
fn has_quota_or_auth_marker(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("insufficient_quota")
        || lower.contains("exceeded your current quota")
        || lower.contains("billing hard limit")
        || lower.contains("invalid api key")
        || lower.contains("incorrect api key")
        || lower.contains("invalid_api_key")
}

// ─── Conversation engine errors ─────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("oracle returned no choices")]
    EmptyOracleResponse,

    #[error("oracle returned a choice with empty content")]
    InvalidOracleResponse,

    #[error("malformed protocol turn: {0}")]
    MalformedProtocolResponse(String),

    #[error("conversation budget exhausted after {limit} turns")]
    IterationBudgetExceeded { limit: usize },

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

// ─── File store errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("access denied for {path}: {reason}")]
    Denied { path: String, reason: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Artifact handler errors ────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("no handler registered for artifact kind {kind}")]
    UnknownKind { kind: String },

    #[error("validation command failed to run: {message}")]
    Command { message: String },

    #[error("prompt template failed: {message}")]
    Prompt { message: String },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, MendError>;
