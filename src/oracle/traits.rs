use super::types::{ChatCompletion, CompletionRequest};
use crate::error::OracleError;
use std::future::Future;
use std::pin::Pin;

/// Completion port the conversation engine talks to.
///
/// Implementations own transport, authentication and provider quirks; callers
/// only ever see [`ChatCompletion`] and [`OracleError`].
pub trait Oracle: Send + Sync {
    /// Provider identifier (e.g. "openai").
    fn name(&self) -> &str;

    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<ChatCompletion, OracleError>> + Send + 'a>>;
}

/// Stand-in for modes that never consult the oracle (`check`, dry runs).
/// Any completion attempt is a bug and fails loudly.
pub struct NullOracle;

impl Oracle for NullOracle {
    fn name(&self) -> &str {
        "null"
    }

    fn complete<'a>(
        &'a self,
        _request: &'a CompletionRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<ChatCompletion, OracleError>> + Send + 'a>> {
        Box::pin(async {
            Err(OracleError::Request {
                provider: "null".to_string(),
                message: "oracle calls are disabled in this mode".to_string(),
            })
        })
    }
}
