use super::traits::Oracle;
use super::types::{ChatCompletion, CompletionRequest};
use crate::error::OracleError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const INITIAL_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 10_000;

/// Retry wrapper around any [`Oracle`].
///
/// Transient transport failures are retried with doubling backoff. Fatal
/// provider failures (rate limit, quota, auth) pass straight through: the
/// next attempt would hit the same wall.
pub struct ReliableOracle {
    inner: Arc<dyn Oracle>,
    max_retries: u32,
}

impl ReliableOracle {
    pub fn new(inner: Arc<dyn Oracle>, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }
}

impl Oracle for ReliableOracle {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<ChatCompletion, OracleError>> + Send + 'a>> {
        Box::pin(async move {
            let mut backoff_ms = INITIAL_BACKOFF_MS;
            let mut attempt: u32 = 0;

            loop {
                match self.inner.complete(request).await {
                    Ok(completion) => return Ok(completion),
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        if attempt >= self.max_retries {
                            return Err(err);
                        }
                        attempt += 1;
                        warn!(
                            provider = self.inner.name(),
                            attempt,
                            error = %err,
                            "oracle call failed, retrying"
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                        backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                    }
                }
            }
        })
    }
}
