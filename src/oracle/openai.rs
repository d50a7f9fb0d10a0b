use super::traits::Oracle;
use super::types::{ChatCompletion, CompletionRequest};
use crate::error::OracleError;
use crate::redact;
use reqwest::{Client, StatusCode, header};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use url::Url;

const PROVIDER: &str = "openai";
const CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiOracle {
    client: Client,
    endpoint: Url,
    auth_header: String,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl OpenAiOracle {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            client,
            endpoint: chat_completions_url(base_url)?,
            auth_header: format!("Bearer {api_key}"),
        })
    }

    async fn classify_failure(&self, response: reqwest::Response) -> OracleError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
        let message = redact::sanitize_error_text(&body);
        let lower = message.to_lowercase();
        let quota_marker =
            lower.contains("insufficient_quota") || lower.contains("exceeded your current quota");

        if status == StatusCode::TOO_MANY_REQUESTS {
            if quota_marker || lower.contains("billing") {
                return OracleError::QuotaExhausted {
                    provider: PROVIDER.to_string(),
                };
            }
            return OracleError::RateLimited {
                provider: PROVIDER.to_string(),
                retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            };
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return OracleError::Auth {
                provider: PROVIDER.to_string(),
            };
        }

        if quota_marker {
            return OracleError::QuotaExhausted {
                provider: PROVIDER.to_string(),
            };
        }

        OracleError::Request {
            provider: PROVIDER.to_string(),
            message: format!("HTTP {status}: {message}"),
        }
    }
}

impl Oracle for OpenAiOracle {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<ChatCompletion, OracleError>> + Send + 'a>> {
        Box::pin(async move {
            let body = WireRequest {
                model: request.model,
                temperature: request.temperature,
                messages: request
                    .messages
                    .iter()
                    .map(|msg| WireMessage {
                        role: msg.role.as_str(),
                        content: &msg.text,
                    })
                    .collect(),
            };

            let response = self
                .client
                .post(self.endpoint.clone())
                .header(header::AUTHORIZATION, &self.auth_header)
                .json(&body)
                .send()
                .await
                .map_err(|err| OracleError::Request {
                    provider: PROVIDER.to_string(),
                    message: redact::sanitize_error_text(&err.to_string()),
                })?;

            if !response.status().is_success() {
                return Err(self.classify_failure(response).await);
            }

            response
                .json::<ChatCompletion>()
                .await
                .map_err(|err| OracleError::Decode {
                    provider: PROVIDER.to_string(),
                    message: err.to_string(),
                })
        })
    }
}

fn chat_completions_url(base_url: &str) -> anyhow::Result<Url> {
    let joined = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    Url::parse(&joined)
        .map_err(|err| anyhow::anyhow!("invalid oracle base url {base_url:?}: {err}"))
}
