use std::sync::Arc;
use std::time::Duration;

use mendforge::error::OracleError;
use mendforge::oracle::{CompletionRequest, OpenAiOracle, Oracle, ReliableOracle};
use mendforge::protocol::ChatMessage;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oracle_for(server: &MockServer) -> OpenAiOracle {
    OpenAiOracle::new(&server.uri(), "test-key", Duration::from_secs(5)).expect("oracle")
}

fn request_messages() -> Vec<ChatMessage> {
    vec![ChatMessage::system("be terse"), ChatMessage::user("hi")]
}

async fn complete_against(server: &MockServer) -> Result<mendforge::oracle::ChatCompletion, OracleError> {
    let oracle = oracle_for(server);
    let messages = request_messages();
    let request = CompletionRequest {
        model: "gpt-4o-mini",
        temperature: 0.2,
        messages: &messages,
    };
    oracle.complete(&request).await
}

#[tokio::test]
async fn successful_completion_round_trips_choice_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "hello world"}, "finish_reason": "stop"}],
            "model": "gpt-4o-mini",
        })))
        .mount(&server)
        .await;

    let completion = complete_against(&server).await.expect("completion");
    assert_eq!(
        completion.choices[0].message.content.as_deref(),
        Some("hello world")
    );
    assert_eq!(completion.model.as_deref(), Some("gpt-4o-mini"));
}

#[tokio::test]
async fn request_body_carries_model_and_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.2,
            "messages": [
                {"role": "system", "content": "be terse"},
                {"role": "user", "content": "hi"},
            ],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}}],
        })))
        .mount(&server)
        .await;

    let completion = complete_against(&server).await.expect("completion");
    assert_eq!(completion.choices[0].message.content.as_deref(), Some("ok"));
}

#[tokio::test]
async fn unauthorized_maps_to_a_fatal_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"error":{"message":"Incorrect API key provided"}}"#),
        )
        .mount(&server)
        .await;

    let err = complete_against(&server).await.expect_err("must fail");
    assert!(matches!(err, OracleError::Auth { .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn rate_limit_carries_the_retry_after_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_string("slow down"),
        )
        .mount(&server)
        .await;

    let err = complete_against(&server).await.expect_err("must fail");
    assert!(matches!(
        err,
        OracleError::RateLimited {
            retry_after_secs: 7,
            ..
        }
    ));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn rate_limit_without_a_header_uses_the_default_delay() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = complete_against(&server).await.expect_err("must fail");
    assert!(matches!(
        err,
        OracleError::RateLimited {
            retry_after_secs: 30,
            ..
        }
    ));
}

#[tokio::test]
async fn quota_exhaustion_is_detected_in_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string(
            r#"{"error":{"type":"insufficient_quota","message":"You exceeded your current quota"}}"#,
        ))
        .mount(&server)
        .await;

    let err = complete_against(&server).await.expect_err("must fail");
    assert!(matches!(err, OracleError::QuotaExhausted { .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn server_error_bodies_are_redacted_and_truncated() {
    let server = MockServer::start().await;
    let leaked = format!(
        "leaked key sk-test1234567890abcdef then {}",
        "z".repeat(400)
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string(leaked))
        .mount(&server)
        .await;

    let err = complete_against(&server).await.expect_err("must fail");
    let OracleError::Request { message, .. } = &err else {
        panic!("expected a request error, got {err:?}");
    };
    assert!(message.contains("HTTP 500"));
    assert!(message.contains("[REDACTED_API_KEY_"));
    assert!(!message.contains("sk-test1234567890abcdef"));
    assert!(message.ends_with("..."));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = complete_against(&server).await.expect_err("must fail");
    assert!(matches!(err, OracleError::Decode { .. }));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn transient_server_errors_are_retried_by_the_reliable_wrapper() {
    let server = MockServer::start().await;
    // The flaky mock stops matching after one response; the fallback below
    // then serves the success.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("transient"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "recovered"}}],
        })))
        .mount(&server)
        .await;

    let oracle = ReliableOracle::new(Arc::new(oracle_for(&server)), 2);
    let messages = request_messages();
    let request = CompletionRequest {
        model: "gpt-4o-mini",
        temperature: 0.2,
        messages: &messages,
    };

    let completion = oracle.complete(&request).await.expect("completion");
    assert_eq!(
        completion.choices[0].message.content.as_deref(),
        Some("recovered")
    );
    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 2);
}
