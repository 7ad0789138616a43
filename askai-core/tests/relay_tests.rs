//! Tests for the relay retry loop against a scripted upstream

use askai_core::http::{HttpExecutor, RequestOptions, UpstreamError, UpstreamReply};
use askai_core::providers::gemini::{GenerateContentRequest, NO_TEXT_PLACEHOLDER};
use askai_core::{
    BackoffPlan, ErrorKind, RelayConfig, RelayHandler, PROMPT_REQUIRED, RATE_LIMIT_TIP,
};
use async_trait::async_trait;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Upstream that plays back a fixed script, then repeats `fallback`
struct ScriptedUpstream {
    script: Mutex<VecDeque<Result<UpstreamReply, UpstreamError>>>,
    fallback: Result<UpstreamReply, UpstreamError>,
    calls: AtomicU32,
    seen: Mutex<Vec<(Uuid, u32, String)>>,
}

impl ScriptedUpstream {
    fn new(
        script: Vec<Result<UpstreamReply, UpstreamError>>,
        fallback: Result<UpstreamReply, UpstreamError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn always(reply: Result<UpstreamReply, UpstreamError>) -> Arc<Self> {
        Self::new(Vec::new(), reply)
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpExecutor for ScriptedUpstream {
    async fn execute_json(
        &self,
        request: &GenerateContentRequest,
        options: &RequestOptions,
    ) -> Result<UpstreamReply, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request.contents[0].parts.as_ref().unwrap()[0]
            .text
            .clone()
            .unwrap();
        self.seen
            .lock()
            .unwrap()
            .push((options.request_id, options.attempt, prompt));

        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

fn reply(status: u16, body: Value) -> Result<UpstreamReply, UpstreamError> {
    Ok(UpstreamReply { status, body })
}

fn answer_body(parts: &[&str]) -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": parts.iter().map(|t| json!({ "text": t })).collect::<Vec<_>>()
            },
            "finishReason": "STOP"
        }]
    })
}

fn rate_limited() -> Result<UpstreamReply, UpstreamError> {
    reply(
        429,
        json!({
            "error": {
                "code": 429,
                "message": "Resource has been exhausted",
                "status": "RESOURCE_EXHAUSTED"
            }
        }),
    )
}

fn network_down() -> Result<UpstreamReply, UpstreamError> {
    Err(UpstreamError::Connect {
        message: "connection refused".to_string(),
        request_id: Uuid::nil(),
    })
}

fn handler(plan: BackoffPlan, upstream: Arc<ScriptedUpstream>) -> RelayHandler {
    let config = RelayConfig::new("test-key").with_backoff(plan);
    RelayHandler::new(Arc::new(config), upstream)
}

fn plan() -> BackoffPlan {
    BackoffPlan::new(4, Duration::from_millis(4_000))
}

#[tokio::test(start_paused = true)]
async fn test_success_returns_concatenated_text() {
    let upstream = ScriptedUpstream::always(reply(200, answer_body(&["Hello", ", ", "world"])));
    let relay = handler(plan(), upstream.clone());

    let outcome = relay.relay("Say hello").await;

    let answer = outcome.result.unwrap();
    assert_eq!(answer.answer, "Hello, world");
    assert!(!answer.placeholder);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.waited, Duration::ZERO);
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_prompt_never_reaches_upstream() {
    let upstream = ScriptedUpstream::always(reply(200, answer_body(&["unused"])));
    let relay = handler(plan(), upstream.clone());

    let outcome = relay.relay("").await;
    let err = outcome.result.unwrap_err();
    assert_eq!(err.status, 400);
    assert_eq!(err.kind, ErrorKind::ClientValidation);
    assert_eq!(err.message, PROMPT_REQUIRED);
    assert_eq!(outcome.attempts, 0);
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_whitespace_prompt_is_relayed() {
    let upstream = ScriptedUpstream::always(reply(200, answer_body(&["ans"])));
    let relay = handler(plan(), upstream.clone());

    for prompt in [" ", "\n\t"] {
        let answer = relay.ask(prompt).await.unwrap();
        assert_eq!(answer.answer, "ans");
    }
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_then_success_waits_linear_backoff() {
    for k in 1..4u32 {
        let script = (0..k).map(|_| rate_limited()).collect();
        let upstream = ScriptedUpstream::new(script, reply(200, answer_body(&["finally"])));
        let relay = handler(plan(), upstream.clone());

        let started = tokio::time::Instant::now();
        let outcome = relay.relay("hi").await;
        let elapsed = started.elapsed();

        let expected: Duration = (1..=k).map(|n| plan().delay_for_attempt(n)).sum();
        assert_eq!(outcome.result.unwrap().answer, "finally");
        assert_eq!(outcome.attempts, k + 1);
        assert_eq!(outcome.waited, expected);
        assert_eq!(elapsed, expected);
        assert_eq!(upstream.calls(), k + 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_always_rate_limited_exhausts_budget() {
    let upstream = ScriptedUpstream::always(rate_limited());
    let relay = handler(plan(), upstream.clone());

    let outcome = relay.relay("hi").await;

    let err = outcome.result.unwrap_err();
    assert_eq!(err.status, 429);
    assert_eq!(err.kind, ErrorKind::UpstreamRateLimited);
    assert!(err.message.contains("rate limit"));
    assert!(err.detail.as_ref().unwrap().contains("RESOURCE_EXHAUSTED"));
    assert_eq!(err.tip(), Some(RATE_LIMIT_TIP));
    assert_eq!(upstream.calls(), 4);
    // 4s + 8s + 12s; no wait after the final attempt
    assert_eq!(outcome.waited, Duration::from_secs(24));
}

#[tokio::test(start_paused = true)]
async fn test_wrapped_rate_limit_message_is_retried() {
    let wrapped = reply(
        500,
        json!({ "error": { "message": "[429 Too Many Requests] quota exceeded" } }),
    );
    let upstream = ScriptedUpstream::new(vec![wrapped], reply(200, answer_body(&["ok"])));
    let relay = handler(plan(), upstream.clone());

    assert_eq!(relay.ask("hi").await.unwrap().answer, "ok");
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_forbidden_is_not_retried() {
    let upstream = ScriptedUpstream::always(reply(
        403,
        json!({ "error": { "message": "permission denied" } }),
    ));
    let relay = handler(plan(), upstream.clone());

    let outcome = relay.relay("hi").await;

    let err = outcome.result.unwrap_err();
    assert_eq!(err.status, 403);
    assert_eq!(err.kind, ErrorKind::UpstreamRejected);
    assert!(err.detail.unwrap().contains("permission denied"));
    assert_eq!(outcome.attempts, 1);
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_server_error_is_not_retried() {
    let upstream = ScriptedUpstream::always(reply(503, json!({})));
    let relay = handler(plan(), upstream.clone());

    let err = relay.ask("hi").await.unwrap_err();
    assert_eq!(err.status, 503);
    assert_eq!(err.detail.as_deref(), Some("{}"));
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_success_without_text_returns_placeholder() {
    let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
    let upstream = ScriptedUpstream::always(reply(200, blocked));
    let relay = handler(plan(), upstream.clone());

    let answer = relay.ask("hi").await.unwrap();
    assert_eq!(answer.answer, NO_TEXT_PLACEHOLDER);
    assert!(answer.placeholder);
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_network_failure_is_retried_then_succeeds() {
    let upstream = ScriptedUpstream::new(vec![network_down()], reply(200, answer_body(&["back"])));
    let relay = handler(plan(), upstream.clone());

    let outcome = relay.relay("hi").await;
    assert_eq!(outcome.result.unwrap().answer, "back");
    assert_eq!(outcome.waited, Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_network_failure_exhausts_as_transport_failure() {
    let upstream = ScriptedUpstream::always(network_down());
    let relay = handler(BackoffPlan::new(3, Duration::from_millis(3_000)), upstream.clone());

    let err = relay.ask("hi").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TransportFailure);
    assert_eq!(err.status, 500);
    assert!(err.detail.unwrap().contains("connection refused"));
    assert_eq!(upstream.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_attempts_share_request_id_and_prompt() {
    let upstream = ScriptedUpstream::new(
        vec![rate_limited(), rate_limited()],
        reply(200, answer_body(&["x"])),
    );
    let relay = handler(plan(), upstream.clone());

    let outcome = relay.relay("same prompt").await;

    let seen = upstream.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 3);
    for (i, (request_id, attempt, prompt)) in seen.iter().enumerate() {
        assert_eq!(*request_id, outcome.request_id);
        assert_eq!(*attempt, i as u32 + 1);
        assert_eq!(prompt, "same prompt");
    }
}

#[tokio::test(start_paused = true)]
async fn test_same_prompt_is_idempotent() {
    let upstream =
        ScriptedUpstream::new(vec![rate_limited()], reply(200, answer_body(&["stable"])));
    let relay = handler(plan(), upstream.clone());

    let first = relay.ask("q").await.unwrap();
    let second = relay.ask("q").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.answer, "stable");
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_relays_do_not_block_each_other() {
    let slow = ScriptedUpstream::always(rate_limited());
    let fast = ScriptedUpstream::always(reply(200, answer_body(&["quick"])));
    let slow_relay = handler(plan(), slow);
    let fast_relay = handler(plan(), fast);

    let slow_task = tokio::spawn(async move { slow_relay.relay("slow").await });
    // let the slow relay reach its first backoff wait
    tokio::task::yield_now().await;
    let started = tokio::time::Instant::now();
    let fast_outcome = fast_relay.relay("fast").await;

    assert_eq!(fast_outcome.result.unwrap().answer, "quick");
    assert_eq!(started.elapsed(), Duration::ZERO);

    let slow_outcome = slow_task.await.unwrap();
    assert_eq!(slow_outcome.result.unwrap_err().status, 429);
}

proptest! {
    #[test]
    fn prop_non_string_prompts_are_rejected(value in prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        proptest::collection::vec(".*", 0..3).prop_map(|v| json!(v)),
        Just(Value::from("")),
    ]) {
        let err = askai_core::PromptRequest::from_json(&json!({ "prompt": value })).unwrap_err();
        prop_assert_eq!(err.status, 400);
    }

    #[test]
    fn prop_success_answer_is_exact_text(text in "[a-zA-Z0-9 \t\n.,!?]{1,64}") {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let upstream = ScriptedUpstream::always(reply(200, answer_body(&[&text])));
        let relay = handler(plan(), upstream);
        let answer = runtime.block_on(relay.ask(&text)).unwrap();
        prop_assert_eq!(answer.answer, text);
    }
}
