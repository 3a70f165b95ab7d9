//! Provider streaming tests
//!
//! Each provider client runs against a local fake upstream that speaks the
//! provider's SSE dialect, then the full extraction pipeline is applied.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::{Value, json};
use serial_test::serial;
use tokio::net::TcpListener;

use mindflow::config::LlmConfig;
use mindflow::domain::Priority;
use mindflow::extract::{Extraction, Extractor, FallbackReason, LlmInvoker, SYSTEM_PROMPT};
use mindflow::llm::create_client;

const KEY_VAR: &str = "MINDFLOW_PROVIDER_TEST_KEY";
const KEY: &str = "test-key";

const FRAGMENTS: [&str; 3] = [
    "Aquí están tus tareas:\n[{\"title\":\"Comprar leche\",",
    "\"category\":\"Cocinar\",\"priority\":\"alta\",",
    "\"effort\":1}]",
];

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Option<Value>>>);

impl Captured {
    fn store(&self, body: Value) {
        *self.0.lock().unwrap() = Some(body);
    }

    fn body(&self) -> Value {
        self.0.lock().unwrap().clone().expect("upstream saw a request")
    }
}

async fn spawn_upstream(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await });
    format!("http://{}", addr)
}

fn sse(events: Vec<String>) -> Response {
    ([(header::CONTENT_TYPE, "text/event-stream")], events.concat()).into_response()
}

fn set_key() {
    // SAFETY: every test in this file is #[serial]
    unsafe { std::env::set_var(KEY_VAR, KEY) };
}

async fn run(provider: &str, base_url: &str, text: &str) -> Extraction {
    let config = LlmConfig {
        provider: provider.to_string(),
        model: Some("test-model".to_string()),
        api_key_env: Some(KEY_VAR.to_string()),
        base_url: Some(base_url.to_string()),
        ..Default::default()
    };
    let client = create_client(&config).expect("client");
    let invoker = LlmInvoker::new(client, vec!["Cocinar".to_string()], 1024);
    Extractor::new(Arc::new(invoker), Duration::from_secs(10)).run(text).await
}

fn assert_comprar_leche(extraction: &Extraction) {
    assert!(extraction.fallback.is_none(), "unexpected fallback: {:?}", extraction.fallback);
    assert_eq!(extraction.tasks.len(), 1);
    let task = &extraction.tasks[0];
    assert_eq!(task.title, "Comprar leche");
    assert_eq!(task.category, "Cocinar");
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.notes.as_deref(), Some("Estimated effort: 1"));
}

// =============================================================================
// Gemini
// =============================================================================

async fn gemini_handler(State(captured): State<Captured>, headers: HeaderMap, body: String) -> Response {
    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some(KEY) {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }
    captured.store(serde_json::from_str(&body).unwrap_or(Value::Null));

    let mut events: Vec<String> = FRAGMENTS
        .iter()
        .map(|f| {
            let chunk = json!({ "candidates": [{ "content": { "parts": [{ "text": f }], "role": "model" } }] });
            format!("data: {}\n\n", chunk)
        })
        .collect();
    let last = json!({
        "candidates": [{ "content": { "parts": [], "role": "model" }, "finishReason": "STOP" }],
        "usageMetadata": { "promptTokenCount": 40, "candidatesTokenCount": 12 }
    });
    events.push(format!("data: {}\n\n", last));
    sse(events)
}

fn gemini_app(captured: Captured) -> Router {
    Router::new()
        .route("/v1beta/models/{model_action}", post(gemini_handler))
        .with_state(captured)
}

#[tokio::test]
#[serial]
async fn test_gemini_stream_extracts_tasks() {
    set_key();
    let captured = Captured::default();
    let base = spawn_upstream(gemini_app(captured.clone())).await;

    let extraction = run("gemini", &base, "comprar leche").await;

    assert_comprar_leche(&extraction);
    let body = captured.body();
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], SYSTEM_PROMPT);
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("comprar leche"));
    assert!(prompt.contains("Cocinar"));
}

#[tokio::test]
#[serial]
async fn test_gemini_unauthorized_falls_back() {
    // SAFETY: serialized
    unsafe { std::env::set_var(KEY_VAR, "wrong-key") };
    let base = spawn_upstream(gemini_app(Captured::default())).await;

    let extraction = run("gemini", &base, "comprar leche").await;

    assert_eq!(extraction.fallback, Some(FallbackReason::Transport));
    assert_eq!(extraction.tasks[0].title, "comprar leche");
}

#[tokio::test]
#[serial]
async fn test_missing_api_key_falls_back() {
    // SAFETY: serialized
    unsafe { std::env::remove_var(KEY_VAR) };
    let captured = Captured::default();
    let base = spawn_upstream(gemini_app(captured.clone())).await;

    let extraction = run("gemini", &base, "call mom").await;

    assert_eq!(extraction.fallback, Some(FallbackReason::Transport));
    assert!(captured.0.lock().unwrap().is_none(), "no request without a key");
}

// =============================================================================
// Anthropic
// =============================================================================

async fn anthropic_handler(headers: HeaderMap) -> Response {
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some(KEY) {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }

    let mut events = vec![format!(
        "event: message_start\ndata: {}\n\n",
        json!({ "type": "message_start", "message": { "usage": { "input_tokens": 40 } } })
    )];
    for f in FRAGMENTS {
        let delta = json!({ "type": "content_block_delta", "index": 0, "delta": { "type": "text_delta", "text": f } });
        events.push(format!("event: content_block_delta\ndata: {}\n\n", delta));
    }
    events.push(format!(
        "event: message_delta\ndata: {}\n\n",
        json!({ "type": "message_delta", "delta": { "stop_reason": "end_turn" }, "usage": { "output_tokens": 12 } })
    ));
    events.push(format!("event: message_stop\ndata: {}\n\n", json!({ "type": "message_stop" })));
    sse(events)
}

#[tokio::test]
#[serial]
async fn test_anthropic_stream_extracts_tasks() {
    set_key();
    let base = spawn_upstream(Router::new().route("/v1/messages", post(anthropic_handler))).await;

    let extraction = run("anthropic", &base, "comprar leche").await;

    assert_comprar_leche(&extraction);
}

// =============================================================================
// OpenAI
// =============================================================================

async fn openai_handler(headers: HeaderMap) -> Response {
    let expected = format!("Bearer {}", KEY);
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }

    let mut events: Vec<String> = FRAGMENTS
        .iter()
        .map(|f| format!("data: {}\n\n", json!({ "choices": [{ "delta": { "content": f }, "finish_reason": null }] })))
        .collect();
    events.push(format!(
        "data: {}\n\n",
        json!({ "choices": [{ "delta": {}, "finish_reason": "stop" }] })
    ));
    events.push(format!(
        "data: {}\n\n",
        json!({ "choices": [], "usage": { "prompt_tokens": 40, "completion_tokens": 12 } })
    ));
    events.push("data: [DONE]\n\n".to_string());
    sse(events)
}

#[tokio::test]
#[serial]
async fn test_openai_stream_extracts_tasks() {
    set_key();
    let base = spawn_upstream(Router::new().route("/v1/chat/completions", post(openai_handler))).await;

    let extraction = run("openai", &base, "comprar leche").await;

    assert_comprar_leche(&extraction);
}

#[tokio::test]
#[serial]
async fn test_openai_rate_limited_falls_back() {
    set_key();
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "3")], "slow down") }),
    );
    let base = spawn_upstream(app).await;

    let extraction = run("openai", &base, "comprar leche").await;

    assert_eq!(extraction.fallback, Some(FallbackReason::Transport));
}
