//! Integration tests for MindFlow
//!
//! A real server on an ephemeral port, driven over HTTP with reqwest. Model
//! output is scripted with an in-test ModelInvoker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Notify, mpsc};

use mindflow::domain::{Priority, ResourceKind, Status, Task};
use mindflow::extract::{Extractor, FallbackReason, ModelInvoker, RemoteInvoker, TRANSPORT_NOTE, UNCLASSIFIED_NOTE};
use mindflow::llm::LlmError;
use mindflow::server::{self, AppState};
use mindflow::session::Session;
use mindflow::store::StoreManager;

// =============================================================================
// Harness
// =============================================================================

/// Streams fixed fragments, then fails if a failure status is scripted
struct ScriptedInvoker {
    fragments: Vec<String>,
    fail_status: Option<u16>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedInvoker {
    fn streaming(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            fail_status: None,
            gate: None,
        }
    }

    fn failing(status: u16) -> Self {
        Self {
            fragments: vec![],
            fail_status: Some(status),
            gate: None,
        }
    }

    fn breaking_after(fragments: &[&str], status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::streaming(fragments)
        }
    }

    fn gated(fragments: &[&str], gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::streaming(fragments)
        }
    }
}

#[async_trait]
impl ModelInvoker for ScriptedInvoker {
    async fn invoke(&self, _text: &str, chunk_tx: mpsc::Sender<String>) -> Result<(), LlmError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        for fragment in &self.fragments {
            let _ = chunk_tx.send(fragment.clone()).await;
        }
        match self.fail_status {
            Some(status) => Err(LlmError::ApiError {
                status,
                message: "scripted failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}

struct TestServer {
    base: String,
    session: Session,
    http: reqwest::Client,
}

impl TestServer {
    async fn start(invoker: ScriptedInvoker) -> Self {
        let extractor = Extractor::new(Arc::new(invoker), Duration::from_secs(5));
        let session = Session::new(StoreManager::spawn(), Arc::new(extractor));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(server::serve(listener, AppState::new(session.clone()), std::future::pending()));

        Self {
            base: format!("http://{}", addr),
            session,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.http.post(self.url(path)).json(&body).send().await.expect("request")
    }

    async fn task_call(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> Option<Task> {
        let mut req = self.http.request(method, self.url(path));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.expect("request");
        assert_eq!(resp.status(), 200, "{} returned {}", path, resp.status());
        resp.json().await.expect("task json")
    }
}

const BUY_MILK: &str = r#"[{"title":"Buy milk","category":"Shopping","priority":"alta","effort":2}]"#;

// =============================================================================
// Classify endpoint
// =============================================================================

#[tokio::test]
async fn test_classify_streams_raw_model_text() {
    let server = TestServer::start(ScriptedInvoker::streaming(&["Here you go: [", "{\"title\":\"a\"}", "]"])).await;

    let resp = server.post("/api/classify-tasks", json!({ "text": "do a" })).await;

    assert_eq!(resp.status(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(resp.text().await.unwrap(), r#"Here you go: [{"title":"a"}]"#);
}

#[tokio::test]
async fn test_classify_requires_text() {
    let server = TestServer::start(ScriptedInvoker::streaming(&["[]"])).await;

    for body in [json!({}), json!({ "text": "" }), json!({ "text": null })] {
        let resp = server.post("/api/classify-tasks", body).await;
        assert_eq!(resp.status(), 400);
        assert_eq!(resp.text().await.unwrap(), "Text is required");
    }
}

#[tokio::test]
async fn test_classify_upstream_failure_is_500() {
    let server = TestServer::start(ScriptedInvoker::failing(401)).await;

    let resp = server.post("/api/classify-tasks", json!({ "text": "x" })).await;

    assert_eq!(resp.status(), 500);
    assert_eq!(resp.text().await.unwrap(), "Failed to classify tasks");
}

#[tokio::test]
async fn test_classify_failure_after_first_fragment_aborts_body() {
    let server = TestServer::start(ScriptedInvoker::breaking_after(&["[{\"title\":"], 502)).await;

    let resp = server.post("/api/classify-tasks", json!({ "text": "x" })).await;

    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.is_err(), "truncated body must not read as complete");
}

// =============================================================================
// Remote invoker against a live server
// =============================================================================

#[tokio::test]
async fn test_remote_invoker_extracts_through_server() {
    let server = TestServer::start(ScriptedInvoker::streaming(&[&BUY_MILK[..20], &BUY_MILK[20..]])).await;
    let extractor = Extractor::new(Arc::new(RemoteInvoker::new(&server.base)), Duration::from_secs(5));

    let extraction = extractor.run("buy milk").await;

    assert!(extraction.fallback.is_none());
    assert_eq!(extraction.tasks.len(), 1);
    assert_eq!(extraction.tasks[0].title, "Buy milk");
    assert_eq!(extraction.tasks[0].priority, Priority::High);
}

#[tokio::test]
async fn test_remote_invoker_server_error_is_transport_fallback() {
    let server = TestServer::start(ScriptedInvoker::failing(500)).await;
    let extractor = Extractor::new(Arc::new(RemoteInvoker::new(&server.base)), Duration::from_secs(5));

    let extraction = extractor.run("pay rent").await;

    assert_eq!(extraction.fallback, Some(FallbackReason::Transport));
    assert_eq!(extraction.tasks[0].title, "pay rent");
    assert_eq!(extraction.tasks[0].notes.as_deref(), Some(TRANSPORT_NOTE));
}

#[tokio::test]
async fn test_remote_invoker_broken_stream_is_transport_fallback() {
    let server = TestServer::start(ScriptedInvoker::breaking_after(&["[{\"title\":"], 502)).await;
    let extractor = Extractor::new(Arc::new(RemoteInvoker::new(&server.base)), Duration::from_secs(5));

    let extraction = extractor.run("orig").await;

    assert_eq!(extraction.fallback, Some(FallbackReason::Transport));
    let titles: Vec<_> = extraction.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["orig"]);
}

// =============================================================================
// Brain dump endpoint
// =============================================================================

#[tokio::test]
async fn test_brain_dump_appends_to_store() {
    let server = TestServer::start(ScriptedInvoker::streaming(&[BUY_MILK])).await;

    let resp = server.post("/api/brain-dump", json!({ "text": "buy milk" })).await;
    assert_eq!(resp.status(), 200);
    let appended: Vec<Task> = resp.json().await.unwrap();
    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].category, "Shopping");

    let all: Vec<Task> = server.http.get(server.url("/api/tasks")).send().await.unwrap().json().await.unwrap();
    assert_eq!(all, appended);
}

#[tokio::test]
async fn test_brain_dump_unparseable_output_appends_fallback() {
    let server = TestServer::start(ScriptedInvoker::streaming(&["Sorry, no idea."])).await;

    let appended: Vec<Task> = server
        .post("/api/brain-dump", json!({ "text": "stuff to do" }))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].title, "stuff to do");
    assert_eq!(appended[0].notes.as_deref(), Some(UNCLASSIFIED_NOTE));
}

#[tokio::test]
async fn test_brain_dump_empty_text_is_400() {
    let server = TestServer::start(ScriptedInvoker::streaming(&[BUY_MILK])).await;

    let resp = server.post("/api/brain-dump", json!({ "text": "  " })).await;

    assert_eq!(resp.status(), 400);
    assert!(server.session.store().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_brain_dump_rejects_unusable_bodies_like_classify() {
    let server = TestServer::start(ScriptedInvoker::streaming(&[BUY_MILK])).await;

    let malformed = server
        .http
        .post(server.url("/api/brain-dump"))
        .body("not json")
        .send()
        .await
        .expect("request");
    assert_eq!(malformed.status(), 400);
    assert_eq!(malformed.text().await.unwrap(), "Text is required");

    let missing = server.post("/api/brain-dump", json!({})).await;
    assert_eq!(missing.status(), 400);
    assert_eq!(missing.text().await.unwrap(), "Text is required");

    assert!(server.session.store().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_brain_dump_while_pending_is_409() {
    let gate = Arc::new(Notify::new());
    let server = Arc::new(TestServer::start(ScriptedInvoker::gated(&[BUY_MILK], gate.clone())).await);

    let first = {
        let server = server.clone();
        tokio::spawn(async move { server.post("/api/brain-dump", json!({ "text": "first" })).await.status() })
    };
    while !server.session.is_pending() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let second = server.post("/api/brain-dump", json!({ "text": "second" })).await;
    assert_eq!(second.status(), 409);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), 200);
    assert_eq!(server.session.store().list().await.unwrap().len(), 1);
}

// =============================================================================
// Task routes
// =============================================================================

#[tokio::test]
async fn test_task_lifecycle_over_http() {
    use reqwest::Method;

    let server = TestServer::start(ScriptedInvoker::streaming(&["[]"])).await;

    let task = server
        .task_call(
            Method::POST,
            "/api/tasks",
            Some(json!({ "title": "Write essay", "category": "Universidad", "priority": "high" })),
        )
        .await
        .expect("created");
    assert_eq!(task.status, Status::Todo);
    let path = format!("/api/tasks/{}", task.id);

    let updated = server
        .task_call(Method::PATCH, &path, Some(json!({ "notes": "2000 words", "title": "" })))
        .await
        .unwrap();
    assert_eq!(updated.title, "Write essay");
    assert_eq!(updated.notes.as_deref(), Some("2000 words"));
    assert_eq!(updated.created_at, task.created_at);

    let cycle = format!("{}/cycle", path);
    let mut statuses = Vec::new();
    for _ in 0..3 {
        statuses.push(server.task_call(Method::POST, &cycle, None).await.unwrap().status);
    }
    assert_eq!(statuses, vec![Status::InProgress, Status::Done, Status::Todo]);

    let moved = server
        .task_call(Method::PUT, &format!("{}/status", path), Some(json!({ "status": "done" })))
        .await
        .unwrap();
    assert_eq!(moved.status, Status::Done);

    let subtasks = format!("{}/subtasks", path);
    assert!(
        server
            .task_call(Method::POST, &subtasks, Some(json!({ "text": "   " })))
            .await
            .is_none()
    );
    let with_sub = server
        .task_call(Method::POST, &subtasks, Some(json!({ "text": " outline " })))
        .await
        .unwrap();
    let sub = with_sub.subtasks[0].clone();
    assert_eq!(sub.text, "outline");

    let toggled = server
        .task_call(Method::POST, &format!("{}/{}/toggle", subtasks, sub.id), None)
        .await
        .unwrap();
    assert!(toggled.subtasks[0].completed);

    let resources = format!("{}/resources", path);
    let with_note = server
        .task_call(
            Method::POST,
            &resources,
            Some(json!({ "title": "Idea", "content": "Use quotes", "type": "note", "url": "http://ignored" })),
        )
        .await
        .unwrap();
    assert_eq!(with_note.information[0].kind, ResourceKind::Note);
    assert!(with_note.information[0].url.is_none());

    let with_link = server
        .task_call(
            Method::POST,
            &resources,
            Some(json!({ "title": "Guide", "content": "Style", "type": "link", "url": "https://example.com" })),
        )
        .await
        .unwrap();
    assert_eq!(with_link.information[1].url.as_deref(), Some("https://example.com"));

    let note_id = with_note.information[0].id.clone();
    let after = server
        .task_call(Method::DELETE, &format!("{}/{}", resources, note_id), None)
        .await
        .unwrap();
    assert_eq!(after.information.len(), 1);

    let after = server
        .task_call(Method::DELETE, &format!("{}/{}", subtasks, sub.id), None)
        .await
        .unwrap();
    assert!(after.subtasks.is_empty());

    let deleted: Value = server
        .http
        .delete(server.url(&path))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(deleted, json!({ "deleted": true }));
    assert!(server.task_call(Method::GET, &path, None).await.is_none());
}

#[tokio::test]
async fn test_absent_ids_answer_null() {
    use reqwest::Method;

    let server = TestServer::start(ScriptedInvoker::streaming(&["[]"])).await;

    assert!(server.task_call(Method::GET, "/api/tasks/nope", None).await.is_none());
    assert!(server.task_call(Method::POST, "/api/tasks/nope/cycle", None).await.is_none());
    assert!(
        server
            .task_call(Method::PATCH, "/api/tasks/nope", Some(json!({ "title": "x" })))
            .await
            .is_none()
    );
    assert!(
        server
            .task_call(Method::POST, "/api/tasks/nope/subtasks/s/toggle", None)
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_groupings_over_http() {
    use reqwest::Method;

    let server = TestServer::start(ScriptedInvoker::streaming(&["[]"])).await;
    for (title, category, priority) in [
        ("a", "Trabajo", "low"),
        ("b", "Cocinar", "high"),
        ("c", "Trabajo", "high"),
    ] {
        server
            .task_call(
                Method::POST,
                "/api/tasks",
                Some(json!({ "title": title, "category": category, "priority": priority })),
            )
            .await
            .unwrap();
    }

    let by_category: Value = server
        .http
        .get(server.url("/api/tasks/by-category"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let categories: Vec<&str> = by_category
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["category"].as_str().unwrap())
        .collect();
    assert_eq!(categories, vec!["Trabajo", "Cocinar"]);

    let by_status: Value = server
        .http
        .get(server.url("/api/tasks/by-status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let columns = by_status.as_array().unwrap();
    assert_eq!(columns.len(), 3);
    assert_eq!(columns[0]["status"], "todo");
    assert_eq!(columns[1]["status"], "in-progress");
    assert_eq!(columns[2]["status"], "done");
    let todo_titles: Vec<&str> = columns[0]["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(todo_titles, vec!["b", "c", "a"]);
}
