//! Extraction endpoints
//!
//! `POST /api/classify-tasks` proxies raw model text back to the caller as
//! it streams. `POST /api/brain-dump` runs the whole pipeline server-side.

use std::io;

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use futures::stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{AppState, ServerError};
use crate::domain::Task;
use crate::llm::LlmError;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

#[derive(Debug, Deserialize)]
struct ClassifyRequest {
    #[serde(default)]
    text: Option<String>,
}

/// Pull `text` out of a request body; anything unusable is a 400
fn required_text(body: &[u8]) -> Result<String, ServerError> {
    serde_json::from_slice::<ClassifyRequest>(body)
        .ok()
        .and_then(|req| req.text)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest("Text is required".to_string()))
}

/// Spawned model invocation, aborted when dropped
///
/// The response body owns it; a client disconnect stops the upstream call.
struct Invocation(JoinHandle<Result<(), LlmError>>);

impl Invocation {
    fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), LlmError>> + Send + 'static,
    {
        Self(tokio::spawn(future))
    }

    /// Surface how the invocation ended once its fragments are drained
    async fn finish(mut self) -> Result<(), LlmError> {
        match (&mut self.0).await {
            Ok(result) => result,
            Err(e) => Err(LlmError::InvalidResponse(e.to_string())),
        }
    }
}

impl Drop for Invocation {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// POST /api/classify-tasks
///
/// Failure before the first fragment is a 500. Once fragments have been sent
/// the status is committed, so a later failure aborts the body instead.
pub async fn classify_tasks(State(state): State<AppState>, body: Bytes) -> Result<Response, ServerError> {
    let text = required_text(&body)?;
    debug!(text_len = text.len(), "classify_tasks: called");

    let invoker = state.session.extractor().invoker();
    let timeout = state.session.extractor().timeout();
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let handle = Invocation::spawn(async move {
        match tokio::time::timeout(timeout, invoker.invoke(&text, tx)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(timeout)),
        }
    });

    let Some(first) = rx.recv().await else {
        return match handle.finish().await {
            Ok(()) => Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], "").into_response()),
            Err(e) => {
                warn!(error = %e, "classify_tasks: model invocation failed");
                Err(ServerError::Upstream)
            }
        };
    };

    let rest = stream::unfold((rx, Some(handle)), |(mut rx, handle)| async move {
        if let Some(fragment) = rx.recv().await {
            return Some((Ok::<_, io::Error>(Bytes::from(fragment)), (rx, handle)));
        }
        match handle?.finish().await {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "classify_tasks: stream failed after first fragment");
                Some((Err(io::Error::other(e.to_string())), (rx, None)))
            }
        }
    });
    let body = stream::once(async move { Ok::<_, io::Error>(Bytes::from(first)) }).chain(rest);

    Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], Body::from_stream(body)).into_response())
}

/// POST /api/brain-dump
///
/// Rejects bodies exactly as the classify endpoint does.
pub async fn brain_dump(State(state): State<AppState>, body: Bytes) -> Result<Json<Vec<Task>>, ServerError> {
    let text = required_text(&body)?;
    debug!(text_len = text.len(), "brain_dump: called");
    let tasks = state.session.submit_brain_dump(&text).await?;
    Ok(Json(tasks))
}
