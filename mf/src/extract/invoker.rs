//! Model invokers
//!
//! A [`ModelInvoker`] turns brain-dump text into a live stream of model text
//! fragments. [`LlmInvoker`] talks to a provider directly; [`RemoteInvoker`]
//! reads the streamed body of a running server's classify endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::debug;

use super::prompt::build_request;
use crate::llm::{LlmClient, LlmError, StreamChunk};

/// Source of raw model text for one brain dump
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Stream model output fragments in arrival order
    ///
    /// Returns once the stream ends. Any transport or authorization failure
    /// ends the call with a single error.
    async fn invoke(&self, text: &str, chunk_tx: mpsc::Sender<String>) -> Result<(), LlmError>;
}

/// Run an invoker to completion and concatenate its fragments
pub async fn collect(invoker: &dyn ModelInvoker, text: &str) -> Result<String, LlmError> {
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let gather = async {
        let mut full = String::new();
        while let Some(fragment) = rx.recv().await {
            full.push_str(&fragment);
        }
        full
    };

    let (result, full) = tokio::join!(invoker.invoke(text, tx), gather);
    result.map(|()| full)
}

/// Invoker backed by an [`LlmClient`]
pub struct LlmInvoker {
    llm: Arc<dyn LlmClient>,
    categories: Vec<String>,
    max_tokens: u32,
}

impl LlmInvoker {
    pub fn new(llm: Arc<dyn LlmClient>, categories: Vec<String>, max_tokens: u32) -> Self {
        Self {
            llm,
            categories,
            max_tokens,
        }
    }
}

#[async_trait]
impl ModelInvoker for LlmInvoker {
    async fn invoke(&self, text: &str, chunk_tx: mpsc::Sender<String>) -> Result<(), LlmError> {
        debug!(text_len = text.len(), "LlmInvoker::invoke: called");
        let request = build_request(text, &self.categories, self.max_tokens);
        let (tx, mut rx) = mpsc::channel::<StreamChunk>(64);

        let forward = async {
            while let Some(chunk) = rx.recv().await {
                if let StreamChunk::TextDelta(fragment) = chunk
                    && chunk_tx.send(fragment).await.is_err()
                {
                    debug!("LlmInvoker::invoke: receiver dropped");
                    break;
                }
            }
        };

        let (result, ()) = tokio::join!(self.llm.stream(request, tx), forward);
        result.map(|response| {
            debug!(?response.stop_reason, ?response.usage, "LlmInvoker::invoke: done");
        })
    }
}

/// Invoker that calls a MindFlow server's `POST /api/classify-tasks`
pub struct RemoteInvoker {
    http: Client,
    endpoint: String,
}

impl RemoteInvoker {
    /// `server` is the base URL, e.g. `http://127.0.0.1:3000`
    pub fn new(server: &str) -> Self {
        Self {
            http: Client::new(),
            endpoint: format!("{}/api/classify-tasks", server.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Split off the longest valid UTF-8 prefix of `pending`
///
/// A character cut across two network reads stays buffered until its
/// remaining bytes arrive.
fn take_utf8_prefix(pending: &mut Vec<u8>) -> Option<String> {
    let valid = match std::str::from_utf8(pending) {
        Ok(s) => s.len(),
        Err(e) => e.valid_up_to(),
    };
    if valid == 0 {
        return None;
    }
    let prefix: Vec<u8> = pending.drain(..valid).collect();
    Some(String::from_utf8_lossy(&prefix).into_owned())
}

#[async_trait]
impl ModelInvoker for RemoteInvoker {
    async fn invoke(&self, text: &str, chunk_tx: mpsc::Sender<String>) -> Result<(), LlmError> {
        debug!(endpoint = %self.endpoint, text_len = text.len(), "RemoteInvoker::invoke: called");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            let err = LlmError::from_response(response).await;
            debug!(%err, "RemoteInvoker::invoke: server error");
            return Err(err);
        }

        let mut stream = response.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();

        while let Some(chunk) = stream.next().await {
            pending.extend_from_slice(&chunk?);
            if let Some(fragment) = take_utf8_prefix(&mut pending) {
                let _ = chunk_tx.send(fragment).await;
            }
        }

        if !pending.is_empty() {
            let _ = chunk_tx.send(String::from_utf8_lossy(&pending).into_owned()).await;
        }

        Ok(())
    }
}
