//! Google Gemini API client implementation
//!
//! Implements the LlmClient trait against the Generative Language API's
//! `streamGenerateContent` endpoint, consumed as server-sent events.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Role, StopReason, StreamChunk, TokenUsage};
use crate::config::ResolvedLlmConfig;

/// Google Gemini API client
pub struct GeminiClient {
    model: String,
    api_key_env: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl GeminiClient {
    /// Create a new client from resolved configuration
    ///
    /// The API key is not read here; see [`super::read_api_key`].
    pub fn from_config(config: &ResolvedLlmConfig) -> Result<Self, LlmError> {
        debug!(?config, "from_config: called");
        let timeout = Duration::from_millis(config.timeout_ms);

        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            base_url: config.base_url.clone(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    /// Build the request body for the Gemini API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");
        let contents: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                serde_json::json!({
                    "role": role,
                    "parts": [{ "text": msg.content }],
                })
            })
            .collect();

        serde_json::json!({
            "systemInstruction": { "parts": [{ "text": request.system_prompt }] },
            "contents": contents,
            "generationConfig": { "maxOutputTokens": request.max_tokens.min(self.max_tokens) },
        })
    }
}

/// What one SSE data payload contributed
#[derive(Debug, Default, PartialEq)]
struct ParsedChunk {
    text: String,
    finish_reason: Option<StopReason>,
    usage: Option<TokenUsage>,
}

fn parse_chunk(data: &str) -> Result<ParsedChunk, LlmError> {
    let chunk: GeminiStreamChunk = serde_json::from_str(data)?;
    let mut parsed = ParsedChunk::default();

    for candidate in chunk.candidates {
        if let Some(content) = candidate.content {
            for part in content.parts {
                if let Some(text) = part.text {
                    parsed.text.push_str(&text);
                }
            }
        }
        if let Some(reason) = candidate.finish_reason {
            parsed.finish_reason = Some(StopReason::from_gemini(&reason));
        }
    }

    parsed.usage = chunk.usage_metadata.map(|u| TokenUsage {
        input_tokens: u.prompt_token_count,
        output_tokens: u.candidates_token_count,
    });

    Ok(parsed)
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn stream(
        &self,
        request: CompletionRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "stream: called");
        let api_key = super::read_api_key(&self.api_key_env)?;
        let body = self.build_request_body(&request);

        let http_request = self
            .http
            .post(self.stream_url())
            .header("x-goog-api-key", api_key)
            .header("content-type", "application/json")
            .json(&body);

        let mut es = EventSource::new(http_request).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let mut full_content = String::new();
        let mut stop_reason = StopReason::EndTurn;
        let mut usage = TokenUsage::default();

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!("stream: Event::Open");
                }
                Ok(Event::Message(msg)) => {
                    let parsed = parse_chunk(&msg.data)?;
                    if !parsed.text.is_empty() {
                        full_content.push_str(&parsed.text);
                        let _ = chunk_tx.send(StreamChunk::TextDelta(parsed.text)).await;
                    }
                    if let Some(reason) = parsed.finish_reason {
                        stop_reason = reason;
                    }
                    if let Some(u) = parsed.usage {
                        usage = u;
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    // Gemini has no terminal event; end of body is end of message
                    debug!("stream: stream ended");
                    es.close();
                    break;
                }
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    debug!(%status, "stream: API error");
                    es.close();
                    let err = LlmError::from_response(response).await;
                    let _ = chunk_tx.send(StreamChunk::Error(err.to_string())).await;
                    return Err(err);
                }
                Err(e) => {
                    debug!(%e, "stream: Event error");
                    es.close();
                    let _ = chunk_tx.send(StreamChunk::Error(e.to_string())).await;
                    return Err(LlmError::InvalidResponse(e.to_string()));
                }
            }
        }

        debug!(len = full_content.len(), "stream: complete");
        let _ = chunk_tx
            .send(StreamChunk::MessageDone {
                stop_reason: stop_reason.clone(),
                usage: usage.clone(),
            })
            .await;

        Ok(CompletionResponse {
            content: if full_content.is_empty() { None } else { Some(full_content) },
            stop_reason,
            usage,
        })
    }
}

// Gemini API streaming types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamChunk {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}
