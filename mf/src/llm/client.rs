//! LlmClient trait definition

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{CompletionRequest, CompletionResponse, LlmError, StreamChunk};

/// Stateless LLM client - each call is independent
///
/// Output arrives as a live stream of text fragments. Callers that need the
/// whole text concatenate the `TextDelta` chunks in arrival order; the
/// returned response carries the same concatenation.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Streaming completion
    ///
    /// Sends chunks to the provided channel as they arrive and returns the
    /// final complete response. Transport and authorization failures end
    /// the call with a single error; nothing is retried.
    async fn stream(
        &self,
        request: CompletionRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<CompletionResponse, LlmError>;
}
