//! Extraction pipeline: brain-dump text in, normalized tasks out
//!
//! Prompt construction, streamed model invocation and normalization are
//! separate steps; [`Extractor`] runs them in order and absorbs every
//! failure into the single fallback task.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

mod fallback;
mod invoker;
mod normalize;
mod prompt;

pub use fallback::{FallbackReason, TRANSPORT_NOTE, UNCLASSIFIED_NOTE, fallback_task};
pub use invoker::{LlmInvoker, ModelInvoker, RemoteInvoker, collect};
pub use normalize::{NormalizeError, UNTITLED, normalize};
pub use prompt::{SYSTEM_PROMPT, build_prompt, build_request};

use crate::domain::Task;
use crate::llm::LlmError;

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Tasks ready to append, in model order
    pub tasks: Vec<Task>,

    /// Set when the tasks are the single fallback task
    pub fallback: Option<FallbackReason>,
}

impl Extraction {
    fn fallback(input: &str, reason: FallbackReason) -> Self {
        Self {
            tasks: vec![fallback_task(input, reason)],
            fallback: Some(reason),
        }
    }
}

/// Runs the extraction pipeline; never fails
pub struct Extractor {
    invoker: Arc<dyn ModelInvoker>,
    timeout: Duration,
}

impl Extractor {
    pub fn new(invoker: Arc<dyn ModelInvoker>, timeout: Duration) -> Self {
        Self { invoker, timeout }
    }

    pub fn invoker(&self) -> Arc<dyn ModelInvoker> {
        self.invoker.clone()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the pipeline and report whether the fallback was used
    ///
    /// Callers reject blank input before calling.
    pub async fn run(&self, text: &str) -> Extraction {
        debug!(text_len = text.len(), timeout = ?self.timeout, "run: called");

        let raw = match tokio::time::timeout(self.timeout, collect(self.invoker.as_ref(), text)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(error = %e, "run: model invocation failed, creating fallback task");
                return Extraction::fallback(text, FallbackReason::Transport);
            }
            Err(_) => {
                let e = LlmError::Timeout(self.timeout);
                warn!(error = %e, "run: model invocation timed out, creating fallback task");
                return Extraction::fallback(text, FallbackReason::Transport);
            }
        };

        match normalize(&raw) {
            Ok(tasks) => {
                info!(count = tasks.len(), "run: extracted tasks");
                Extraction { tasks, fallback: None }
            }
            Err(e) => {
                warn!(error = %e, raw_len = raw.len(), "run: could not parse model output, creating fallback task");
                Extraction::fallback(text, FallbackReason::Unclassified)
            }
        }
    }

    /// Run the pipeline and return only the tasks
    pub async fn extract(&self, text: &str) -> Vec<Task> {
        self.run(text).await.tasks
    }
}
