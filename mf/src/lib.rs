//! MindFlow - brain dumps in, organized tasks out
//!
//! Free-form text is sent to a hosted language model, the streamed reply is
//! searched for a JSON array of task descriptors, and the normalized tasks
//! land in an in-memory store that a client drives over HTTP.
//!
//! # Core Concepts
//!
//! - **Never Drop Input**: any extraction failure yields one fallback task
//!   holding the original text
//! - **Serialized Store**: one actor applies every mutation in order
//! - **Absent Is Not An Error**: mutations on unknown ids are no-ops
//!
//! # Modules
//!
//! - [`domain`] - Task, Subtask, ResourceItem and their enums
//! - [`store`] - TaskStore and its StoreManager actor
//! - [`llm`] - Streaming LLM client trait and provider clients
//! - [`extract`] - Prompt, invocation, normalization and fallback
//! - [`session`] - Brain-dump submission guard
//! - [`server`] - HTTP routes
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod extract;
pub mod llm;
pub mod server;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use config::{Config, ExtractionConfig, LlmConfig, ServerConfig};
pub use domain::{NewResource, NewTask, Priority, ResourceItem, ResourceKind, Status, Subtask, Task, TaskPatch};
pub use extract::{Extraction, Extractor, FallbackReason, LlmInvoker, ModelInvoker, RemoteInvoker};
pub use llm::{AnthropicClient, GeminiClient, LlmClient, LlmError, OpenAIClient, create_client};
pub use server::{AppState, ServerError};
pub use session::{Session, SubmitError};
pub use store::{StoreError, StoreManager, TaskStore};
