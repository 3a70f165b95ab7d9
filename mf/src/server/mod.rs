//! HTTP boundary
//!
//! One process serves one session: a single store and a single extractor
//! shared by every request.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use eyre::{Context, Result};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

mod classify;
mod error;
mod tasks;

pub use error::ServerError;

use crate::config::Config;
use crate::extract::{Extractor, LlmInvoker};
use crate::llm;
use crate::session::Session;
use crate::store::StoreManager;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub session: Session,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Build a fresh session from configuration
    ///
    /// Must run inside a Tokio runtime; the store actor is spawned here.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = llm::create_client(&config.llm).context("Failed to create LLM client")?;
        let invoker = LlmInvoker::new(client, config.extraction.categories.clone(), config.llm.max_tokens);
        let extractor = Extractor::new(Arc::new(invoker), config.extraction.timeout());

        Ok(Self::new(Session::new(StoreManager::spawn(), Arc::new(extractor))))
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/classify-tasks", post(classify::classify_tasks))
        .route("/api/brain-dump", post(classify::brain_dump))
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/api/tasks/by-category", get(tasks::by_category))
        .route("/api/tasks/by-status", get(tasks::by_status))
        .route(
            "/api/tasks/{id}",
            get(tasks::get_task).patch(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/api/tasks/{id}/cycle", post(tasks::cycle_status))
        .route("/api/tasks/{id}/status", put(tasks::move_to_status))
        .route("/api/tasks/{id}/subtasks", post(tasks::add_subtask))
        .route("/api/tasks/{id}/subtasks/{sid}/toggle", post(tasks::toggle_subtask))
        .route("/api/tasks/{id}/subtasks/{sid}", delete(tasks::delete_subtask))
        .route("/api/tasks/{id}/resources", post(tasks::add_resource))
        .route("/api/tasks/{id}/resources/{rid}", delete(tasks::delete_resource))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve(listener: TcpListener, state: AppState, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
    let addr = listener.local_addr().context("Failed to read listener address")?;
    info!(%addr, "serve: listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    info!("serve: stopped");
    Ok(())
}
