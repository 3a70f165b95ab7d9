//! Session controller
//!
//! Ties one Extractor to one store. Brain-dump submissions are serialized:
//! a second submission while one is pending is rejected, not queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::Task;
use crate::extract::Extractor;
use crate::store::{StoreError, StoreManager};

/// Why a brain dump was not processed
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Text is required")]
    EmptyInput,

    #[error("A brain dump is already being processed")]
    Busy,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One user session: a task store plus the extraction pipeline feeding it
#[derive(Clone)]
pub struct Session {
    store: StoreManager,
    extractor: Arc<Extractor>,
    pending: Arc<AtomicBool>,
}

/// Clears the pending flag when the submission ends, however it ends
struct PendingGuard(Arc<AtomicBool>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Session {
    pub fn new(store: StoreManager, extractor: Arc<Extractor>) -> Self {
        Self {
            store,
            extractor,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &StoreManager {
        &self.store
    }

    pub fn extractor(&self) -> &Arc<Extractor> {
        &self.extractor
    }

    /// Whether a brain dump is in flight
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Run the pipeline on `text` and append the result to the store
    ///
    /// Returns the appended tasks as stored.
    pub async fn submit_brain_dump(&self, text: &str) -> Result<Vec<Task>, SubmitError> {
        debug!(text_len = text.len(), "submit_brain_dump: called");
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyInput);
        }

        if self
            .pending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("submit_brain_dump: already pending");
            return Err(SubmitError::Busy);
        }
        let _guard = PendingGuard(self.pending.clone());

        let extraction = self.extractor.run(text).await;
        let appended = self.store.append(extraction.tasks).await?;

        info!(
            count = appended.len(),
            fallback = ?extraction.fallback,
            "submit_brain_dump: appended tasks"
        );
        Ok(appended)
    }

    /// The currently selected task, looked up fresh on every read
    pub async fn selected(&self, id: &str) -> Result<Option<Task>, StoreError> {
        self.store.get(id).await
    }
}
