//! Task store with actor pattern
//!
//! TaskStore is the synchronous collection; StoreManager owns one behind a
//! channel so that the HTTP layer and the brain-dump controller mutate it
//! one command at a time.

mod manager;
mod messages;
mod task_store;

pub use manager::StoreManager;
pub use messages::{StoreCommand, StoreError, StoreResponse};
pub use task_store::{CategoryGroup, StatusColumn, TaskStore};
