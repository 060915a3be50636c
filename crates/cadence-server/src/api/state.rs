//! API shared state

use std::sync::Arc;

use cadence_core::{DueQueue, ReviewService, Storage};

use crate::config::ServerConfig;

/// Shared application state for the API
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub queue: Arc<DueQueue>,
    pub reviews: Arc<ReviewService>,
}

impl AppState {
    pub fn new(storage: Arc<Storage>, config: &ServerConfig) -> Self {
        let queue = DueQueue::with_config(Arc::clone(&storage), config.due_queue());
        let reviews =
            ReviewService::new(Arc::clone(&storage)).with_conflict_retries(config.conflict_retries);
        Self {
            storage,
            queue: Arc::new(queue),
            reviews: Arc::new(reviews),
        }
    }
}
