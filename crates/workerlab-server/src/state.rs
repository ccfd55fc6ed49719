//! Application state

use std::sync::Arc;

use workerlab_core::coordinator::RunCoordinator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<RunCoordinator>,
}

impl AppState {
    pub fn new(coordinator: RunCoordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
        }
    }
}
