use std::sync::Arc;

use crate::store::RecordStore;

/// Shared application state
///
/// Requests only read through the store, so the state itself is immutable.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Borrow the store as a trait object for the service functions
    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }
}
