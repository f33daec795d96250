use crate::storage::CatStorage;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub storage: CatStorage,
}

#[cfg(test)]
impl AppState {
    /// State over a fresh, empty in-memory datastore
    pub fn in_memory() -> Self {
        use crate::datastore::MemoryDatastore;
        use std::sync::Arc;

        Self {
            storage: CatStorage::new(Arc::new(MemoryDatastore::new())),
        }
    }
}
