//! Application state shared across request handlers.

use pdr_core::Reconciler;
use pdr_storage::MemoryStore;

pub(crate) struct AppState {
    /// Projector and store behind every PDR route.
    pub(crate) reconciler: Reconciler<MemoryStore>,
    /// Optional API key for authentication. None = no auth required.
    pub(crate) api_key: Option<String>,
}

impl AppState {
    pub(crate) fn new(reconciler: Reconciler<MemoryStore>, api_key: Option<String>) -> Self {
        Self {
            reconciler,
            api_key,
        }
    }
}
