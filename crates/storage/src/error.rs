/// All errors that can be returned by a ManifestStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The write condition did not hold against the stored record. This is a
    /// routine outcome of the conditional upsert, not a backend failure.
    #[error("write condition failed for manifest {manifest_id}")]
    ConditionFailed { manifest_id: String },

    /// No record with the given manifest id.
    #[error("manifest not found: {manifest_id}")]
    NotFound { manifest_id: String },

    /// A backend-specific storage error (connectivity, throttling, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// True when the store rejected a write because its condition did not hold.
    pub fn is_condition_failed(&self) -> bool {
        matches!(self, StorageError::ConditionFailed { .. })
    }
}
