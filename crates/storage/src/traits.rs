use async_trait::async_trait;

use crate::condition::WriteCondition;
use crate::error::StorageError;
use crate::record::ManifestRecord;

/// The storage trait for manifest status backends.
///
/// A `ManifestStore` keeps exactly one [`ManifestRecord`] per `manifest_id`.
///
/// ## Conditional upsert
///
/// `conditional_upsert` is the only steady-state write. The backend evaluates
/// the [`WriteCondition`] against the currently stored record and applies the
/// write in one atomic step: two concurrent callers must never both pass the
/// check against the same stored value. When the condition does not hold the
/// method returns `Err(StorageError::ConditionFailed { .. })` and the stored
/// record is unchanged.
///
/// ## Maintenance
///
/// `delete` and `delete_all` are out-of-band utilities for tests and
/// operators. Normal processing never removes a record.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait ManifestStore: Send + Sync + 'static {
    /// Insert or fully replace the record for `record.manifest_id` if
    /// `condition` holds against the stored value.
    ///
    /// Returns the record as written.
    async fn conditional_upsert(
        &self,
        record: ManifestRecord,
        condition: &WriteCondition,
    ) -> Result<ManifestRecord, StorageError>;

    /// Read one record.
    ///
    /// Returns `Err(StorageError::NotFound)` if the manifest is unknown.
    async fn get(&self, manifest_id: &str) -> Result<ManifestRecord, StorageError>;

    /// Read every record, ordered by `manifest_id`.
    async fn scan(&self) -> Result<Vec<ManifestRecord>, StorageError>;

    /// Remove one record.
    ///
    /// Returns `Err(StorageError::NotFound)` if the manifest is unknown.
    async fn delete(&self, manifest_id: &str) -> Result<(), StorageError>;

    /// Remove every record, returning how many were removed.
    async fn delete_all(&self) -> Result<usize, StorageError>;
}
