use pdr_storage::StorageError;

/// A message claims to carry a PDR but the record cannot be built from it.
///
/// Not retryable: the producing workflow violated the message contract.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedRecordError {
    #[error("PDR has no name: {payload}")]
    MissingName { payload: String },

    #[error("PDR {manifest_id}: message has no {field}")]
    MissingField {
        manifest_id: String,
        field: &'static str,
    },

    #[error("PDR {manifest_id}: unknown workflow status '{status}'")]
    UnknownStatus { manifest_id: String, status: String },

    #[error("PDR {manifest_id}: record violates schema: {}", violations.join("; "))]
    SchemaViolation {
        manifest_id: String,
        violations: Vec<String>,
    },
}

/// Failures surfaced by reconciliation. A rejected conditional write is not
/// one of them.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("malformed PDR record: {0}")]
    Malformed(#[from] MalformedRecordError),

    #[error(transparent)]
    Store(#[from] StorageError),
}
