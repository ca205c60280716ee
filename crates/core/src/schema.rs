//! JSON Schema validation of assembled manifest records.

use pdr_storage::ManifestRecord;

static RECORD_SCHEMA_STR: &str = include_str!("../../../docs/manifest-record-schema.json");

/// The embedded record schema failed to load. Indicates a build defect.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to parse embedded record schema: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to compile embedded record schema: {0}")]
    Compile(String),
}

/// Compiled manifest record schema.
pub struct RecordSchema {
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for RecordSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSchema").finish_non_exhaustive()
    }
}

impl RecordSchema {
    /// Compile the schema shipped in `docs/manifest-record-schema.json`.
    pub fn embedded() -> Result<Self, SchemaError> {
        let schema: serde_json::Value = serde_json::from_str(RECORD_SCHEMA_STR)?;
        let validator =
            jsonschema::validator_for(&schema).map_err(|e| SchemaError::Compile(e.to_string()))?;
        Ok(Self { validator })
    }

    /// Validate an arbitrary JSON document, returning every violation.
    pub fn validate_value(&self, doc: &serde_json::Value) -> Vec<String> {
        self.validator
            .iter_errors(doc)
            .map(|e| e.to_string())
            .collect()
    }

    /// Validate a record as it would be written to the store.
    pub fn validate(&self, record: &ManifestRecord) -> Vec<String> {
        match serde_json::to_value(record) {
            Ok(doc) => self.validate_value(&doc),
            Err(e) => vec![format!("record is not serializable: {e}")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdr_storage::{ManifestStats, ManifestStatus};
    use serde_json::json;

    fn record() -> ManifestRecord {
        ManifestRecord {
            manifest_id: "MOD09GQ.PDR".to_string(),
            collection_id: "MOD09GQ___006".to_string(),
            provider_id: Some("s3_provider".to_string()),
            status: ManifestStatus::Running,
            execution_ref: "https://example.test/exec".to_string(),
            stats: ManifestStats::new(1, 1, 0),
            percent_complete: 50.0,
            acknowledgment_sent: false,
            acknowledgment_body: None,
            created_at: 1_000,
            updated_at: 2_000,
            duration_ms: 1_000,
        }
    }

    #[test]
    fn embedded_schema_compiles() {
        RecordSchema::embedded().unwrap();
    }

    #[test]
    fn valid_record_has_no_violations() {
        let schema = RecordSchema::embedded().unwrap();
        assert!(schema.validate(&record()).is_empty());
    }

    #[test]
    fn empty_identifier_is_a_violation() {
        let schema = RecordSchema::embedded().unwrap();
        let mut r = record();
        r.manifest_id = String::new();
        assert_eq!(schema.validate(&r).len(), 1);
    }

    #[test]
    fn out_of_range_percent_is_a_violation() {
        let schema = RecordSchema::embedded().unwrap();
        let mut r = record();
        r.percent_complete = 150.0;
        assert!(!schema.validate(&r).is_empty());
    }

    #[test]
    fn unknown_status_and_extra_fields_are_violations() {
        let schema = RecordSchema::embedded().unwrap();
        let mut doc = serde_json::to_value(record()).unwrap();
        doc["status"] = json!("queued");
        doc["granules"] = json!([]);
        assert_eq!(schema.validate_value(&doc).len(), 2);
    }
}
