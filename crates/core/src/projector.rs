//! Projection of one workflow event into a candidate manifest record.
//!
//! The projector is stateless with respect to the store: it never reads what
//! is already recorded, it only turns one event into one candidate (or none).

use std::sync::Arc;

use pdr_message::{ManifestEvent, ManifestPayload};
use pdr_storage::{ManifestRecord, ManifestStats, ManifestStatus};

use crate::clock::{Clock, SystemClock};
use crate::error::MalformedRecordError;
use crate::schema::{RecordSchema, SchemaError};

pub struct Projector {
    schema: RecordSchema,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Projector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Projector")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl Projector {
    /// Projector stamping records with the system clock.
    pub fn new() -> Result<Self, SchemaError> {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Result<Self, SchemaError> {
        Ok(Self {
            schema: RecordSchema::embedded()?,
            clock,
        })
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Build the candidate record for `event`.
    ///
    /// Returns `Ok(None)` when the event carries no PDR. A PDR without a
    /// name, collection, recognised status, execution reference or start
    /// time is a [`MalformedRecordError`].
    pub fn project<E>(&self, event: &E) -> Result<Option<ManifestRecord>, MalformedRecordError>
    where
        E: ManifestEvent + ?Sized,
    {
        let Some(payload) = event.manifest() else {
            tracing::debug!("no PDR on message, nothing to record");
            return Ok(None);
        };

        let ManifestPayload {
            name,
            acknowledgment_sent,
            acknowledgment_body,
        } = payload;
        let manifest_id = name.ok_or_else(|| MalformedRecordError::MissingName {
            payload: format!(
                "{{acknowledgment_sent: {acknowledgment_sent}, acknowledgment_body: {acknowledgment_body:?}}}"
            ),
        })?;

        let missing = |field: &'static str| MalformedRecordError::MissingField {
            manifest_id: manifest_id.clone(),
            field,
        };

        let collection_id = event.collection_id().ok_or_else(|| missing("collection"))?;
        let raw_status = event
            .workflow_status()
            .ok_or_else(|| missing("workflow status"))?;
        let status: ManifestStatus =
            raw_status
                .parse()
                .map_err(|_| MalformedRecordError::UnknownStatus {
                    manifest_id: manifest_id.clone(),
                    status: raw_status.clone(),
                })?;
        let execution_ref = event
            .execution_ref()
            .ok_or_else(|| missing("execution reference"))?;
        let created_at = event
            .workflow_start_time()
            .ok_or_else(|| missing("workflow start time"))?;

        let stats = event
            .execution_counts()
            .map(|c| ManifestStats::new(c.running, c.completed, c.failed))
            .unwrap_or_default();

        let updated_at = self.clock.now_millis();
        let duration_ms = updated_at - created_at;
        if duration_ms < 0 {
            tracing::warn!(
                manifest_id = %manifest_id,
                created_at,
                updated_at,
                "workflow start time is later than the current time; recording negative duration"
            );
        }

        let record = ManifestRecord {
            manifest_id,
            collection_id,
            provider_id: event.provider_id(),
            status,
            execution_ref,
            percent_complete: stats.percent_complete(),
            stats,
            acknowledgment_sent,
            acknowledgment_body,
            created_at,
            updated_at,
            duration_ms,
        };

        let violations = self.schema.validate(&record);
        if !violations.is_empty() {
            return Err(MalformedRecordError::SchemaViolation {
                manifest_id: record.manifest_id,
                violations,
            });
        }

        Ok(Some(record))
    }
}
