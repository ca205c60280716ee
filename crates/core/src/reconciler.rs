//! Conditional commit of candidate records against the store.
//!
//! Events for one PDR arrive in any order. A `completed` or `failed` report
//! is always written. A `running` report is written only when it comes from a
//! different execution than the stored record or shows strictly more
//! progress; otherwise it is a delayed update and is dropped. The store
//! evaluates that condition atomically with the write, so concurrent
//! reconciliations need no coordination of their own.

use pdr_message::ManifestEvent;
use pdr_storage::{ManifestRecord, ManifestStatus, ManifestStore, WriteCondition};
use serde::Serialize;

use crate::error::ReconcileError;
use crate::projector::Projector;

/// Outcome of reconciling one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    Committed(ManifestRecord),
    /// The store kept its record; the candidate was stale.
    Skipped {
        manifest_id: String,
        execution_ref: String,
    },
}

/// Result of processing one event end to end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventOutcome {
    pub committed: bool,
    /// The record as written, when `committed`.
    pub record: Option<ManifestRecord>,
}

impl EventOutcome {
    fn not_committed() -> Self {
        Self {
            committed: false,
            record: None,
        }
    }
}

impl From<Reconciliation> for EventOutcome {
    fn from(r: Reconciliation) -> Self {
        match r {
            Reconciliation::Committed(record) => Self {
                committed: true,
                record: Some(record),
            },
            Reconciliation::Skipped { .. } => Self::not_committed(),
        }
    }
}

/// The condition under which `candidate` may replace the stored record.
pub fn write_condition_for(candidate: &ManifestRecord) -> WriteCondition {
    match candidate.status {
        ManifestStatus::Running => WriteCondition::NewExecutionOrProgress {
            execution_ref: candidate.execution_ref.clone(),
            percent_complete: candidate.percent_complete,
        },
        ManifestStatus::Completed | ManifestStatus::Failed => WriteCondition::Always,
    }
}

#[derive(Debug)]
pub struct Reconciler<S> {
    store: S,
    projector: Projector,
}

impl<S: ManifestStore> Reconciler<S> {
    pub fn new(store: S, projector: Projector) -> Self {
        Self { store, projector }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Conditionally commit `candidate`.
    ///
    /// A rejected condition yields `Ok(Reconciliation::Skipped)`; every other
    /// store failure is returned as [`ReconcileError::Store`].
    pub async fn reconcile(&self, candidate: ManifestRecord) -> Result<Reconciliation, ReconcileError> {
        let condition = write_condition_for(&candidate);
        let manifest_id = candidate.manifest_id.clone();
        let execution_ref = candidate.execution_ref.clone();

        match self.store.conditional_upsert(candidate, &condition).await {
            Ok(record) => {
                tracing::debug!(
                    manifest_id = %record.manifest_id,
                    status = %record.status,
                    percent_complete = record.percent_complete,
                    "committed PDR record"
                );
                Ok(Reconciliation::Committed(record))
            }
            Err(e) if e.is_condition_failed() => {
                tracing::info!(
                    manifest_id = %manifest_id,
                    execution = %execution_ref,
                    "did not process delayed 'running' event for PDR"
                );
                Ok(Reconciliation::Skipped {
                    manifest_id,
                    execution_ref,
                })
            }
            Err(e) => Err(ReconcileError::Store(e)),
        }
    }

    /// Project `event` and reconcile the result.
    ///
    /// An event without a PDR touches nothing and reports `committed: false`.
    pub async fn project_and_reconcile<E>(&self, event: &E) -> Result<EventOutcome, ReconcileError>
    where
        E: ManifestEvent + Sync + ?Sized,
    {
        let candidate = match self.projector.project(event)? {
            Some(candidate) => candidate,
            None => return Ok(EventOutcome::not_committed()),
        };
        Ok(self.reconcile(candidate).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use pdr_message::WorkflowMessage;
    use pdr_storage::{ManifestStats, MemoryStore, StorageError};
    use serde_json::json;

    use crate::clock::FixedClock;
    use crate::error::MalformedRecordError;

    fn candidate(execution_ref: &str, status: ManifestStatus, completed: u64) -> ManifestRecord {
        let stats = ManifestStats::new(10 - completed, completed, 0);
        ManifestRecord {
            manifest_id: "MOD09GQ.PDR".to_string(),
            collection_id: "MOD09GQ___006".to_string(),
            provider_id: None,
            status,
            execution_ref: execution_ref.to_string(),
            stats,
            percent_complete: stats.percent_complete(),
            acknowledgment_sent: false,
            acknowledgment_body: None,
            created_at: 0,
            updated_at: 1,
            duration_ms: 1,
        }
    }

    fn reconciler(store: MemoryStore) -> Reconciler<MemoryStore> {
        Reconciler::new(
            store,
            Projector::with_clock(Arc::new(FixedClock(1_000))).unwrap(),
        )
    }

    /// Store that counts calls and fails every write with a backend error.
    #[derive(Default)]
    struct FailingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ManifestStore for FailingStore {
        async fn conditional_upsert(
            &self,
            _record: ManifestRecord,
            _condition: &WriteCondition,
        ) -> Result<ManifestRecord, StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Backend("throttled".to_string()))
        }

        async fn get(&self, manifest_id: &str) -> Result<ManifestRecord, StorageError> {
            Err(StorageError::NotFound {
                manifest_id: manifest_id.to_string(),
            })
        }

        async fn scan(&self) -> Result<Vec<ManifestRecord>, StorageError> {
            Ok(Vec::new())
        }

        async fn delete(&self, manifest_id: &str) -> Result<(), StorageError> {
            Err(StorageError::NotFound {
                manifest_id: manifest_id.to_string(),
            })
        }

        async fn delete_all(&self) -> Result<usize, StorageError> {
            Ok(0)
        }
    }

    #[test]
    fn terminal_statuses_write_unconditionally() {
        for status in [ManifestStatus::Completed, ManifestStatus::Failed] {
            assert_eq!(
                write_condition_for(&candidate("a", status, 3)),
                WriteCondition::Always
            );
        }
    }

    #[test]
    fn running_writes_on_new_execution_or_progress() {
        assert_eq!(
            write_condition_for(&candidate("a", ManifestStatus::Running, 3)),
            WriteCondition::NewExecutionOrProgress {
                execution_ref: "a".to_string(),
                percent_complete: 30.0,
            }
        );
    }

    #[tokio::test]
    async fn first_running_event_commits() {
        let r = reconciler(MemoryStore::new());
        let result = r
            .reconcile(candidate("a", ManifestStatus::Running, 3))
            .await
            .unwrap();
        assert!(matches!(result, Reconciliation::Committed(_)));
    }

    #[tokio::test]
    async fn stale_running_after_completed_is_skipped() {
        let r = reconciler(MemoryStore::new());
        r.reconcile(candidate("a", ManifestStatus::Running, 3))
            .await
            .unwrap();
        r.reconcile(candidate("a", ManifestStatus::Completed, 10))
            .await
            .unwrap();
        let result = r
            .reconcile(candidate("a", ManifestStatus::Running, 3))
            .await
            .unwrap();

        assert_eq!(
            result,
            Reconciliation::Skipped {
                manifest_id: "MOD09GQ.PDR".to_string(),
                execution_ref: "a".to_string(),
            }
        );
        let stored = r.store().get("MOD09GQ.PDR").await.unwrap();
        assert_eq!(stored.status, ManifestStatus::Completed);
        assert_eq!(stored.percent_complete, 100.0);
    }

    #[tokio::test]
    async fn rerun_overrides_completed_record() {
        let r = reconciler(MemoryStore::new());
        r.reconcile(candidate("a", ManifestStatus::Completed, 10))
            .await
            .unwrap();
        let result = r
            .reconcile(candidate("b", ManifestStatus::Running, 0))
            .await
            .unwrap();
        assert!(matches!(result, Reconciliation::Committed(_)));
        let stored = r.store().get("MOD09GQ.PDR").await.unwrap();
        assert_eq!(stored.execution_ref, "b");
        assert_eq!(stored.status, ManifestStatus::Running);
    }

    #[tokio::test]
    async fn later_terminal_report_always_overwrites() {
        let r = reconciler(MemoryStore::new());
        r.reconcile(candidate("a", ManifestStatus::Completed, 10))
            .await
            .unwrap();
        let result = r
            .reconcile(candidate("a", ManifestStatus::Failed, 4))
            .await
            .unwrap();
        assert!(matches!(result, Reconciliation::Committed(_)));
        let stored = r.store().get("MOD09GQ.PDR").await.unwrap();
        assert_eq!(stored.status, ManifestStatus::Failed);
    }

    #[tokio::test]
    async fn terminal_commit_is_idempotent() {
        let r = reconciler(MemoryStore::new());
        let done = candidate("a", ManifestStatus::Completed, 10);
        r.reconcile(done.clone()).await.unwrap();
        let first = r.store().get("MOD09GQ.PDR").await.unwrap();
        r.reconcile(done).await.unwrap();
        let second = r.store().get("MOD09GQ.PDR").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn backend_failure_propagates_as_store_error() {
        let store = FailingStore::default();
        let r = Reconciler::new(store, Projector::new().unwrap());
        let err = r
            .reconcile(candidate("a", ManifestStatus::Running, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Store(StorageError::Backend(_))));
    }

    #[tokio::test]
    async fn event_without_pdr_never_touches_store() {
        let r = Reconciler::new(FailingStore::default(), Projector::new().unwrap());
        let msg = WorkflowMessage::from_value(json!({ "meta": { "status": "running" } })).unwrap();
        let outcome = r.project_and_reconcile(&msg).await.unwrap();
        assert_eq!(
            outcome,
            EventOutcome {
                committed: false,
                record: None
            }
        );
        assert_eq!(r.store().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_event_never_touches_store() {
        let r = Reconciler::new(FailingStore::default(), Projector::new().unwrap());
        let msg = WorkflowMessage::from_value(json!({
            "meta": { "status": "running" },
            "payload": { "pdr": { "name": "MOD09GQ.PDR" } }
        }))
        .unwrap();
        let err = r.project_and_reconcile(&msg).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Malformed(MalformedRecordError::MissingField { field: "collection", .. })
        ));
        assert_eq!(r.store().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn committed_event_reports_record() {
        let r = reconciler(MemoryStore::new());
        let msg = WorkflowMessage::from_value(json!({
            "execution": { "arn": "arn:aws:states:us-east-1:1:execution:P:run", "workflow_start_time": 400 },
            "meta": { "status": "completed", "collection": { "name": "C", "version": "1" } },
            "payload": { "pdr": { "name": "MOD09GQ.PDR" }, "completed": ["x"] }
        }))
        .unwrap();
        let outcome = r.project_and_reconcile(&msg).await.unwrap();
        assert!(outcome.committed);
        let record = outcome.record.unwrap();
        assert_eq!(record.percent_complete, 100.0);
        assert_eq!(record.duration_ms, 600);
        assert_eq!(r.store().scan().await.unwrap(), vec![record]);
    }
}
