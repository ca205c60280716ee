use std::future::Future;
use std::sync::Arc;

use super::{make_record, make_running, TestResult};
use crate::record::ManifestStatus;
use crate::{ManifestStore, StorageError, WriteCondition};

/// Number of concurrent tasks to spawn in each test.
const N: u64 = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_progress_converges_to_maximum",
        concurrent_progress_converges_to_maximum(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_stale_progress_never_overwrites_terminal",
        concurrent_stale_progress_never_overwrites_terminal(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_distinct_executions_all_accepted",
        concurrent_distinct_executions_all_accepted(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_writes_different_manifests_all_succeed",
        concurrent_writes_different_manifests_all_succeed(factory).await,
    ));

    results
}

/// Spawn one conditional progress write per `(execution_ref, completed)` pair
/// and return how many the store accepted.
async fn race_progress<S: ManifestStore>(
    storage: &Arc<S>,
    manifest_id: &str,
    writes: Vec<(String, u64)>,
) -> Result<usize, String> {
    let mut handles = Vec::new();
    for (execution_ref, completed) in writes {
        let s = storage.clone();
        let record = make_running(manifest_id, &execution_ref, completed, N);
        handles.push(tokio::spawn(async move {
            let condition = WriteCondition::NewExecutionOrProgress {
                execution_ref: record.execution_ref.clone(),
                percent_complete: record.percent_complete,
            };
            match s.conditional_upsert(record, &condition).await {
                Ok(_) => Ok(true),
                Err(StorageError::ConditionFailed { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
    }

    let mut accepted = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if won {
            accepted += 1;
        }
    }
    Ok(accepted)
}

// ── Same execution, racing progress: highest progress wins ───────────────────

/// N tasks report progress 0..N-1 of N for the same execution in parallel.
/// Whatever the interleaving, the stored progress must end at the maximum.
async fn concurrent_progress_converges_to_maximum<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let writes = (0..N).map(|i| ("exec-1".to_string(), i)).collect();
    let accepted = race_progress(&storage, "a.PDR", writes).await?;
    if accepted == 0 {
        return Err("no progress write was accepted".to_string());
    }

    let rec = storage.get("a.PDR").await.map_err(|e| e.to_string())?;
    let expected = make_running("a.PDR", "exec-1", N - 1, N).percent_complete;
    if rec.percent_complete != expected {
        return Err(format!(
            "expected stored progress {expected}, got {}",
            rec.percent_complete
        ));
    }
    Ok(())
}

// ── Terminal record under a burst of stale progress ─────────────────────────

async fn concurrent_stale_progress_never_overwrites_terminal<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let mut completed = make_record("a.PDR", "exec-1", ManifestStatus::Completed);
    completed.percent_complete = 100.0;
    storage
        .conditional_upsert(completed, &WriteCondition::Always)
        .await
        .map_err(|e| format!("seed: {e}"))?;

    let writes = (0..N).map(|i| ("exec-1".to_string(), i)).collect();
    let accepted = race_progress(&storage, "a.PDR", writes).await?;
    if accepted != 0 {
        return Err(format!("{accepted} stale progress writes were accepted"));
    }

    let rec = storage.get("a.PDR").await.map_err(|e| e.to_string())?;
    if rec.status != ManifestStatus::Completed || rec.percent_complete != 100.0 {
        return Err(format!(
            "expected completed at 100, got {} at {}",
            rec.status, rec.percent_complete
        ));
    }
    Ok(())
}

// ── Distinct executions: every write differs from whatever is stored ─────────

async fn concurrent_distinct_executions_all_accepted<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let writes = (0..N).map(|i| (format!("exec-{i}"), 0)).collect();
    let accepted = race_progress(&storage, "a.PDR", writes).await?;
    if accepted != N as usize {
        return Err(format!("expected {N} accepted re-runs, got {accepted}"));
    }
    Ok(())
}

// ── Independent manifests do not contend ────────────────────────────────────

async fn concurrent_writes_different_manifests_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            let record = make_record(&format!("pdr-{i}.PDR"), "exec-1", ManifestStatus::Running);
            s.conditional_upsert(record, &WriteCondition::Always).await
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error: {e}"))?;
    }

    let count = storage.scan().await.map_err(|e| e.to_string())?.len();
    if count != N as usize {
        return Err(format!("expected {N} records, got {count}"));
    }
    Ok(())
}
