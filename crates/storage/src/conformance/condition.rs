use std::future::Future;

use super::{make_record, make_running, TestResult};
use crate::record::{ManifestRecord, ManifestStatus};
use crate::{ManifestStore, StorageError, WriteCondition};

pub(super) async fn run_condition_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "condition",
        "progress_condition_holds_on_empty_store",
        progress_condition_holds_on_empty_store(factory).await,
    ));
    results.push(TestResult::from_result(
        "condition",
        "forward_progress_is_written",
        forward_progress_is_written(factory).await,
    ));
    results.push(TestResult::from_result(
        "condition",
        "equal_progress_is_rejected",
        equal_progress_is_rejected(factory).await,
    ));
    results.push(TestResult::from_result(
        "condition",
        "lower_progress_is_rejected",
        lower_progress_is_rejected(factory).await,
    ));
    results.push(TestResult::from_result(
        "condition",
        "new_execution_is_written_despite_lower_progress",
        new_execution_is_written_despite_lower_progress(factory).await,
    ));
    results.push(TestResult::from_result(
        "condition",
        "rejection_reports_manifest_id",
        rejection_reports_manifest_id(factory).await,
    ));
    results.push(TestResult::from_result(
        "condition",
        "rejection_leaves_stored_record_unchanged",
        rejection_leaves_stored_record_unchanged(factory).await,
    ));
    results.push(TestResult::from_result(
        "condition",
        "stale_running_cannot_overwrite_completed",
        stale_running_cannot_overwrite_completed(factory).await,
    ));

    results
}

fn progress_condition(record: &ManifestRecord) -> WriteCondition {
    WriteCondition::NewExecutionOrProgress {
        execution_ref: record.execution_ref.clone(),
        percent_complete: record.percent_complete,
    }
}

/// Seed the store unconditionally.
async fn seed<S: ManifestStore>(s: &S, record: ManifestRecord) -> Result<(), String> {
    s.conditional_upsert(record, &WriteCondition::Always)
        .await
        .map(|_| ())
        .map_err(|e| format!("seed: {e}"))
}

/// Write `record` under its own progress condition and report whether it was accepted.
async fn try_progress<S: ManifestStore>(s: &S, record: ManifestRecord) -> Result<bool, String> {
    let condition = progress_condition(&record);
    match s.conditional_upsert(record, &condition).await {
        Ok(_) => Ok(true),
        Err(StorageError::ConditionFailed { .. }) => Ok(false),
        Err(e) => Err(format!("unexpected storage error: {e}")),
    }
}

async fn progress_condition_holds_on_empty_store<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    if !try_progress(&s, make_running("a.PDR", "exec-1", 0, 4)).await? {
        return Err("first conditional write was rejected".to_string());
    }
    Ok(())
}

async fn forward_progress_is_written<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, make_running("a.PDR", "exec-1", 1, 4)).await?;
    if !try_progress(&s, make_running("a.PDR", "exec-1", 2, 4)).await? {
        return Err("forward progress was rejected".to_string());
    }
    let rec = s.get("a.PDR").await.map_err(|e| e.to_string())?;
    if rec.percent_complete != 50.0 {
        return Err(format!("expected 50% stored, got {}", rec.percent_complete));
    }
    Ok(())
}

async fn equal_progress_is_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, make_running("a.PDR", "exec-1", 2, 4)).await?;
    if try_progress(&s, make_running("a.PDR", "exec-1", 2, 4)).await? {
        return Err("equal progress from the same execution was accepted".to_string());
    }
    Ok(())
}

async fn lower_progress_is_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, make_running("a.PDR", "exec-1", 3, 4)).await?;
    if try_progress(&s, make_running("a.PDR", "exec-1", 1, 4)).await? {
        return Err("lower progress from the same execution was accepted".to_string());
    }
    Ok(())
}

async fn new_execution_is_written_despite_lower_progress<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, make_running("a.PDR", "exec-1", 4, 4)).await?;
    if !try_progress(&s, make_running("a.PDR", "exec-2", 0, 4)).await? {
        return Err("re-run from a new execution was rejected".to_string());
    }
    let rec = s.get("a.PDR").await.map_err(|e| e.to_string())?;
    if rec.execution_ref != "exec-2" || rec.percent_complete != 0.0 {
        return Err(format!(
            "expected exec-2 at 0%, got {} at {}",
            rec.execution_ref, rec.percent_complete
        ));
    }
    Ok(())
}

async fn rejection_reports_manifest_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, make_running("a.PDR", "exec-1", 2, 4)).await?;
    let stale = make_running("a.PDR", "exec-1", 1, 4);
    let condition = progress_condition(&stale);
    match s.conditional_upsert(stale, &condition).await {
        Err(StorageError::ConditionFailed { manifest_id }) if manifest_id == "a.PDR" => Ok(()),
        other => Err(format!(
            "expected ConditionFailed for a.PDR, got {:?}",
            other
        )),
    }
}

async fn rejection_leaves_stored_record_unchanged<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let original = make_running("a.PDR", "exec-1", 3, 4);
    seed(&s, original.clone()).await?;

    let mut stale = make_running("a.PDR", "exec-1", 1, 4);
    stale.updated_at = original.updated_at + 5_000;
    stale.provider_id = None;
    try_progress(&s, stale).await?;

    let rec = s.get("a.PDR").await.map_err(|e| e.to_string())?;
    if rec != original {
        return Err(format!("stored record mutated by rejected write: {rec:?}"));
    }
    Ok(())
}

/// Completed at 100%, then a delayed running event from the same execution.
async fn stale_running_cannot_overwrite_completed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut completed = make_record("a.PDR", "exec-1", ManifestStatus::Completed);
    completed.percent_complete = 100.0;
    seed(&s, completed).await?;

    if try_progress(&s, make_running("a.PDR", "exec-1", 1, 4)).await? {
        return Err("stale running event overwrote completed record".to_string());
    }
    let rec = s.get("a.PDR").await.map_err(|e| e.to_string())?;
    if rec.status != ManifestStatus::Completed {
        return Err(format!("expected completed, got {}", rec.status));
    }
    Ok(())
}
