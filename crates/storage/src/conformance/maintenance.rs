use std::future::Future;

use super::{make_record, TestResult};
use crate::record::ManifestStatus;
use crate::{ManifestStore, StorageError, WriteCondition};

pub(super) async fn run_maintenance_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "maintenance",
        "scan_is_ordered_by_manifest_id",
        scan_is_ordered_by_manifest_id(factory).await,
    ));
    results.push(TestResult::from_result(
        "maintenance",
        "delete_removes_only_target",
        delete_removes_only_target(factory).await,
    ));
    results.push(TestResult::from_result(
        "maintenance",
        "delete_all_reports_count_and_empties_store",
        delete_all_reports_count_and_empties_store(factory).await,
    ));
    results.push(TestResult::from_result(
        "maintenance",
        "delete_all_on_empty_store",
        delete_all_on_empty_store(factory).await,
    ));

    results
}

async fn seed_ids<S: ManifestStore>(s: &S, ids: &[&str]) -> Result<(), String> {
    for id in ids {
        s.conditional_upsert(
            make_record(id, "exec-1", ManifestStatus::Completed),
            &WriteCondition::Always,
        )
        .await
        .map_err(|e| format!("seed {id}: {e}"))?;
    }
    Ok(())
}

async fn scan_is_ordered_by_manifest_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_ids(&s, &["c.PDR", "a.PDR", "b.PDR"]).await?;
    let ids: Vec<String> = s
        .scan()
        .await
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|r| r.manifest_id)
        .collect();
    if ids != ["a.PDR", "b.PDR", "c.PDR"] {
        return Err(format!("unexpected scan order: {ids:?}"));
    }
    Ok(())
}

async fn delete_removes_only_target<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_ids(&s, &["a.PDR", "b.PDR"]).await?;
    s.delete("a.PDR").await.map_err(|e| e.to_string())?;

    match s.get("a.PDR").await {
        Err(StorageError::NotFound { .. }) => {}
        other => return Err(format!("deleted record still readable: {:?}", other)),
    }
    s.get("b.PDR")
        .await
        .map_err(|e| format!("sibling record lost: {e}"))?;
    Ok(())
}

async fn delete_all_reports_count_and_empties_store<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_ids(&s, &["a.PDR", "b.PDR", "c.PDR"]).await?;
    let removed = s.delete_all().await.map_err(|e| e.to_string())?;
    if removed != 3 {
        return Err(format!("expected 3 removed, got {removed}"));
    }
    let remaining = s.scan().await.map_err(|e| e.to_string())?.len();
    if remaining != 0 {
        return Err(format!("{remaining} records survived delete_all"));
    }
    Ok(())
}

async fn delete_all_on_empty_store<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let removed = s.delete_all().await.map_err(|e| e.to_string())?;
    if removed != 0 {
        return Err(format!("expected 0 removed, got {removed}"));
    }
    Ok(())
}
