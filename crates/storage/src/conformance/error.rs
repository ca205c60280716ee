use std::future::Future;

use super::TestResult;
use crate::{ManifestStore, StorageError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "error",
        "get_nonexistent",
        get_nonexistent(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "get_not_found_has_correct_field",
        get_not_found_has_correct_field(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "delete_nonexistent",
        delete_nonexistent(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "scan_empty_store",
        scan_empty_store(factory).await,
    ));

    results
}

// ── 1. get on empty store returns NotFound ───────────────────────────────────

async fn get_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get("missing.PDR").await {
        Err(StorageError::NotFound { .. }) => Ok(()),
        other => Err(format!("expected NotFound, got {:?}", other)),
    }
}

// ── 2. NotFound carries the requested id ─────────────────────────────────────

async fn get_not_found_has_correct_field<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get("missing.PDR").await {
        Err(StorageError::NotFound { manifest_id }) => {
            if manifest_id != "missing.PDR" {
                return Err(format!("expected manifest_id 'missing.PDR', got '{manifest_id}'"));
            }
            Ok(())
        }
        other => Err(format!("expected NotFound, got {:?}", other)),
    }
}

// ── 3. delete on empty store returns NotFound ────────────────────────────────

async fn delete_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.delete("missing.PDR").await {
        Err(StorageError::NotFound { .. }) => Ok(()),
        other => Err(format!("expected NotFound, got {:?}", other)),
    }
}

// ── 4. scan on empty store is empty, not an error ───────────────────────────

async fn scan_empty_store<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let records = s.scan().await.map_err(|e| e.to_string())?;
    if !records.is_empty() {
        return Err(format!("expected empty scan, got {} records", records.len()));
    }
    Ok(())
}
