use std::future::Future;

use super::{make_record, make_running, TestResult};
use crate::record::ManifestStatus;
use crate::{ManifestStore, WriteCondition};

pub(super) async fn run_upsert_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "upsert",
        "first_write_creates_record",
        first_write_creates_record(factory).await,
    ));
    results.push(TestResult::from_result(
        "upsert",
        "upsert_returns_written_record",
        upsert_returns_written_record(factory).await,
    ));
    results.push(TestResult::from_result(
        "upsert",
        "unconditional_write_replaces_all_fields",
        unconditional_write_replaces_all_fields(factory).await,
    ));
    results.push(TestResult::from_result(
        "upsert",
        "replacement_clears_optional_fields",
        replacement_clears_optional_fields(factory).await,
    ));
    results.push(TestResult::from_result(
        "upsert",
        "records_are_keyed_by_manifest_id",
        records_are_keyed_by_manifest_id(factory).await,
    ));
    results.push(TestResult::from_result(
        "upsert",
        "same_record_twice_is_idempotent",
        same_record_twice_is_idempotent(factory).await,
    ));

    results
}

/// A write against an empty store must create the record.
async fn first_write_creates_record<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.conditional_upsert(
        make_record("a.PDR", "exec-1", ManifestStatus::Running),
        &WriteCondition::Always,
    )
    .await
    .map_err(|e| e.to_string())?;

    let rec = s.get("a.PDR").await.map_err(|e| e.to_string())?;
    if rec.status != ManifestStatus::Running {
        return Err(format!("expected status running, got {}", rec.status));
    }
    Ok(())
}

async fn upsert_returns_written_record<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_running("a.PDR", "exec-1", 1, 4);
    let written = s
        .conditional_upsert(record.clone(), &WriteCondition::Always)
        .await
        .map_err(|e| e.to_string())?;
    if written != record {
        return Err(format!("returned record differs: {written:?}"));
    }
    Ok(())
}

/// An accepted write replaces the stored record rather than merging into it.
async fn unconditional_write_replaces_all_fields<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.conditional_upsert(make_running("a.PDR", "exec-1", 1, 4), &WriteCondition::Always)
        .await
        .map_err(|e| e.to_string())?;

    let mut replacement = make_record("a.PDR", "exec-2", ManifestStatus::Completed);
    replacement.collection_id = "MOD14A1___061".to_string();
    replacement.percent_complete = 100.0;
    replacement.acknowledgment_sent = true;
    replacement.updated_at += 1_000;
    s.conditional_upsert(replacement.clone(), &WriteCondition::Always)
        .await
        .map_err(|e| e.to_string())?;

    let rec = s.get("a.PDR").await.map_err(|e| e.to_string())?;
    if rec != replacement {
        return Err(format!("expected {replacement:?}, got {rec:?}"));
    }
    Ok(())
}

async fn replacement_clears_optional_fields<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut first = make_record("a.PDR", "exec-1", ManifestStatus::Failed);
    first.acknowledgment_body = Some("MESSAGE_TYPE = \"SHORTPDRD\";\n".to_string());
    s.conditional_upsert(first, &WriteCondition::Always)
        .await
        .map_err(|e| e.to_string())?;

    let mut second = make_record("a.PDR", "exec-2", ManifestStatus::Running);
    second.provider_id = None;
    s.conditional_upsert(second, &WriteCondition::Always)
        .await
        .map_err(|e| e.to_string())?;

    let rec = s.get("a.PDR").await.map_err(|e| e.to_string())?;
    if rec.provider_id.is_some() || rec.acknowledgment_body.is_some() {
        return Err(format!("optional fields survived replacement: {rec:?}"));
    }
    Ok(())
}

async fn records_are_keyed_by_manifest_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.conditional_upsert(
        make_record("a.PDR", "exec-1", ManifestStatus::Completed),
        &WriteCondition::Always,
    )
    .await
    .map_err(|e| e.to_string())?;
    s.conditional_upsert(
        make_record("b.PDR", "exec-1", ManifestStatus::Failed),
        &WriteCondition::Always,
    )
    .await
    .map_err(|e| e.to_string())?;

    let a = s.get("a.PDR").await.map_err(|e| e.to_string())?;
    let b = s.get("b.PDR").await.map_err(|e| e.to_string())?;
    if a.status != ManifestStatus::Completed || b.status != ManifestStatus::Failed {
        return Err(format!("records interfered: a={}, b={}", a.status, b.status));
    }
    let count = s.scan().await.map_err(|e| e.to_string())?.len();
    if count != 2 {
        return Err(format!("expected 2 records, got {count}"));
    }
    Ok(())
}

async fn same_record_twice_is_idempotent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_record("a.PDR", "exec-1", ManifestStatus::Completed);
    s.conditional_upsert(record.clone(), &WriteCondition::Always)
        .await
        .map_err(|e| e.to_string())?;
    let after_first = s.get("a.PDR").await.map_err(|e| e.to_string())?;
    s.conditional_upsert(record, &WriteCondition::Always)
        .await
        .map_err(|e| e.to_string())?;
    let after_second = s.get("a.PDR").await.map_err(|e| e.to_string())?;
    if after_first != after_second {
        return Err(format!("{after_first:?} != {after_second:?}"));
    }
    Ok(())
}
