//! Conformance test suite for `ManifestStore` implementations.
//!
//! This module provides a backend-agnostic test suite that any `ManifestStore`
//! implementation can run to verify correctness. The suite covers:
//!
//! - **Upsert**: first write creates, later writes replace every field
//! - **Condition**: `NewExecutionOrProgress` accepts re-runs and forward
//!   progress, rejects stale progress without touching the stored record
//! - **Concurrent**: racing conditional writes converge on the maximum progress
//! - **Maintenance**: scan ordering, single delete, delete-all
//! - **Error handling**: correct error variants for missing records
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty store for each test:
//!
//! ```ignore
//! use pdr_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn dynamo_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_dynamo_store().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod concurrent;
mod condition;
mod error;
mod maintenance;
mod upsert;

use std::fmt;
use std::future::Future;

use crate::record::{ManifestRecord, ManifestStats, ManifestStatus};
use crate::ManifestStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "upsert", "condition", "concurrent").
    pub category: String,
    /// Test name (e.g. "first_write_creates_record").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// store, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: ManifestStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(upsert::run_upsert_tests(&factory).await);
    results.extend(condition::run_condition_tests(&factory).await);
    results.extend(error::run_error_tests(&factory).await);
    results.extend(maintenance::run_maintenance_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn make_record(manifest_id: &str, execution_ref: &str, status: ManifestStatus) -> ManifestRecord {
    ManifestRecord {
        manifest_id: manifest_id.to_string(),
        collection_id: "MOD09GQ___006".to_string(),
        provider_id: Some("s3_provider".to_string()),
        status,
        execution_ref: execution_ref.to_string(),
        stats: ManifestStats::default(),
        percent_complete: 0.0,
        acknowledgment_sent: false,
        acknowledgment_body: None,
        created_at: 1_700_000_000_000,
        updated_at: 1_700_000_060_000,
        duration_ms: 60_000,
    }
}

/// A `running` record whose stats put it at `completed` of `total` done.
fn make_running(manifest_id: &str, execution_ref: &str, completed: u64, total: u64) -> ManifestRecord {
    let stats = ManifestStats::new(total - completed, completed, 0);
    ManifestRecord {
        stats,
        percent_complete: stats.percent_complete(),
        ..make_record(manifest_id, execution_ref, ManifestStatus::Running)
    }
}
