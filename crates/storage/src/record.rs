use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Processing status of a manifest as reported by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestStatus {
    Running,
    Completed,
    Failed,
}

impl ManifestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestStatus::Running => "running",
            ManifestStatus::Completed => "completed",
            ManifestStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ManifestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status string is not one of `running`, `completed`, `failed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown manifest status '{0}'")]
pub struct ParseStatusError(pub String);

impl FromStr for ManifestStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(ManifestStatus::Running),
            "completed" => Ok(ManifestStatus::Completed),
            "failed" => Ok(ManifestStatus::Failed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Counts of the sub-executions spawned for a manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestStats {
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub total: u64,
}

impl ManifestStats {
    pub fn new(processing: u64, completed: u64, failed: u64) -> Self {
        Self {
            processing,
            completed,
            failed,
            total: processing + completed + failed,
        }
    }

    /// Share of sub-executions that reached a terminal state, 0..=100.
    ///
    /// Zero when nothing has been spawned yet.
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let done = (self.completed + self.failed) as f64;
        (done / self.total as f64 * 100.0).min(100.0)
    }
}

/// The authoritative status record for one manifest, keyed by `manifest_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub manifest_id: String,
    pub collection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    pub status: ManifestStatus,
    /// Locator of the execution that produced this record.
    pub execution_ref: String,
    pub stats: ManifestStats,
    pub percent_complete: f64,
    pub acknowledgment_sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledgment_body: Option<String>,
    /// Workflow start time, Unix epoch milliseconds.
    pub created_at: i64,
    /// Wall-clock time of the write, Unix epoch milliseconds.
    pub updated_at: i64,
    pub duration_ms: i64,
}
