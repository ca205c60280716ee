use std::path::PathBuf;
use std::process;

use pdr_core::{Projector, Reconciler, Reconciliation};
use pdr_message::WorkflowMessage;
use pdr_storage::{ManifestRecord, ManifestStore, MemoryStore};
use serde::Serialize;

use crate::{read_json_or_exit, report_error, OutputFormat};

/// What happened to one replayed message.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum ReplayOutcome {
    Committed {
        manifest_id: String,
        status: String,
        percent_complete: f64,
    },
    Skipped {
        manifest_id: String,
        execution_ref: String,
    },
    NoManifest,
    Error {
        message: String,
    },
}

#[derive(Debug, Serialize)]
struct EventReport {
    source: String,
    #[serde(flatten)]
    outcome: ReplayOutcome,
}

impl std::fmt::Display for EventReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            ReplayOutcome::Committed {
                manifest_id,
                status,
                percent_complete,
            } => write!(
                f,
                "{}: committed {} ({}, {:.1}%)",
                self.source, manifest_id, status, percent_complete
            ),
            ReplayOutcome::Skipped {
                manifest_id,
                execution_ref,
            } => write!(
                f,
                "{}: skipped stale running update for {} ({})",
                self.source, manifest_id, execution_ref
            ),
            ReplayOutcome::NoManifest => write!(f, "{}: no manifest", self.source),
            ReplayOutcome::Error { message } => write!(f, "{}: error: {}", self.source, message),
        }
    }
}

pub(crate) fn cmd_replay(files: &[PathBuf], output: OutputFormat, quiet: bool) {
    let mut events = Vec::new();
    for path in files {
        match read_json_or_exit(path, output, quiet) {
            serde_json::Value::Array(items) => {
                for (i, item) in items.into_iter().enumerate() {
                    events.push((format!("{}[{}]", path.display(), i), item));
                }
            }
            doc => events.push((path.display().to_string(), doc)),
        }
    }

    let projector = match Projector::new() {
        Ok(p) => p,
        Err(e) => {
            report_error(&format!("internal error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let reconciler = Reconciler::new(MemoryStore::new(), projector);

    let rt = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(
                &format!("failed to create tokio runtime: {}", e),
                output,
                quiet,
            );
            process::exit(1);
        }
    };

    let (reports, records) = rt.block_on(async {
        let mut reports = Vec::with_capacity(events.len());
        for (source, doc) in events {
            let outcome = replay_one(&reconciler, doc).await;
            reports.push(EventReport { source, outcome });
        }
        (reports, reconciler.store().scan().await)
    });

    let records = match records {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("error reading final records: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let failed = reports
        .iter()
        .any(|r| matches!(r.outcome, ReplayOutcome::Error { .. }));

    match output {
        OutputFormat::Text => print_text(&reports, &records, quiet),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "events": reports,
                "records": records,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
    }

    if failed {
        process::exit(1);
    }
}

async fn replay_one(reconciler: &Reconciler<MemoryStore>, doc: serde_json::Value) -> ReplayOutcome {
    let message = match WorkflowMessage::from_value(doc) {
        Ok(m) => m,
        Err(e) => {
            return ReplayOutcome::Error {
                message: e.to_string(),
            }
        }
    };

    let candidate = match reconciler.projector().project(&message) {
        Ok(Some(c)) => c,
        Ok(None) => return ReplayOutcome::NoManifest,
        Err(e) => {
            return ReplayOutcome::Error {
                message: e.to_string(),
            }
        }
    };

    match reconciler.reconcile(candidate).await {
        Ok(Reconciliation::Committed(record)) => ReplayOutcome::Committed {
            manifest_id: record.manifest_id,
            status: record.status.to_string(),
            percent_complete: record.percent_complete,
        },
        Ok(Reconciliation::Skipped {
            manifest_id,
            execution_ref,
        }) => ReplayOutcome::Skipped {
            manifest_id,
            execution_ref,
        },
        Err(e) => ReplayOutcome::Error {
            message: e.to_string(),
        },
    }
}

fn print_text(reports: &[EventReport], records: &[ManifestRecord], quiet: bool) {
    if !quiet {
        for report in reports {
            println!("{}", report);
        }
        println!();
        println!("{} record(s):", records.len());
    }
    for record in records {
        println!(
            "  {}  {}  {:.1}%  {}",
            record.manifest_id, record.status, record.percent_complete, record.execution_ref
        );
    }
}
