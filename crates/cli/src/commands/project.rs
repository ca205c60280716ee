use std::path::Path;
use std::process;

use pdr_core::Projector;
use pdr_message::WorkflowMessage;

use crate::{read_json_or_exit, report_error, OutputFormat};

pub(crate) fn cmd_project(event_path: &Path, output: OutputFormat, quiet: bool) {
    let doc = read_json_or_exit(event_path, output, quiet);

    let message = match WorkflowMessage::from_value(doc) {
        Ok(m) => m,
        Err(e) => {
            let msg = format!("{}: {}", event_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let projector = match Projector::new() {
        Ok(p) => p,
        Err(e) => {
            report_error(&format!("internal error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let record = match projector.project(&message) {
        Ok(r) => r,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    match (output, record) {
        (OutputFormat::Text, Some(record)) => {
            let pretty = serde_json::to_string_pretty(&record)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        (OutputFormat::Text, None) => {
            if !quiet {
                println!("no manifest on message; nothing would be recorded");
            }
        }
        (OutputFormat::Json, record) => {
            println!("{}", serde_json::json!({ "record": record }));
        }
    }
}
