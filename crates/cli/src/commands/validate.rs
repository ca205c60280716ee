use std::path::Path;
use std::process;

use pdr_core::RecordSchema;

use crate::{read_json_or_exit, report_error, OutputFormat};

pub(crate) fn cmd_validate(record_path: &Path, output: OutputFormat, quiet: bool) {
    let schema = match RecordSchema::embedded() {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("internal error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let doc = read_json_or_exit(record_path, output, quiet);
    let errors = schema.validate_value(&doc);

    if errors.is_empty() {
        if !quiet {
            match output {
                OutputFormat::Text => println!("valid"),
                OutputFormat::Json => println!("{}", serde_json::json!({ "valid": true })),
            }
        }
        return;
    }

    match output {
        OutputFormat::Text => {
            if !quiet {
                eprintln!("invalid record");
                for err in &errors {
                    eprintln!("  - {}", err);
                }
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "valid": false,
                "errors": errors,
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
    }
    process::exit(1);
}
