use time::OffsetDateTime;

use crate::{AckCommands, OutputFormat};

pub(crate) fn cmd_ack(command: AckCommands, output: OutputFormat) {
    let body = match command {
        AckCommands::Success => pdr_core::build_success_ack(OffsetDateTime::now_utc()),
        AckCommands::Failure { reason } => pdr_core::build_failure_ack(&reason),
    };

    match output {
        // The body already ends in a newline.
        OutputFormat::Text => print!("{}", body),
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "acknowledgment": body }));
        }
    }
}
