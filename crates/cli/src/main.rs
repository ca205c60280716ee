mod commands;
mod config;
mod logging;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// PDR ingest status tracking.
#[derive(Parser)]
#[command(name = "pdr", version, about = "PDR ingest status tracking")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a TOML configuration file (default: ./pdr.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a PDR acknowledgment payload
    Ack {
        #[command(subcommand)]
        command: AckCommands,
    },

    /// Project a workflow message into the record it would produce
    Project {
        /// Path to the workflow message JSON file
        event: PathBuf,
    },

    /// Reconcile workflow messages in order against an empty in-memory store
    Replay {
        /// JSON files, each holding one message or an array of messages
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Validate a stored record document against the record schema
    Validate {
        /// Path to the record JSON file
        record: PathBuf,
    },

    /// Start the PDR status HTTP API server
    Serve {
        /// Port to listen on (overrides config and PDR_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
pub(crate) enum AckCommands {
    /// Short acknowledgment for a PDR that parsed successfully
    Success,
    /// Short acknowledgment for a PDR rejected with a disposition
    Failure {
        /// Disposition text, e.g. "INVALID FILE COUNT"
        reason: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut config = match config::Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    logging::init(&config.logging);

    match cli.command {
        Commands::Ack { command } => {
            commands::ack::cmd_ack(command, cli.output);
        }
        Commands::Project { event } => {
            commands::project::cmd_project(&event, cli.output, cli.quiet);
        }
        Commands::Replay { files } => {
            commands::replay::cmd_replay(&files, cli.output, cli.quiet);
        }
        Commands::Validate { record } => {
            commands::validate::cmd_validate(&record, cli.output, cli.quiet);
        }
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    report_error(
                        &format!("failed to create tokio runtime: {}", e),
                        cli.output,
                        cli.quiet,
                    );
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(config)) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
    }
}

/// Report an error message in the requested format on stderr.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

/// Read and parse a JSON file, reporting and exiting on failure.
pub(crate) fn read_json_or_exit(
    path: &std::path::Path,
    output: OutputFormat,
    quiet: bool,
) -> serde_json::Value {
    let src = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match serde_json::from_str(&src) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}
