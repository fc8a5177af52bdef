mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use drillbit_common::config::EngineKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "drillbit")]
#[command(about = "Drillbit - Grade practice submissions against generated test cases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a submission against a test suite and print the result as JSON
    Run {
        /// File containing the submitted source
        #[arg(short, long)]
        submission: PathBuf,

        /// JSON file with the test cases (array, or object with `testCases`)
        #[arg(short, long)]
        tests: PathBuf,

        /// Execution engine (boa, node)
        #[arg(short, long)]
        engine: Option<EngineKind>,

        /// Wall-clock limit per test case in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Preferred entry-point name when several functions are defined
        #[arg(long)]
        entry_point: Option<String>,

        /// Evaluator config file (defaults to config/evaluator.json when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long, default_value = "false")]
        pretty: bool,
    },

    /// Show the top-level functions of a submission and the selected entry point
    Inspect {
        /// File containing the submitted source
        #[arg(short, long)]
        submission: PathBuf,

        /// Preferred entry-point name
        #[arg(long)]
        entry_point: Option<String>,
    },

    /// Write a default config/evaluator.json
    Init {
        /// Project path
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing config file
        #[arg(long, default_value = "false")]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            submission,
            tests,
            engine,
            timeout_ms,
            entry_point,
            config,
            pretty,
        } => {
            let overrides = commands::RunOverrides {
                engine,
                timeout_ms,
                entry_point,
            };
            commands::run(&submission, &tests, config.as_deref(), overrides, pretty).await?;
        }
        Commands::Inspect {
            submission,
            entry_point,
        } => {
            commands::inspect(&submission, entry_point.as_deref())?;
        }
        Commands::Init { path, force } => {
            commands::init_config(&path, force)?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
/// `RUST_LOG` sets the filter, `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}
