//! selector-cli - drive and inspect identity selection interactions.

mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use selector_core::SelectionRequest;

use commands::CliError;

/// Identity selection step tooling.
#[derive(Parser)]
#[command(name = "selector-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.selector/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for log files (defaults to ~/.selector)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Suspend a new flow and print its AuthState token
    Suspend {
        /// Source that owns the flow
        #[arg(long)]
        source: String,

        /// Previously chosen candidate id
        #[arg(long)]
        remember: Option<String>,

        /// Relying party metadata as a JSON value
        #[arg(long)]
        relying_party: Option<String>,
    },

    /// Run one selection interaction
    Select {
        /// Raw query string, e.g. "AuthState=_ab...&id=1"
        #[arg(long, conflicts_with_all = ["auth_state", "id"])]
        query: Option<String>,

        #[arg(long)]
        auth_state: Option<String>,

        /// Candidate id to select
        #[arg(long)]
        id: Option<String>,
    },

    /// Print a stored state without modifying it
    Inspect {
        token: String,

        /// Stage to load under (defaults to the configured stage)
        #[arg(long)]
        stage: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = logging::init(cli.log_dir.clone());

    match run(cli) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("selector-cli: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<String, CliError> {
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Suspend {
            source,
            remember,
            relying_party,
        } => commands::suspend(
            &config,
            &source,
            remember.as_deref(),
            relying_party.as_deref(),
        ),
        Commands::Select {
            query,
            auth_state,
            id,
        } => {
            let request = match query {
                Some(query) => SelectionRequest::from_query(&query)?,
                None => SelectionRequest { auth_state, id },
            };
            commands::select(&config, &request)
        }
        Commands::Inspect { token, stage } => {
            commands::inspect(&config, &token, stage.as_deref())
        }
    }
}
