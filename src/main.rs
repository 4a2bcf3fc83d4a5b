mod commands;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use commands::Commands;
use output::{print_json, ErrorResponse};

/// memoria - Semantic memory service: save free-text memories, retrieve them by meaning
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (default: <config_dir>/memoria/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Log to stderr so JSON on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("memoria=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env (if present) before reading RUST_LOG or MEMORIA_* variables
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Failed to load .env"),
    }

    match commands::execute(&cli.command, cli.config.as_deref(), cli.json).await {
        Ok(code) => code,
        Err(e) => {
            if cli.json {
                print_json(&ErrorResponse {
                    error: e.to_string(),
                    kind: e.kind().to_string(),
                });
            } else {
                eprintln!("Error: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}
