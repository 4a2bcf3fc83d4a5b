//! Command handlers for the memoria CLI.

use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use memoria::errors::Error;
use memoria::memory_types::Metadata;
use memoria::{server, Config, MemoryService};

use crate::output::*;

/// Commands supported by the memoria CLI.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Listen address (overrides config)
        #[arg(short = 'b', long)]
        bind: Option<SocketAddr>,
    },
    /// Save a memory
    Save {
        /// Memory text content
        text: String,

        /// Optional JSON object of string annotations
        #[arg(short = 'm', long)]
        metadata: Option<String>,
    },
    /// Search memories by meaning
    Search {
        /// Search query text
        query: String,

        /// Maximum number of results (default: configured top_k)
        #[arg(short = 'l', long)]
        limit: Option<usize>,
    },
    /// Show backend, model and record count
    Stats,
    Version,
}

/// Execute a CLI command.
pub async fn execute(
    command: &Commands,
    config_path: Option<&Path>,
    json: bool,
) -> Result<ExitCode, Error> {
    if let Commands::Version = command {
        return handle_version(json);
    }

    let mut config = Config::load_from(config_path)?;

    match command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind_address = *bind;
            }
            handle_serve(&config).await
        }
        Commands::Save { text, metadata } => {
            let service = MemoryService::from_config(&config).await?;
            handle_save(&service, text, metadata.as_deref(), json).await
        }
        Commands::Search { query, limit } => {
            let service = MemoryService::from_config(&config).await?;
            let limit = limit.unwrap_or(config.top_k);
            handle_search(&service, query, limit, json).await
        }
        Commands::Stats => {
            let service = MemoryService::from_config(&config).await?;
            handle_stats(&service, json).await
        }
        Commands::Version => handle_version(json),
    }
}

async fn handle_serve(config: &Config) -> Result<ExitCode, Error> {
    let service = Arc::new(MemoryService::from_config(config).await?);
    server::serve(service, &config.server).await?;
    Ok(ExitCode::SUCCESS)
}

/// Parse `--metadata` as a flat JSON object of strings.
fn parse_metadata(raw: &str) -> Result<Metadata, Error> {
    serde_json::from_str(raw).map_err(|e| {
        Error::Validation(format!(
            "metadata must be a JSON object with string values: {e}"
        ))
    })
}

async fn handle_save(
    service: &MemoryService,
    text: &str,
    metadata: Option<&str>,
    json: bool,
) -> Result<ExitCode, Error> {
    let metadata = metadata.map(parse_metadata).transpose()?;
    let id = service.save_with_metadata(text, metadata).await?;
    if json {
        print_json(&SaveResponse {
            status: "success".to_string(),
            id: id.to_string(),
        });
    } else {
        println!("Saved memory: {}", id);
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_search(
    service: &MemoryService,
    query: &str,
    limit: usize,
    json: bool,
) -> Result<ExitCode, Error> {
    let memories = service.search_scored(query, limit).await?;
    if json {
        let results: Vec<SearchResultItem> =
            memories.into_iter().map(SearchResultItem::from).collect();
        print_json(&SearchResponse { results });
    } else {
        for memory in memories {
            println!(
                "{} [score: {:.2}]\n  {}\n",
                memory.id, memory.similarity, memory.content
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_stats(service: &MemoryService, json: bool) -> Result<ExitCode, Error> {
    let memories = service.count().await?;
    if json {
        print_json(&StatsResponse {
            backend: service.backend().to_string(),
            model: service.model_id().to_string(),
            dimension: service.dimension(),
            top_k: service.top_k(),
            memories,
        });
    } else {
        println!("Backend:    {}", service.backend());
        println!("Model:      {}", service.model_id());
        println!("Dimension:  {}", service.dimension());
        println!("Top-k:      {}", service.top_k());
        println!("Memories:   {}", memories);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_version(json: bool) -> Result<ExitCode, Error> {
    if json {
        print_json(&VersionResponse {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        });
    } else {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    }
    Ok(ExitCode::SUCCESS)
}
