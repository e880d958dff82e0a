mod load;
mod query;
mod serve;
mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::ai::{GeminiClient, TextGenerator};
use crate::auth::TokenProvider;
use crate::config::{Config, GeminiConfig};
use crate::storage::FirestoreStore;

#[derive(Parser)]
#[command(name = "uscheck")]
#[command(about = "Tourism recommendation backend for Uiseong county")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Show detailed progress
    #[arg(long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./uscheck.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the recommendation API server
    Serve(serve::ServeArgs),

    /// Run the QR worker that receives Pub/Sub push deliveries
    Worker(worker::WorkerArgs),

    /// Load a TourAPI export into the site collection
    Load(load::LoadArgs),

    /// Ask a running server for recommendations
    Query(query::QueryArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let output = OutputConfig {
            json: self.json,
            quiet: self.quiet,
            verbose: self.verbose,
        };
        let config = Config::resolve(self.config.as_deref())?;

        match self.command {
            Commands::Serve(args) => serve::run(args, output, config).await,
            Commands::Worker(args) => worker::run(args, output, config).await,
            Commands::Load(args) => load::run(args, output, config).await,
            Commands::Query(args) => query::run(args, output).await,
        }
    }
}

/// Output configuration passed to all commands
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
    pub verbose: bool,
}

/// Authenticated Firestore connection shared by the cloud-backed commands
struct Cloud {
    auth: Arc<TokenProvider>,
    store: Arc<FirestoreStore>,
    project_id: String,
}

fn connect(config: &Config) -> Result<Cloud> {
    let auth = Arc::new(
        TokenProvider::discover(&config.firestore).context("Failed to set up Google credentials")?,
    );
    let project_id = auth.resolve_project(&config.firestore.project_id)?;
    let store = Arc::new(FirestoreStore::new(&config.firestore, Arc::clone(&auth))?);
    Ok(Cloud {
        auth,
        store,
        project_id,
    })
}

/// Gemini client when an API key is available. Without one, query analysis
/// runs in its keyword fallback mode.
fn text_generator(config: &GeminiConfig) -> Result<Option<Arc<dyn TextGenerator>>> {
    let Some(api_key) = config.resolve_api_key() else {
        tracing::warn!("No Gemini API key configured, query analysis will use the keyword fallback");
        return Ok(None);
    };
    let client = GeminiClient::new(config, api_key).context("Failed to create Gemini client")?;
    tracing::info!("Gemini model {} ready", config.model);
    let generator: Arc<dyn TextGenerator> = Arc::new(client);
    Ok(Some(generator))
}
