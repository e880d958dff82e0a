use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::{connect, text_generator, OutputConfig};
use crate::config::Config;
use crate::http::AppState;
use crate::loader::{load_items, parse_items};
use crate::qr::{LocalPublisher, MemoryObjectStore, PubSubPublisher, QrWorker};
use crate::storage::MemoryStore;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config and PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind (overrides config and SERVER_ADDRESS)
    #[arg(long)]
    host: Option<String>,

    /// Serve from in-memory stores seeded with a TourAPI export instead of
    /// Google Cloud
    #[arg(long, value_name = "FILE")]
    seed: Option<PathBuf>,
}

pub async fn run(args: ServeArgs, output: OutputConfig, mut config: Config) -> Result<()> {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    let generator = text_generator(&config.gemini)?;
    let state = match &args.seed {
        Some(seed) => local_state(seed, generator, &config, output).await?,
        None => {
            let cloud = connect(&config)?;
            let publisher = PubSubPublisher::new(&cloud.project_id, &config.qr.topic, cloud.auth);
            AppState::new(
                cloud.store,
                generator,
                Arc::new(publisher),
                config.search.max_results,
            )
        }
    };

    if !output.quiet {
        println!(
            "{} uscheck API on http://{}:{}",
            "✓".green(),
            config.server.host,
            config.server.port
        );
    }
    crate::http::run_server(Arc::new(state), &config.server).await
}

/// In-memory backends seeded through the bulk loader. QR requests are
/// rendered by an in-process worker.
async fn local_state(
    seed: &Path,
    generator: Option<Arc<dyn crate::ai::TextGenerator>>,
    config: &Config,
    output: OutputConfig,
) -> Result<AppState> {
    let content = std::fs::read_to_string(seed)
        .with_context(|| format!("Failed to read seed file: {}", seed.display()))?;
    let data: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse seed file: {}", seed.display()))?;
    let items = parse_items(&data)?;

    let store = Arc::new(MemoryStore::new());
    let source = seed.display().to_string();
    let report = load_items(store.as_ref(), &items, &source, false).await?;
    if !output.quiet {
        println!(
            "{} Seeded {} sites from {}",
            "✓".green(),
            report.added.to_string().cyan(),
            seed.display()
        );
    }

    let objects = Arc::new(MemoryObjectStore::new(&config.qr));
    let worker = Arc::new(QrWorker::new(store.clone(), objects));
    Ok(AppState::new(
        store,
        generator,
        Arc::new(LocalPublisher::new(worker)),
        config.search.max_results,
    ))
}
