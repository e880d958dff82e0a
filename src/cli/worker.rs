use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{connect, OutputConfig};
use crate::config::Config;
use crate::http::WorkerState;
use crate::qr::{GcsStore, QrWorker};

#[derive(Args)]
pub struct WorkerArgs {
    /// Port to listen on (overrides config and PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind (overrides config and SERVER_ADDRESS)
    #[arg(long)]
    host: Option<String>,
}

pub async fn run(args: WorkerArgs, output: OutputConfig, config: Config) -> Result<()> {
    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);

    let cloud = connect(&config)?;
    let objects = Arc::new(GcsStore::new(&config.qr, cloud.auth));
    let state = Arc::new(WorkerState {
        worker: Arc::new(QrWorker::new(cloud.store, objects)),
    });

    if !output.quiet {
        println!(
            "{} QR worker on http://{}:{} (bucket {})",
            "✓".green(),
            host,
            port,
            config.qr.bucket.cyan()
        );
    }
    crate::http::run_worker(state, &host, port).await
}
