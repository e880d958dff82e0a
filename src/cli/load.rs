use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::{connect, OutputConfig};
use crate::config::Config;
use crate::loader::{load_items, parse_items, LoadReport};
use crate::storage::MemoryStore;

#[derive(Args)]
pub struct LoadArgs {
    /// TourAPI JSON export (full response or a bare array of items)
    file: PathBuf,

    /// Build the documents without connecting to Firestore
    #[arg(long)]
    dry_run: bool,
}

pub async fn run(args: LoadArgs, output: OutputConfig, config: Config) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let data: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;
    let items = parse_items(&data)?;

    let source = args
        .file
        .file_name()
        .map_or_else(|| args.file.display().to_string(), |n| n.to_string_lossy().into_owned());

    let report = if args.dry_run {
        load_items(&MemoryStore::new(), &items, &source, true).await?
    } else {
        let cloud = connect(&config)?;
        load_items(cloud.store.as_ref(), &items, &source, false).await?
    };

    if output.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !output.quiet {
        print_report(&report, &source);
    }

    Ok(())
}

fn print_report(report: &LoadReport, source: &str) {
    let verb = if report.dry_run { "Would add" } else { "Added" };
    println!(
        "{} Loaded {} ({} items)",
        "✓".green(),
        source.cyan(),
        report.total
    );
    println!("  {}:     {}", verb, report.added.to_string().green());
    println!("  Skipped:   {}", report.skipped.to_string().yellow());
    if report.failed > 0 {
        println!("  Failed:    {}", report.failed.to_string().red());
    }

    if !report.categories.is_empty() {
        println!("\n  Categories:");
        for (category, count) in &report.categories {
            println!("    {}: {}", category.blue(), count);
        }
    }
}
