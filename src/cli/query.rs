use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::OutputConfig;
use crate::http::client::Client;

#[derive(Args)]
pub struct QueryArgs {
    /// What the visitor is looking for, in plain language
    text: String,

    /// Base URL of a running uscheck server
    #[arg(long, env = "USCHECK_SERVER", default_value = "http://localhost:8000")]
    server: String,
}

pub async fn run(args: QueryArgs, output: OutputConfig) -> Result<()> {
    let client = Client::new(&args.server);
    if output.verbose && !output.json {
        let health = client.health().await?;
        eprintln!("Server {} is {}", client.base_url(), health.status);
    }
    let rec = client.query(&args.text).await?;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&rec)?);
        return Ok(());
    }
    if output.quiet {
        for spot in &rec.recommended_spots {
            println!("{}", spot.title);
        }
        return Ok(());
    }

    let mode = if rec.ai_used {
        "AI".green()
    } else {
        "fallback".yellow()
    };
    println!(
        "{} {} recommendations for {:?} ({})",
        "✓".green(),
        rec.returned_count.to_string().cyan(),
        rec.query,
        mode
    );
    println!("  Keywords: {}", rec.analysis.keywords.join(", ").cyan());
    println!();

    for (i, spot) in rec.recommended_spots.iter().enumerate() {
        let price = match spot.price.as_str() {
            "" => String::new(),
            "0" => " (free)".to_string(),
            p => format!(" ({p}원)"),
        };
        println!("{:2}. {}{}", i + 1, spot.title.bold(), price.dimmed());
        if !spot.addr1.is_empty() {
            println!("    {}", spot.addr1);
        }
        if output.verbose && !spot.overview.is_empty() {
            let preview: String = spot.overview.chars().take(120).collect();
            println!("    {}", preview.dimmed());
        }
    }

    Ok(())
}
