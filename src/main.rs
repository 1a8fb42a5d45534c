// src/main.rs
// =============================================================================
// This is the entry point of the byte-crawler CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Build the shared ByteCounter, the HTTP client stack and the crawler
// 3. Start the periodic byte reporter and the Ctrl-C handler
// 4. Run the crawl until it drains (or is interrupted)
// 5. Print the final byte report and crawl summary
// 6. Exit with proper code (0 = crawl finished, 2 = error)
//
// Logs go to stderr (RUST_LOG controls the level, default "info"); the byte
// reports and the summary go to stdout.
// =============================================================================

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use byte_crawler::counter::{format_report, spawn_reporter, ByteCounter};
use byte_crawler::crawl::{Crawler, StatsSnapshot};
use byte_crawler::extract::HtmlParser;
use byte_crawler::http::{CacheConfig, CachingClient, HyperClient};
use clap::Parser;
use cli::Cli;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.crawl_config();
    config.validate().context("invalid crawl settings")?;

    // One counter for the whole session; every socket the client opens
    // reports into it.
    let counter = Arc::new(ByteCounter::new());
    let network = HyperClient::new(Arc::clone(&counter)).context("failed to build HTTP client")?;
    let client = CachingClient::open(network, CacheConfig::new(&cli.cache_dir))
        .with_context(|| format!("failed to open cache directory '{}'", cli.cache_dir.display()))?;

    let crawler = Crawler::new(
        config,
        cli.seed.clone(),
        Arc::new(client),
        Arc::new(HtmlParser::new()),
    )
    .context("failed to start crawler")?;

    let reporter = spawn_reporter(Arc::clone(&counter), crawler.config().report_interval);

    // Ctrl-C stops handing out new URLs; fetches already running finish.
    let frontier = crawler.frontier();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, waiting for in-flight fetches to finish");
            frontier.close();
        }
    });

    let stats = crawler.run().await;
    reporter.abort();
    interrupt.abort();

    println!("{}", format_report(&counter));
    print_summary(&stats, cli.json)?;

    info!(
        bytes_written = counter.bytes_written(),
        bytes_read = counter.bytes_read(),
        "done"
    );
    Ok(())
}

// Prints the crawl statistics either as text or JSON
fn print_summary(stats: &StatsSnapshot, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(stats)?;
        println!("{}", json_output);
    } else {
        println!();
        println!("Summary:");
        for line in stats.to_string().lines() {
            println!("   {}", line);
        }
    }
    Ok(())
}
