// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
//   byte-crawler <CACHE_DIR> [--seed URL] [--workers N] [--host-limit N]
//                [--report-interval SECS] [--json]
//
// Everything except the cache directory has a default, so
// `byte-crawler ./cache` crawls google.com with 5 workers.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use byte_crawler::crawl::{
    CrawlConfig, DEFAULT_HOST_CEILING, DEFAULT_REPORT_INTERVAL, DEFAULT_SEED, DEFAULT_WORKERS,
};
use clap::Parser;
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "byte-crawler",
    version,
    about = "Crawls a website and reports exactly how many bytes went over the wire",
    long_about = "byte-crawler follows links within the seed URL's registrable domain, \
                  fetching each page once with a fixed pool of workers, and periodically \
                  prints the total bytes written to and read from the network."
)]
pub struct Cli {
    /// Directory for the on-disk HTTP cache (created if missing)
    pub cache_dir: PathBuf,

    /// URL to start crawling from; its registrable domain bounds the crawl
    #[arg(long, default_value = DEFAULT_SEED)]
    pub seed: Url,

    /// Number of concurrent workers
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Maximum fetch attempts per host over the whole crawl
    #[arg(long, default_value_t = DEFAULT_HOST_CEILING)]
    pub host_limit: u32,

    /// Seconds between byte reports
    #[arg(long, default_value_t = DEFAULT_REPORT_INTERVAL.as_secs())]
    pub report_interval: u64,

    /// Print the final summary as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            workers: self.workers,
            host_ceiling: self.host_limit,
            report_interval: Duration::from_secs(self.report_interval),
        }
    }
}
