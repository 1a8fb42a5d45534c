// src/crawl/mod.rs
// =============================================================================
// This module handles the crawl itself.
//
// Features:
// - Breadth-first crawling from a single seed URL
// - Stays inside the seed's registrable domain (public suffix aware)
// - Each canonical URL is fetched at most once, however many workers run
// - Per-host fetch ceiling so no single host gets hammered
// - Stops by itself when there is nothing left to fetch
//
// Submodules:
// - domain: registrable-domain scoping
// - frontier: visited set + work queue with drain detection
// - throttle: per-host fetch counts
// - stats: counters for the end-of-run summary
// - scheduler: CrawlConfig and the worker pool
// =============================================================================

mod domain;
mod frontier;
mod scheduler;
mod stats;
mod throttle;

pub use domain::{registrable_domain, DomainScope};
pub use frontier::{canonicalize, Frontier, InFlight};
pub use scheduler::{CrawlConfig, Crawler, DEFAULT_REPORT_INTERVAL, DEFAULT_SEED, DEFAULT_WORKERS};
pub use stats::{CrawlStats, StatsSnapshot};
pub use throttle::{HostThrottle, DEFAULT_HOST_CEILING};
