// src/crawl/scheduler.rs
// =============================================================================
// The crawl itself: a fixed pool of workers draining the frontier.
//
// Each worker loops:
//   dequeue -> claim (skip duplicates) -> admit (skip throttled hosts)
//   -> fetch -> 200 + HTML? -> extract links -> resolve against final URL
//   -> keep same-domain links -> strip fragment -> enqueue
//
// A failed fetch is logged and forgotten; nothing is retried. The pool
// stops by itself once the frontier drains, or early if someone closes
// the frontier.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use http::StatusCode;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use super::domain::DomainScope;
use super::frontier::Frontier;
use super::stats::{CrawlStats, StatsSnapshot};
use super::throttle::{HostThrottle, DEFAULT_HOST_CEILING};
use crate::error::ConfigError;
use crate::extract::{resolve_link, DocumentParser};
use crate::http::{FetchResponse, HttpClient};

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_SEED: &str = "https://www.google.com";
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Number of concurrent workers
    pub workers: usize,
    /// Lifetime fetch attempts allowed per host
    pub host_ceiling: u32,
    /// How often the byte report is printed
    pub report_interval: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            host_ceiling: DEFAULT_HOST_CEILING,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }
}

impl CrawlConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkerCount(self.workers));
        }
        if self.host_ceiling == 0 {
            return Err(ConfigError::InvalidHostCeiling(self.host_ceiling));
        }
        if self.report_interval.is_zero() {
            return Err(ConfigError::ZeroReportInterval);
        }
        Ok(())
    }
}

// Everything the workers share.
struct CrawlState {
    scope: DomainScope,
    frontier: Arc<Frontier>,
    throttle: HostThrottle,
    stats: CrawlStats,
    client: Arc<dyn HttpClient>,
    parser: Arc<dyn DocumentParser>,
}

pub struct Crawler {
    config: CrawlConfig,
    seed: Url,
    state: Arc<CrawlState>,
}

impl Crawler {
    /// Sets up a crawl of `seed`'s registrable domain. Nothing is fetched
    /// until [`Crawler::run`].
    pub fn new(
        config: CrawlConfig,
        seed: Url,
        client: Arc<dyn HttpClient>,
        parser: Arc<dyn DocumentParser>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        if seed.scheme() != "http" && seed.scheme() != "https" {
            return Err(ConfigError::InvalidSeedScheme(seed.to_string()));
        }
        let scope = DomainScope::of(&seed).ok_or_else(|| ConfigError::SeedWithoutHost(seed.to_string()))?;

        let state = CrawlState {
            scope,
            frontier: Arc::new(Frontier::new()),
            throttle: HostThrottle::new(config.host_ceiling),
            stats: CrawlStats::new(),
            client,
            parser,
        };
        Ok(Self {
            config,
            seed,
            state: Arc::new(state),
        })
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn scope(&self) -> &DomainScope {
        &self.state.scope
    }

    /// Handle for stopping the crawl from outside (e.g. on Ctrl-C) via
    /// [`Frontier::close`].
    pub fn frontier(&self) -> Arc<Frontier> {
        Arc::clone(&self.state.frontier)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.state.stats.snapshot()
    }

    /// Seeds the frontier and runs the worker pool until the crawl drains
    /// or the frontier is closed.
    pub async fn run(&self) -> StatsSnapshot {
        info!(
            seed = %self.seed,
            domain = self.state.scope.domain(),
            workers = self.config.workers,
            host_ceiling = self.config.host_ceiling,
            "starting crawl"
        );
        // The seed is the only URL that enters the frontier without coming
        // off a page
        self.state.frontier.enqueue(self.seed.clone());

        let workers: Vec<_> = (0..self.config.workers)
            .map(|id| tokio::spawn(worker(id, Arc::clone(&self.state))))
            .collect();
        // Workers return once the frontier reports drained or closed;
        // a join error here means one of them panicked
        for result in join_all(workers).await {
            if let Err(e) = result {
                error!(error = %e, "crawl worker stopped abnormally");
            }
        }

        let stats = self.state.stats.snapshot();
        info!(
            visited = self.state.frontier.visited_count(),
            fetched = stats.fetched,
            parsed = stats.parsed,
            failed = stats.failed,
            "crawl finished"
        );
        stats
    }
}

async fn worker(id: usize, state: Arc<CrawlState>) {
    debug!(worker = id, "worker started");
    while let Some(item) = state.frontier.dequeue().await {
        state.visit(item.url()).await;
        // `item` drops here, after any links it found are already queued
    }
    debug!(worker = id, "worker finished");
}

impl CrawlState {
    async fn visit(&self, url: &Url) {
        // Claim before throttling: a duplicate never spends host budget
        if !self.frontier.try_claim(url) {
            trace!(%url, "already visited");
            self.stats.inc_duplicates();
            return;
        }

        // Every URL in the frontier passed the scope check, which needs a host
        let Some(host) = url.host_str() else {
            return;
        };
        if !self.throttle.admit(host) {
            debug!(%url, host, "host fetch ceiling reached, skipping");
            self.stats.inc_throttled();
            return;
        }

        let response = match self.client.execute(url).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, error = %e, "fetch failed");
                self.stats.inc_failed();
                return;
            }
        };
        self.stats.inc_fetched();

        // Only successful HTML is read; anything else is dropped unread so
        // the connection goes back to the pool without the rest of the body
        if response.status != StatusCode::OK || !response.is_html() {
            debug!(
                %url,
                status = %response.status,
                content_type = response.content_type.as_deref().unwrap_or("-"),
                "not an HTML page, skipping body"
            );
            self.stats.inc_skipped_non_html();
            response.body.discard();
            return;
        }

        self.follow_links(url, response).await;
    }

    async fn follow_links(&self, url: &Url, response: FetchResponse) {
        // Links resolve against where the page ended up, not where we asked
        let FetchResponse { final_url, body, .. } = response;
        let html = match body.text().await {
            Ok(html) => html,
            Err(e) => {
                warn!(%url, error = %e, "failed to read page body");
                self.stats.inc_failed();
                return;
            }
        };
        self.stats.inc_parsed();

        let mut enqueued = 0;
        for href in self.parser.extract_links(&html, &final_url) {
            let Some(mut link) = resolve_link(&final_url, &href) else {
                trace!(href = %href, "dropping link that is not http(s)");
                continue;
            };
            if !self.scope.contains(&link) {
                trace!(%link, "dropping off-domain link");
                continue;
            }
            // "page#a" and "page#b" are the same fetch
            link.set_fragment(None);
            // Duplicates are fine here; the claim in `visit` weeds them out
            self.frontier.enqueue(link);
            enqueued += 1;
        }
        self.stats.add_links_enqueued(enqueued);
        debug!(%url, %final_url, links = enqueued, "page crawled");
    }
}
