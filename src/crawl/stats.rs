// src/crawl/stats.rs
// =============================================================================
// Crawl statistics: what happened to every URL that came off the queue.
//
// Workers bump these counters as they go; `snapshot` reads them all into a
// plain serializable struct for the end-of-run summary.
// =============================================================================

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct CrawlStats {
    fetched: AtomicUsize,
    parsed: AtomicUsize,
    throttled: AtomicUsize,
    duplicates: AtomicUsize,
    failed: AtomicUsize,
    skipped_non_html: AtomicUsize,
    links_enqueued: AtomicUsize,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_fetched(&self) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_parsed(&self) {
        self.parsed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_throttled(&self) {
        self.throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_duplicates(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped_non_html(&self) {
        self.skipped_non_html.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_links_enqueued(&self, n: usize) {
        self.links_enqueued.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fetched: self.fetched.load(Ordering::Relaxed),
            parsed: self.parsed.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped_non_html: self.skipped_non_html.load(Ordering::Relaxed),
            links_enqueued: self.links_enqueued.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CrawlStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Requests that produced a response, whatever its status
    pub fetched: usize,
    /// HTML pages whose links were extracted
    pub parsed: usize,
    /// URLs dropped because their host hit the fetch ceiling
    pub throttled: usize,
    /// URLs dropped because they were already claimed
    pub duplicates: usize,
    /// Fetches that ended in a transport error
    pub failed: usize,
    /// Responses that were not 200 + HTML, dropped unread
    pub skipped_non_html: usize,
    pub links_enqueued: usize,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pages fetched:    {}", self.fetched)?;
        writeln!(f, "Pages parsed:     {}", self.parsed)?;
        writeln!(f, "Skipped:          {}", self.skipped_non_html)?;
        writeln!(f, "Failed:           {}", self.failed)?;
        writeln!(f, "Throttled:        {}", self.throttled)?;
        writeln!(f, "Duplicates:       {}", self.duplicates)?;
        write!(f, "Links enqueued:   {}", self.links_enqueued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = CrawlStats::new();
        stats.inc_fetched();
        stats.inc_fetched();
        stats.inc_parsed();
        stats.inc_throttled();
        stats.inc_duplicates();
        stats.inc_failed();
        stats.inc_skipped_non_html();
        stats.add_links_enqueued(7);

        let snapshot = stats.snapshot();
        assert_eq!(
            snapshot,
            StatsSnapshot {
                fetched: 2,
                parsed: 1,
                throttled: 1,
                duplicates: 1,
                failed: 1,
                skipped_non_html: 1,
                links_enqueued: 7,
            }
        );
    }

    #[test]
    fn test_snapshot_serializes_field_names() {
        let snapshot = StatsSnapshot {
            fetched: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["fetched"], 3);
        assert_eq!(json["links_enqueued"], 0);
    }

    #[test]
    fn test_display_lists_every_counter() {
        let rendered = StatsSnapshot::default().to_string();
        assert_eq!(rendered.lines().count(), 7);
        assert!(rendered.contains("Pages fetched:"));
    }
}
