// src/crawl/throttle.rs
// =============================================================================
// Per-host request ceiling.
//
// Every request attempt against a host bumps that host's counter; once the
// counter reaches the ceiling, further URLs on that host are dropped. The
// ceiling is lifetime-wide, not a rate: counters never reset during a crawl.
// =============================================================================

use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

pub const DEFAULT_HOST_CEILING: u32 = 100;

#[derive(Debug)]
pub struct HostThrottle {
    ceiling: u32,
    counts: DashMap<String, AtomicU32>,
}

impl HostThrottle {
    pub fn new(ceiling: u32) -> Self {
        Self {
            ceiling,
            counts: DashMap::new(),
        }
    }

    /// Counts one attempt against `host` and says whether it may go ahead.
    ///
    /// The increment and the check are a single atomic step, so with N
    /// concurrent callers on a fresh host exactly `min(N, ceiling)` of them
    /// are admitted.
    pub fn admit(&self, host: &str) -> bool {
        let counter = self.counts.entry(host.to_ascii_lowercase()).or_default();
        // Saturate instead of wrapping, or a host would be let back in after
        // 2^32 refusals. The closure never returns None, so this is always Ok.
        let previous = counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_add(1)))
            .unwrap_or_else(|n| n);
        previous < self.ceiling
    }

    /// Attempts recorded against `host` so far, including refused ones.
    pub fn count(&self, host: &str) -> u32 {
        self.counts
            .get(&host.to_ascii_lowercase())
            .map(|c| c.load(Ordering::Acquire))
            .unwrap_or(0)
    }
}

impl Default for HostThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_HOST_CEILING)
    }
}
