// src/crawl/frontier.rs
// =============================================================================
// The crawl frontier: which URLs have been claimed, and which are waiting.
//
// - visited: a concurrent set of canonical URLs. `try_claim` is a single
//   insert-if-absent, so exactly one caller ever wins a given URL.
// - pending: a FIFO queue shared by every worker. `dequeue` waits while it
//   is empty.
//
// Drain detection: the frontier counts outstanding work, i.e. URLs queued
// plus URLs a worker is holding. `dequeue` hands out an InFlight guard; when
// the last guard drops and nothing is queued, no new work can ever arrive,
// so the frontier closes itself and wakes every waiting worker.
// =============================================================================

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::DashSet;
use tokio::sync::Notify;
use tracing::debug;
use url::Url;

// Canonical form used for deduplication: the URL without its fragment.
// The url crate already lowercases scheme and host and drops default ports.
pub fn canonicalize(url: &Url) -> Url {
    let mut canonical = url.clone();
    canonical.set_fragment(None);
    canonical
}

#[derive(Debug, Default)]
pub struct Frontier {
    visited: DashSet<Url>,
    pending: Mutex<VecDeque<Url>>,
    outstanding: AtomicUsize,
    closed: AtomicBool,
    wakeup: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `url` as visited. True only for the first caller with this
    /// canonical URL; everybody else must skip it.
    pub fn try_claim(&self, url: &Url) -> bool {
        self.visited.insert(canonicalize(url))
    }

    /// Appends `url` to the queue. Ignored once the frontier is closed.
    pub fn enqueue(&self, url: Url) {
        if self.is_closed() {
            return;
        }
        // Count before publishing, so a worker finishing concurrently never
        // sees zero outstanding while this URL is about to be queued
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.queue().push_back(url);
        // One URL, one waiter
        self.wakeup.notify_one();
    }

    /// Takes the next URL, waiting while the queue is empty.
    ///
    /// Returns None once the frontier is closed, either because the crawl
    /// drained or because `close` was called.
    pub async fn dequeue(&self) -> Option<InFlight<'_>> {
        loop {
            // Register for a wakeup before looking, so an enqueue or close
            // that lands between the check and the await isn't missed.
            let notified = self.wakeup.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_closed() {
                return None;
            }
            // Pop in its own statement so the lock is released before the
            // guard is built or we go to sleep
            let next = self.queue().pop_front();
            if let Some(url) = next {
                return Some(InFlight {
                    frontier: self,
                    url,
                });
            }

            // Empty but work is still in flight: a worker may enqueue more
            notified.await;
        }
    }

    /// Stops the crawl: waiting workers wake up with None, queued URLs are
    /// abandoned, and URLs already being fetched finish normally.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(
                visited = self.visited_count(),
                pending = self.pending_count(),
                "frontier closed"
            );
        }
        self.wakeup.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn pending_count(&self) -> usize {
        self.queue().len()
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Url>> {
        // Nothing panics while holding this lock, but don't let a poisoned
        // lock take the whole crawl down either.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_one(&self) {
        // Dropping from 1 to 0: nothing queued, nothing being fetched
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            debug!("frontier drained");
            self.close();
        }
    }
}

/// A URL taken off the queue. The frontier counts it as in flight until the
/// guard is dropped, so enqueue any discovered links before dropping it.
#[derive(Debug)]
pub struct InFlight<'a> {
    frontier: &'a Frontier,
    url: Url,
}

impl InFlight<'_> {
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.frontier.finish_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_fragments_collapse_to_one_claim() {
        let frontier = Frontier::new();
        assert!(frontier.try_claim(&url("https://a.com/p#frag1")));
        assert!(!frontier.try_claim(&url("https://a.com/p#frag2")));
        assert!(!frontier.try_claim(&url("https://a.com/p")));
        assert!(!frontier.try_claim(&url("HTTPS://A.COM:443/p")));
        assert!(frontier.try_claim(&url("https://a.com/p?x=1")));
        assert_eq!(frontier.visited_count(), 2);
    }

    #[test]
    fn test_canonicalize_keeps_query_and_port() {
        assert_eq!(
            canonicalize(&url("http://a.com:8080/p?q=1#top")).as_str(),
            "http://a.com:8080/p?q=1"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_exactly_one_concurrent_claim_wins() {
        let frontier = Arc::new(Frontier::new());
        let target = url("https://a.com/contested");

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let frontier = Arc::clone(&frontier);
                let mut target = target.clone();
                target.set_fragment(Some(&format!("variant-{}", i)));
                tokio::spawn(async move { frontier.try_claim(&target) })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_dequeue_is_fifo() {
        let frontier = Frontier::new();
        frontier.enqueue(url("https://a.com/1"));
        frontier.enqueue(url("https://a.com/2"));
        frontier.enqueue(url("https://a.com/3"));
        assert_eq!(frontier.pending_count(), 3);

        for expected in ["/1", "/2", "/3"] {
            let item = frontier.dequeue().await.unwrap();
            assert_eq!(item.url().path(), expected);
            // Keep the crawl alive while we still expect more items.
            std::mem::forget(item);
        }
    }

    #[tokio::test]
    async fn test_drains_when_last_item_finishes() {
        let frontier = Frontier::new();
        frontier.enqueue(url("https://a.com/seed"));

        let seed = frontier.dequeue().await.unwrap();
        frontier.enqueue(url("https://a.com/child"));
        drop(seed);
        assert!(!frontier.is_closed());

        let child = frontier.dequeue().await.unwrap();
        assert_eq!(child.url().path(), "/child");
        drop(child);

        assert!(frontier.is_closed());
        assert!(frontier.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_waiting_worker_is_woken_by_enqueue() {
        let frontier = Arc::new(Frontier::new());
        frontier.enqueue(url("https://a.com/seed"));
        let seed = frontier.dequeue().await.unwrap();

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move {
                let item = frontier.dequeue().await?;
                Some(item.url().clone())
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        frontier.enqueue(url("https://a.com/found"));
        drop(seed);

        let got = timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap();
        assert_eq!(got.unwrap().path(), "/found");
    }

    #[tokio::test]
    async fn test_drain_wakes_every_waiting_worker() {
        let frontier = Arc::new(Frontier::new());
        frontier.enqueue(url("https://a.com/seed"));
        let seed = frontier.dequeue().await.unwrap();

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                tokio::spawn(async move { frontier.dequeue().await.is_none() })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(seed);

        for waiter in waiters {
            let drained = timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap();
            assert!(drained);
        }
    }

    #[tokio::test]
    async fn test_close_abandons_pending_work() {
        let frontier = Frontier::new();
        frontier.enqueue(url("https://a.com/1"));
        frontier.enqueue(url("https://a.com/2"));

        frontier.close();
        assert!(frontier.dequeue().await.is_none());

        frontier.enqueue(url("https://a.com/3"));
        assert_eq!(frontier.pending_count(), 2);
    }
}
