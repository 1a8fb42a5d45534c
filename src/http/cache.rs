// src/http/cache.rs
// =============================================================================
// CachingClient: an on-disk HTTP cache in front of any HttpClient.
//
// Only successful HTML pages (200 + text/html) are candidates, since those
// are the only responses the crawler reads. Whether a candidate is stored,
// and for how long it may be served without asking the server again, is
// decided by its caching headers through http-cache-semantics:
//
// - `no-store` and `private` pages are never written
// - a fresh entry (within `max-age`, `Expires`, or heuristic lifetime) is
//   served straight from disk and adds nothing to the byte counters
// - a stale entry with an ETag or Last-Modified is revalidated with a
//   conditional request; a 304 refreshes it, anything else replaces it
// - a stale entry without validators is simply refetched
//
// Each entry is one JSON file named after the SHA-256 of the URL (fragment
// stripped), holding the page and its serialized CachePolicy.
//
// The cache is best effort: a corrupt entry, a full disk or a write error is
// logged and the fetch goes ahead as if there were no cache. The directory
// is bounded by `max_bytes`; once full, new pages are simply not stored.
// =============================================================================

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use async_trait::async_trait;
use http::header::{HeaderValue, USER_AGENT as USER_AGENT_HEADER};
use http::{HeaderMap, Request, Response, StatusCode, Uri};
use http_cache_semantics::{AfterResponse, BeforeRequest, CachePolicy};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use url::Url;

use super::{FetchResponse, HttpClient, ResponseBody, USER_AGENT};
use crate::error::TransportError;

pub const DEFAULT_CACHE_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub max_bytes: u64,
}

impl CacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: DEFAULT_CACHE_BYTES,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CachedPage {
    url: String,
    final_url: Url,
    content_type: String,
    body: String,
    policy: CachePolicy,
}

impl CachedPage {
    fn into_response(self, headers: HeaderMap) -> FetchResponse {
        FetchResponse::new(StatusCode::OK, self.final_url, ResponseBody::from_bytes(self.body))
            .with_content_type(self.content_type)
            .with_headers(headers)
    }
}

pub struct CachingClient<C> {
    inner: C,
    dir: PathBuf,
    max_bytes: u64,
    used_bytes: AtomicU64,
}

impl<C: HttpClient> CachingClient<C> {
    /// Opens (creating if needed) the cache directory and measures what is
    /// already stored in it.
    pub fn open(inner: C, config: CacheConfig) -> io::Result<Self> {
        std::fs::create_dir_all(&config.dir)?;
        let used = directory_size(&config.dir)?;
        debug!(dir = %config.dir.display(), used, "opened response cache");
        Ok(Self {
            inner,
            dir: config.dir,
            max_bytes: config.max_bytes,
            used_bytes: AtomicU64::new(used),
        })
    }

    pub fn used_bytes(&self) -> u64 {
        self.used_bytes.load(Ordering::Relaxed)
    }

    fn entry_path(&self, url: &Url) -> PathBuf {
        self.dir.join(format!("{}.json", cache_key(url)))
    }

    async fn load(&self, path: &Path) -> Option<CachedPage> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read cache entry");
                return None;
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(page) => Some(page),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt cache entry");
                None
            }
        }
    }

    // Stores `response` if it is a 200 HTML page its headers allow caching.
    // `had_entry` means a stale entry sits at `path`; it is dropped when the
    // new response may not replace it.
    async fn store_if_cacheable(
        &self,
        url: &Url,
        path: &Path,
        request: &Request<()>,
        response: FetchResponse,
        had_entry: bool,
    ) -> Result<FetchResponse, TransportError> {
        if response.status != StatusCode::OK || !response.is_html() {
            if had_entry {
                self.evict(path).await;
            }
            return Ok(response);
        }

        let policy = CachePolicy::new(request, &policy_response(response.status, &response.headers));
        if !policy.is_storable() {
            debug!(%url, "response forbids caching, not storing");
            if had_entry {
                self.evict(path).await;
            }
            return Ok(response);
        }

        let FetchResponse {
            content_type,
            headers,
            final_url,
            body,
            ..
        } = response;
        let page = CachedPage {
            url: url.to_string(),
            final_url,
            content_type: content_type.unwrap_or_default(),
            body: body.text().await?,
            policy,
        };
        self.store(path, &page).await;
        Ok(page.into_response(headers))
    }

    async fn store(&self, path: &Path, page: &CachedPage) {
        let encoded = match serde_json::to_vec(page) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(url = %page.url, error = %e, "failed to encode cache entry");
                return;
            }
        };

        // Overwriting frees whatever the old entry took up
        let replaced = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);

        // Reserve the space first so concurrent stores can't overshoot.
        let len = encoded.len() as u64;
        let before = self.used_bytes.fetch_add(len, Ordering::AcqRel);
        if before.saturating_add(len).saturating_sub(replaced) > self.max_bytes {
            self.release(len);
            debug!(url = %page.url, "response cache is full, not storing");
            return;
        }

        match tokio::fs::write(path, &encoded).await {
            Ok(()) => self.release(replaced),
            Err(e) => {
                self.release(len);
                warn!(path = %path.display(), error = %e, "failed to write cache entry");
            }
        }
    }

    async fn evict(&self, path: &Path) {
        let Ok(metadata) = tokio::fs::metadata(path).await else {
            return;
        };
        match tokio::fs::remove_file(path).await {
            Ok(()) => self.release(metadata.len()),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove cache entry"),
        }
    }

    fn release(&self, len: u64) {
        // Never below zero, even if the directory changed under us
        let _ = self
            .used_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| Some(used.saturating_sub(len)));
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for CachingClient<C> {
    async fn execute(&self, url: &Url) -> Result<FetchResponse, TransportError> {
        let path = self.entry_path(url);
        let request = policy_request(url)?;

        let Some(page) = self.load(&path).await else {
            let response = self.inner.execute(url).await?;
            return self.store_if_cacheable(url, &path, &request, response, false).await;
        };

        let conditional = match page.policy.before_request(&request, SystemTime::now()) {
            BeforeRequest::Fresh(parts) => {
                debug!(%url, "served from cache");
                return Ok(page.into_response(parts.headers));
            }
            BeforeRequest::Stale { request, matches: true } => request,
            // Stored for a different request shape; treat as a miss
            BeforeRequest::Stale { matches: false, .. } => {
                let response = self.inner.execute(url).await?;
                return self.store_if_cacheable(url, &path, &request, response, true).await;
            }
        };

        // `conditional` carries If-None-Match / If-Modified-Since when the
        // stored page had validators
        debug!(%url, "revalidating cached page");
        let response = self.inner.execute_with_headers(url, &conditional.headers).await?;
        if response.status != StatusCode::NOT_MODIFIED {
            return self.store_if_cacheable(url, &path, &request, response, true).await;
        }

        let not_modified = policy_response(response.status, &response.headers);
        response.body.discard();
        let revalidation = Request::from_parts(conditional, ());
        match page.policy.after_response(&revalidation, &not_modified, SystemTime::now()) {
            AfterResponse::NotModified(policy, parts) => {
                debug!(%url, "cached page still valid");
                let page = CachedPage { policy, ..page };
                self.store(&path, &page).await;
                Ok(page.into_response(parts.headers))
            }
            // A 304 whose validators don't match what we stored
            AfterResponse::Modified(..) => {
                let response = self.inner.execute(url).await?;
                self.store_if_cacheable(url, &path, &request, response, true).await
            }
        }
    }
}

// Lowercase hex SHA-256 of the URL without its fragment.
fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    let digest = Sha256::digest(url.as_str().as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

// The request HyperClient sends for `url`, as far as caching rules care.
fn policy_request(url: &Url) -> Result<Request<()>, TransportError> {
    let mut target = url.clone();
    target.set_fragment(None);
    let uri = target
        .as_str()
        .parse::<Uri>()
        .map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let mut request = Request::new(());
    *request.uri_mut() = uri;
    request
        .headers_mut()
        .insert(USER_AGENT_HEADER, HeaderValue::from_static(USER_AGENT));
    Ok(request)
}

fn policy_response(status: StatusCode, headers: &HeaderMap) -> Response<()> {
    let mut response = Response::new(());
    *response.status_mut() = status;
    *response.headers_mut() = headers.clone();
    response
}

fn directory_size(dir: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in std::fs::read_dir(dir)? {
        let metadata = entry?.metadata()?;
        if metadata.is_file() {
            total += metadata.len();
        }
    }
    Ok(total)
}
