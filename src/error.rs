// src/error.rs
// =============================================================================
// Error types for the library side of the crawler.
//
// - TransportError: a single fetch failed. The scheduler logs it, drops the
//   URL and keeps going; it is never fatal.
// - ConfigError: the crawler was asked to start with settings it can't run
//   with. Raised before any crawling begins.
//
// Throttled and duplicate URLs are not errors at all; they are ordinary
// skips and never show up here.
// =============================================================================

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The URL could not be turned into an HTTP request target
    #[error("invalid request URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Only http and https are fetched
    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),

    /// Building the request itself failed
    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),

    /// The TLS client configuration could not be built
    #[error("failed to set up TLS: {0}")]
    Tls(#[from] rustls::Error),

    /// Connecting, the TLS handshake or the HTTP exchange failed
    #[error("request failed: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),

    /// The connection broke while the body was streaming
    #[error("failed to read response body: {0}")]
    Body(#[from] hyper::Error),

    /// Redirect chain longer than the client allows
    #[error("too many redirects fetching '{url}' (limit {limit})")]
    TooManyRedirects { url: String, limit: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("worker count must be greater than 0, got {0}")]
    InvalidWorkerCount(usize),

    #[error("per-host fetch ceiling must be greater than 0, got {0}")]
    InvalidHostCeiling(u32),

    #[error("report interval must be greater than 0")]
    ZeroReportInterval,

    #[error("seed URL '{0}' must be an absolute http or https URL")]
    InvalidSeedScheme(String),

    #[error("seed URL '{0}' has no host to scope the crawl to")]
    SeedWithoutHost(String),
}
