// src/lib.rs
// =============================================================================
// byte-crawler: a same-domain web crawler that counts every byte its HTTP
// client sends and receives.
//
// Modules:
// - counter: ByteCounter, CountingStream and the periodic byte report
// - http: the HttpClient boundary, HyperClient and the on-disk cache
// - extract: the DocumentParser boundary and link resolution
// - crawl: frontier, host throttle, domain scope and the worker pool
// - error: TransportError and ConfigError
// =============================================================================

pub mod counter;
pub mod crawl;
pub mod error;
pub mod extract;
pub mod http;

#[cfg(test)]
mod test_support;
