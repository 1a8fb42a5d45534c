// src/counter/mod.rs
// =============================================================================
// Byte accounting for everything the HTTP client puts on (or takes off) the
// wire.
//
// A single ByteCounter is created per crawl session and shared by Arc with
// the connector. Every socket the connector opens is wrapped in a
// CountingStream (see stream.rs) exactly once, so pooled connection reuse,
// TLS records and streamed bodies are all attributed correctly.
//
// Submodules:
// - stream: the CountingStream wrapper (sync and async I/O)
// - report: the periodic "Data written / Data read" console reporter
// =============================================================================

mod report;
mod stream;

pub use report::{format_report, spawn_reporter, to_megabytes};
pub use stream::CountingStream;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Running totals of bytes written to and read from instrumented streams.
///
/// Both totals only ever grow. There is no reset: create a new counter for a
/// new session.
#[derive(Debug, Default)]
pub struct ByteCounter {
    written: AtomicU64,
    read: AtomicU64,
}

impl ByteCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes written through instrumented streams so far.
    pub fn bytes_written(&self) -> u64 {
        self.written.load(Ordering::Acquire)
    }

    /// Total bytes read through instrumented streams so far.
    pub fn bytes_read(&self) -> u64 {
        self.read.load(Ordering::Acquire)
    }

    pub fn record_written(&self, n: u64) {
        add(&self.written, n);
    }

    pub fn record_read(&self, n: u64) {
        add(&self.read, n);
    }

    /// Wraps a raw stream so that every byte moved through it lands in this
    /// counter. Call it once per socket; the returned wrapper is the only
    /// handle the rest of the stack should use.
    pub fn instrument<S>(self: &Arc<Self>, inner: S) -> CountingStream<S> {
        CountingStream::new(inner, Arc::clone(self))
    }
}

// Lock-free add: load, compute, swap only if nobody raced us, retry otherwise.
// Called from every socket poll, so it must never block.
fn add(total: &AtomicU64, n: u64) {
    if n == 0 {
        return;
    }
    let mut current = total.load(Ordering::Relaxed);
    loop {
        let updated = current.saturating_add(n);
        match total.compare_exchange_weak(current, updated, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}
