// src/test_support.rs
// =============================================================================
// Fixtures shared by tests in more than one module.
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

/// 41 bytes on the wire: status line, one header, blank line, 3 body bytes.
pub const CANNED_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nABC";

/// A running canned server and what it has seen so far.
pub struct CannedServer {
    pub url: Url,
    /// Request bytes taken off the wire, across all connections
    received: Arc<AtomicUsize>,
    /// TCP connections accepted
    accepted: Arc<AtomicUsize>,
}

impl CannedServer {
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::SeqCst) as u64
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

/// A minimal keep-alive HTTP/1.1 server. Every request on every connection
/// gets CANNED_RESPONSE. The received count is updated before the matching
/// response is written, so it is complete once the client has the response.
pub async fn canned_server() -> CannedServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
    let received = Arc::new(AtomicUsize::new(0));
    let accepted = Arc::new(AtomicUsize::new(0));

    let total = Arc::clone(&received);
    let connections = Arc::clone(&accepted);
    tokio::spawn(async move {
        loop {
            let (mut socket, _) = listener.accept().await.unwrap();
            connections.fetch_add(1, Ordering::SeqCst);
            let total = Arc::clone(&total);
            tokio::spawn(async move {
                let mut pending = Vec::new();
                let mut buf = [0u8; 1024];
                loop {
                    let n = match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    total.fetch_add(n, Ordering::SeqCst);
                    pending.extend_from_slice(&buf[..n]);
                    // One canned response per complete request head
                    while let Some(end) = find_header_end(&pending) {
                        pending.drain(..end);
                        if socket.write_all(CANNED_RESPONSE).await.is_err() {
                            return;
                        }
                    }
                }
            });
        }
    });

    CannedServer {
        url,
        received,
        accepted,
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}
