// src/http/connector.rs
// =============================================================================
// The socket hook between the HTTP stack and the ByteCounter.
//
// hyper's pooled client asks its connector for a new connection whenever it
// has no idle one to reuse. CountingConnector answers by opening a plain TCP
// stream and wrapping it in a CountingStream right away, before TLS or HTTP
// see a single byte. Because the pool keeps and reuses the wrapped
// connection, each socket is wrapped exactly once for its whole lifetime:
// no second wrapper, no double counting.
// =============================================================================

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::Uri;
use hyper::rt::{Read, ReadBufCursor, Write};
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tower_service::Service;
use tracing::debug;

use crate::counter::{ByteCounter, CountingStream};

/// A hyper connector that opens TCP connections and counts their traffic.
#[derive(Debug, Clone)]
pub struct CountingConnector {
    counter: Arc<ByteCounter>,
}

impl CountingConnector {
    pub fn new(counter: Arc<ByteCounter>) -> Self {
        Self { counter }
    }
}

impl Service<Uri> for CountingConnector {
    type Response = CountedConnection;
    type Error = io::Error;
    type Future = Pin<Box<dyn Future<Output = io::Result<CountedConnection>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let counter = Arc::clone(&self.counter);
        Box::pin(async move {
            let (host, port) = connect_target(&uri)?;
            let stream = TcpStream::connect((host.as_str(), port)).await?;
            stream.set_nodelay(true)?;
            debug!(%host, port, "opened counted connection");
            Ok(CountedConnection::new(counter.instrument(stream)))
        })
    }
}

// Host and port to dial for a request URI. IPv6 literals arrive bracketed.
fn connect_target(uri: &Uri) -> io::Result<(String, u16)> {
    let host = uri.host().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("no host in '{}'", uri))
    })?;
    let host = host.trim_start_matches('[').trim_end_matches(']').to_string();
    let port = match uri.port_u16() {
        Some(port) => port,
        None if uri.scheme_str() == Some("https") => 443,
        None => 80,
    };
    Ok((host, port))
}

/// A counted TCP connection as seen by hyper (and hyper-rustls on top).
#[derive(Debug)]
pub struct CountedConnection {
    io: TokioIo<CountingStream<TcpStream>>,
}

impl CountedConnection {
    fn new(stream: CountingStream<TcpStream>) -> Self {
        Self {
            io: TokioIo::new(stream),
        }
    }
}

impl Connection for CountedConnection {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

impl Read for CountedConnection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl Write for CountedConnection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_shutdown(cx)
    }

    fn is_write_vectored(&self) -> bool {
        self.io.is_write_vectored()
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write_vectored(cx, bufs)
    }
}
