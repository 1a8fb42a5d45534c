// src/http/mod.rs
// =============================================================================
// The HTTP client boundary.
//
// The crawler only ever talks to `dyn HttpClient`: give it a URL, get back a
// status, a content type, the final URL after redirects and a body that can
// either be read or dropped unread. Everything below that line (pooling,
// TLS, redirects, caching) belongs to the implementations:
//
// - connector: the TCP connector that wraps every socket in a CountingStream
// - client: HyperClient, hyper + rustls on top of that connector
// - cache: CachingClient, an on-disk cache decorator for HTML pages
// =============================================================================

mod cache;
mod client;
mod connector;

pub use cache::{CacheConfig, CachingClient, DEFAULT_CACHE_BYTES};
pub use client::{HyperClient, MAX_REDIRECTS, USER_AGENT};
pub use connector::{CountedConnection, CountingConnector};

use std::fmt;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use http::{HeaderMap, StatusCode};
use url::Url;

use crate::error::TransportError;

/// Something that can fetch a URL. Implementations must be safe to call from
/// many workers at once.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, url: &Url) -> Result<FetchResponse, TransportError>;

    /// Like `execute`, with extra request headers (conditional validators
    /// such as `If-None-Match`). Clients that can't send headers ignore them.
    async fn execute_with_headers(
        &self,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<FetchResponse, TransportError> {
        let _ = headers;
        self.execute(url).await
    }
}

#[derive(Debug)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub headers: HeaderMap,
    /// Where the content actually came from, after following redirects.
    /// Relative links on the page resolve against this, not the request URL.
    pub final_url: Url,
    pub body: ResponseBody,
}

impl FetchResponse {
    pub fn new(status: StatusCode, final_url: Url, body: ResponseBody) -> Self {
        Self {
            status,
            content_type: None,
            headers: HeaderMap::new(),
            final_url,
            body,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// True for a `Content-Type` whose subtype is `html`, whatever the
    /// parameters (`text/html; charset=utf-8` counts).
    pub fn is_html(&self) -> bool {
        self.content_type.as_deref().is_some_and(is_html_media_type)
    }
}

// "type/subtype; params" -> compare the subtype, ignoring case
pub fn is_html_media_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    match essence.split_once('/') {
        Some((kind, subtype)) => !kind.trim().is_empty() && subtype.trim().eq_ignore_ascii_case("html"),
        None => false,
    }
}

/// A response body that has not been read yet.
///
/// Reading it with [`ResponseBody::text`] pulls the whole body off the
/// connection. Dropping it unread (see [`ResponseBody::discard`]) releases the
/// connection without downloading the rest.
pub struct ResponseBody {
    stream: BoxStream<'static, Result<Bytes, TransportError>>,
}

impl ResponseBody {
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
        }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::from_stream(stream::iter(Some(Ok(bytes.into()))))
    }

    pub fn empty() -> Self {
        Self::from_stream(stream::empty())
    }

    pub async fn bytes(mut self) -> Result<Bytes, TransportError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.stream.try_next().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }

    // Invalid UTF-8 is replaced rather than rejected; link extraction only
    // needs the markup to survive.
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn discard(self) {}
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("text/html", true)]
    #[case("text/html; charset=utf-8", true)]
    #[case("TEXT/HTML", true)]
    #[case(" text/html ;charset=ISO-8859-1", true)]
    #[case("application/xhtml+xml", false)]
    #[case("text/plain", false)]
    #[case("application/json", false)]
    #[case("html", false)]
    #[case("/html", false)]
    #[case("", false)]
    fn test_is_html_media_type(#[case] content_type: &str, #[case] expected: bool) {
        assert_eq!(is_html_media_type(content_type), expected);
    }

    #[test]
    fn test_missing_content_type_is_not_html() {
        let url = Url::parse("https://example.com/").unwrap();
        let response = FetchResponse::new(StatusCode::OK, url, ResponseBody::empty());
        assert!(!response.is_html());
        assert!(response.with_content_type("text/html").is_html());
    }

    #[tokio::test]
    async fn test_body_text_joins_chunks() {
        let chunks = vec![
            Ok(Bytes::from_static(b"<a href")),
            Ok(Bytes::from_static(b"=\"/x\">")),
            Ok(Bytes::from_static(b"x</a>")),
        ];
        let body = ResponseBody::from_stream(stream::iter(chunks));
        assert_eq!(body.text().await.unwrap(), "<a href=\"/x\">x</a>");
    }

    #[tokio::test]
    async fn test_body_error_surfaces() {
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))),
        ];
        let body = ResponseBody::from_stream(stream::iter(chunks));
        assert!(matches!(body.text().await, Err(TransportError::Io(_))));
    }
}
