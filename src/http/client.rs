// src/http/client.rs
// =============================================================================
// HyperClient: the concrete HttpClient the crawler runs with.
//
// Stack, bottom to top:
//   CountingConnector (TCP + byte counting)
//   -> hyper-rustls (TLS for https, plain for http)
//   -> hyper-util pooled client (HTTP/1.1, keep-alive)
//
// On top of that this file only adds what the crawler needs from a client:
// a User-Agent, redirect following (so the final URL is known), and mapping
// the hyper response into a FetchResponse with a streaming body.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, Request, Response, StatusCode, Uri};
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tracing::debug;
use url::Url;

use super::{CountingConnector, FetchResponse, HttpClient, ResponseBody};
use crate::counter::ByteCounter;
use crate::error::TransportError;

pub const USER_AGENT: &str = concat!("byte-crawler/", env!("CARGO_PKG_VERSION"));
pub const MAX_REDIRECTS: usize = 10;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const POOL_MAX_IDLE_PER_HOST: usize = 10;

type PooledClient = Client<HttpsConnector<CountingConnector>, Empty<Bytes>>;

pub struct HyperClient {
    client: PooledClient,
    max_redirects: usize,
}

impl HyperClient {
    // Every connection this client opens is counted by `counter`.
    pub fn new(counter: Arc<ByteCounter>) -> Result<Self, TransportError> {
        // TLS sits on top of the counting connector, so handshakes and
        // record overhead land in the totals too
        let https = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
            .https_or_http()
            .enable_http1()
            .wrap_connector(CountingConnector::new(counter));

        // Keep-alive pool: an idle connection (already wrapped) is handed
        // back out instead of dialing a new one
        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build(https);

        Ok(Self {
            client,
            max_redirects: MAX_REDIRECTS,
        })
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    async fn send(&self, url: &Url, extra: &HeaderMap) -> Result<Response<Incoming>, TransportError> {
        let mut request = Request::get(to_uri(url)?)
            .header(http::header::USER_AGENT, USER_AGENT)
            .body(Empty::<Bytes>::new())?;

        // Caller-supplied headers (e.g. If-None-Match) win over our defaults
        for (name, value) in extra {
            request.headers_mut().insert(name, value.clone());
        }
        Ok(self.client.request(request).await?)
    }

    async fn fetch(&self, url: &Url, extra: &HeaderMap) -> Result<FetchResponse, TransportError> {
        // Fragments never go on the wire
        let mut current = url.clone();
        current.set_fragment(None);

        // One initial request plus up to `max_redirects` hops
        for _ in 0..=self.max_redirects {
            let response = self.send(&current, extra).await?;
            match redirect_target(&current, &response) {
                Some(next) => {
                    debug!(from = %current, to = %next, status = %response.status(), "following redirect");
                    // The redirect body is never read; dropping it lets the
                    // pool recycle or close the connection.
                    drop(response);
                    current = next;
                }
                // Anything else (including 304) goes back to the caller as is
                None => return Ok(into_fetch_response(current, response)),
            }
        }

        Err(TransportError::TooManyRedirects {
            url: url.to_string(),
            limit: self.max_redirects,
        })
    }
}

#[async_trait]
impl HttpClient for HyperClient {
    async fn execute(&self, url: &Url) -> Result<FetchResponse, TransportError> {
        self.fetch(url, &HeaderMap::new()).await
    }

    async fn execute_with_headers(
        &self,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<FetchResponse, TransportError> {
        self.fetch(url, headers).await
    }
}

fn to_uri(url: &Url) -> Result<Uri, TransportError> {
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(TransportError::UnsupportedScheme(other.to_string())),
    }
    url.as_str()
        .parse::<Uri>()
        .map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

// The next hop for a 301/302/303/307/308 with a usable Location header.
fn redirect_target<B>(current: &Url, response: &Response<B>) -> Option<Url> {
    let status = response.status();
    let is_redirect = matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    );
    if !is_redirect {
        return None;
    }

    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    let mut next = current.join(location).ok()?;
    if next.scheme() != "http" && next.scheme() != "https" {
        return None;
    }
    next.set_fragment(None);
    Some(next)
}

fn into_fetch_response(final_url: Url, response: Response<Incoming>) -> FetchResponse {
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (parts, body) = response.into_parts();
    let body = body.into_data_stream().map_err(TransportError::from);

    FetchResponse {
        status,
        content_type,
        headers: parts.headers,
        final_url,
        body: ResponseBody::from_stream(body),
    }
}
