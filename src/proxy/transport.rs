//! Proxy-bound HTTP transports
//!
//! A transport is an immutable HTTP client bound to at most one proxy.
//! Rotating proxies means building a new transport, never mutating one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{ClientError, Result};
use crate::models::ProxyEntry;

/// Request timeout applied to every transport
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A request ready to be put on the wire
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl TransportRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// Decoded response of a successful exchange
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub data: Option<Value>,
}

/// Anything that can carry a request to the network
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request.
    ///
    /// Network failures, timeouts and non-2xx statuses are all returned as errors.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;

    /// Proxy this transport is bound to, `None` for direct
    fn proxy(&self) -> Option<&ProxyEntry>;
}

/// Builds transports for a given proxy (or none)
pub trait TransportFactory: Send + Sync {
    fn build(&self, proxy: Option<&ProxyEntry>) -> Result<Arc<dyn Transport>>;
}

/// Settings shared by every transport the factory builds
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: concat!("proxyfetch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
    proxy: Option<ProxyEntry>,
}

impl HttpTransport {
    /// Build a transport, tunneling through `proxy` when given.
    ///
    /// Environment proxy detection is always disabled so the explicit proxy
    /// is the only one applied.
    pub fn new(proxy: Option<&ProxyEntry>, settings: &TransportSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.as_str())
            .no_proxy();

        if let Some(entry) = proxy {
            let tunnel = reqwest::Proxy::all(entry.url.as_str())
                .map_err(|e| ClientError::InvalidProxyAddress(format!("{}: {}", entry.url, e)))?;

            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

            builder = builder.proxy(tunnel).default_headers(headers);
            debug!("Building {} transport through {}", entry.tunnel, entry.url);
        } else {
            debug!("Building direct transport");
        }

        let client = builder
            .build()
            .map_err(|e| ClientError::TransportBuild(e.to_string()))?;

        Ok(Self {
            client,
            proxy: proxy.cloned(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %redact_query(&request.url)))]
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Request(e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Request(format!("Failed to read body: {}", e.without_url())))?;
        let data = decode_body(&text);

        if !status.is_success() {
            return Err(ClientError::Status { status, body: data });
        }

        Ok(TransportResponse { status, data })
    }

    fn proxy(&self) -> Option<&ProxyEntry> {
        self.proxy.as_ref()
    }
}

/// Factory producing `HttpTransport`s
#[derive(Debug, Clone, Default)]
pub struct HttpTransportFactory {
    settings: TransportSettings,
}

impl HttpTransportFactory {
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }
}

impl TransportFactory for HttpTransportFactory {
    fn build(&self, proxy: Option<&ProxyEntry>) -> Result<Arc<dyn Transport>> {
        Ok(Arc::new(HttpTransport::new(proxy, &self.settings)?))
    }
}

/// URL without its query string, which may carry credentials
fn redact_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

/// JSON when it parses, the raw text otherwise, nothing for an empty body
fn decode_body(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}
