//! Backend API client with proxy rotation and retry
//!
//! Every failed attempt rotates to the next proxy before retrying; a 429
//! additionally waits for the configured backoff. Once the retry cap is hit the
//! request is reported as `FetchOutcome::Exhausted` instead of an error.

pub mod headers;
pub mod request;

pub use headers::build_headers;
pub use request::RequestAttempt;

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::models::{ApiResponse, FetchOutcome, ProxyEntry};
use crate::proxy::{
    HttpTransportFactory, ProxyPool, Transport, TransportFactory, TransportRequest,
    TransportSettings,
};

/// Returned by the egress probe when the address cannot be determined
pub const UNKNOWN_ADDRESS: &str = "Unknown";

const NONCE_ENDPOINT: &str = "/auth/nonce";

/// The transport currently in use, replaced as a whole on rotation
struct ActiveTransport {
    transport: Arc<dyn Transport>,
}

/// Resilient request surface over a rotating proxy pool
pub struct RequestClient {
    config: ClientConfig,
    pool: ProxyPool,
    factory: Arc<dyn TransportFactory>,
    active: ArcSwap<ActiveTransport>,
}

impl RequestClient {
    /// Create a client bound to the first proxy of the pool
    pub fn new(
        config: ClientConfig,
        pool: ProxyPool,
        factory: Arc<dyn TransportFactory>,
    ) -> Result<Self> {
        let proxy = pool.next();
        let transport = factory.build(proxy.as_deref())?;
        info!(
            "Request client ready with {} proxies, starting on {}",
            pool.len(),
            describe(transport.proxy())
        );

        Ok(Self {
            config,
            pool,
            factory,
            active: ArcSwap::from_pointee(ActiveTransport { transport }),
        })
    }

    /// Load the proxy list named by the config and build reqwest transports
    pub fn from_config(config: ClientConfig, user_agent: String) -> Result<Self> {
        let pool = ProxyPool::load(&config.proxy_file)?;
        let factory = HttpTransportFactory::new(TransportSettings {
            timeout: config.request_timeout(),
            user_agent,
        });
        Self::new(config, pool, Arc::new(factory))
    }

    /// Move to the next proxy and swap in a transport bound to it
    pub fn rotate_proxy(&self) -> Result<()> {
        let proxy = self.pool.next();
        let transport = self.factory.build(proxy.as_deref())?;
        info!("Rotated to {}", describe(transport.proxy()));
        self.active.store(Arc::new(ActiveTransport { transport }));
        Ok(())
    }

    /// Proxy the active transport is bound to
    pub fn current_proxy(&self) -> Option<ProxyEntry> {
        self.active.load().transport.proxy().cloned()
    }

    pub fn pool(&self) -> &ProxyPool {
        &self.pool
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn snapshot(&self) -> Arc<dyn Transport> {
        self.active.load().transport.clone()
    }

    /// Ask the IP echo service which address the active transport egresses from.
    ///
    /// Never fails; any problem is logged and reported as `"Unknown"`.
    pub async fn probe_egress_address(&self) -> String {
        let transport = self.snapshot();

        match transport
            .send(TransportRequest::get(self.config.ip_echo_url.as_str()))
            .await
        {
            Ok(response) => {
                let ip = response
                    .data
                    .as_ref()
                    .and_then(|data| data.get("ip"))
                    .and_then(Value::as_str)
                    .filter(|ip| !ip.is_empty())
                    .unwrap_or(UNKNOWN_ADDRESS)
                    .to_string();
                info!("Using proxy: {}", ip);
                ip
            }
            Err(e) => {
                warn!("Failed to fetch proxy IP: {}", e);
                UNKNOWN_ADDRESS.to_string()
            }
        }
    }

    /// Send a request to the backend, rotating and retrying on failure.
    ///
    /// Any response the transport accepts is returned unaltered. Errors only
    /// come from building the request itself; exhausting the retries yields
    /// `FetchOutcome::Exhausted`.
    #[instrument(skip(self, request), fields(method = %request.method, endpoint = %request.endpoint))]
    pub async fn fetch(&self, request: RequestAttempt) -> Result<FetchOutcome> {
        let max_retries = self.config.max_retries;
        if request.attempt >= max_retries {
            return Ok(FetchOutcome::Exhausted { attempts: 0 });
        }

        let url = format!("{}{}", self.config.base_url, request.endpoint);
        let headers = build_headers(request.token.as_deref())?;
        let body = request.payload();

        let mut attempt = request.attempt;
        while attempt < max_retries {
            let transport = self.snapshot();
            debug!(
                "Sending {} {} via {} (attempt {}/{})",
                request.method,
                url,
                describe(transport.proxy()),
                attempt + 1,
                max_retries
            );

            let outgoing = TransportRequest {
                method: request.method.clone(),
                url: url.clone(),
                headers: headers.clone(),
                body: body.clone(),
            };

            match transport.send(outgoing).await {
                Ok(response) => {
                    return Ok(FetchOutcome::Success(ApiResponse::new(
                        response.status,
                        response.data,
                    )));
                }
                Err(e) => {
                    warn!(
                        "Request via {} failed: {} (attempt {}/{})",
                        describe(transport.proxy()),
                        e,
                        attempt + 1,
                        max_retries
                    );

                    if let Err(rotate_err) = self.rotate_proxy() {
                        warn!("Proxy rotation failed, keeping previous transport: {}", rotate_err);
                    }

                    if e.is_rate_limited() {
                        debug!("Rate limited, waiting {:?} before retrying", self.config.retry_delay());
                        tokio::time::sleep(self.config.retry_delay()).await;
                    }
                }
            }

            attempt += 1;
        }

        warn!("Giving up on {} {} after {} attempts", request.method, url, attempt - request.attempt);
        Ok(FetchOutcome::Exhausted {
            attempts: attempt - request.attempt,
        })
    }

    /// Fetch a login nonce from the backend. Not retried.
    pub async fn fetch_nonce(&self) -> Result<String> {
        let url = format!("{}{}", self.config.base_url, NONCE_ENDPOINT);
        let response = self
            .snapshot()
            .send(TransportRequest::get(url))
            .await
            .map_err(|e| ClientError::Nonce(e.to_string()))?;

        response
            .data
            .as_ref()
            .and_then(|data| data.get("nonce"))
            .and_then(Value::as_str)
            .filter(|nonce| !nonce.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ClientError::Nonce("Invalid nonce response".into()))
    }
}

fn describe(proxy: Option<&ProxyEntry>) -> String {
    match proxy {
        Some(p) => format!("{} proxy {}", p.tunnel, p.url),
        None => "direct connection".to_string(),
    }
}
