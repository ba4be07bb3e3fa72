use crate::error::{ClientError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://dapp-backend-4x.fractionai.xyz/api3";
pub const DEFAULT_IP_ECHO_URL: &str = "http://api64.ipify.org?format=json";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Request client configuration
    pub client: ClientConfig,
    /// Captcha solver configuration
    pub captcha: CaptchaConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend API base URL, endpoints are appended verbatim
    pub base_url: String,
    /// Newline-delimited proxy list
    pub proxy_file: PathBuf,
    /// Attempts before a request is reported as exhausted
    pub max_retries: u32,
    /// Extra wait after a 429 in milliseconds
    pub retry_delay_ms: u64,
    /// Request timeout in seconds
    pub request_timeout: u64,
    /// Endpoint echoing the caller's public address
    pub ip_echo_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct CaptchaConfig {
    /// Gemini API key, solver is unavailable without it
    pub gemini_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            client: ClientConfig {
                base_url: parse_url("PROXYFETCH_BASE_URL", DEFAULT_BASE_URL)?,
                proxy_file: PathBuf::from(get_env_or("PROXYFETCH_PROXY_FILE", "proxies.txt")),
                max_retries: get_env_or("PROXYFETCH_MAX_RETRIES", "5").parse().map_err(|_| {
                    ClientError::InvalidConfig("PROXYFETCH_MAX_RETRIES must be a valid number".into())
                })?,
                retry_delay_ms: get_env_or("PROXYFETCH_RETRY_DELAY_MS", "5000")
                    .parse()
                    .map_err(|_| {
                        ClientError::InvalidConfig(
                            "PROXYFETCH_RETRY_DELAY_MS must be a valid number".into(),
                        )
                    })?,
                request_timeout: get_env_or("PROXYFETCH_REQUEST_TIMEOUT", "30")
                    .parse()
                    .unwrap_or(30),
                ip_echo_url: parse_url("PROXYFETCH_IP_ECHO_URL", DEFAULT_IP_ECHO_URL)?,
            },
            captcha: CaptchaConfig {
                gemini_api_key: env::var("GEMINI_API_KEY")
                    .ok()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty()),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }
}

impl ClientConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            proxy_file: PathBuf::from("proxies.txt"),
            max_retries: 5,
            retry_delay_ms: 5000,
            request_timeout: 30,
            ip_echo_url: DEFAULT_IP_ECHO_URL.to_string(),
        }
    }
}

/// Read a URL variable, validate it and strip a trailing slash
fn parse_url(key: &str, default: &str) -> Result<String> {
    let raw = get_env_or(key, default);
    let raw = raw.trim();

    let url = Url::parse(raw)
        .map_err(|e| ClientError::InvalidConfig(format!("{} must be a valid URL: {}", key, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(raw.trim_end_matches('/').to_string()),
        other => Err(ClientError::InvalidConfig(format!(
            "{} has unsupported scheme: {}",
            key, other
        ))),
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
