//! Proxyfetch - resilient API client over rotating proxies
//!
//! Issues authenticated requests to a single backend API through a
//! round-robin pool of outbound proxies.
//!
//! ## Features
//!
//! - Static proxy list loaded once at startup, rotated round-robin
//! - Plain (`http://`) and encrypted (`https://`) proxy tunnels
//! - Bounded retry loop that rotates proxies on every failure
//! - Fixed backoff after rate limiting (HTTP 429)
//! - Egress address probe, nonce retrieval and captcha solving helpers

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod proxy;
pub mod services;

pub use client::{RequestAttempt, RequestClient};
pub use config::Config;
pub use error::{ClientError, Result};
pub use models::{ApiResponse, FetchOutcome, ProxyEntry};
