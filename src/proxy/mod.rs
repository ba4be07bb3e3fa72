//! Proxy pool and proxy-aware transports
//!
//! This module provides:
//! - Round-robin rotation over a static proxy list
//! - Transports bound to a single proxy (plain or encrypted tunnel) or direct

pub mod pool;
pub mod transport;

pub use pool::ProxyPool;
pub use transport::{
    HttpTransport, HttpTransportFactory, Transport, TransportFactory, TransportRequest,
    TransportResponse, TransportSettings,
};
