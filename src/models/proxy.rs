use serde::{Deserialize, Serialize};

/// How requests are tunneled through a proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelKind {
    /// `http://` proxy, spoken to in cleartext
    Plain,
    /// Any other scheme, spoken to over TLS
    Encrypted,
}

impl TunnelKind {
    /// Pick the tunnel kind from the proxy URL scheme.
    ///
    /// A URL without a scheme is dialed as `http://`, so it is plain too.
    pub fn for_url(url: &str) -> Self {
        match url.split_once("://") {
            Some((scheme, _)) if !scheme.eq_ignore_ascii_case("http") => TunnelKind::Encrypted,
            _ => TunnelKind::Plain,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelKind::Plain => "plain",
            TunnelKind::Encrypted => "encrypted",
        }
    }
}

impl std::fmt::Display for TunnelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single outbound proxy endpoint, read-only after load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyEntry {
    pub url: String,
    pub tunnel: TunnelKind,
}

impl ProxyEntry {
    /// Parse one line of a proxy list.
    ///
    /// The line is trimmed; blank lines and lines without an `http` prefix are rejected.
    pub fn parse(line: &str) -> Option<Self> {
        let url = line.trim();
        if url.is_empty() || !url.starts_with("http") {
            return None;
        }

        Some(Self {
            url: url.to_string(),
            tunnel: TunnelKind::for_url(url),
        })
    }

    pub fn is_encrypted(&self) -> bool {
        self.tunnel == TunnelKind::Encrypted
    }
}

impl std::fmt::Display for ProxyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}
