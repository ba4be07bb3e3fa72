//! Round-robin pool of outbound proxies
//!
//! The proxy list is loaded once from a newline-delimited file and never
//! changes afterwards; only the cursor moves.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{ClientError, Result};
use crate::models::ProxyEntry;

/// Hands out proxies in a fixed round-robin order
///
/// The cursor is advanced with a single atomic update, so it always stays
/// within `0..len` even under concurrent rotation.
#[derive(Debug)]
pub struct ProxyPool {
    proxies: Vec<Arc<ProxyEntry>>,
    cursor: AtomicUsize,
}

impl ProxyPool {
    /// Load the pool from a proxy list file.
    ///
    /// An unreadable file or a file without a single usable line is a startup
    /// error (`ClientError::is_fatal`); callers are expected to stop the process.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();

        let contents = fs::read_to_string(path).map_err(|e| ClientError::ProxySourceUnreadable {
            path: origin.clone(),
            reason: e.to_string(),
        })?;

        let pool = Self::parse(&contents, &origin)?;
        info!("Loaded {} proxies from {}", pool.len(), origin);
        Ok(pool)
    }

    /// Build a pool from the text of a proxy list
    pub fn parse(contents: &str, origin: &str) -> Result<Self> {
        let entries: Vec<ProxyEntry> = contents.lines().filter_map(ProxyEntry::parse).collect();

        if entries.is_empty() {
            return Err(ClientError::NoValidProxies(origin.to_string()));
        }

        Ok(Self::from_entries(entries))
    }

    fn from_entries(entries: Vec<ProxyEntry>) -> Self {
        Self {
            proxies: entries.into_iter().map(Arc::new).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Return the proxy under the cursor and move the cursor one step, wrapping at the end
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Option<Arc<ProxyEntry>> {
        let len = self.proxies.len();
        if len == 0 {
            return None;
        }

        let idx = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % len))
            .unwrap_or_else(|i| i);

        debug!("Rotating to proxy {}/{}", idx + 1, len);
        self.proxies.get(idx).cloned()
    }

    /// Index of the proxy the next rotation will return
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ProxyEntry> {
        self.proxies.iter().map(|p| p.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::models::TunnelKind;

    #[test]
    fn test_parse_filters_lines() {
        let pool = ProxyPool::parse(
            "http://1.1.1.1:8080\n\n  https://2.2.2.2:8081  \nsocks5://3.3.3.3:1080\ngarbage\n",
            "inline",
        )
        .unwrap();

        let urls: Vec<&str> = pool.entries().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["http://1.1.1.1:8080", "https://2.2.2.2:8081"]);
        assert_eq!(pool.len(), 2);
        assert!(!pool.is_empty());
    }

    #[test]
    fn test_parse_empty_is_fatal() {
        let err = ProxyPool::parse("", "inline").unwrap_err();
        assert!(matches!(err, ClientError::NoValidProxies(_)));
        assert!(err.is_fatal());

        let err = ProxyPool::parse("socks5://a:1\n# comment\n   \n", "inline").unwrap_err();
        assert!(matches!(err, ClientError::NoValidProxies(_)));
    }

    #[test]
    fn test_round_robin_wraps() {
        let pool = ProxyPool::parse(
            "http://127.0.0.1:8081\nhttp://127.0.0.1:8082\nhttps://127.0.0.1:8083\n",
            "inline",
        )
        .unwrap();

        // Every entry exactly once, then back to the first
        let first_cycle: Vec<String> = (0..pool.len())
            .map(|_| pool.next().unwrap().url.clone())
            .collect();
        assert_eq!(
            first_cycle,
            vec![
                "http://127.0.0.1:8081",
                "http://127.0.0.1:8082",
                "https://127.0.0.1:8083"
            ]
        );
        assert_eq!(pool.next().unwrap().url, "http://127.0.0.1:8081");
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let pool = ProxyPool::parse("http://a:1\nhttp://b:2\n", "inline").unwrap();
        assert_eq!(pool.cursor(), 0);

        for step in 1..=7 {
            pool.next();
            assert_eq!(pool.cursor(), step % 2);
            assert!(pool.cursor() < pool.len());
        }
    }

    #[test]
    fn test_single_entry_repeats() {
        let pool = ProxyPool::parse("https://only:443", "inline").unwrap();
        assert_eq!(pool.next().unwrap().tunnel, TunnelKind::Encrypted);
        assert_eq!(pool.next().unwrap().url, "https://only:443");
        assert_eq!(pool.cursor(), 0);
    }

    #[test]
    fn test_concurrent_rotation_is_coherent() {
        let pool = Arc::new(ProxyPool::parse("http://a:1\nhttp://b:2\nhttp://c:3\n", "inline").unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for _ in 0..300 {
                        pool.next();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 1200 rotations over 3 entries land back on the first one
        assert_eq!(pool.cursor(), 0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http://1.1.1.1:8080").unwrap();
        writeln!(file, "https://2.2.2.2:8081").unwrap();

        let pool = ProxyPool::load(file.path()).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.next().unwrap().tunnel, TunnelKind::Plain);
        assert_eq!(pool.next().unwrap().tunnel, TunnelKind::Encrypted);
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProxyPool::load(dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, ClientError::ProxySourceUnreadable { .. }));
        assert!(err.is_fatal());
    }
}
