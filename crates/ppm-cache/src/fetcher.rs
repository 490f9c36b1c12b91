//! Transport abstraction for fetching a remote resource's bytes
//! (spec §4.1, C2). Kept as a trait so the cache can be exercised
//! without a network, the way the teacher's client is kept behind a
//! seam for tests.

use crate::error::{CacheError, Result};

/// Something that can fetch the bytes of a URL. The core never talks
/// to `reqwest` directly; every call goes through this trait.
pub trait RemoteFetcher: Send + Sync {
    /// Fetch the full body of `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// A blocking, `reqwest`-backed fetcher (spec §5: the core never
/// blocks on async machinery, so the HTTP client here uses reqwest's
/// `blocking` feature rather than the teacher's tokio-based client).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Build a fetcher with a 30s request timeout.
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| CacheError::Network {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new().expect("default reqwest client configuration is always valid")
    }
}

impl RemoteFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| CacheError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().map(|b| b.to_vec()).map_err(|e| CacheError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// An in-memory fetcher for tests: resolves URLs against a fixed map
/// instead of making real requests.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    entries: std::collections::HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(url.into(), body.into());
        self
    }
}

impl RemoteFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.entries
            .get(url)
            .cloned()
            .ok_or_else(|| CacheError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}
