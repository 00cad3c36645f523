use crate::error::CanvasError;
use std::collections::HashMap;
use std::sync::Mutex;

/// Host fetch service for externally referenced vector documents. Callers
/// fetch sequentially; implementations block until the document (or an
/// explicit error) is available.
pub trait Fetcher {
    fn fetch(&self, href: &str) -> Result<String, CanvasError>;
}

/// Fetches `http(s)` references over the network and anything else from the
/// filesystem, caching successful responses per href.
pub struct HttpFetcher {
    agent: ureq::Agent,
    cache: Mutex<HashMap<String, String>>,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn fetch_uncached(&self, href: &str) -> Result<String, CanvasError> {
        if href.starts_with("http://") || href.starts_with("https://") {
            let mut response = self
                .agent
                .get(href)
                .call()
                .map_err(|e| CanvasError::fetch(href, e))?;
            return response
                .body_mut()
                .read_to_string()
                .map_err(|e| CanvasError::fetch(href, e));
        }
        let path = href.strip_prefix("file://").unwrap_or(href);
        std::fs::read_to_string(path).map_err(|e| CanvasError::fetch(href, e))
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, href: &str) -> Result<String, CanvasError> {
        if let Ok(cache) = self.cache.lock()
            && let Some(hit) = cache.get(href)
        {
            return Ok(hit.clone());
        }
        let body = self.fetch_uncached(href)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(href.to_string(), body.clone());
        }
        Ok(body)
    }
}

/// Preloaded href -> document map, for tests and offline runs.
#[derive(Default)]
pub struct MemoryFetcher {
    docs: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, href: &str, content: &str) {
        self.docs.insert(href.to_string(), content.to_string());
    }

    pub fn with(mut self, href: &str, content: &str) -> Self {
        self.insert(href, content);
        self
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, href: &str) -> Result<String, CanvasError> {
        self.docs
            .get(href)
            .cloned()
            .ok_or_else(|| CanvasError::fetch(href, "not found"))
    }
}
