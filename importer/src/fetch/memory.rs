use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{FetchError, FetchFuture, ResourceFetcher};

/// In-memory fetcher for tests and embedded assets.
///
/// Thread-safe and mutable after being handed to an import. Keys are the
/// resolved URIs exactly as the importer requests them.
///
/// # Example
///
/// ```ignore
/// let fetcher = MemoryFetcher::new();
/// fetcher.insert("models/scene.bin", bin_bytes);
/// fetcher.insert("models/albedo.png", png_bytes);
/// ```
#[derive(Clone, Default)]
pub struct MemoryFetcher {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryFetcher {
    /// Create an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes under a URI, replacing any previous entry.
    pub fn insert(&self, uri: impl Into<String>, data: Vec<u8>) {
        self.files.write().insert(uri.into(), data);
    }

    /// Remove an entry, returning its bytes if present.
    pub fn remove(&self, uri: &str) -> Option<Vec<u8>> {
        self.files.write().remove(uri)
    }
}

impl ResourceFetcher for MemoryFetcher {
    fn fetch(&self, uri: &str) -> FetchFuture<Vec<u8>> {
        let files = self.files.clone();
        let uri = uri.to_owned();
        Box::pin(async move {
            let map = files.read();
            map.get(&uri).cloned().ok_or(FetchError::NotFound(uri))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_existing() {
        let mem = MemoryFetcher::new();
        mem.insert("a/b.bin", vec![1, 2, 3]);
        let data = pollster::block_on(mem.fetch("a/b.bin")).unwrap();
        assert_eq!(data, vec![1, 2, 3]);
    }

    #[test]
    fn fetch_missing() {
        let mem = MemoryFetcher::new();
        let err = pollster::block_on(mem.fetch("nope.bin")).unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[test]
    fn remove_returns_data() {
        let mem = MemoryFetcher::new();
        mem.insert("x", vec![9]);
        assert_eq!(mem.remove("x"), Some(vec![9]));
        assert!(mem.remove("x").is_none());
    }
}
