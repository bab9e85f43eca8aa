use std::path::PathBuf;

use super::{FetchError, FetchFuture, ResourceFetcher, uri};

/// Fetcher reading resources from a directory on disk.
///
/// Relative URIs are joined to the root. IO is blocking (`std::fs`) inside
/// the returned future, which is fine for the importer's cooperative
/// executor. URIs with a scheme other than `file://` are rejected.
///
/// # Example
///
/// ```ignore
/// let fetcher = FileSystemFetcher::new("./assets");
/// // A buffer uri "meshes/robot.bin" in "models/robot.gltf" reads
/// // ./assets/models/meshes/robot.bin
/// ```
pub struct FileSystemFetcher {
    root: PathBuf,
}

impl FileSystemFetcher {
    /// Create a fetcher rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, uri: &str) -> Result<PathBuf, FetchError> {
        let path = match uri.strip_prefix("file://") {
            Some(rest) => rest,
            None if uri::has_scheme(uri) => return Err(FetchError::Unsupported(uri.to_owned())),
            None => uri,
        };
        let decoded = uri::percent_decode(path);
        if decoded.split(['/', '\\']).any(|segment| segment == "..") {
            return Err(FetchError::InvalidUri(format!(
                "path traversal not allowed: {uri}"
            )));
        }
        Ok(self.root.join(decoded.trim_start_matches('/')))
    }
}

impl ResourceFetcher for FileSystemFetcher {
    fn fetch(&self, uri: &str) -> FetchFuture<Vec<u8>> {
        let resolved = self.resolve(uri);
        Box::pin(async move { Ok(std::fs::read(resolved?)?) })
    }
}
