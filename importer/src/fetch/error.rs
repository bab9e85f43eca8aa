use std::fmt;

/// Errors reported by a [`ResourceFetcher`](crate::fetch::ResourceFetcher).
#[derive(Debug)]
pub enum FetchError {
    /// Nothing exists at the requested URI.
    NotFound(String),
    /// An IO error occurred while reading the resource.
    Io(std::io::Error),
    /// The URI could not be parsed or escapes the fetcher root.
    InvalidUri(String),
    /// The fetcher cannot serve this kind of URI (e.g. a remote scheme).
    Unsupported(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::NotFound(uri) => write!(f, "not found: {uri}"),
            FetchError::Io(err) => write!(f, "IO error: {err}"),
            FetchError::InvalidUri(reason) => write!(f, "invalid uri: {reason}"),
            FetchError::Unsupported(uri) => write!(f, "unsupported uri: {uri}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            FetchError::NotFound(err.to_string())
        } else {
            FetchError::Io(err)
        }
    }
}
