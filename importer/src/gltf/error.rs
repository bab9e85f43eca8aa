//! Error types for glTF importing.

use crate::fetch::FetchError;

/// Broad failure category of an [`ImportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed container, chunk layout, JSON or unsupported version.
    Format,
    /// Unsupported component type, malformed accessor, failed mesh decode.
    Decode,
    /// An external buffer or image could not be fetched.
    ResourceFetch,
    /// A known extension block is internally inconsistent.
    ExtensionData,
}

/// Errors that can occur during a glTF import.
///
/// Every failure is fatal for the whole import: no partial bundle is ever
/// returned.
#[derive(Debug)]
pub enum ImportError {
    /// The GLB container or document structure is invalid.
    Format(String),
    /// The JSON chunk could not be parsed.
    Json(serde_json::Error),
    /// Accessor, index or compressed mesh data could not be decoded.
    Decode(String),
    /// Fetching an external resource failed.
    ResourceFetch {
        /// URI that was requested.
        uri: String,
        /// Failure reported by the fetcher.
        reason: String,
    },
    /// A known extension references missing or inconsistent data.
    ExtensionData(String),
}

impl ImportError {
    /// The failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Format(_) | Self::Json(_) => ErrorKind::Format,
            Self::Decode(_) => ErrorKind::Decode,
            Self::ResourceFetch { .. } => ErrorKind::ResourceFetch,
            Self::ExtensionData(_) => ErrorKind::ExtensionData,
        }
    }

    pub(crate) fn fetch(uri: &str, err: FetchError) -> Self {
        Self::ResourceFetch {
            uri: uri.to_owned(),
            reason: err.to_string(),
        }
    }
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Format(msg) => write!(f, "glTF format error: {msg}"),
            Self::Json(e) => write!(f, "glTF JSON error: {e}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::ResourceFetch { uri, reason } => {
                write!(f, "failed to fetch resource '{uri}': {reason}")
            }
            Self::ExtensionData(msg) => write!(f, "extension data error: {msg}"),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<FetchError> for ImportError {
    fn from(e: FetchError) -> Self {
        let uri = match &e {
            FetchError::NotFound(uri) | FetchError::Unsupported(uri) => uri.clone(),
            _ => String::new(),
        };
        Self::ResourceFetch {
            uri,
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_are_format_kind() {
        let err: ImportError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn fetch_error_message_names_uri() {
        let err = ImportError::fetch("tex.png", FetchError::NotFound("tex.png".into()));
        assert_eq!(err.kind(), ErrorKind::ResourceFetch);
        assert!(err.to_string().contains("tex.png"));
    }
}
