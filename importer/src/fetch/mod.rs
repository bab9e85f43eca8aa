//! Byte fetching for resources referenced by URI.
//!
//! The importer never touches the network or the filesystem directly. External
//! buffer and image URIs are resolved against the document base URL and
//! handed to a [`ResourceFetcher`] supplied by the caller.
//!
//! # Providers
//!
//! - [`MemoryFetcher`]: In-memory map for tests and embedded assets
//! - [`FileSystemFetcher`]: Reads files below a root directory (native only)
//!
//! Custom fetchers (HTTP, packed archives, CDN rewrites) implement the trait
//! directly. Retries, if any, belong in the fetcher.

mod error;
#[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
mod filesystem;
mod memory;
pub mod uri;

use std::future::Future;
use std::pin::Pin;

pub use error::FetchError;
#[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
pub use filesystem::FileSystemFetcher;
pub use memory::MemoryFetcher;

/// A boxed, `Send` future returning a `Result`.
pub type FetchFuture<T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + Send>>;

/// Capability for loading the bytes behind an external URI.
///
/// The URI passed in has already been resolved against the document base
/// (see [`uri::resolve`]); data URIs never reach the fetcher.
pub trait ResourceFetcher: Send + Sync + 'static {
    /// Fetch the full contents behind `uri`.
    fn fetch(&self, uri: &str) -> FetchFuture<Vec<u8>>;
}

/// Fetcher that rejects every request.
///
/// Used when a document is expected to be self-contained (GLB with embedded
/// data); any external reference fails with [`FetchError::Unsupported`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFetcher;

impl ResourceFetcher for NoFetcher {
    fn fetch(&self, uri: &str) -> FetchFuture<Vec<u8>> {
        let uri = uri.to_owned();
        Box::pin(async move { Err(FetchError::Unsupported(uri)) })
    }
}
