//! Buffer resolution and buffer view slicing.

use std::fmt;
use std::ops::{Deref, Range};
use std::sync::Arc;

use crate::fetch::{ResourceFetcher, uri};

use super::document;
use super::error::ImportError;
use super::options::{AsyncHooks, Hooks};

/// Shared, read-only window into a buffer.
///
/// Cloning is cheap: all slices of one buffer share its backing bytes.
#[derive(Clone)]
pub struct BufferSlice {
    buffer: Arc<[u8]>,
    range: Range<usize>,
}

impl BufferSlice {
    /// Slice covering a whole buffer.
    pub fn new(buffer: Arc<[u8]>) -> Self {
        let range = 0..buffer.len();
        Self { buffer, range }
    }

    /// Sub-slice relative to this slice, or `None` if out of bounds.
    pub fn slice(&self, offset: usize, len: usize) -> Option<Self> {
        let start = self.range.start.checked_add(offset)?;
        let end = start.checked_add(len)?;
        (end <= self.range.end).then(|| Self {
            buffer: Arc::clone(&self.buffer),
            range: start..end,
        })
    }

    /// The backing buffer.
    pub fn buffer(&self) -> &Arc<[u8]> {
        &self.buffer
    }

    /// Byte range within the backing buffer.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }
}

impl Deref for BufferSlice {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buffer[self.range.clone()]
    }
}

impl AsRef<[u8]> for BufferSlice {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl From<Vec<u8>> for BufferSlice {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes.into())
    }
}

impl fmt::Debug for BufferSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferSlice")
            .field("range", &self.range)
            .field("buffer_len", &self.buffer.len())
            .finish()
    }
}

/// A materialized buffer view.
#[derive(Debug, Clone)]
pub struct BufferViewData {
    /// View bytes.
    pub data: BufferSlice,
    /// Declared stride for interleaved vertex data.
    pub byte_stride: Option<usize>,
}

/// Inputs shared by all buffer resolutions of one import.
pub(crate) struct BufferSources<'a> {
    pub base_url: &'a str,
    pub binary_chunk: Option<Arc<[u8]>>,
    pub fetcher: &'a dyn ResourceFetcher,
}

/// Resolve the bytes of one declared buffer.
///
/// Order: `process_async` hook, data URI, external URI, GLB binary chunk.
pub(crate) async fn resolve_buffer(
    index: usize,
    buffer: &document::Buffer,
    sources: &BufferSources<'_>,
    hooks: &AsyncHooks<document::Buffer, Arc<[u8]>>,
) -> Result<Arc<[u8]>, ImportError> {
    hooks
        .run(buffer, async {
            match buffer.uri.as_deref() {
                Some(u) if uri::is_data_uri(u) => {
                    let (_, bytes) = uri::decode_data_uri(u).ok_or_else(|| {
                        ImportError::Format(format!("buffer {index} has a malformed data URI"))
                    })?;
                    Ok::<Arc<[u8]>, ImportError>(bytes.into())
                }
                Some(u) => {
                    let resolved = uri::resolve(sources.base_url, u);
                    log::trace!("fetching buffer {index} from {resolved}");
                    let bytes = sources
                        .fetcher
                        .fetch(&resolved)
                        .await
                        .map_err(|e| ImportError::fetch(&resolved, e))?;
                    Ok(Arc::from(bytes))
                }
                None => sources.binary_chunk.clone().ok_or_else(|| {
                    ImportError::Format(format!(
                        "buffer {index} has no uri and the asset has no binary chunk"
                    ))
                }),
            }
        })
        .await
}

/// Slice one buffer view out of its resolved buffer.
pub(crate) fn materialize_view(
    index: usize,
    view: &document::BufferView,
    buffers: &[Arc<[u8]>],
    hooks: &Hooks<document::BufferView, BufferSlice>,
) -> Result<BufferViewData, ImportError> {
    let data = hooks.run(view, || {
        let buffer = buffers.get(view.buffer).ok_or_else(|| {
            ImportError::Format(format!(
                "buffer view {index} references missing buffer {}",
                view.buffer
            ))
        })?;
        BufferSlice::new(Arc::clone(buffer))
            .slice(view.byte_offset, view.byte_length)
            .ok_or_else(|| {
                ImportError::Format(format!(
                    "buffer view {index} ({} bytes at {}) exceeds buffer {} ({} bytes)",
                    view.byte_length,
                    view.byte_offset,
                    view.buffer,
                    buffer.len()
                ))
            })
    })?;
    Ok(BufferViewData {
        data,
        byte_stride: view.byte_stride,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{MemoryFetcher, NoFetcher};
    use crate::gltf::ErrorKind;

    fn buffer(uri: Option<&str>) -> document::Buffer {
        document::Buffer {
            uri: uri.map(str::to_owned),
            ..Default::default()
        }
    }

    #[test]
    fn slice_bounds() {
        let s = BufferSlice::from(vec![0u8, 1, 2, 3, 4, 5]);
        let sub = s.slice(2, 3).unwrap();
        assert_eq!(&*sub, &[2, 3, 4]);
        assert_eq!(&*sub.slice(1, 2).unwrap(), &[3, 4]);
        assert!(sub.slice(2, 2).is_none());
        assert!(s.slice(usize::MAX, 2).is_none());
    }

    #[test]
    fn resolves_data_uri_and_binary_chunk() {
        let sources = BufferSources {
            base_url: "",
            binary_chunk: Some(Arc::from(vec![9u8, 9])),
            fetcher: &NoFetcher,
        };
        let hooks = AsyncHooks::default();
        let data = pollster::block_on(resolve_buffer(
            0,
            &buffer(Some("data:application/octet-stream;base64,AQID")),
            &sources,
            &hooks,
        ))
        .unwrap();
        assert_eq!(&*data, &[1, 2, 3]);

        let chunk = pollster::block_on(resolve_buffer(1, &buffer(None), &sources, &hooks)).unwrap();
        assert_eq!(&*chunk, &[9, 9]);
    }

    #[test]
    fn fetches_relative_to_base() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("models/car.bin", vec![4, 5]);
        let sources = BufferSources {
            base_url: "models/car.gltf",
            binary_chunk: None,
            fetcher: &fetcher,
        };
        let data = pollster::block_on(resolve_buffer(
            0,
            &buffer(Some("car.bin")),
            &sources,
            &AsyncHooks::default(),
        ))
        .unwrap();
        assert_eq!(&*data, &[4, 5]);
    }

    #[test]
    fn missing_external_buffer_is_fetch_error() {
        let sources = BufferSources {
            base_url: "",
            binary_chunk: None,
            fetcher: &NoFetcher,
        };
        let err = pollster::block_on(resolve_buffer(
            0,
            &buffer(Some("https://cdn.example.com/a.bin")),
            &sources,
            &AsyncHooks::default(),
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceFetch);
    }

    #[test]
    fn view_out_of_range() {
        let buffers: Vec<Arc<[u8]>> = vec![Arc::from(vec![0u8; 8])];
        let view = document::BufferView {
            buffer: 0,
            byte_offset: 4,
            byte_length: 8,
            ..Default::default()
        };
        let err = materialize_view(0, &view, &buffers, &Hooks::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn view_shares_buffer_bytes() {
        let buffers: Vec<Arc<[u8]>> = vec![Arc::from(vec![0u8, 1, 2, 3])];
        let view = document::BufferView {
            buffer: 0,
            byte_offset: 1,
            byte_length: 2,
            byte_stride: Some(4),
            ..Default::default()
        };
        let data = materialize_view(0, &view, &buffers, &Hooks::default()).unwrap();
        assert_eq!(&*data.data, &[1, 2]);
        assert_eq!(data.byte_stride, Some(4));
        assert!(Arc::ptr_eq(data.data.buffer(), &buffers[0]));
    }
}
