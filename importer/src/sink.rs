//! Hand-off of finished GPU-bound data.
//!
//! The importer never creates GPU objects. After an import succeeds it
//! reports every vertex buffer, index buffer and texture to a
//! [`ResourceSink`], which may upload them in whatever way the renderer
//! needs. All methods default to doing nothing.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::material::TextureDescriptor;
use crate::mesh::{IndexBufferDescriptor, VertexBufferDescriptor};

/// Receiver for buffers and textures produced by an import.
///
/// Each vertex buffer is reported once even when several primitives share
/// it. Calls happen on the thread driving the import, after every entity
/// has been built.
pub trait ResourceSink: Send + Sync {
    fn vertex_buffer(&self, _buffer: &Arc<VertexBufferDescriptor>) {}

    fn index_buffer(&self, _buffer: &IndexBufferDescriptor) {}

    fn texture(&self, _texture: &Arc<TextureDescriptor>) {}
}

/// Sink that only counts what it receives.
#[derive(Debug, Default)]
pub struct CountingSink {
    counts: Mutex<SinkCounts>,
}

/// Totals recorded by a [`CountingSink`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SinkCounts {
    pub vertex_buffers: usize,
    pub vertex_bytes: usize,
    pub index_buffers: usize,
    pub index_bytes: usize,
    pub textures: usize,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the counts so far.
    pub fn counts(&self) -> SinkCounts {
        *self.counts.lock()
    }
}

impl ResourceSink for CountingSink {
    fn vertex_buffer(&self, buffer: &Arc<VertexBufferDescriptor>) {
        let mut counts = self.counts.lock();
        counts.vertex_buffers += 1;
        counts.vertex_bytes += buffer.data.len();
    }

    fn index_buffer(&self, buffer: &IndexBufferDescriptor) {
        let mut counts = self.counts.lock();
        counts.index_buffers += 1;
        counts.index_bytes += buffer.data.len();
    }

    fn texture(&self, _texture: &Arc<TextureDescriptor>) {
        self.counts.lock().textures += 1;
    }
}
