//! CPU-side mesh types produced by the importer.
//!
//! - [`VertexFormat`] - Interleaved element layout with word-aligned offsets
//! - [`VertexBufferDescriptor`] / [`IndexBufferDescriptor`] - Raw bytes plus format
//! - [`MeshDescriptor`] - One primitive: buffers, bounds, morph targets, skin
//!
//! Descriptors are GPU-agnostic. Uploading them is the job of a
//! [`ResourceSink`](crate::sink::ResourceSink).

mod data;
mod layout;

pub use data::{
    IndexBufferDescriptor, IndexFormat, MeshDescriptor, MorphTargetDescriptor, PrimitiveTopology,
    RenderStyle, VertexBufferDescriptor,
};
pub use layout::{ComponentType, ElementDesc, VertexElement, VertexFormat, VertexSemantic};
