//! CPU-side mesh descriptors produced by the importer.
//!
//! This module provides:
//! - [`PrimitiveTopology`] - How vertices are assembled into primitives
//! - [`IndexFormat`] - Index data width (u8, u16 or u32)
//! - [`VertexBufferDescriptor`] - Interleaved vertex bytes plus layout
//! - [`IndexBufferDescriptor`] - Index bytes plus format
//! - [`MorphTargetDescriptor`] - One blend shape with lazily computed bounds
//! - [`MeshDescriptor`] - One renderable primitive

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use crate::math::BoundingBox;
use crate::scene::SkinDescriptor;

use super::layout::{ComponentType, VertexFormat, VertexSemantic};

/// Primitive topology describing how vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Each vertex is a separate point.
    PointList,
    /// Every two vertices form a line.
    LineList,
    /// Connected lines closing back to the first vertex.
    LineLoop,
    /// Vertices form a connected strip of lines.
    LineStrip,
    /// Every three vertices form a triangle.
    #[default]
    TriangleList,
    /// Vertices form a connected strip of triangles.
    TriangleStrip,
    /// Triangles sharing the first vertex.
    TriangleFan,
}

impl PrimitiveTopology {
    /// Map a glTF primitive `mode` (0–6).
    pub fn from_gltf(mode: u32) -> Option<Self> {
        Some(match mode {
            0 => Self::PointList,
            1 => Self::LineList,
            2 => Self::LineLoop,
            3 => Self::LineStrip,
            4 => Self::TriangleList,
            5 => Self::TriangleStrip,
            6 => Self::TriangleFan,
            _ => return None,
        })
    }
}

/// Index format for indexed drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 8-bit unsigned integers. Not available on every device.
    Uint8,
    /// 16-bit unsigned integers (max 65535 vertices).
    #[default]
    Uint16,
    /// 32-bit unsigned integers.
    Uint32,
}

impl IndexFormat {
    /// Get the size in bytes of each index.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint8 => 1,
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }

    /// Smallest of u16/u32 able to address `vertex_count` vertices.
    pub fn for_vertex_count(vertex_count: u32) -> Self {
        if vertex_count > u16::MAX as u32 + 1 {
            Self::Uint32
        } else {
            Self::Uint16
        }
    }
}

/// Which index buffer of a mesh to draw with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderStyle {
    /// Regular triangle indices.
    #[default]
    Solid,
    /// Unique triangle edges as a line list.
    Wireframe,
}

/// Interleaved vertex data ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBufferDescriptor {
    /// Element layout.
    pub format: VertexFormat,
    /// Number of vertices.
    pub vertex_count: u32,
    /// `vertex_count * format.stride()` bytes.
    pub data: Vec<u8>,
}

impl VertexBufferDescriptor {
    /// Read one element of every vertex as floats.
    ///
    /// Normalized integer elements are dequantized; other integers are
    /// converted as is. Returns `None` if the layout lacks the semantic.
    pub fn read_element(&self, semantic: VertexSemantic) -> Option<Vec<f32>> {
        let element = self.format.element(semantic)?;
        let stride = self.format.stride() as usize;
        let size = element.data_type.size();
        let mut out = Vec::with_capacity(self.vertex_count as usize * element.components as usize);
        for v in 0..self.vertex_count as usize {
            let base = v * stride + element.offset as usize;
            for c in 0..element.components as usize {
                let at = base + c * size;
                let bytes = self.data.get(at..at + size)?;
                out.push(read_component(bytes, element.data_type, element.normalize));
            }
        }
        Some(out)
    }
}

fn read_component(bytes: &[u8], data_type: ComponentType, normalize: bool) -> f32 {
    let raw = match data_type {
        ComponentType::I8 => bytes[0] as i8 as f32,
        ComponentType::U8 => bytes[0] as f32,
        ComponentType::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f32,
        ComponentType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f32,
        ComponentType::I32 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
        ComponentType::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
        ComponentType::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
    };
    if !normalize {
        return raw;
    }
    match data_type {
        ComponentType::I8 => (raw / 127.0).max(-1.0),
        ComponentType::U8 => raw / 255.0,
        ComponentType::I16 => (raw / 32767.0).max(-1.0),
        ComponentType::U16 => raw / 65535.0,
        _ => raw,
    }
}

/// Index data ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBufferDescriptor {
    /// Width of each index.
    pub format: IndexFormat,
    /// Number of indices.
    pub count: u32,
    /// `count * format.size()` little-endian bytes.
    pub data: Vec<u8>,
}

impl IndexBufferDescriptor {
    /// Encode indices with the given width, truncating values that do not fit.
    pub fn from_indices(indices: &[u32], format: IndexFormat) -> Self {
        let data = match format {
            IndexFormat::Uint8 => indices.iter().map(|&i| i as u8).collect(),
            IndexFormat::Uint16 => {
                let narrowed: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
                bytemuck::cast_slice(&narrowed).to_vec()
            }
            IndexFormat::Uint32 => bytemuck::cast_slice(indices).to_vec(),
        };
        Self {
            format,
            count: indices.len() as u32,
            data,
        }
    }

    /// Decode back to 32-bit indices.
    pub fn indices(&self) -> Vec<u32> {
        match self.format {
            IndexFormat::Uint8 => self.data.iter().map(|&i| i as u32).collect(),
            IndexFormat::Uint16 => self
                .data
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                .collect(),
            IndexFormat::Uint32 => self
                .data
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        }
    }
}

/// One morph target (blend shape).
#[derive(Debug)]
pub struct MorphTargetDescriptor {
    /// Target name from `extras.targetNames`, or its index.
    pub name: String,
    /// Weight applied when no animation drives the target.
    pub default_weight: f32,
    /// Per-vertex position deltas `[x, y, z, ...]`.
    pub delta_positions: Option<Vec<f32>>,
    /// Per-vertex normal deltas `[x, y, z, ...]`.
    pub delta_normals: Option<Vec<f32>>,
    aabb: OnceLock<Option<BoundingBox>>,
}

impl MorphTargetDescriptor {
    /// Create a target with no deltas.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_weight: 0.0,
            delta_positions: None,
            delta_normals: None,
            aabb: OnceLock::new(),
        }
    }

    /// Set the default weight.
    #[must_use]
    pub fn with_default_weight(mut self, weight: f32) -> Self {
        self.default_weight = weight;
        self
    }

    /// Set position deltas.
    #[must_use]
    pub fn with_delta_positions(mut self, deltas: Vec<f32>) -> Self {
        self.delta_positions = Some(deltas);
        self
    }

    /// Set normal deltas.
    #[must_use]
    pub fn with_delta_normals(mut self, deltas: Vec<f32>) -> Self {
        self.delta_normals = Some(deltas);
        self
    }

    /// Use a precomputed delta bounding box (from accessor min/max).
    #[must_use]
    pub fn with_aabb(self, aabb: BoundingBox) -> Self {
        let _ = self.aabb.set(Some(aabb));
        self
    }

    /// Bounding box of the position deltas, computed on first request when
    /// none was declared.
    pub fn aabb(&self) -> Option<BoundingBox> {
        *self.aabb.get_or_init(|| {
            self.delta_positions
                .as_deref()
                .and_then(BoundingBox::from_points)
        })
    }
}

/// One renderable primitive of a glTF mesh.
#[derive(Debug)]
pub struct MeshDescriptor {
    /// Mesh name, if any.
    pub name: Option<String>,
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Vertex data, shared between primitives with identical attributes.
    pub vertex_buffer: Arc<VertexBufferDescriptor>,
    /// Solid index buffer (None for non-indexed).
    pub index_buffer: Option<IndexBufferDescriptor>,
    /// Object-space bounds of the base positions.
    pub aabb: Option<BoundingBox>,
    /// Morph targets in declaration order.
    pub morph_targets: Vec<MorphTargetDescriptor>,
    /// Skin assigned by the node that instantiates this mesh.
    pub skin: Option<Arc<SkinDescriptor>>,
    /// Material used when no variant is selected.
    pub material: Option<usize>,
    /// Variant name to material index (`KHR_materials_variants`).
    pub material_variants: HashMap<String, usize>,
    wireframe: OnceLock<Option<IndexBufferDescriptor>>,
}

impl MeshDescriptor {
    /// Create a non-indexed triangle mesh over a vertex buffer.
    pub fn new(vertex_buffer: Arc<VertexBufferDescriptor>) -> Self {
        Self {
            name: None,
            topology: PrimitiveTopology::TriangleList,
            vertex_buffer,
            index_buffer: None,
            aabb: None,
            morph_targets: Vec::new(),
            skin: None,
            material: None,
            material_variants: HashMap::new(),
            wireframe: OnceLock::new(),
        }
    }

    /// Set the mesh name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the primitive topology.
    #[must_use]
    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Set the solid index buffer.
    #[must_use]
    pub fn with_index_buffer(mut self, index_buffer: IndexBufferDescriptor) -> Self {
        self.index_buffer = Some(index_buffer);
        self
    }

    /// Set the bounding box.
    #[must_use]
    pub fn with_aabb(mut self, aabb: BoundingBox) -> Self {
        self.aabb = Some(aabb);
        self
    }

    /// Check if this mesh uses indexed drawing.
    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }

    /// Number of vertices (non-indexed) or indices (indexed) to draw.
    pub fn draw_count(&self) -> u32 {
        match &self.index_buffer {
            Some(ib) => ib.count,
            None => self.vertex_buffer.vertex_count,
        }
    }

    /// Index buffer for a render style.
    ///
    /// The wireframe buffer is built on first request from the triangle
    /// indices and is only available for triangle lists.
    pub fn index_buffer(&self, style: RenderStyle) -> Option<&IndexBufferDescriptor> {
        match style {
            RenderStyle::Solid => self.index_buffer.as_ref(),
            RenderStyle::Wireframe => self.wireframe.get_or_init(|| self.build_wireframe()).as_ref(),
        }
    }

    fn build_wireframe(&self) -> Option<IndexBufferDescriptor> {
        if self.topology != PrimitiveTopology::TriangleList {
            return None;
        }
        let triangles = match &self.index_buffer {
            Some(ib) => ib.indices(),
            None => (0..self.vertex_buffer.vertex_count).collect(),
        };

        let mut seen = HashSet::new();
        let mut lines = Vec::with_capacity(triangles.len() * 2);
        for tri in triangles.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                if seen.insert((a.min(b), a.max(b))) {
                    lines.extend([a, b]);
                }
            }
        }

        let format = match &self.index_buffer {
            Some(ib) => ib.format,
            None => IndexFormat::for_vertex_count(self.vertex_buffer.vertex_count),
        };
        Some(IndexBufferDescriptor::from_indices(&lines, format))
    }
}
