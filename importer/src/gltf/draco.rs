//! `KHR_draco_mesh_compression` decoding.
//!
//! The decoder itself is supplied by the caller through [`DracoDecoder`];
//! this module owns the thread pool it runs on and turns its flat output
//! into vertex and index buffers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::compute::{WorkerPool, WorkerTask};
use crate::mesh::{ComponentType, ElementDesc, VertexBufferDescriptor, VertexFormat, VertexSemantic};

use super::error::ImportError;

/// Decoded geometry of one compressed primitive.
#[derive(Debug, Clone, Default)]
pub struct DracoMesh {
    /// Triangle indices.
    pub indices: Vec<u32>,
    /// Interleaved float vertex data, laid out as `attributes` in order.
    pub vertices: Vec<f32>,
    /// Attributes present in `vertices`, in interleave order.
    pub attributes: Vec<DracoAttribute>,
}

/// One attribute of a [`DracoMesh`].
#[derive(Debug, Clone, PartialEq)]
pub struct DracoAttribute {
    /// glTF attribute name (`POSITION`, `TEXCOORD_0`, ...).
    pub name: String,
    /// Float components per vertex.
    pub components: u32,
}

/// A decode job: the compressed bytes plus the glTF attribute name to Draco
/// attribute id map from the extension block.
#[derive(Debug, Clone)]
pub struct DracoRequest {
    pub data: Vec<u8>,
    pub attributes: HashMap<String, u32>,
}

/// Draco bitstream decoder, run on pool threads.
pub trait DracoDecoder: Send + Sync + 'static {
    /// Decode one compressed primitive.
    fn decode(&self, request: &DracoRequest) -> Result<DracoMesh, String>;
}

/// Worker pool dedicated to Draco decoding.
///
/// Construct once and share (`Arc`) between imports; jobs from concurrent
/// imports are interleaved on the same workers.
pub struct DracoWorkerPool {
    pool: WorkerPool<DracoRequest, Result<DracoMesh, String>>,
}

impl DracoWorkerPool {
    /// Spawn `worker_count` decoder threads.
    pub fn new(worker_count: usize, decoder: impl DracoDecoder) -> Self {
        let decoder = Arc::new(decoder);
        let pool = WorkerPool::new("draco", worker_count, move |request: DracoRequest| {
            decoder.decode(&request)
        });
        log::debug!("draco pool started with {} workers", pool.worker_count());
        Self { pool }
    }

    /// One worker per available core, minus one for the calling thread.
    pub fn default_threads(decoder: impl DracoDecoder) -> Self {
        let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(cores.saturating_sub(1).max(1), decoder)
    }

    /// Number of decoder threads.
    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    pub(crate) fn submit(&self, request: DracoRequest) -> WorkerTask<Result<DracoMesh, String>> {
        self.pool.submit(request)
    }
}

/// Await a submitted decode and convert failures into [`ImportError::Decode`].
pub(crate) async fn finish(
    mesh_index: usize,
    task: WorkerTask<Result<DracoMesh, String>>,
) -> Result<DracoMesh, ImportError> {
    match task.await {
        Some(Ok(mesh)) => Ok(mesh),
        Some(Err(reason)) => Err(ImportError::Decode(format!(
            "draco decode of mesh {mesh_index} failed: {reason}"
        ))),
        None => Err(ImportError::Decode(format!(
            "draco worker stopped while decoding mesh {mesh_index}"
        ))),
    }
}

impl DracoMesh {
    /// Floats per vertex.
    pub fn stride(&self) -> usize {
        self.attributes.iter().map(|a| a.components as usize).sum()
    }

    /// Number of vertices in `vertices`.
    pub fn vertex_count(&self) -> usize {
        match self.stride() {
            0 => 0,
            stride => self.vertices.len() / stride,
        }
    }

    /// Float data of one attribute, de-interleaved.
    pub fn attribute(&self, name: &str) -> Option<Vec<f32>> {
        let mut offset = 0;
        for attribute in &self.attributes {
            let components = attribute.components as usize;
            if attribute.name == name {
                let stride = self.stride();
                return Some(
                    self.vertices
                        .chunks_exact(stride)
                        .flat_map(|vertex| &vertex[offset..offset + components])
                        .copied()
                        .collect(),
                );
            }
            offset += components;
        }
        None
    }

    /// Build a vertex buffer in canonical element order.
    ///
    /// Decoder output is already dequantized, so every element is `F32`.
    pub(crate) fn vertex_buffer(&self, mesh_index: usize) -> Result<VertexBufferDescriptor, ImportError> {
        let stride = self.stride();
        if stride == 0 || self.vertices.len() % stride != 0 {
            return Err(ImportError::Decode(format!(
                "draco output for mesh {mesh_index} has {} floats, not a multiple of stride {stride}",
                self.vertices.len()
            )));
        }

        let mut offsets = Vec::with_capacity(self.attributes.len());
        let mut offset = 0;
        for attribute in &self.attributes {
            offsets.push(offset);
            offset += attribute.components as usize;
        }
        let mut known: Vec<(VertexSemantic, usize, u32)> = self
            .attributes
            .iter()
            .zip(offsets)
            .filter_map(|(a, offset)| {
                VertexSemantic::from_gltf(&a.name).map(|s| (s, offset, a.components))
            })
            .collect();
        known.sort_by_key(|(semantic, ..)| *semantic);
        if !known.iter().any(|(s, ..)| *s == VertexSemantic::Position) {
            return Err(ImportError::Decode(format!(
                "draco output for mesh {mesh_index} has no POSITION"
            )));
        }

        let descs: Vec<ElementDesc> = known
            .iter()
            .map(|&(semantic, _, components)| ElementDesc {
                semantic,
                components,
                data_type: ComponentType::F32,
                normalize: false,
            })
            .collect();
        let format = VertexFormat::new(&descs);
        let vertex_count = self.vertex_count();
        let out_stride = format.stride() as usize / 4;

        let mut packed = vec![0f32; vertex_count * out_stride];
        for (vertex, src) in self.vertices.chunks_exact(stride).enumerate() {
            let dst = &mut packed[vertex * out_stride..(vertex + 1) * out_stride];
            for ((_, src_offset, components), element) in known.iter().zip(format.elements()) {
                let dst_offset = element.offset as usize / 4;
                let n = *components as usize;
                dst[dst_offset..dst_offset + n].copy_from_slice(&src[*src_offset..*src_offset + n]);
            }
        }

        Ok(VertexBufferDescriptor {
            format,
            vertex_count: vertex_count as u32,
            data: bytemuck::cast_slice(&packed).to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeDecoder;

    impl DracoDecoder for FakeDecoder {
        fn decode(&self, request: &DracoRequest) -> Result<DracoMesh, String> {
            if request.data.is_empty() {
                return Err("empty bitstream".into());
            }
            // uv before position to check canonical reordering
            Ok(DracoMesh {
                indices: vec![0, 1, 2],
                vertices: vec![
                    0.0, 0.0, 0.0, 0.0, 0.0, //
                    1.0, 0.0, 1.0, 0.0, 0.0, //
                    0.0, 1.0, 0.0, 1.0, 0.0,
                ],
                attributes: vec![
                    DracoAttribute { name: "TEXCOORD_0".into(), components: 2 },
                    DracoAttribute { name: "POSITION".into(), components: 3 },
                ],
            })
        }
    }

    fn request(data: Vec<u8>) -> DracoRequest {
        DracoRequest { data, attributes: HashMap::new() }
    }

    #[test]
    fn decodes_on_pool_and_reorders_elements() {
        let pool = DracoWorkerPool::new(1, FakeDecoder);
        let mesh = pollster::block_on(finish(0, pool.submit(request(vec![1])))).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.attribute("POSITION").unwrap()[3..6], [1.0, 0.0, 0.0]);

        let vb = mesh.vertex_buffer(0).unwrap();
        let semantics: Vec<VertexSemantic> = vb.format.elements().iter().map(|e| e.semantic).collect();
        assert_eq!(semantics, [VertexSemantic::Position, VertexSemantic::TexCoord0]);
        assert_eq!(vb.read_element(VertexSemantic::TexCoord0).unwrap()[2..4], [1.0, 0.0]);
    }

    #[test]
    fn decoder_failure_is_decode_error() {
        let pool = DracoWorkerPool::new(1, FakeDecoder);
        let err = pollster::block_on(finish(3, pool.submit(request(Vec::new())))).unwrap_err();
        assert!(matches!(err, ImportError::Decode(ref m) if m.contains("empty bitstream")));
    }

    #[test]
    fn output_without_position_is_rejected() {
        let mesh = DracoMesh {
            indices: vec![],
            vertices: vec![0.0; 6],
            attributes: vec![DracoAttribute { name: "NORMAL".into(), components: 3 }],
        };
        assert!(mesh.vertex_buffer(0).is_err());
    }
}
