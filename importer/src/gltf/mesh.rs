//! Mesh building: one [`MeshDescriptor`] per glTF primitive.
//!
//! Plain primitives are built synchronously. Draco primitives are submitted
//! to the decoder pool first and finished once every mesh has been queued,
//! so decoding overlaps with the rest of the import.

use std::collections::HashMap;
use std::sync::Arc;

use crate::compute::WorkerTask;
use crate::mesh::{
    ComponentType, IndexBufferDescriptor, IndexFormat, MeshDescriptor, MorphTargetDescriptor,
    PrimitiveTopology,
};

use super::accessor::AccessorReader;
use super::buffer::BufferViewData;
use super::document::{self, DracoCompression, PrimitiveVariants, extension};
use super::draco::{self, DracoMesh, DracoRequest, DracoWorkerPool};
use super::error::ImportError;
use super::options::DeviceCaps;
use super::vertex::{VertexBufferCache, build_vertex_buffer};

const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";
const VARIANTS_EXTENSION: &str = "KHR_materials_variants";

/// Everything mesh building reads, shared by all meshes of one import.
#[derive(Clone, Copy)]
pub(crate) struct MeshContext<'a> {
    pub document: &'a document::Document,
    pub reader: AccessorReader<'a>,
    pub views: &'a [BufferViewData],
    pub device: DeviceCaps,
    pub flip_v: bool,
    pub variant_names: &'a [String],
    /// Decoder pool; `None` when Draco decoding is unavailable or disabled.
    pub draco: Option<&'a DracoWorkerPool>,
}

/// A primitive that is either finished or waiting on the decoder pool.
pub(crate) enum PrimitiveBuild {
    Ready(MeshDescriptor),
    Draco(PendingDraco),
}

pub(crate) struct PendingDraco {
    mesh: usize,
    primitive: usize,
    task: WorkerTask<Result<DracoMesh, String>>,
}

impl PendingDraco {
    /// `(mesh, primitive)` this decode belongs to.
    pub(crate) fn slot(&self) -> (usize, usize) {
        (self.mesh, self.primitive)
    }
}

/// Build every primitive of one mesh, queueing Draco decodes.
pub(crate) fn build_mesh(
    ctx: &MeshContext<'_>,
    mesh_index: usize,
    cache: &mut VertexBufferCache,
) -> Result<Vec<PrimitiveBuild>, ImportError> {
    let mesh = &ctx.document.meshes[mesh_index];
    let mut builds = Vec::with_capacity(mesh.primitives.len());
    for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
        let draco = extension::<DracoCompression>(&primitive.extensions, DRACO_EXTENSION)?;
        let build = match (draco, ctx.draco) {
            (Some(compression), Some(pool)) => {
                let view = ctx.views.get(compression.buffer_view).ok_or_else(|| {
                    ImportError::ExtensionData(format!(
                        "{DRACO_EXTENSION} on mesh {mesh_index} references missing buffer view {}",
                        compression.buffer_view
                    ))
                })?;
                log::trace!("queueing draco decode for mesh {mesh_index} primitive {primitive_index}");
                let task = pool.submit(DracoRequest {
                    data: view.data.to_vec(),
                    attributes: compression.attributes,
                });
                PrimitiveBuild::Draco(PendingDraco {
                    mesh: mesh_index,
                    primitive: primitive_index,
                    task,
                })
            }
            (Some(_), None) if !primitive.attributes.contains_key("POSITION") => {
                return Err(ImportError::Decode(format!(
                    "mesh {mesh_index} is draco compressed and no decoder is available"
                )));
            }
            _ => PrimitiveBuild::Ready(build_plain(ctx, mesh_index, primitive_index, cache)?),
        };
        builds.push(build);
    }
    Ok(builds)
}

/// Await a queued decode and build its primitive.
pub(crate) async fn finish_draco(
    ctx: &MeshContext<'_>,
    pending: PendingDraco,
) -> Result<MeshDescriptor, ImportError> {
    let decoded = draco::finish(pending.mesh, pending.task).await?;
    let vertex_buffer = decoded.vertex_buffer(pending.mesh)?;
    let vertex_count = vertex_buffer.vertex_count;

    let declared = IndexFormat::for_vertex_count(vertex_count);
    let index_buffer = (!decoded.indices.is_empty()).then(|| {
        let format = device_index_format(declared, vertex_count, ctx.device, pending.mesh);
        IndexBufferDescriptor::from_indices(&decoded.indices, format)
    });

    let mut mesh = MeshDescriptor::new(Arc::new(vertex_buffer));
    if let Some(index_buffer) = index_buffer {
        mesh = mesh.with_index_buffer(index_buffer);
    }
    finish_primitive(ctx, pending.mesh, pending.primitive, mesh)
}

fn build_plain(
    ctx: &MeshContext<'_>,
    mesh_index: usize,
    primitive_index: usize,
    cache: &mut VertexBufferCache,
) -> Result<MeshDescriptor, ImportError> {
    let primitive = &ctx.document.meshes[mesh_index].primitives[primitive_index];
    let indices = primitive
        .indices
        .map(|accessor| Ok::<_, ImportError>((accessor, ctx.reader.read_indices(accessor)?)))
        .transpose()?;

    let vertex_buffer = build_vertex_buffer(
        &primitive.attributes,
        indices.as_ref().map(|(_, data)| data.as_slice()),
        &ctx.reader,
        ctx.flip_v,
        cache,
    )?;
    let vertex_count = vertex_buffer.vertex_count;

    let mut mesh = MeshDescriptor::new(vertex_buffer);
    if let Some((accessor, data)) = indices {
        let declared = match ctx.reader.layout(accessor)?.0 {
            ComponentType::U8 => IndexFormat::Uint8,
            ComponentType::U16 => IndexFormat::Uint16,
            _ => IndexFormat::Uint32,
        };
        let format = device_index_format(declared, vertex_count, ctx.device, mesh_index);
        mesh = mesh.with_index_buffer(IndexBufferDescriptor::from_indices(&data, format));
    }
    finish_primitive(ctx, mesh_index, primitive_index, mesh)
}

/// Fill in everything that does not depend on how the vertices were decoded.
fn finish_primitive(
    ctx: &MeshContext<'_>,
    mesh_index: usize,
    primitive_index: usize,
    mut mesh: MeshDescriptor,
) -> Result<MeshDescriptor, ImportError> {
    let gltf_mesh = &ctx.document.meshes[mesh_index];
    let primitive = &gltf_mesh.primitives[primitive_index];

    mesh.topology = topology(primitive.mode, mesh_index)?;
    mesh.name = gltf_mesh.name.clone();
    mesh.material = primitive.material;
    mesh.aabb = primitive
        .attributes
        .get("POSITION")
        .and_then(|&accessor| ctx.reader.bounding_box(accessor));
    mesh.morph_targets = morph_targets(ctx, gltf_mesh, primitive)?;
    mesh.material_variants = material_variants(ctx, primitive, mesh_index)?;
    Ok(mesh)
}

fn topology(mode: Option<u32>, mesh_index: usize) -> Result<PrimitiveTopology, ImportError> {
    let mode = mode.unwrap_or(4);
    match PrimitiveTopology::from_gltf(mode) {
        Some(PrimitiveTopology::TriangleFan) => Err(ImportError::Decode(format!(
            "mesh {mesh_index} uses triangle fans, which are not supported"
        ))),
        Some(topology) => Ok(topology),
        None => Err(ImportError::Decode(format!(
            "mesh {mesh_index} has unknown primitive mode {mode}"
        ))),
    }
}

/// Apply device index support to a declared index format.
fn device_index_format(
    declared: IndexFormat,
    vertex_count: u32,
    device: DeviceCaps,
    mesh_index: usize,
) -> IndexFormat {
    match declared {
        IndexFormat::Uint8 if !device.u8_indices => IndexFormat::Uint16,
        IndexFormat::Uint32 if !device.u32_indices => {
            if vertex_count > u16::MAX as u32 {
                log::warn!(
                    "mesh {mesh_index} has {vertex_count} vertices but the device lacks 32-bit \
                     indices; narrowing to 16-bit will corrupt it"
                );
            }
            IndexFormat::Uint16
        }
        format => format,
    }
}

fn morph_targets(
    ctx: &MeshContext<'_>,
    mesh: &document::Mesh,
    primitive: &document::Primitive,
) -> Result<Vec<MorphTargetDescriptor>, ImportError> {
    primitive
        .targets
        .iter()
        .enumerate()
        .map(|(index, target)| {
            let mut morph = MorphTargetDescriptor::new(mesh.target_name(index)).with_default_weight(
                mesh.weights
                    .as_ref()
                    .and_then(|w| w.get(index).copied())
                    .unwrap_or(0.0),
            );
            if let Some(&accessor) = target.get("POSITION") {
                morph = morph.with_delta_positions(ctx.reader.read_f32(accessor)?);
                if let Some(aabb) = ctx.reader.bounding_box(accessor) {
                    morph = morph.with_aabb(aabb);
                }
            }
            if let Some(&accessor) = target.get("NORMAL") {
                morph = morph.with_delta_normals(ctx.reader.read_f32(accessor)?);
            }
            Ok(morph)
        })
        .collect()
}

fn material_variants(
    ctx: &MeshContext<'_>,
    primitive: &document::Primitive,
    mesh_index: usize,
) -> Result<HashMap<String, usize>, ImportError> {
    let Some(variants) = extension::<PrimitiveVariants>(&primitive.extensions, VARIANTS_EXTENSION)?
    else {
        return Ok(HashMap::new());
    };
    let mut map = HashMap::new();
    for mapping in variants.mappings {
        for variant in mapping.variants {
            let name = ctx.variant_names.get(variant).ok_or_else(|| {
                ImportError::ExtensionData(format!(
                    "{VARIANTS_EXTENSION} on mesh {mesh_index} references unknown variant {variant}"
                ))
            })?;
            map.insert(name.clone(), mapping.material);
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(IndexFormat::Uint8, DeviceCaps::webgpu(), IndexFormat::Uint16)]
    #[case(IndexFormat::Uint8, DeviceCaps::default(), IndexFormat::Uint8)]
    #[case(IndexFormat::Uint32, DeviceCaps::default(), IndexFormat::Uint32)]
    #[case(IndexFormat::Uint32, DeviceCaps { u8_indices: true, u32_indices: false }, IndexFormat::Uint16)]
    #[case(IndexFormat::Uint16, DeviceCaps::webgpu(), IndexFormat::Uint16)]
    fn index_fallback(#[case] declared: IndexFormat, #[case] device: DeviceCaps, #[case] expected: IndexFormat) {
        assert_eq!(device_index_format(declared, 100_000, device, 0), expected);
    }

    #[rstest]
    #[case(None, Ok(PrimitiveTopology::TriangleList))]
    #[case(Some(0), Ok(PrimitiveTopology::PointList))]
    #[case(Some(5), Ok(PrimitiveTopology::TriangleStrip))]
    #[case(Some(6), Err(()))]
    #[case(Some(9), Err(()))]
    fn primitive_modes(#[case] mode: Option<u32>, #[case] expected: Result<PrimitiveTopology, ()>) {
        assert_eq!(topology(mode, 0).map_err(|_| ()), expected);
    }
}
