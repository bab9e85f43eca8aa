//! Vertex buffer assembly.
//!
//! Converts a primitive's attribute map into one interleaved vertex buffer:
//!
//! 1. Known attributes are sorted into canonical semantic order.
//! 2. Identical attribute sets share one buffer per import (keyed by
//!    `SEMANTIC:accessor` pairs).
//! 3. Missing normals are generated from positions.
//! 4. Data already interleaved in the target layout is copied in one block;
//!    anything else is gathered 32-bit word by word per element.
//! 5. UV V coordinates are flipped in place for exporters that need it.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use crate::math::calculate_normals;
use crate::mesh::{
    ComponentType, ElementDesc, VertexBufferDescriptor, VertexElement, VertexFormat,
    VertexSemantic,
};

use super::accessor::{AccessorReader, SourceDescriptor};
use super::error::ImportError;

/// Vertex buffers built so far, keyed by attribute signature.
pub type VertexBufferCache = HashMap<String, Arc<VertexBufferDescriptor>>;

/// Cache key for a set of attributes already in canonical order.
pub fn cache_key(attributes: &[(VertexSemantic, usize)]) -> String {
    attributes
        .iter()
        .map(|(semantic, accessor)| format!("{}:{accessor}", semantic.as_str()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Known attributes of a primitive in canonical order. Unknown glTF
/// attribute names are skipped.
pub fn canonical_attributes(attributes: &HashMap<String, usize>) -> Vec<(VertexSemantic, usize)> {
    let mut known: Vec<(VertexSemantic, usize)> = attributes
        .iter()
        .filter_map(|(name, &accessor)| {
            let semantic = VertexSemantic::from_gltf(name);
            if semantic.is_none() {
                log::trace!("ignoring vertex attribute {name}");
            }
            semantic.map(|s| (s, accessor))
        })
        .collect();
    known.sort_by_key(|(semantic, _)| *semantic);
    known
}

/// Build (or fetch from `cache`) the vertex buffer for a primitive.
///
/// `indices` are the primitive's triangle indices, used only for normal
/// generation.
pub(crate) fn build_vertex_buffer(
    attributes: &HashMap<String, usize>,
    indices: Option<&[u32]>,
    reader: &AccessorReader<'_>,
    flip_v: bool,
    cache: &mut VertexBufferCache,
) -> Result<Arc<VertexBufferDescriptor>, ImportError> {
    let attributes = canonical_attributes(attributes);
    let key = cache_key(&attributes);
    if let Some(existing) = cache.get(&key) {
        log::trace!("reusing vertex buffer {key}");
        return Ok(Arc::clone(existing));
    }

    let mut sources: Vec<(VertexSemantic, SourceDescriptor<'_>)> = attributes
        .iter()
        .map(|&(semantic, accessor)| Ok((semantic, reader.source(accessor)?)))
        .collect::<Result<_, ImportError>>()?;

    let Some(position_accessor) = attributes
        .iter()
        .find(|(s, _)| *s == VertexSemantic::Position)
        .map(|&(_, a)| a)
    else {
        return Err(ImportError::Format(
            "mesh primitive has no POSITION attribute".into(),
        ));
    };
    let vertex_count = reader.accessor(position_accessor)?.count;
    for (&(semantic, accessor), (_, source)) in attributes.iter().zip(&sources) {
        if source.count != vertex_count {
            return Err(ImportError::Decode(format!(
                "{} accessor {accessor} has {} elements but POSITION has {vertex_count}",
                semantic.as_str(),
                source.count
            )));
        }
    }

    if !sources.iter().any(|(s, _)| *s == VertexSemantic::Normal) {
        let positions = reader.read_f32(position_accessor)?;
        let normals = match indices {
            Some(indices) => calculate_normals(&positions, indices),
            None => {
                let sequential: Vec<u32> = (0..vertex_count as u32).collect();
                calculate_normals(&positions, &sequential)
            }
        };
        sources.push((VertexSemantic::Normal, generated_source(normals, vertex_count)));
        sources.sort_by_key(|(semantic, _)| *semantic);
    }

    let descs: Vec<ElementDesc> = sources
        .iter()
        .map(|(semantic, source)| ElementDesc {
            semantic: *semantic,
            components: source.components,
            data_type: source.component_type,
            normalize: source.normalize,
        })
        .collect();
    let format = VertexFormat::new(&descs);
    let stride = format.stride() as usize;
    let too_large = || ImportError::Decode(format!("vertex buffer for {key} is too large"));
    let byte_len = vertex_count.checked_mul(stride).ok_or_else(too_large)?;
    let vertex_count_u32 = u32::try_from(vertex_count).map_err(|_| too_large())?;

    let data = match interleaved_block(&format, &sources, vertex_count) {
        Some(block) => block.to_vec(),
        None => gather(&format, &sources, vertex_count, byte_len),
    };

    let mut vertex_buffer = VertexBufferDescriptor {
        format,
        vertex_count: vertex_count_u32,
        data,
    };
    debug_assert_eq!(vertex_buffer.data.len(), byte_len);
    if flip_v {
        flip_tex_coord_vs(&mut vertex_buffer);
    }

    let vertex_buffer = Arc::new(vertex_buffer);
    cache.insert(key, Arc::clone(&vertex_buffer));
    Ok(vertex_buffer)
}

fn generated_source(normals: Vec<f32>, count: usize) -> SourceDescriptor<'static> {
    SourceDescriptor {
        bytes: Cow::Owned(bytemuck::cast_slice(&normals).to_vec()),
        buffer: None,
        offset: 0,
        stride: 12,
        size: 12,
        count,
        components: 3,
        component_type: ComponentType::F32,
        normalize: false,
    }
}

/// Source bytes already laid out exactly like `format`, if there are any.
fn interleaved_block<'s>(
    format: &VertexFormat,
    sources: &'s [(VertexSemantic, SourceDescriptor<'_>)],
    vertex_count: usize,
) -> Option<&'s [u8]> {
    let (_, position) = sources
        .iter()
        .find(|(s, _)| *s == VertexSemantic::Position)?;
    let buffer = position.buffer?;
    let stride = format.stride() as usize;

    let matches = sources.iter().zip(format.elements()).all(|((_, source), element)| {
        source.buffer.is_some_and(|b| Arc::ptr_eq(b, buffer))
            && source.stride == stride
            && source.size == element.size as usize
            && source.offset.checked_sub(position.offset) == Some(element.offset as usize)
    });
    if !matches {
        return None;
    }
    let end = vertex_count
        .checked_mul(stride)?
        .checked_add(position.offset)?;
    position.bytes.get(position.offset..end)
}

/// Copy every element into a fresh buffer of `byte_len` bytes,
/// `ceil(size / 4)` words per vertex.
///
/// Sources are bounds-checked up front; only the word padding of the last
/// element may be clamped at the end of its source.
fn gather(
    format: &VertexFormat,
    sources: &[(VertexSemantic, SourceDescriptor<'_>)],
    vertex_count: usize,
    byte_len: usize,
) -> Vec<u8> {
    let stride = format.stride() as usize;
    let mut data = vec![0u8; byte_len];
    for ((_, source), element) in sources.iter().zip(format.elements()) {
        let copy_size = source.size.next_multiple_of(4);
        let mut dst = element.offset as usize;
        let mut src = source.offset;
        for _ in 0..vertex_count {
            let available = source.bytes.len().saturating_sub(src);
            let n = copy_size.min(available);
            if n == 0 {
                break;
            }
            data[dst..dst + n].copy_from_slice(&source.bytes[src..src + n]);
            src += source.stride;
            dst += stride;
        }
    }
    data
}

fn flip_tex_coord_vs(vertex_buffer: &mut VertexBufferDescriptor) {
    let stride = vertex_buffer.format.stride() as usize;
    let elements: Vec<VertexElement> = vertex_buffer
        .format
        .elements()
        .iter()
        .filter(|e| e.semantic.is_tex_coord() && e.components >= 2)
        .copied()
        .collect();

    for element in elements {
        let v_offset = element.offset as usize + element.data_type.size();
        let flip: fn(&mut [u8]) = match (element.data_type, element.normalize) {
            (ComponentType::F32, _) => |b| {
                let v = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                b.copy_from_slice(&(1.0 - v).to_le_bytes());
            },
            (ComponentType::U16, true) => |b| {
                let v = u16::from_le_bytes([b[0], b[1]]);
                b.copy_from_slice(&(u16::MAX - v).to_le_bytes());
            },
            (ComponentType::U8, true) => |b| b[0] = u8::MAX - b[0],
            (data_type, _) => {
                log::warn!(
                    "cannot flip V of {:?} texture coordinates stored as {data_type:?}",
                    element.semantic
                );
                continue;
            }
        };
        let size = element.data_type.size();
        for vertex in vertex_buffer.data.chunks_exact_mut(stride) {
            flip(&mut vertex[v_offset..v_offset + size]);
        }
    }
}
