//! Accessor decoding: typed views, de-striding, sparse patching and
//! dequantization.
//!
//! Tightly packed, suitably aligned accessor data is returned as a borrowed
//! slice of the buffer. Strided data is copied into a packed array. Sparse
//! accessors always produce an owned copy of the base data with the
//! overrides applied, so shared buffer bytes are never modified.
//!
//! Data is reinterpreted in host byte order; glTF is little-endian.

use std::borrow::Cow;
use std::sync::Arc;

use bytemuck::Pod;

use crate::math::BoundingBox;
use crate::mesh::ComponentType;

use super::buffer::BufferViewData;
use super::document::{Accessor, Sparse};
use super::error::ImportError;

/// Number of components for an accessor `type` tag.
pub fn component_count(accessor_type: &str) -> Option<usize> {
    Some(match accessor_type {
        "SCALAR" => 1,
        "VEC2" => 2,
        "VEC3" => 3,
        "VEC4" | "MAT2" => 4,
        "MAT3" => 9,
        "MAT4" => 16,
        _ => return None,
    })
}

/// Map a normalized integer component to float.
///
/// Signed types clamp at -1 so both `MIN` and `MIN + 1` map to -1.
pub fn dequantize(component_type: ComponentType, value: f32) -> f32 {
    match component_type {
        ComponentType::I8 => (value / 127.0).max(-1.0),
        ComponentType::U8 => value / 255.0,
        ComponentType::I16 => (value / 32767.0).max(-1.0),
        ComponentType::U16 => value / 65535.0,
        ComponentType::I32 | ComponentType::U32 | ComponentType::F32 => value,
    }
}

/// End of the byte span covered by `count` elements of `size` bytes spaced
/// `stride` apart, or `None` on overflow.
fn span_end(offset: usize, count: usize, stride: usize, size: usize) -> Option<usize> {
    if count == 0 {
        return Some(offset);
    }
    (count - 1)
        .checked_mul(stride)?
        .checked_add(size)?
        .checked_add(offset)
}

/// Decoded accessor contents, `count * components` values long.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessorData<'a> {
    I8(Cow<'a, [i8]>),
    U8(Cow<'a, [u8]>),
    I16(Cow<'a, [i16]>),
    U16(Cow<'a, [u16]>),
    I32(Cow<'a, [i32]>),
    U32(Cow<'a, [u32]>),
    F32(Cow<'a, [f32]>),
}

fn cast<T: Pod>(bytes: Cow<'_, [u8]>) -> Cow<'_, [T]> {
    match bytes {
        Cow::Borrowed(b) => match bytemuck::try_cast_slice(b) {
            Ok(typed) => Cow::Borrowed(typed),
            Err(_) => Cow::Owned(bytemuck::pod_collect_to_vec(b)),
        },
        Cow::Owned(v) => Cow::Owned(bytemuck::pod_collect_to_vec(&v)),
    }
}

impl<'a> AccessorData<'a> {
    /// Interpret packed bytes as the given component type.
    pub fn from_bytes(component_type: ComponentType, bytes: Cow<'a, [u8]>) -> Self {
        match component_type {
            ComponentType::I8 => Self::I8(cast(bytes)),
            ComponentType::U8 => Self::U8(bytes),
            ComponentType::I16 => Self::I16(cast(bytes)),
            ComponentType::U16 => Self::U16(cast(bytes)),
            ComponentType::I32 => Self::I32(cast(bytes)),
            ComponentType::U32 => Self::U32(cast(bytes)),
            ComponentType::F32 => Self::F32(cast(bytes)),
        }
    }

    /// Component storage type.
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::I8(_) => ComponentType::I8,
            Self::U8(_) => ComponentType::U8,
            Self::I16(_) => ComponentType::I16,
            Self::U16(_) => ComponentType::U16,
            Self::I32(_) => ComponentType::I32,
            Self::U32(_) => ComponentType::U32,
            Self::F32(_) => ComponentType::F32,
        }
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        match self {
            Self::I8(d) => d.len(),
            Self::U8(d) => d.len(),
            Self::I16(d) => d.len(),
            Self::U16(d) => d.len(),
            Self::I32(d) => d.len(),
            Self::U32(d) => d.len(),
            Self::F32(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the data still points into the source buffer.
    pub fn is_borrowed(&self) -> bool {
        match self {
            Self::I8(d) => matches!(d, Cow::Borrowed(_)),
            Self::U8(d) => matches!(d, Cow::Borrowed(_)),
            Self::I16(d) => matches!(d, Cow::Borrowed(_)),
            Self::U16(d) => matches!(d, Cow::Borrowed(_)),
            Self::I32(d) => matches!(d, Cow::Borrowed(_)),
            Self::U32(d) => matches!(d, Cow::Borrowed(_)),
            Self::F32(d) => matches!(d, Cow::Borrowed(_)),
        }
    }

    /// Convert to floats, dequantizing normalized integer types.
    pub fn to_f32(&self, normalized: bool) -> Vec<f32> {
        let ct = self.component_type();
        let convert = |v: f32| if normalized { dequantize(ct, v) } else { v };
        match self {
            Self::I8(d) => d.iter().map(|&v| convert(v as f32)).collect(),
            Self::U8(d) => d.iter().map(|&v| convert(v as f32)).collect(),
            Self::I16(d) => d.iter().map(|&v| convert(v as f32)).collect(),
            Self::U16(d) => d.iter().map(|&v| convert(v as f32)).collect(),
            Self::I32(d) => d.iter().map(|&v| v as f32).collect(),
            Self::U32(d) => d.iter().map(|&v| v as f32).collect(),
            Self::F32(d) => d.to_vec(),
        }
    }

    /// Widen unsigned integer data to u32. Signed and float data yield `None`.
    pub fn to_u32(&self) -> Option<Vec<u32>> {
        match self {
            Self::U8(d) => Some(d.iter().map(|&v| v as u32).collect()),
            Self::U16(d) => Some(d.iter().map(|&v| v as u32).collect()),
            Self::U32(d) => Some(d.to_vec()),
            _ => None,
        }
    }
}

/// Raw per-vertex source for one attribute, consumed by the vertex assembler.
#[derive(Debug)]
pub(crate) struct SourceDescriptor<'a> {
    /// Bytes to read from; element `i` starts at `offset + i * stride`.
    pub bytes: Cow<'a, [u8]>,
    /// Backing buffer when `bytes` borrows it directly.
    pub buffer: Option<&'a Arc<[u8]>>,
    pub offset: usize,
    pub stride: usize,
    /// Unpadded element size in bytes.
    pub size: usize,
    pub count: usize,
    pub components: u32,
    pub component_type: ComponentType,
    pub normalize: bool,
}

/// Decodes accessors over materialized buffer views.
#[derive(Clone, Copy)]
pub struct AccessorReader<'a> {
    accessors: &'a [Accessor],
    views: &'a [BufferViewData],
}

impl<'a> AccessorReader<'a> {
    pub fn new(accessors: &'a [Accessor], views: &'a [BufferViewData]) -> Self {
        Self { accessors, views }
    }

    /// Accessor descriptor by index.
    pub fn accessor(&self, index: usize) -> Result<&'a Accessor, ImportError> {
        self.accessors
            .get(index)
            .ok_or_else(|| ImportError::Format(format!("accessor {index} does not exist")))
    }

    /// Component type and component count of an accessor.
    pub fn layout(&self, index: usize) -> Result<(ComponentType, usize), ImportError> {
        let accessor = self.accessor(index)?;
        let component_type = ComponentType::from_gltf(accessor.component_type).ok_or_else(|| {
            ImportError::Decode(format!(
                "accessor {index} has unsupported component type {}",
                accessor.component_type
            ))
        })?;
        let components = component_count(&accessor.accessor_type).ok_or_else(|| {
            ImportError::Decode(format!(
                "accessor {index} has unknown type '{}'",
                accessor.accessor_type
            ))
        })?;
        Ok((component_type, components))
    }

    /// Decode an accessor into packed typed data.
    pub fn read(&self, index: usize) -> Result<AccessorData<'a>, ImportError> {
        let (component_type, components) = self.layout(index)?;
        let bytes = self.packed_bytes(index, component_type.size() * components)?;
        Ok(AccessorData::from_bytes(component_type, bytes))
    }

    /// Decode an accessor as floats, dequantizing normalized integers.
    pub fn read_f32(&self, index: usize) -> Result<Vec<f32>, ImportError> {
        let normalized = self.accessor(index)?.normalized;
        Ok(self.read(index)?.to_f32(normalized))
    }

    /// Decode an index accessor.
    pub fn read_indices(&self, index: usize) -> Result<Vec<u32>, ImportError> {
        self.read(index)?.to_u32().ok_or_else(|| {
            ImportError::Decode(format!("index accessor {index} is not an unsigned integer type"))
        })
    }

    /// Bounding box from the accessor's declared `min`/`max`.
    ///
    /// Normalized accessors have their bounds dequantized. Returns `None`
    /// when either bound is missing or shorter than three components.
    pub fn bounding_box(&self, index: usize) -> Option<BoundingBox> {
        let accessor = self.accessors.get(index)?;
        let (min, max) = (accessor.min.as_deref()?, accessor.max.as_deref()?);
        if min.len() < 3 || max.len() < 3 {
            return None;
        }
        let mut min = [min[0], min[1], min[2]];
        let mut max = [max[0], max[1], max[2]];
        if accessor.normalized
            && let Some(ct) = ComponentType::from_gltf(accessor.component_type)
        {
            min = min.map(|v| dequantize(ct, v));
            max = max.map(|v| dequantize(ct, v));
        }
        Some(BoundingBox::from_min_max(min, max))
    }

    /// Raw strided source for vertex assembly.
    ///
    /// Plain accessors reference the backing buffer directly; sparse or
    /// view-less accessors are decoded into a packed owned copy.
    pub(crate) fn source(&self, index: usize) -> Result<SourceDescriptor<'a>, ImportError> {
        let accessor = self.accessor(index)?;
        let (component_type, components) = self.layout(index)?;
        let size = component_type.size() * components;
        let mut source = SourceDescriptor {
            bytes: Cow::Borrowed(&[]),
            buffer: None,
            offset: 0,
            stride: size,
            size,
            count: accessor.count,
            components: components as u32,
            component_type,
            normalize: accessor.normalized,
        };

        if accessor.sparse.is_none()
            && let Some(view_index) = accessor.buffer_view
        {
            let view = self.view(index, view_index)?;
            let stride = view.byte_stride.filter(|&s| s > 0).unwrap_or(size);
            if stride < size {
                return Err(ImportError::Decode(format!(
                    "accessor {index} has stride {stride} smaller than its element size {size}"
                )));
            }
            let range = view.data.range();
            let offset = range.start.checked_add(accessor.byte_offset);
            let end = offset.and_then(|o| span_end(o, accessor.count, stride, size));
            let (Some(offset), Some(end)) = (offset, end) else {
                return Err(ImportError::Decode(format!("accessor {index} is too large")));
            };
            if end > range.end {
                return Err(ImportError::Decode(format!(
                    "accessor {index} reads past the end of buffer view {view_index}"
                )));
            }
            let buffer = view.data.buffer();
            source.bytes = Cow::Borrowed(&buffer[..range.end]);
            source.buffer = Some(buffer);
            source.offset = offset;
            source.stride = stride;
        } else {
            source.bytes = self.packed_bytes(index, size)?;
        }
        Ok(source)
    }

    fn view(&self, accessor: usize, view: usize) -> Result<&'a BufferViewData, ImportError> {
        self.views.get(view).ok_or_else(|| {
            ImportError::Format(format!(
                "accessor {accessor} references missing buffer view {view}"
            ))
        })
    }

    fn packed_bytes(&self, index: usize, element_size: usize) -> Result<Cow<'a, [u8]>, ImportError> {
        let accessor = self.accessor(index)?;
        let total = accessor.count.checked_mul(element_size).ok_or_else(|| {
            ImportError::Decode(format!("accessor {index} is too large"))
        })?;
        let base = match accessor.buffer_view {
            Some(view) => self.view_elements(
                index,
                view,
                accessor.byte_offset,
                accessor.count,
                element_size,
            )?,
            // No view: all zeros, optionally patched by sparse data.
            None => Cow::Owned(vec![0; total]),
        };
        match &accessor.sparse {
            None => Ok(base),
            Some(sparse) => {
                let patched =
                    self.apply_sparse(index, base.into_owned(), sparse, accessor.count, element_size)?;
                Ok(Cow::Owned(patched))
            }
        }
    }

    /// Packed bytes of `count` elements of one view, de-strided if needed.
    fn view_elements(
        &self,
        accessor: usize,
        view_index: usize,
        offset: usize,
        count: usize,
        element_size: usize,
    ) -> Result<Cow<'a, [u8]>, ImportError> {
        let view = self.view(accessor, view_index)?;
        let data: &'a [u8] = &view.data;
        let out_of_range = || {
            ImportError::Decode(format!(
                "accessor {accessor} reads past the end of buffer view {view_index}"
            ))
        };

        match view.byte_stride.filter(|&s| s > 0 && s != element_size) {
            None => {
                let end = span_end(offset, count, element_size, element_size).ok_or_else(out_of_range)?;
                data.get(offset..end).map(Cow::Borrowed).ok_or_else(out_of_range)
            }
            Some(stride) if stride < element_size => Err(ImportError::Decode(format!(
                "accessor {accessor} has stride {stride} smaller than its element size {element_size}"
            ))),
            Some(stride) => {
                match span_end(offset, count, stride, element_size) {
                    Some(end) if end <= data.len() => {}
                    _ => return Err(out_of_range()),
                }
                let mut packed = Vec::with_capacity(count * element_size);
                for i in 0..count {
                    let start = offset + i * stride;
                    packed.extend_from_slice(&data[start..start + element_size]);
                }
                Ok(Cow::Owned(packed))
            }
        }
    }

    fn apply_sparse(
        &self,
        accessor: usize,
        mut base: Vec<u8>,
        sparse: &Sparse,
        count: usize,
        element_size: usize,
    ) -> Result<Vec<u8>, ImportError> {
        let index_type = ComponentType::from_gltf(sparse.indices.component_type)
            .filter(|t| matches!(t, ComponentType::U8 | ComponentType::U16 | ComponentType::U32))
            .ok_or_else(|| {
                ImportError::Decode(format!(
                    "sparse indices of accessor {accessor} must be unsigned, got component type {}",
                    sparse.indices.component_type
                ))
            })?;
        let index_bytes = self.view_elements(
            accessor,
            sparse.indices.buffer_view,
            sparse.indices.byte_offset,
            sparse.count,
            index_type.size(),
        )?;
        let indices = AccessorData::from_bytes(index_type, index_bytes)
            .to_u32()
            .unwrap_or_default();
        let values = self.view_elements(
            accessor,
            sparse.values.buffer_view,
            sparse.values.byte_offset,
            sparse.count,
            element_size,
        )?;

        // Duplicate targets are applied in order: the last one wins.
        for (k, &target) in indices.iter().enumerate() {
            let target = target as usize;
            if target >= count {
                return Err(ImportError::Decode(format!(
                    "sparse index {target} of accessor {accessor} is out of range (count {count})"
                )));
            }
            let dst = target * element_size;
            let src = k * element_size;
            base[dst..dst + element_size].copy_from_slice(&values[src..src + element_size]);
        }
        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gltf::ErrorKind;
    use crate::gltf::buffer::BufferSlice;
    use crate::gltf::document::{SparseIndices, SparseValues};
    use rstest::rstest;

    fn view(bytes: Vec<u8>, stride: Option<usize>) -> BufferViewData {
        BufferViewData {
            data: BufferSlice::from(bytes),
            byte_stride: stride,
        }
    }

    fn accessor(view: Option<usize>, component_type: u32, ty: &str, count: usize) -> Accessor {
        Accessor {
            buffer_view: view,
            component_type,
            accessor_type: ty.to_owned(),
            count,
            ..Default::default()
        }
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        bytemuck::cast_slice(values).to_vec()
    }

    #[rstest]
    #[case(ComponentType::I8, 127.0, 1.0)]
    #[case(ComponentType::I8, -127.0, -1.0)]
    #[case(ComponentType::I8, -128.0, -1.0)]
    #[case(ComponentType::U8, 255.0, 1.0)]
    #[case(ComponentType::U8, 0.0, 0.0)]
    #[case(ComponentType::I16, 32767.0, 1.0)]
    #[case(ComponentType::I16, -32768.0, -1.0)]
    #[case(ComponentType::U16, 65535.0, 1.0)]
    #[case(ComponentType::F32, 0.25, 0.25)]
    fn dequantize_endpoints(#[case] ct: ComponentType, #[case] raw: f32, #[case] expected: f32) {
        assert_eq!(dequantize(ct, raw), expected);
    }

    #[rstest]
    #[case(ComponentType::I8, i8::MIN as i32, i8::MAX as i32, true)]
    #[case(ComponentType::U8, 0, u8::MAX as i32, false)]
    #[case(ComponentType::I16, i16::MIN as i32, i16::MAX as i32, true)]
    #[case(ComponentType::U16, 0, u16::MAX as i32, false)]
    fn dequantize_stays_in_unit_range(
        #[case] ct: ComponentType,
        #[case] min: i32,
        #[case] max: i32,
        #[case] signed: bool,
    ) {
        let lower = if signed { -1.0 } else { 0.0 };
        for x in min..=max {
            let v = dequantize(ct, x as f32);
            assert!((lower..=1.0).contains(&v), "{ct:?} {x} -> {v}");
        }
    }

    #[test]
    fn component_counts() {
        assert_eq!(component_count("SCALAR"), Some(1));
        assert_eq!(component_count("MAT4"), Some(16));
        assert_eq!(component_count("VEC5"), None);
    }

    #[test]
    fn packed_data_is_borrowed() {
        let views = vec![view(f32_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), None)];
        let accessors = vec![accessor(Some(0), 5126, "VEC3", 2)];
        let reader = AccessorReader::new(&accessors, &views);
        let data = reader.read(0).unwrap();
        assert!(data.is_borrowed());
        assert_eq!(data, AccessorData::F32(Cow::Owned(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])));
    }

    #[test]
    fn strided_data_is_flattened() {
        // Two VEC2<u16> elements with a 8-byte stride.
        let bytes = vec![1, 0, 2, 0, 0xAA, 0xAA, 0xAA, 0xAA, 3, 0, 4, 0];
        let views = vec![view(bytes, Some(8))];
        let accessors = vec![accessor(Some(0), 5123, "VEC2", 2)];
        let reader = AccessorReader::new(&accessors, &views);
        let data = reader.read(0).unwrap();
        assert!(!data.is_borrowed());
        assert_eq!(data.to_u32(), Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn missing_view_reads_zeros() {
        let accessors = vec![accessor(None, 5126, "VEC3", 2)];
        let reader = AccessorReader::new(&accessors, &[]);
        assert_eq!(reader.read_f32(0).unwrap(), vec![0.0; 6]);
    }

    #[test]
    fn normalized_read_dequantizes() {
        let views = vec![view(vec![0, 255, 0, 0], None)];
        let mut acc = accessor(Some(0), 5121, "VEC2", 1);
        acc.normalized = true;
        let accessors = vec![acc];
        let reader = AccessorReader::new(&accessors, &views);
        assert_eq!(reader.read_f32(0).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn sparse_patches_copy_of_base() {
        let base = f32_bytes(&[1.0, 1.0, 1.0, 1.0]);
        let views = vec![
            view(base.clone(), None),
            view(vec![1, 0, 3, 0, 1, 0], None),
            view(f32_bytes(&[5.0, 7.0, 9.0]), None),
        ];
        let mut acc = accessor(Some(0), 5126, "SCALAR", 4);
        acc.sparse = Some(Sparse {
            count: 3,
            indices: SparseIndices {
                buffer_view: 1,
                byte_offset: 0,
                component_type: 5123,
            },
            values: SparseValues {
                buffer_view: 2,
                byte_offset: 0,
            },
        });
        let accessors = vec![acc];
        let reader = AccessorReader::new(&accessors, &views);
        // Index 1 appears twice; the later value wins.
        assert_eq!(reader.read_f32(0).unwrap(), vec![1.0, 9.0, 1.0, 7.0]);
        assert_eq!(&*views[0].data, base.as_slice());
    }

    #[test]
    fn sparse_without_base_view() {
        let views = vec![view(vec![2], None), view(f32_bytes(&[3.0]), None)];
        let mut acc = accessor(None, 5126, "SCALAR", 3);
        acc.sparse = Some(Sparse {
            count: 1,
            indices: SparseIndices {
                buffer_view: 0,
                byte_offset: 0,
                component_type: 5121,
            },
            values: SparseValues {
                buffer_view: 1,
                byte_offset: 0,
            },
        });
        let accessors = vec![acc];
        let reader = AccessorReader::new(&accessors, &views);
        assert_eq!(reader.read_f32(0).unwrap(), vec![0.0, 0.0, 3.0]);
    }

    #[test]
    fn sparse_index_out_of_range_is_decode_error() {
        let views = vec![view(vec![9], None), view(f32_bytes(&[3.0]), None)];
        let mut acc = accessor(None, 5126, "SCALAR", 3);
        acc.sparse = Some(Sparse {
            count: 1,
            indices: SparseIndices {
                buffer_view: 0,
                byte_offset: 0,
                component_type: 5121,
            },
            values: SparseValues {
                buffer_view: 1,
                byte_offset: 0,
            },
        });
        let accessors = vec![acc];
        let reader = AccessorReader::new(&accessors, &views);
        assert_eq!(reader.read(0).unwrap_err().kind(), ErrorKind::Decode);
    }

    #[test]
    fn unknown_component_type_is_decode_error() {
        let accessors = vec![accessor(None, 5130, "SCALAR", 1)];
        let reader = AccessorReader::new(&accessors, &[]);
        assert_eq!(reader.read(0).unwrap_err().kind(), ErrorKind::Decode);
    }

    #[test]
    fn read_past_view_is_decode_error() {
        let views = vec![view(vec![0; 8], None)];
        let accessors = vec![accessor(Some(0), 5126, "VEC3", 1)];
        let reader = AccessorReader::new(&accessors, &views);
        assert_eq!(reader.read(0).unwrap_err().kind(), ErrorKind::Decode);
    }

    #[test]
    fn signed_indices_rejected() {
        let views = vec![view(vec![0, 0], None)];
        let accessors = vec![accessor(Some(0), 5122, "SCALAR", 1)];
        let reader = AccessorReader::new(&accessors, &views);
        assert_eq!(reader.read_indices(0).unwrap_err().kind(), ErrorKind::Decode);
    }

    #[test]
    fn bounding_box_from_declared_bounds() {
        let mut acc = accessor(None, 5122, "VEC3", 0);
        acc.min = Some(vec![-32767.0, 0.0, 0.0]);
        acc.max = Some(vec![32767.0, 32767.0, 0.0]);
        acc.normalized = true;
        let accessors = vec![acc, accessor(None, 5126, "VEC3", 0)];
        let reader = AccessorReader::new(&accessors, &[]);
        let aabb = reader.bounding_box(0).unwrap();
        assert_eq!(aabb.min(), [-1.0, 0.0, 0.0]);
        assert_eq!(aabb.max(), [1.0, 1.0, 0.0]);
        assert!(reader.bounding_box(1).is_none());
    }
}
