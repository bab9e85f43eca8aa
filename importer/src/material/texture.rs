//! Image and texture descriptors.
//!
//! Images carry encoded bytes (PNG, JPEG, KTX2, ...); decoding them is left
//! to the renderer. A [`TextureDescriptor`] can only be built from an
//! already resolved [`ImageDescriptor`].

use std::sync::Arc;

use crate::gltf::BufferSlice;

/// Encoded image data.
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    /// Image name or source URI.
    pub name: String,
    /// Declared or inferred MIME type.
    pub mime_type: Option<String>,
    /// Encoded bytes.
    pub data: BufferSlice,
}

/// Texture filter mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl FilterMode {
    /// Map a glTF sampler filter code (9728, 9729, 9984–9987).
    pub fn from_gltf(code: Option<u32>, default: Self) -> Self {
        match code {
            Some(9728) => Self::Nearest,
            Some(9729) => Self::Linear,
            Some(9984) => Self::NearestMipmapNearest,
            Some(9985) => Self::LinearMipmapNearest,
            Some(9986) => Self::NearestMipmapLinear,
            Some(9987) => Self::LinearMipmapLinear,
            _ => default,
        }
    }
}

/// Texture addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    ClampToEdge,
    MirrorRepeat,
    Repeat,
}

impl AddressMode {
    /// Map a glTF wrap code (33071, 33648, 10497).
    pub fn from_gltf(code: Option<u32>) -> Self {
        match code {
            Some(33071) => Self::ClampToEdge,
            Some(33648) => Self::MirrorRepeat,
            _ => Self::Repeat,
        }
    }
}

/// Sampling state of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDescriptor {
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            min_filter: FilterMode::LinearMipmapLinear,
            mag_filter: FilterMode::Linear,
            address_u: AddressMode::Repeat,
            address_v: AddressMode::Repeat,
        }
    }
}

/// An image paired with sampling state.
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    /// Texture name.
    pub name: String,
    /// Source image.
    pub image: Arc<ImageDescriptor>,
    /// Sampling state.
    pub sampler: SamplerDescriptor,
}

impl TextureDescriptor {
    /// Create a texture over a resolved image with default sampling.
    pub fn new(name: impl Into<String>, image: Arc<ImageDescriptor>) -> Self {
        Self {
            name: name.into(),
            image,
            sampler: SamplerDescriptor::default(),
        }
    }

    /// Set the sampler.
    #[must_use]
    pub fn with_sampler(mut self, sampler: SamplerDescriptor) -> Self {
        self.sampler = sampler;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_codes() {
        assert_eq!(
            FilterMode::from_gltf(Some(9986), FilterMode::Linear),
            FilterMode::NearestMipmapLinear
        );
        assert_eq!(
            FilterMode::from_gltf(None, FilterMode::LinearMipmapLinear),
            FilterMode::LinearMipmapLinear
        );
        assert_eq!(AddressMode::from_gltf(Some(33648)), AddressMode::MirrorRepeat);
        assert_eq!(AddressMode::from_gltf(Some(1)), AddressMode::Repeat);
    }
}
