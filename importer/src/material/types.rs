//! Engine material descriptor.
//!
//! Colors stored here are gamma-space (glTF linear factors raised to
//! `1/2.2`). Roughness inputs are stored as gloss with the matching
//! `*_invert` flag set.

use std::sync::Arc;

use super::texture::TextureDescriptor;

/// Color channel(s) of a texture a slot reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureChannel {
    R,
    G,
    B,
    A,
    Rgb,
}

/// UV transform from `KHR_texture_transform`, in engine convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureTransform {
    /// UV offset; V is remapped to `1 - scale.y - offset.y`.
    pub offset: [f32; 2],
    /// UV scale.
    pub tiling: [f32; 2],
    /// Rotation in degrees (sign flipped from glTF).
    pub rotation_degrees: f32,
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self {
            offset: [0.0, 0.0],
            tiling: [1.0, 1.0],
            rotation_degrees: 0.0,
        }
    }
}

/// A texture bound to a material input.
#[derive(Debug, Clone)]
pub struct TextureSlot {
    /// Bound texture.
    pub texture: Arc<TextureDescriptor>,
    /// Index of the texture in the import's texture list.
    pub texture_index: usize,
    /// Channel(s) sampled.
    pub channel: TextureChannel,
    /// UV set.
    pub uv_channel: u32,
    /// Optional UV transform.
    pub transform: Option<TextureTransform>,
}

impl TextureSlot {
    /// Same binding, reading a different channel.
    pub fn with_channel(&self, channel: TextureChannel) -> Self {
        Self {
            channel,
            ..self.clone()
        }
    }
}

/// Blending applied when rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendType {
    /// Opaque (and alpha-tested) rendering.
    #[default]
    None,
    /// Standard alpha blending.
    Normal,
}

/// Face culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    #[default]
    Back,
    None,
}

/// `KHR_materials_clearcoat` inputs.
#[derive(Debug, Clone, Default)]
pub struct ClearCoat {
    pub factor: f32,
    pub map: Option<TextureSlot>,
    pub gloss: f32,
    pub gloss_invert: bool,
    pub gloss_map: Option<TextureSlot>,
    pub normal_map: Option<TextureSlot>,
    pub bumpiness: f32,
}

/// `KHR_materials_sheen` inputs.
#[derive(Debug, Clone, Default)]
pub struct Sheen {
    pub color: [f32; 3],
    pub map: Option<TextureSlot>,
    pub gloss: f32,
    pub gloss_invert: bool,
    pub gloss_map: Option<TextureSlot>,
}

/// `KHR_materials_volume` inputs.
#[derive(Debug, Clone, Default)]
pub struct Volume {
    pub thickness: f32,
    pub thickness_map: Option<TextureSlot>,
    pub attenuation: [f32; 3],
    pub attenuation_distance: Option<f32>,
}

/// `KHR_materials_iridescence` inputs.
#[derive(Debug, Clone, Default)]
pub struct Iridescence {
    pub factor: f32,
    pub map: Option<TextureSlot>,
    pub refraction_index: f32,
    pub thickness_min: f32,
    pub thickness_max: f32,
    pub thickness_map: Option<TextureSlot>,
}

/// Standard material produced from a glTF material.
///
/// Self-contained: texture slots hold shared handles, not document indices.
#[derive(Debug, Clone)]
pub struct MaterialDescriptor {
    /// Material name.
    pub name: String,

    /// Diffuse (base) color.
    pub diffuse: [f32; 3],
    pub diffuse_map: Option<TextureSlot>,
    pub opacity: f32,
    pub opacity_map: Option<TextureSlot>,

    /// Metal/rough workflow when true, specular/gloss otherwise.
    pub use_metalness: bool,
    pub metalness: f32,
    pub metalness_map: Option<TextureSlot>,
    pub gloss: f32,
    pub gloss_invert: bool,
    pub gloss_map: Option<TextureSlot>,

    pub specular: [f32; 3],
    pub specular_map: Option<TextureSlot>,
    pub use_metalness_specular_color: bool,
    pub specularity_factor: f32,
    pub specularity_factor_map: Option<TextureSlot>,

    pub normal_map: Option<TextureSlot>,
    pub bumpiness: f32,
    pub ao_map: Option<TextureSlot>,

    pub emissive: [f32; 3],
    pub emissive_map: Option<TextureSlot>,
    pub emissive_intensity: f32,

    pub clear_coat: Option<ClearCoat>,
    pub sheen: Option<Sheen>,
    pub volume: Option<Volume>,
    pub iridescence: Option<Iridescence>,

    /// Transmission amount.
    pub refraction: f32,
    pub refraction_map: Option<TextureSlot>,
    /// Reciprocal of the index of refraction.
    pub refraction_index: f32,
    pub use_dynamic_refraction: bool,

    pub use_lighting: bool,
    pub use_skybox: bool,

    pub blend_type: BlendType,
    /// Alpha test threshold, 0 disables the test.
    pub alpha_test: f32,
    pub depth_write: bool,
    pub two_sided_lighting: bool,
    pub cull: CullMode,
}

impl Default for MaterialDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse: [1.0, 1.0, 1.0],
            diffuse_map: None,
            opacity: 1.0,
            opacity_map: None,
            use_metalness: true,
            metalness: 1.0,
            metalness_map: None,
            gloss: 1.0,
            gloss_invert: true,
            gloss_map: None,
            specular: [1.0, 1.0, 1.0],
            specular_map: None,
            use_metalness_specular_color: false,
            specularity_factor: 1.0,
            specularity_factor_map: None,
            normal_map: None,
            bumpiness: 1.0,
            ao_map: None,
            emissive: [0.0, 0.0, 0.0],
            emissive_map: None,
            emissive_intensity: 1.0,
            clear_coat: None,
            sheen: None,
            volume: None,
            iridescence: None,
            refraction: 0.0,
            refraction_map: None,
            refraction_index: 1.0 / 1.5,
            use_dynamic_refraction: false,
            use_lighting: true,
            use_skybox: true,
            blend_type: BlendType::None,
            alpha_test: 0.0,
            depth_write: true,
            two_sided_lighting: false,
            cull: CullMode::Back,
        }
    }
}

impl MaterialDescriptor {
    /// Creates a default material with a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
