//! Material and texture descriptors.
//!
//! - [`MaterialDescriptor`] - Standard material inputs (PBR plus extensions)
//! - [`TextureDescriptor`] - Resolved image plus sampler
//! - [`ImageDescriptor`] - Encoded image bytes

mod texture;
mod types;

pub use texture::{AddressMode, FilterMode, ImageDescriptor, SamplerDescriptor, TextureDescriptor};
pub use types::{
    BlendType, ClearCoat, CullMode, Iridescence, MaterialDescriptor, Sheen, TextureChannel,
    TextureSlot, TextureTransform, Volume,
};
