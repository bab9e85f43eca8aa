//! glTF 2.0 JSON document model.
//!
//! Only the fields the importer reads are modelled. Extension blocks stay as
//! raw JSON and are deserialized on demand with [`extension`], so unknown
//! extensions never fail parsing.

use std::collections::HashMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ImportError;

/// Raw `extensions` object, in document order.
pub type Extensions = serde_json::Map<String, Value>;

/// Deserialize a named extension block, if present.
///
/// A present but malformed block fails with [`ImportError::ExtensionData`].
pub fn extension<T: DeserializeOwned>(
    extensions: &Extensions,
    name: &str,
) -> Result<Option<T>, ImportError> {
    extensions
        .get(name)
        .map(|value| {
            T::deserialize(value).map_err(|e| ImportError::ExtensionData(format!("{name}: {e}")))
        })
        .transpose()
}

// ============================================================================
// Root
// ============================================================================

/// Parsed glTF document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub asset: Asset,
    /// Default scene index.
    pub scene: Option<usize>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub meshes: Vec<Mesh>,
    #[serde(default)]
    pub accessors: Vec<Accessor>,
    #[serde(default)]
    pub buffer_views: Vec<BufferView>,
    #[serde(default)]
    pub buffers: Vec<Buffer>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub textures: Vec<Texture>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub samplers: Vec<Sampler>,
    #[serde(default)]
    pub skins: Vec<Skin>,
    #[serde(default)]
    pub animations: Vec<Animation>,
    #[serde(default)]
    pub cameras: Vec<Camera>,
    #[serde(default)]
    pub extensions_used: Vec<String>,
    #[serde(default)]
    pub extensions_required: Vec<String>,
    #[serde(default)]
    pub extensions: Extensions,
}

impl Document {
    /// Lights declared by `KHR_lights_punctual`.
    pub fn lights(&self) -> Result<Vec<Light>, ImportError> {
        Ok(extension::<LightsPunctual>(&self.extensions, "KHR_lights_punctual")?
            .map(|ext| ext.lights)
            .unwrap_or_default())
    }

    /// Variant names declared by `KHR_materials_variants`.
    pub fn variant_names(&self) -> Result<Vec<String>, ImportError> {
        Ok(
            extension::<MaterialsVariants>(&self.extensions, "KHR_materials_variants")?
                .map(|ext| ext.variants.into_iter().map(|v| v.name).collect())
                .unwrap_or_default(),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(default)]
    pub version: String,
    pub generator: Option<String>,
    pub min_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: Option<String>,
    #[serde(default)]
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    pub camera: Option<usize>,
    /// Column-major 4x4 matrix.
    pub matrix: Option<[f32; 16]>,
    pub translation: Option<[f32; 3]>,
    /// Quaternion `[x, y, z, w]`.
    pub rotation: Option<[f32; 4]>,
    pub scale: Option<[f32; 3]>,
    pub weights: Option<Vec<f32>>,
    #[serde(default)]
    pub extensions: Extensions,
}

// ============================================================================
// Binary data
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub name: Option<String>,
    pub uri: Option<String>,
    #[serde(default)]
    pub byte_length: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub name: Option<String>,
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    pub name: Option<String>,
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
    #[serde(default)]
    pub normalized: bool,
    pub count: usize,
    #[serde(rename = "type")]
    pub accessor_type: String,
    pub min: Option<Vec<f32>>,
    pub max: Option<Vec<f32>>,
    pub sparse: Option<Sparse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sparse {
    pub count: usize,
    pub indices: SparseIndices,
    pub values: SparseValues,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseIndices {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseValues {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: usize,
}

// ============================================================================
// Meshes and skins
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mesh {
    pub name: Option<String>,
    #[serde(default)]
    pub primitives: Vec<Primitive>,
    pub weights: Option<Vec<f32>>,
    pub extras: Option<Value>,
}

impl Mesh {
    /// Morph target name from `extras.targetNames`, or its index.
    pub fn target_name(&self, index: usize) -> String {
        self.extras
            .as_ref()
            .and_then(|extras| extras.get("targetNames"))
            .and_then(|names| names.get(index))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| index.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Primitive {
    #[serde(default)]
    pub attributes: HashMap<String, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    /// Topology; 4 (triangles) when absent.
    pub mode: Option<u32>,
    #[serde(default)]
    pub targets: Vec<HashMap<String, usize>>,
    #[serde(default)]
    pub extensions: Extensions,
}

/// `KHR_draco_mesh_compression` on a primitive.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DracoCompression {
    pub buffer_view: usize,
    #[serde(default)]
    pub attributes: HashMap<String, u32>,
}

/// `KHR_materials_variants` on a primitive.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveVariants {
    #[serde(default)]
    pub mappings: Vec<VariantMapping>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantMapping {
    pub material: usize,
    #[serde(default)]
    pub variants: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct MaterialsVariants {
    #[serde(default)]
    variants: Vec<VariantName>,
}

#[derive(Debug, Deserialize)]
struct VariantName {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skin {
    pub name: Option<String>,
    pub inverse_bind_matrices: Option<usize>,
    #[serde(default)]
    pub joints: Vec<usize>,
    pub skeleton: Option<usize>,
}

// ============================================================================
// Materials and textures
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub name: Option<String>,
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    pub normal_texture: Option<TextureInfo>,
    pub occlusion_texture: Option<TextureInfo>,
    pub emissive_texture: Option<TextureInfo>,
    pub emissive_factor: Option<[f32; 3]>,
    pub alpha_mode: Option<String>,
    pub alpha_cutoff: Option<f32>,
    #[serde(default)]
    pub double_sided: bool,
    #[serde(default)]
    pub extensions: Extensions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    pub base_color_factor: Option<[f32; 4]>,
    pub base_color_texture: Option<TextureInfo>,
    pub metallic_factor: Option<f32>,
    pub roughness_factor: Option<f32>,
    pub metallic_roughness_texture: Option<TextureInfo>,
}

/// Texture reference. `scale` is used by normal textures, `strength` by
/// occlusion textures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureInfo {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: u32,
    pub scale: Option<f32>,
    pub strength: Option<f32>,
    #[serde(default)]
    pub extensions: Extensions,
}

/// `KHR_texture_transform` on a texture reference.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureTransformExt {
    pub offset: Option<[f32; 2]>,
    pub scale: Option<[f32; 2]>,
    pub rotation: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Texture {
    pub name: Option<String>,
    pub sampler: Option<usize>,
    pub source: Option<usize>,
    #[serde(default)]
    pub extensions: Extensions,
}

/// Image source override inside a texture extension
/// (`KHR_texture_basisu`, `EXT_texture_webp`, `EXT_texture_avif`).
#[derive(Debug, Deserialize)]
pub struct TextureSourceExt {
    pub source: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub mime_type: Option<String>,
    pub buffer_view: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sampler {
    pub mag_filter: Option<u32>,
    pub min_filter: Option<u32>,
    pub wrap_s: Option<u32>,
    pub wrap_t: Option<u32>,
}

// ============================================================================
// Animation, cameras, lights
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    pub name: Option<String>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub samplers: Vec<AnimationSampler>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub sampler: usize,
    pub target: ChannelTarget,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTarget {
    pub node: Option<usize>,
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSampler {
    pub input: usize,
    pub output: usize,
    pub interpolation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub camera_type: String,
    pub perspective: Option<Perspective>,
    pub orthographic: Option<Orthographic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Perspective {
    pub yfov: f32,
    pub aspect_ratio: Option<f32>,
    pub znear: f32,
    pub zfar: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Orthographic {
    pub xmag: f32,
    pub ymag: f32,
    pub znear: f32,
    pub zfar: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct LightsPunctual {
    #[serde(default)]
    lights: Vec<Light>,
}

/// `KHR_lights_punctual` light definition.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Light {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub light_type: String,
    pub color: Option<[f32; 3]>,
    pub intensity: Option<f32>,
    pub range: Option<f32>,
    pub spot: Option<Spot>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    pub inner_cone_angle: Option<f32>,
    pub outer_cone_angle: Option<f32>,
}

/// `KHR_lights_punctual` reference on a node.
#[derive(Debug, Deserialize)]
pub struct NodeLight {
    pub light: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document() {
        let doc: Document = serde_json::from_str(r#"{"asset":{"version":"2.0"}}"#).unwrap();
        assert_eq!(doc.asset.version, "2.0");
        assert!(doc.nodes.is_empty());
        assert!(doc.lights().unwrap().is_empty());
    }

    #[test]
    fn extensions_keep_document_order() {
        let doc: Document = serde_json::from_str(
            r#"{"asset":{"version":"2.0"},"materials":[{"extensions":{
                "KHR_materials_unlit":{},"KHR_materials_clearcoat":{},"A_vendor":{}}}]}"#,
        )
        .unwrap();
        let keys: Vec<&str> = doc.materials[0].extensions.keys().map(String::as_str).collect();
        assert_eq!(keys, ["KHR_materials_unlit", "KHR_materials_clearcoat", "A_vendor"]);
    }

    #[test]
    fn malformed_extension_is_extension_data_error() {
        let doc: Document = serde_json::from_str(
            r#"{"asset":{"version":"2.0"},"extensions":{"KHR_lights_punctual":{"lights":[{"type":5}]}}}"#,
        )
        .unwrap();
        let err = doc.lights().unwrap_err();
        assert!(matches!(err, ImportError::ExtensionData(_)));
    }

    #[test]
    fn target_names_from_extras() {
        let mesh: Mesh =
            serde_json::from_str(r#"{"primitives":[],"extras":{"targetNames":["blink"]}}"#).unwrap();
        assert_eq!(mesh.target_name(0), "blink");
        assert_eq!(mesh.target_name(1), "1");
    }

    #[test]
    fn variant_names() {
        let doc: Document = serde_json::from_str(
            r#"{"asset":{"version":"2.0"},"extensions":{"KHR_materials_variants":{"variants":[{"name":"red"},{"name":"blue"}]}}}"#,
        )
        .unwrap();
        assert_eq!(doc.variant_names().unwrap(), vec!["red", "blue"]);
    }
}
