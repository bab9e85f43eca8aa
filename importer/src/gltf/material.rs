//! glTF material to [`MaterialDescriptor`] conversion.
//!
//! The core `pbrMetallicRoughness` block is applied first. Extensions are
//! then applied in the order they appear in the material's `extensions`
//! object, each through one arm of the [`MaterialExtension`] table. Unknown
//! extensions are skipped.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::material::{
    BlendType, ClearCoat, CullMode, Iridescence, MaterialDescriptor, Sheen, TextureChannel,
    TextureDescriptor, TextureSlot, TextureTransform, Volume,
};
use crate::math::RAD_TO_DEG;

use super::document::{self, TextureInfo, TextureTransformExt, extension};
use super::error::ImportError;
use super::options::Hooks;

/// glTF colors are linear; the engine stores gamma-space colors.
fn gamma(c: [f32; 3]) -> [f32; 3] {
    c.map(|v| v.powf(1.0 / 2.2))
}

fn rgb(c: [f32; 4]) -> [f32; 3] {
    [c[0], c[1], c[2]]
}

/// Resolves [`TextureInfo`] references against the import's textures.
struct Slots<'a> {
    material: usize,
    textures: &'a [Arc<TextureDescriptor>],
}

impl Slots<'_> {
    fn core(&self, info: &TextureInfo, channel: TextureChannel) -> Result<TextureSlot, ImportError> {
        self.lookup(info, channel, ImportError::Format)
    }

    fn ext(&self, info: &TextureInfo, channel: TextureChannel) -> Result<TextureSlot, ImportError> {
        self.lookup(info, channel, ImportError::ExtensionData)
    }

    fn lookup(
        &self,
        info: &TextureInfo,
        channel: TextureChannel,
        missing: fn(String) -> ImportError,
    ) -> Result<TextureSlot, ImportError> {
        let texture = self.textures.get(info.index).ok_or_else(|| {
            missing(format!(
                "material {} references missing texture {}",
                self.material, info.index
            ))
        })?;
        let transform = extension::<TextureTransformExt>(&info.extensions, "KHR_texture_transform")?
            .map(|t| texture_transform(&t));
        Ok(TextureSlot {
            texture: Arc::clone(texture),
            texture_index: info.index,
            channel,
            uv_channel: info.tex_coord,
            transform,
        })
    }
}

/// Convert `KHR_texture_transform` into engine convention (V origin at the
/// bottom, clockwise degrees).
fn texture_transform(t: &TextureTransformExt) -> TextureTransform {
    let [sx, sy] = t.scale.unwrap_or([1.0, 1.0]);
    let [ox, oy] = t.offset.unwrap_or([0.0, 0.0]);
    TextureTransform {
        offset: [ox, 1.0 - sy - oy],
        tiling: [sx, sy],
        rotation_degrees: -t.rotation.unwrap_or(0.0) * RAD_TO_DEG,
    }
}

/// Build one material, honoring the material hooks.
pub(crate) fn build_material(
    index: usize,
    material: &document::Material,
    textures: &[Arc<TextureDescriptor>],
    hooks: &Hooks<document::Material, MaterialDescriptor>,
) -> Result<MaterialDescriptor, ImportError> {
    hooks.run(material, || {
        let slots = Slots { material: index, textures };
        let name = material.name.clone().unwrap_or_else(|| format!("material_{index}"));
        let mut out = MaterialDescriptor::new(name);

        if let Some(pbr) = &material.pbr_metallic_roughness {
            apply_metallic_roughness(pbr, &mut out, &slots)?;
        }
        apply_surface(material, &mut out, &slots)?;

        for (name, data) in &material.extensions {
            match MaterialExtension::from_name(name) {
                Some(ext) => ext.apply(data, &mut out, &slots)?,
                None => log::trace!("material {index}: ignoring extension {name}"),
            }
        }
        Ok(out)
    })
}

fn apply_metallic_roughness(
    pbr: &document::PbrMetallicRoughness,
    out: &mut MaterialDescriptor,
    slots: &Slots<'_>,
) -> Result<(), ImportError> {
    if let Some(color) = pbr.base_color_factor {
        out.diffuse = gamma(rgb(color));
        out.opacity = color[3];
    }
    if let Some(info) = &pbr.base_color_texture {
        let slot = slots.core(info, TextureChannel::Rgb)?;
        out.opacity_map = Some(slot.with_channel(TextureChannel::A));
        out.diffuse_map = Some(slot);
    }
    out.use_metalness = true;
    out.metalness = pbr.metallic_factor.unwrap_or(1.0);
    out.gloss = pbr.roughness_factor.unwrap_or(1.0);
    out.gloss_invert = true;
    if let Some(info) = &pbr.metallic_roughness_texture {
        let slot = slots.core(info, TextureChannel::B)?;
        out.gloss_map = Some(slot.with_channel(TextureChannel::G));
        out.metalness_map = Some(slot);
    }
    Ok(())
}

fn apply_surface(
    material: &document::Material,
    out: &mut MaterialDescriptor,
    slots: &Slots<'_>,
) -> Result<(), ImportError> {
    if let Some(info) = &material.normal_texture {
        out.normal_map = Some(slots.core(info, TextureChannel::Rgb)?);
        out.bumpiness = info.scale.unwrap_or(1.0);
    }
    if let Some(info) = &material.occlusion_texture {
        out.ao_map = Some(slots.core(info, TextureChannel::R)?);
    }
    if let Some(info) = &material.emissive_texture {
        out.emissive_map = Some(slots.core(info, TextureChannel::Rgb)?);
    }
    if let Some(emissive) = material.emissive_factor {
        out.emissive = gamma(emissive);
    }

    match material.alpha_mode.as_deref().unwrap_or("OPAQUE") {
        "BLEND" => {
            out.blend_type = BlendType::Normal;
            out.depth_write = false;
        }
        "MASK" => {
            out.blend_type = BlendType::None;
            out.alpha_test = material.alpha_cutoff.unwrap_or(0.5);
        }
        other => {
            if other != "OPAQUE" {
                log::warn!("unknown alpha mode {other}, treating as OPAQUE");
            }
            out.blend_type = BlendType::None;
        }
    }

    if material.double_sided {
        out.two_sided_lighting = true;
        out.cull = CullMode::None;
    }
    Ok(())
}

/// Material extensions with an engine mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialExtension {
    Clearcoat,
    Specular,
    Sheen,
    Transmission,
    Volume,
    Ior,
    Iridescence,
    EmissiveStrength,
    PbrSpecularGlossiness,
    Unlit,
}

impl MaterialExtension {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "KHR_materials_clearcoat" => Self::Clearcoat,
            "KHR_materials_specular" => Self::Specular,
            "KHR_materials_sheen" => Self::Sheen,
            "KHR_materials_transmission" => Self::Transmission,
            "KHR_materials_volume" => Self::Volume,
            "KHR_materials_ior" => Self::Ior,
            "KHR_materials_iridescence" => Self::Iridescence,
            "KHR_materials_emissive_strength" => Self::EmissiveStrength,
            "KHR_materials_pbrSpecularGlossiness" => Self::PbrSpecularGlossiness,
            "KHR_materials_unlit" => Self::Unlit,
            _ => return None,
        })
    }

    fn apply(
        self,
        data: &Value,
        out: &mut MaterialDescriptor,
        slots: &Slots<'_>,
    ) -> Result<(), ImportError> {
        match self {
            Self::Clearcoat => {
                let ext: ClearcoatExt = parse(data, "KHR_materials_clearcoat")?;
                let mut coat = ClearCoat {
                    factor: ext.clearcoat_factor.unwrap_or(0.0) * 0.25,
                    gloss: ext.clearcoat_roughness_factor.unwrap_or(0.0),
                    gloss_invert: true,
                    bumpiness: 1.0,
                    ..ClearCoat::default()
                };
                if let Some(info) = &ext.clearcoat_texture {
                    coat.map = Some(slots.ext(info, TextureChannel::R)?);
                }
                if let Some(info) = &ext.clearcoat_roughness_texture {
                    coat.gloss_map = Some(slots.ext(info, TextureChannel::G)?);
                }
                if let Some(info) = &ext.clearcoat_normal_texture {
                    coat.normal_map = Some(slots.ext(info, TextureChannel::Rgb)?);
                    coat.bumpiness = info.scale.unwrap_or(1.0);
                }
                out.clear_coat = Some(coat);
            }
            Self::Specular => {
                let ext: SpecularExt = parse(data, "KHR_materials_specular")?;
                out.use_metalness_specular_color = true;
                out.specular = gamma(ext.specular_color_factor.unwrap_or([1.0; 3]));
                if let Some(info) = &ext.specular_color_texture {
                    out.specular_map = Some(slots.ext(info, TextureChannel::Rgb)?);
                }
                out.specularity_factor = ext.specular_factor.unwrap_or(1.0);
                if let Some(info) = &ext.specular_texture {
                    out.specularity_factor_map = Some(slots.ext(info, TextureChannel::A)?);
                }
            }
            Self::Sheen => {
                let ext: SheenExt = parse(data, "KHR_materials_sheen")?;
                let mut sheen = Sheen {
                    color: gamma(ext.sheen_color_factor.unwrap_or([0.0; 3])),
                    gloss: ext.sheen_roughness_factor.unwrap_or(0.0),
                    gloss_invert: true,
                    ..Sheen::default()
                };
                if let Some(info) = &ext.sheen_color_texture {
                    sheen.map = Some(slots.ext(info, TextureChannel::Rgb)?);
                }
                if let Some(info) = &ext.sheen_roughness_texture {
                    sheen.gloss_map = Some(slots.ext(info, TextureChannel::A)?);
                }
                out.sheen = Some(sheen);
            }
            Self::Transmission => {
                let ext: TransmissionExt = parse(data, "KHR_materials_transmission")?;
                out.blend_type = BlendType::Normal;
                out.use_dynamic_refraction = true;
                out.refraction = ext.transmission_factor.unwrap_or(0.0);
                if let Some(info) = &ext.transmission_texture {
                    out.refraction_map = Some(slots.ext(info, TextureChannel::R)?);
                }
            }
            Self::Volume => {
                let ext: VolumeExt = parse(data, "KHR_materials_volume")?;
                let mut volume = Volume {
                    thickness: ext.thickness_factor.unwrap_or(0.0),
                    attenuation: gamma(ext.attenuation_color.unwrap_or([1.0; 3])),
                    attenuation_distance: ext.attenuation_distance,
                    ..Volume::default()
                };
                if let Some(info) = &ext.thickness_texture {
                    volume.thickness_map = Some(slots.ext(info, TextureChannel::G)?);
                }
                out.volume = Some(volume);
                out.use_dynamic_refraction = true;
            }
            Self::Ior => {
                let ext: IorExt = parse(data, "KHR_materials_ior")?;
                let ior = ext.ior.unwrap_or(1.5);
                if ior <= 0.0 {
                    return Err(ImportError::ExtensionData(format!(
                        "KHR_materials_ior: ior must be positive, got {ior}"
                    )));
                }
                out.refraction_index = 1.0 / ior;
            }
            Self::Iridescence => {
                let ext: IridescenceExt = parse(data, "KHR_materials_iridescence")?;
                let mut iridescence = Iridescence {
                    factor: ext.iridescence_factor.unwrap_or(0.0),
                    refraction_index: ext.iridescence_ior.unwrap_or(1.3),
                    thickness_min: ext.iridescence_thickness_minimum.unwrap_or(100.0),
                    thickness_max: ext.iridescence_thickness_maximum.unwrap_or(400.0),
                    ..Iridescence::default()
                };
                if let Some(info) = &ext.iridescence_texture {
                    iridescence.map = Some(slots.ext(info, TextureChannel::R)?);
                }
                if let Some(info) = &ext.iridescence_thickness_texture {
                    iridescence.thickness_map = Some(slots.ext(info, TextureChannel::G)?);
                }
                out.iridescence = Some(iridescence);
            }
            Self::EmissiveStrength => {
                let ext: EmissiveStrengthExt = parse(data, "KHR_materials_emissive_strength")?;
                out.emissive_intensity = ext.emissive_strength.unwrap_or(1.0);
            }
            Self::PbrSpecularGlossiness => {
                let ext: SpecularGlossinessExt =
                    parse(data, "KHR_materials_pbrSpecularGlossiness")?;
                out.use_metalness = false;
                let diffuse = ext.diffuse_factor.unwrap_or([1.0; 4]);
                out.diffuse = gamma(rgb(diffuse));
                out.opacity = diffuse[3];
                if let Some(info) = &ext.diffuse_texture {
                    let slot = slots.ext(info, TextureChannel::Rgb)?;
                    out.opacity_map = Some(slot.with_channel(TextureChannel::A));
                    out.diffuse_map = Some(slot);
                }
                out.specular = gamma(ext.specular_factor.unwrap_or([1.0; 3]));
                out.gloss = ext.glossiness_factor.unwrap_or(1.0);
                out.gloss_invert = false;
                if let Some(info) = &ext.specular_glossiness_texture {
                    let slot = slots.ext(info, TextureChannel::Rgb)?;
                    out.gloss_map = Some(slot.with_channel(TextureChannel::A));
                    out.specular_map = Some(slot);
                }
            }
            Self::Unlit => {
                out.use_lighting = false;
                out.emissive = out.diffuse;
                out.emissive_map = out.diffuse_map.take();
                out.diffuse = [0.0; 3];
                out.use_skybox = false;
            }
        }
        Ok(())
    }
}

fn parse<T: DeserializeOwned>(data: &Value, name: &str) -> Result<T, ImportError> {
    T::deserialize(data).map_err(|e| ImportError::ExtensionData(format!("{name}: {e}")))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClearcoatExt {
    clearcoat_factor: Option<f32>,
    clearcoat_texture: Option<TextureInfo>,
    clearcoat_roughness_factor: Option<f32>,
    clearcoat_roughness_texture: Option<TextureInfo>,
    clearcoat_normal_texture: Option<TextureInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecularExt {
    specular_factor: Option<f32>,
    specular_texture: Option<TextureInfo>,
    specular_color_factor: Option<[f32; 3]>,
    specular_color_texture: Option<TextureInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheenExt {
    sheen_color_factor: Option<[f32; 3]>,
    sheen_color_texture: Option<TextureInfo>,
    sheen_roughness_factor: Option<f32>,
    sheen_roughness_texture: Option<TextureInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransmissionExt {
    transmission_factor: Option<f32>,
    transmission_texture: Option<TextureInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeExt {
    thickness_factor: Option<f32>,
    thickness_texture: Option<TextureInfo>,
    attenuation_distance: Option<f32>,
    attenuation_color: Option<[f32; 3]>,
}

#[derive(Debug, Default, Deserialize)]
struct IorExt {
    ior: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IridescenceExt {
    iridescence_factor: Option<f32>,
    iridescence_texture: Option<TextureInfo>,
    iridescence_ior: Option<f32>,
    iridescence_thickness_minimum: Option<f32>,
    iridescence_thickness_maximum: Option<f32>,
    iridescence_thickness_texture: Option<TextureInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmissiveStrengthExt {
    emissive_strength: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecularGlossinessExt {
    diffuse_factor: Option<[f32; 4]>,
    diffuse_texture: Option<TextureInfo>,
    specular_factor: Option<[f32; 3]>,
    glossiness_factor: Option<f32>,
    specular_glossiness_texture: Option<TextureInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gltf::ErrorKind;
    use crate::material::{ImageDescriptor, TextureDescriptor};
    use rstest::rstest;

    fn textures(n: usize) -> Vec<Arc<TextureDescriptor>> {
        (0..n)
            .map(|i| {
                let image = Arc::new(ImageDescriptor {
                    name: format!("img{i}"),
                    mime_type: None,
                    data: Vec::<u8>::new().into(),
                });
                Arc::new(TextureDescriptor::new(format!("tex{i}"), image))
            })
            .collect()
    }

    fn build(json: &str, n_textures: usize) -> Result<MaterialDescriptor, ImportError> {
        let material: document::Material = serde_json::from_str(json).unwrap();
        build_material(0, &material, &textures(n_textures), &Hooks::default())
    }

    fn approx(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn defaults_without_pbr_block() {
        let m = build("{}", 0).unwrap();
        assert_eq!(m.name, "material_0");
        assert_eq!(m.diffuse, [1.0; 3]);
        assert_eq!(m.metalness, 1.0);
        assert!(m.use_lighting);
        assert_eq!(m.cull, CullMode::Back);
    }

    #[test]
    fn base_color_is_gamma_encoded_and_maps_split_channels() {
        let m = build(
            r#"{"pbrMetallicRoughness":{"baseColorFactor":[0.5,0.25,1.0,0.75],
                "baseColorTexture":{"index":1,"texCoord":1},
                "metallicFactor":0.2,"roughnessFactor":0.6,
                "metallicRoughnessTexture":{"index":0}}}"#,
            2,
        )
        .unwrap();
        assert!(approx(m.diffuse, [0.5f32.powf(1.0 / 2.2), 0.25f32.powf(1.0 / 2.2), 1.0]));
        assert_eq!(m.opacity, 0.75);
        let diffuse = m.diffuse_map.as_ref().unwrap();
        assert_eq!((diffuse.texture_index, diffuse.channel, diffuse.uv_channel), (1, TextureChannel::Rgb, 1));
        assert_eq!(m.opacity_map.as_ref().unwrap().channel, TextureChannel::A);
        assert_eq!(m.metalness_map.as_ref().unwrap().channel, TextureChannel::B);
        assert_eq!(m.gloss_map.as_ref().unwrap().channel, TextureChannel::G);
        assert_eq!((m.metalness, m.gloss, m.gloss_invert), (0.2, 0.6, true));
    }

    #[rstest]
    #[case(r#"{"alphaMode":"OPAQUE"}"#, BlendType::None, 0.0, true)]
    #[case(r#"{"alphaMode":"MASK"}"#, BlendType::None, 0.5, true)]
    #[case(r#"{"alphaMode":"MASK","alphaCutoff":0.3}"#, BlendType::None, 0.3, true)]
    #[case(r#"{"alphaMode":"BLEND"}"#, BlendType::Normal, 0.0, false)]
    fn alpha_modes(#[case] json: &str, #[case] blend: BlendType, #[case] alpha_test: f32, #[case] depth_write: bool) {
        let m = build(json, 0).unwrap();
        assert_eq!(m.blend_type, blend);
        assert_eq!(m.alpha_test, alpha_test);
        assert_eq!(m.depth_write, depth_write);
    }

    #[test]
    fn double_sided_disables_culling() {
        let m = build(r#"{"doubleSided":true}"#, 0).unwrap();
        assert!(m.two_sided_lighting);
        assert_eq!(m.cull, CullMode::None);
    }

    #[test]
    fn texture_transform_is_converted() {
        let m = build(
            r#"{"normalTexture":{"index":0,"scale":0.5,"extensions":{"KHR_texture_transform":
                {"offset":[0.1,0.2],"scale":[2.0,0.5],"rotation":1.5707964}}}}"#,
            1,
        )
        .unwrap();
        assert_eq!(m.bumpiness, 0.5);
        let t = m.normal_map.unwrap().transform.unwrap();
        assert_eq!(t.tiling, [2.0, 0.5]);
        assert!((t.offset[1] - 0.3).abs() < 1e-6);
        assert!((t.rotation_degrees + 90.0).abs() < 1e-3);
    }

    #[test]
    fn unlit_moves_diffuse_to_emissive() {
        let m = build(
            r#"{"pbrMetallicRoughness":{"baseColorFactor":[1.0,0.0,0.0,1.0],"baseColorTexture":{"index":0}},
                "extensions":{"KHR_materials_unlit":{}}}"#,
            1,
        )
        .unwrap();
        assert!(!m.use_lighting);
        assert!(!m.use_skybox);
        assert_eq!(m.emissive, [1.0, 0.0, 0.0]);
        assert_eq!(m.diffuse, [0.0; 3]);
        assert!(m.diffuse_map.is_none());
        assert_eq!(m.emissive_map.unwrap().texture_index, 0);
    }

    #[test]
    fn clearcoat_transmission_and_ior() {
        let m = build(
            r#"{"extensions":{
                "KHR_materials_clearcoat":{"clearcoatFactor":1.0,"clearcoatRoughnessFactor":0.4,
                    "clearcoatNormalTexture":{"index":0,"scale":2.0}},
                "KHR_materials_transmission":{"transmissionFactor":0.8},
                "KHR_materials_ior":{"ior":2.0}}}"#,
            1,
        )
        .unwrap();
        let coat = m.clear_coat.unwrap();
        assert_eq!((coat.factor, coat.gloss, coat.bumpiness), (0.25, 0.4, 2.0));
        assert!(coat.gloss_invert);
        assert_eq!(m.blend_type, BlendType::Normal);
        assert!(m.use_dynamic_refraction);
        assert_eq!(m.refraction, 0.8);
        assert_eq!(m.refraction_index, 0.5);
    }

    #[test]
    fn specular_glossiness_switches_workflow() {
        let m = build(
            r#"{"extensions":{"KHR_materials_pbrSpecularGlossiness":{
                "glossinessFactor":0.3,"specularGlossinessTexture":{"index":0}}}}"#,
            1,
        )
        .unwrap();
        assert!(!m.use_metalness);
        assert_eq!((m.gloss, m.gloss_invert), (0.3, false));
        assert_eq!(m.specular_map.unwrap().channel, TextureChannel::Rgb);
        assert_eq!(m.gloss_map.unwrap().channel, TextureChannel::A);
    }

    #[test]
    fn iridescence_and_sheen_defaults() {
        let m = build(
            r#"{"extensions":{"KHR_materials_iridescence":{},"KHR_materials_sheen":{},
                "KHR_materials_emissive_strength":{"emissiveStrength":5.0}}}"#,
            0,
        )
        .unwrap();
        let iri = m.iridescence.unwrap();
        assert_eq!((iri.refraction_index, iri.thickness_min, iri.thickness_max), (1.3, 100.0, 400.0));
        let sheen = m.sheen.unwrap();
        assert_eq!(sheen.color, [0.0; 3]);
        assert!(sheen.gloss_invert);
        assert_eq!(m.emissive_intensity, 5.0);
    }

    #[test]
    fn unknown_extensions_are_ignored() {
        assert!(build(r#"{"extensions":{"VENDOR_magic":{"x":1}}}"#, 0).is_ok());
    }

    #[test]
    fn missing_textures_fail_by_origin() {
        let err = build(r#"{"occlusionTexture":{"index":3}}"#, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        let err = build(
            r#"{"extensions":{"KHR_materials_sheen":{"sheenColorTexture":{"index":3}}}}"#,
            1,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExtensionData);
        let err = build(r#"{"extensions":{"KHR_materials_ior":{"ior":"glass"}}}"#, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExtensionData);
    }
}
