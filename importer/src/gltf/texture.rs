//! Image and texture resolution.

use std::sync::Arc;

use crate::fetch::{ResourceFetcher, uri};
use crate::material::{
    AddressMode, FilterMode, ImageDescriptor, SamplerDescriptor, TextureDescriptor,
};

use super::buffer::{BufferSlice, BufferViewData};
use super::document::{self, TextureSourceExt, extension};
use super::error::ImportError;
use super::options::AsyncHooks;

/// Texture extensions whose `source` overrides `texture.source`, in
/// preference order.
const SOURCE_EXTENSIONS: [&str; 3] = ["KHR_texture_basisu", "EXT_texture_webp", "EXT_texture_avif"];

/// Inputs shared by all image resolutions of one import.
pub(crate) struct ImageSources<'a> {
    pub base_url: &'a str,
    pub views: &'a [BufferViewData],
    pub fetcher: &'a dyn ResourceFetcher,
}

/// Resolve the encoded bytes of one image.
pub(crate) async fn resolve_image(
    index: usize,
    image: &document::Image,
    sources: &ImageSources<'_>,
    hooks: &AsyncHooks<document::Image, ImageDescriptor>,
) -> Result<ImageDescriptor, ImportError> {
    hooks
        .run(image, async {
            let name = image
                .name
                .clone()
                .or_else(|| image.uri.clone().filter(|u| !uri::is_data_uri(u)))
                .unwrap_or_else(|| format!("image_{index}"));

            if let Some(view_index) = image.buffer_view {
                let view = sources.views.get(view_index).ok_or_else(|| {
                    ImportError::Format(format!(
                        "image {index} references missing buffer view {view_index}"
                    ))
                })?;
                return Ok::<_, ImportError>(ImageDescriptor {
                    name,
                    mime_type: image.mime_type.clone(),
                    data: view.data.clone(),
                });
            }

            let Some(image_uri) = image.uri.as_deref() else {
                return Err(ImportError::Format(format!(
                    "image {index} has neither a uri nor a buffer view"
                )));
            };

            if uri::is_data_uri(image_uri) {
                let (mime, bytes) = uri::decode_data_uri(image_uri).ok_or_else(|| {
                    ImportError::Format(format!("image {index} has a malformed data URI"))
                })?;
                let mime_type = image.mime_type.clone().or((!mime.is_empty()).then_some(mime));
                return Ok(ImageDescriptor {
                    name,
                    mime_type,
                    data: BufferSlice::from(bytes),
                });
            }

            let resolved = uri::resolve(sources.base_url, image_uri);
            log::trace!("fetching image {index} from {resolved}");
            let bytes = sources
                .fetcher
                .fetch(&resolved)
                .await
                .map_err(|e| ImportError::fetch(&resolved, e))?;
            Ok(ImageDescriptor {
                name,
                mime_type: image.mime_type.clone().or_else(|| mime_from_path(image_uri)),
                data: BufferSlice::from(bytes),
            })
        })
        .await
}

fn mime_from_path(path: &str) -> Option<String> {
    let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ktx2" => "image/ktx2",
        "basis" => "image/basis",
        _ => return None,
    };
    Some(mime.to_owned())
}

/// Index of the image a texture samples. Extension sources win over the
/// core `source` field.
pub(crate) fn texture_source(index: usize, texture: &document::Texture) -> Result<usize, ImportError> {
    for name in SOURCE_EXTENSIONS {
        if let Some(TextureSourceExt { source: Some(source) }) =
            extension::<TextureSourceExt>(&texture.extensions, name)?
        {
            return Ok(source);
        }
    }
    texture
        .source
        .ok_or_else(|| ImportError::Format(format!("texture {index} has no image source")))
}

/// Build one texture over its already resolved image.
pub(crate) async fn resolve_texture(
    index: usize,
    texture: &document::Texture,
    document: &document::Document,
    images: &[Arc<ImageDescriptor>],
    hooks: &AsyncHooks<document::Texture, TextureDescriptor>,
) -> Result<TextureDescriptor, ImportError> {
    hooks
        .run(texture, async {
            let source = texture_source(index, texture)?;
            let image = images.get(source).ok_or_else(|| {
                ImportError::Format(format!("texture {index} references missing image {source}"))
            })?;
            let sampler = match texture.sampler {
                Some(s) => {
                    let sampler = document.samplers.get(s).ok_or_else(|| {
                        ImportError::Format(format!(
                            "texture {index} references missing sampler {s}"
                        ))
                    })?;
                    sampler_descriptor(sampler)
                }
                None => SamplerDescriptor::default(),
            };
            let name = texture.name.clone().unwrap_or_else(|| image.name.clone());
            Ok::<_, ImportError>(TextureDescriptor::new(name, Arc::clone(image)).with_sampler(sampler))
        })
        .await
}

fn sampler_descriptor(sampler: &document::Sampler) -> SamplerDescriptor {
    SamplerDescriptor {
        min_filter: FilterMode::from_gltf(sampler.min_filter, FilterMode::LinearMipmapLinear),
        mag_filter: FilterMode::from_gltf(sampler.mag_filter, FilterMode::Linear),
        address_u: AddressMode::from_gltf(sampler.wrap_s),
        address_v: AddressMode::from_gltf(sampler.wrap_t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{MemoryFetcher, NoFetcher};

    fn texture(json: &str) -> document::Texture {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extension_source_wins() {
        let t = texture(r#"{"source":0,"extensions":{"EXT_texture_webp":{"source":2}}}"#);
        assert_eq!(texture_source(0, &t).unwrap(), 2);
        let t = texture(r#"{"source":1,"extensions":{"VENDOR_other":{"source":5}}}"#);
        assert_eq!(texture_source(0, &t).unwrap(), 1);
        assert!(texture_source(0, &texture("{}")).is_err());
    }

    #[test]
    fn image_from_buffer_view_shares_bytes() {
        let views = vec![BufferViewData {
            data: BufferSlice::from(vec![0x89, b'P', b'N', b'G']),
            byte_stride: None,
        }];
        let sources = ImageSources { base_url: "", views: &views, fetcher: &NoFetcher };
        let image = document::Image {
            buffer_view: Some(0),
            mime_type: Some("image/png".into()),
            ..Default::default()
        };
        let out = pollster::block_on(resolve_image(3, &image, &sources, &AsyncHooks::default())).unwrap();
        assert_eq!(out.name, "image_3");
        assert_eq!(&*out.data, &[0x89, b'P', b'N', b'G']);
        assert!(Arc::ptr_eq(out.data.buffer(), views[0].data.buffer()));
    }

    #[test]
    fn external_image_guesses_mime() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("tex/albedo.jpg", vec![1, 2]);
        let sources = ImageSources { base_url: "tex/scene.gltf", views: &[], fetcher: &fetcher };
        let image = document::Image { uri: Some("albedo.jpg".into()), ..Default::default() };
        let out = pollster::block_on(resolve_image(0, &image, &sources, &AsyncHooks::default())).unwrap();
        assert_eq!(out.name, "albedo.jpg");
        assert_eq!(out.mime_type.as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn sampler_defaults_and_codes() {
        let s = sampler_descriptor(&document::Sampler {
            mag_filter: Some(9728),
            min_filter: None,
            wrap_s: Some(33071),
            wrap_t: Some(33648),
        });
        assert_eq!(s.mag_filter, FilterMode::Nearest);
        assert_eq!(s.min_filter, FilterMode::LinearMipmapLinear);
        assert_eq!(s.address_u, AddressMode::ClampToEdge);
        assert_eq!(s.address_v, AddressMode::MirrorRepeat);
    }
}
