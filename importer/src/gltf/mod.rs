//! glTF 2.0 importer.
//!
//! Turns a `.glb` container or bare `.gltf` JSON into a [`ResourceBundle`]
//! of CPU-side descriptors: interleaved vertex buffers, index buffers,
//! materials, textures, skins, animation tracks, cameras, lights and a node
//! hierarchy. No GPU objects are created; finished buffers and textures can
//! be handed to a [`ResourceSink`](crate::sink::ResourceSink).
//!
//! # Hooks
//!
//! Every entity kind has a hook set ([`Hooks`] or [`AsyncHooks`]):
//! `preprocess` sees the raw glTF entity, `process` may replace the default
//! build entirely, and `postprocess` may edit the result. [`GlobalHooks`]
//! wrap the whole import.
//!
//! # Extensions
//!
//! Recognized: `KHR_materials_*` (see [`MaterialExtension`]),
//! `KHR_texture_transform`, `KHR_texture_basisu`, `EXT_texture_webp`,
//! `EXT_texture_avif`, `KHR_lights_punctual`, `KHR_materials_variants` and
//! `KHR_draco_mesh_compression`. Draco decoding needs a
//! [`DracoWorkerPool`] wrapping a [`DracoDecoder`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use redlilium_importer::fetch::MemoryFetcher;
//! use redlilium_importer::gltf::GltfImporter;
//!
//! let bytes = std::fs::read("model.glb")?;
//! let importer = GltfImporter::new().with_fetcher(Arc::new(MemoryFetcher::new()));
//! let bundle = pollster::block_on(importer.import("model.glb", "", &bytes))?;
//! println!("meshes: {}", bundle.meshes.len());
//! ```

mod accessor;
mod animation;
mod buffer;
mod camera;
mod container;
pub mod document;
mod draco;
mod error;
mod light;
mod loader;
mod material;
mod mesh;
mod node;
mod options;
mod skin;
#[cfg(test)]
mod tests;
mod texture;
mod types;
mod vertex;

pub use accessor::{AccessorData, AccessorReader};
pub use animation::fix_quaternion_continuity;
pub use buffer::{BufferSlice, BufferViewData};
pub use container::{Container, parse_document, split};
pub use draco::{DracoAttribute, DracoDecoder, DracoMesh, DracoRequest, DracoWorkerPool};
pub use error::{ErrorKind, ImportError};
pub use light::photometric_conversion;
pub use material::MaterialExtension;
pub use options::{
    AsyncHooks, DeviceCaps, GlobalHooks, HookFuture, Hooks, ImportHooks, ImportOptions,
};
pub use types::ResourceBundle;

use std::sync::Arc;

use crate::fetch::{NoFetcher, ResourceFetcher};
use crate::sink::ResourceSink;

/// Entry point for importing glTF assets.
///
/// An importer is configured once and can run any number of imports,
/// concurrently if the caller wishes. Each import is independent: nothing
/// is cached across calls.
pub struct GltfImporter {
    fetcher: Arc<dyn ResourceFetcher>,
    options: ImportOptions,
    device: DeviceCaps,
    draco: Option<Arc<DracoWorkerPool>>,
    sink: Option<Arc<dyn ResourceSink>>,
}

impl Default for GltfImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl GltfImporter {
    /// Importer for self-contained assets: external URIs fail to fetch.
    pub fn new() -> Self {
        Self {
            fetcher: Arc::new(NoFetcher),
            options: ImportOptions::default(),
            device: DeviceCaps::default(),
            draco: None,
            sink: None,
        }
    }

    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the index formats the target device accepts.
    #[must_use]
    pub fn with_device(mut self, device: DeviceCaps) -> Self {
        self.device = device;
        self
    }

    /// Decode Draco-compressed primitives on this pool.
    #[must_use]
    pub fn with_draco(mut self, pool: Arc<DracoWorkerPool>) -> Self {
        self.draco = Some(pool);
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ResourceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Import one asset.
    ///
    /// `filename` decides GLB vs JSON together with the GLB magic, and
    /// `base_url` is what relative buffer and image URIs resolve against.
    /// Any failure aborts the whole import.
    pub async fn import(
        &self,
        filename: &str,
        base_url: &str,
        bytes: &[u8],
    ) -> Result<ResourceBundle, ImportError> {
        let container = container::split(filename, bytes)?;
        let document = Arc::new(container::parse_document(container.json)?);
        log::debug!(
            "importing '{filename}': {} nodes, {} meshes, {} materials",
            document.nodes.len(),
            document.meshes.len(),
            document.materials.len()
        );

        let draco = if self.options.decode_draco {
            self.draco.as_deref()
        } else {
            None
        };
        let context = loader::ImportContext {
            document,
            options: &self.options,
            device: self.device,
            draco,
            fetcher: self.fetcher.as_ref(),
            base_url,
        };
        let bundle = context
            .run(container.binary.map(Arc::from), self.sink.as_deref())
            .await?;
        log::info!(
            "imported '{filename}': {} meshes, {} textures, {} animations",
            bundle.meshes.len(),
            bundle.textures.len(),
            bundle.animations.len()
        );
        Ok(bundle)
    }
}
