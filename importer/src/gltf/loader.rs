//! Import orchestration.
//!
//! Stages run in dependency order: buffers, buffer views, images, textures,
//! materials. Meshes are queued next so Draco decodes run on the worker pool
//! while nodes, scenes, skins, cameras, lights and animations are built on
//! the calling thread. Pending decodes are awaited last, then skins are
//! linked to meshes and the sink is fed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::compute::try_join_all;
use crate::fetch::ResourceFetcher;
use crate::material::{ImageDescriptor, MaterialDescriptor, TextureDescriptor};
use crate::mesh::{MeshDescriptor, VertexBufferDescriptor};
use crate::scene::{CameraDescriptor, LightDescriptor, Node, NodeId, SkinDescriptor};
use crate::sink::ResourceSink;

use super::accessor::AccessorReader;
use super::animation::build_animation;
use super::buffer::{BufferSources, BufferViewData, materialize_view, resolve_buffer};
use super::camera::build_camera;
use super::document::{Document, NodeLight, extension};
use super::draco::DracoWorkerPool;
use super::error::ImportError;
use super::light::build_light;
use super::material::build_material;
use super::mesh::{MeshContext, PendingDraco, PrimitiveBuild, build_mesh, finish_draco};
use super::node::{build_node, build_scenes, link_nodes};
use super::options::{DeviceCaps, ImportOptions};
use super::skin::{SkinCache, build_skin};
use super::texture::{ImageSources, resolve_image, resolve_texture};
use super::types::ResourceBundle;
use super::vertex::VertexBufferCache;

/// Per-mesh primitive slots; compressed primitives are filled in later.
type MeshSlots = Vec<Vec<Option<MeshDescriptor>>>;

/// Shared state for one import.
pub(crate) struct ImportContext<'a> {
    pub document: Arc<Document>,
    pub options: &'a ImportOptions,
    pub device: DeviceCaps,
    pub draco: Option<&'a DracoWorkerPool>,
    pub fetcher: &'a dyn ResourceFetcher,
    pub base_url: &'a str,
}

impl ImportContext<'_> {
    /// Run every stage and assemble the bundle.
    pub(crate) async fn run(
        self,
        binary_chunk: Option<Arc<[u8]>>,
        sink: Option<&dyn ResourceSink>,
    ) -> Result<ResourceBundle, ImportError> {
        let document = Arc::clone(&self.document);
        let hooks = &self.options.hooks;
        if let Some(pre) = &hooks.global.preprocess {
            pre(&document);
        }

        let buffers = self.load_buffers(binary_chunk).await?;
        log::debug!("resolved {} buffers", buffers.len());
        let views = self.load_views(&buffers)?;
        let images = self.load_images(&views).await?;
        let textures = self.load_textures(&images).await?;
        log::debug!("resolved {} images, {} textures", images.len(), textures.len());
        let materials = self.load_materials(&textures)?;

        let reader = AccessorReader::new(&document.accessors, &views);
        let variants = document.variant_names()?;
        let mesh_ctx = MeshContext {
            document: &document,
            reader,
            views: &views,
            device: self.device,
            flip_v: self.options.flips_v(document.asset.generator.as_deref()),
            variant_names: &variants,
            draco: self.draco,
        };
        let (mut slots, pending) = self.queue_meshes(&mesh_ctx)?;

        let mut nodes = self.load_nodes()?;
        link_nodes(&document, &mut nodes)?;
        let scenes = build_scenes(&document, &mut nodes)?;
        let skins = self.load_skins(&nodes, &reader)?;
        let cameras = self.load_cameras()?;
        let lights = self.load_lights()?;
        let animations = document
            .animations
            .iter()
            .enumerate()
            .map(|(i, a)| build_animation(i, a, &document, &nodes, &reader, &hooks.animation))
            .collect::<Result<Vec<_>, _>>()?;

        if !pending.is_empty() {
            log::debug!("awaiting {} draco decodes", pending.len());
        }
        let ctx = &mesh_ctx;
        let decoded = try_join_all(pending.into_iter().map(|p| {
            let (mesh, primitive) = p.slot();
            async move { Ok::<_, ImportError>((mesh, primitive, finish_draco(ctx, p).await?)) }
        }))
        .await?;
        for (mesh, primitive, descriptor) in decoded {
            slots[mesh][primitive] = Some(descriptor);
        }
        let mut meshes: Vec<Vec<MeshDescriptor>> = slots
            .into_iter()
            .map(|primitives| primitives.into_iter().flatten().collect())
            .collect();

        link_skins(&document, &nodes, &skins, &mut meshes)?;

        let mut bundle = ResourceBundle {
            document: Arc::clone(&document),
            nodes,
            scenes,
            default_scene: document.scene,
            materials,
            meshes,
            skins,
            animations,
            textures,
            images,
            cameras,
            lights,
            variants,
        };

        if let Some(sink) = sink {
            feed_sink(&bundle, sink);
        }
        if let Some(post) = &hooks.global.postprocess {
            post(&document, &mut bundle);
        }
        Ok(bundle)
    }

    async fn load_buffers(
        &self,
        binary_chunk: Option<Arc<[u8]>>,
    ) -> Result<Vec<Arc<[u8]>>, ImportError> {
        let sources = BufferSources {
            base_url: self.base_url,
            binary_chunk,
            fetcher: self.fetcher,
        };
        let hooks = &self.options.hooks.buffer;
        try_join_all(
            self.document
                .buffers
                .iter()
                .enumerate()
                .map(|(i, buffer)| resolve_buffer(i, buffer, &sources, hooks)),
        )
        .await
    }

    fn load_views(&self, buffers: &[Arc<[u8]>]) -> Result<Vec<BufferViewData>, ImportError> {
        let hooks = &self.options.hooks.buffer_view;
        self.document
            .buffer_views
            .iter()
            .enumerate()
            .map(|(i, view)| materialize_view(i, view, buffers, hooks))
            .collect()
    }

    async fn load_images(
        &self,
        views: &[BufferViewData],
    ) -> Result<Vec<Arc<ImageDescriptor>>, ImportError> {
        let sources = ImageSources {
            base_url: self.base_url,
            views,
            fetcher: self.fetcher,
        };
        let hooks = &self.options.hooks.image;
        let images = try_join_all(
            self.document
                .images
                .iter()
                .enumerate()
                .map(|(i, image)| resolve_image(i, image, &sources, hooks)),
        )
        .await?;
        Ok(images.into_iter().map(Arc::new).collect())
    }

    async fn load_textures(
        &self,
        images: &[Arc<ImageDescriptor>],
    ) -> Result<Vec<Arc<TextureDescriptor>>, ImportError> {
        let hooks = &self.options.hooks.texture;
        let document = &self.document;
        let textures = try_join_all(
            document
                .textures
                .iter()
                .enumerate()
                .map(|(i, texture)| resolve_texture(i, texture, document, images, hooks)),
        )
        .await?;
        Ok(textures.into_iter().map(Arc::new).collect())
    }

    fn load_materials(
        &self,
        textures: &[Arc<TextureDescriptor>],
    ) -> Result<Vec<MaterialDescriptor>, ImportError> {
        let hooks = &self.options.hooks.material;
        self.document
            .materials
            .iter()
            .enumerate()
            .map(|(i, material)| build_material(i, material, textures, hooks))
            .collect()
    }

    /// Build plain primitives and submit compressed ones. Draco slots stay
    /// `None` until their decode finishes.
    fn queue_meshes(
        &self,
        ctx: &MeshContext<'_>,
    ) -> Result<(MeshSlots, Vec<PendingDraco>), ImportError> {
        let mut cache = VertexBufferCache::new();
        let mut slots = Vec::with_capacity(self.document.meshes.len());
        let mut pending = Vec::new();
        for index in 0..self.document.meshes.len() {
            let primitives = build_mesh(ctx, index, &mut cache)?
                .into_iter()
                .map(|build| match build {
                    PrimitiveBuild::Ready(mesh) => Some(mesh),
                    PrimitiveBuild::Draco(job) => {
                        pending.push(job);
                        None
                    }
                })
                .collect();
            slots.push(primitives);
        }
        log::debug!(
            "built {} meshes with {} shared vertex buffers",
            slots.len(),
            cache.len()
        );
        Ok((slots, pending))
    }

    fn load_nodes(&self) -> Result<Vec<Node>, ImportError> {
        let hooks = &self.options.hooks.node;
        self.document
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| build_node(i, node, hooks))
            .collect()
    }

    fn load_skins(
        &self,
        nodes: &[Node],
        reader: &AccessorReader<'_>,
    ) -> Result<Vec<Arc<SkinDescriptor>>, ImportError> {
        let mut cache = SkinCache::new();
        self.document
            .skins
            .iter()
            .enumerate()
            .map(|(i, skin)| build_skin(i, skin, nodes, reader, &mut cache))
            .collect()
    }

    fn load_cameras(&self) -> Result<HashMap<NodeId, CameraDescriptor>, ImportError> {
        let hooks = &self.options.hooks.camera;
        let mut cameras = HashMap::new();
        for (index, node) in self.document.nodes.iter().enumerate() {
            let Some(camera_index) = node.camera else {
                continue;
            };
            let camera = self.document.cameras.get(camera_index).ok_or_else(|| {
                ImportError::Format(format!(
                    "node {index} references missing camera {camera_index}"
                ))
            })?;
            cameras.insert(NodeId(index), build_camera(camera_index, camera, hooks)?);
        }
        Ok(cameras)
    }

    fn load_lights(&self) -> Result<HashMap<NodeId, LightDescriptor>, ImportError> {
        let definitions = self.document.lights()?;
        let hooks = &self.options.hooks.light;
        let mut lights = HashMap::new();
        for (index, node) in self.document.nodes.iter().enumerate() {
            let Some(NodeLight { light }) =
                extension::<NodeLight>(&node.extensions, "KHR_lights_punctual")?
            else {
                continue;
            };
            let definition = definitions.get(light).ok_or_else(|| {
                ImportError::ExtensionData(format!(
                    "node {index} references missing light {light}"
                ))
            })?;
            lights.insert(NodeId(index), build_light(light, definition, hooks)?);
        }
        Ok(lights)
    }
}

/// Assign each node's skin to every primitive of the node's mesh.
fn link_skins(
    document: &Document,
    nodes: &[Node],
    skins: &[Arc<SkinDescriptor>],
    meshes: &mut [Vec<MeshDescriptor>],
) -> Result<(), ImportError> {
    for (index, node) in nodes.iter().take(document.nodes.len()).enumerate() {
        let Some(mesh) = node.mesh else {
            continue;
        };
        let primitives = meshes.get_mut(mesh).ok_or_else(|| {
            ImportError::Format(format!("node {index} references missing mesh {mesh}"))
        })?;
        let Some(skin) = node.skin else {
            continue;
        };
        let skin = skins.get(skin).ok_or_else(|| {
            ImportError::Format(format!("node {index} references missing skin {skin}"))
        })?;
        for primitive in primitives {
            primitive.skin = Some(Arc::clone(skin));
        }
    }
    Ok(())
}

fn feed_sink(bundle: &ResourceBundle, sink: &dyn ResourceSink) {
    let mut seen: HashSet<*const VertexBufferDescriptor> = HashSet::new();
    for primitive in bundle.meshes.iter().flatten() {
        if seen.insert(Arc::as_ptr(&primitive.vertex_buffer)) {
            sink.vertex_buffer(&primitive.vertex_buffer);
        }
        if let Some(index_buffer) = &primitive.index_buffer {
            sink.index_buffer(index_buffer);
        }
    }
    for texture in &bundle.textures {
        sink.texture(texture);
    }
}
