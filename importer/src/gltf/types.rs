//! Data types for import results.

use std::collections::HashMap;
use std::sync::Arc;

use crate::material::{ImageDescriptor, MaterialDescriptor, TextureDescriptor};
use crate::mesh::MeshDescriptor;
use crate::scene::{
    AnimationTrack, CameraDescriptor, LightDescriptor, Node, NodeId, SkinDescriptor,
};

use super::document::Document;

/// Everything produced by one import.
///
/// The bundle is self-contained apart from `document`, which is kept for
/// callers that want to read extras or extensions the importer ignores.
#[derive(Debug)]
pub struct ResourceBundle {
    /// The parsed glTF document.
    pub document: Arc<Document>,
    /// Node arena. Entries `0..document.nodes.len()` mirror glTF node
    /// indices; synthetic scene roots follow.
    pub nodes: Vec<Node>,
    /// Root node of each scene, in scene order.
    pub scenes: Vec<NodeId>,
    /// Index into `scenes` of the default scene, if declared.
    pub default_scene: Option<usize>,
    /// Materials, indexed like `document.materials`.
    pub materials: Vec<MaterialDescriptor>,
    /// One entry per glTF mesh, each holding one descriptor per primitive.
    pub meshes: Vec<Vec<MeshDescriptor>>,
    /// Skins, indexed like `document.skins`. Skins with identical bone
    /// lists share one instance.
    pub skins: Vec<Arc<SkinDescriptor>>,
    /// Animation tracks, indexed like `document.animations`.
    pub animations: Vec<AnimationTrack>,
    /// Textures, indexed like `document.textures`.
    pub textures: Vec<Arc<TextureDescriptor>>,
    /// Images, indexed like `document.images`.
    pub images: Vec<Arc<ImageDescriptor>>,
    /// Camera attached to each node that references one.
    pub cameras: HashMap<NodeId, CameraDescriptor>,
    /// Light attached to each node that references one.
    pub lights: HashMap<NodeId, LightDescriptor>,
    /// Material variant names (`KHR_materials_variants`).
    pub variants: Vec<String>,
}

impl ResourceBundle {
    /// Root node of the default scene, or of the first scene.
    pub fn default_root(&self) -> Option<NodeId> {
        self.scenes
            .get(self.default_scene.unwrap_or(0))
            .copied()
    }

    /// Primitives of the mesh a node renders, if any.
    pub fn node_meshes(&self, node: NodeId) -> &[MeshDescriptor] {
        self.nodes
            .get(node.0)
            .and_then(|n| n.mesh)
            .and_then(|m| self.meshes.get(m))
            .map_or(&[], Vec::as_slice)
    }

    /// Find a node by name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }
}
