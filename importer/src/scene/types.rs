//! Scene graph data types.
//!
//! All types use plain arrays (`[f32; 3]`, `[f32; 4]`, etc.) so consumers
//! can convert into whatever math library their renderer uses.

/// Node transform decomposed into translation, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    /// Translation [x, y, z].
    pub translation: [f32; 3],
    /// Rotation quaternion [x, y, z, w].
    pub rotation: [f32; 4],
    /// Scale [x, y, z].
    pub scale: [f32; 3],
}

impl NodeTransform {
    /// Identity transform: no translation, identity rotation, unit scale.
    pub const IDENTITY: Self = Self {
        translation: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0, 1.0, 1.0],
    };

    /// Returns this transform with a different translation.
    #[must_use]
    pub const fn with_translation(mut self, translation: [f32; 3]) -> Self {
        self.translation = translation;
        self
    }

    /// Returns this transform with a different rotation.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: [f32; 4]) -> Self {
        self.rotation = rotation;
        self
    }

    /// Returns this transform with a different scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Index of a node in [`ResourceBundle::nodes`](crate::gltf::ResourceBundle::nodes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A transform node.
///
/// Nodes live in a flat arena and link to each other by [`NodeId`]. The
/// first `document.nodes.len()` entries mirror glTF node indices; synthetic
/// scene roots are appended after them.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node name, unique among its siblings.
    pub name: String,
    /// Local transform relative to parent.
    pub transform: NodeTransform,
    /// Parent node, if any.
    pub parent: Option<NodeId>,
    /// Children in declaration order.
    pub children: Vec<NodeId>,
    /// Index into `ResourceBundle::meshes`, if this node renders a mesh.
    pub mesh: Option<usize>,
    /// Index into the document skins, if the mesh is skinned.
    pub skin: Option<usize>,
}

impl Node {
    /// Creates a new node with identity transform and no attachments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: NodeTransform::IDENTITY,
            parent: None,
            children: Vec::new(),
            mesh: None,
            skin: None,
        }
    }

    /// Set the local transform.
    #[must_use]
    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }
}

/// Inverse bind pose of a skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinDescriptor {
    /// Bone names, one per joint, in joint order.
    pub bone_names: Vec<String>,
    /// Inverse bind matrices (column-major 4x4, one per joint).
    pub inverse_bind_matrices: Vec<[f32; 16]>,
}

impl SkinDescriptor {
    /// Key shared by skins with the same ordered bone list.
    pub fn signature(bone_names: &[String]) -> String {
        bone_names.join("#")
    }
}

/// Camera projection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    /// Perspective projection.
    #[default]
    Perspective,
    /// Orthographic projection.
    Orthographic,
}

/// Camera component data attached to a node.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraDescriptor {
    /// Projection type.
    pub projection: Projection,
    /// Vertical field of view in degrees (perspective).
    pub fov_degrees: f32,
    /// Half of the vertical view size (orthographic).
    pub ortho_height: f32,
    /// Fixed aspect ratio; `None` follows the render target.
    pub aspect_ratio: Option<f32>,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance; `None` for an infinite perspective.
    pub far: Option<f32>,
}

/// Punctual light type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Infinitely distant light.
    Directional,
    /// Omnidirectional point light.
    Point,
    /// Cone light.
    Spot,
}

/// Light component data attached to a node.
#[derive(Debug, Clone, PartialEq)]
pub struct LightDescriptor {
    /// Light type.
    pub kind: LightKind,
    /// Linear RGB color.
    pub color: [f32; 3],
    /// Unitless intensity, clamped to [0, 2].
    pub intensity: f32,
    /// Physical intensity (`intensity` times the photometric conversion).
    pub luminance: Option<f32>,
    /// Attenuation range.
    pub range: f32,
    /// Inner cone angle in degrees (spot only).
    pub inner_cone_degrees: f32,
    /// Outer cone angle in degrees (spot only).
    pub outer_cone_degrees: f32,
}
