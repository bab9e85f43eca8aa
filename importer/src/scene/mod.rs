//! Scene graph, skin, camera, light and animation descriptors.

mod animation;
mod types;

pub use animation::{AnimCurve, AnimCurvePath, AnimData, AnimationTrack, Interpolation};
pub use types::{
    CameraDescriptor, LightDescriptor, LightKind, Node, NodeId, NodeTransform, Projection,
    SkinDescriptor,
};
