//! Keyframe track data.
//!
//! Tracks only hold data; playback and blending happen elsewhere.

/// Keyframe interpolation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    /// Hold the previous key.
    Step,
    /// Linear (slerp for rotations).
    #[default]
    Linear,
    /// Hermite spline; each key stores in-tangent, value, out-tangent.
    CubicSpline,
}

impl Interpolation {
    /// Map a glTF sampler `interpolation` string. Unknown values fall back
    /// to linear.
    pub fn from_gltf(name: &str) -> Self {
        match name {
            "STEP" => Self::Step,
            "CUBICSPLINE" => Self::CubicSpline,
            _ => Self::Linear,
        }
    }
}

/// A pool of keyframe times or values.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimData {
    /// Floats per key.
    pub components: u32,
    /// Flat float data, `components` per key.
    pub data: Vec<f32>,
}

impl AnimData {
    /// Number of keys.
    pub fn key_count(&self) -> usize {
        if self.components == 0 {
            0
        } else {
            self.data.len() / self.components as usize
        }
    }
}

/// Property a curve drives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnimCurvePath {
    /// Node names from the hierarchy root down to the target node.
    pub entity_path: Vec<String>,
    /// Driven property: `localPosition`, `localRotation`, `localScale` or
    /// `weight.<target name>`.
    pub property_path: String,
}

/// One animated channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimCurve {
    /// Driven properties.
    pub paths: Vec<AnimCurvePath>,
    /// Index into [`AnimationTrack::inputs`].
    pub input: usize,
    /// Index into [`AnimationTrack::outputs`].
    ///
    /// Pools read straight from accessors come first. Per-target morph
    /// weight pools split out of a `weights` channel are appended after
    /// them, so their indices start at the accessor pool count rather than
    /// being negative.
    pub output: usize,
    /// Interpolation mode.
    pub interpolation: Interpolation,
}

/// Animation clip data.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTrack {
    /// Clip name.
    pub name: String,
    /// Largest final key time across inputs, in seconds.
    pub duration: f32,
    /// Keyframe time pools.
    pub inputs: Vec<AnimData>,
    /// Keyframe value pools.
    pub outputs: Vec<AnimData>,
    /// Channels.
    pub curves: Vec<AnimCurve>,
}
