//! Math type aliases and helpers used while decoding glTF data.
//!
//! Output descriptors use plain arrays (`[f32; 3]`, `[f32; 4]`) so consumers
//! are free to pick their own math library; nalgebra is only used internally
//! for decomposition and normal generation.

pub use nalgebra;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Quaternion (f32). Stored as `[x, y, z, w]` in memory.
pub type Quat = nalgebra::Quaternion<f32>;

/// Radians to degrees multiplier.
pub const RAD_TO_DEG: f32 = 180.0 / std::f32::consts::PI;

/// Identity matrix as a column-major array.
#[rustfmt::skip]
pub const IDENTITY_MAT4: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];

/// Axis-aligned bounding box stored as center and half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Box center.
    pub center: [f32; 3],
    /// Half of the box size along each axis.
    pub half_extents: [f32; 3],
}

impl BoundingBox {
    /// Build a box from its minimum and maximum corners.
    pub fn from_min_max(min: [f32; 3], max: [f32; 3]) -> Self {
        Self {
            center: [
                (min[0] + max[0]) * 0.5,
                (min[1] + max[1]) * 0.5,
                (min[2] + max[2]) * 0.5,
            ],
            half_extents: [
                (max[0] - min[0]) * 0.5,
                (max[1] - min[1]) * 0.5,
                (max[2] - min[2]) * 0.5,
            ],
        }
    }

    /// Compute the box enclosing a flat `[x, y, z, x, y, z, ...]` point list.
    ///
    /// Returns `None` for an empty list.
    pub fn from_points(points: &[f32]) -> Option<Self> {
        let mut chunks = points.chunks_exact(3);
        let first = chunks.next()?;
        let mut min = [first[0], first[1], first[2]];
        let mut max = min;
        for p in chunks {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Some(Self::from_min_max(min, max))
    }

    /// Minimum corner.
    pub fn min(&self) -> [f32; 3] {
        [
            self.center[0] - self.half_extents[0],
            self.center[1] - self.half_extents[1],
            self.center[2] - self.half_extents[2],
        ]
    }

    /// Maximum corner.
    pub fn max(&self) -> [f32; 3] {
        [
            self.center[0] + self.half_extents[0],
            self.center[1] + self.half_extents[1],
            self.center[2] + self.half_extents[2],
        ]
    }
}

/// Create a quaternion from a `[x, y, z, w]` array.
pub fn quat_from_array(a: [f32; 4]) -> Quat {
    nalgebra::Quaternion::new(a[3], a[0], a[1], a[2])
}

/// Convert a quaternion to a `[x, y, z, w]` array.
pub fn quat_to_array(q: Quat) -> [f32; 4] {
    [q.coords.x, q.coords.y, q.coords.z, q.coords.w]
}

/// Decompose a column-major 4x4 matrix into (translation, rotation, scale).
///
/// Rotation is returned as a `[x, y, z, w]` quaternion. A negative
/// determinant flips the X scale so the rotation part stays proper.
pub fn decompose_matrix(m: &[f32; 16]) -> ([f32; 3], [f32; 4], [f32; 3]) {
    let m = Mat4::from_column_slice(m);
    let translation = [m[(0, 3)], m[(1, 3)], m[(2, 3)]];
    let col0 = Vec3::new(m[(0, 0)], m[(1, 0)], m[(2, 0)]);
    let col1 = Vec3::new(m[(0, 1)], m[(1, 1)], m[(2, 1)]);
    let col2 = Vec3::new(m[(0, 2)], m[(1, 2)], m[(2, 2)]);

    let mut sx = col0.norm();
    let sy = col1.norm();
    let sz = col2.norm();
    if col0.cross(&col1).dot(&col2) < 0.0 {
        sx = -sx;
    }

    if sx == 0.0 || sy == 0.0 || sz == 0.0 {
        return (translation, [0.0, 0.0, 0.0, 1.0], [sx, sy, sz]);
    }

    let rot_mat = nalgebra::Matrix3::from_columns(&[col0 / sx, col1 / sy, col2 / sz]);
    let rotation = nalgebra::UnitQuaternion::from_rotation_matrix(
        &nalgebra::Rotation3::from_matrix_unchecked(rot_mat),
    )
    .into_inner();
    (translation, quat_to_array(rotation), [sx, sy, sz])
}

/// Per-vertex normals from positions and triangle indices.
///
/// Face normals are accumulated unnormalized (so larger triangles weigh
/// more) and the per-vertex sums are normalized at the end. Vertices not
/// referenced by any triangle get `[0, 1, 0]`.
pub fn calculate_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut accum = vec![Vec3::zeros(); vertex_count];
    let point = |i: usize| Vec3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            continue;
        }
        let p0 = point(i0);
        let face = (point(i1) - p0).cross(&(point(i2) - p0));
        accum[i0] += face;
        accum[i1] += face;
        accum[i2] += face;
    }

    let mut normals = Vec::with_capacity(vertex_count * 3);
    for n in accum {
        let len = n.norm();
        if len > 0.0 {
            normals.extend_from_slice(&[n.x / len, n.y / len, n.z / len]);
        } else {
            normals.extend_from_slice(&[0.0, 1.0, 0.0]);
        }
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_from_min_max() {
        let b = BoundingBox::from_min_max([-1.0, 0.0, 2.0], [1.0, 4.0, 6.0]);
        assert_eq!(b.center, [0.0, 2.0, 4.0]);
        assert_eq!(b.half_extents, [1.0, 2.0, 2.0]);
        assert_eq!(b.min(), [-1.0, 0.0, 2.0]);
        assert_eq!(b.max(), [1.0, 4.0, 6.0]);
    }

    #[test]
    fn bounding_box_from_points() {
        let b = BoundingBox::from_points(&[0.0, 0.0, 0.0, 2.0, -2.0, 1.0]).unwrap();
        assert_eq!(b.min(), [0.0, -2.0, 0.0]);
        assert_eq!(b.max(), [2.0, 0.0, 1.0]);
        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn decompose_identity() {
        let (t, r, s) = decompose_matrix(&IDENTITY_MAT4);
        assert_eq!(t, [0.0, 0.0, 0.0]);
        assert!((r[3].abs() - 1.0).abs() < 1e-6);
        assert_eq!(s, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn decompose_trs() {
        let rotation = nalgebra::UnitQuaternion::from_axis_angle(&Vec3::y_axis(), 1.0);
        let m = Mat4::new_translation(&Vec3::new(5.0, 6.0, 7.0))
            * rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 3.0, 4.0));
        let mut cols = [0.0f32; 16];
        cols.copy_from_slice(m.as_slice());

        let (t, r, s) = decompose_matrix(&cols);
        assert!((Vec3::from(t) - Vec3::new(5.0, 6.0, 7.0)).norm() < 1e-5);
        assert!((Vec3::from(s) - Vec3::new(2.0, 3.0, 4.0)).norm() < 1e-5);
        let q = quat_from_array(r);
        assert!(q.dot(rotation.quaternion()).abs() > 1.0 - 1e-5);
    }

    #[test]
    fn normals_of_flat_triangle() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let normals = calculate_normals(&positions, &[0, 1, 2]);
        for n in normals.chunks_exact(3) {
            assert!((n[2] - 1.0).abs() < 1e-6);
        }
    }
}
