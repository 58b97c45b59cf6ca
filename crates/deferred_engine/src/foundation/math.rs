//! Math utilities and transform constructors
//!
//! Provides the 4x4 transform library every pass is built on.
//!
//! ## Convention
//!
//! Matrices are `nalgebra::Matrix4<f32>`, stored column-major (the layout the
//! shaders receive without transposition). Vectors are columns and products
//! compose right-to-left: in `a * b` (or `matrix_mult(a, b)`) the effect of `b`
//! is applied first. `translate(..) * rotate(..)` therefore rotates about the
//! local origin and then moves the result.
//!
//! Clip space follows OpenGL: after the perspective divide the near plane maps
//! to depth -1 and the far plane to +1, with the camera looking down -Z.

pub use nalgebra::{Matrix4, Unit, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Coordinate axis selector for [`rotate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The X axis (index 0)
    X,
    /// The Y axis (index 1)
    Y,
    /// The Z axis (index 2)
    Z,
}

impl Axis {
    /// Map a numeric axis index (0:X, 1:Y, 2:Z) to an axis.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::X),
            1 => Some(Self::Y),
            2 => Some(Self::Z),
            _ => None,
        }
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

/// Rotation about `axis` by `degrees`.
pub fn rotate(axis: Axis, degrees: f32) -> Mat4 {
    let (s, c) = utils::deg_to_rad(degrees).sin_cos();
    match axis {
        Axis::X => Mat4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, c, -s, 0.0,
            0.0, s, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ),
        Axis::Y => Mat4::new(
            c, 0.0, s, 0.0,
            0.0, 1.0, 0.0, 0.0,
            -s, 0.0, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ),
        Axis::Z => Mat4::new(
            c, -s, 0.0, 0.0,
            s, c, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ),
    }
}

/// Rotation about a numerically indexed axis (0:X, 1:Y, 2:Z).
///
/// Any other index yields the identity matrix. This is a defined fallback,
/// not an error.
pub fn rotate_indexed(axis: usize, degrees: f32) -> Mat4 {
    Axis::from_index(axis).map_or_else(Mat4::identity, |axis| rotate(axis, degrees))
}

/// Non-uniform scale.
pub fn scale(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::new_nonuniform_scaling(&Vec3::new(x, y, z))
}

/// Translation by `(x, y, z)`; the offset lives in the fourth column.
pub fn translate(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::new_translation(&Vec3::new(x, y, z))
}

/// Symmetric frustum projection.
///
/// `rx` and `ry` are the half-extents of the frustum at unit distance
/// (`tan` of the half field of view); `front` and `back` are the near and far
/// clip distances. Camera-space `z = -front` lands on NDC depth -1 and
/// `z = -back` on +1.
pub fn perspective(rx: f32, ry: f32, front: f32, back: f32) -> Mat4 {
    let depth = back - front;
    Mat4::new(
        1.0 / rx, 0.0, 0.0, 0.0,
        0.0, 1.0 / ry, 0.0, 0.0,
        0.0, 0.0, -(back + front) / depth, -(2.0 * front * back) / depth,
        0.0, 0.0, -1.0, 0.0,
    )
}

/// Standard 4x4 product; `b` is applied first.
pub fn matrix_mult(a: &Mat4, b: &Mat4) -> Mat4 {
    a * b
}

/// View matrix placing `eye` at the origin looking toward `center`.
///
/// Degenerate inputs (`center == eye`, or `up` parallel to the view
/// direction) produce a NaN basis; callers must avoid them.
pub fn look_at(eye: &Vec3, center: &Vec3, up: &Vec3) -> Mat4 {
    let forward = (center - eye).normalize();
    let right = forward.cross(up).normalize();
    let true_up = right.cross(&forward);

    Mat4::new(
        right.x, right.y, right.z, -right.dot(eye),
        true_up.x, true_up.y, true_up.z, -true_up.dot(eye),
        -forward.x, -forward.y, -forward.z, forward.dot(eye),
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Apply `m` to a point and perform the perspective divide.
pub fn project_point(m: &Mat4, point: &Vec3) -> Vec3 {
    let clip = m * Vec4::new(point.x, point.y, point.z, 1.0);
    Vec3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;
    const AXES: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[test]
    fn test_rotation_is_orthonormal() {
        for axis in AXES {
            for degrees in [-270.0, -45.0, 0.0, 13.0, 90.0, 180.0, 333.0] {
                let r = rotate(axis, degrees);
                assert_relative_eq!(r.transpose() * r, Mat4::identity(), epsilon = EPSILON);
            }
        }
    }

    #[test]
    fn test_zero_and_full_turn_rotation() {
        for axis in AXES {
            assert_relative_eq!(rotate(axis, 0.0), Mat4::identity(), epsilon = EPSILON);
            assert_relative_eq!(rotate(axis, 360.0), rotate(axis, 0.0), epsilon = EPSILON);
        }
    }

    #[test]
    fn test_rotation_direction() {
        // Right-handed: +90 about Z carries +X onto +Y
        let p = rotate(Axis::Z, 90.0).transform_vector(&Vec3::x());
        assert_relative_eq!(p, Vec3::y(), epsilon = EPSILON);

        // +90 about X carries +Y onto +Z
        let p = rotate(Axis::X, 90.0).transform_vector(&Vec3::y());
        assert_relative_eq!(p, Vec3::z(), epsilon = EPSILON);

        // +90 about Y carries +Z onto +X
        let p = rotate(Axis::Y, 90.0).transform_vector(&Vec3::z());
        assert_relative_eq!(p, Vec3::x(), epsilon = EPSILON);
    }

    #[test]
    fn test_unknown_axis_is_identity() {
        assert_eq!(rotate_indexed(3, 45.0), Mat4::identity());
        assert_eq!(rotate_indexed(usize::MAX, 45.0), Mat4::identity());
        assert_eq!(rotate_indexed(2, 45.0), rotate(Axis::Z, 45.0));
    }

    #[test]
    fn test_identity_scale_and_translation() {
        assert_eq!(scale(1.0, 1.0, 1.0), Mat4::identity());
        assert_eq!(translate(0.0, 0.0, 0.0), Mat4::identity());
    }

    #[test]
    fn test_translation_column() {
        let t = translate(1.0, 2.0, 3.0);
        assert_eq!(t[(0, 3)], 1.0);
        assert_eq!(t[(1, 3)], 2.0);
        assert_eq!(t[(2, 3)], 3.0);
        // Column-major storage puts the offset at slice indices 12..15
        assert_eq!(&t.as_slice()[12..15], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mult_is_associative_not_commutative() {
        let a = translate(1.0, 0.0, 0.0);
        let b = rotate(Axis::Z, 90.0);
        let c = scale(2.0, 3.0, 0.5);

        assert_relative_eq!(
            matrix_mult(&matrix_mult(&a, &b), &c),
            matrix_mult(&a, &matrix_mult(&b, &c)),
            epsilon = EPSILON
        );

        let ab = matrix_mult(&a, &b);
        let ba = matrix_mult(&b, &a);
        assert!((ab - ba).abs().max() > 0.5);
    }

    #[test]
    fn test_mult_applies_right_operand_first() {
        // Rotate +X onto +Y, then move by +X
        let m = matrix_mult(&translate(1.0, 0.0, 0.0), &rotate(Axis::Z, 90.0));
        let p = m.transform_point(&nalgebra::Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.coords, Vec3::new(1.0, 1.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_look_at_maps_eye_to_origin() {
        let eye = Vec3::new(-35.3, -61.2, 70.7);
        let view = look_at(&eye, &Vec3::zeros(), &Vec3::z());
        let p = view.transform_point(&eye.into());
        assert_relative_eq!(p.coords, Vec3::zeros(), epsilon = 1e-4);

        // Center lies straight ahead on -Z
        let c = view.transform_point(&nalgebra::Point3::origin());
        assert_relative_eq!(c.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(c.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(c.z, -eye.norm(), epsilon = 1e-3);
    }

    #[test]
    fn test_perspective_depth_range() {
        let (near, far) = (0.5, 5000.0);
        let p = perspective(0.6, 0.4, near, far);

        let z_near = project_point(&p, &Vec3::new(0.0, 0.0, -near));
        let z_far = project_point(&p, &Vec3::new(0.0, 0.0, -far));
        assert_relative_eq!(z_near.z, -1.0, epsilon = EPSILON);
        assert_relative_eq!(z_far.z, 1.0, epsilon = 1e-4);

        // The w row carries -z so the divide happens
        assert_eq!(p[(3, 2)], -1.0);
        assert_eq!(p[(3, 3)], 0.0);
    }

    #[test]
    fn test_perspective_extent() {
        // A point at the frustum edge at unit depth maps to the NDC edge
        let p = perspective(0.6, 0.4, 0.5, 100.0);
        let edge = project_point(&p, &Vec3::new(0.6, 0.4, -1.0));
        assert_relative_eq!(edge.x, 1.0, epsilon = EPSILON);
        assert_relative_eq!(edge.y, 1.0, epsilon = EPSILON);
    }
}
