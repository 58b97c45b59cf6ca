//! Camera and light transforms
//!
//! Pure builders for the per-frame matrices. All angles are degrees.

use crate::foundation::math::{self, utils::deg_to_rad, Axis, Mat4, Vec3};

/// Eye height above the terrain in free-fly mode
pub const EYE_HEIGHT: f32 = 1.3;

/// Light-space frustum half-extent at the light's distance
pub const LIGHT_FRUSTUM_EXTENT: f32 = 40.0;

/// Cartesian light position from spherical coordinates.
///
/// `tilt` is measured from +Z, `spin` around Z from +X.
pub fn light_position(spin: f32, tilt: f32, distance: f32) -> Vec3 {
    let (spin, tilt) = (deg_to_rad(spin), deg_to_rad(tilt));
    Vec3::new(
        distance * spin.cos() * tilt.sin(),
        distance * spin.sin() * tilt.sin(),
        distance * tilt.cos(),
    )
}

/// Camera projection for a `width` x `height` framebuffer
pub fn projection(ry: f32, width: u32, height: u32, front: f32, back: f32) -> Mat4 {
    let aspect = width as f32 / height.max(1) as f32;
    math::perspective(ry * aspect, ry, front, back)
}

/// Orbit view: `Translate(tx, ty, -zoom) * Rotate(X, tilt - 90) * Rotate(Z, spin)`
pub fn orbit_view(spin: f32, tilt: f32, zoom: f32, tx: f32, ty: f32) -> Mat4 {
    math::translate(tx, ty, -zoom) * math::rotate(Axis::X, tilt - 90.0) * math::rotate(Axis::Z, spin)
}

/// Free-fly view: `Rotate(X, tilt - 90) * Rotate(Z, spin) * Translate(-eye)`
pub fn free_fly_view(spin: f32, tilt: f32, eye: &Vec3) -> Mat4 {
    math::rotate(Axis::X, tilt - 90.0) * math::rotate(Axis::Z, spin) * math::translate(-eye.x, -eye.y, -eye.z)
}

/// Ground-plane forward direction for a given spin
pub fn forward(spin: f32) -> Vec3 {
    let (s, c) = deg_to_rad(spin).sin_cos();
    Vec3::new(s, c, 0.0)
}

/// Ground-plane right direction for a given spin
pub fn right(spin: f32) -> Vec3 {
    let (s, c) = deg_to_rad(spin).sin_cos();
    Vec3::new(c, -s, 0.0)
}

/// Light view, light projection and the world-to-shadow-texture matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowTransforms {
    /// Look-at from the light toward the origin, +Z up
    pub view: Mat4,
    /// Light frustum
    pub projection: Mat4,
    /// `Translate(.5,.5,.5) * Scale(.5,.5,.5) * projection * view`
    pub shadow_matrix: Mat4,
}

/// Build the light-space transforms for a light at `light_pos`
pub fn shadow_transforms(light_pos: &Vec3, distance: f32, front: f32, back: f32) -> ShadowTransforms {
    let view = math::look_at(light_pos, &Vec3::zeros(), &Vec3::z());
    let extent = LIGHT_FRUSTUM_EXTENT / distance;
    let projection = math::perspective(extent, extent, front, back);
    let bias = math::translate(0.5, 0.5, 0.5) * math::scale(0.5, 0.5, 0.5);

    ShadowTransforms {
        view,
        projection,
        shadow_matrix: bias * projection * view,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_light_position_matches_spherical_conversion() {
        let p = light_position(150.0, -45.0, 100.0);
        let (spin, tilt) = (150.0_f32.to_radians(), (-45.0_f32).to_radians());
        assert_relative_eq!(p.x, 100.0 * spin.cos() * tilt.sin(), epsilon = 1e-3);
        assert_relative_eq!(p.y, 100.0 * spin.sin() * tilt.sin(), epsilon = 1e-3);
        assert_relative_eq!(p.z, 100.0 * tilt.cos(), epsilon = 1e-3);
        assert_relative_eq!(p.norm(), 100.0, epsilon = 1e-3);
    }

    #[test]
    fn test_orbit_view_composition() {
        let view = orbit_view(0.0, 30.0, 25.0, 0.0, 0.0);
        let expected = math::translate(0.0, 0.0, -25.0) * math::rotate(Axis::X, -60.0) * math::rotate(Axis::Z, 0.0);
        assert_eq!(view, expected);
    }

    #[test]
    fn test_free_fly_view_moves_eye_to_origin() {
        let eye = Vec3::new(3.0, -7.0, 2.5);
        let view = free_fly_view(40.0, 10.0, &eye);
        let p = view.transform_point(&eye.into());
        assert_relative_eq!(p.coords, Vec3::zeros(), epsilon = 1e-5);
    }

    #[test]
    fn test_free_fly_looks_along_forward_when_level() {
        // tilt 0 is a level gaze; forward(spin) must land on -Z
        let spin = 35.0;
        let view = free_fly_view(spin, 0.0, &Vec3::zeros());
        let d = view.transform_vector(&forward(spin));
        assert_relative_eq!(d, -Vec3::z(), epsilon = 1e-5);

        let r = view.transform_vector(&right(spin));
        assert_relative_eq!(r, Vec3::x(), epsilon = 1e-5);
    }

    #[test]
    fn test_projection_uses_aspect() {
        let p = projection(0.4, 1280, 720, 0.5, 5000.0);
        assert_relative_eq!(p[(0, 0)], 1.0 / (0.4 * 1280.0 / 720.0), epsilon = 1e-5);
        assert_relative_eq!(p[(1, 1)], 1.0 / 0.4, epsilon = 1e-5);
    }

    #[test]
    fn test_shadow_matrix_maps_origin_into_unit_cube() {
        let light = light_position(150.0, -45.0, 100.0);
        let shadow = shadow_transforms(&light, 100.0, 0.5, 5000.0);
        let p = math::project_point(&shadow.shadow_matrix, &Vec3::zeros());

        // The origin lies on the light's axis: the center of the shadow map
        assert_relative_eq!(p.x, 0.5, epsilon = 1e-4);
        assert_relative_eq!(p.y, 0.5, epsilon = 1e-4);
        assert!(p.z > 0.0 && p.z < 1.0);
    }
}
