//! Per-frame animation and view state
//!
//! [`FrameState`] holds everything the passes read: the light position, the
//! camera matrices, the animation rotation, elapsed time and the shader
//! `mode`. It is advanced once per frame before any pass runs and is read-only
//! to the passes themselves.

use crate::core::{CameraConfig, LightRigConfig, RendererConfig};
use crate::foundation::math::{self, Axis, Mat4, Vec3};
use crate::render::HeightField;

use super::camera::{self, ShadowTransforms, EYE_HEIGHT};

/// Seconds for one full turn of the animated objects
pub const ANIMATION_PERIOD: f64 = 36.0;

/// Free-fly movement keys currently held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementKeys {
    /// W
    pub forward: bool,
    /// S
    pub backward: bool,
    /// A
    pub left: bool,
    /// D
    pub right: bool,
}

/// Direction keys for [`FrameState::set_movement`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// W
    Forward,
    /// S
    Backward,
    /// A
    Left,
    /// D
    Right,
}

/// Camera model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    /// Spin/tilt/zoom around a fixed center
    Orbit,
    /// Explicit eye position walking over the terrain
    FreeFly,
}

/// Everything the passes consume for one frame
#[derive(Debug, Clone)]
pub struct FrameState {
    /// Light rig in spherical coordinates
    pub light: LightRigConfig,
    /// Cartesian light position derived from `light`
    pub light_pos: Vec3,
    /// Camera parameters; `eye` is the free-fly position
    pub camera: CameraConfig,
    /// Active camera model
    pub camera_mode: CameraMode,
    /// Held movement keys
    pub movement: MovementKeys,
    /// Shader behaviour selector
    pub mode: i32,
    /// Seconds since start
    pub elapsed: f64,
    /// Seconds since the previous frame
    pub delta: f32,
    /// Framebuffer width
    pub width: u32,
    /// Framebuffer height
    pub height: u32,
    /// Rotation applied to animated objects
    pub animation: Mat4,
    /// Camera projection
    pub world_proj: Mat4,
    /// Camera view
    pub world_view: Mat4,
    /// Inverse camera view
    pub world_inverse: Mat4,
    /// Light view, projection and shadow matrix
    pub shadow: ShadowTransforms,
}

impl FrameState {
    /// Initial state from configuration
    pub fn new(config: &RendererConfig, width: u32, height: u32) -> Self {
        let camera_mode = if config.camera.orbit {
            CameraMode::Orbit
        } else {
            CameraMode::FreeFly
        };

        let mut state = Self {
            light: config.light,
            light_pos: Vec3::zeros(),
            camera: config.camera,
            camera_mode,
            movement: MovementKeys::default(),
            mode: config.initial_mode,
            elapsed: 0.0,
            delta: 0.0,
            width,
            height,
            animation: Mat4::identity(),
            world_proj: Mat4::identity(),
            world_view: Mat4::identity(),
            world_inverse: Mat4::identity(),
            shadow: camera::shadow_transforms(&Vec3::z(), 1.0, config.camera.front, config.camera.back),
        };
        state.rebuild();
        state
    }

    /// Advance by `delta` seconds and rebuild every derived value.
    ///
    /// In free-fly mode the eye moves by `speed * delta` along the held keys'
    /// directions and is then placed [`EYE_HEIGHT`] above `ground`.
    pub fn advance(&mut self, delta: f32, width: u32, height: u32, ground: &dyn HeightField) {
        self.delta = delta;
        self.elapsed += f64::from(delta);
        self.width = width;
        self.height = height;

        if self.camera_mode == CameraMode::FreeFly {
            self.integrate_movement(delta);
            let eye = &mut self.camera.eye;
            eye.z = ground.height_at(eye.x, eye.y) + EYE_HEIGHT;
        }

        self.rebuild();
    }

    fn integrate_movement(&mut self, delta: f32) {
        let step = self.camera.speed * delta;
        let forward = camera::forward(self.camera.spin);
        let right = camera::right(self.camera.spin);
        let keys = self.movement;

        let mut offset = Vec3::zeros();
        if keys.forward {
            offset += forward;
        }
        if keys.backward {
            offset -= forward;
        }
        if keys.left {
            offset -= right;
        }
        if keys.right {
            offset += right;
        }
        self.camera.eye += offset * step;
    }

    fn rebuild(&mut self) {
        let cam = &self.camera;

        self.light_pos = camera::light_position(self.light.spin, self.light.tilt, self.light.distance);
        let degrees = 360.0 * self.elapsed / ANIMATION_PERIOD;
        self.animation = math::rotate(Axis::Z, degrees as f32);

        self.world_proj = camera::projection(cam.ry, self.width, self.height, cam.front, cam.back);
        self.world_view = match self.camera_mode {
            CameraMode::Orbit => camera::orbit_view(cam.spin, cam.tilt, cam.zoom, cam.tx, cam.ty),
            CameraMode::FreeFly => camera::free_fly_view(cam.spin, cam.tilt, &cam.eye),
        };
        // Views are rigid transforms, so the inverse always exists
        self.world_inverse = self.world_view.try_inverse().unwrap_or_else(Mat4::identity);

        self.shadow = camera::shadow_transforms(&self.light_pos, self.light.distance, cam.front, cam.back);
    }

    /// Set the shader `mode`
    pub fn set_mode(&mut self, mode: i32) {
        if mode != self.mode {
            log::info!("Mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;
    }

    /// Switch between orbit and free-fly cameras
    pub fn toggle_camera_mode(&mut self) {
        self.camera_mode = match self.camera_mode {
            CameraMode::Orbit => CameraMode::FreeFly,
            CameraMode::FreeFly => CameraMode::Orbit,
        };
        self.movement = MovementKeys::default();
        log::info!("Camera mode: {:?}", self.camera_mode);
    }

    /// Press or release a movement key
    pub fn set_movement(&mut self, key: Movement, held: bool) {
        match key {
            Movement::Forward => self.movement.forward = held,
            Movement::Backward => self.movement.backward = held,
            Movement::Left => self.movement.left = held,
            Movement::Right => self.movement.right = held,
        }
    }

    /// Rotate the camera by degrees
    pub fn rotate_camera(&mut self, spin: f32, tilt: f32) {
        self.camera.spin += spin;
        self.camera.tilt += tilt;
    }

    /// Pan the orbit camera
    pub fn pan_camera(&mut self, dx: f32, dy: f32) {
        self.camera.tx += dx;
        self.camera.ty += dy;
    }

    /// Scale the orbit distance; positive `steps` move closer
    pub fn zoom_camera(&mut self, steps: f32) {
        self.camera.zoom = (self.camera.zoom * 0.9_f32.powf(steps)).max(self.camera.front * 2.0);
    }
}
