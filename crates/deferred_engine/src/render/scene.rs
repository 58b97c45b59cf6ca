//! Scene collaborator interfaces
//!
//! The pipeline never walks a scene graph itself. It hands the active program
//! and a base transform to a [`SceneDrawable`], which issues its own per-object
//! uniforms and draws.

use crate::foundation::math::Mat4;
use crate::render::api::GraphicsDevice;
use crate::render::shader::ProgramBinding;
use crate::render::RenderResult;

/// The active program as seen by a scene during a pass
pub type ActiveProgram<'p, 'd> = ProgramBinding<'p, dyn GraphicsDevice + 'd>;

/// Something the pipeline can draw once per pass
pub trait SceneDrawable {
    /// Draw everything under `base`
    fn draw(&self, program: &mut ActiveProgram<'_, '_>, base: &Mat4) -> RenderResult<()>;

    /// Draw everything except reflective surfaces (used by the reflection passes)
    fn draw_nonreflective(&self, program: &mut ActiveProgram<'_, '_>, base: &Mat4) -> RenderResult<()>;

    /// Receive this frame's animation rotation
    fn set_animation(&mut self, _rotation: &Mat4) {}
}

/// Terrain height query used to keep the free-fly eye above ground
pub trait HeightField {
    /// Ground height at `(x, y)`
    fn height_at(&self, x: f32, y: f32) -> f32;
}

/// Flat ground at a fixed height
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatGround(pub f32);

impl HeightField for FlatGround {
    fn height_at(&self, _x: f32, _y: f32) -> f32 {
        self.0
    }
}
