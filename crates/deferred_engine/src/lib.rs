//! # Deferred Engine
//!
//! A multi-pass deferred renderer: shadow map, planar reflections, a separable
//! shadow blur, a G-buffer fill, deferred lighting and additive local lights.
//!
//! ## Features
//!
//! - **Pass pipeline**: fixed, feed-forward pass plan with per-frame read/write checking
//! - **Scoped bindings**: render targets and shader programs released on every exit path
//! - **Device seam**: OpenGL backend plus a headless recording backend for tests
//! - **Transform library**: column-major matrix builders with a documented composition order
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deferred_engine::prelude::*;
//!
//! fn frame(
//!     device: &mut dyn GraphicsDevice,
//!     pipeline: &mut DeferredPipeline,
//!     scene: &mut dyn SceneDrawable,
//!     state: &mut FrameState,
//!     delta: f32,
//! ) -> RenderResult<()> {
//!     state.advance(delta, 1280, 720, &FlatGround(0.0));
//!     pipeline.render_frame(device, scene, state)
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;
pub mod config;

pub mod foundation;
pub mod assets;
pub mod render;
pub mod frame;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetError, ImageData, ObjLoader},
        core::{ApplicationConfig, Config, ConfigError, RendererConfig},
        foundation::{
            math::{Axis, Mat4, Vec3},
            time::Timer,
        },
        frame::{CameraMode, FrameState, Movement},
        render::{
            scene::{ActiveProgram, FlatGround},
            DeferredPipeline, GraphicsDevice, HeightField, Mesh, MeshHandle, RenderError, RenderResult,
            SceneDrawable,
        },
    };
}
