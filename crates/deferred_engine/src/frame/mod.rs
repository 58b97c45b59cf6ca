//! Frame and animation state
//!
//! Values derived once per frame (light position, camera matrices, animation
//! rotation, elapsed time) and consumed read-only by the pipeline.

pub mod camera;
pub mod state;

pub use camera::{light_position, orbit_view, free_fly_view, shadow_transforms, ShadowTransforms, EYE_HEIGHT};
pub use state::{CameraMode, FrameState, Movement, MovementKeys};
