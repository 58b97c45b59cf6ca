//! Public rendering API
//!
//! The device seam every backend implements, plus the handle and state types
//! that cross it.

pub mod graphics_device;

pub use graphics_device::{
    check_errors, error_name, GraphicsDevice, ImageAccess, MeshHandle, ProgramHandle, RasterState, ShaderStage,
    StageKind, TargetAllocation, TargetHandle, TargetLayout, TextureHandle, UniformValue, Viewport,
};
