//! # Rendering System
//!
//! Multi-pass deferred renderer over a thin graphics-device seam.
//!
//! ## Architecture
//!
//! - **Device** ([`api`]): object-safe trait wrapping every graphics call, with
//!   an OpenGL implementation and a recording implementation ([`backends`])
//! - **Resources**: [`RenderTarget`], [`ShaderProgram`] and [`Texture`], each
//!   owned for the life of the renderer; binding is scoped by RAII guards
//! - **Pipeline** ([`pipeline`]): the fixed per-frame pass sequence, its
//!   declared data dependencies, and the ledger that enforces them
//! - **Scene seam** ([`scene`]): the drawable and height-field interfaces the
//!   pipeline depends on but does not implement
//!
//! ## Failure model
//!
//! Every error is a [`RenderError`]. None are retried inside the engine; the
//! host decides whether to terminate.

pub mod api;
pub mod backends;
pub mod mesh;
pub mod pipeline;
pub mod render_target;
pub mod scene;
pub mod shader;
pub mod texture;

pub use api::{
    check_errors, GraphicsDevice, ImageAccess, MeshHandle, ProgramHandle, RasterState, ShaderStage, StageKind,
    TargetHandle, TargetLayout, TextureHandle, UniformValue, Viewport,
};
pub use mesh::{Mesh, Vertex, VertexAttribute};
pub use pipeline::{DeferredPipeline, PassKind, TargetId};
pub use render_target::{RenderTarget, TargetBinding};
pub use scene::{HeightField, SceneDrawable};
pub use shader::{ProgramBinding, ShaderProgram};
pub use texture::Texture;

use thiserror::Error;

use crate::assets::AssetError;

/// Rendering system errors
///
/// All variants are fatal to the frame that produced them. Each identifies the
/// failing operation so the host can report it before exiting.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Framebuffer completeness check failed at creation
    #[error("Render target {width}x{height} ({layout:?}) is incomplete: status 0x{status:04X}")]
    IncompleteTarget {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Requested channel layout
        layout: TargetLayout,
        /// Driver completeness status
        status: u32,
    },

    /// A shader stage failed to compile
    #[error("Failed to compile {stage} shader {label}:\n{log}")]
    ShaderCompile {
        /// Stage kind
        stage: StageKind,
        /// Source file or label
        label: String,
        /// Driver info log
        log: String,
    },

    /// Program link failed
    #[error("Failed to link program {program}:\n{log}")]
    ShaderLink {
        /// Program name
        program: String,
        /// Driver info log
        log: String,
    },

    /// A program was used out of its add-stages, link-once, use order
    #[error("Shader program {program}: {reason}")]
    ProgramLifecycle {
        /// Program name
        program: String,
        /// What was attempted
        reason: &'static str,
    },

    /// A shader file could not be mapped to a stage
    #[error("Unrecognised shader file {0}; expected .vert, .frag or .comp")]
    UnknownShaderStage(String),

    /// A render target was bound while another was still bound
    #[error("Cannot bind render target {requested:?} while {current:?} is bound")]
    NestedTargetBind {
        /// Target being bound
        requested: TargetHandle,
        /// Target already bound
        current: TargetHandle,
    },

    /// A program was activated while another was still active
    #[error("Cannot activate program {requested} while another program is active")]
    ProgramAlreadyActive {
        /// Program being activated
        requested: String,
    },

    /// A pass read a target no earlier pass wrote this frame
    #[error("{pass:?} reads {target:?} before any pass has written it this frame")]
    ReadBeforeWrite {
        /// Reading pass
        pass: PassKind,
        /// Target read
        target: TargetId,
    },

    /// A pass read the target it is currently writing
    #[error("{pass:?} reads {target:?} while rendering into it")]
    ReadOfBoundOutput {
        /// Reading pass
        pass: PassKind,
        /// Target read
        target: TargetId,
    },

    /// A pass descriptor lacks what its pass kind needs
    #[error("{pass:?} is malformed: {reason}")]
    MalformedPass {
        /// Offending pass
        pass: PassKind,
        /// What is missing
        reason: &'static str,
    },

    /// A graphics-API error was detected after an operation
    #[error("Graphics error {name} (0x{code:04X}) during {operation} at {location}")]
    Graphics {
        /// Raw error code
        code: u32,
        /// Symbolic name
        name: &'static str,
        /// Operation that was checked
        operation: String,
        /// `file:line` of the check
        location: String,
    },

    /// Resource creation or management failed
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Asset loading failed
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
