//! Graphics device abstraction
//!
//! Every graphics-API call the renderer makes goes through [`GraphicsDevice`].
//! Render targets, shader programs and the pipeline are written against this
//! trait only, so the same pass sequence drives a real OpenGL context
//! ([`GlDevice`](crate::render::backends::opengl::GlDevice)) or the headless
//! [`RecordingDevice`](crate::render::backends::recording::RecordingDevice)
//! used by the tests.
//!
//! The device owns all GPU objects. Callers only ever hold the copyable
//! handles defined here.

use std::fmt;
use std::panic::Location;

use bitflags::bitflags;

use crate::assets::ImageData;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::{Mesh, RenderError, RenderResult};

slotmap::new_key_type! {
    /// Handle to an offscreen framebuffer
    pub struct TargetHandle;

    /// Handle to a linked shader program
    pub struct ProgramHandle;

    /// Handle to a 2D texture (material image or render-target attachment)
    pub struct TextureHandle;

    /// Handle to uploaded vertex and index buffers
    pub struct MeshHandle;
}

/// Channel layout of a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetLayout {
    /// One color attachment plus depth
    Single,
    /// Four color attachments (world position, normal, Kd, Ks) plus depth
    GBuffer,
}

impl TargetLayout {
    /// Number of color attachments
    pub const fn color_count(self) -> usize {
        match self {
            Self::Single => 1,
            Self::GBuffer => 4,
        }
    }
}

/// Resources allocated for a render target
#[derive(Debug, Clone)]
pub struct TargetAllocation {
    /// Framebuffer handle
    pub handle: TargetHandle,
    /// Color attachments in attachment order
    pub color: Vec<TextureHandle>,
}

/// Pixel rectangle for `glViewport`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Left edge
    pub x: i32,
    /// Bottom edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Viewport covering `width` x `height` from the origin
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

bitflags! {
    /// Fixed-function state overrides a pass may request.
    ///
    /// An empty set means: no culling, no depth test, no blending.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RasterState: u32 {
        /// Cull front faces
        const CULL_FRONT = 1 << 0;
        /// Depth test with `LESS`
        const DEPTH_TEST = 1 << 1;
        /// One-plus-one additive blending
        const ADDITIVE_BLEND = 1 << 2;
    }
}

impl RasterState {
    /// Ordinary opaque rendering
    pub const OPAQUE: Self = Self::DEPTH_TEST;
}

/// Shader stage kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
    /// Compute shader
    Compute,
}

impl StageKind {
    /// Infer the stage from a source file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "vert" => Some(Self::Vertex),
            "frag" => Some(Self::Fragment),
            "comp" => Some(Self::Compute),
            _ => None,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Fragment => write!(f, "fragment"),
            Self::Compute => write!(f, "compute"),
        }
    }
}

/// One shader stage awaiting compilation
#[derive(Debug, Clone)]
pub struct ShaderStage {
    /// Stage kind
    pub kind: StageKind,
    /// Where the source came from, for diagnostics
    pub label: String,
    /// GLSL source text
    pub source: String,
}

/// Value assigned to a named uniform
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// `int` or sampler unit
    Int(i32),
    /// `float`
    Float(f32),
    /// `float[]`
    FloatArray(Vec<f32>),
    /// `vec3`
    Vec3(Vec3),
    /// `mat4`, uploaded column-major without transposition
    Mat4(Mat4),
}

/// Access mode for image-unit bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAccess {
    /// `readonly`
    ReadOnly,
    /// `writeonly`
    WriteOnly,
}

/// The complete set of graphics operations used by the renderer.
///
/// Object safe; the pipeline works with `&mut dyn GraphicsDevice`.
/// Binding state (`bound_render_target`, `active_program`) is global to the
/// device, mirroring a GL context.
pub trait GraphicsDevice {
    /// Allocate a framebuffer with depth and 1 or 4 RGBA32F color attachments.
    ///
    /// Fails with [`RenderError::IncompleteTarget`] when the driver reports the
    /// framebuffer incomplete.
    fn create_render_target(&mut self, width: u32, height: u32, layout: TargetLayout) -> RenderResult<TargetAllocation>;

    /// Redirect draw output to `target`, or to the visible framebuffer for `None`
    fn bind_render_target(&mut self, target: Option<TargetHandle>);

    /// The currently bound offscreen target, if any
    fn bound_render_target(&self) -> Option<TargetHandle>;

    /// Set the viewport rectangle
    fn set_viewport(&mut self, viewport: Viewport);

    /// Clear color and depth of the current output
    fn clear(&mut self, color: [f32; 4]);

    /// Apply culling, depth-test and blending state
    fn set_raster_state(&mut self, state: RasterState);

    /// Compile `stages`, bind vertex attribute locations, and link.
    fn link_program(&mut self, stages: &[ShaderStage], attributes: &[(u32, &str)]) -> RenderResult<ProgramHandle>;

    /// Make `program` current, or none for `None`
    fn use_program(&mut self, program: Option<ProgramHandle>);

    /// The current program, if any
    fn active_program(&self) -> Option<ProgramHandle>;

    /// Assign a uniform by name; unknown names are ignored as GL does.
    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: &UniformValue);

    /// Upload an RGBA8 image with mipmaps
    fn create_texture(&mut self, image: &ImageData) -> RenderResult<TextureHandle>;

    /// Bind `texture` to sampler unit `unit`
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>);

    /// Bind level 0 of `texture` to image unit `unit` as RGBA32F
    fn bind_image(&mut self, unit: u32, texture: TextureHandle, access: ImageAccess);

    /// Launch compute work groups
    fn dispatch_compute(&mut self, groups_x: u32, groups_y: u32, groups_z: u32);

    /// Make image writes visible to later image loads and texture fetches
    fn memory_barrier(&mut self);

    /// Upload vertex and index data
    fn create_mesh(&mut self, mesh: &Mesh) -> RenderResult<MeshHandle>;

    /// Draw an uploaded mesh as indexed triangles
    fn draw_mesh(&mut self, mesh: MeshHandle);

    /// Draw one screen-covering triangle with no vertex inputs
    fn draw_fullscreen(&mut self);

    /// Pop the oldest pending API error code, if any
    fn poll_error(&mut self) -> Option<u32>;
}

/// Describe a GL error code
pub fn error_name(code: u32) -> &'static str {
    match code {
        0x0500 => "GL_INVALID_ENUM",
        0x0501 => "GL_INVALID_VALUE",
        0x0502 => "GL_INVALID_OPERATION",
        0x0503 => "GL_STACK_OVERFLOW",
        0x0504 => "GL_STACK_UNDERFLOW",
        0x0505 => "GL_OUT_OF_MEMORY",
        0x0506 => "GL_INVALID_FRAMEBUFFER_OPERATION",
        _ => "unknown error",
    }
}

/// Fail if the device has recorded an API error.
///
/// The returned error names `operation` and the caller's source location.
#[track_caller]
pub fn check_errors<D: GraphicsDevice + ?Sized>(device: &mut D, operation: &str) -> RenderResult<()> {
    let location = Location::caller();
    match device.poll_error() {
        None => Ok(()),
        Some(code) => {
            // Drain anything queued behind the first error
            while device.poll_error().is_some() {}
            Err(RenderError::Graphics {
                code,
                name: error_name(code),
                operation: operation.to_string(),
                location: format!("{}:{}", location.file(), location.line()),
            })
        }
    }
}
