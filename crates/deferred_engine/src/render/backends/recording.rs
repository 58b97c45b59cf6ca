//! Headless recording device
//!
//! Implements [`GraphicsDevice`] without a graphics context. Every call is
//! appended to a command log that tests inspect to check pass order, binding
//! discipline, uniform names and texture units. Failures can be injected to
//! exercise the fatal paths.

use std::collections::VecDeque;

use slotmap::{SecondaryMap, SlotMap};

use crate::assets::ImageData;
use crate::render::api::{
    GraphicsDevice, ImageAccess, MeshHandle, ProgramHandle, RasterState, ShaderStage, TargetAllocation, TargetHandle,
    TargetLayout, TextureHandle, UniformValue, Viewport,
};
use crate::render::{Mesh, RenderError, RenderResult};

/// GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT
const INCOMPLETE_ATTACHMENT: u32 = 0x8CD6;

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `create_render_target`
    CreateRenderTarget {
        /// New handle
        handle: TargetHandle,
        /// Width
        width: u32,
        /// Height
        height: u32,
        /// Layout
        layout: TargetLayout,
    },
    /// `bind_render_target`
    BindRenderTarget(Option<TargetHandle>),
    /// `set_viewport`
    SetViewport(Viewport),
    /// `clear`
    Clear([f32; 4]),
    /// `set_raster_state`
    SetRasterState(RasterState),
    /// `link_program`
    LinkProgram {
        /// New handle
        handle: ProgramHandle,
        /// Stage labels in attach order
        stages: Vec<String>,
        /// Attribute bindings
        attributes: Vec<(u32, String)>,
    },
    /// `use_program`
    UseProgram(Option<ProgramHandle>),
    /// `set_uniform`
    SetUniform {
        /// Target program
        program: ProgramHandle,
        /// Uniform name
        name: String,
        /// Assigned value
        value: UniformValue,
    },
    /// `create_texture`
    CreateTexture {
        /// New handle
        handle: TextureHandle,
        /// Width
        width: u32,
        /// Height
        height: u32,
    },
    /// `bind_texture`
    BindTexture {
        /// Sampler unit
        unit: u32,
        /// Bound texture
        texture: Option<TextureHandle>,
    },
    /// `bind_image`
    BindImage {
        /// Image unit
        unit: u32,
        /// Bound texture
        texture: TextureHandle,
        /// Access mode
        access: ImageAccess,
    },
    /// `dispatch_compute`
    DispatchCompute {
        /// Groups along X
        x: u32,
        /// Groups along Y
        y: u32,
        /// Groups along Z
        z: u32,
    },
    /// `memory_barrier`
    MemoryBarrier,
    /// `create_mesh`
    CreateMesh {
        /// New handle
        handle: MeshHandle,
        /// Triangle count
        triangles: usize,
    },
    /// `draw_mesh`
    DrawMesh(MeshHandle),
    /// `draw_fullscreen`
    DrawFullscreen,
}

/// Device that records instead of rendering
#[derive(Debug, Default)]
pub struct RecordingDevice {
    commands: Vec<Command>,
    targets: SlotMap<TargetHandle, TargetLayout>,
    programs: SlotMap<ProgramHandle, ()>,
    textures: SlotMap<TextureHandle, (u32, u32)>,
    meshes: SlotMap<MeshHandle, usize>,
    texture_owner: SecondaryMap<TextureHandle, TargetHandle>,
    bound_target: Option<TargetHandle>,
    active_program: Option<ProgramHandle>,
    pending_errors: VecDeque<u32>,
    fail_target: bool,
    fail_compile: Option<String>,
    fail_link: Option<String>,
    error_on_draw: Option<u32>,
}

impl RecordingDevice {
    /// Fresh device with an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command recorded so far
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Forget recorded commands; resources and binding state are kept
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Most recent value assigned to uniform `name` on any program
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.commands.iter().rev().find_map(|c| match c {
            Command::SetUniform { name: n, value, .. } if n == name => Some(value),
            _ => None,
        })
    }

    /// The render target a texture is attached to, if any
    pub fn texture_owner(&self, texture: TextureHandle) -> Option<TargetHandle> {
        self.texture_owner.get(texture).copied()
    }

    /// Report the next render target as incomplete
    pub fn fail_next_target(&mut self) {
        self.fail_target = true;
    }

    /// Fail the next program's first stage with `log`
    pub fn fail_next_compile(&mut self, log: impl Into<String>) {
        self.fail_compile = Some(log.into());
    }

    /// Fail the next link with `log`
    pub fn fail_next_link(&mut self, log: impl Into<String>) {
        self.fail_link = Some(log.into());
    }

    /// Queue an API error as if the last call had raised it
    pub fn inject_error(&mut self, code: u32) {
        self.pending_errors.push_back(code);
    }

    /// Raise `code` when the next draw is issued
    pub fn error_on_next_draw(&mut self, code: u32) {
        self.error_on_draw = Some(code);
    }

    fn on_draw(&mut self) {
        if let Some(code) = self.error_on_draw.take() {
            self.pending_errors.push_back(code);
        }
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_render_target(&mut self, width: u32, height: u32, layout: TargetLayout) -> RenderResult<TargetAllocation> {
        if std::mem::take(&mut self.fail_target) {
            return Err(RenderError::IncompleteTarget {
                width,
                height,
                layout,
                status: INCOMPLETE_ATTACHMENT,
            });
        }

        let handle = self.targets.insert(layout);
        let color: Vec<_> = (0..layout.color_count())
            .map(|_| self.textures.insert((width, height)))
            .collect();
        for &texture in &color {
            self.texture_owner.insert(texture, handle);
        }

        self.commands.push(Command::CreateRenderTarget {
            handle,
            width,
            height,
            layout,
        });
        Ok(TargetAllocation { handle, color })
    }

    fn bind_render_target(&mut self, target: Option<TargetHandle>) {
        self.bound_target = target;
        self.commands.push(Command::BindRenderTarget(target));
    }

    fn bound_render_target(&self) -> Option<TargetHandle> {
        self.bound_target
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(Command::SetViewport(viewport));
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.commands.push(Command::Clear(color));
    }

    fn set_raster_state(&mut self, state: RasterState) {
        self.commands.push(Command::SetRasterState(state));
    }

    fn link_program(&mut self, stages: &[ShaderStage], attributes: &[(u32, &str)]) -> RenderResult<ProgramHandle> {
        if let Some(log) = self.fail_compile.take() {
            let stage = &stages[0];
            return Err(RenderError::ShaderCompile {
                stage: stage.kind,
                label: stage.label.clone(),
                log,
            });
        }
        if let Some(log) = self.fail_link.take() {
            return Err(RenderError::ShaderLink {
                program: String::new(),
                log,
            });
        }

        let handle = self.programs.insert(());
        self.commands.push(Command::LinkProgram {
            handle,
            stages: stages.iter().map(|s| s.label.clone()).collect(),
            attributes: attributes.iter().map(|&(i, n)| (i, n.to_string())).collect(),
        });
        Ok(handle)
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.active_program = program;
        self.commands.push(Command::UseProgram(program));
    }

    fn active_program(&self) -> Option<ProgramHandle> {
        self.active_program
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: &UniformValue) {
        self.commands.push(Command::SetUniform {
            program,
            name: name.to_string(),
            value: value.clone(),
        });
    }

    fn create_texture(&mut self, image: &ImageData) -> RenderResult<TextureHandle> {
        let handle = self.textures.insert((image.width, image.height));
        self.commands.push(Command::CreateTexture {
            handle,
            width: image.width,
            height: image.height,
        });
        Ok(handle)
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        self.commands.push(Command::BindTexture { unit, texture });
    }

    fn bind_image(&mut self, unit: u32, texture: TextureHandle, access: ImageAccess) {
        self.commands.push(Command::BindImage { unit, texture, access });
    }

    fn dispatch_compute(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) {
        self.commands.push(Command::DispatchCompute {
            x: groups_x,
            y: groups_y,
            z: groups_z,
        });
    }

    fn memory_barrier(&mut self) {
        self.commands.push(Command::MemoryBarrier);
    }

    fn create_mesh(&mut self, mesh: &Mesh) -> RenderResult<MeshHandle> {
        let triangles = mesh.triangle_count();
        let handle = self.meshes.insert(triangles);
        self.commands.push(Command::CreateMesh { handle, triangles });
        Ok(handle)
    }

    fn draw_mesh(&mut self, mesh: MeshHandle) {
        self.commands.push(Command::DrawMesh(mesh));
        self.on_draw();
    }

    fn draw_fullscreen(&mut self) {
        self.commands.push(Command::DrawFullscreen);
        self.on_draw();
    }

    fn poll_error(&mut self) -> Option<u32> {
        self.pending_errors.pop_front()
    }
}
