//! OpenGL backend
//!
//! [`GlDevice`] implements [`GraphicsDevice`] on a `glow` context. It owns
//! every GL object it creates and releases them on drop. The context must be
//! current on the calling thread for the device's whole lifetime; all GL calls
//! below rely on that.

use glow::HasContext;
use slotmap::SlotMap;

use crate::assets::ImageData;
use crate::render::api::{
    GraphicsDevice, ImageAccess, MeshHandle, ProgramHandle, RasterState, ShaderStage, StageKind, TargetAllocation,
    TargetHandle, TargetLayout, TextureHandle, UniformValue, Viewport,
};
use crate::render::mesh::VertexAttribute;
use crate::render::{Mesh, RenderError, RenderResult, Vertex};

struct GlTarget {
    framebuffer: glow::Framebuffer,
    depth: glow::Renderbuffer,
}

struct GlMesh {
    vao: glow::VertexArray,
    vertex_buffer: glow::Buffer,
    index_buffer: glow::Buffer,
    index_count: i32,
}

/// Graphics device backed by an OpenGL 4.3 core context
pub struct GlDevice {
    gl: glow::Context,
    targets: SlotMap<TargetHandle, GlTarget>,
    programs: SlotMap<ProgramHandle, glow::Program>,
    textures: SlotMap<TextureHandle, glow::Texture>,
    meshes: SlotMap<MeshHandle, GlMesh>,
    fullscreen_vao: glow::VertexArray,
    bound_target: Option<TargetHandle>,
    active_program: Option<ProgramHandle>,
}

impl GlDevice {
    /// Wrap a loaded context
    pub fn new(gl: glow::Context) -> RenderResult<Self> {
        let fullscreen_vao = unsafe {
            log::info!(
                "OpenGL {} on {}",
                gl.get_parameter_string(glow::VERSION),
                gl.get_parameter_string(glow::RENDERER)
            );
            gl.create_vertex_array().map_err(RenderError::ResourceCreationFailed)?
        };

        Ok(Self {
            gl,
            targets: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            fullscreen_vao,
            bound_target: None,
            active_program: None,
        })
    }

    fn framebuffer_of(&self, target: Option<TargetHandle>) -> Option<glow::Framebuffer> {
        target.and_then(|t| self.targets.get(t)).map(|t| t.framebuffer)
    }

    fn stage_enum(kind: StageKind) -> u32 {
        match kind {
            StageKind::Vertex => glow::VERTEX_SHADER,
            StageKind::Fragment => glow::FRAGMENT_SHADER,
            StageKind::Compute => glow::COMPUTE_SHADER,
        }
    }
}

impl GraphicsDevice for GlDevice {
    fn create_render_target(&mut self, width: u32, height: u32, layout: TargetLayout) -> RenderResult<TargetAllocation> {
        let previous = self.framebuffer_of(self.bound_target);
        let gl = &self.gl;
        let (w, h) = (width as i32, height as i32);

        unsafe {
            let framebuffer = gl.create_framebuffer().map_err(RenderError::ResourceCreationFailed)?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));

            let attachments = create_all(
                layout.color_count(),
                |i| {
                    let texture = gl.create_texture()?;
                    gl.bind_texture(glow::TEXTURE_2D, Some(texture));
                    gl.tex_image_2d(
                        glow::TEXTURE_2D,
                        0,
                        glow::RGBA32F as i32,
                        w,
                        h,
                        0,
                        glow::RGBA,
                        glow::FLOAT,
                        None,
                    );
                    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
                    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
                    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
                    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);

                    let attachment = glow::COLOR_ATTACHMENT0 + i as u32;
                    gl.framebuffer_texture_2d(glow::FRAMEBUFFER, attachment, glow::TEXTURE_2D, Some(texture), 0);
                    Ok(texture)
                },
                |texture| gl.delete_texture(texture),
            )
            .and_then(|textures| match gl.create_renderbuffer() {
                Ok(depth) => Ok((textures, depth)),
                Err(e) => {
                    textures.into_iter().for_each(|texture| gl.delete_texture(texture));
                    Err(e)
                }
            });
            gl.bind_texture(glow::TEXTURE_2D, None);

            let (gl_textures, depth) = match attachments {
                Ok(attachments) => attachments,
                Err(e) => {
                    gl.bind_framebuffer(glow::FRAMEBUFFER, previous);
                    gl.delete_framebuffer(framebuffer);
                    return Err(RenderError::ResourceCreationFailed(e));
                }
            };

            let draw_buffers: Vec<u32> = (0..gl_textures.len())
                .map(|i| glow::COLOR_ATTACHMENT0 + i as u32)
                .collect();
            gl.draw_buffers(&draw_buffers);

            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
            gl.renderbuffer_storage(glow::RENDERBUFFER, glow::DEPTH_COMPONENT24, w, h);
            gl.framebuffer_renderbuffer(glow::FRAMEBUFFER, glow::DEPTH_ATTACHMENT, glow::RENDERBUFFER, Some(depth));
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);

            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, previous);

            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.delete_framebuffer(framebuffer);
                gl.delete_renderbuffer(depth);
                for texture in gl_textures {
                    gl.delete_texture(texture);
                }
                return Err(RenderError::IncompleteTarget {
                    width,
                    height,
                    layout,
                    status,
                });
            }

            let color = gl_textures.into_iter().map(|texture| self.textures.insert(texture)).collect();
            let handle = self.targets.insert(GlTarget { framebuffer, depth });
            Ok(TargetAllocation { handle, color })
        }
    }

    fn bind_render_target(&mut self, target: Option<TargetHandle>) {
        let framebuffer = self.framebuffer_of(target);
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer);
        }
        self.bound_target = target;
    }

    fn bound_render_target(&self) -> Option<TargetHandle> {
        self.bound_target
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        unsafe {
            self.gl
                .viewport(viewport.x, viewport.y, viewport.width as i32, viewport.height as i32);
        }
    }

    fn clear(&mut self, color: [f32; 4]) {
        unsafe {
            self.gl.clear_color(color[0], color[1], color[2], color[3]);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn set_raster_state(&mut self, state: RasterState) {
        let gl = &self.gl;
        unsafe {
            if state.contains(RasterState::CULL_FRONT) {
                gl.enable(glow::CULL_FACE);
                gl.cull_face(glow::FRONT);
            } else {
                gl.disable(glow::CULL_FACE);
            }

            if state.contains(RasterState::DEPTH_TEST) {
                gl.enable(glow::DEPTH_TEST);
                gl.depth_func(glow::LESS);
            } else {
                gl.disable(glow::DEPTH_TEST);
            }

            if state.contains(RasterState::ADDITIVE_BLEND) {
                gl.enable(glow::BLEND);
                gl.blend_func(glow::ONE, glow::ONE);
            } else {
                gl.disable(glow::BLEND);
            }
        }
    }

    fn link_program(&mut self, stages: &[ShaderStage], attributes: &[(u32, &str)]) -> RenderResult<ProgramHandle> {
        let gl = &self.gl;
        unsafe {
            let program = gl.create_program().map_err(RenderError::ResourceCreationFailed)?;
            let mut shaders = Vec::with_capacity(stages.len());

            for stage in stages {
                let shader = gl
                    .create_shader(Self::stage_enum(stage.kind))
                    .map_err(RenderError::ResourceCreationFailed)?;
                gl.shader_source(shader, &stage.source);
                gl.compile_shader(shader);

                if !gl.get_shader_compile_status(shader) {
                    let log = gl.get_shader_info_log(shader);
                    gl.delete_shader(shader);
                    for s in shaders {
                        gl.delete_shader(s);
                    }
                    gl.delete_program(program);
                    return Err(RenderError::ShaderCompile {
                        stage: stage.kind,
                        label: stage.label.clone(),
                        log,
                    });
                }

                gl.attach_shader(program, shader);
                shaders.push(shader);
            }

            for &(index, name) in attributes {
                gl.bind_attrib_location(program, index, name);
            }
            gl.link_program(program);

            let linked = gl.get_program_link_status(program);
            let log = gl.get_program_info_log(program);
            for shader in shaders {
                gl.detach_shader(program, shader);
                gl.delete_shader(shader);
            }

            if !linked {
                gl.delete_program(program);
                return Err(RenderError::ShaderLink {
                    program: String::new(),
                    log,
                });
            }
            if !log.trim().is_empty() {
                log::debug!("Program link log: {}", log.trim());
            }

            Ok(self.programs.insert(program))
        }
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        let gl_program = program.and_then(|p| self.programs.get(p)).copied();
        unsafe {
            self.gl.use_program(gl_program);
        }
        self.active_program = program;
    }

    fn active_program(&self) -> Option<ProgramHandle> {
        self.active_program
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: &UniformValue) {
        let Some(&gl_program) = self.programs.get(program) else {
            log::warn!("Uniform {} set on an unknown program", name);
            return;
        };

        let gl = &self.gl;
        unsafe {
            let location = gl.get_uniform_location(gl_program, name);
            let location = location.as_ref();
            match value {
                UniformValue::Int(v) => gl.uniform_1_i32(location, *v),
                UniformValue::Float(v) => gl.uniform_1_f32(location, *v),
                UniformValue::FloatArray(values) => gl.uniform_1_f32_slice(location, values),
                UniformValue::Vec3(v) => gl.uniform_3_f32(location, v.x, v.y, v.z),
                UniformValue::Mat4(m) => gl.uniform_matrix_4_f32_slice(location, false, m.as_slice()),
            }
        }
    }

    fn create_texture(&mut self, image: &ImageData) -> RenderResult<TextureHandle> {
        let gl = &self.gl;
        let texture = unsafe {
            let texture = gl.create_texture().map_err(RenderError::ResourceCreationFailed)?;
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                image.width as i32,
                image.height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(&image.data),
            );
            gl.generate_mipmap(glow::TEXTURE_2D);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR_MIPMAP_LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.bind_texture(glow::TEXTURE_2D, None);
            texture
        };
        Ok(self.textures.insert(texture))
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        let gl_texture = texture.and_then(|t| self.textures.get(t)).copied();
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, gl_texture);
        }
    }

    fn bind_image(&mut self, unit: u32, texture: TextureHandle, access: ImageAccess) {
        let Some(gl_texture) = self.textures.get(texture).copied() else {
            log::warn!("bind_image: unknown texture {:?}", texture);
            return;
        };
        let access = match access {
            ImageAccess::ReadOnly => glow::READ_ONLY,
            ImageAccess::WriteOnly => glow::WRITE_ONLY,
        };
        unsafe {
            self.gl
                .bind_image_texture(unit, gl_texture, 0, false, 0, access, glow::RGBA32F);
        }
    }

    fn dispatch_compute(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) {
        unsafe {
            self.gl.dispatch_compute(groups_x, groups_y, groups_z);
        }
    }

    fn memory_barrier(&mut self) {
        unsafe {
            self.gl
                .memory_barrier(glow::SHADER_IMAGE_ACCESS_BARRIER_BIT | glow::TEXTURE_FETCH_BARRIER_BIT);
        }
    }

    fn create_mesh(&mut self, mesh: &Mesh) -> RenderResult<MeshHandle> {
        let gl = &self.gl;
        let stride = std::mem::size_of::<Vertex>() as i32;

        let gl_mesh = unsafe {
            let vao = gl.create_vertex_array().map_err(RenderError::ResourceCreationFailed)?;
            gl.bind_vertex_array(Some(vao));

            let vertex_buffer = gl.create_buffer().map_err(RenderError::ResourceCreationFailed)?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertex_buffer));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&mesh.vertices),
                glow::STATIC_DRAW,
            );

            for attribute in VertexAttribute::ALL {
                gl.enable_vertex_attrib_array(attribute.location());
                gl.vertex_attrib_pointer_f32(
                    attribute.location(),
                    attribute.components(),
                    glow::FLOAT,
                    false,
                    stride,
                    attribute.offset(),
                );
            }

            let index_buffer = gl.create_buffer().map_err(RenderError::ResourceCreationFailed)?;
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_buffer));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&mesh.indices),
                glow::STATIC_DRAW,
            );

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);

            GlMesh {
                vao,
                vertex_buffer,
                index_buffer,
                index_count: mesh.indices.len() as i32,
            }
        };

        Ok(self.meshes.insert(gl_mesh))
    }

    fn draw_mesh(&mut self, mesh: MeshHandle) {
        let Some(gl_mesh) = self.meshes.get(mesh) else {
            log::warn!("Draw requested for an unknown mesh");
            return;
        };
        unsafe {
            self.gl.bind_vertex_array(Some(gl_mesh.vao));
            self.gl
                .draw_elements(glow::TRIANGLES, gl_mesh.index_count, glow::UNSIGNED_INT, 0);
            self.gl.bind_vertex_array(None);
        }
    }

    fn draw_fullscreen(&mut self) {
        unsafe {
            self.gl.bind_vertex_array(Some(self.fullscreen_vao));
            self.gl.draw_arrays(glow::TRIANGLES, 0, 3);
            self.gl.bind_vertex_array(None);
        }
    }

    fn poll_error(&mut self) -> Option<u32> {
        let code = unsafe { self.gl.get_error() };
        (code != glow::NO_ERROR).then_some(code)
    }
}

/// Create `count` objects in order. If one fails, every object already created
/// is passed to `release` before the error is returned.
fn create_all<T, E>(
    count: usize,
    mut create: impl FnMut(usize) -> Result<T, E>,
    mut release: impl FnMut(T),
) -> Result<Vec<T>, E> {
    let mut created = Vec::with_capacity(count);
    for i in 0..count {
        match create(i) {
            Ok(object) => created.push(object),
            Err(e) => {
                created.into_iter().for_each(&mut release);
                return Err(e);
            }
        }
    }
    Ok(created)
}

impl Drop for GlDevice {
    fn drop(&mut self) {
        let gl = &self.gl;
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.use_program(None);

            for (_, mesh) in self.meshes.drain() {
                gl.delete_vertex_array(mesh.vao);
                gl.delete_buffer(mesh.vertex_buffer);
                gl.delete_buffer(mesh.index_buffer);
            }
            for (_, target) in self.targets.drain() {
                gl.delete_framebuffer(target.framebuffer);
                gl.delete_renderbuffer(target.depth);
            }
            for (_, texture) in self.textures.drain() {
                gl.delete_texture(texture);
            }
            for (_, program) in self.programs.drain() {
                gl.delete_program(program);
            }
            gl.delete_vertex_array(self.fullscreen_vao);
        }
        log::debug!("Released OpenGL device resources");
    }
}
