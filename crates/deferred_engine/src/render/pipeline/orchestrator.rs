//! Deferred pipeline orchestrator
//!
//! [`DeferredPipeline`] owns every long-lived GPU resource of the renderer
//! (shader programs, material textures, offscreen targets) and executes the
//! pass plan once per frame. Each raster pass binds its output through a
//! [`TargetBinding`](crate::render::TargetBinding) guard and its program through
//! a [`ProgramBinding`](crate::render::ProgramBinding) guard, so both are
//! released on every exit path. Every sampled target goes through the
//! [`FrameLedger`] first, which rejects reads that no earlier pass fed.

use std::path::Path;

use crate::core::{LightingConfig, RendererConfig, TargetConfig};
use crate::foundation::math::Mat4;
use crate::frame::FrameState;
use crate::render::api::{check_errors, GraphicsDevice, ImageAccess, RasterState, TargetLayout, UniformValue};
use crate::render::render_target::RenderTarget;
use crate::render::scene::{ActiveProgram, SceneDrawable};
use crate::render::shader::ShaderProgram;
use crate::render::texture::Texture;
use crate::render::{RenderError, RenderResult};

use super::blur;
use super::ledger::FrameLedger;
use super::passes::{plan_frame, validate_plan, FrameExtents, PassDescriptor, PassKind, PassOutput, TargetId};
use super::uniforms::{names, units, GBufferChannel, MaterialTexture};

/// The seven linked programs used by the frame
#[derive(Debug)]
pub struct PipelinePrograms {
    /// Light-space depth
    pub shadow: ShaderProgram,
    /// Upper and lower reflections
    pub reflection: ShaderProgram,
    /// G-buffer fill
    pub gbuffer: ShaderProgram,
    /// Full-screen deferred shading
    pub lighting: ShaderProgram,
    /// Full-screen additive point lights
    pub local_lights: ShaderProgram,
    /// Horizontal blur dispatch
    pub blur_horizontal: ShaderProgram,
    /// Vertical blur dispatch
    pub blur_vertical: ShaderProgram,
}

impl PipelinePrograms {
    /// Source files per program, in attach order
    pub const SOURCES: [(&'static str, &'static [&'static str]); 7] = [
        ("shadow", &["shadow.vert", "shadow.frag"]),
        ("reflection", &["reflect.vert", "reflect.frag", "brdf.frag"]),
        ("gbuffer", &["gbuffer.vert", "gbuffer.frag"]),
        ("lighting", &["final.vert", "final.frag", "brdf.frag"]),
        ("local_lights", &["final.vert", "locallight.frag", "brdf.frag"]),
        ("blur_horizontal", &["blurH.comp"]),
        ("blur_vertical", &["blurV.comp"]),
    ];

    /// Compile and link every program, fetching each source file through `read`
    pub fn build<D, F>(device: &mut D, mut read: F) -> RenderResult<Self>
    where
        D: GraphicsDevice + ?Sized,
        F: FnMut(&str) -> RenderResult<String>,
    {
        let [shadow, reflection, gbuffer, lighting, local_lights, blur_horizontal, blur_vertical] = Self::SOURCES;
        Ok(Self {
            shadow: link_sources(device, &mut read, shadow)?,
            reflection: link_sources(device, &mut read, reflection)?,
            gbuffer: link_sources(device, &mut read, gbuffer)?,
            lighting: link_sources(device, &mut read, lighting)?,
            local_lights: link_sources(device, &mut read, local_lights)?,
            blur_horizontal: link_sources(device, &mut read, blur_horizontal)?,
            blur_vertical: link_sources(device, &mut read, blur_vertical)?,
        })
    }

    /// Build every program from files under `dir`
    pub fn load<D: GraphicsDevice + ?Sized>(device: &mut D, dir: &Path) -> RenderResult<Self> {
        log::info!("Loading shader programs from {:?}", dir);
        let mut link = |(name, files): (&str, &[&str])| {
            let paths: Vec<_> = files.iter().map(|file| dir.join(file)).collect();
            ShaderProgram::from_files(&mut *device, name, &paths)
        };

        let [shadow, reflection, gbuffer, lighting, local_lights, blur_horizontal, blur_vertical] = Self::SOURCES;
        Ok(Self {
            shadow: link(shadow)?,
            reflection: link(reflection)?,
            gbuffer: link(gbuffer)?,
            lighting: link(lighting)?,
            local_lights: link(local_lights)?,
            blur_horizontal: link(blur_horizontal)?,
            blur_vertical: link(blur_vertical)?,
        })
    }

    /// Program that runs `pass`
    pub fn for_pass(&self, pass: PassKind) -> &ShaderProgram {
        match pass {
            PassKind::Shadow => &self.shadow,
            PassKind::UpperReflection | PassKind::LowerReflection => &self.reflection,
            PassKind::BlurHorizontal => &self.blur_horizontal,
            PassKind::BlurVertical => &self.blur_vertical,
            PassKind::GeometryBuffer => &self.gbuffer,
            PassKind::Lighting => &self.lighting,
            PassKind::LocalLights => &self.local_lights,
        }
    }
}

fn link_sources<D, F>(device: &mut D, read: &mut F, (name, files): (&str, &[&str])) -> RenderResult<ShaderProgram>
where
    D: GraphicsDevice + ?Sized,
    F: FnMut(&str) -> RenderResult<String>,
{
    let mut program = ShaderProgram::new(name);
    for &file in files {
        program.add_stage_source(file, read(file)?)?;
    }
    program.link(device)?;
    Ok(program)
}

/// Material textures and normal maps, indexed by [`MaterialTexture`]
#[derive(Debug)]
pub struct MaterialSet {
    textures: Vec<Texture>,
}

impl MaterialSet {
    /// Load every material from `dir`, substituting solid colors for missing files
    pub fn load<D: GraphicsDevice + ?Sized>(device: &mut D, dir: &Path) -> RenderResult<Self> {
        let textures = MaterialTexture::ALL
            .iter()
            .map(|m| Texture::load_or_solid(device, dir.join(m.file_name()), m.fallback_color()))
            .collect::<RenderResult<Vec<_>>>()?;
        log::info!("Loaded {} material textures from {:?}", textures.len(), dir);
        Ok(Self { textures })
    }

    /// Texture for `material`
    pub fn get(&self, material: MaterialTexture) -> &Texture {
        &self.textures[material.index()]
    }
}

/// Offscreen targets, created once and kept for the life of the pipeline
#[derive(Debug)]
pub struct PipelineTargets {
    /// Light-space depth
    pub shadow: RenderTarget,
    /// Upper hemisphere reflection
    pub upper_reflection: RenderTarget,
    /// Lower hemisphere reflection
    pub lower_reflection: RenderTarget,
    /// Horizontal blur output
    pub blur_scratch: RenderTarget,
    /// Blurred shadow map
    pub compiled_shadow: RenderTarget,
    /// Position, normal, Kd, Ks
    pub gbuffer: RenderTarget,
}

impl PipelineTargets {
    /// Allocate every target; the G-buffer takes `gbuffer_extent`
    pub fn create<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        config: &TargetConfig,
        gbuffer_extent: (u32, u32),
    ) -> RenderResult<Self> {
        let shadow = config.shadow_size;
        let reflection = config.reflection_size;

        Ok(Self {
            shadow: RenderTarget::create(device, shadow, shadow, TargetLayout::Single)?,
            upper_reflection: RenderTarget::create(device, reflection, reflection, TargetLayout::Single)?,
            lower_reflection: RenderTarget::create(device, reflection, reflection, TargetLayout::Single)?,
            blur_scratch: RenderTarget::create(device, shadow, shadow, TargetLayout::Single)?,
            compiled_shadow: RenderTarget::create(device, shadow, shadow, TargetLayout::Single)?,
            gbuffer: RenderTarget::create(device, gbuffer_extent.0, gbuffer_extent.1, TargetLayout::GBuffer)?,
        })
    }

    /// Target behind `id`
    pub fn get(&self, id: TargetId) -> &RenderTarget {
        match id {
            TargetId::Shadow => &self.shadow,
            TargetId::UpperReflection => &self.upper_reflection,
            TargetId::LowerReflection => &self.lower_reflection,
            TargetId::BlurScratch => &self.blur_scratch,
            TargetId::CompiledShadow => &self.compiled_shadow,
            TargetId::GBuffer => &self.gbuffer,
        }
    }

    fn extents(&self, screen: (u32, u32)) -> FrameExtents {
        FrameExtents {
            shadow: self.shadow.width(),
            reflection: self.upper_reflection.width(),
            gbuffer: (self.gbuffer.width(), self.gbuffer.height()),
            screen,
        }
    }
}

/// The multi-pass deferred renderer
#[derive(Debug)]
pub struct DeferredPipeline {
    programs: PipelinePrograms,
    materials: MaterialSet,
    targets: PipelineTargets,
    lighting: LightingConfig,
    blur_half_width: u32,
    ledger: FrameLedger,
}

impl DeferredPipeline {
    /// Load programs and materials from the configured directories and
    /// allocate every target. The G-buffer is sized to `screen`.
    pub fn new<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        config: &RendererConfig,
        screen: (u32, u32),
    ) -> RenderResult<Self> {
        let programs = PipelinePrograms::load(device, Path::new(&config.shader_dir))?;
        let materials = MaterialSet::load(device, Path::new(&config.texture_dir))?;
        let targets = PipelineTargets::create(device, &config.targets, screen)?;
        Ok(Self::from_parts(programs, materials, targets, config))
    }

    /// Assemble from already-created resources
    pub fn from_parts(
        programs: PipelinePrograms,
        materials: MaterialSet,
        targets: PipelineTargets,
        config: &RendererConfig,
    ) -> Self {
        Self {
            programs,
            materials,
            targets,
            lighting: config.lighting.clone(),
            blur_half_width: config.blur.half_width,
            ledger: FrameLedger::new(),
        }
    }

    /// Offscreen targets
    pub fn targets(&self) -> &PipelineTargets {
        &self.targets
    }

    /// Write/read history of the last frame
    pub fn ledger(&self) -> &FrameLedger {
        &self.ledger
    }

    /// Render one frame.
    ///
    /// `frame` must already be advanced. The scene receives the frame's
    /// animation rotation, then every pass of the plan for `frame.mode` runs in
    /// order. The first error aborts the frame with all bindings released.
    pub fn render_frame<S>(&mut self, device: &mut dyn GraphicsDevice, scene: &mut S, frame: &FrameState) -> RenderResult<()>
    where
        S: SceneDrawable + ?Sized,
    {
        scene.set_animation(&frame.animation);

        let extents = self.targets.extents((frame.width, frame.height));
        let plan = plan_frame(frame.mode, &extents, self.lighting.clear_color);
        validate_plan(&plan)?;

        self.ledger.begin_frame();
        let mut context = PassContext {
            programs: &self.programs,
            materials: &self.materials,
            targets: &self.targets,
            lighting: &self.lighting,
            ledger: &mut self.ledger,
            frame,
            blur_half_width: blur::effective_half_width(frame.mode, self.blur_half_width),
        };

        for pass in &plan {
            context.run(device, pass, &*scene)?;
        }
        Ok(())
    }
}

/// Borrowed view of the pipeline for the duration of one frame
struct PassContext<'a> {
    programs: &'a PipelinePrograms,
    materials: &'a MaterialSet,
    targets: &'a PipelineTargets,
    lighting: &'a LightingConfig,
    ledger: &'a mut FrameLedger,
    frame: &'a FrameState,
    blur_half_width: u32,
}

impl<'a> PassContext<'a> {
    fn run<S: SceneDrawable + ?Sized>(
        &mut self,
        device: &mut dyn GraphicsDevice,
        pass: &PassDescriptor,
        scene: &S,
    ) -> RenderResult<()> {
        log::trace!("Running {}", pass.kind.label());
        let output = match pass.output {
            PassOutput::Target(id) => Some(id),
            PassOutput::Screen => None,
        };
        self.ledger.begin_output(output);

        if pass.kind.is_compute() {
            self.blur(device, pass)?;
        } else {
            let result = match output {
                Some(id) => {
                    let mut bound = self.targets.get(id).bind(&mut *device)?;
                    self.raster(&mut *bound, pass, scene)
                }
                None => self.raster(&mut *device, pass, scene),
            };
            if pass.state != RasterState::OPAQUE {
                device.set_raster_state(RasterState::OPAQUE);
            }
            result?;
        }

        check_errors(device, pass.kind.label())?;
        self.ledger.finish_output(pass.kind);
        Ok(())
    }

    fn raster<S: SceneDrawable + ?Sized>(
        &mut self,
        device: &mut dyn GraphicsDevice,
        pass: &PassDescriptor,
        scene: &S,
    ) -> RenderResult<()> {
        device.set_viewport(pass.viewport);
        device.set_raster_state(pass.state);
        if let Some(color) = pass.clear {
            device.clear(color);
        }

        let programs = self.programs;
        let mut active = programs.for_pass(pass.kind).activate(device)?;
        let frame = self.frame;
        let identity = Mat4::identity();

        match pass.kind {
            PassKind::Shadow => {
                active.set_mat4(names::PROJ, &frame.shadow.projection);
                active.set_mat4(names::VIEW, &frame.shadow.view);
                scene.draw(&mut active, &identity)
            }
            PassKind::UpperReflection | PassKind::LowerReflection => {
                let upper = pass.kind == PassKind::UpperReflection;
                self.set_light_uniforms(&mut active);
                active.set_float(names::REFLECTION_SIGN, if upper { 1.0 } else { -1.0 });
                if upper {
                    active.set_float(names::TIME, frame.elapsed as f32);
                }
                self.sample(&mut active, pass.kind, TargetId::Shadow, names::SHADOW_MAP, units::SHADOW_MAP)?;
                if upper {
                    self.bind_materials(&mut active, &[MaterialTexture::Sky]);
                } else {
                    self.bind_materials(&mut active, &MaterialTexture::ALL);
                }
                scene.draw_nonreflective(&mut active, &identity)
            }
            PassKind::GeometryBuffer => {
                self.set_camera_uniforms(&mut active);
                active.set_vec3(names::LIGHT_POS, frame.light_pos);
                active.set_int(names::MODE, frame.mode);
                active.set_float(names::TIME, frame.elapsed as f32);
                active.set_mat4(names::SHADOW_MATRIX, &frame.shadow.shadow_matrix);
                self.sample(&mut active, pass.kind, TargetId::Shadow, names::SHADOW_MAP, units::SHADOW_MAP)?;
                self.sample_reflections(&mut active, pass.kind)?;
                self.bind_materials(&mut active, &MaterialTexture::ALL);
                scene.draw(&mut active, &identity)
            }
            PassKind::Lighting => {
                self.set_camera_uniforms(&mut active);
                self.set_light_uniforms(&mut active);
                active.set_float(names::TIME, frame.elapsed as f32);
                self.sample(&mut active, pass.kind, TargetId::Shadow, names::SHADOW_MAP, units::SHADOW_MAP)?;
                self.sample_reflections(&mut active, pass.kind)?;
                self.bind_materials(&mut active, &[MaterialTexture::Sky]);
                self.sample_gbuffer(&mut active, pass.kind)?;
                self.sample(
                    &mut active,
                    pass.kind,
                    TargetId::CompiledShadow,
                    names::CHOLESKY_MAP,
                    units::CHOLESKY_MAP,
                )?;
                active.draw_fullscreen();
                Ok(())
            }
            PassKind::LocalLights => {
                active.set_mat4(names::WORLD_VIEW, &frame.world_view);
                active.set_mat4(names::WORLD_INVERSE, &frame.world_inverse);
                active.set_int(names::MODE, frame.mode);
                self.sample_gbuffer(&mut active, pass.kind)?;
                for light in &self.lighting.local_lights {
                    active.set_vec3(names::LOCAL_LIGHT_POS, light.position);
                    active.set_vec3(names::LOCAL_LIGHT_COLOR, light.color);
                    active.set_float(names::LOCAL_LIGHT_RADIUS, light.radius);
                    active.draw_fullscreen();
                }
                Ok(())
            }
            PassKind::BlurHorizontal | PassKind::BlurVertical => Err(RenderError::MalformedPass {
                pass: pass.kind,
                reason: "compute pass routed to the raster path",
            }),
        }
    }

    /// One separable blur dispatch from the pass's input into its output
    fn blur(&mut self, device: &mut dyn GraphicsDevice, pass: &PassDescriptor) -> RenderResult<()> {
        let (Some(&source), PassOutput::Target(destination)) = (pass.inputs.first(), pass.output) else {
            return Err(RenderError::MalformedPass {
                pass: pass.kind,
                reason: "blur needs one input and an offscreen output",
            });
        };

        let (width, height) = (pass.viewport.width, pass.viewport.height);
        let groups = match pass.kind {
            PassKind::BlurHorizontal => (blur::group_count(width), height, 1),
            _ => (width, blur::group_count(height), 1),
        };

        self.ledger.record_read(pass.kind, source)?;
        let half_width = self.blur_half_width;

        let mut active = self.programs.for_pass(pass.kind).activate(device)?;
        active.set_uniform(names::BLUR_WEIGHTS, UniformValue::FloatArray(blur::padded_kernel(half_width)));
        active.set_int(names::BLUR_HALF_WIDTH, half_width as i32);
        active.bind_image(units::BLUR_SOURCE, self.targets.get(source).texture(), ImageAccess::ReadOnly);
        active.bind_image(
            units::BLUR_DESTINATION,
            self.targets.get(destination).texture(),
            ImageAccess::WriteOnly,
        );
        active.dispatch_compute(groups.0, groups.1, groups.2);
        active.memory_barrier();
        Ok(())
    }

    fn set_camera_uniforms(&self, active: &mut ActiveProgram<'_, '_>) {
        active.set_mat4(names::WORLD_PROJ, &self.frame.world_proj);
        active.set_mat4(names::WORLD_VIEW, &self.frame.world_view);
        active.set_mat4(names::WORLD_INVERSE, &self.frame.world_inverse);
    }

    fn set_light_uniforms(&self, active: &mut ActiveProgram<'_, '_>) {
        let frame = self.frame;
        active.set_vec3(names::LIGHT_POS, frame.light_pos);
        active.set_int(names::MODE, frame.mode);
        active.set_vec3(names::LIGHT, self.lighting.light);
        active.set_vec3(names::AMBIENT, self.lighting.ambient);
        active.set_mat4(names::SHADOW_MATRIX, &frame.shadow.shadow_matrix);
    }

    fn bind_materials(&self, active: &mut ActiveProgram<'_, '_>, materials: &[MaterialTexture]) {
        for &material in materials {
            active.bind_sampler(material.uniform(), material.unit(), self.materials.get(material).handle());
        }
    }

    /// Bind a target's color texture as a sampler, recording the read
    fn sample(
        &mut self,
        active: &mut ActiveProgram<'_, '_>,
        pass: PassKind,
        target: TargetId,
        name: &str,
        unit: u32,
    ) -> RenderResult<()> {
        self.ledger.record_read(pass, target)?;
        active.bind_sampler(name, unit, self.targets.get(target).texture());
        Ok(())
    }

    fn sample_reflections(&mut self, active: &mut ActiveProgram<'_, '_>, pass: PassKind) -> RenderResult<()> {
        self.sample(active, pass, TargetId::UpperReflection, names::UPPER_REFLECT, units::UPPER_REFLECT)?;
        self.sample(active, pass, TargetId::LowerReflection, names::LOWER_REFLECT, units::LOWER_REFLECT)
    }

    fn sample_gbuffer(&mut self, active: &mut ActiveProgram<'_, '_>, pass: PassKind) -> RenderResult<()> {
        self.ledger.record_read(pass, TargetId::GBuffer)?;
        let gbuffer = &self.targets.gbuffer;
        for channel in GBufferChannel::ALL {
            let texture = gbuffer.color(channel.attachment()).ok_or_else(|| RenderError::MalformedPass {
                pass,
                reason: "G-buffer target is missing a channel",
            })?;
            active.bind_sampler(channel.uniform(), channel.unit(), texture);
        }
        Ok(())
    }
}
