//! Shader programs
//!
//! A [`ShaderProgram`] accumulates stages, links exactly once, and is then
//! activated per pass through a [`ProgramBinding`] guard. Uniforms are set by
//! name on the active binding.

use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use crate::assets::AssetError;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::api::{check_errors, GraphicsDevice, ProgramHandle, ShaderStage, StageKind, TextureHandle, UniformValue};
use crate::render::mesh::VertexAttribute;
use crate::render::{RenderError, RenderResult};

/// A set of shader stages linked into one program
#[derive(Debug)]
pub struct ShaderProgram {
    name: String,
    stages: Vec<ShaderStage>,
    handle: Option<ProgramHandle>,
}

impl ShaderProgram {
    /// Empty, unlinked program
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            handle: None,
        }
    }

    /// Build and link a program from source files.
    ///
    /// Each path's extension selects its stage (`.vert`, `.frag`, `.comp`).
    pub fn from_files<D, P>(device: &mut D, name: &str, paths: &[P]) -> RenderResult<Self>
    where
        D: GraphicsDevice + ?Sized,
        P: AsRef<Path>,
    {
        let mut program = Self::new(name);
        for path in paths {
            program.add_stage_file(path)?;
        }
        program.link(device)?;
        Ok(program)
    }

    /// Program name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether [`link`](Self::link) has succeeded
    pub fn is_linked(&self) -> bool {
        self.handle.is_some()
    }

    /// Device handle once linked
    pub fn handle(&self) -> Option<ProgramHandle> {
        self.handle
    }

    /// Attach a stage from source text. Stages cannot be added after linking.
    pub fn add_stage(&mut self, kind: StageKind, label: impl Into<String>, source: impl Into<String>) -> RenderResult<()> {
        if self.is_linked() {
            return Err(self.lifecycle("stages cannot be added after linking"));
        }
        self.stages.push(ShaderStage {
            kind,
            label: label.into(),
            source: source.into(),
        });
        Ok(())
    }

    /// Attach a stage read from `path`
    pub fn add_stage_file<P: AsRef<Path>>(&mut self, path: P) -> RenderResult<()> {
        let path = path.as_ref();
        let kind = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(StageKind::from_extension)
            .ok_or_else(|| RenderError::UnknownShaderStage(path.display().to_string()))?;

        if !path.exists() {
            return Err(AssetError::NotFound(path.display().to_string()).into());
        }
        let source = fs::read_to_string(path).map_err(AssetError::from)?;

        log::debug!("Adding {} stage {:?} to program {}", kind, path, self.name);
        self.add_stage(kind, path.display().to_string(), source)
    }

    /// Attach a stage whose kind is taken from `file_name`'s extension
    pub fn add_stage_source(&mut self, file_name: &str, source: impl Into<String>) -> RenderResult<()> {
        let kind = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(StageKind::from_extension)
            .ok_or_else(|| RenderError::UnknownShaderStage(file_name.to_string()))?;
        self.add_stage(kind, file_name, source)
    }

    /// Compile and link all attached stages.
    ///
    /// Vertex attributes are bound to their fixed locations first. Linking a
    /// second time, or with no stages, is an error.
    #[track_caller]
    pub fn link<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) -> RenderResult<()> {
        if self.is_linked() {
            return Err(self.lifecycle("program is already linked"));
        }
        if self.stages.is_empty() {
            return Err(self.lifecycle("cannot link a program with no stages"));
        }

        let is_compute = self.stages.iter().any(|s| s.kind == StageKind::Compute);
        let attributes: Vec<(u32, &str)> = if is_compute {
            Vec::new()
        } else {
            VertexAttribute::ALL.iter().map(|a| (a.location(), a.name())).collect()
        };

        let handle = device.link_program(&self.stages, &attributes).map_err(|e| match e {
            RenderError::ShaderLink { log, .. } => RenderError::ShaderLink {
                program: self.name.clone(),
                log,
            },
            other => other,
        })?;
        check_errors(device, "program link")?;

        log::info!("Linked shader program {} ({} stages)", self.name, self.stages.len());
        self.handle = Some(handle);
        Ok(())
    }

    /// Make this program current until the returned guard drops.
    ///
    /// Fails if the program is not linked or another program is active.
    pub fn activate<'d, D: GraphicsDevice + ?Sized>(&self, device: &'d mut D) -> RenderResult<ProgramBinding<'d, D>> {
        let handle = self
            .handle
            .ok_or_else(|| self.lifecycle("program used before it was linked"))?;

        if device.active_program().is_some() {
            return Err(RenderError::ProgramAlreadyActive {
                requested: self.name.clone(),
            });
        }

        device.use_program(Some(handle));
        Ok(ProgramBinding { device, program: handle })
    }

    fn lifecycle(&self, reason: &'static str) -> RenderError {
        RenderError::ProgramLifecycle {
            program: self.name.clone(),
            reason,
        }
    }
}

/// Scope during which a program is current.
///
/// Derefs to the device so draws can be issued through it.
pub struct ProgramBinding<'d, D: GraphicsDevice + ?Sized> {
    device: &'d mut D,
    program: ProgramHandle,
}

impl<'d, D: GraphicsDevice + ?Sized> ProgramBinding<'d, D> {
    /// The active program
    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// Assign a uniform by name
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.device.set_uniform(self.program, name, &value);
    }

    /// `int` uniform
    pub fn set_int(&mut self, name: &str, value: i32) {
        self.set_uniform(name, UniformValue::Int(value));
    }

    /// `float` uniform
    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set_uniform(name, UniformValue::Float(value));
    }

    /// `vec3` uniform
    pub fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.set_uniform(name, UniformValue::Vec3(value));
    }

    /// `mat4` uniform
    pub fn set_mat4(&mut self, name: &str, value: &Mat4) {
        self.set_uniform(name, UniformValue::Mat4(*value));
    }

    /// Bind `texture` to `unit` and point sampler `name` at that unit
    pub fn bind_sampler(&mut self, name: &str, unit: u32, texture: TextureHandle) {
        self.device.bind_texture(unit, Some(texture));
        self.set_int(name, unit as i32);
    }
}

impl<'d, D: GraphicsDevice + ?Sized> Deref for ProgramBinding<'d, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.device
    }
}

impl<'d, D: GraphicsDevice + ?Sized> DerefMut for ProgramBinding<'d, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.device
    }
}

impl<'d, D: GraphicsDevice + ?Sized> Drop for ProgramBinding<'d, D> {
    fn drop(&mut self) {
        self.device.use_program(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::recording::{Command, RecordingDevice};

    fn linked(device: &mut RecordingDevice, name: &str) -> ShaderProgram {
        let mut program = ShaderProgram::new(name);
        program.add_stage(StageKind::Vertex, "test.vert", "void main() {}").unwrap();
        program.add_stage(StageKind::Fragment, "test.frag", "void main() {}").unwrap();
        program.link(device).unwrap();
        program
    }

    #[test]
    fn test_link_binds_vertex_attributes() {
        let mut device = RecordingDevice::new();
        let program = linked(&mut device, "lighting");
        assert!(program.is_linked());

        let attributes = device
            .commands()
            .iter()
            .find_map(|c| match c {
                Command::LinkProgram { attributes, .. } => Some(attributes.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            attributes,
            vec![
                (0, "vertex".to_string()),
                (1, "vertexNormal".to_string()),
                (2, "vertexTexture".to_string()),
                (3, "vertexTangent".to_string()),
            ]
        );
    }

    #[test]
    fn test_relink_is_rejected() {
        let mut device = RecordingDevice::new();
        let mut program = linked(&mut device, "shadow");
        let err = program.link(&mut device).unwrap_err();
        assert!(matches!(err, RenderError::ProgramLifecycle { .. }));
    }

    #[test]
    fn test_stage_after_link_is_rejected() {
        let mut device = RecordingDevice::new();
        let mut program = linked(&mut device, "shadow");
        assert!(program.add_stage(StageKind::Vertex, "late.vert", "").is_err());
    }

    #[test]
    fn test_empty_program_cannot_link() {
        let mut device = RecordingDevice::new();
        let mut program = ShaderProgram::new("empty");
        assert!(matches!(
            program.link(&mut device),
            Err(RenderError::ProgramLifecycle { .. })
        ));
    }

    #[test]
    fn test_use_before_link_is_rejected() {
        let mut device = RecordingDevice::new();
        let program = ShaderProgram::new("unlinked");
        assert!(program.activate(&mut device).is_err());
        assert_eq!(device.active_program(), None);
    }

    #[test]
    fn test_compile_failure_is_reported() {
        let mut device = RecordingDevice::new();
        device.fail_next_compile("0:1: syntax error");

        let mut program = ShaderProgram::new("broken");
        program.add_stage(StageKind::Fragment, "broken.frag", "oops").unwrap();
        match program.link(&mut device) {
            Err(RenderError::ShaderCompile { stage, log, .. }) => {
                assert_eq!(stage, StageKind::Fragment);
                assert!(log.contains("syntax error"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!program.is_linked());
    }

    #[test]
    fn test_link_failure_names_the_program() {
        let mut device = RecordingDevice::new();
        device.fail_next_link("error: vertex output 'uv' not read by fragment shader");

        let mut program = ShaderProgram::new("gbuffer");
        program.add_stage(StageKind::Vertex, "gbuffer.vert", "void main() {}").unwrap();
        program.add_stage(StageKind::Fragment, "gbuffer.frag", "void main() {}").unwrap();
        match program.link(&mut device) {
            Err(RenderError::ShaderLink { program: name, log }) => {
                assert_eq!(name, "gbuffer");
                assert!(log.contains("not read"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!program.is_linked());
        assert!(program.activate(&mut device).is_err());
    }

    #[test]
    fn test_activation_is_paired() {
        let mut device = RecordingDevice::new();
        let program = linked(&mut device, "reflect");

        {
            let mut active = program.activate(&mut device).unwrap();
            active.set_float("S", -1.0);
            assert_eq!(active.active_program(), program.handle());
        }
        assert_eq!(device.active_program(), None);
        assert_eq!(device.commands().last(), Some(&Command::UseProgram(None)));
    }

    #[test]
    fn test_second_active_program_is_rejected() {
        let mut device = RecordingDevice::new();
        let first = linked(&mut device, "first");
        let second = linked(&mut device, "second");

        let mut active = first.activate(&mut device).unwrap();
        let err = second.activate(&mut *active).err().unwrap();
        assert!(matches!(err, RenderError::ProgramAlreadyActive { .. }));
    }

    #[test]
    fn test_bind_sampler_sets_unit() {
        let mut device = RecordingDevice::new();
        let program = linked(&mut device, "lighting");
        let texture = device.create_texture(&crate::assets::ImageData::solid_color(1, 1, [0; 4])).unwrap();

        let mut active = program.activate(&mut device).unwrap();
        active.bind_sampler("shadowMap", 2, texture);
        drop(active);

        assert!(device.commands().contains(&Command::BindTexture {
            unit: 2,
            texture: Some(texture)
        }));
        assert_eq!(device.uniform("shadowMap"), Some(&UniformValue::Int(2)));
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let mut program = ShaderProgram::new("odd");
        assert!(matches!(
            program.add_stage_file("shaders/thing.glsl"),
            Err(RenderError::UnknownShaderStage(_))
        ));
    }

    #[test]
    fn test_stage_source_kind_follows_extension() {
        let mut device = RecordingDevice::new();
        let mut program = ShaderProgram::new("blur");
        program.add_stage_source("blur_h.comp", "void main() {}").unwrap();
        program.link(&mut device).unwrap();

        let attributes = device.commands().iter().find_map(|c| match c {
            Command::LinkProgram { attributes, .. } => Some(attributes.len()),
            _ => None,
        });
        assert_eq!(attributes, Some(0));
        assert!(matches!(
            ShaderProgram::new("x").add_stage_source("blur.txt", ""),
            Err(RenderError::UnknownShaderStage(_))
        ));
    }

    #[test]
    fn test_missing_file_is_an_asset_error() {
        let mut program = ShaderProgram::new("missing");
        assert!(matches!(
            program.add_stage_file("no/such/dir/missing.vert"),
            Err(RenderError::Asset(AssetError::NotFound(_)))
        ));
    }
}
