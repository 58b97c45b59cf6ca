//! Frame-level tests for the deferred pipeline against the recording device

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::path::Path;

    use super::super::*;
    use crate::assets::AssetError;
    use crate::core::{RendererConfig, TargetConfig};
    use crate::foundation::math::Mat4;
    use crate::frame::FrameState;
    use crate::render::backends::recording::{Command, RecordingDevice};
    use crate::render::scene::{ActiveProgram, FlatGround, SceneDrawable};
    use crate::render::{
        GraphicsDevice, ImageAccess, Mesh, MeshHandle, ProgramHandle, RasterState, RenderError, RenderResult,
        UniformValue,
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Draw,
        Nonreflective,
    }

    struct StubScene {
        mesh: MeshHandle,
        animation: Option<Mat4>,
        calls: RefCell<Vec<Call>>,
    }

    impl SceneDrawable for StubScene {
        fn draw(&self, program: &mut ActiveProgram<'_, '_>, _base: &Mat4) -> RenderResult<()> {
            program.draw_mesh(self.mesh);
            self.calls.borrow_mut().push(Call::Draw);
            Ok(())
        }

        fn draw_nonreflective(&self, program: &mut ActiveProgram<'_, '_>, _base: &Mat4) -> RenderResult<()> {
            program.draw_mesh(self.mesh);
            self.calls.borrow_mut().push(Call::Nonreflective);
            Ok(())
        }

        fn set_animation(&mut self, rotation: &Mat4) {
            self.animation = Some(*rotation);
        }
    }

    struct Handles {
        shadow: ProgramHandle,
        reflection: ProgramHandle,
        gbuffer: ProgramHandle,
        lighting: ProgramHandle,
        local_lights: ProgramHandle,
        blur_horizontal: ProgramHandle,
        blur_vertical: ProgramHandle,
    }

    struct Fixture {
        device: RecordingDevice,
        pipeline: DeferredPipeline,
        scene: StubScene,
        frame: FrameState,
        programs: Handles,
    }

    const SHADOW_SIZE: u32 = 256;

    fn fixture() -> Fixture {
        let mut device = RecordingDevice::new();
        let mut config = RendererConfig::default();
        config.targets = TargetConfig {
            shadow_size: SHADOW_SIZE,
            reflection_size: 64,
        };

        let programs = PipelinePrograms::build(&mut device, |file| Ok(format!("// {file}"))).unwrap();
        let handle = |p: &crate::render::ShaderProgram| p.handle().unwrap();
        let handles = Handles {
            shadow: handle(&programs.shadow),
            reflection: handle(&programs.reflection),
            gbuffer: handle(&programs.gbuffer),
            lighting: handle(&programs.lighting),
            local_lights: handle(&programs.local_lights),
            blur_horizontal: handle(&programs.blur_horizontal),
            blur_vertical: handle(&programs.blur_vertical),
        };

        let materials = MaterialSet::load(&mut device, Path::new("no/such/textures")).unwrap();
        let targets = PipelineTargets::create(&mut device, &config.targets, (320, 180)).unwrap();
        let pipeline = DeferredPipeline::from_parts(programs, materials, targets, &config);

        let mesh = device.create_mesh(&Mesh::default()).unwrap();
        let mut frame = FrameState::new(&config, 320, 180);
        frame.advance(0.5, 320, 180, &FlatGround(0.0));

        Fixture {
            device,
            pipeline,
            scene: StubScene {
                mesh,
                animation: None,
                calls: RefCell::new(Vec::new()),
            },
            frame,
            programs: handles,
        }
    }

    fn render(f: &mut Fixture, mode: i32) -> RenderResult<()> {
        f.frame.set_mode(mode);
        f.device.clear_commands();
        f.pipeline.render_frame(&mut f.device, &mut f.scene, &f.frame)
    }

    fn programs_used(device: &RecordingDevice) -> Vec<ProgramHandle> {
        device
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::UseProgram(Some(p)) => Some(*p),
                _ => None,
            })
            .collect()
    }

    fn uniform_names(device: &RecordingDevice, program: ProgramHandle) -> HashSet<String> {
        device
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::SetUniform { program: p, name, .. } if *p == program => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    fn names(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn position(device: &RecordingDevice, from: usize, wanted: &Command) -> Option<usize> {
        device.commands()[from..].iter().position(|c| c == wanted).map(|i| i + from)
    }

    #[test]
    fn test_programs_run_in_pass_order() {
        let mut f = fixture();
        render(&mut f, 1).unwrap();

        let p = &f.programs;
        assert_eq!(
            programs_used(&f.device),
            vec![
                p.shadow,
                p.reflection,
                p.reflection,
                p.blur_horizontal,
                p.blur_vertical,
                p.gbuffer,
                p.lighting,
                p.local_lights,
            ]
        );
    }

    #[test]
    fn test_shadow_is_written_before_it_is_sampled() {
        let mut f = fixture();
        render(&mut f, 1).unwrap();

        // Ledger view: every shadow read follows the shadow write
        let events = f.pipeline.ledger().events();
        let write = events
            .iter()
            .find(|e| e.target == TargetId::Shadow && e.access == Access::Write)
            .unwrap();
        let readers: Vec<PassKind> = events
            .iter()
            .filter(|e| e.target == TargetId::Shadow && e.access == Access::Read)
            .inspect(|e| assert!(e.sequence > write.sequence))
            .map(|e| e.pass)
            .collect();
        for pass in [PassKind::UpperReflection, PassKind::LowerReflection, PassKind::GeometryBuffer] {
            assert!(readers.contains(&pass), "{pass:?} never sampled the shadow map");
        }

        // Command view: the shadow target is unbound before its texture is bound anywhere
        let targets = f.pipeline.targets();
        let shadow_texture = targets.shadow.texture();
        let bind = position(&f.device, 0, &Command::BindRenderTarget(Some(targets.shadow.handle()))).unwrap();
        let unbind = position(&f.device, bind, &Command::BindRenderTarget(None)).unwrap();
        let first_sample = f
            .device
            .commands()
            .iter()
            .position(|c| match c {
                Command::BindTexture { texture: Some(t), .. } => *t == shadow_texture,
                Command::BindImage { texture, .. } => *texture == shadow_texture,
                _ => false,
            })
            .unwrap();
        assert!(unbind < first_sample);
        assert_eq!(f.device.texture_owner(shadow_texture), Some(targets.shadow.handle()));
    }

    #[test]
    fn test_reads_match_declared_inputs() {
        let mut f = fixture();
        render(&mut f, 1).unwrap();

        let plan = plan_frame(1, &FrameExtents {
            shadow: SHADOW_SIZE,
            reflection: 64,
            gbuffer: (320, 180),
            screen: (320, 180),
        }, [0.0; 4]);

        for pass in &plan {
            let read: HashSet<TargetId> = f
                .pipeline
                .ledger()
                .events()
                .iter()
                .filter(|e| e.pass == pass.kind && e.access == Access::Read)
                .map(|e| e.target)
                .collect();
            let declared: HashSet<TargetId> = pass.inputs.iter().copied().collect();
            assert_eq!(read, declared, "{:?}", pass.kind);
        }
    }

    #[test]
    fn test_local_lights_only_for_low_modes() {
        let mut f = fixture();
        let fullscreen = |device: &RecordingDevice| {
            device
                .commands()
                .iter()
                .filter(|c| matches!(c, Command::DrawFullscreen))
                .count()
        };

        render(&mut f, 2).unwrap();
        assert!(programs_used(&f.device).contains(&f.programs.local_lights));
        // Lighting plus one draw per configured light
        assert_eq!(fullscreen(&f.device), 1 + 8);

        render(&mut f, 3).unwrap();
        assert!(!programs_used(&f.device).contains(&f.programs.local_lights));
        assert_eq!(fullscreen(&f.device), 1);
        assert!(!f
            .device
            .commands()
            .contains(&Command::SetRasterState(RasterState::ADDITIVE_BLEND)));
    }

    #[test]
    fn test_mode_two_bypasses_blur() {
        let mut f = fixture();

        render(&mut f, 2).unwrap();
        assert_eq!(f.device.uniform("w"), Some(&UniformValue::Int(0)));
        match f.device.uniform("weights") {
            Some(UniformValue::FloatArray(weights)) => {
                assert_eq!(weights.len(), 101);
                assert_eq!(weights[0], 1.0);
                assert!(weights[1..].iter().all(|&w| w == 0.0));
            }
            other => panic!("unexpected weights: {other:?}"),
        }

        render(&mut f, 1).unwrap();
        assert_eq!(f.device.uniform("w"), Some(&UniformValue::Int(10)));
    }

    #[test]
    fn test_blur_dispatches_cover_the_shadow_map() {
        let mut f = fixture();
        render(&mut f, 1).unwrap();

        let targets = f.pipeline.targets();
        let commands = f.device.commands();
        let dispatches: Vec<(usize, (u32, u32, u32))> = commands
            .iter()
            .enumerate()
            .filter_map(|(i, c)| match c {
                Command::DispatchCompute { x, y, z } => Some((i, (*x, *y, *z))),
                _ => None,
            })
            .collect();

        assert_eq!(dispatches.len(), 2);
        assert_eq!(dispatches[0].1, (2, SHADOW_SIZE, 1));
        assert_eq!(dispatches[1].1, (SHADOW_SIZE, 2, 1));
        for (i, _) in &dispatches {
            assert_eq!(commands[i + 1], Command::MemoryBarrier);
        }

        assert!(commands.contains(&Command::BindImage {
            unit: 0,
            texture: targets.shadow.texture(),
            access: ImageAccess::ReadOnly,
        }));
        assert!(commands.contains(&Command::BindImage {
            unit: 1,
            texture: targets.blur_scratch.texture(),
            access: ImageAccess::WriteOnly,
        }));
        assert!(commands.contains(&Command::BindImage {
            unit: 0,
            texture: targets.blur_scratch.texture(),
            access: ImageAccess::ReadOnly,
        }));
        assert!(commands.contains(&Command::BindImage {
            unit: 1,
            texture: targets.compiled_shadow.texture(),
            access: ImageAccess::WriteOnly,
        }));
    }

    #[test]
    fn test_only_upper_reflection_sets_time() {
        let mut f = fixture();
        render(&mut f, 1).unwrap();
        let reflection = f.programs.reflection;

        let set_on_reflection = |wanted: &str| {
            f.device
                .commands()
                .iter()
                .filter(|c| matches!(c, Command::SetUniform { program, name, .. } if *program == reflection && name == wanted))
                .count()
        };
        assert_eq!(set_on_reflection("S"), 2);
        assert_eq!(set_on_reflection("time"), 1);
    }

    #[test]
    fn test_pass_uniform_sets() {
        let mut f = fixture();
        render(&mut f, 1).unwrap();
        let p = &f.programs;

        assert_eq!(uniform_names(&f.device, p.shadow), names(&["Proj", "View"]));

        let mut reflection = names(&[
            "lightPos", "mode", "S", "Light", "Ambient", "time", "ShadowMatrix", "shadowMap",
        ]);
        reflection.extend(MaterialTexture::ALL.iter().map(|m| m.uniform().to_string()));
        assert_eq!(uniform_names(&f.device, p.reflection), reflection);

        let mut gbuffer = names(&[
            "WorldProj",
            "WorldView",
            "WorldInverse",
            "lightPos",
            "mode",
            "time",
            "ShadowMatrix",
            "shadowMap",
            "upperReflect",
            "lowerReflect",
        ]);
        gbuffer.extend(MaterialTexture::ALL.iter().map(|m| m.uniform().to_string()));
        assert_eq!(uniform_names(&f.device, p.gbuffer), gbuffer);

        assert_eq!(
            uniform_names(&f.device, p.lighting),
            names(&[
                "WorldProj",
                "WorldView",
                "WorldInverse",
                "lightPos",
                "mode",
                "time",
                "Light",
                "Ambient",
                "ShadowMatrix",
                "shadowMap",
                "upperReflect",
                "lowerReflect",
                "skyTex",
                "worldPosMap",
                "normalVecMap",
                "KdMap",
                "KsMap",
                "choleskyMap",
            ])
        );

        assert_eq!(
            uniform_names(&f.device, p.local_lights),
            names(&[
                "WorldView",
                "WorldInverse",
                "mode",
                "worldPosMap",
                "normalVecMap",
                "KdMap",
                "KsMap",
                "localLightPos",
                "localLightColor",
                "localLightRadius",
            ])
        );
    }

    #[test]
    fn test_reflection_sign_per_hemisphere() {
        let mut f = fixture();
        render(&mut f, 1).unwrap();

        let signs: Vec<&UniformValue> = f
            .device
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::SetUniform { name, value, .. } if name == "S" => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(signs, vec![&UniformValue::Float(1.0), &UniformValue::Float(-1.0)]);
    }

    #[test]
    fn test_lighting_texture_units() {
        let mut f = fixture();
        render(&mut f, 3).unwrap();
        let targets = f.pipeline.targets();

        let start = position(&f.device, 0, &Command::UseProgram(Some(f.programs.lighting))).unwrap();
        let lighting = &f.device.commands()[start..];
        let bound = |unit: u32, texture| {
            lighting.contains(&Command::BindTexture {
                unit,
                texture: Some(texture),
            })
        };

        assert!(bound(2, targets.shadow.texture()));
        assert!(bound(3, targets.upper_reflection.texture()));
        assert!(bound(4, targets.lower_reflection.texture()));
        for channel in GBufferChannel::ALL {
            assert!(bound(channel.unit(), targets.gbuffer.color(channel.attachment()).unwrap()));
        }
        assert!(bound(21, targets.compiled_shadow.texture()));
    }

    #[test]
    fn test_clear_policy() {
        let mut f = fixture();
        render(&mut f, 1).unwrap();
        let targets = f.pipeline.targets();

        let bind = position(&f.device, 0, &Command::BindRenderTarget(Some(targets.gbuffer.handle()))).unwrap();
        let clear = f.device.commands()[bind..]
            .iter()
            .find_map(|c| match c {
                Command::Clear(color) => Some(*color),
                _ => None,
            })
            .unwrap();
        assert_eq!(clear, [0.0; 4]);

        let bind = position(&f.device, 0, &Command::BindRenderTarget(Some(targets.shadow.handle()))).unwrap();
        assert_eq!(f.device.commands()[bind + 3], Command::Clear([0.5, 0.5, 0.5, 1.0]));
    }

    #[test]
    fn test_raster_state_restored_after_special_passes() {
        let mut f = fixture();
        render(&mut f, 1).unwrap();

        let shadow_state = Command::SetRasterState(RasterState::DEPTH_TEST | RasterState::CULL_FRONT);
        let set = position(&f.device, 0, &shadow_state).unwrap();
        let restored = position(&f.device, set, &Command::SetRasterState(RasterState::OPAQUE)).unwrap();
        let reflection = position(&f.device, set, &Command::UseProgram(Some(f.programs.reflection))).unwrap();
        assert!(restored < reflection);

        let last_state = f
            .device
            .commands()
            .iter()
            .rev()
            .find(|c| matches!(c, Command::SetRasterState(_)));
        assert_eq!(last_state, Some(&Command::SetRasterState(RasterState::OPAQUE)));
    }

    #[test]
    fn test_scene_draw_entry_points() {
        let mut f = fixture();
        render(&mut f, 1).unwrap();

        assert_eq!(
            *f.scene.calls.borrow(),
            vec![Call::Draw, Call::Nonreflective, Call::Nonreflective, Call::Draw]
        );
        assert_eq!(f.scene.animation, Some(f.frame.animation));
    }

    #[test]
    fn test_graphics_error_aborts_frame_and_releases_bindings() {
        let mut f = fixture();
        f.device.error_on_next_draw(0x0502);

        match render(&mut f, 1) {
            Err(RenderError::Graphics { code, operation, .. }) => {
                assert_eq!(code, 0x0502);
                assert_eq!(operation, "shadow pass");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(f.device.bound_render_target(), None);
        assert_eq!(f.device.active_program(), None);
        assert!(!programs_used(&f.device).contains(&f.programs.reflection));
    }

    #[test]
    fn test_frame_refuses_to_start_inside_a_bound_target() {
        let mut f = fixture();
        let stray = f.pipeline.targets().upper_reflection.handle();
        f.device.bind_render_target(Some(stray));

        assert!(matches!(
            render(&mut f, 1),
            Err(RenderError::NestedTargetBind { current, .. }) if current == stray
        ));
    }

    #[test]
    fn test_consecutive_frames_reset_the_ledger() {
        let mut f = fixture();
        render(&mut f, 1).unwrap();
        let first = f.pipeline.ledger().events().len();
        render(&mut f, 1).unwrap();
        assert_eq!(f.pipeline.ledger().events().len(), first);
        assert_eq!(f.pipeline.ledger().events()[0].sequence, 0);
    }

    #[test]
    fn test_missing_shader_directory_is_fatal() {
        let mut device = RecordingDevice::new();
        assert!(matches!(
            PipelinePrograms::load(&mut device, Path::new("no/such/shaders")),
            Err(RenderError::Asset(AssetError::NotFound(_)))
        ));
    }

    #[test]
    fn test_shader_directory_links_every_program() {
        let mut device = RecordingDevice::new();
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../resources/shaders");
        let programs = PipelinePrograms::load(&mut device, &dir).unwrap();
        assert!(programs.lighting.is_linked() && programs.blur_vertical.is_linked());

        let linked: Vec<Vec<String>> = device
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::LinkProgram { stages, .. } => Some(stages.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(linked.len(), PipelinePrograms::SOURCES.len());
        assert_eq!(linked[1].len(), 3);
        assert!(linked[1][2].ends_with("brdf.frag"));
    }

    #[test]
    fn test_shader_compile_failure_names_the_stage() {
        let mut device = RecordingDevice::new();
        device.fail_next_compile("0:3: 'Proj' : undeclared identifier");
        match PipelinePrograms::build(&mut device, |file| Ok(format!("// {file}"))) {
            Err(RenderError::ShaderCompile { label, log, .. }) => {
                assert_eq!(label, "shadow.vert");
                assert!(log.contains("undeclared"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_incomplete_target_aborts_setup() {
        let mut device = RecordingDevice::new();
        device.fail_next_target();
        assert!(matches!(
            PipelineTargets::create(&mut device, &TargetConfig::default(), (1280, 720)),
            Err(RenderError::IncompleteTarget { width: 4000, height: 4000, .. })
        ));
    }

    #[test]
    fn test_missing_materials_fall_back_to_solid_colors() {
        let mut device = RecordingDevice::new();
        let materials = MaterialSet::load(&mut device, Path::new("no/such/textures")).unwrap();
        for material in MaterialTexture::ALL {
            assert_eq!(materials.get(material).extent(), (1, 1));
        }
    }
}
