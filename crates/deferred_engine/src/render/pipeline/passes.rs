//! Pass plan
//!
//! The fixed per-frame pass sequence expressed as data. Each
//! [`PassDescriptor`] names its output, viewport, clear policy, raster state
//! and the render targets it reads. [`plan_frame`] builds the sequence for a
//! given `mode`; [`validate_plan`] checks that every read is fed by an earlier
//! write.

use std::collections::HashSet;

use crate::render::api::{RasterState, Viewport};
use crate::render::{RenderError, RenderResult};

/// Offscreen targets owned by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    /// Depth from the light
    Shadow,
    /// Reflection of the upper hemisphere
    UpperReflection,
    /// Reflection of the lower hemisphere
    LowerReflection,
    /// Horizontal blur result
    BlurScratch,
    /// Fully blurred shadow map
    CompiledShadow,
    /// Position, normal, Kd, Ks
    GBuffer,
}

/// The passes of one frame, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Depth from the light's point of view
    Shadow,
    /// Non-reflective scene into the upper reflection target
    UpperReflection,
    /// Non-reflective scene into the lower reflection target
    LowerReflection,
    /// First blur dispatch
    BlurHorizontal,
    /// Second blur dispatch
    BlurVertical,
    /// Scene attributes into the G-buffer
    GeometryBuffer,
    /// Deferred shading to the screen
    Lighting,
    /// Additive point lights over the lit image
    LocalLights,
}

impl PassKind {
    /// Whether this pass runs on the compute path
    pub const fn is_compute(self) -> bool {
        matches!(self, Self::BlurHorizontal | Self::BlurVertical)
    }

    /// Short label for logs and error checks
    pub const fn label(self) -> &'static str {
        match self {
            Self::Shadow => "shadow pass",
            Self::UpperReflection => "upper reflection pass",
            Self::LowerReflection => "lower reflection pass",
            Self::BlurHorizontal => "horizontal blur",
            Self::BlurVertical => "vertical blur",
            Self::GeometryBuffer => "geometry buffer pass",
            Self::Lighting => "lighting pass",
            Self::LocalLights => "local lights pass",
        }
    }
}

/// Where a pass writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassOutput {
    /// An offscreen target
    Target(TargetId),
    /// The visible framebuffer
    Screen,
}

/// One pass of the frame
#[derive(Debug, Clone, PartialEq)]
pub struct PassDescriptor {
    /// Which pass
    pub kind: PassKind,
    /// Output destination
    pub output: PassOutput,
    /// Viewport (or, for compute, the image extent)
    pub viewport: Viewport,
    /// Clear color, or `None` to keep existing contents
    pub clear: Option<[f32; 4]>,
    /// Targets sampled by this pass
    pub inputs: Vec<TargetId>,
    /// Fixed-function state while the pass runs
    pub state: RasterState,
}

/// Pixel extents the plan is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameExtents {
    /// Square shadow map extent
    pub shadow: u32,
    /// Square reflection extent
    pub reflection: u32,
    /// G-buffer extent
    pub gbuffer: (u32, u32),
    /// Current framebuffer extent
    pub screen: (u32, u32),
}

/// Highest `mode` for which the local-lights pass runs
pub const LOCAL_LIGHTS_MAX_MODE: i32 = 2;

/// Build the ordered pass list for one frame.
pub fn plan_frame(mode: i32, extents: &FrameExtents, clear_color: [f32; 4]) -> Vec<PassDescriptor> {
    let shadow = Viewport::full(extents.shadow, extents.shadow);
    let reflection = Viewport::full(extents.reflection, extents.reflection);
    let screen = Viewport::full(extents.screen.0, extents.screen.1);

    let mut plan = vec![
        PassDescriptor {
            kind: PassKind::Shadow,
            output: PassOutput::Target(TargetId::Shadow),
            viewport: shadow,
            clear: Some(clear_color),
            inputs: vec![],
            state: RasterState::DEPTH_TEST | RasterState::CULL_FRONT,
        },
        PassDescriptor {
            kind: PassKind::UpperReflection,
            output: PassOutput::Target(TargetId::UpperReflection),
            viewport: reflection,
            clear: Some(clear_color),
            inputs: vec![TargetId::Shadow],
            state: RasterState::OPAQUE,
        },
        PassDescriptor {
            kind: PassKind::LowerReflection,
            output: PassOutput::Target(TargetId::LowerReflection),
            viewport: reflection,
            clear: Some(clear_color),
            inputs: vec![TargetId::Shadow],
            state: RasterState::OPAQUE,
        },
        PassDescriptor {
            kind: PassKind::BlurHorizontal,
            output: PassOutput::Target(TargetId::BlurScratch),
            viewport: shadow,
            clear: None,
            inputs: vec![TargetId::Shadow],
            state: RasterState::empty(),
        },
        PassDescriptor {
            kind: PassKind::BlurVertical,
            output: PassOutput::Target(TargetId::CompiledShadow),
            viewport: shadow,
            clear: None,
            inputs: vec![TargetId::BlurScratch],
            state: RasterState::empty(),
        },
        PassDescriptor {
            kind: PassKind::GeometryBuffer,
            output: PassOutput::Target(TargetId::GBuffer),
            viewport: Viewport::full(extents.gbuffer.0, extents.gbuffer.1),
            // Zero normals mark background texels
            clear: Some([0.0, 0.0, 0.0, 0.0]),
            inputs: vec![TargetId::Shadow, TargetId::UpperReflection, TargetId::LowerReflection],
            state: RasterState::OPAQUE,
        },
        PassDescriptor {
            kind: PassKind::Lighting,
            output: PassOutput::Screen,
            viewport: screen,
            clear: Some(clear_color),
            inputs: vec![
                TargetId::Shadow,
                TargetId::UpperReflection,
                TargetId::LowerReflection,
                TargetId::GBuffer,
                TargetId::CompiledShadow,
            ],
            state: RasterState::OPAQUE,
        },
    ];

    if mode <= LOCAL_LIGHTS_MAX_MODE {
        plan.push(PassDescriptor {
            kind: PassKind::LocalLights,
            output: PassOutput::Screen,
            viewport: screen,
            clear: None,
            inputs: vec![TargetId::GBuffer],
            state: RasterState::ADDITIVE_BLEND,
        });
    }

    plan
}

/// Check that every input is written by an earlier pass and that no pass
/// samples its own output.
pub fn validate_plan(plan: &[PassDescriptor]) -> RenderResult<()> {
    let mut written = HashSet::new();

    for pass in plan {
        for &input in &pass.inputs {
            if pass.output == PassOutput::Target(input) {
                return Err(RenderError::ReadOfBoundOutput {
                    pass: pass.kind,
                    target: input,
                });
            }
            if !written.contains(&input) {
                return Err(RenderError::ReadBeforeWrite {
                    pass: pass.kind,
                    target: input,
                });
            }
        }
        if let PassOutput::Target(target) = pass.output {
            written.insert(target);
        }
    }

    Ok(())
}
