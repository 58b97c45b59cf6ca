//! Per-frame pass pipeline
//!
//! The frame is a fixed, feed-forward sequence of passes: shadow, two
//! reflections, a two-dispatch shadow blur, the G-buffer fill, deferred
//! lighting and (for low `mode` values) additive local lights. The sequence is
//! data ([`passes`]), its reads are checked as it runs ([`ledger`]) and the
//! shader interface it speaks is fixed in [`uniforms`].

pub mod blur;
pub mod ledger;
pub mod orchestrator;
pub mod passes;
pub mod uniforms;

#[cfg(test)]
mod pipeline_tests;

pub use ledger::{Access, FrameLedger, LedgerEvent};
pub use orchestrator::{DeferredPipeline, MaterialSet, PipelinePrograms, PipelineTargets};
pub use passes::{plan_frame, validate_plan, FrameExtents, PassDescriptor, PassKind, PassOutput, TargetId};
pub use uniforms::{GBufferChannel, MaterialTexture};
