//! Graphics device implementations
//!
//! - [`opengl`]: the real device, OpenGL through `glow`
//! - [`recording`]: headless device that logs commands, for tests and tools

pub mod opengl;
pub mod recording;

pub use opengl::GlDevice;
pub use recording::{Command, RecordingDevice};
