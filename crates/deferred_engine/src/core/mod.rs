//! # Core Engine Module
//!
//! Shared abstractions used throughout the engine.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration for the window, the renderer and the
//!   demonstration scene constants

pub mod config;

// Re-export commonly used config types
pub use config::{
    ApplicationConfig,
    BlurConfig,
    CameraConfig,
    Config,
    ConfigError,
    LightRigConfig,
    LightingConfig,
    LocalLightConfig,
    RendererConfig,
    TargetConfig,
    WindowConfig,
    MAX_BLUR_HALF_WIDTH,
};
