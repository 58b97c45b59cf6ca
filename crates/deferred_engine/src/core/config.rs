//! # Unified Configuration System
//!
//! All configuration structures for the renderer and the application hosting it.
//!
//! ## Configuration Categories
//!
//! - **Window Config**: initial surface extent and title
//! - **Renderer Config**: asset locations, render-target extents, blur width,
//!   lighting constants, the light rig and the camera
//! - **Application Config**: log level plus the two above
//!
//! Defaults reproduce the demonstration scene, so an application can run with
//! no configuration file at all.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;

pub use crate::config::{Config, ConfigError};

/// Largest supported blur half-width; the blur shaders declare `weights[101]`.
pub const MAX_BLUR_HALF_WIDTH: u32 = 50;

/// # Window Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial framebuffer width in pixels
    pub width: u32,
    /// Initial framebuffer height in pixels
    pub height: u32,
    /// Whether to synchronise buffer swaps with the display
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Deferred Teapot".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

/// # Render Target Extents
///
/// The G-buffer is created at the window's extent when the renderer is built
/// and keeps that extent for the life of the process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Square extent of the shadow map and its blurred copies
    pub shadow_size: u32,
    /// Square extent of each reflection target
    pub reflection_size: u32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            shadow_size: 4000,
            reflection_size: 1000,
        }
    }
}

/// # Shadow Blur Configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurConfig {
    /// Kernel half-width in texels; the kernel spans `2 * half_width + 1` taps
    pub half_width: u32,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self { half_width: 10 }
    }
}

/// A single hard-coded point light drawn by the local-lights pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalLightConfig {
    /// World-space position
    pub position: Vec3,
    /// Linear RGB intensity
    pub color: Vec3,
    /// Radius of influence
    pub radius: f32,
}

/// # Lighting Constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Intensity of the main light (`Light` uniform)
    pub light: Vec3,
    /// Ambient term (`Ambient` uniform)
    pub ambient: Vec3,
    /// Clear color used by every pass
    pub clear_color: [f32; 4],
    /// Point lights accumulated additively after the deferred lighting pass
    pub local_lights: Vec<LocalLightConfig>,
}

impl LightingConfig {
    fn default_local_lights() -> Vec<LocalLightConfig> {
        const COLORS: [[f32; 3]; 8] = [
            [1.0, 0.2, 0.2],
            [1.0, 0.6, 0.1],
            [0.9, 0.9, 0.2],
            [0.2, 1.0, 0.3],
            [0.1, 0.9, 0.9],
            [0.2, 0.4, 1.0],
            [0.6, 0.2, 1.0],
            [1.0, 0.3, 0.8],
        ];

        COLORS
            .iter()
            .enumerate()
            .map(|(i, color)| {
                let angle = (i as f32) * std::f32::consts::TAU / COLORS.len() as f32;
                LocalLightConfig {
                    position: Vec3::new(4.0 * angle.cos(), 4.0 * angle.sin(), 1.5),
                    color: Vec3::new(color[0], color[1], color[2]),
                    radius: 3.0,
                }
            })
            .collect()
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            light: Vec3::new(3.0, 3.0, 3.0),
            ambient: Vec3::new(0.2, 0.2, 0.2),
            clear_color: [0.5, 0.5, 0.5, 1.0],
            local_lights: Self::default_local_lights(),
        }
    }
}

/// # Light Rig
///
/// The main light orbits the origin; its position is derived from these
/// spherical coordinates every frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LightRigConfig {
    /// Azimuth in degrees
    pub spin: f32,
    /// Polar angle from +Z in degrees
    pub tilt: f32,
    /// Distance from the origin
    pub distance: f32,
}

impl Default for LightRigConfig {
    fn default() -> Self {
        Self {
            spin: 150.0,
            tilt: -45.0,
            distance: 100.0,
        }
    }
}

/// # Camera Configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Azimuth in degrees
    pub spin: f32,
    /// Elevation in degrees (90 looks straight down)
    pub tilt: f32,
    /// Orbit distance
    pub zoom: f32,
    /// Horizontal pan of the orbit camera
    pub tx: f32,
    /// Vertical pan of the orbit camera
    pub ty: f32,
    /// Vertical frustum half-extent at unit distance
    pub ry: f32,
    /// Near clip distance
    pub front: f32,
    /// Far clip distance
    pub back: f32,
    /// Starting eye position of the free-fly camera
    pub eye: Vec3,
    /// Free-fly speed in world units per second
    pub speed: f32,
    /// Start in orbit mode (`true`) or free-fly mode (`false`)
    pub orbit: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            spin: 0.0,
            tilt: 30.0,
            zoom: 25.0,
            tx: 0.0,
            ty: 0.0,
            ry: 0.4,
            front: 0.5,
            back: 5000.0,
            eye: Vec3::new(0.0, -20.0, 0.0),
            speed: 10.0,
            orbit: true,
        }
    }
}

/// # Renderer Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Directory holding `*.vert`, `*.frag` and `*.comp` sources
    pub shader_dir: String,
    /// Directory holding material textures and normal maps
    pub texture_dir: String,
    /// Directory holding OBJ models
    pub model_dir: String,
    /// Initial value of the shader-visible `mode` selector
    pub initial_mode: i32,
    /// Offscreen target extents
    pub targets: TargetConfig,
    /// Shadow blur kernel
    pub blur: BlurConfig,
    /// Lighting constants and local lights
    pub lighting: LightingConfig,
    /// Main light placement
    pub light: LightRigConfig,
    /// Camera placement and projection
    pub camera: CameraConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shader_dir: "resources/shaders".to_string(),
            texture_dir: "resources/textures".to_string(),
            model_dir: "resources/models".to_string(),
            initial_mode: 1,
            targets: TargetConfig::default(),
            blur: BlurConfig::default(),
            lighting: LightingConfig::default(),
            light: LightRigConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl RendererConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.shadow_size == 0 || self.targets.reflection_size == 0 {
            return Err(ConfigError::Invalid(
                "Render target extents must be non-zero".to_string(),
            ));
        }

        if self.blur.half_width > MAX_BLUR_HALF_WIDTH {
            return Err(ConfigError::Invalid(format!(
                "Blur half-width {} exceeds the maximum of {}",
                self.blur.half_width, MAX_BLUR_HALF_WIDTH
            )));
        }

        if self.camera.front <= 0.0 || self.camera.back <= self.camera.front {
            return Err(ConfigError::Invalid(format!(
                "Clip planes must satisfy 0 < front < back (got {} and {})",
                self.camera.front, self.camera.back
            )));
        }

        if self.light.distance <= 0.0 {
            return Err(ConfigError::Invalid("Light distance must be positive".to_string()));
        }

        Ok(())
    }
}

/// # Application Configuration
///
/// Top-level configuration loaded by the demo application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Default log filter (overridden by `RUST_LOG`)
    pub log_level: String,
    /// Window settings
    pub window: WindowConfig,
    /// Renderer settings
    pub renderer: RendererConfig,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            window: WindowConfig::default(),
            renderer: RendererConfig::default(),
        }
    }
}

impl ApplicationConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid("Window extent must be non-zero".to_string()));
        }
        self.renderer.validate()
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ApplicationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.renderer.targets.shadow_size, 4000);
        assert_eq!(config.renderer.targets.reflection_size, 1000);
        assert_eq!(config.renderer.lighting.local_lights.len(), 8);
        assert_eq!(config.renderer.initial_mode, 1);
    }

    #[test]
    fn test_rejects_oversized_blur() {
        let mut config = RendererConfig::default();
        config.blur.half_width = MAX_BLUR_HALF_WIDTH + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.blur.half_width = MAX_BLUR_HALF_WIDTH;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_extent_targets() {
        let mut config = RendererConfig::default();
        config.targets.shadow_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let text = r#"
            log_level = "debug"

            [renderer.blur]
            half_width = 4

            [renderer.light]
            spin = 90.0
        "#;

        let config: ApplicationConfig = toml::from_str(text).expect("valid toml");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.renderer.blur.half_width, 4);
        assert_eq!(config.renderer.light.spin, 90.0);
        assert_eq!(config.renderer.light.tilt, -45.0);
        assert_eq!(config.window.width, 1280);
    }

    #[test]
    fn test_save_and_load_round_trip_through_file() {
        let dir = std::env::temp_dir().join(format!("deferred_engine_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("app.toml");

        let mut config = ApplicationConfig::default();
        config.renderer.initial_mode = 3;
        config.save_to_file(&path).expect("save");

        let loaded = ApplicationConfig::load_from_file(&path).expect("load");
        assert_eq!(loaded.renderer.initial_mode, 3);
        assert_eq!(loaded.renderer.lighting.local_lights, config.renderer.lighting.local_lights);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let err = ApplicationConfig::load_from_file("settings.yaml");
        assert!(matches!(err, Err(ConfigError::UnsupportedFormat(_))));
    }
}
