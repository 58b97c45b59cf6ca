//! Shader interface contract
//!
//! Uniform names and texture-unit numbers shared between the pipeline and the
//! GLSL sources. Every pass binds a given sampler to the same unit, so these
//! values must stay in lockstep with the shaders.

/// Uniform names as declared in the shaders
pub mod names {
    /// Camera projection
    pub const WORLD_PROJ: &str = "WorldProj";
    /// Camera view
    pub const WORLD_VIEW: &str = "WorldView";
    /// Inverse camera view
    pub const WORLD_INVERSE: &str = "WorldInverse";
    /// Light-space projection (shadow pass)
    pub const PROJ: &str = "Proj";
    /// Light-space view (shadow pass)
    pub const VIEW: &str = "View";
    /// World-space light position
    pub const LIGHT_POS: &str = "lightPos";
    /// Shader behaviour selector
    pub const MODE: &str = "mode";
    /// Elapsed seconds
    pub const TIME: &str = "time";
    /// Reflection hemisphere sign
    pub const REFLECTION_SIGN: &str = "S";
    /// Main light intensity
    pub const LIGHT: &str = "Light";
    /// Ambient term
    pub const AMBIENT: &str = "Ambient";
    /// World to shadow-map texture space
    pub const SHADOW_MATRIX: &str = "ShadowMatrix";
    /// Blur kernel weights
    pub const BLUR_WEIGHTS: &str = "weights";
    /// Blur kernel half-width
    pub const BLUR_HALF_WIDTH: &str = "w";
    /// Point light position
    pub const LOCAL_LIGHT_POS: &str = "localLightPos";
    /// Point light color
    pub const LOCAL_LIGHT_COLOR: &str = "localLightColor";
    /// Point light radius
    pub const LOCAL_LIGHT_RADIUS: &str = "localLightRadius";
    /// Shadow map sampler
    pub const SHADOW_MAP: &str = "shadowMap";
    /// Upper reflection sampler
    pub const UPPER_REFLECT: &str = "upperReflect";
    /// Lower reflection sampler
    pub const LOWER_REFLECT: &str = "lowerReflect";
    /// Blurred shadow sampler
    pub const CHOLESKY_MAP: &str = "choleskyMap";
}

/// Fixed texture and image unit assignments
pub mod units {
    /// Blur source image unit
    pub const BLUR_SOURCE: u32 = 0;
    /// Blur destination image unit
    pub const BLUR_DESTINATION: u32 = 1;
    /// Shadow map
    pub const SHADOW_MAP: u32 = 2;
    /// Upper reflection
    pub const UPPER_REFLECT: u32 = 3;
    /// Lower reflection
    pub const LOWER_REFLECT: u32 = 4;
    /// First material texture
    pub const MATERIAL_BASE: u32 = 5;
    /// First G-buffer channel
    pub const GBUFFER_BASE: u32 = 17;
    /// Blurred shadow map
    pub const CHOLESKY_MAP: u32 = 21;
}

/// Material textures and normal maps, in unit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialTexture {
    /// Sky dome
    Sky,
    /// Terrain
    Ground,
    /// Room walls
    Wall,
    /// Room floor
    Floor,
    /// Teapot surface
    Teapot,
    /// Picture frame wood
    Frame,
    /// Left picture
    LeftFrame,
    /// Right picture
    RightFrame,
    /// Wall normal map
    WallNormal,
    /// Floor normal map
    FloorNormal,
    /// Frame normal map
    FrameNormal,
    /// Sea ripple normal map
    SeaNormal,
}

impl MaterialTexture {
    /// All materials in unit order
    pub const ALL: [Self; 12] = [
        Self::Sky,
        Self::Ground,
        Self::Wall,
        Self::Floor,
        Self::Teapot,
        Self::Frame,
        Self::LeftFrame,
        Self::RightFrame,
        Self::WallNormal,
        Self::FloorNormal,
        Self::FrameNormal,
        Self::SeaNormal,
    ];

    /// Position in [`Self::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Texture unit
    pub const fn unit(self) -> u32 {
        units::MATERIAL_BASE + self as u32
    }

    /// Sampler uniform name
    pub const fn uniform(self) -> &'static str {
        match self {
            Self::Sky => "skyTex",
            Self::Ground => "groundTex",
            Self::Wall => "wallTex",
            Self::Floor => "floorTex",
            Self::Teapot => "teapotTex",
            Self::Frame => "frameTex",
            Self::LeftFrame => "lFrameTex",
            Self::RightFrame => "rFrameTex",
            Self::WallNormal => "wallNormal",
            Self::FloorNormal => "floorNormal",
            Self::FrameNormal => "frameNormal",
            Self::SeaNormal => "seaNormal",
        }
    }

    /// Image file under the texture directory
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Sky => "sky.jpg",
            Self::Ground => "grass.jpg",
            Self::Wall => "Standard_red_pxr128.png",
            Self::Floor => "6670-diffuse.jpg",
            Self::Teapot => "cracks.png",
            Self::Frame => "Brazilian_rosewood_pxr128.png",
            Self::LeftFrame => "angry.png",
            Self::RightFrame => "cow.png",
            Self::WallNormal => "Standard_red_pxr128_normal.png",
            Self::FloorNormal => "6670-normal.jpg",
            Self::FrameNormal => "Brazilian_rosewood_pxr128_normal.png",
            Self::SeaNormal => "ripples_normalmap.png",
        }
    }

    /// Whether this is a tangent-space normal map
    pub const fn is_normal_map(self) -> bool {
        matches!(
            self,
            Self::WallNormal | Self::FloorNormal | Self::FrameNormal | Self::SeaNormal
        )
    }

    /// Solid color used when the file is missing
    pub const fn fallback_color(self) -> [u8; 4] {
        if self.is_normal_map() {
            // Flat tangent-space normal
            return [128, 128, 255, 255];
        }
        match self {
            Self::Sky => [135, 180, 230, 255],
            Self::Ground => [62, 102, 38, 255],
            Self::Wall => [134, 60, 56, 255],
            Self::Floor => [96, 88, 48, 255],
            Self::Teapot => [128, 128, 26, 255],
            _ => [87, 51, 35, 255],
        }
    }
}

/// G-buffer channels, in attachment order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GBufferChannel {
    /// World-space position
    WorldPosition,
    /// World-space normal
    Normal,
    /// Diffuse reflectance
    Diffuse,
    /// Specular reflectance and shininess
    Specular,
}

impl GBufferChannel {
    /// All channels in attachment order
    pub const ALL: [Self; 4] = [Self::WorldPosition, Self::Normal, Self::Diffuse, Self::Specular];

    /// Color attachment index
    pub const fn attachment(self) -> usize {
        self as usize
    }

    /// Texture unit when read back
    pub const fn unit(self) -> u32 {
        units::GBUFFER_BASE + self as u32
    }

    /// Sampler uniform name
    pub const fn uniform(self) -> &'static str {
        match self {
            Self::WorldPosition => "worldPosMap",
            Self::Normal => "normalVecMap",
            Self::Diffuse => "KdMap",
            Self::Specular => "KsMap",
        }
    }
}
