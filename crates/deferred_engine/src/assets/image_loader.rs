//! Image loading utilities for texture data
//!
//! Decodes PNG and JPEG material textures and normal maps into tightly packed
//! RGBA8 ready for upload.

use std::path::Path;

use crate::assets::AssetError;

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Raw RGBA pixel data, rows bottom-up as the sampler expects
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load an image from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();
        log::debug!("Loading image from: {:?}", path_ref);

        if !path_ref.exists() {
            return Err(AssetError::NotFound(path_ref.display().to_string()));
        }

        let img = image::open(path_ref)
            .map_err(|e| AssetError::LoadFailed(format!("{}: {}", path_ref.display(), e)))?;
        let image = Self::from_dynamic(img);

        log::info!("Loaded image {}x{} from {:?}", image.width, image.height, path_ref);
        Ok(image)
    }

    fn from_dynamic(img: image::DynamicImage) -> Self {
        // Texture coordinates have v=0 at the bottom row
        let rgba = img.flipv().to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            data: rgba.into_raw(),
            width,
            height,
        }
    }

    /// Create a solid color image (used as a stand-in for missing textures)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
        }
    }

    /// Load `path`, or fall back to a 1x1 image of `fallback` with a warning.
    pub fn load_or_solid<P: AsRef<Path>>(path: P, fallback: [u8; 4]) -> Self {
        match Self::from_file(path.as_ref()) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Using solid {:?} in place of {:?}: {}", fallback, path.as_ref(), e);
                Self::solid_color(1, 1, fallback)
            }
        }
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}
