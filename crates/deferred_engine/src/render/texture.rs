//! Material textures

use std::path::Path;

use crate::assets::ImageData;
use crate::render::api::{check_errors, GraphicsDevice, TextureHandle};
use crate::render::RenderResult;

/// An uploaded 2D texture
#[derive(Debug, Clone)]
pub struct Texture {
    handle: TextureHandle,
    width: u32,
    height: u32,
    label: String,
}

impl Texture {
    /// Upload decoded image data
    #[track_caller]
    pub fn from_image<D: GraphicsDevice + ?Sized>(device: &mut D, image: &ImageData, label: &str) -> RenderResult<Self> {
        let handle = device.create_texture(image)?;
        check_errors(device, "texture upload")?;
        log::debug!("Uploaded texture {} ({}x{})", label, image.width, image.height);

        Ok(Self {
            handle,
            width: image.width,
            height: image.height,
            label: label.to_string(),
        })
    }

    /// Load and upload an image file
    #[track_caller]
    pub fn load<D: GraphicsDevice + ?Sized, P: AsRef<Path>>(device: &mut D, path: P) -> RenderResult<Self> {
        let path = path.as_ref();
        let image = ImageData::from_file(path)?;
        Self::from_image(device, &image, &path.display().to_string())
    }

    /// Load an image file, substituting a 1x1 `fallback` pixel if it cannot be read
    #[track_caller]
    pub fn load_or_solid<D: GraphicsDevice + ?Sized, P: AsRef<Path>>(
        device: &mut D,
        path: P,
        fallback: [u8; 4],
    ) -> RenderResult<Self> {
        let path = path.as_ref();
        let image = ImageData::load_or_solid(path, fallback);
        Self::from_image(device, &image, &path.display().to_string())
    }

    /// Device handle
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Width and height in pixels
    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Source label
    pub fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::recording::RecordingDevice;
    use crate::render::RenderError;
    use crate::assets::AssetError;

    #[test]
    fn test_missing_file_uses_fallback_pixel() {
        let mut device = RecordingDevice::new();
        let texture = Texture::load_or_solid(&mut device, "missing/grass.jpg", [62, 102, 38, 255]).unwrap();
        assert_eq!(texture.extent(), (1, 1));
        assert_eq!(texture.label(), "missing/grass.jpg");
    }

    #[test]
    fn test_strict_load_reports_missing_file() {
        let mut device = RecordingDevice::new();
        let err = Texture::load(&mut device, "missing/grass.jpg").unwrap_err();
        assert!(matches!(err, RenderError::Asset(AssetError::NotFound(_))));
    }
}
