//! Offscreen render targets
//!
//! A [`RenderTarget`] is a framebuffer with a depth attachment and one or four
//! floating-point color attachments. Its extent and channel count are fixed at
//! creation. Output is redirected to it only while a [`TargetBinding`] guard is
//! alive; dropping the guard restores the visible framebuffer.

use std::ops::{Deref, DerefMut};

use crate::render::api::{check_errors, GraphicsDevice, TargetHandle, TargetLayout, TextureHandle, Viewport};
use crate::render::{RenderError, RenderResult};

/// Framebuffer plus its color attachments
#[derive(Debug)]
pub struct RenderTarget {
    handle: TargetHandle,
    width: u32,
    height: u32,
    layout: TargetLayout,
    color: Vec<TextureHandle>,
}

impl RenderTarget {
    /// Allocate a target of `width` x `height`.
    ///
    /// An incomplete framebuffer is reported as
    /// [`RenderError::IncompleteTarget`].
    #[track_caller]
    pub fn create<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        width: u32,
        height: u32,
        layout: TargetLayout,
    ) -> RenderResult<Self> {
        let allocation = device.create_render_target(width, height, layout)?;
        check_errors(device, "render target creation")?;

        log::info!(
            "Created {:?} render target {}x{} with {} color attachment(s)",
            layout,
            width,
            height,
            allocation.color.len()
        );

        Ok(Self {
            handle: allocation.handle,
            width,
            height,
            layout,
            color: allocation.color,
        })
    }

    /// Redirect output to this target until the returned guard drops.
    ///
    /// Only one target may be bound at a time; binding while another is bound
    /// fails with [`RenderError::NestedTargetBind`]. The caller sets the
    /// viewport.
    pub fn bind<'d, D: GraphicsDevice + ?Sized>(&self, device: &'d mut D) -> RenderResult<TargetBinding<'d, D>> {
        if let Some(current) = device.bound_render_target() {
            return Err(RenderError::NestedTargetBind {
                requested: self.handle,
                current,
            });
        }

        device.bind_render_target(Some(self.handle));
        Ok(TargetBinding {
            device,
            target: self.handle,
        })
    }

    /// Device handle
    pub fn handle(&self) -> TargetHandle {
        self.handle
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel layout
    pub fn layout(&self) -> TargetLayout {
        self.layout
    }

    /// Viewport covering the whole target
    pub fn viewport(&self) -> Viewport {
        Viewport::full(self.width, self.height)
    }

    /// The first (or only) color attachment
    pub fn texture(&self) -> TextureHandle {
        self.color[0]
    }

    /// Color attachment `index`, if the layout has it
    pub fn color(&self, index: usize) -> Option<TextureHandle> {
        self.color.get(index).copied()
    }

    /// All color attachments in attachment order
    pub fn colors(&self) -> &[TextureHandle] {
        &self.color
    }
}

/// Scope during which a [`RenderTarget`] receives draw output.
///
/// Derefs to the device so passes can keep issuing commands through it.
pub struct TargetBinding<'d, D: GraphicsDevice + ?Sized> {
    device: &'d mut D,
    target: TargetHandle,
}

impl<'d, D: GraphicsDevice + ?Sized> TargetBinding<'d, D> {
    /// The bound target
    pub fn target(&self) -> TargetHandle {
        self.target
    }

    /// Release the binding now rather than at scope end
    pub fn unbind(self) {}
}

impl<'d, D: GraphicsDevice + ?Sized> Deref for TargetBinding<'d, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.device
    }
}

impl<'d, D: GraphicsDevice + ?Sized> DerefMut for TargetBinding<'d, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.device
    }
}

impl<'d, D: GraphicsDevice + ?Sized> Drop for TargetBinding<'d, D> {
    fn drop(&mut self) {
        self.device.bind_render_target(None);
    }
}
