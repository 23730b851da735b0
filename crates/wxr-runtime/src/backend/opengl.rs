use tracing::debug;

use super::{BackendKind, DeviceMemory, GraphicsBackend, NativeImage, SwapchainImage};
use crate::error::XrResult;
use crate::image::{ImageDesc, PixelRect, RgbaImage};
use crate::surface::PreviewSurface;
use crate::swapchain::SwapchainUsage;

/// OpenGL backend. Texture storage is bottom-up, so reads are flipped to top-down.
pub struct OpenGlBackend {
    memory: DeviceMemory,
    next_name: u32,
}

impl OpenGlBackend {
    pub fn new(memory: DeviceMemory) -> Self {
        Self {
            memory,
            next_name: 1,
        }
    }
}

impl GraphicsBackend for OpenGlBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::OpenGl
    }

    fn supports_channel_masks(&self) -> bool {
        false
    }

    fn allocate_image(
        &mut self,
        desc: &ImageDesc,
        _usage: SwapchainUsage,
    ) -> XrResult<SwapchainImage> {
        let image = self.memory.allocate(desc)?;
        let name = self.next_name;
        self.next_name += 1;
        debug!(texture = name, internal_format = ?desc.format.gl(), "GL texture created");
        Ok(SwapchainImage {
            native: NativeImage::GlTexture(name),
            image,
        })
    }

    fn release_image(&mut self, image: &SwapchainImage) {
        self.memory.free(&image.image);
    }

    fn read_image(
        &mut self,
        image: &SwapchainImage,
        layer: u32,
        region: Option<PixelRect>,
    ) -> XrResult<RgbaImage> {
        let mut pixels = image.image.read_rgba(layer, region)?;
        pixels.flip_vertical();
        Ok(pixels)
    }

    fn present(&mut self, surface: &mut dyn PreviewSurface, canvas: &RgbaImage) -> XrResult<()> {
        surface.present(canvas)
    }

    fn allocated_bytes(&self) -> usize {
        self.memory.used()
    }
}
