use tracing::debug;

use super::{BackendKind, DeviceMemory, GraphicsBackend, NativeImage, SwapchainImage};
use crate::error::XrResult;
use crate::handle::HandleAllocator;
use crate::image::{ImageDesc, PixelRect, RgbaImage};
use crate::surface::PreviewSurface;
use crate::swapchain::SwapchainUsage;

/// Immediate-context backend. Reads copy straight out of the texture.
pub struct D3D11Backend {
    memory: DeviceMemory,
    textures: HandleAllocator,
}

impl D3D11Backend {
    pub fn new(memory: DeviceMemory) -> Self {
        Self {
            memory,
            textures: HandleAllocator::starting_at(0x1100_0000),
        }
    }
}

impl GraphicsBackend for D3D11Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::D3D11
    }

    fn supports_channel_masks(&self) -> bool {
        true
    }

    fn allocate_image(
        &mut self,
        desc: &ImageDesc,
        _usage: SwapchainUsage,
    ) -> XrResult<SwapchainImage> {
        let image = self.memory.allocate(desc)?;
        let native = NativeImage::D3D11Texture(self.textures.next_raw());
        debug!(texture = native.raw(), dxgi = desc.storage.dxgi(), "D3D11 texture created");
        Ok(SwapchainImage { native, image })
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
        image.image.read_rgba(layer, region)
    }

    fn present(&mut self, surface: &mut dyn PreviewSurface, canvas: &RgbaImage) -> XrResult<()> {
        surface.present(canvas)
    }

    fn allocated_bytes(&self) -> usize {
        self.memory.used()
    }
}
