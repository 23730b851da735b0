//! Graphics backends.
//!
//! A session's graphics binding is inspected once at creation and turned into a backend
//! object; everything after that dispatches through [`GraphicsBackend`]. The backends
//! keep image contents in CPU memory so composition is identical on every API. Handing
//! the native texture names to the application is the seam where real device interop
//! plugs in.

mod d3d11;
mod d3d12;
mod opengl;

pub use d3d11::D3D11Backend;
pub use d3d12::{BarrierCommand, D3D12Backend, ResourceState};
pub use opengl::OpenGlBackend;

use crate::error::{XrError, XrResult};
use crate::image::{Image, ImageDesc, PixelRect, RgbaImage};
use crate::surface::PreviewSurface;
use crate::swapchain::SwapchainUsage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    D3D11,
    D3D12,
    OpenGl,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::D3D11 => "D3D11",
            Self::D3D12 => "D3D12",
            Self::OpenGl => "OpenGL",
        }
    }
}

/// Graphics binding found in the session create chain. Device values are opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsBinding {
    D3D11 { device: u64 },
    D3D12 { device: u64, queue: u64 },
    OpenGl { hdc: u64, hglrc: u64 },
}

impl GraphicsBinding {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::D3D11 { .. } => BackendKind::D3D11,
            Self::D3D12 { .. } => BackendKind::D3D12,
            Self::OpenGl { .. } => BackendKind::OpenGl,
        }
    }

    fn validate(&self) -> XrResult<()> {
        match *self {
            Self::D3D11 { device: 0 } => Err(XrError::graphics("D3D11 device is null")),
            Self::D3D12 { device: 0, .. } => Err(XrError::graphics("D3D12 device is null")),
            Self::D3D12 { queue: 0, .. } => Err(XrError::graphics("D3D12 queue is null")),
            Self::OpenGl { hglrc: 0, .. } => Err(XrError::graphics("GL context is null")),
            _ => Ok(()),
        }
    }
}

/// Native name of a swapchain image as handed to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeImage {
    D3D11Texture(u64),
    D3D12Resource(u64),
    GlTexture(u32),
}

impl NativeImage {
    pub fn raw(self) -> u64 {
        match self {
            Self::D3D11Texture(v) | Self::D3D12Resource(v) => v,
            Self::GlTexture(v) => v as u64,
        }
    }
}

/// One allocated image of a swapchain.
#[derive(Debug)]
pub struct SwapchainImage {
    pub native: NativeImage,
    pub image: Image,
}

/// Per-API strategy for image allocation, readback and presentation.
pub trait GraphicsBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Whether color writes can be restricted per channel. Anaglyph needs this.
    fn supports_channel_masks(&self) -> bool;

    fn allocate_image(&mut self, desc: &ImageDesc, usage: SwapchainUsage)
        -> XrResult<SwapchainImage>;

    fn release_image(&mut self, image: &SwapchainImage);

    /// Read one layer of an image as top-down RGBA. `region` is ignored for
    /// multisampled images, which are resolved instead.
    fn read_image(
        &mut self,
        image: &SwapchainImage,
        layer: u32,
        region: Option<PixelRect>,
    ) -> XrResult<RgbaImage>;

    fn present(&mut self, surface: &mut dyn PreviewSurface, canvas: &RgbaImage) -> XrResult<()>;

    fn allocated_bytes(&self) -> usize;
}

pub fn create_backend(binding: &GraphicsBinding) -> XrResult<Box<dyn GraphicsBackend>> {
    binding.validate()?;
    let backend: Box<dyn GraphicsBackend> = match binding {
        GraphicsBinding::D3D11 { .. } => Box::new(D3D11Backend::new(DeviceMemory::unbounded())),
        GraphicsBinding::D3D12 { .. } => Box::new(D3D12Backend::new(DeviceMemory::unbounded())),
        GraphicsBinding::OpenGl { .. } => Box::new(OpenGlBackend::new(DeviceMemory::unbounded())),
    };
    tracing::info!(backend = backend.kind().name(), "graphics backend created");
    Ok(backend)
}

/// Device memory accounting shared by the backends.
#[derive(Debug, Clone, Default)]
pub struct DeviceMemory {
    budget: Option<usize>,
    used: usize,
}

impl DeviceMemory {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_budget(bytes: usize) -> Self {
        Self {
            budget: Some(bytes),
            used: 0,
        }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub(crate) fn allocate(&mut self, desc: &ImageDesc) -> XrResult<Image> {
        let bytes = desc
            .total_bytes()
            .ok_or_else(|| XrError::runtime("image size overflows"))?;
        if let Some(budget) = self.budget {
            if self.used + bytes > budget {
                return Err(XrError::runtime(format!(
                    "out of device memory: {} of {budget} bytes in use, {bytes} requested",
                    self.used
                )));
            }
        }
        let image = Image::new(*desc)?;
        self.used += bytes;
        Ok(image)
    }

    pub(crate) fn free(&mut self, image: &Image) {
        self.used = self.used.saturating_sub(image.byte_len());
    }
}
