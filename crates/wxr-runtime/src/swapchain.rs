//! Swapchains and their acquire/wait/release cursor.
//!
//! Each swapchain owns a fixed ring of images. Acquire hands out indices in strict
//! round-robin order; release does not take an index and instead marks the most recently
//! acquired image as the one to display.

use std::collections::HashMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{GraphicsBackend, NativeImage, SwapchainImage};
use crate::error::{XrError, XrResult};
use crate::format::{PixelFormat, StorageFormat};
use crate::handle::{HandleAllocator, SessionHandle, SwapchainHandle};
use crate::image::ImageDesc;
use crate::system;

pub const SWAPCHAIN_IMAGE_COUNT: u32 = 3;

bitflags! {
    /// Raw `XrSwapchainUsageFlags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SwapchainUsage: u64 {
        const COLOR_ATTACHMENT = 0x0000_0001;
        const DEPTH_STENCIL_ATTACHMENT = 0x0000_0002;
        const UNORDERED_ACCESS = 0x0000_0004;
        const TRANSFER_SRC = 0x0000_0008;
        const TRANSFER_DST = 0x0000_0010;
        const SAMPLED = 0x0000_0020;
        const MUTABLE_FORMAT = 0x0000_0040;
        const INPUT_ATTACHMENT = 0x0000_0080;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainCreateInfo {
    /// Native format value (DXGI or GL internal format).
    pub format: i64,
    pub usage: SwapchainUsage,
    pub width: u32,
    pub height: u32,
    pub array_size: u32,
    pub mip_count: u32,
    pub sample_count: u32,
    pub face_count: u32,
}

impl SwapchainCreateInfo {
    pub fn color(format: i64, width: u32, height: u32) -> Self {
        Self {
            format,
            usage: SwapchainUsage::COLOR_ATTACHMENT | SwapchainUsage::SAMPLED,
            width,
            height,
            array_size: 1,
            mip_count: 1,
            sample_count: 1,
            face_count: 1,
        }
    }
}

#[derive(Debug)]
pub struct Swapchain {
    session: SessionHandle,
    format: PixelFormat,
    native_format: i64,
    usage: SwapchainUsage,
    desc: ImageDesc,
    images: Vec<SwapchainImage>,
    next_index: u32,
    last_acquired: Option<u32>,
    last_released: Option<u32>,
}

impl Swapchain {
    pub fn session(&self) -> SessionHandle {
        self.session
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn native_format(&self) -> i64 {
        self.native_format
    }

    pub fn usage(&self) -> SwapchainUsage {
        self.usage
    }

    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    pub fn width(&self) -> u32 {
        self.desc.width
    }

    pub fn height(&self) -> u32 {
        self.desc.height
    }

    pub fn images(&self) -> &[SwapchainImage] {
        &self.images
    }

    pub fn image(&self, index: u32) -> Option<&SwapchainImage> {
        self.images.get(index as usize)
    }

    pub fn image_mut(&mut self, index: u32) -> Option<&mut SwapchainImage> {
        self.images.get_mut(index as usize)
    }

    pub fn last_acquired(&self) -> Option<u32> {
        self.last_acquired
    }

    pub fn last_released(&self) -> Option<u32> {
        self.last_released
    }

    pub fn acquire(&mut self) -> u32 {
        let index = self.next_index;
        self.next_index = (self.next_index + 1) % self.images.len() as u32;
        self.last_acquired = Some(index);
        index
    }

    pub fn release(&mut self) {
        self.last_released = self.last_acquired;
    }

    /// Image the compositor should sample: last released, else last acquired, else 0.
    pub fn display_index(&self) -> u32 {
        self.last_released.or(self.last_acquired).unwrap_or(0)
    }
}

/// Registry of live swapchains.
pub struct SwapchainManager {
    chains: HashMap<SwapchainHandle, Swapchain>,
    handles: HandleAllocator,
}

impl Default for SwapchainManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SwapchainManager {
    pub fn new() -> Self {
        Self {
            chains: HashMap::new(),
            handles: HandleAllocator::starting_at(1),
        }
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn get(&self, handle: SwapchainHandle) -> XrResult<&Swapchain> {
        self.chains
            .get(&handle)
            .ok_or_else(|| XrError::handle(format!("swapchain {handle}")))
    }

    pub fn get_mut(&mut self, handle: SwapchainHandle) -> XrResult<&mut Swapchain> {
        self.chains
            .get_mut(&handle)
            .ok_or_else(|| XrError::handle(format!("swapchain {handle}")))
    }

    /// Allocate all images or none. A failed allocation releases the images already
    /// created and registers nothing.
    pub fn create(
        &mut self,
        session: SessionHandle,
        backend: &mut dyn GraphicsBackend,
        info: &SwapchainCreateInfo,
    ) -> XrResult<SwapchainHandle> {
        let kind = backend.kind();
        let format = PixelFormat::from_native(kind, info.format)
            .ok_or(XrError::SwapchainFormatUnsupported(info.format))?;
        if info.width == 0 || info.height == 0 {
            return Err(XrError::validation("swapchain extent must be non-zero"));
        }
        let max_extent = system::MAX_SWAPCHAIN_EXTENT;
        if info.width > max_extent || info.height > max_extent {
            return Err(XrError::validation(format!(
                "swapchain extent {}x{} exceeds {max_extent}x{max_extent}",
                info.width, info.height
            )));
        }
        if info.array_size > system::MAX_SWAPCHAIN_ARRAY_SIZE {
            return Err(XrError::validation(format!(
                "array size {} exceeds {}",
                info.array_size,
                system::MAX_SWAPCHAIN_ARRAY_SIZE
            )));
        }
        if info.sample_count > system::MAX_SWAPCHAIN_SAMPLE_COUNT {
            return Err(XrError::validation(format!(
                "sample count {} exceeds {}",
                info.sample_count,
                system::MAX_SWAPCHAIN_SAMPLE_COUNT
            )));
        }
        if info.face_count > 1 {
            warn!(faces = info.face_count, "cube swapchains are stored as a single face");
        }
        let desc = ImageDesc {
            format,
            storage: StorageFormat::for_allocation(kind, format, info.usage),
            width: info.width,
            height: info.height,
            array_size: info.array_size.max(1),
            mip_count: info.mip_count.max(1),
            sample_count: info.sample_count.max(1),
        };

        let mut images = Vec::with_capacity(SWAPCHAIN_IMAGE_COUNT as usize);
        for index in 0..SWAPCHAIN_IMAGE_COUNT {
            match backend.allocate_image(&desc, info.usage) {
                Ok(image) => images.push(image),
                Err(e) => {
                    warn!(index, error = %e, "swapchain image allocation failed");
                    for image in &images {
                        backend.release_image(image);
                    }
                    return Err(XrError::runtime(format!(
                        "swapchain image {index} allocation failed: {e}"
                    )));
                }
            }
        }

        let handle = SwapchainHandle::from_raw(self.handles.next_raw());
        info!(
            swapchain = %handle,
            backend = kind.name(),
            ?format,
            storage = ?desc.storage,
            width = desc.width,
            height = desc.height,
            layers = desc.array_size,
            samples = desc.sample_count,
            "swapchain created"
        );
        self.chains.insert(
            handle,
            Swapchain {
                session,
                format,
                native_format: info.format,
                usage: info.usage,
                desc,
                images,
                next_index: 0,
                last_acquired: None,
                last_released: None,
            },
        );
        Ok(handle)
    }

    pub fn destroy(
        &mut self,
        handle: SwapchainHandle,
        backend: Option<&mut (dyn GraphicsBackend + 'static)>,
    ) -> XrResult<()> {
        let chain = self
            .chains
            .remove(&handle)
            .ok_or_else(|| XrError::handle(format!("swapchain {handle}")))?;
        if let Some(backend) = backend {
            for image in &chain.images {
                backend.release_image(image);
            }
        }
        debug!(swapchain = %handle, "swapchain destroyed");
        Ok(())
    }

    /// Tear down every swapchain created by `session`.
    pub fn destroy_session(
        &mut self,
        session: SessionHandle,
        mut backend: Option<&mut (dyn GraphicsBackend + 'static)>,
    ) {
        let owned: Vec<SwapchainHandle> = self
            .chains
            .iter()
            .filter(|(_, chain)| chain.session == session)
            .map(|(handle, _)| *handle)
            .collect();
        for handle in owned {
            let _ = self.destroy(handle, backend.as_deref_mut());
        }
    }

    pub fn native_images(&self, handle: SwapchainHandle) -> XrResult<Vec<NativeImage>> {
        Ok(self.get(handle)?.images.iter().map(|i| i.native).collect())
    }

    pub fn acquire(&mut self, handle: SwapchainHandle) -> XrResult<u32> {
        Ok(self.get_mut(handle)?.acquire())
    }

    /// Images are always ready; waiting only checks the handle.
    pub fn wait(&mut self, handle: SwapchainHandle) -> XrResult<()> {
        self.get(handle).map(|_| ())
    }

    pub fn release(&mut self, handle: SwapchainHandle) -> XrResult<()> {
        self.get_mut(handle)?.release();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{D3D11Backend, DeviceMemory, OpenGlBackend};

    const SESSION: SessionHandle = SessionHandle::from_raw(0x1001);

    fn manager_with_chain() -> (SwapchainManager, D3D11Backend, SwapchainHandle) {
        let mut manager = SwapchainManager::new();
        let mut backend = D3D11Backend::new(DeviceMemory::unbounded());
        let handle = manager
            .create(SESSION, &mut backend, &SwapchainCreateInfo::color(29, 4, 4))
            .unwrap();
        (manager, backend, handle)
    }

    #[test]
    fn test_acquire_is_round_robin() {
        let (mut manager, _backend, handle) = manager_with_chain();
        let order: Vec<u32> = (0..4).map(|_| manager.acquire(handle).unwrap()).collect();
        assert_eq!(order, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_release_marks_last_acquired() {
        let (mut manager, _backend, handle) = manager_with_chain();
        assert_eq!(manager.get(handle).unwrap().display_index(), 0);
        manager.acquire(handle).unwrap();
        manager.acquire(handle).unwrap();
        assert_eq!(manager.get(handle).unwrap().display_index(), 1);
        manager.release(handle).unwrap();
        manager.acquire(handle).unwrap();
        let chain = manager.get(handle).unwrap();
        assert_eq!(chain.last_released(), Some(1));
        assert_eq!(chain.last_acquired(), Some(2));
        assert_eq!(chain.display_index(), 1);
    }

    #[test]
    fn test_unsupported_format() {
        let mut manager = SwapchainManager::new();
        let mut backend = OpenGlBackend::new(DeviceMemory::unbounded());
        // DXGI value on a GL session.
        let err = manager
            .create(SESSION, &mut backend, &SwapchainCreateInfo::color(29, 4, 4))
            .unwrap_err();
        assert!(matches!(err, XrError::SwapchainFormatUnsupported(29)));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_allocation_is_all_or_nothing() {
        let mut manager = SwapchainManager::new();
        // Room for two 4x4 RGBA8 images but not three.
        let mut backend = D3D11Backend::new(DeviceMemory::with_budget(2 * 64));
        let err = manager
            .create(SESSION, &mut backend, &SwapchainCreateInfo::color(29, 4, 4))
            .unwrap_err();
        assert!(matches!(err, XrError::Runtime(_)));
        assert!(manager.is_empty());
        assert_eq!(backend.allocated_bytes(), 0);
    }

    #[test]
    fn test_oversized_requests_rejected() {
        let mut manager = SwapchainManager::new();
        let mut backend = D3D11Backend::new(DeviceMemory::unbounded());
        // R32G32B32A32_FLOAT at the maximum extent with an absurd layer count.
        let mut info = SwapchainCreateInfo::color(2, 4096, 4096);
        info.array_size = u32::MAX;
        let err = manager.create(SESSION, &mut backend, &info).unwrap_err();
        assert!(matches!(err, XrError::Validation(_)));

        let mut info = SwapchainCreateInfo::color(29, 4, 4);
        info.sample_count = 64;
        assert!(manager.create(SESSION, &mut backend, &info).is_err());

        let info = SwapchainCreateInfo::color(29, 4097, 4);
        assert!(manager.create(SESSION, &mut backend, &info).is_err());

        assert!(manager.is_empty());
        assert_eq!(backend.allocated_bytes(), 0);
    }

    #[test]
    fn test_destroy_releases_images() {
        let (mut manager, mut backend, handle) = manager_with_chain();
        assert_eq!(backend.allocated_bytes(), 3 * 64);
        manager.destroy(handle, Some(&mut backend)).unwrap();
        assert_eq!(backend.allocated_bytes(), 0);
        assert!(matches!(
            manager.acquire(handle),
            Err(XrError::HandleInvalid(_))
        ));
    }

    #[test]
    fn test_destroy_session_chains() {
        let (mut manager, mut backend, _handle) = manager_with_chain();
        let other = SessionHandle::from_raw(0x1002);
        let kept = manager
            .create(other, &mut backend, &SwapchainCreateInfo::color(28, 2, 2))
            .unwrap();
        manager.destroy_session(SESSION, Some(&mut backend));
        assert_eq!(manager.len(), 1);
        assert!(manager.get(kept).is_ok());
    }
}
