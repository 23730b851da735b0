//! Command-list backend.
//!
//! Every resource carries a tracked state. A readback records a transition into
//! `CopySource`, the copy, and a transition back to whatever state the resource had
//! before, so the application never observes a changed state. Recorded commands run
//! when the frame is presented.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::{BackendKind, DeviceMemory, GraphicsBackend, NativeImage, SwapchainImage};
use crate::error::XrResult;
use crate::handle::HandleAllocator;
use crate::image::{ImageDesc, PixelRect, RgbaImage};
use crate::surface::PreviewSurface;
use crate::swapchain::SwapchainUsage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Common,
    RenderTarget,
    DepthWrite,
    CopySource,
    PixelShaderResource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierCommand {
    Transition {
        resource: u64,
        before: ResourceState,
        after: ResourceState,
    },
    Copy {
        resource: u64,
        layer: u32,
    },
}

pub struct D3D12Backend {
    memory: DeviceMemory,
    resources: HandleAllocator,
    states: HashMap<u64, ResourceState>,
    recording: Vec<BarrierCommand>,
    executed: Vec<BarrierCommand>,
    fence: u64,
}

impl D3D12Backend {
    pub fn new(memory: DeviceMemory) -> Self {
        Self {
            memory,
            resources: HandleAllocator::starting_at(0x1200_0000),
            states: HashMap::new(),
            recording: Vec::new(),
            executed: Vec::new(),
            fence: 0,
        }
    }

    pub fn state(&self, resource: u64) -> Option<ResourceState> {
        self.states.get(&resource).copied()
    }

    /// Simulate the application transitioning a resource on its own queue.
    pub fn set_state(&mut self, resource: u64, state: ResourceState) {
        if let Some(current) = self.states.get_mut(&resource) {
            *current = state;
        }
    }

    /// Commands recorded since the last present.
    pub fn recorded(&self) -> &[BarrierCommand] {
        &self.recording
    }

    /// Commands run by the most recent present.
    pub fn last_executed(&self) -> &[BarrierCommand] {
        &self.executed
    }

    pub fn fence_value(&self) -> u64 {
        self.fence
    }

    fn transition(&mut self, resource: u64, before: ResourceState, after: ResourceState) {
        self.recording.push(BarrierCommand::Transition {
            resource,
            before,
            after,
        });
        self.states.insert(resource, after);
    }
}

impl GraphicsBackend for D3D12Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::D3D12
    }

    fn supports_channel_masks(&self) -> bool {
        false
    }

    fn allocate_image(
        &mut self,
        desc: &ImageDesc,
        usage: SwapchainUsage,
    ) -> XrResult<SwapchainImage> {
        let image = self.memory.allocate(desc)?;
        let resource = self.resources.next_raw();
        let initial = if usage.contains(SwapchainUsage::COLOR_ATTACHMENT) && !desc.format.is_depth()
        {
            ResourceState::RenderTarget
        } else {
            ResourceState::Common
        };
        self.states.insert(resource, initial);
        debug!(resource, state = ?initial, dxgi = desc.storage.dxgi(), "D3D12 resource created");
        Ok(SwapchainImage {
            native: NativeImage::D3D12Resource(resource),
            image,
        })
    }

    fn release_image(&mut self, image: &SwapchainImage) {
        self.states.remove(&image.native.raw());
        self.memory.free(&image.image);
    }

    fn read_image(
        &mut self,
        image: &SwapchainImage,
        layer: u32,
        region: Option<PixelRect>,
    ) -> XrResult<RgbaImage> {
        let resource = image.native.raw();
        let prior = self.state(resource).unwrap_or(ResourceState::Common);
        self.transition(resource, prior, ResourceState::CopySource);
        let result = image.image.read_rgba(layer, region);
        if result.is_ok() {
            self.recording
                .push(BarrierCommand::Copy { resource, layer });
        }
        self.transition(resource, ResourceState::CopySource, prior);
        result
    }

    fn present(&mut self, surface: &mut dyn PreviewSurface, canvas: &RgbaImage) -> XrResult<()> {
        self.executed = std::mem::take(&mut self.recording);
        self.fence += 1;
        trace!(
            fence = self.fence,
            commands = self.executed.len(),
            "command list executed"
        );
        surface.present(canvas)
    }

    fn allocated_bytes(&self) -> usize {
        self.memory.used()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PixelFormat;
    use crate::surface::HeadlessSurface;

    fn desc(format: PixelFormat) -> ImageDesc {
        ImageDesc {
            format,
            storage: format.typeless(),
            width: 2,
            height: 2,
            array_size: 1,
            mip_count: 1,
            sample_count: 1,
        }
    }

    #[test]
    fn test_initial_state_from_usage() {
        let mut backend = D3D12Backend::new(DeviceMemory::unbounded());
        let color = backend
            .allocate_image(&desc(PixelFormat::Rgba8Srgb), SwapchainUsage::COLOR_ATTACHMENT)
            .unwrap();
        let sampled = backend
            .allocate_image(&desc(PixelFormat::Rgba8Srgb), SwapchainUsage::SAMPLED)
            .unwrap();
        let depth = backend
            .allocate_image(
                &desc(PixelFormat::D32Float),
                SwapchainUsage::COLOR_ATTACHMENT | SwapchainUsage::DEPTH_STENCIL_ATTACHMENT,
            )
            .unwrap();
        assert_eq!(backend.state(color.native.raw()), Some(ResourceState::RenderTarget));
        assert_eq!(backend.state(sampled.native.raw()), Some(ResourceState::Common));
        assert_eq!(backend.state(depth.native.raw()), Some(ResourceState::Common));
    }

    #[test]
    fn test_read_restores_prior_state() {
        let mut backend = D3D12Backend::new(DeviceMemory::unbounded());
        let image = backend
            .allocate_image(&desc(PixelFormat::Rgba8Srgb), SwapchainUsage::COLOR_ATTACHMENT)
            .unwrap();
        let resource = image.native.raw();
        backend.set_state(resource, ResourceState::PixelShaderResource);

        backend.read_image(&image, 0, None).unwrap();
        assert_eq!(
            backend.recorded(),
            &[
                BarrierCommand::Transition {
                    resource,
                    before: ResourceState::PixelShaderResource,
                    after: ResourceState::CopySource,
                },
                BarrierCommand::Copy { resource, layer: 0 },
                BarrierCommand::Transition {
                    resource,
                    before: ResourceState::CopySource,
                    after: ResourceState::PixelShaderResource,
                },
            ]
        );
        assert_eq!(backend.state(resource), Some(ResourceState::PixelShaderResource));

        let mut surface = HeadlessSurface::new(4, 4);
        backend
            .present(&mut surface, &RgbaImage::new(4, 4, [0; 4]))
            .unwrap();
        assert!(backend.recorded().is_empty());
        assert_eq!(backend.last_executed().len(), 3);
        assert_eq!(backend.fence_value(), 1);
    }

    #[test]
    fn test_failed_read_still_restores() {
        let mut backend = D3D12Backend::new(DeviceMemory::unbounded());
        let image = backend
            .allocate_image(&desc(PixelFormat::Rgba8Srgb), SwapchainUsage::COLOR_ATTACHMENT)
            .unwrap();
        let resource = image.native.raw();
        assert!(backend.read_image(&image, 5, None).is_err());
        assert_eq!(backend.recorded().len(), 2);
        assert_eq!(backend.state(resource), Some(ResourceState::RenderTarget));
    }
}
