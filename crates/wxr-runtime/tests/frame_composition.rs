//! Integration tests for frame composition
//!
//! Tests the following:
//! - One present per frame with projection, quads and skipped layer types
//! - Quad ordering and sub-image cropping
//! - Anaglyph on D3D11 and its side-by-side fallback on OpenGL
//! - OpenGL bottom-up readback
//! - D3D12 resource state restore around compositor reads
//! - Depth swapchains never reaching the preview

use std::sync::Arc;

use wxr_common::{DisplayLayout, RuntimeConfig, ViewMode};
use wxr_runtime::backend::{BarrierCommand, D3D12Backend, DeviceMemory, ResourceState};
use wxr_runtime::compositor::CLEAR_COLOR;
use wxr_runtime::{
    CompositionLayer, Compositor, GraphicsBinding, HeadlessSurface, PoseSnapshot, PoseSource,
    PreviewSurface, Rect2Di, Runtime, SessionHandle, SubImage, SurfaceFactory,
    SwapchainCreateInfo, SwapchainHandle, SwapchainManager,
};

const DXGI_R8G8B8A8_UNORM: i64 = 28;
const DXGI_D32_FLOAT: i64 = 40;
const GL_RGBA8: i64 = 0x8058;
const BLEND_OPAQUE: i32 = 1;

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const GRAY: [u8; 4] = [100, 100, 100, 255];

fn setup(
    config: RuntimeConfig,
    binding: GraphicsBinding,
) -> (Runtime, SessionHandle, HeadlessSurface) {
    let surface = HeadlessSurface::new(64, 32);
    let shared = surface.clone();
    let config = RuntimeConfig {
        frame_rate: 1000.0,
        ..config
    };
    let pose = Arc::new(PoseSource::manual("127.0.0.1:9".parse().expect("address")));
    pose.publish(PoseSnapshot::identity());
    let factory: SurfaceFactory =
        Box::new(move |_, _| Ok(Box::new(shared.clone()) as Box<dyn PreviewSurface>));
    let mut rt = Runtime::new(config, pose, factory);
    let instance = rt.create_instance::<&str>("compose", &[], &[]).expect("instance");
    let session = rt
        .create_session(instance, 1, Some(binding))
        .expect("session");
    rt.begin_session(session, 2).expect("begin");
    (rt, session, surface)
}

fn d3d11() -> GraphicsBinding {
    GraphicsBinding::D3D11 { device: 0xd3d }
}

fn chain(rt: &mut Runtime, session: SessionHandle, format: i64, w: u32, h: u32) -> SwapchainHandle {
    rt.create_swapchain(session, &SwapchainCreateInfo::color(format, w, h))
        .expect("swapchain")
}

/// Render one frame into the chain: acquire, fill, release.
fn fill(rt: &mut Runtime, chain: SwapchainHandle, rgba: [u8; 4]) -> u32 {
    let index = rt.acquire_swapchain_image(chain).expect("acquire");
    rt.wait_swapchain_image(chain).expect("wait");
    rt.swapchain_image_mut(chain, index)
        .expect("image")
        .fill_rgba8(0, rgba)
        .expect("fill");
    rt.release_swapchain_image(chain).expect("release");
    index
}

fn full(chain: SwapchainHandle, w: i32, h: i32) -> SubImage {
    SubImage {
        swapchain: chain,
        rect: Rect2Di::new(0, 0, w, h),
        array_index: 0,
    }
}

fn frame(rt: &mut Runtime, session: SessionHandle, layers: &[CompositionLayer]) -> wxr_runtime::FrameReport {
    rt.wait_frame(session).expect("wait frame");
    rt.begin_frame(session).expect("begin frame");
    rt.end_frame(session, BLEND_OPAQUE, layers).expect("end frame")
}

#[test]
fn test_two_quads_one_projection_single_present() {
    let (mut rt, session, surface) = setup(RuntimeConfig::default(), d3d11());
    let eye = chain(&mut rt, session, DXGI_R8G8B8A8_UNORM, 32, 32);
    let first = chain(&mut rt, session, DXGI_R8G8B8A8_UNORM, 16, 16);
    let second = chain(&mut rt, session, DXGI_R8G8B8A8_UNORM, 16, 16);
    fill(&mut rt, eye, GRAY);
    fill(&mut rt, first, RED);
    fill(&mut rt, second, GREEN);

    let layers = vec![
        CompositionLayer::Projection {
            views: vec![full(eye, 32, 32)],
        },
        CompositionLayer::Quad {
            sub_image: full(first, 16, 16),
            size: (1.0, 1.0),
        },
        CompositionLayer::Cylinder {
            sub_image: full(first, 16, 16),
        },
        CompositionLayer::Quad {
            sub_image: full(second, 0, 0),
            size: (1.0, 1.0),
        },
        CompositionLayer::Other { type_raw: 12345 },
    ];
    let report = frame(&mut rt, session, &layers);

    assert!(report.presented);
    assert_eq!(report.eyes_drawn, 2);
    assert_eq!(report.quads_drawn, 2);
    assert_eq!(report.cylinders_skipped, 1);
    assert_eq!(report.unknown_skipped, 1);
    assert_eq!(surface.present_count(), 1);

    let canvas = surface.last_frame().expect("presented frame");
    assert_eq!(canvas.get(32, 16), Some(GREEN));
    assert_eq!(canvas.get(5, 20), Some(GRAY));
    assert_eq!(canvas.get(60, 20), Some(GRAY));
}

#[test]
fn test_negative_offset_crop() {
    let config = RuntimeConfig {
        view_mode: ViewMode::LeftOnly,
        ..RuntimeConfig::default()
    };
    let (mut rt, session, surface) = setup(config, d3d11());
    let eye = chain(&mut rt, session, DXGI_R8G8B8A8_UNORM, 1280, 720);
    let index = fill(&mut rt, eye, BLUE);
    let image = rt.swapchain_image_mut(eye, index).expect("image");
    for y in 0..150 {
        for x in 0..150 {
            image.write_texel(0, x, y, &RED).expect("texel");
        }
    }

    let layers = vec![CompositionLayer::Projection {
        views: vec![SubImage {
            swapchain: eye,
            rect: Rect2Di::new(-50, -50, 200, 200),
            array_index: 0,
        }],
    }];
    let report = frame(&mut rt, session, &layers);
    assert_eq!(report.eyes_drawn, 1);

    let canvas = surface.last_frame().expect("presented frame");
    assert_eq!(canvas.get(40, 20), Some(RED));
    assert_eq!(canvas.get(63, 31), Some(RED));
}

#[test]
fn test_anaglyph_on_d3d11() {
    let config = RuntimeConfig {
        display_layout: DisplayLayout::Anaglyph,
        ..RuntimeConfig::default()
    };
    let (mut rt, session, surface) = setup(config, d3d11());
    let left = chain(&mut rt, session, DXGI_R8G8B8A8_UNORM, 16, 16);
    let right = chain(&mut rt, session, DXGI_R8G8B8A8_UNORM, 16, 16);
    fill(&mut rt, left, RED);
    fill(&mut rt, right, BLUE);

    let layers = vec![CompositionLayer::Projection {
        views: vec![full(left, 16, 16), full(right, 16, 16)],
    }];
    frame(&mut rt, session, &layers);

    let canvas = surface.last_frame().expect("presented frame");
    assert_eq!(canvas.get(40, 20), Some([255, 0, 255, 255]));
    assert_eq!(canvas.get(20, 20), Some([255, 0, 255, 255]));
}

#[test]
fn test_anaglyph_falls_back_to_side_by_side_on_gl() {
    let config = RuntimeConfig {
        display_layout: DisplayLayout::Anaglyph,
        ..RuntimeConfig::default()
    };
    let binding = GraphicsBinding::OpenGl {
        hdc: 0x1,
        hglrc: 0x2,
    };
    let (mut rt, session, surface) = setup(config, binding);
    let left = chain(&mut rt, session, GL_RGBA8, 16, 16);
    let right = chain(&mut rt, session, GL_RGBA8, 16, 16);
    fill(&mut rt, left, RED);
    fill(&mut rt, right, BLUE);

    let layers = vec![CompositionLayer::Projection {
        views: vec![full(left, 16, 16), full(right, 16, 16)],
    }];
    frame(&mut rt, session, &layers);

    let canvas = surface.last_frame().expect("presented frame");
    assert_eq!(canvas.get(20, 20), Some(RED));
    assert_eq!(canvas.get(40, 20), Some(BLUE));
}

#[test]
fn test_gl_readback_is_flipped() {
    let config = RuntimeConfig {
        view_mode: ViewMode::LeftOnly,
        ..RuntimeConfig::default()
    };
    let binding = GraphicsBinding::OpenGl {
        hdc: 0x1,
        hglrc: 0x2,
    };
    let (mut rt, session, surface) = setup(config, binding);
    let eye = chain(&mut rt, session, GL_RGBA8, 8, 8);
    let index = fill(&mut rt, eye, BLUE);
    let image = rt.swapchain_image_mut(eye, index).expect("image");
    // GL row 0 is the bottom of the picture.
    for x in 0..8 {
        image.write_texel(0, x, 0, &RED).expect("texel");
    }

    frame(
        &mut rt,
        session,
        &[CompositionLayer::Projection {
            views: vec![full(eye, 8, 8)],
        }],
    );
    let canvas = surface.last_frame().expect("presented frame");
    assert_eq!(canvas.get(30, 31), Some(RED));
    assert_eq!(canvas.get(30, 16), Some(BLUE));
}

#[test]
fn test_depth_swapchain_not_displayed() {
    let (mut rt, session, surface) = setup(RuntimeConfig::default(), d3d11());
    let depth = chain(&mut rt, session, DXGI_D32_FLOAT, 16, 16);
    rt.acquire_swapchain_image(depth).expect("acquire");
    rt.release_swapchain_image(depth).expect("release");

    let report = frame(
        &mut rt,
        session,
        &[CompositionLayer::Projection {
            views: vec![full(depth, 16, 16)],
        }],
    );
    assert_eq!(report.eyes_drawn, 0);
    assert!(report.presented);
    let canvas = surface.last_frame().expect("presented frame");
    assert!(canvas.pixels().iter().all(|p| *p == CLEAR_COLOR));
}

#[test]
fn test_d3d12_read_restores_application_state() {
    let mut backend = D3D12Backend::new(DeviceMemory::unbounded());
    let mut swapchains = SwapchainManager::new();
    let session = SessionHandle::from_raw(0x1001);
    let handle = swapchains
        .create(
            session,
            &mut backend,
            &SwapchainCreateInfo::color(DXGI_R8G8B8A8_UNORM, 16, 16),
        )
        .expect("swapchain");
    let index = swapchains.acquire(handle).expect("acquire");
    swapchains
        .get_mut(handle)
        .unwrap()
        .image_mut(index)
        .unwrap()
        .image
        .fill_rgba8(0, GREEN)
        .unwrap();
    swapchains.release(handle).expect("release");

    let resource = swapchains.native_images(handle).unwrap()[index as usize].raw();
    assert_eq!(backend.state(resource), Some(ResourceState::RenderTarget));
    backend.set_state(resource, ResourceState::PixelShaderResource);

    let mut compositor = Compositor::new(&RuntimeConfig::default());
    let mut surface = HeadlessSurface::new(32, 16);
    let layers = [CompositionLayer::Projection {
        views: vec![full(handle, 16, 16)],
    }];
    let report = compositor
        .compose(0, 7, &layers, &swapchains, &mut backend, &mut surface)
        .expect("compose");

    assert_eq!(report.eyes_drawn, 2);
    assert_eq!(backend.state(resource), Some(ResourceState::PixelShaderResource));
    assert_eq!(backend.fence_value(), 1);
    assert!(backend.recorded().is_empty());
    assert_eq!(
        backend.last_executed(),
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
    let canvas = surface.last_frame().expect("presented frame");
    assert_eq!(canvas.get(0, 0), Some([7, 0, 0, 255]));
    assert_eq!(canvas.get(20, 12), Some(GREEN));
}
