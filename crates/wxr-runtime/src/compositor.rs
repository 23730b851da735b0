//! Preview compositor.
//!
//! Runs once per `xrEndFrame`: draws the projection views into a canvas sized to the
//! preview surface, blends quad overlays on top and presents exactly once.

use tracing::{debug, info, warn};
use wxr_common::{DisplayLayout, RuntimeConfig, ViewMode};

use crate::backend::GraphicsBackend;
use crate::error::XrResult;
use crate::handle::SwapchainHandle;
use crate::image::{PixelRect, RgbaImage};
use crate::surface::PreviewSurface;
use crate::swapchain::SwapchainManager;

pub const CLEAR_COLOR: [u8; 4] = [26, 26, 51, 255];
pub const ANAGLYPH_CLEAR_COLOR: [u8; 4] = [0, 0, 0, 255];
pub const MARKER_SIZE: u32 = 10;
const QUAD_SCREEN_FRACTION: f32 = 0.9;

/// Frames logged unconditionally before switching to one log line per `LOG_EVERY`.
const LOG_FIRST_FRAMES: u64 = 10;
const LOG_EVERY: u64 = 60;

pub fn should_log_frame(frame: u64) -> bool {
    frame < LOG_FIRST_FRAMES || frame % LOG_EVERY == 0
}

/// Signed rectangle as submitted by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect2Di {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect2Di {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubImage {
    pub swapchain: SwapchainHandle,
    pub rect: Rect2Di,
    pub array_index: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompositionLayer {
    Projection { views: Vec<SubImage> },
    Quad { sub_image: SubImage, size: (f32, f32) },
    Cylinder { sub_image: SubImage },
    /// Any other layer structure type. Counted and ignored.
    Other { type_raw: i32 },
}

/// Clamp a submitted rectangle to an image. `None` means the rectangle selects nothing.
pub fn clamp_rect(rect: Rect2Di, width: u32, height: u32) -> Option<PixelRect> {
    let (w_max, h_max) = (width as i64, height as i64);
    let (mut x, mut y) = (rect.x as i64, rect.y as i64);
    let (mut w, mut h) = (rect.width as i64, rect.height as i64);
    if x < 0 {
        w += x;
        x = 0;
    }
    if y < 0 {
        h += y;
        y = 0;
    }
    if x >= w_max || y >= h_max {
        return None;
    }
    w = w.min(w_max - x);
    h = h.min(h_max - y);
    if w <= 0 || h <= 0 {
        return None;
    }
    Some(PixelRect {
        x: x as u32,
        y: y as u32,
        width: w as u32,
        height: h as u32,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

/// Channels an eye is allowed to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMask {
    All,
    Red,
    GreenBlue,
}

impl ChannelMask {
    fn apply(self, dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
        match self {
            Self::All => src,
            Self::Red => [src[0], dst[1], dst[2], dst[3]],
            Self::GreenBlue => [dst[0], src[1], src[2], dst[3]],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeTarget {
    pub eye: Eye,
    pub viewport: Viewport,
    pub mask: ChannelMask,
}

/// Layout actually used, after downgrading anaglyph on backends without write masks.
pub fn effective_layout(layout: DisplayLayout, masks_supported: bool) -> DisplayLayout {
    match layout {
        DisplayLayout::Anaglyph if !masks_supported => DisplayLayout::SideBySide,
        other => other,
    }
}

/// Where each eye lands on a `width` x `height` surface.
pub fn eye_targets(
    mode: ViewMode,
    layout: DisplayLayout,
    width: u32,
    height: u32,
) -> Vec<EyeTarget> {
    let full = Viewport {
        x: 0,
        y: 0,
        width,
        height,
    };
    let target = |eye, viewport| EyeTarget {
        eye,
        viewport,
        mask: ChannelMask::All,
    };
    match mode {
        ViewMode::LeftOnly => vec![target(Eye::Left, full)],
        ViewMode::RightOnly => vec![target(Eye::Right, full)],
        ViewMode::Both => match layout {
            DisplayLayout::SideBySide => {
                let half = width / 2;
                vec![
                    target(
                        Eye::Left,
                        Viewport {
                            x: 0,
                            y: 0,
                            width: half,
                            height,
                        },
                    ),
                    target(
                        Eye::Right,
                        Viewport {
                            x: half,
                            y: 0,
                            width: width - half,
                            height,
                        },
                    ),
                ]
            }
            DisplayLayout::OverUnder => {
                let half = height / 2;
                vec![
                    target(
                        Eye::Left,
                        Viewport {
                            x: 0,
                            y: 0,
                            width,
                            height: half,
                        },
                    ),
                    target(
                        Eye::Right,
                        Viewport {
                            x: 0,
                            y: half,
                            width,
                            height: height - half,
                        },
                    ),
                ]
            }
            DisplayLayout::Anaglyph => vec![
                EyeTarget {
                    eye: Eye::Left,
                    viewport: full,
                    mask: ChannelMask::Red,
                },
                EyeTarget {
                    eye: Eye::Right,
                    viewport: full,
                    mask: ChannelMask::GreenBlue,
                },
            ],
        },
    }
}

/// Fit a quad of physical `size` into 90% of the surface, keeping its aspect ratio, and
/// center it. A degenerate size falls back to the source image's aspect.
pub fn quad_viewport(
    size: (f32, f32),
    source: (u32, u32),
    surface_width: u32,
    surface_height: u32,
) -> Viewport {
    let aspect = if size.0 > 0.0 && size.1 > 0.0 && (size.0 / size.1).is_finite() {
        size.0 / size.1
    } else if source.1 > 0 {
        source.0 as f32 / source.1 as f32
    } else {
        1.0
    };
    let (sw, sh) = (surface_width as f32, surface_height as f32);
    let mut display_w = sw * QUAD_SCREEN_FRACTION;
    let mut display_h = display_w / aspect;
    if display_h > sh * QUAD_SCREEN_FRACTION {
        display_h = sh * QUAD_SCREEN_FRACTION;
        display_w = display_h * aspect;
    }
    let width = (display_w.round() as u32).min(surface_width);
    let height = (display_h.round() as u32).min(surface_height);
    Viewport {
        x: (surface_width - width) / 2,
        y: (surface_height - height) / 2,
        width,
        height,
    }
}

/// Nearest-neighbour blit of `src` scaled into `viewport`.
fn blit(canvas: &mut RgbaImage, src: &RgbaImage, viewport: Viewport, mask: ChannelMask) {
    if src.width() == 0 || src.height() == 0 || viewport.width == 0 || viewport.height == 0 {
        return;
    }
    for py in 0..viewport.height {
        let sy = sample_coord(py, viewport.height, src.height());
        for px in 0..viewport.width {
            let sx = sample_coord(px, viewport.width, src.width());
            let (dx, dy) = (viewport.x + px, viewport.y + py);
            if let (Some(s), Some(d)) = (src.get(sx, sy), canvas.get(dx, dy)) {
                canvas.put(dx, dy, mask.apply(d, s));
            }
        }
    }
}

/// Source-over alpha blend of `src` scaled into `viewport`.
fn blend(canvas: &mut RgbaImage, src: &RgbaImage, viewport: Viewport) {
    if src.width() == 0 || src.height() == 0 {
        return;
    }
    for py in 0..viewport.height {
        let sy = sample_coord(py, viewport.height, src.height());
        for px in 0..viewport.width {
            let sx = sample_coord(px, viewport.width, src.width());
            let (dx, dy) = (viewport.x + px, viewport.y + py);
            if let (Some(s), Some(d)) = (src.get(sx, sy), canvas.get(dx, dy)) {
                canvas.put(dx, dy, over(s, d));
            }
        }
    }
}

fn sample_coord(p: u32, extent: u32, src_extent: u32) -> u32 {
    let s = ((p as f64 + 0.5) * src_extent as f64 / extent as f64).floor() as u32;
    s.min(src_extent - 1)
}

fn over(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let a = src[3] as u32;
    let inv = 255 - a;
    let mix = |s: u8, d: u8| ((s as u32 * a + d as u32 * inv + 127) / 255) as u8;
    let alpha = (a + (dst[3] as u32 * inv + 127) / 255).min(255) as u8;
    [
        mix(src[0], dst[0]),
        mix(src[1], dst[1]),
        mix(src[2], dst[2]),
        alpha,
    ]
}

fn draw_marker(canvas: &mut RgbaImage, viewport: Viewport, marker_id: i64) {
    let color = [(marker_id & 0xff) as u8, 0, 0, 255];
    for y in 0..MARKER_SIZE.min(viewport.height) {
        for x in 0..MARKER_SIZE.min(viewport.width) {
            canvas.put(viewport.x + x, viewport.y + y, color);
        }
    }
}

/// What a composed frame contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    pub eyes_drawn: u32,
    pub quads_drawn: u32,
    pub cylinders_skipped: u32,
    pub unknown_skipped: u32,
    pub images_failed: u32,
    pub presented: bool,
}

pub struct Compositor {
    view_mode: ViewMode,
    layout: DisplayLayout,
    show_full_render: bool,
}

impl Compositor {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            view_mode: config.view_mode,
            layout: config.display_layout,
            show_full_render: config.show_full_render,
        }
    }

    /// Read one sub-image as display pixels. Returns `None` for anything that cannot be
    /// shown this frame.
    fn read_sub_image(
        &self,
        sub: &SubImage,
        swapchains: &SwapchainManager,
        backend: &mut dyn GraphicsBackend,
        report: &mut FrameReport,
    ) -> Option<RgbaImage> {
        let chain = match swapchains.get(sub.swapchain) {
            Ok(chain) => chain,
            Err(e) => {
                warn!(swapchain = %sub.swapchain, error = %e, "layer references unknown swapchain");
                report.images_failed += 1;
                return None;
            }
        };
        if chain.format().is_depth() {
            return None;
        }
        let index = chain.display_index();
        let image = chain.image(index)?;
        let desc = image.image.desc();
        let full = PixelRect::full(desc.width, desc.height);
        let region = match clamp_rect(sub.rect, desc.width, desc.height) {
            Some(rect) if desc.sample_count <= 1 && rect != full && !self.show_full_render => {
                Some(rect)
            }
            _ => None,
        };
        match backend.read_image(image, sub.array_index, region) {
            Ok(pixels) => Some(pixels),
            Err(e) => {
                warn!(swapchain = %sub.swapchain, index, error = %e, "swapchain image read failed");
                report.images_failed += 1;
                None
            }
        }
    }

    /// Quad sub-image: an empty extent selects the whole swapchain image.
    fn quad_rect(sub: &SubImage, width: u32, height: u32) -> Rect2Di {
        if sub.rect.width == 0 || sub.rect.height == 0 {
            Rect2Di::new(0, 0, width as i32, height as i32)
        } else {
            sub.rect
        }
    }

    /// `frame` counts submitted frames; `marker_id` is the tracking frame id stamped into
    /// the marker so a capture can be matched to the pose that produced it.
    pub fn compose(
        &mut self,
        frame: u64,
        marker_id: i64,
        layers: &[CompositionLayer],
        swapchains: &SwapchainManager,
        backend: &mut dyn GraphicsBackend,
        surface: &mut dyn PreviewSurface,
    ) -> XrResult<FrameReport> {
        let mut report = FrameReport::default();
        let layout = effective_layout(self.layout, backend.supports_channel_masks());
        let (width, height) = surface.size();
        let clear = if layout == DisplayLayout::Anaglyph {
            ANAGLYPH_CLEAR_COLOR
        } else {
            CLEAR_COLOR
        };
        let mut canvas = RgbaImage::new(width, height, clear);

        let mut projections = Vec::new();
        let mut quads = Vec::new();
        for layer in layers {
            match layer {
                CompositionLayer::Projection { views } => projections.push(views),
                CompositionLayer::Quad { sub_image, size } => quads.push((sub_image, *size)),
                CompositionLayer::Cylinder { sub_image } => {
                    debug!(swapchain = %sub_image.swapchain, "cylinder layer skipped");
                    report.cylinders_skipped += 1;
                }
                CompositionLayer::Other { type_raw } => {
                    debug!(type_raw, "unknown layer type skipped");
                    report.unknown_skipped += 1;
                }
            }
        }

        let targets = eye_targets(self.view_mode, layout, width, height);
        let mut marker: Option<Viewport> = None;
        for views in &projections {
            let left = views
                .first()
                .and_then(|v| self.read_sub_image(v, swapchains, backend, &mut report));
            let right = match views.get(1) {
                Some(v) => self.read_sub_image(v, swapchains, backend, &mut report),
                None => left.clone(),
            };
            for target in &targets {
                let source = match target.eye {
                    Eye::Left => left.as_ref(),
                    Eye::Right => right.as_ref(),
                };
                if let Some(source) = source {
                    blit(&mut canvas, source, target.viewport, target.mask);
                    report.eyes_drawn += 1;
                    marker.get_or_insert(target.viewport);
                }
            }
        }

        for (sub_image, size) in quads {
            let Ok(chain) = swapchains.get(sub_image.swapchain) else {
                warn!(swapchain = %sub_image.swapchain, "quad references unknown swapchain");
                report.images_failed += 1;
                continue;
            };
            let sub = SubImage {
                rect: Self::quad_rect(sub_image, chain.width(), chain.height()),
                ..*sub_image
            };
            let Some(pixels) = self.read_sub_image(&sub, swapchains, backend, &mut report) else {
                continue;
            };
            let viewport = quad_viewport(size, (pixels.width(), pixels.height()), width, height);
            blend(&mut canvas, &pixels, viewport);
            report.quads_drawn += 1;
        }

        if let Some(viewport) = marker {
            draw_marker(&mut canvas, viewport, marker_id);
        }

        backend.present(surface, &canvas)?;
        report.presented = true;

        if should_log_frame(frame) {
            info!(
                frame,
                marker_id,
                layers = layers.len(),
                eyes = report.eyes_drawn,
                quads = report.quads_drawn,
                ?layout,
                "frame composed"
            );
        }
        Ok(report)
    }
}
