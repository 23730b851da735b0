//! Preview surface seam.
//!
//! The compositor presents one canvas per frame to a [`PreviewSurface`]. The surface is
//! shared between the application thread and whoever pumps its events, so it lives in a
//! [`SurfaceSlot`].

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::XrResult;
use crate::image::RgbaImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    FocusGained,
    FocusLost,
    CloseRequested,
    Resized { width: u32, height: u32 },
}

pub trait PreviewSurface: Send {
    fn size(&self) -> (u32, u32);
    fn has_focus(&self) -> bool;
    /// Drain window-system events received since the last call.
    fn pump_events(&mut self) -> Vec<SurfaceEvent>;
    fn present(&mut self, canvas: &RgbaImage) -> XrResult<()>;
}

/// Creates the preview surface on first `xrBeginSession`.
pub type SurfaceFactory = Box<dyn Fn(u32, u32) -> XrResult<Box<dyn PreviewSurface>> + Send>;

pub fn headless_factory() -> SurfaceFactory {
    Box::new(|width, height| {
        Ok(Box::new(HeadlessSurface::new(width, height)) as Box<dyn PreviewSurface>)
    })
}

/// At most one preview surface per runtime.
#[derive(Clone, Default)]
pub struct SurfaceSlot {
    inner: Arc<Mutex<Option<Box<dyn PreviewSurface>>>>,
}

impl SurfaceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn PreviewSurface>>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    pub fn open(&self, surface: Box<dyn PreviewSurface>) {
        *self.lock() = Some(surface);
    }

    pub fn close(&self) -> bool {
        self.lock().take().is_some()
    }

    /// Run `f` against the surface if one is open.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn PreviewSurface) -> R) -> Option<R> {
        let mut guard = self.lock();
        guard.as_mut().map(|surface| f(surface.as_mut()))
    }
}

#[derive(Debug, Default)]
struct HeadlessState {
    width: u32,
    height: u32,
    focused: bool,
    pending: Vec<SurfaceEvent>,
    presents: u64,
    last_frame: Option<RgbaImage>,
}

/// In-memory surface. Clones observe the same state, so a test can keep a handle after
/// giving one to the runtime.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState {
                width,
                height,
                focused: true,
                ..HeadlessState::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn unfocused(width: u32, height: u32) -> Self {
        let surface = Self::new(width, height);
        surface.lock().focused = false;
        surface
    }

    pub fn set_focus(&self, focused: bool) {
        let mut state = self.lock();
        if state.focused != focused {
            state.focused = focused;
            state.pending.push(if focused {
                SurfaceEvent::FocusGained
            } else {
                SurfaceEvent::FocusLost
            });
        }
    }

    pub fn request_close(&self) {
        self.lock().pending.push(SurfaceEvent::CloseRequested);
    }

    pub fn resize(&self, width: u32, height: u32) {
        let mut state = self.lock();
        state.width = width;
        state.height = height;
        state.pending.push(SurfaceEvent::Resized { width, height });
    }

    pub fn present_count(&self) -> u64 {
        self.lock().presents
    }

    pub fn last_frame(&self) -> Option<RgbaImage> {
        self.lock().last_frame.clone()
    }
}

impl PreviewSurface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        let state = self.lock();
        (state.width, state.height)
    }

    fn has_focus(&self) -> bool {
        self.lock().focused
    }

    fn pump_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.lock().pending)
    }

    fn present(&mut self, canvas: &RgbaImage) -> XrResult<()> {
        let mut state = self.lock();
        state.presents += 1;
        state.last_frame = Some(canvas.clone());
        Ok(())
    }
}
