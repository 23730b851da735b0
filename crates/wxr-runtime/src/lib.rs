//! Core of the WXR emulated headset runtime.
//!
//! Everything here is plain safe Rust with no OpenXR ABI types: the loader-facing library
//! translates C structures into these types and back. The entry point is [`Runtime`].

#![forbid(unsafe_code)]

pub mod backend;
pub mod compositor;
pub mod error;
pub mod event;
pub mod format;
pub mod handle;
pub mod image;
pub mod input;
pub mod names;
pub mod pose;
pub mod pose_source;
pub mod runtime;
pub mod space;
pub mod state;
pub mod surface;
pub mod swapchain;
pub mod system;
pub mod tracking;

pub use backend::{BackendKind, GraphicsBackend, GraphicsBinding, NativeImage};
pub use compositor::{CompositionLayer, Compositor, FrameReport, Rect2Di, SubImage};
pub use error::{result_name, XrCode, XrError, XrResult};
pub use event::{Event, EventQueue};
pub use handle::{
    ActionHandle, ActionSetHandle, InstanceHandle, SessionHandle, SpaceHandle, SwapchainHandle,
};
pub use input::ActionState;
pub use names::structure_type_name;
pub use pose::{Button, PoseSnapshot};
pub use pose_source::{ControlMessage, PoseSource};
pub use runtime::{FrameState, FrameWaiter, Runtime};
pub use space::{LocationFlags, ReferenceSpaceType, SpaceLocation};
pub use state::SessionState;
pub use surface::{HeadlessSurface, PreviewSurface, SurfaceEvent, SurfaceFactory};
pub use swapchain::{SwapchainCreateInfo, SwapchainManager, SwapchainUsage, SWAPCHAIN_IMAGE_COUNT};
pub use tracking::{Fov, Hand, Pose, View};
