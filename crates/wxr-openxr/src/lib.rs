//! OpenXR loader interface of the WXR runtime.
//!
//! The loader finds this library through the runtime manifest, calls
//! [`xrNegotiateLoaderRuntimeInterface`] and resolves every other entry point through
//! `xrGetInstanceProcAddr`. Entry points translate C structures into calls on one
//! process-wide [`Runtime`], convert errors into result codes and never let a panic unwind
//! into the application.

#![allow(clippy::missing_safety_doc)]

use std::ffi::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use openxr::sys::{self, Handle as _};
use tracing::{debug, error, info, warn};
use wxr_common::RuntimeConfig;
use wxr_runtime::{Runtime, XrCode, XrError, XrResult};

pub mod abi;
mod frame;
mod input;
mod instance;
mod session;

pub use abi::{NegotiateLoaderInfo, NegotiateRuntimeRequest};

static RUNTIME: Lazy<Mutex<Option<Runtime>>> = Lazy::new(|| Mutex::new(None));
static TRACING: Lazy<bool> = Lazy::new(|| wxr_common::try_init_library_tracing("info"));

fn lock_runtime() -> MutexGuard<'static, Option<Runtime>> {
    match RUNTIME.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Run `f` against the live runtime. Without one every handle is invalid.
pub(crate) fn with_runtime<T>(f: impl FnOnce(&mut Runtime) -> XrResult<T>) -> XrResult<T> {
    let mut guard = lock_runtime();
    let runtime = guard
        .as_mut()
        .ok_or_else(|| XrError::handle("no instance has been created"))?;
    f(runtime)
}

/// Like [`with_runtime`], creating the runtime from configuration on first use.
pub(crate) fn with_runtime_or_init<T>(f: impl FnOnce(&mut Runtime) -> XrResult<T>) -> XrResult<T> {
    let mut guard = lock_runtime();
    if guard.is_none() {
        let config = RuntimeConfig::load().unwrap_or_else(|e| {
            warn!(error = %e, "invalid configuration, using defaults");
            RuntimeConfig::default()
        });
        *guard = Some(Runtime::from_config(config));
    }
    match guard.as_mut() {
        Some(runtime) => f(runtime),
        None => Err(XrError::runtime("runtime unavailable")),
    }
}

/// Drop the runtime once no instance is left, stopping the pose receiver.
pub(crate) fn release_idle_runtime() {
    let idle = {
        let mut guard = lock_runtime();
        if guard
            .as_ref()
            .is_some_and(|runtime| runtime.application_name().is_none())
        {
            guard.take()
        } else {
            None
        }
    };
    if idle.is_some() {
        debug!("runtime released");
    }
}

/// Wrap one entry point: errors become result codes and panics become
/// `XR_ERROR_RUNTIME_FAILURE`.
pub(crate) fn entry(name: &'static str, f: impl FnOnce() -> XrResult<XrCode>) -> sys::Result {
    Lazy::force(&TRACING);
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(code)) => sys::Result::from_raw(code.raw()),
        Ok(Err(e)) => {
            let code = e.code();
            match e {
                XrError::Validation(_) | XrError::HandleInvalid(_) | XrError::FunctionUnsupported(_) => {
                    debug!(entry = name, code = code.name(), error = %e, "call rejected")
                }
                _ => warn!(entry = name, code = code.name(), error = %e, "call failed"),
            }
            sys::Result::from_raw(code.raw())
        }
        Err(_) => {
            error!(entry = name, "panic caught at the loader boundary");
            sys::Result::ERROR_RUNTIME_FAILURE
        }
    }
}

/// [`entry`] for calls whose only success code is `XR_SUCCESS`.
pub(crate) fn entry_ok(name: &'static str, f: impl FnOnce() -> XrResult<()>) -> sys::Result {
    entry(name, || f().map(|()| XrCode::Success))
}

macro_rules! entry_points {
    ($($name:literal => $func:path,)*) => {
        /// Every name `xrGetInstanceProcAddr` resolves.
        pub const ENTRY_POINT_NAMES: &[&str] = &[$($name),*];

        fn resolve(name: &str) -> Option<*const ()> {
            match name {
                $($name => Some($func as *const ()),)*
                _ => None,
            }
        }
    };
}

entry_points! {
    "xrGetInstanceProcAddr" => xr_get_instance_proc_addr,
    "xrEnumerateInstanceExtensionProperties" => instance::xr_enumerate_instance_extension_properties,
    "xrEnumerateApiLayerProperties" => instance::xr_enumerate_api_layer_properties,
    "xrCreateInstance" => instance::xr_create_instance,
    "xrDestroyInstance" => instance::xr_destroy_instance,
    "xrGetInstanceProperties" => instance::xr_get_instance_properties,
    "xrGetSystem" => instance::xr_get_system,
    "xrGetSystemProperties" => instance::xr_get_system_properties,
    "xrEnumerateViewConfigurations" => instance::xr_enumerate_view_configurations,
    "xrGetViewConfigurationProperties" => instance::xr_get_view_configuration_properties,
    "xrEnumerateViewConfigurationViews" => instance::xr_enumerate_view_configuration_views,
    "xrEnumerateEnvironmentBlendModes" => instance::xr_enumerate_environment_blend_modes,
    "xrGetD3D11GraphicsRequirementsKHR" => instance::xr_get_d3d11_graphics_requirements,
    "xrGetD3D12GraphicsRequirementsKHR" => instance::xr_get_d3d12_graphics_requirements,
    "xrGetOpenGLGraphicsRequirementsKHR" => instance::xr_get_opengl_graphics_requirements,
    "xrResultToString" => instance::xr_result_to_string,
    "xrStructureTypeToString" => instance::xr_structure_type_to_string,
    "xrConvertWin32PerformanceCounterToTimeKHR" => instance::xr_convert_performance_counter_to_time,
    "xrConvertTimeToWin32PerformanceCounterKHR" => instance::xr_convert_time_to_performance_counter,
    "xrCreateSession" => session::xr_create_session,
    "xrDestroySession" => session::xr_destroy_session,
    "xrBeginSession" => session::xr_begin_session,
    "xrEndSession" => session::xr_end_session,
    "xrRequestExitSession" => session::xr_request_exit_session,
    "xrEnumerateSwapchainFormats" => session::xr_enumerate_swapchain_formats,
    "xrCreateSwapchain" => session::xr_create_swapchain,
    "xrDestroySwapchain" => session::xr_destroy_swapchain,
    "xrEnumerateSwapchainImages" => session::xr_enumerate_swapchain_images,
    "xrAcquireSwapchainImage" => session::xr_acquire_swapchain_image,
    "xrWaitSwapchainImage" => session::xr_wait_swapchain_image,
    "xrReleaseSwapchainImage" => session::xr_release_swapchain_image,
    "xrWaitFrame" => frame::xr_wait_frame,
    "xrBeginFrame" => frame::xr_begin_frame,
    "xrEndFrame" => frame::xr_end_frame,
    "xrPollEvent" => frame::xr_poll_event,
    "xrLocateViews" => frame::xr_locate_views,
    "xrEnumerateReferenceSpaces" => input::xr_enumerate_reference_spaces,
    "xrCreateReferenceSpace" => input::xr_create_reference_space,
    "xrCreateActionSpace" => input::xr_create_action_space,
    "xrLocateSpace" => input::xr_locate_space,
    "xrDestroySpace" => input::xr_destroy_space,
    "xrGetReferenceSpaceBoundsRect" => input::xr_get_reference_space_bounds_rect,
    "xrStringToPath" => input::xr_string_to_path,
    "xrPathToString" => input::xr_path_to_string,
    "xrCreateActionSet" => input::xr_create_action_set,
    "xrDestroyActionSet" => input::xr_destroy_action_set,
    "xrCreateAction" => input::xr_create_action,
    "xrDestroyAction" => input::xr_destroy_action,
    "xrSuggestInteractionProfileBindings" => input::xr_suggest_interaction_profile_bindings,
    "xrAttachSessionActionSets" => input::xr_attach_session_action_sets,
    "xrSyncActions" => input::xr_sync_actions,
    "xrGetActionStateBoolean" => input::xr_get_action_state_boolean,
    "xrGetActionStateFloat" => input::xr_get_action_state_float,
    "xrGetActionStateVector2f" => input::xr_get_action_state_vector2f,
    "xrGetActionStatePose" => input::xr_get_action_state_pose,
    "xrGetCurrentInteractionProfile" => input::xr_get_current_interaction_profile,
    "xrEnumerateBoundSourcesForAction" => input::xr_enumerate_bound_sources_for_action,
    "xrGetInputSourceLocalizedName" => input::xr_get_input_source_localized_name,
    "xrApplyHapticFeedback" => input::xr_apply_haptic_feedback,
    "xrStopHapticFeedback" => input::xr_stop_haptic_feedback,
}

unsafe extern "system" fn xr_get_instance_proc_addr(
    instance: sys::Instance,
    name: *const c_char,
    function: *mut Option<sys::pfn::VoidFunction>,
) -> sys::Result {
    entry_ok("xrGetInstanceProcAddr", || {
        let out = abi::output(function, "function")?;
        *out = None;
        let name = abi::c_str(name, "function name")?;
        let Some(address) = resolve(name) else {
            return Err(XrError::FunctionUnsupported(name.to_string()));
        };
        debug!(name, instance = instance.into_raw(), "entry point resolved");
        *out = Some(std::mem::transmute::<*const (), sys::pfn::VoidFunction>(address));
        Ok(())
    })
}

/// Loader entry point. Agrees on interface version 1 and hands back
/// `xrGetInstanceProcAddr`.
#[no_mangle]
pub unsafe extern "system" fn xrNegotiateLoaderRuntimeInterface(
    loader_info: *const NegotiateLoaderInfo,
    runtime_request: *mut NegotiateRuntimeRequest,
) -> sys::Result {
    entry_ok("xrNegotiateLoaderRuntimeInterface", || {
        let info = abi::input(loader_info, "loader info")?;
        let request = abi::output(runtime_request, "runtime request")?;
        abi::negotiate(info, request, xr_get_instance_proc_addr)?;
        info!(
            version = env!("CARGO_PKG_VERSION"),
            interface = request.runtime_interface_version,
            "negotiated with OpenXR loader"
        );
        Ok(())
    })
}
