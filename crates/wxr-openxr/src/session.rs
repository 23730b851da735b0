//! Session and swapchain entry points.

use std::ffi::c_void;

use openxr::sys::{self, Handle as _};
use tracing::{debug, info};
use wxr_runtime::{NativeImage, SwapchainCreateInfo, SwapchainUsage, XrError};

use crate::abi::{self, SwapchainImageD3D, SwapchainImageOpenGl};
use crate::{entry_ok, with_runtime};

pub(crate) unsafe extern "system" fn xr_create_session(
    instance: sys::Instance,
    create_info: *const sys::SessionCreateInfo,
    session: *mut sys::Session,
) -> sys::Result {
    entry_ok("xrCreateSession", || {
        let info = abi::input(create_info, "session create info")?;
        abi::check_type(info.ty, sys::StructureType::SESSION_CREATE_INFO)?;
        let out = abi::output(session, "session")?;
        let binding = abi::graphics_binding(info.next);
        debug!(?binding, "graphics binding");
        let handle = with_runtime(|rt| {
            rt.create_session(abi::instance(instance), info.system_id.into_raw(), binding)
        })?;
        *out = abi::to_session(handle);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_destroy_session(session: sys::Session) -> sys::Result {
    entry_ok("xrDestroySession", || {
        with_runtime(|rt| rt.destroy_session(abi::session(session)))
    })
}

pub(crate) unsafe extern "system" fn xr_begin_session(
    session: sys::Session,
    begin_info: *const sys::SessionBeginInfo,
) -> sys::Result {
    entry_ok("xrBeginSession", || {
        let info = abi::input(begin_info, "session begin info")?;
        abi::check_type(info.ty, sys::StructureType::SESSION_BEGIN_INFO)?;
        let view_configuration = info.primary_view_configuration_type.into_raw();
        with_runtime(|rt| rt.begin_session(abi::session(session), view_configuration))?;
        info!(session = session.into_raw(), "session running");
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_end_session(session: sys::Session) -> sys::Result {
    entry_ok("xrEndSession", || {
        with_runtime(|rt| rt.end_session(abi::session(session)))
    })
}

pub(crate) unsafe extern "system" fn xr_request_exit_session(session: sys::Session) -> sys::Result {
    entry_ok("xrRequestExitSession", || {
        with_runtime(|rt| rt.request_exit(abi::session(session)))
    })
}

pub(crate) unsafe extern "system" fn xr_enumerate_swapchain_formats(
    session: sys::Session,
    capacity: u32,
    count_output: *mut u32,
    formats: *mut i64,
) -> sys::Result {
    entry_ok("xrEnumerateSwapchainFormats", || {
        let supported = with_runtime(|rt| rt.swapchain_formats(abi::session(session)))?;
        abi::two_call(capacity, count_output, formats, supported.len(), |slot, i| {
            *slot = supported[i];
        })
    })
}

pub(crate) unsafe extern "system" fn xr_create_swapchain(
    session: sys::Session,
    create_info: *const sys::SwapchainCreateInfo,
    swapchain: *mut sys::Swapchain,
) -> sys::Result {
    entry_ok("xrCreateSwapchain", || {
        let info = abi::input(create_info, "swapchain create info")?;
        abi::check_type(info.ty, sys::StructureType::SWAPCHAIN_CREATE_INFO)?;
        let out = abi::output(swapchain, "swapchain")?;
        let request = SwapchainCreateInfo {
            format: info.format,
            usage: SwapchainUsage::from_bits_truncate(info.usage_flags.into_raw()),
            width: info.width,
            height: info.height,
            array_size: info.array_size,
            mip_count: info.mip_count,
            sample_count: info.sample_count,
            face_count: info.face_count,
        };
        let handle = with_runtime(|rt| rt.create_swapchain(abi::session(session), &request))?;
        *out = abi::to_swapchain(handle);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_destroy_swapchain(swapchain: sys::Swapchain) -> sys::Result {
    entry_ok("xrDestroySwapchain", || {
        with_runtime(|rt| rt.destroy_swapchain(abi::swapchain(swapchain)))
    })
}

/// Images are written through the structure layout matching the session's graphics API.
pub(crate) unsafe extern "system" fn xr_enumerate_swapchain_images(
    swapchain: sys::Swapchain,
    capacity: u32,
    count_output: *mut u32,
    images: *mut sys::SwapchainImageBaseHeader,
) -> sys::Result {
    entry_ok("xrEnumerateSwapchainImages", || {
        let native = with_runtime(|rt| rt.swapchain_images(abi::swapchain(swapchain)))?;
        let Some(first) = native.first() else {
            return abi::two_call(capacity, count_output, images, 0, |_, _| {});
        };
        match first {
            NativeImage::D3D11Texture(_) | NativeImage::D3D12Resource(_) => abi::two_call(
                capacity,
                count_output,
                images as *mut SwapchainImageD3D,
                native.len(),
                |slot, i| slot.texture = native[i].raw() as usize as *mut c_void,
            ),
            NativeImage::GlTexture(_) => abi::two_call(
                capacity,
                count_output,
                images as *mut SwapchainImageOpenGl,
                native.len(),
                |slot, i| {
                    if let NativeImage::GlTexture(name) = native[i] {
                        slot.image = name;
                    }
                },
            ),
        }
    })
}

pub(crate) unsafe extern "system" fn xr_acquire_swapchain_image(
    swapchain: sys::Swapchain,
    _acquire_info: *const sys::SwapchainImageAcquireInfo,
    index: *mut u32,
) -> sys::Result {
    entry_ok("xrAcquireSwapchainImage", || {
        let out = abi::output(index, "image index")?;
        *out = with_runtime(|rt| rt.acquire_swapchain_image(abi::swapchain(swapchain)))?;
        Ok(())
    })
}

/// Images are ready as soon as they are acquired, so the timeout never elapses.
pub(crate) unsafe extern "system" fn xr_wait_swapchain_image(
    swapchain: sys::Swapchain,
    wait_info: *const sys::SwapchainImageWaitInfo,
) -> sys::Result {
    entry_ok("xrWaitSwapchainImage", || {
        if wait_info.is_null() {
            return Err(XrError::validation("wait info is null"));
        }
        with_runtime(|rt| rt.wait_swapchain_image(abi::swapchain(swapchain)))
    })
}

pub(crate) unsafe extern "system" fn xr_release_swapchain_image(
    swapchain: sys::Swapchain,
    _release_info: *const sys::SwapchainImageReleaseInfo,
) -> sys::Result {
    entry_ok("xrReleaseSwapchainImage", || {
        with_runtime(|rt| rt.release_swapchain_image(abi::swapchain(swapchain)))
    })
}
