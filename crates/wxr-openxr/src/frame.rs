//! Frame loop, event and view entry points.

use std::ptr;

use openxr::sys;
use tracing::trace;
use wxr_runtime::{Event, LocationFlags, XrCode};

use crate::abi;
use crate::{entry, entry_ok, with_runtime};

/// Blocks for pacing and the first pose packet with the runtime unlocked, so other threads
/// can keep calling in.
pub(crate) unsafe extern "system" fn xr_wait_frame(
    session: sys::Session,
    _wait_info: *const sys::FrameWaitInfo,
    frame_state: *mut sys::FrameState,
) -> sys::Result {
    entry_ok("xrWaitFrame", || {
        let out = abi::output(frame_state, "frame state")?;
        let handle = abi::session(session);
        let waiter = with_runtime(|rt| rt.prepare_wait_frame(handle))?;
        let snapshot = waiter.wait();
        let state = with_runtime(|rt| rt.complete_wait_frame(handle, snapshot))?;
        out.predicted_display_time = sys::Time::from_nanos(state.predicted_display_time);
        out.predicted_display_period = sys::Duration::from_nanos(state.predicted_display_period);
        out.should_render = abi::bool32(state.should_render);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_begin_frame(
    session: sys::Session,
    _begin_info: *const sys::FrameBeginInfo,
) -> sys::Result {
    entry_ok("xrBeginFrame", || {
        with_runtime(|rt| rt.begin_frame(abi::session(session)))
    })
}

pub(crate) unsafe extern "system" fn xr_end_frame(
    session: sys::Session,
    end_info: *const sys::FrameEndInfo,
) -> sys::Result {
    entry_ok("xrEndFrame", || {
        let info = abi::input(end_info, "frame end info")?;
        abi::check_type(info.ty, sys::StructureType::FRAME_END_INFO)?;
        let layers = abi::composition_layers(info.layer_count, info.layers)?;
        let blend_mode = info.environment_blend_mode.into_raw();
        let report = with_runtime(|rt| rt.end_frame(abi::session(session), blend_mode, &layers))?;
        trace!(?report, "frame ended");
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_poll_event(
    instance: sys::Instance,
    event_data: *mut sys::EventDataBuffer,
) -> sys::Result {
    entry("xrPollEvent", || {
        let buffer = abi::output(event_data, "event buffer")?;
        let Some(event) = with_runtime(|rt| rt.poll_event(abi::instance(instance)))? else {
            return Ok(XrCode::EventUnavailable);
        };
        match event {
            Event::SessionStateChanged {
                session,
                state,
                time,
            } => {
                let changed = buffer as *mut sys::EventDataBuffer as *mut sys::EventDataSessionStateChanged;
                ptr::write(
                    changed,
                    sys::EventDataSessionStateChanged {
                        ty: sys::StructureType::EVENT_DATA_SESSION_STATE_CHANGED,
                        next: ptr::null(),
                        session: abi::to_session(session),
                        state: sys::SessionState::from_raw(state.raw()),
                        time: sys::Time::from_nanos(time),
                    },
                );
            }
        }
        Ok(XrCode::Success)
    })
}

pub(crate) unsafe extern "system" fn xr_locate_views(
    session: sys::Session,
    locate_info: *const sys::ViewLocateInfo,
    view_state: *mut sys::ViewState,
    capacity: u32,
    count_output: *mut u32,
    views: *mut sys::View,
) -> sys::Result {
    entry_ok("xrLocateViews", || {
        let info = abi::input(locate_info, "view locate info")?;
        abi::check_type(info.ty, sys::StructureType::VIEW_LOCATE_INFO)?;
        let state = abi::output(view_state, "view state")?;
        let located = with_runtime(|rt| {
            rt.locate_views(abi::session(session), info.view_configuration_type.into_raw())
        })?;
        state.view_state_flags = sys::ViewStateFlags::from_raw(LocationFlags::TRACKED.bits());
        abi::two_call(capacity, count_output, views, located.len(), |slot, i| {
            slot.pose = abi::posef(&located[i].pose);
            slot.fov = abi::fovf(&located[i].fov);
        })
    })
}
