//! Space, path, action and haptic entry points.

use std::ffi::c_char;

use glam::Vec3;
use openxr::sys;
use wxr_runtime::{ActionState, XrCode, XrResult};

use crate::abi;
use crate::{entry, entry_ok, with_runtime};

// ---- spaces ----

pub(crate) unsafe extern "system" fn xr_enumerate_reference_spaces(
    session: sys::Session,
    capacity: u32,
    count_output: *mut u32,
    spaces: *mut sys::ReferenceSpaceType,
) -> sys::Result {
    entry_ok("xrEnumerateReferenceSpaces", || {
        let types = with_runtime(|rt| rt.reference_space_types(abi::session(session)))?;
        abi::two_call(capacity, count_output, spaces, types.len(), |slot, i| {
            *slot = sys::ReferenceSpaceType::from_raw(types[i].raw());
        })
    })
}

/// The pose offset in the create info is ignored; spaces are located at their origin.
pub(crate) unsafe extern "system" fn xr_create_reference_space(
    session: sys::Session,
    create_info: *const sys::ReferenceSpaceCreateInfo,
    space: *mut sys::Space,
) -> sys::Result {
    entry_ok("xrCreateReferenceSpace", || {
        let info = abi::input(create_info, "reference space create info")?;
        abi::check_type(info.ty, sys::StructureType::REFERENCE_SPACE_CREATE_INFO)?;
        let out = abi::output(space, "space")?;
        let kind = info.reference_space_type.into_raw();
        let handle = with_runtime(|rt| rt.create_reference_space(abi::session(session), kind))?;
        *out = abi::to_space(handle);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_create_action_space(
    session: sys::Session,
    create_info: *const sys::ActionSpaceCreateInfo,
    space: *mut sys::Space,
) -> sys::Result {
    entry_ok("xrCreateActionSpace", || {
        let info = abi::input(create_info, "action space create info")?;
        abi::check_type(info.ty, sys::StructureType::ACTION_SPACE_CREATE_INFO)?;
        let out = abi::output(space, "space")?;
        let handle = with_runtime(|rt| {
            rt.create_action_space(
                abi::session(session),
                abi::action(info.action),
                info.subaction_path.into_raw(),
            )
        })?;
        *out = abi::to_space(handle);
        Ok(())
    })
}

/// Locations use the latest latched pose whatever time is asked for.
pub(crate) unsafe extern "system" fn xr_locate_space(
    space: sys::Space,
    base_space: sys::Space,
    _time: sys::Time,
    location: *mut sys::SpaceLocation,
) -> sys::Result {
    entry_ok("xrLocateSpace", || {
        let out = abi::output(location, "space location")?;
        abi::check_type(out.ty, sys::StructureType::SPACE_LOCATION)?;
        let located =
            with_runtime(|rt| rt.locate_space(abi::space(space), abi::space(base_space)))?;
        out.location_flags = sys::SpaceLocationFlags::from_raw(located.flags.bits());
        out.pose = abi::posef(&located.pose);

        if let Some(found) = abi::find_out_chain(out.next, sys::StructureType::SPACE_VELOCITY) {
            let velocity = &mut *(found as *mut sys::SpaceVelocity);
            velocity.angular_velocity = abi::vector3f(Vec3::ZERO);
            match located.linear_velocity {
                Some(linear) => {
                    velocity.velocity_flags = sys::SpaceVelocityFlags::LINEAR_VALID;
                    velocity.linear_velocity = abi::vector3f(linear);
                }
                None => {
                    velocity.velocity_flags = sys::SpaceVelocityFlags::from_raw(0);
                    velocity.linear_velocity = abi::vector3f(Vec3::ZERO);
                }
            }
        }
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_destroy_space(space: sys::Space) -> sys::Result {
    entry_ok("xrDestroySpace", || {
        with_runtime(|rt| rt.destroy_space(abi::space(space)))
    })
}

pub(crate) unsafe extern "system" fn xr_get_reference_space_bounds_rect(
    session: sys::Session,
    reference_space_type: sys::ReferenceSpaceType,
    bounds: *mut sys::Extent2Df,
) -> sys::Result {
    entry("xrGetReferenceSpaceBoundsRect", || {
        let out = abi::output(bounds, "bounds")?;
        let extent = with_runtime(|rt| {
            rt.reference_space_bounds(abi::session(session), reference_space_type.into_raw())
        })?;
        match extent {
            Some((width, height)) => {
                *out = sys::Extent2Df { width, height };
                Ok(XrCode::Success)
            }
            None => {
                *out = sys::Extent2Df {
                    width: 0.0,
                    height: 0.0,
                };
                Ok(XrCode::SpaceBoundsUnavailable)
            }
        }
    })
}

// ---- paths ----

pub(crate) unsafe extern "system" fn xr_string_to_path(
    instance: sys::Instance,
    path_string: *const c_char,
    path: *mut sys::Path,
) -> sys::Result {
    entry_ok("xrStringToPath", || {
        let text = abi::c_str(path_string, "path string")?;
        let out = abi::output(path, "path")?;
        let raw = with_runtime(|rt| rt.string_to_path(abi::instance(instance), text))?;
        *out = sys::Path::from_raw(raw);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_path_to_string(
    instance: sys::Instance,
    path: sys::Path,
    capacity: u32,
    count_output: *mut u32,
    buffer: *mut c_char,
) -> sys::Result {
    entry_ok("xrPathToString", || {
        with_runtime(|rt| {
            let text = rt.path_to_string(abi::instance(instance), path.into_raw())?;
            abi::two_call_string(capacity, count_output, buffer, text)
        })
    })
}

// ---- actions ----

pub(crate) unsafe extern "system" fn xr_create_action_set(
    instance: sys::Instance,
    create_info: *const sys::ActionSetCreateInfo,
    action_set: *mut sys::ActionSet,
) -> sys::Result {
    entry_ok("xrCreateActionSet", || {
        let info = abi::input(create_info, "action set create info")?;
        abi::check_type(info.ty, sys::StructureType::ACTION_SET_CREATE_INFO)?;
        let out = abi::output(action_set, "action set")?;
        let name = abi::fixed_str(&info.action_set_name);
        let handle = with_runtime(|rt| {
            rt.create_action_set(abi::instance(instance), &name, info.priority)
        })?;
        *out = abi::to_action_set(handle);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_destroy_action_set(action_set: sys::ActionSet) -> sys::Result {
    entry_ok("xrDestroyActionSet", || {
        with_runtime(|rt| rt.destroy_action_set(abi::action_set(action_set)))
    })
}

pub(crate) unsafe extern "system" fn xr_create_action(
    action_set: sys::ActionSet,
    create_info: *const sys::ActionCreateInfo,
    action: *mut sys::Action,
) -> sys::Result {
    entry_ok("xrCreateAction", || {
        let info = abi::input(create_info, "action create info")?;
        abi::check_type(info.ty, sys::StructureType::ACTION_CREATE_INFO)?;
        let out = abi::output(action, "action")?;
        let name = abi::fixed_str(&info.action_name);
        let subaction_paths: Vec<u64> = abi::slice(
            info.subaction_paths,
            info.count_subaction_paths,
            "subaction paths",
        )?
        .iter()
        .map(|path| path.into_raw())
        .collect();
        let handle = with_runtime(|rt| {
            rt.create_action(
                abi::action_set(action_set),
                &name,
                info.action_type.into_raw(),
                &subaction_paths,
            )
        })?;
        *out = abi::to_action(handle);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_destroy_action(action: sys::Action) -> sys::Result {
    entry_ok("xrDestroyAction", || {
        with_runtime(|rt| rt.destroy_action(abi::action(action)))
    })
}

pub(crate) unsafe extern "system" fn xr_suggest_interaction_profile_bindings(
    instance: sys::Instance,
    suggested_bindings: *const sys::InteractionProfileSuggestedBinding,
) -> sys::Result {
    entry_ok("xrSuggestInteractionProfileBindings", || {
        let info = abi::input(suggested_bindings, "suggested bindings")?;
        abi::check_type(info.ty, sys::StructureType::INTERACTION_PROFILE_SUGGESTED_BINDING)?;
        with_runtime(|rt| {
            rt.suggest_bindings(
                abi::instance(instance),
                info.interaction_profile.into_raw(),
                info.count_suggested_bindings as usize,
            )
        })
    })
}

pub(crate) unsafe extern "system" fn xr_attach_session_action_sets(
    session: sys::Session,
    attach_info: *const sys::SessionActionSetsAttachInfo,
) -> sys::Result {
    entry_ok("xrAttachSessionActionSets", || {
        let info = abi::input(attach_info, "attach info")?;
        abi::check_type(info.ty, sys::StructureType::SESSION_ACTION_SETS_ATTACH_INFO)?;
        let sets: Vec<_> = abi::slice(info.action_sets, info.count_action_sets, "action sets")?
            .iter()
            .map(|set| abi::action_set(*set))
            .collect();
        with_runtime(|rt| rt.attach_action_sets(abi::session(session), &sets))
    })
}

pub(crate) unsafe extern "system" fn xr_sync_actions(
    session: sys::Session,
    sync_info: *const sys::ActionsSyncInfo,
) -> sys::Result {
    entry_ok("xrSyncActions", || {
        let info = abi::input(sync_info, "sync info")?;
        abi::check_type(info.ty, sys::StructureType::ACTIONS_SYNC_INFO)?;
        let sets: Vec<_> = abi::slice(
            info.active_action_sets,
            info.count_active_action_sets,
            "active action sets",
        )?
        .iter()
        .map(|active| abi::action_set(active.action_set))
        .collect();
        with_runtime(|rt| rt.sync_actions(abi::session(session), &sets))
    })
}

unsafe fn state_query<'a>(
    get_info: *const sys::ActionStateGetInfo,
) -> XrResult<&'a sys::ActionStateGetInfo> {
    let info = abi::input(get_info, "action state get info")?;
    abi::check_type(info.ty, sys::StructureType::ACTION_STATE_GET_INFO)?;
    Ok(info)
}

fn change_time<T>(state: &ActionState<T>) -> sys::Time {
    sys::Time::from_nanos(state.last_change_time)
}

pub(crate) unsafe extern "system" fn xr_get_action_state_boolean(
    session: sys::Session,
    get_info: *const sys::ActionStateGetInfo,
    state: *mut sys::ActionStateBoolean,
) -> sys::Result {
    entry_ok("xrGetActionStateBoolean", || {
        let info = state_query(get_info)?;
        let out = abi::output(state, "action state")?;
        let value = with_runtime(|rt| {
            rt.action_state_boolean(
                abi::session(session),
                abi::action(info.action),
                info.subaction_path.into_raw(),
            )
        })?;
        out.current_state = abi::bool32(value.current);
        out.changed_since_last_sync = abi::bool32(value.changed_since_last_sync);
        out.last_change_time = change_time(&value);
        out.is_active = abi::bool32(value.is_active);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_get_action_state_float(
    session: sys::Session,
    get_info: *const sys::ActionStateGetInfo,
    state: *mut sys::ActionStateFloat,
) -> sys::Result {
    entry_ok("xrGetActionStateFloat", || {
        let info = state_query(get_info)?;
        let out = abi::output(state, "action state")?;
        let value = with_runtime(|rt| {
            rt.action_state_float(
                abi::session(session),
                abi::action(info.action),
                info.subaction_path.into_raw(),
            )
        })?;
        out.current_state = value.current;
        out.changed_since_last_sync = abi::bool32(value.changed_since_last_sync);
        out.last_change_time = change_time(&value);
        out.is_active = abi::bool32(value.is_active);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_get_action_state_vector2f(
    session: sys::Session,
    get_info: *const sys::ActionStateGetInfo,
    state: *mut sys::ActionStateVector2f,
) -> sys::Result {
    entry_ok("xrGetActionStateVector2f", || {
        let info = state_query(get_info)?;
        let out = abi::output(state, "action state")?;
        let value = with_runtime(|rt| {
            rt.action_state_vector2(
                abi::session(session),
                abi::action(info.action),
                info.subaction_path.into_raw(),
            )
        })?;
        out.current_state = sys::Vector2f {
            x: value.current.x,
            y: value.current.y,
        };
        out.changed_since_last_sync = abi::bool32(value.changed_since_last_sync);
        out.last_change_time = change_time(&value);
        out.is_active = abi::bool32(value.is_active);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_get_action_state_pose(
    session: sys::Session,
    get_info: *const sys::ActionStateGetInfo,
    state: *mut sys::ActionStatePose,
) -> sys::Result {
    entry_ok("xrGetActionStatePose", || {
        let info = state_query(get_info)?;
        let out = abi::output(state, "action state")?;
        let active = with_runtime(|rt| {
            rt.action_state_pose(abi::session(session), abi::action(info.action))
        })?;
        out.is_active = abi::bool32(active);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_get_current_interaction_profile(
    session: sys::Session,
    top_level_user_path: sys::Path,
    profile: *mut sys::InteractionProfileState,
) -> sys::Result {
    entry_ok("xrGetCurrentInteractionProfile", || {
        let out = abi::output(profile, "interaction profile state")?;
        let raw = with_runtime(|rt| {
            rt.current_interaction_profile(abi::session(session), top_level_user_path.into_raw())
        })?;
        out.interaction_profile = sys::Path::from_raw(raw);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_enumerate_bound_sources_for_action(
    session: sys::Session,
    enumerate_info: *const sys::BoundSourcesForActionEnumerateInfo,
    capacity: u32,
    count_output: *mut u32,
    sources: *mut sys::Path,
) -> sys::Result {
    entry_ok("xrEnumerateBoundSourcesForAction", || {
        let info = abi::input(enumerate_info, "enumerate info")?;
        abi::check_type(info.ty, sys::StructureType::BOUND_SOURCES_FOR_ACTION_ENUMERATE_INFO)?;
        let bound = with_runtime(|rt| {
            rt.bound_sources(abi::session(session), abi::action(info.action))
        })?;
        abi::two_call(capacity, count_output, sources, bound.len(), |slot, i| {
            *slot = sys::Path::from_raw(bound[i]);
        })
    })
}

pub(crate) unsafe extern "system" fn xr_get_input_source_localized_name(
    session: sys::Session,
    get_info: *const sys::InputSourceLocalizedNameGetInfo,
    capacity: u32,
    count_output: *mut u32,
    buffer: *mut c_char,
) -> sys::Result {
    entry_ok("xrGetInputSourceLocalizedName", || {
        let info = abi::input(get_info, "localized name get info")?;
        abi::check_type(info.ty, sys::StructureType::INPUT_SOURCE_LOCALIZED_NAME_GET_INFO)?;
        let name = with_runtime(|rt| {
            rt.input_source_localized_name(abi::session(session), info.source_path.into_raw())
        })?;
        abi::two_call_string(capacity, count_output, buffer, name)
    })
}

// ---- haptics ----

unsafe fn haptic_target<'a>(
    info: *const sys::HapticActionInfo,
) -> XrResult<&'a sys::HapticActionInfo> {
    let info = abi::input(info, "haptic action info")?;
    abi::check_type(info.ty, sys::StructureType::HAPTIC_ACTION_INFO)?;
    Ok(info)
}

pub(crate) unsafe extern "system" fn xr_apply_haptic_feedback(
    session: sys::Session,
    haptic_action_info: *const sys::HapticActionInfo,
    haptic_feedback: *const sys::HapticBaseHeader,
) -> sys::Result {
    entry_ok("xrApplyHapticFeedback", || {
        let target = haptic_target(haptic_action_info)?;
        let header = abi::input(haptic_feedback, "haptic feedback")?;
        abi::check_type(header.ty, sys::StructureType::HAPTIC_VIBRATION)?;
        let vibration = &*(haptic_feedback as *const sys::HapticVibration);
        with_runtime(|rt| {
            rt.apply_haptic_feedback(
                abi::session(session),
                abi::action(target.action),
                target.subaction_path.into_raw(),
                vibration.amplitude,
                vibration.duration.as_nanos(),
            )
        })
    })
}

pub(crate) unsafe extern "system" fn xr_stop_haptic_feedback(
    session: sys::Session,
    haptic_action_info: *const sys::HapticActionInfo,
) -> sys::Result {
    entry_ok("xrStopHapticFeedback", || {
        let target = haptic_target(haptic_action_info)?;
        with_runtime(|rt| {
            rt.stop_haptic_feedback(
                abi::session(session),
                abi::action(target.action),
                target.subaction_path.into_raw(),
            )
        })
    })
}
