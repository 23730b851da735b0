//! Integration tests for the loader interface
//!
//! Tests the following:
//! - Loader negotiation and entry point resolution
//! - Instance, system and session setup through C structures
//! - Session state events delivered through the event buffer
//! - One frame with a projection layer, view location and stage bounds
//!
//! The runtime is process-wide, so the whole sequence runs in a single test.

use std::ffi::{c_char, c_void};
use std::mem;
use std::ptr;

use openxr::sys::{self, Handle as _};
use wxr_openxr::abi::{
    self, GraphicsBindingD3D11, NegotiateLoaderInfo, NegotiateRuntimeRequest, SwapchainImageD3D,
    LOADER_INFO_STRUCT_VERSION, LOADER_INTERFACE_STRUCT_LOADER_INFO,
    LOADER_INTERFACE_STRUCT_RUNTIME_REQUEST, RUNTIME_INFO_STRUCT_VERSION,
};
use wxr_openxr::xrNegotiateLoaderRuntimeInterface;

unsafe fn load<F: Copy>(
    get_proc: sys::pfn::GetInstanceProcAddr,
    instance: sys::Instance,
    name: &[u8],
) -> F {
    let mut function: Option<sys::pfn::VoidFunction> = None;
    let result = get_proc(instance, name.as_ptr() as *const c_char, &mut function);
    assert_eq!(result, sys::Result::SUCCESS, "resolving {:?}", name);
    let function = function.expect("function pointer");
    mem::transmute_copy(&function)
}

fn negotiate() -> sys::pfn::GetInstanceProcAddr {
    let info = NegotiateLoaderInfo {
        struct_type: LOADER_INTERFACE_STRUCT_LOADER_INFO,
        struct_version: LOADER_INFO_STRUCT_VERSION,
        struct_size: mem::size_of::<NegotiateLoaderInfo>(),
        min_interface_version: 1,
        max_interface_version: 1,
        min_api_version: sys::Version::new(1, 0, 0),
        max_api_version: sys::Version::new(1, 0x3ff, 0xfff),
    };
    let mut request = NegotiateRuntimeRequest {
        struct_type: LOADER_INTERFACE_STRUCT_RUNTIME_REQUEST,
        struct_version: RUNTIME_INFO_STRUCT_VERSION,
        struct_size: mem::size_of::<NegotiateRuntimeRequest>(),
        runtime_interface_version: 0,
        runtime_api_version: sys::Version::from_raw(0),
        get_instance_proc_addr: None,
    };
    let result = unsafe { xrNegotiateLoaderRuntimeInterface(&info, &mut request) };
    assert_eq!(result, sys::Result::SUCCESS);
    request
        .get_instance_proc_addr
        .expect("runtime returned xrGetInstanceProcAddr")
}

unsafe fn next_state(poll: sys::pfn::PollEvent, instance: sys::Instance) -> Option<sys::SessionState> {
    let mut buffer: sys::EventDataBuffer = mem::zeroed();
    buffer.ty = sys::StructureType::EVENT_DATA_BUFFER;
    let result = poll(instance, &mut buffer);
    if result == sys::Result::EVENT_UNAVAILABLE {
        return None;
    }
    assert_eq!(result, sys::Result::SUCCESS);
    assert_eq!(buffer.ty, sys::StructureType::EVENT_DATA_SESSION_STATE_CHANGED);
    let changed = &*(&buffer as *const sys::EventDataBuffer as *const sys::EventDataSessionStateChanged);
    Some(changed.state)
}

#[test]
fn test_loader_session_and_frame() {
    std::env::set_var("WXR_POSE_PORT", "0");
    std::env::set_var("WXR_POSE_TIMEOUT_MS", "1");
    std::env::remove_var("WXR_CONFIG");

    let get_proc = negotiate();
    let none = sys::Instance::NULL;

    unsafe {
        // Extensions, two-call.
        let enumerate_extensions: sys::pfn::EnumerateInstanceExtensionProperties =
            load(get_proc, none, b"xrEnumerateInstanceExtensionProperties\0");
        let mut count = 0u32;
        let result = enumerate_extensions(ptr::null(), 0, &mut count, ptr::null_mut());
        assert_eq!(result, sys::Result::SUCCESS);
        assert!(count >= 3);
        let mut properties: Vec<sys::ExtensionProperties> = (0..count).map(|_| mem::zeroed()).collect();
        for property in &mut properties {
            property.ty = sys::StructureType::EXTENSION_PROPERTIES;
        }
        let result = enumerate_extensions(ptr::null(), count, &mut count, properties.as_mut_ptr());
        assert_eq!(result, sys::Result::SUCCESS);
        let names: Vec<String> = properties
            .iter()
            .map(|p| abi::fixed_str(&p.extension_name))
            .collect();
        assert!(names.iter().any(|n| n == "XR_KHR_D3D11_enable"));

        // Instance.
        let create_instance: sys::pfn::CreateInstance =
            load(get_proc, none, b"xrCreateInstance\0");
        let extension = b"XR_KHR_D3D11_enable\0".as_ptr() as *const c_char;
        let mut create_info: sys::InstanceCreateInfo = mem::zeroed();
        create_info.ty = sys::StructureType::INSTANCE_CREATE_INFO;
        abi::copy_str(&mut create_info.application_info.application_name, "loader-test");
        abi::copy_str(&mut create_info.application_info.engine_name, "none");
        create_info.application_info.api_version = sys::Version::new(1, 0, 0);
        create_info.enabled_extension_count = 1;
        create_info.enabled_extension_names = &extension;
        let mut instance = sys::Instance::NULL;
        assert_eq!(create_instance(&create_info, &mut instance), sys::Result::SUCCESS);
        assert_ne!(instance, sys::Instance::NULL);

        // System.
        let get_system: sys::pfn::GetSystem = load(get_proc, instance, b"xrGetSystem\0");
        let mut system_info: sys::SystemGetInfo = mem::zeroed();
        system_info.ty = sys::StructureType::SYSTEM_GET_INFO;
        system_info.form_factor = sys::FormFactor::HEAD_MOUNTED_DISPLAY;
        let mut system_id = sys::SystemId::from_raw(0);
        assert_eq!(get_system(instance, &system_info, &mut system_id), sys::Result::SUCCESS);

        // Session with a D3D11 binding chain.
        let create_session: sys::pfn::CreateSession =
            load(get_proc, instance, b"xrCreateSession\0");
        let binding = GraphicsBindingD3D11 {
            ty: sys::StructureType::GRAPHICS_BINDING_D3D11_KHR,
            next: ptr::null(),
            device: 0x1000 as *mut c_void,
        };
        let mut session_info: sys::SessionCreateInfo = mem::zeroed();
        session_info.ty = sys::StructureType::SESSION_CREATE_INFO;
        session_info.next = &binding as *const GraphicsBindingD3D11 as *const c_void;
        session_info.system_id = system_id;
        let mut session = sys::Session::NULL;
        assert_eq!(
            create_session(instance, &session_info, &mut session),
            sys::Result::SUCCESS
        );

        let begin_session: sys::pfn::BeginSession =
            load(get_proc, instance, b"xrBeginSession\0");
        let mut begin_info: sys::SessionBeginInfo = mem::zeroed();
        begin_info.ty = sys::StructureType::SESSION_BEGIN_INFO;
        begin_info.primary_view_configuration_type = sys::ViewConfigurationType::PRIMARY_STEREO;
        assert_eq!(begin_session(session, &begin_info), sys::Result::SUCCESS);

        let poll: sys::pfn::PollEvent = load(get_proc, instance, b"xrPollEvent\0");
        let mut states = Vec::new();
        while let Some(state) = next_state(poll, instance) {
            states.push(state);
        }
        assert_eq!(
            states,
            vec![
                sys::SessionState::READY,
                sys::SessionState::SYNCHRONIZED,
                sys::SessionState::VISIBLE,
                sys::SessionState::FOCUSED,
            ]
        );

        // Swapchain.
        let enumerate_formats: sys::pfn::EnumerateSwapchainFormats =
            load(get_proc, instance, b"xrEnumerateSwapchainFormats\0");
        let mut format_count = 0u32;
        assert_eq!(
            enumerate_formats(session, 0, &mut format_count, ptr::null_mut()),
            sys::Result::SUCCESS
        );
        let mut formats = vec![0i64; format_count as usize];
        assert_eq!(
            enumerate_formats(session, format_count, &mut format_count, formats.as_mut_ptr()),
            sys::Result::SUCCESS
        );

        let create_swapchain: sys::pfn::CreateSwapchain =
            load(get_proc, instance, b"xrCreateSwapchain\0");
        let mut swapchain_info: sys::SwapchainCreateInfo = mem::zeroed();
        swapchain_info.ty = sys::StructureType::SWAPCHAIN_CREATE_INFO;
        swapchain_info.usage_flags = sys::SwapchainUsageFlags::COLOR_ATTACHMENT;
        swapchain_info.format = formats[0];
        swapchain_info.sample_count = 1;
        swapchain_info.width = 64;
        swapchain_info.height = 64;
        swapchain_info.face_count = 1;
        swapchain_info.array_size = 1;
        swapchain_info.mip_count = 1;
        let mut swapchain = sys::Swapchain::NULL;
        assert_eq!(
            create_swapchain(session, &swapchain_info, &mut swapchain),
            sys::Result::SUCCESS
        );

        let enumerate_images: sys::pfn::EnumerateSwapchainImages =
            load(get_proc, instance, b"xrEnumerateSwapchainImages\0");
        let mut image_count = 0u32;
        assert_eq!(
            enumerate_images(swapchain, 0, &mut image_count, ptr::null_mut()),
            sys::Result::SUCCESS
        );
        assert_eq!(image_count, 3);
        let mut images: Vec<SwapchainImageD3D> = (0..image_count)
            .map(|_| SwapchainImageD3D {
                ty: sys::StructureType::SWAPCHAIN_IMAGE_D3D11_KHR,
                next: ptr::null_mut(),
                texture: ptr::null_mut(),
            })
            .collect();
        assert_eq!(
            enumerate_images(
                swapchain,
                image_count,
                &mut image_count,
                images.as_mut_ptr() as *mut sys::SwapchainImageBaseHeader,
            ),
            sys::Result::SUCCESS
        );
        assert!(images.iter().all(|image| !image.texture.is_null()));

        let acquire: sys::pfn::AcquireSwapchainImage =
            load(get_proc, instance, b"xrAcquireSwapchainImage\0");
        let wait: sys::pfn::WaitSwapchainImage =
            load(get_proc, instance, b"xrWaitSwapchainImage\0");
        let release: sys::pfn::ReleaseSwapchainImage =
            load(get_proc, instance, b"xrReleaseSwapchainImage\0");
        let mut index = u32::MAX;
        assert_eq!(acquire(swapchain, ptr::null(), &mut index), sys::Result::SUCCESS);
        assert!(index < image_count);
        let mut wait_info: sys::SwapchainImageWaitInfo = mem::zeroed();
        wait_info.ty = sys::StructureType::SWAPCHAIN_IMAGE_WAIT_INFO;
        assert_eq!(wait(swapchain, &wait_info), sys::Result::SUCCESS);
        assert_eq!(release(swapchain, ptr::null()), sys::Result::SUCCESS);

        // Spaces.
        let create_space: sys::pfn::CreateReferenceSpace =
            load(get_proc, instance, b"xrCreateReferenceSpace\0");
        let mut space_info: sys::ReferenceSpaceCreateInfo = mem::zeroed();
        space_info.ty = sys::StructureType::REFERENCE_SPACE_CREATE_INFO;
        space_info.reference_space_type = sys::ReferenceSpaceType::LOCAL;
        space_info.pose_in_reference_space.orientation.w = 1.0;
        let mut local = sys::Space::NULL;
        assert_eq!(create_space(session, &space_info, &mut local), sys::Result::SUCCESS);

        let bounds: sys::pfn::GetReferenceSpaceBoundsRect =
            load(get_proc, instance, b"xrGetReferenceSpaceBoundsRect\0");
        let mut extent = sys::Extent2Df {
            width: -1.0,
            height: -1.0,
        };
        assert_eq!(
            bounds(session, sys::ReferenceSpaceType::STAGE, &mut extent),
            sys::Result::SUCCESS
        );
        assert_eq!((extent.width, extent.height), (3.0, 3.0));
        assert_eq!(
            bounds(session, sys::ReferenceSpaceType::VIEW, &mut extent),
            sys::Result::SPACE_BOUNDS_UNAVAILABLE
        );

        // One frame.
        let wait_frame: sys::pfn::WaitFrame = load(get_proc, instance, b"xrWaitFrame\0");
        let begin_frame: sys::pfn::BeginFrame = load(get_proc, instance, b"xrBeginFrame\0");
        let end_frame: sys::pfn::EndFrame = load(get_proc, instance, b"xrEndFrame\0");
        let locate_views: sys::pfn::LocateViews = load(get_proc, instance, b"xrLocateViews\0");

        let mut frame_state: sys::FrameState = mem::zeroed();
        frame_state.ty = sys::StructureType::FRAME_STATE;
        assert_eq!(wait_frame(session, ptr::null(), &mut frame_state), sys::Result::SUCCESS);
        assert_eq!(frame_state.should_render, sys::TRUE);
        assert!(frame_state.predicted_display_period.as_nanos() > 0);
        assert_eq!(begin_frame(session, ptr::null()), sys::Result::SUCCESS);

        let mut locate_info: sys::ViewLocateInfo = mem::zeroed();
        locate_info.ty = sys::StructureType::VIEW_LOCATE_INFO;
        locate_info.view_configuration_type = sys::ViewConfigurationType::PRIMARY_STEREO;
        locate_info.display_time = frame_state.predicted_display_time;
        locate_info.space = local;
        let mut view_state: sys::ViewState = mem::zeroed();
        view_state.ty = sys::StructureType::VIEW_STATE;
        let mut views: [sys::View; 2] = mem::zeroed();
        for view in &mut views {
            view.ty = sys::StructureType::VIEW;
        }
        let mut view_count = 0u32;
        assert_eq!(
            locate_views(
                session,
                &locate_info,
                &mut view_state,
                2,
                &mut view_count,
                views.as_mut_ptr()
            ),
            sys::Result::SUCCESS
        );
        assert_eq!(view_count, 2);
        // Identity pose until a tracking packet arrives; eyes sit half the IPD apart.
        assert!(views[0].pose.position.x < 0.0);
        assert!(views[1].pose.position.x > 0.0);
        assert!(views[0].fov.angle_left < 0.0 && views[0].fov.angle_right > 0.0);

        let mut projection_views: [sys::CompositionLayerProjectionView; 2] = mem::zeroed();
        for (eye, view) in projection_views.iter_mut().enumerate() {
            view.ty = sys::StructureType::COMPOSITION_LAYER_PROJECTION_VIEW;
            view.pose = views[eye].pose;
            view.fov = views[eye].fov;
            view.sub_image.swapchain = swapchain;
            view.sub_image.image_rect.extent.width = 64;
            view.sub_image.image_rect.extent.height = 64;
        }
        let mut projection: sys::CompositionLayerProjection = mem::zeroed();
        projection.ty = sys::StructureType::COMPOSITION_LAYER_PROJECTION;
        projection.space = local;
        projection.view_count = 2;
        projection.views = projection_views.as_ptr();
        let layers = [&projection as *const sys::CompositionLayerProjection
            as *const sys::CompositionLayerBaseHeader];
        let mut end_info: sys::FrameEndInfo = mem::zeroed();
        end_info.ty = sys::StructureType::FRAME_END_INFO;
        end_info.display_time = frame_state.predicted_display_time;
        end_info.environment_blend_mode = sys::EnvironmentBlendMode::OPAQUE;
        end_info.layer_count = 1;
        end_info.layers = layers.as_ptr();
        assert_eq!(end_frame(session, &end_info), sys::Result::SUCCESS);

        end_info.environment_blend_mode = sys::EnvironmentBlendMode::ADDITIVE;
        assert_eq!(end_frame(session, &end_info), sys::Result::ERROR_VALIDATION_FAILURE);

        // Stale handles are rejected.
        let bogus = sys::Session::from_raw(session.into_raw() + 1);
        assert_eq!(begin_frame(bogus, ptr::null()), sys::Result::ERROR_HANDLE_INVALID);

        // Teardown.
        let destroy_session: sys::pfn::DestroySession =
            load(get_proc, instance, b"xrDestroySession\0");
        assert_eq!(destroy_session(session), sys::Result::SUCCESS);
        let destroy_instance: sys::pfn::DestroyInstance =
            load(get_proc, instance, b"xrDestroyInstance\0");
        assert_eq!(destroy_instance(instance), sys::Result::SUCCESS);

        // With no instance left the runtime is gone and every handle is invalid.
        assert_eq!(
            destroy_instance(instance),
            sys::Result::ERROR_HANDLE_INVALID
        );
    }
}
