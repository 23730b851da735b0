//! Instance, system and capability entry points.

use std::ffi::c_char;

use openxr::sys;
use tracing::info;
use wxr_runtime::system::{
    self, D3D_MIN_FEATURE_LEVEL, GL_MAX_API_VERSION, GL_MIN_API_VERSION, INSTANCE_PROPERTIES,
    STEREO_VIEW, SUPPORTED_EXTENSIONS, SYSTEM_PROPERTIES,
};
use wxr_runtime::tracking::VIEW_COUNT;
use wxr_runtime::{result_name, structure_type_name, XrError};

use crate::abi::{self, GraphicsRequirementsD3D, GraphicsRequirementsOpenGl, Luid};
use crate::{entry_ok, release_idle_runtime, with_runtime, with_runtime_or_init};

pub(crate) unsafe extern "system" fn xr_enumerate_instance_extension_properties(
    layer_name: *const c_char,
    capacity: u32,
    count_output: *mut u32,
    properties: *mut sys::ExtensionProperties,
) -> sys::Result {
    entry_ok("xrEnumerateInstanceExtensionProperties", || {
        if !layer_name.is_null() {
            let layer = abi::c_str(layer_name, "layer name")?;
            return Err(XrError::ApiLayerNotPresent(layer.to_string()));
        }
        abi::two_call(
            capacity,
            count_output,
            properties,
            SUPPORTED_EXTENSIONS.len(),
            |slot, i| {
                abi::copy_str(&mut slot.extension_name, SUPPORTED_EXTENSIONS[i].name);
                slot.extension_version = SUPPORTED_EXTENSIONS[i].version;
            },
        )
    })
}

/// No API layers ship with the runtime.
pub(crate) unsafe extern "system" fn xr_enumerate_api_layer_properties(
    capacity: u32,
    count_output: *mut u32,
    properties: *mut sys::ApiLayerProperties,
) -> sys::Result {
    entry_ok("xrEnumerateApiLayerProperties", || {
        abi::two_call(capacity, count_output, properties, 0, |_, _| {})
    })
}

pub(crate) unsafe extern "system" fn xr_create_instance(
    create_info: *const sys::InstanceCreateInfo,
    instance: *mut sys::Instance,
) -> sys::Result {
    entry_ok("xrCreateInstance", || {
        let info = abi::input(create_info, "create info")?;
        abi::check_type(info.ty, sys::StructureType::INSTANCE_CREATE_INFO)?;
        let out = abi::output(instance, "instance")?;

        let app = &info.application_info;
        let application = abi::fixed_str(&app.application_name);
        let engine = abi::fixed_str(&app.engine_name);
        let layers = abi::c_str_list(
            info.enabled_api_layer_count,
            info.enabled_api_layer_names,
            "api layer names",
        )?;
        let extensions = abi::c_str_list(
            info.enabled_extension_count,
            info.enabled_extension_names,
            "extension names",
        )?;
        info!(
            application = %application,
            engine = %engine,
            api = %format!(
                "{}.{}.{}",
                app.api_version.major(),
                app.api_version.minor(),
                app.api_version.patch()
            ),
            "application connecting"
        );

        let created = with_runtime_or_init(|rt| {
            rt.create_instance(&application, layers.as_slice(), extensions.as_slice())
        });
        match created {
            Ok(handle) => {
                *out = abi::to_instance(handle);
                Ok(())
            }
            Err(e) => {
                release_idle_runtime();
                Err(e)
            }
        }
    })
}

pub(crate) unsafe extern "system" fn xr_destroy_instance(instance: sys::Instance) -> sys::Result {
    entry_ok("xrDestroyInstance", || {
        with_runtime(|rt| rt.destroy_instance(abi::instance(instance)))?;
        release_idle_runtime();
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_get_instance_properties(
    instance: sys::Instance,
    properties: *mut sys::InstanceProperties,
) -> sys::Result {
    entry_ok("xrGetInstanceProperties", || {
        let out = abi::output(properties, "instance properties")?;
        with_runtime(|rt| rt.check_instance(abi::instance(instance)))?;
        out.runtime_version = sys::Version::from_raw(INSTANCE_PROPERTIES.runtime_version);
        abi::copy_str(&mut out.runtime_name, INSTANCE_PROPERTIES.runtime_name);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_get_system(
    instance: sys::Instance,
    get_info: *const sys::SystemGetInfo,
    system_id: *mut sys::SystemId,
) -> sys::Result {
    entry_ok("xrGetSystem", || {
        let info = abi::input(get_info, "system get info")?;
        abi::check_type(info.ty, sys::StructureType::SYSTEM_GET_INFO)?;
        let out = abi::output(system_id, "system id")?;
        let id = with_runtime(|rt| {
            rt.get_system(abi::instance(instance), info.form_factor.into_raw())
        })?;
        *out = sys::SystemId::from_raw(id);
        Ok(())
    })
}

fn check_system(instance: sys::Instance, system_id: sys::SystemId) -> wxr_runtime::XrResult<()> {
    with_runtime(|rt| rt.check_system(abi::instance(instance), system_id.into_raw()))
}

pub(crate) unsafe extern "system" fn xr_get_system_properties(
    instance: sys::Instance,
    system_id: sys::SystemId,
    properties: *mut sys::SystemProperties,
) -> sys::Result {
    entry_ok("xrGetSystemProperties", || {
        let out = abi::output(properties, "system properties")?;
        check_system(instance, system_id)?;
        let props = &SYSTEM_PROPERTIES;
        out.system_id = sys::SystemId::from_raw(props.system_id);
        out.vendor_id = props.vendor_id;
        abi::copy_str(&mut out.system_name, props.system_name);
        out.graphics_properties = sys::SystemGraphicsProperties {
            max_swapchain_image_height: props.max_swapchain_height,
            max_swapchain_image_width: props.max_swapchain_width,
            max_layer_count: props.max_layer_count,
        };
        out.tracking_properties = sys::SystemTrackingProperties {
            orientation_tracking: abi::bool32(props.orientation_tracking),
            position_tracking: abi::bool32(props.position_tracking),
        };
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_enumerate_view_configurations(
    instance: sys::Instance,
    system_id: sys::SystemId,
    capacity: u32,
    count_output: *mut u32,
    view_configurations: *mut sys::ViewConfigurationType,
) -> sys::Result {
    entry_ok("xrEnumerateViewConfigurations", || {
        check_system(instance, system_id)?;
        abi::two_call(capacity, count_output, view_configurations, 1, |slot, _| {
            *slot = sys::ViewConfigurationType::from_raw(system::VIEW_CONFIGURATION_PRIMARY_STEREO);
        })
    })
}

pub(crate) unsafe extern "system" fn xr_get_view_configuration_properties(
    instance: sys::Instance,
    system_id: sys::SystemId,
    view_configuration: sys::ViewConfigurationType,
    properties: *mut sys::ViewConfigurationProperties,
) -> sys::Result {
    entry_ok("xrGetViewConfigurationProperties", || {
        let out = abi::output(properties, "view configuration properties")?;
        check_system(instance, system_id)?;
        system::check_view_configuration(view_configuration.into_raw())?;
        out.view_configuration_type = view_configuration;
        out.fov_mutable = abi::bool32(false);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_enumerate_view_configuration_views(
    instance: sys::Instance,
    system_id: sys::SystemId,
    view_configuration: sys::ViewConfigurationType,
    capacity: u32,
    count_output: *mut u32,
    views: *mut sys::ViewConfigurationView,
) -> sys::Result {
    entry_ok("xrEnumerateViewConfigurationViews", || {
        check_system(instance, system_id)?;
        system::check_view_configuration(view_configuration.into_raw())?;
        abi::two_call(capacity, count_output, views, VIEW_COUNT, |slot, _| {
            slot.recommended_image_rect_width = STEREO_VIEW.recommended_width;
            slot.recommended_image_rect_height = STEREO_VIEW.recommended_height;
            slot.max_image_rect_width = STEREO_VIEW.max_width;
            slot.max_image_rect_height = STEREO_VIEW.max_height;
            slot.recommended_swapchain_sample_count = STEREO_VIEW.recommended_samples;
            slot.max_swapchain_sample_count = STEREO_VIEW.max_samples;
        })
    })
}

pub(crate) unsafe extern "system" fn xr_enumerate_environment_blend_modes(
    instance: sys::Instance,
    system_id: sys::SystemId,
    view_configuration: sys::ViewConfigurationType,
    capacity: u32,
    count_output: *mut u32,
    blend_modes: *mut sys::EnvironmentBlendMode,
) -> sys::Result {
    entry_ok("xrEnumerateEnvironmentBlendModes", || {
        check_system(instance, system_id)?;
        system::check_view_configuration(view_configuration.into_raw())?;
        abi::two_call(capacity, count_output, blend_modes, 1, |slot, _| {
            *slot = sys::EnvironmentBlendMode::from_raw(system::BLEND_MODE_OPAQUE);
        })
    })
}

unsafe fn d3d_requirements(
    name: &'static str,
    instance: sys::Instance,
    system_id: sys::SystemId,
    requirements: *mut GraphicsRequirementsD3D,
) -> sys::Result {
    entry_ok(name, || {
        let out = abi::output(requirements, "graphics requirements")?;
        check_system(instance, system_id)?;
        out.adapter_luid = Luid::default();
        out.min_feature_level = D3D_MIN_FEATURE_LEVEL;
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_get_d3d11_graphics_requirements(
    instance: sys::Instance,
    system_id: sys::SystemId,
    requirements: *mut GraphicsRequirementsD3D,
) -> sys::Result {
    d3d_requirements("xrGetD3D11GraphicsRequirementsKHR", instance, system_id, requirements)
}

pub(crate) unsafe extern "system" fn xr_get_d3d12_graphics_requirements(
    instance: sys::Instance,
    system_id: sys::SystemId,
    requirements: *mut GraphicsRequirementsD3D,
) -> sys::Result {
    d3d_requirements("xrGetD3D12GraphicsRequirementsKHR", instance, system_id, requirements)
}

pub(crate) unsafe extern "system" fn xr_get_opengl_graphics_requirements(
    instance: sys::Instance,
    system_id: sys::SystemId,
    requirements: *mut GraphicsRequirementsOpenGl,
) -> sys::Result {
    entry_ok("xrGetOpenGLGraphicsRequirementsKHR", || {
        let out = abi::output(requirements, "graphics requirements")?;
        check_system(instance, system_id)?;
        out.min_api_version_supported = sys::Version::from_raw(GL_MIN_API_VERSION);
        out.max_api_version_supported = sys::Version::from_raw(GL_MAX_API_VERSION);
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_result_to_string(
    instance: sys::Instance,
    value: sys::Result,
    buffer: *mut c_char,
) -> sys::Result {
    entry_ok("xrResultToString", || {
        with_runtime(|rt| rt.check_instance(abi::instance(instance)))?;
        abi::copy_str_raw(buffer, sys::MAX_RESULT_STRING_SIZE, &result_name(value.into_raw()))
    })
}

pub(crate) unsafe extern "system" fn xr_structure_type_to_string(
    instance: sys::Instance,
    value: sys::StructureType,
    buffer: *mut c_char,
) -> sys::Result {
    entry_ok("xrStructureTypeToString", || {
        with_runtime(|rt| rt.check_instance(abi::instance(instance)))?;
        abi::copy_str_raw(
            buffer,
            sys::MAX_STRUCTURE_NAME_SIZE,
            &structure_type_name(value.into_raw()),
        )
    })
}

pub(crate) unsafe extern "system" fn xr_convert_performance_counter_to_time(
    instance: sys::Instance,
    performance_counter: *const i64,
    time: *mut sys::Time,
) -> sys::Result {
    entry_ok("xrConvertWin32PerformanceCounterToTimeKHR", || {
        let counter = *abi::input(performance_counter, "performance counter")?;
        let out = abi::output(time, "time")?;
        with_runtime(|rt| rt.check_instance(abi::instance(instance)))?;
        *out = sys::Time::from_nanos(system::counter_to_time(counter));
        Ok(())
    })
}

pub(crate) unsafe extern "system" fn xr_convert_time_to_performance_counter(
    instance: sys::Instance,
    time: sys::Time,
    performance_counter: *mut i64,
) -> sys::Result {
    entry_ok("xrConvertTimeToWin32PerformanceCounterKHR", || {
        let out = abi::output(performance_counter, "performance counter")?;
        with_runtime(|rt| rt.check_instance(abi::instance(instance)))?;
        *out = system::time_to_counter(time.as_nanos());
        Ok(())
    })
}
