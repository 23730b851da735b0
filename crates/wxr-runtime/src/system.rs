//! Fixed capabilities: extensions, system, views and graphics requirements.

use tracing::warn;

use crate::error::{XrError, XrResult};

pub const RUNTIME_NAME: &str = "OpenXR WXR Runtime";
pub const SYSTEM_NAME: &str = "OpenXR WXR";
pub const VENDOR_ID: u32 = 0;

pub const FORM_FACTOR_HEAD_MOUNTED_DISPLAY: i32 = 1;
pub const SYSTEM_ID: u64 = 1;

pub const VIEW_CONFIGURATION_PRIMARY_STEREO: i32 = 2;
pub const BLEND_MODE_OPAQUE: i32 = 1;

pub const MAX_SWAPCHAIN_EXTENT: u32 = 4096;
pub const MAX_LAYER_COUNT: u32 = 16;
pub const MAX_SWAPCHAIN_ARRAY_SIZE: u32 = 64;
pub const MAX_SWAPCHAIN_SAMPLE_COUNT: u32 = 8;
pub const RECOMMENDED_VIEW_WIDTH: u32 = 1280;
pub const RECOMMENDED_VIEW_HEIGHT: u32 = 720;

/// `D3D_FEATURE_LEVEL_11_0`.
pub const D3D_MIN_FEATURE_LEVEL: u32 = 0xb000;

/// Ticks per second of the performance counter clock used for time conversion.
pub const PERFORMANCE_COUNTER_FREQUENCY: i64 = 10_000_000;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// `XR_MAKE_VERSION`.
pub const fn make_version(major: u64, minor: u64, patch: u64) -> u64 {
    ((major & 0xffff) << 48) | ((minor & 0xffff) << 32) | (patch & 0xffff_ffff)
}

pub const RUNTIME_VERSION: u64 = make_version(1, 0, 27);
pub const GL_MIN_API_VERSION: u64 = make_version(4, 0, 0);
pub const GL_MAX_API_VERSION: u64 = make_version(4, 6, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionProperties {
    pub name: &'static str,
    pub version: u32,
}

pub const SUPPORTED_EXTENSIONS: &[ExtensionProperties] = &[
    ExtensionProperties {
        name: "XR_KHR_D3D11_enable",
        version: 9,
    },
    ExtensionProperties {
        name: "XR_KHR_D3D12_enable",
        version: 9,
    },
    ExtensionProperties {
        name: "XR_KHR_opengl_enable",
        version: 10,
    },
    ExtensionProperties {
        name: "XR_KHR_composition_layer_depth",
        version: 6,
    },
    ExtensionProperties {
        name: "XR_KHR_composition_layer_cylinder",
        version: 4,
    },
    ExtensionProperties {
        name: "XR_KHR_win32_convert_performance_counter_time",
        version: 1,
    },
];

pub fn is_extension_supported(name: &str) -> bool {
    SUPPORTED_EXTENSIONS.iter().any(|ext| ext.name == name)
}

/// Check every requested extension. The first unknown one fails the whole request.
pub fn validate_extensions<S: AsRef<str>>(requested: &[S]) -> XrResult<Vec<String>> {
    let mut accepted = Vec::with_capacity(requested.len());
    for name in requested {
        let name = name.as_ref();
        if !is_extension_supported(name) {
            warn!(extension = name, "unsupported extension requested");
            return Err(XrError::ExtensionNotPresent(name.to_string()));
        }
        accepted.push(name.to_string());
    }
    Ok(accepted)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceProperties {
    pub runtime_name: &'static str,
    pub runtime_version: u64,
}

pub const INSTANCE_PROPERTIES: InstanceProperties = InstanceProperties {
    runtime_name: RUNTIME_NAME,
    runtime_version: RUNTIME_VERSION,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemProperties {
    pub system_id: u64,
    pub vendor_id: u32,
    pub system_name: &'static str,
    pub max_swapchain_width: u32,
    pub max_swapchain_height: u32,
    pub max_layer_count: u32,
    pub orientation_tracking: bool,
    pub position_tracking: bool,
}

pub const SYSTEM_PROPERTIES: SystemProperties = SystemProperties {
    system_id: SYSTEM_ID,
    vendor_id: VENDOR_ID,
    system_name: SYSTEM_NAME,
    max_swapchain_width: MAX_SWAPCHAIN_EXTENT,
    max_swapchain_height: MAX_SWAPCHAIN_EXTENT,
    max_layer_count: MAX_LAYER_COUNT,
    orientation_tracking: true,
    position_tracking: true,
};

pub fn system_for_form_factor(form_factor: i32) -> XrResult<u64> {
    if form_factor == FORM_FACTOR_HEAD_MOUNTED_DISPLAY {
        Ok(SYSTEM_ID)
    } else {
        Err(XrError::FormFactorUnsupported(form_factor))
    }
}

pub fn check_system(system_id: u64) -> XrResult<()> {
    if system_id == SYSTEM_ID {
        Ok(())
    } else {
        Err(XrError::SystemInvalid(system_id))
    }
}

pub fn check_view_configuration(view_configuration: i32) -> XrResult<()> {
    if view_configuration == VIEW_CONFIGURATION_PRIMARY_STEREO {
        Ok(())
    } else {
        Err(XrError::ViewConfigurationUnsupported(view_configuration))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfigurationView {
    pub recommended_width: u32,
    pub recommended_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub recommended_samples: u32,
    pub max_samples: u32,
}

pub const STEREO_VIEW: ViewConfigurationView = ViewConfigurationView {
    recommended_width: RECOMMENDED_VIEW_WIDTH,
    recommended_height: RECOMMENDED_VIEW_HEIGHT,
    max_width: MAX_SWAPCHAIN_EXTENT,
    max_height: MAX_SWAPCHAIN_EXTENT,
    recommended_samples: 1,
    max_samples: 1,
};

/// Performance counter ticks to runtime nanoseconds.
pub fn counter_to_time(counter: i64) -> i64 {
    (counter as i128 * NANOS_PER_SECOND as i128 / PERFORMANCE_COUNTER_FREQUENCY as i128) as i64
}

pub fn time_to_counter(time: i64) -> i64 {
    (time as i128 * PERFORMANCE_COUNTER_FREQUENCY as i128 / NANOS_PER_SECOND as i128) as i64
}
