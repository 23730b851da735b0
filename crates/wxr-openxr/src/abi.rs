//! C structure helpers.
//!
//! Core OpenXR structures come from `openxr::sys`. The loader negotiation structures and the
//! graphics-API extension structures carry platform pointer types, so they are mirrored here
//! with opaque pointers.

use std::ffi::{c_char, c_void, CStr};
#[cfg(test)]
use std::ptr;

use glam::Vec3;
use openxr::sys::{self, Handle as _};
use wxr_runtime::compositor::{CompositionLayer, Rect2Di, SubImage};
use wxr_runtime::system::{MAX_LAYER_COUNT, RUNTIME_VERSION};
use wxr_runtime::{
    ActionHandle, ActionSetHandle, Fov, GraphicsBinding, InstanceHandle, Pose, SessionHandle,
    SpaceHandle, SwapchainHandle, XrError, XrResult,
};

pub const LOADER_INTERFACE_STRUCT_LOADER_INFO: u32 = 1;
pub const LOADER_INTERFACE_STRUCT_RUNTIME_REQUEST: u32 = 3;
pub const LOADER_INFO_STRUCT_VERSION: u32 = 1;
pub const RUNTIME_INFO_STRUCT_VERSION: u32 = 1;
pub const CURRENT_LOADER_RUNTIME_VERSION: u32 = 1;

/// `XrNegotiateLoaderInfo`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NegotiateLoaderInfo {
    pub struct_type: u32,
    pub struct_version: u32,
    pub struct_size: usize,
    pub min_interface_version: u32,
    pub max_interface_version: u32,
    pub min_api_version: sys::Version,
    pub max_api_version: sys::Version,
}

/// `XrNegotiateRuntimeRequest`.
#[repr(C)]
pub struct NegotiateRuntimeRequest {
    pub struct_type: u32,
    pub struct_version: u32,
    pub struct_size: usize,
    pub runtime_interface_version: u32,
    pub runtime_api_version: sys::Version,
    pub get_instance_proc_addr: Option<sys::pfn::GetInstanceProcAddr>,
}

#[repr(C)]
pub struct GraphicsBindingD3D11 {
    pub ty: sys::StructureType,
    pub next: *const c_void,
    pub device: *mut c_void,
}

#[repr(C)]
pub struct GraphicsBindingD3D12 {
    pub ty: sys::StructureType,
    pub next: *const c_void,
    pub device: *mut c_void,
    pub queue: *mut c_void,
}

#[repr(C)]
pub struct GraphicsBindingOpenGlWin32 {
    pub ty: sys::StructureType,
    pub next: *const c_void,
    pub h_dc: *mut c_void,
    pub h_glrc: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Luid {
    pub low_part: u32,
    pub high_part: i32,
}

/// Shared layout of `XrGraphicsRequirementsD3D11KHR` and `XrGraphicsRequirementsD3D12KHR`.
#[repr(C)]
pub struct GraphicsRequirementsD3D {
    pub ty: sys::StructureType,
    pub next: *mut c_void,
    pub adapter_luid: Luid,
    pub min_feature_level: u32,
}

#[repr(C)]
pub struct GraphicsRequirementsOpenGl {
    pub ty: sys::StructureType,
    pub next: *mut c_void,
    pub min_api_version_supported: sys::Version,
    pub max_api_version_supported: sys::Version,
}

/// Shared layout of `XrSwapchainImageD3D11KHR` and `XrSwapchainImageD3D12KHR`.
#[repr(C)]
pub struct SwapchainImageD3D {
    pub ty: sys::StructureType,
    pub next: *mut c_void,
    pub texture: *mut c_void,
}

#[repr(C)]
pub struct SwapchainImageOpenGl {
    pub ty: sys::StructureType,
    pub next: *mut c_void,
    pub image: u32,
}

/// Check the loader's offer and fill in the runtime's side.
pub fn negotiate(
    info: &NegotiateLoaderInfo,
    request: &mut NegotiateRuntimeRequest,
    get_instance_proc_addr: sys::pfn::GetInstanceProcAddr,
) -> XrResult<()> {
    if info.struct_type != LOADER_INTERFACE_STRUCT_LOADER_INFO
        || info.struct_version != LOADER_INFO_STRUCT_VERSION
        || info.struct_size != std::mem::size_of::<NegotiateLoaderInfo>()
    {
        return Err(XrError::InitializationFailed("malformed loader info".into()));
    }
    if request.struct_type != LOADER_INTERFACE_STRUCT_RUNTIME_REQUEST
        || request.struct_version != RUNTIME_INFO_STRUCT_VERSION
        || request.struct_size != std::mem::size_of::<NegotiateRuntimeRequest>()
    {
        return Err(XrError::InitializationFailed("malformed runtime request".into()));
    }
    if info.min_interface_version > CURRENT_LOADER_RUNTIME_VERSION
        || info.max_interface_version < CURRENT_LOADER_RUNTIME_VERSION
    {
        return Err(XrError::InitializationFailed(format!(
            "loader interface {}..={} excludes {CURRENT_LOADER_RUNTIME_VERSION}",
            info.min_interface_version, info.max_interface_version
        )));
    }
    let ours = sys::Version::from_raw(RUNTIME_VERSION);
    let (min, max) = (info.min_api_version, info.max_api_version);
    if (min.major(), min.minor()) > (ours.major(), ours.minor())
        || (max.major(), max.minor()) < (ours.major(), ours.minor())
    {
        return Err(XrError::InitializationFailed(format!(
            "loader api {}.{}..={}.{} excludes {}.{}",
            min.major(),
            min.minor(),
            max.major(),
            max.minor(),
            ours.major(),
            ours.minor()
        )));
    }

    request.runtime_interface_version = CURRENT_LOADER_RUNTIME_VERSION;
    request.runtime_api_version = ours;
    request.get_instance_proc_addr = Some(get_instance_proc_addr);
    Ok(())
}

// ---- pointers ----

pub unsafe fn input<'a, T>(ptr: *const T, what: &str) -> XrResult<&'a T> {
    ptr.as_ref()
        .ok_or_else(|| XrError::validation(format!("{what} is null")))
}

pub unsafe fn output<'a, T>(ptr: *mut T, what: &str) -> XrResult<&'a mut T> {
    ptr.as_mut()
        .ok_or_else(|| XrError::validation(format!("{what} is null")))
}

/// A counted array. A zero count accepts a null pointer.
pub unsafe fn slice<'a, T>(ptr: *const T, count: u32, what: &str) -> XrResult<&'a [T]> {
    if count == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(XrError::validation(format!("{what} is null with count {count}")));
    }
    Ok(std::slice::from_raw_parts(ptr, count as usize))
}

pub fn check_type(actual: sys::StructureType, expected: sys::StructureType) -> XrResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(XrError::validation(format!(
            "structure type {} where {} expected",
            actual.into_raw(),
            expected.into_raw()
        )))
    }
}

/// Two-call idiom: the count is always written; items are written only when the caller's
/// capacity holds all of them.
pub unsafe fn two_call<T>(
    capacity: u32,
    count_output: *mut u32,
    items: *mut T,
    len: usize,
    mut write: impl FnMut(&mut T, usize),
) -> XrResult<()> {
    let count = output(count_output, "count output")?;
    let len = u32::try_from(len).map_err(|_| XrError::runtime("enumeration too large"))?;
    *count = len;
    if capacity == 0 || capacity < len {
        return Ok(());
    }
    if items.is_null() {
        return Err(XrError::validation("output array is null"));
    }
    let slots = std::slice::from_raw_parts_mut(items, len as usize);
    for (index, slot) in slots.iter_mut().enumerate() {
        write(slot, index);
    }
    Ok(())
}

/// Two-call idiom for strings. The count includes the terminator.
pub unsafe fn two_call_string(
    capacity: u32,
    count_output: *mut u32,
    buffer: *mut c_char,
    text: &str,
) -> XrResult<()> {
    let bytes = text.as_bytes();
    two_call(capacity, count_output, buffer, bytes.len() + 1, |slot, index| {
        *slot = bytes.get(index).copied().unwrap_or(0) as c_char;
    })
}

// ---- strings ----

pub unsafe fn c_str<'a>(ptr: *const c_char, what: &str) -> XrResult<&'a str> {
    if ptr.is_null() {
        return Err(XrError::validation(format!("{what} is null")));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| XrError::validation(format!("{what} is not UTF-8")))
}

pub unsafe fn c_str_list(count: u32, names: *const *const c_char, what: &str) -> XrResult<Vec<String>> {
    slice(names, count, what)?
        .iter()
        .map(|name| c_str(*name, what).map(str::to_string))
        .collect()
}

/// Contents of a fixed-size character array up to the first NUL.
pub fn fixed_str(chars: &[c_char]) -> String {
    let bytes: Vec<u8> = chars
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Copy into a fixed-size character array, truncating and always terminating.
pub fn copy_str(dst: &mut [c_char], text: &str) {
    let Some(max) = dst.len().checked_sub(1) else {
        return;
    };
    let len = text.len().min(max);
    for (slot, byte) in dst.iter_mut().zip(&text.as_bytes()[..len]) {
        *slot = *byte as c_char;
    }
    dst[len] = 0;
}

/// Copy into a caller buffer of `capacity` characters.
pub unsafe fn copy_str_raw(dst: *mut c_char, capacity: usize, text: &str) -> XrResult<()> {
    if dst.is_null() {
        return Err(XrError::validation("string buffer is null"));
    }
    copy_str(std::slice::from_raw_parts_mut(dst, capacity), text);
    Ok(())
}

// ---- next chains ----

/// First structure of type `ty` in an input chain.
pub unsafe fn find_in_chain(next: *const c_void, ty: sys::StructureType) -> Option<*const sys::BaseInStructure> {
    let mut cursor = next as *const sys::BaseInStructure;
    while let Some(base) = cursor.as_ref() {
        if base.ty == ty {
            return Some(cursor);
        }
        cursor = base.next;
    }
    None
}

/// First structure of type `ty` in an output chain.
pub unsafe fn find_out_chain(next: *mut c_void, ty: sys::StructureType) -> Option<*mut sys::BaseOutStructure> {
    let mut cursor = next as *mut sys::BaseOutStructure;
    while let Some(base) = cursor.as_mut() {
        if base.ty == ty {
            return Some(cursor);
        }
        cursor = base.next;
    }
    None
}

/// The first graphics binding the runtime recognizes in a session create chain.
pub unsafe fn graphics_binding(next: *const c_void) -> Option<GraphicsBinding> {
    let mut cursor = next as *const sys::BaseInStructure;
    while let Some(base) = cursor.as_ref() {
        match base.ty {
            sys::StructureType::GRAPHICS_BINDING_D3D11_KHR => {
                let binding = &*(cursor as *const GraphicsBindingD3D11);
                return Some(GraphicsBinding::D3D11 {
                    device: binding.device as usize as u64,
                });
            }
            sys::StructureType::GRAPHICS_BINDING_D3D12_KHR => {
                let binding = &*(cursor as *const GraphicsBindingD3D12);
                return Some(GraphicsBinding::D3D12 {
                    device: binding.device as usize as u64,
                    queue: binding.queue as usize as u64,
                });
            }
            sys::StructureType::GRAPHICS_BINDING_OPENGL_WIN32_KHR => {
                let binding = &*(cursor as *const GraphicsBindingOpenGlWin32);
                return Some(GraphicsBinding::OpenGl {
                    hdc: binding.h_dc as usize as u64,
                    hglrc: binding.h_glrc as usize as u64,
                });
            }
            _ => cursor = base.next,
        }
    }
    None
}

// ---- layers ----

fn sub_image(sub: &sys::SwapchainSubImage) -> SubImage {
    SubImage {
        swapchain: swapchain(sub.swapchain),
        rect: Rect2Di::new(
            sub.image_rect.offset.x,
            sub.image_rect.offset.y,
            sub.image_rect.extent.width,
            sub.image_rect.extent.height,
        ),
        array_index: sub.image_array_index,
    }
}

/// Translate `XrFrameEndInfo::layers` in submission order.
pub unsafe fn composition_layers(
    count: u32,
    layers: *const *const sys::CompositionLayerBaseHeader,
) -> XrResult<Vec<CompositionLayer>> {
    if count > MAX_LAYER_COUNT {
        return Err(XrError::validation(format!(
            "{count} layers exceeds the limit of {MAX_LAYER_COUNT}"
        )));
    }
    let mut out = Vec::with_capacity(count as usize);
    for header in slice(layers, count, "layers")? {
        let base = input(*header, "layer")?;
        let layer = match base.ty {
            sys::StructureType::COMPOSITION_LAYER_PROJECTION => {
                let projection = &*(*header as *const sys::CompositionLayerProjection);
                let views = slice(projection.views, projection.view_count, "projection views")?;
                CompositionLayer::Projection {
                    views: views.iter().map(|v| sub_image(&v.sub_image)).collect(),
                }
            }
            sys::StructureType::COMPOSITION_LAYER_QUAD => {
                let quad = &*(*header as *const sys::CompositionLayerQuad);
                CompositionLayer::Quad {
                    sub_image: sub_image(&quad.sub_image),
                    size: (quad.size.width, quad.size.height),
                }
            }
            sys::StructureType::COMPOSITION_LAYER_CYLINDER_KHR => {
                let cylinder = &*(*header as *const sys::CompositionLayerCylinderKHR);
                CompositionLayer::Cylinder {
                    sub_image: sub_image(&cylinder.sub_image),
                }
            }
            other => CompositionLayer::Other {
                type_raw: other.into_raw(),
            },
        };
        out.push(layer);
    }
    Ok(out)
}

// ---- values ----

pub fn posef(pose: &Pose) -> sys::Posef {
    sys::Posef {
        orientation: sys::Quaternionf {
            x: pose.orientation.x,
            y: pose.orientation.y,
            z: pose.orientation.z,
            w: pose.orientation.w,
        },
        position: vector3f(pose.position),
    }
}

pub fn vector3f(v: Vec3) -> sys::Vector3f {
    sys::Vector3f {
        x: v.x,
        y: v.y,
        z: v.z,
    }
}

pub fn fovf(fov: &Fov) -> sys::Fovf {
    sys::Fovf {
        angle_left: fov.angle_left,
        angle_right: fov.angle_right,
        angle_up: fov.angle_up,
        angle_down: fov.angle_down,
    }
}

pub fn bool32(value: bool) -> sys::Bool32 {
    value.into()
}

macro_rules! handle_conversions {
    ($($fn_name:ident: $sys:ty => $ours:ty, $back:ident;)*) => {
        $(
            pub fn $fn_name(handle: $sys) -> $ours {
                <$ours>::from_raw(handle.into_raw())
            }

            pub fn $back(handle: $ours) -> $sys {
                <$sys>::from_raw(handle.into_raw())
            }
        )*
    };
}

handle_conversions! {
    instance: sys::Instance => InstanceHandle, to_instance;
    session: sys::Session => SessionHandle, to_session;
    swapchain: sys::Swapchain => SwapchainHandle, to_swapchain;
    space: sys::Space => SpaceHandle, to_space;
    action_set: sys::ActionSet => ActionSetHandle, to_action_set;
    action: sys::Action => ActionHandle, to_action;
}
