//! Symbolic names for `XrStructureType` values, as returned by `xrStructureTypeToString`.

const STRUCTURE_TYPES: &[(i32, &str)] = &[
    (0, "XR_TYPE_UNKNOWN"),
    (1, "XR_TYPE_API_LAYER_PROPERTIES"),
    (2, "XR_TYPE_EXTENSION_PROPERTIES"),
    (3, "XR_TYPE_INSTANCE_CREATE_INFO"),
    (4, "XR_TYPE_SYSTEM_GET_INFO"),
    (5, "XR_TYPE_SYSTEM_PROPERTIES"),
    (6, "XR_TYPE_VIEW_LOCATE_INFO"),
    (7, "XR_TYPE_VIEW"),
    (8, "XR_TYPE_SESSION_CREATE_INFO"),
    (9, "XR_TYPE_SWAPCHAIN_CREATE_INFO"),
    (10, "XR_TYPE_SESSION_BEGIN_INFO"),
    (11, "XR_TYPE_VIEW_STATE"),
    (12, "XR_TYPE_FRAME_END_INFO"),
    (13, "XR_TYPE_HAPTIC_VIBRATION"),
    (16, "XR_TYPE_EVENT_DATA_BUFFER"),
    (17, "XR_TYPE_EVENT_DATA_INSTANCE_LOSS_PENDING"),
    (18, "XR_TYPE_EVENT_DATA_SESSION_STATE_CHANGED"),
    (23, "XR_TYPE_ACTION_STATE_BOOLEAN"),
    (24, "XR_TYPE_ACTION_STATE_FLOAT"),
    (25, "XR_TYPE_ACTION_STATE_VECTOR2F"),
    (27, "XR_TYPE_ACTION_STATE_POSE"),
    (28, "XR_TYPE_ACTION_SET_CREATE_INFO"),
    (29, "XR_TYPE_ACTION_CREATE_INFO"),
    (32, "XR_TYPE_INSTANCE_PROPERTIES"),
    (33, "XR_TYPE_FRAME_WAIT_INFO"),
    (35, "XR_TYPE_COMPOSITION_LAYER_PROJECTION"),
    (36, "XR_TYPE_COMPOSITION_LAYER_QUAD"),
    (37, "XR_TYPE_REFERENCE_SPACE_CREATE_INFO"),
    (38, "XR_TYPE_ACTION_SPACE_CREATE_INFO"),
    (40, "XR_TYPE_EVENT_DATA_REFERENCE_SPACE_CHANGE_PENDING"),
    (41, "XR_TYPE_VIEW_CONFIGURATION_VIEW"),
    (42, "XR_TYPE_SPACE_LOCATION"),
    (43, "XR_TYPE_SPACE_VELOCITY"),
    (44, "XR_TYPE_FRAME_STATE"),
    (45, "XR_TYPE_VIEW_CONFIGURATION_PROPERTIES"),
    (46, "XR_TYPE_FRAME_BEGIN_INFO"),
    (48, "XR_TYPE_COMPOSITION_LAYER_PROJECTION_VIEW"),
    (49, "XR_TYPE_EVENT_DATA_EVENTS_LOST"),
    (51, "XR_TYPE_INTERACTION_PROFILE_SUGGESTED_BINDING"),
    (52, "XR_TYPE_EVENT_DATA_INTERACTION_PROFILE_CHANGED"),
    (53, "XR_TYPE_INTERACTION_PROFILE_STATE"),
    (55, "XR_TYPE_SWAPCHAIN_IMAGE_ACQUIRE_INFO"),
    (56, "XR_TYPE_SWAPCHAIN_IMAGE_WAIT_INFO"),
    (57, "XR_TYPE_SWAPCHAIN_IMAGE_RELEASE_INFO"),
    (58, "XR_TYPE_ACTION_STATE_GET_INFO"),
    (59, "XR_TYPE_HAPTIC_ACTION_INFO"),
    (60, "XR_TYPE_SESSION_ACTION_SETS_ATTACH_INFO"),
    (61, "XR_TYPE_ACTIONS_SYNC_INFO"),
    (62, "XR_TYPE_BOUND_SOURCES_FOR_ACTION_ENUMERATE_INFO"),
    (63, "XR_TYPE_INPUT_SOURCE_LOCALIZED_NAME_GET_INFO"),
    (1000010000, "XR_TYPE_COMPOSITION_LAYER_DEPTH_INFO_KHR"),
    (1000017000, "XR_TYPE_COMPOSITION_LAYER_CYLINDER_KHR"),
    (1000023000, "XR_TYPE_GRAPHICS_BINDING_OPENGL_WIN32_KHR"),
    (1000023004, "XR_TYPE_SWAPCHAIN_IMAGE_OPENGL_KHR"),
    (1000023005, "XR_TYPE_GRAPHICS_REQUIREMENTS_OPENGL_KHR"),
    (1000027000, "XR_TYPE_GRAPHICS_BINDING_D3D11_KHR"),
    (1000027001, "XR_TYPE_SWAPCHAIN_IMAGE_D3D11_KHR"),
    (1000027002, "XR_TYPE_GRAPHICS_REQUIREMENTS_D3D11_KHR"),
    (1000028000, "XR_TYPE_GRAPHICS_BINDING_D3D12_KHR"),
    (1000028001, "XR_TYPE_SWAPCHAIN_IMAGE_D3D12_KHR"),
    (1000028002, "XR_TYPE_GRAPHICS_REQUIREMENTS_D3D12_KHR"),
];

pub fn structure_type_name(raw: i32) -> String {
    STRUCTURE_TYPES
        .iter()
        .find(|(value, _)| *value == raw)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("XR_UNKNOWN_STRUCTURE_TYPE_{raw}"))
}
