//! Runtime errors and their OpenXR result codes.

use thiserror::Error;

/// Result codes returned across the loader boundary.
///
/// Discriminants are the raw `XrResult` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum XrCode {
    Success = 0,
    TimeoutExpired = 1,
    SessionLossPending = 3,
    EventUnavailable = 4,
    SpaceBoundsUnavailable = 7,
    SessionNotFocused = 8,
    FrameDiscarded = 9,
    ValidationFailure = -1,
    RuntimeFailure = -2,
    OutOfMemory = -3,
    ApiVersionUnsupported = -4,
    InitializationFailed = -6,
    FunctionUnsupported = -7,
    FeatureUnsupported = -8,
    ExtensionNotPresent = -9,
    LimitReached = -10,
    SizeInsufficient = -11,
    HandleInvalid = -12,
    InstanceLost = -13,
    SessionRunning = -14,
    SessionNotRunning = -16,
    SessionLost = -17,
    SystemInvalid = -18,
    PathInvalid = -19,
    PathCountExceeded = -20,
    PathFormatInvalid = -21,
    PathUnsupported = -22,
    LayerInvalid = -23,
    LayerLimitExceeded = -24,
    SwapchainRectInvalid = -25,
    SwapchainFormatUnsupported = -26,
    ActionTypeMismatch = -27,
    SessionNotReady = -28,
    SessionNotStopping = -29,
    TimeInvalid = -30,
    ReferenceSpaceUnsupported = -31,
    FileAccessError = -32,
    FileContentsInvalid = -33,
    FormFactorUnsupported = -34,
    FormFactorUnavailable = -35,
    ApiLayerNotPresent = -36,
    CallOrderInvalid = -37,
    GraphicsDeviceInvalid = -38,
    PoseInvalid = -39,
    IndexOutOfRange = -40,
    ViewConfigurationTypeUnsupported = -41,
    EnvironmentBlendModeUnsupported = -42,
    NameDuplicated = -44,
    NameInvalid = -45,
    ActionsetNotAttached = -46,
    ActionsetsAlreadyAttached = -47,
    LocalizedNameDuplicated = -48,
    LocalizedNameInvalid = -49,
    GraphicsRequirementsCallMissing = -50,
    RuntimeUnavailable = -51,
}

const ALL_CODES: &[XrCode] = &[
    XrCode::Success,
    XrCode::TimeoutExpired,
    XrCode::SessionLossPending,
    XrCode::EventUnavailable,
    XrCode::SpaceBoundsUnavailable,
    XrCode::SessionNotFocused,
    XrCode::FrameDiscarded,
    XrCode::ValidationFailure,
    XrCode::RuntimeFailure,
    XrCode::OutOfMemory,
    XrCode::ApiVersionUnsupported,
    XrCode::InitializationFailed,
    XrCode::FunctionUnsupported,
    XrCode::FeatureUnsupported,
    XrCode::ExtensionNotPresent,
    XrCode::LimitReached,
    XrCode::SizeInsufficient,
    XrCode::HandleInvalid,
    XrCode::InstanceLost,
    XrCode::SessionRunning,
    XrCode::SessionNotRunning,
    XrCode::SessionLost,
    XrCode::SystemInvalid,
    XrCode::PathInvalid,
    XrCode::PathCountExceeded,
    XrCode::PathFormatInvalid,
    XrCode::PathUnsupported,
    XrCode::LayerInvalid,
    XrCode::LayerLimitExceeded,
    XrCode::SwapchainRectInvalid,
    XrCode::SwapchainFormatUnsupported,
    XrCode::ActionTypeMismatch,
    XrCode::SessionNotReady,
    XrCode::SessionNotStopping,
    XrCode::TimeInvalid,
    XrCode::ReferenceSpaceUnsupported,
    XrCode::FileAccessError,
    XrCode::FileContentsInvalid,
    XrCode::FormFactorUnsupported,
    XrCode::FormFactorUnavailable,
    XrCode::ApiLayerNotPresent,
    XrCode::CallOrderInvalid,
    XrCode::GraphicsDeviceInvalid,
    XrCode::PoseInvalid,
    XrCode::IndexOutOfRange,
    XrCode::ViewConfigurationTypeUnsupported,
    XrCode::EnvironmentBlendModeUnsupported,
    XrCode::NameDuplicated,
    XrCode::NameInvalid,
    XrCode::ActionsetNotAttached,
    XrCode::ActionsetsAlreadyAttached,
    XrCode::LocalizedNameDuplicated,
    XrCode::LocalizedNameInvalid,
    XrCode::GraphicsRequirementsCallMissing,
    XrCode::RuntimeUnavailable,
];

impl XrCode {
    pub fn raw(self) -> i32 {
        self as i32
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        ALL_CODES.iter().copied().find(|code| code.raw() == raw)
    }

    pub fn is_success(self) -> bool {
        self.raw() >= 0
    }

    /// Symbolic name as spelled in the OpenXR headers.
    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "XR_SUCCESS",
            Self::TimeoutExpired => "XR_TIMEOUT_EXPIRED",
            Self::SessionLossPending => "XR_SESSION_LOSS_PENDING",
            Self::EventUnavailable => "XR_EVENT_UNAVAILABLE",
            Self::SpaceBoundsUnavailable => "XR_SPACE_BOUNDS_UNAVAILABLE",
            Self::SessionNotFocused => "XR_SESSION_NOT_FOCUSED",
            Self::FrameDiscarded => "XR_FRAME_DISCARDED",
            Self::ValidationFailure => "XR_ERROR_VALIDATION_FAILURE",
            Self::RuntimeFailure => "XR_ERROR_RUNTIME_FAILURE",
            Self::OutOfMemory => "XR_ERROR_OUT_OF_MEMORY",
            Self::ApiVersionUnsupported => "XR_ERROR_API_VERSION_UNSUPPORTED",
            Self::InitializationFailed => "XR_ERROR_INITIALIZATION_FAILED",
            Self::FunctionUnsupported => "XR_ERROR_FUNCTION_UNSUPPORTED",
            Self::FeatureUnsupported => "XR_ERROR_FEATURE_UNSUPPORTED",
            Self::ExtensionNotPresent => "XR_ERROR_EXTENSION_NOT_PRESENT",
            Self::LimitReached => "XR_ERROR_LIMIT_REACHED",
            Self::SizeInsufficient => "XR_ERROR_SIZE_INSUFFICIENT",
            Self::HandleInvalid => "XR_ERROR_HANDLE_INVALID",
            Self::InstanceLost => "XR_ERROR_INSTANCE_LOST",
            Self::SessionRunning => "XR_ERROR_SESSION_RUNNING",
            Self::SessionNotRunning => "XR_ERROR_SESSION_NOT_RUNNING",
            Self::SessionLost => "XR_ERROR_SESSION_LOST",
            Self::SystemInvalid => "XR_ERROR_SYSTEM_INVALID",
            Self::PathInvalid => "XR_ERROR_PATH_INVALID",
            Self::PathCountExceeded => "XR_ERROR_PATH_COUNT_EXCEEDED",
            Self::PathFormatInvalid => "XR_ERROR_PATH_FORMAT_INVALID",
            Self::PathUnsupported => "XR_ERROR_PATH_UNSUPPORTED",
            Self::LayerInvalid => "XR_ERROR_LAYER_INVALID",
            Self::LayerLimitExceeded => "XR_ERROR_LAYER_LIMIT_EXCEEDED",
            Self::SwapchainRectInvalid => "XR_ERROR_SWAPCHAIN_RECT_INVALID",
            Self::SwapchainFormatUnsupported => "XR_ERROR_SWAPCHAIN_FORMAT_UNSUPPORTED",
            Self::ActionTypeMismatch => "XR_ERROR_ACTION_TYPE_MISMATCH",
            Self::SessionNotReady => "XR_ERROR_SESSION_NOT_READY",
            Self::SessionNotStopping => "XR_ERROR_SESSION_NOT_STOPPING",
            Self::TimeInvalid => "XR_ERROR_TIME_INVALID",
            Self::ReferenceSpaceUnsupported => "XR_ERROR_REFERENCE_SPACE_UNSUPPORTED",
            Self::FileAccessError => "XR_ERROR_FILE_ACCESS_ERROR",
            Self::FileContentsInvalid => "XR_ERROR_FILE_CONTENTS_INVALID",
            Self::FormFactorUnsupported => "XR_ERROR_FORM_FACTOR_UNSUPPORTED",
            Self::FormFactorUnavailable => "XR_ERROR_FORM_FACTOR_UNAVAILABLE",
            Self::ApiLayerNotPresent => "XR_ERROR_API_LAYER_NOT_PRESENT",
            Self::CallOrderInvalid => "XR_ERROR_CALL_ORDER_INVALID",
            Self::GraphicsDeviceInvalid => "XR_ERROR_GRAPHICS_DEVICE_INVALID",
            Self::PoseInvalid => "XR_ERROR_POSE_INVALID",
            Self::IndexOutOfRange => "XR_ERROR_INDEX_OUT_OF_RANGE",
            Self::ViewConfigurationTypeUnsupported => {
                "XR_ERROR_VIEW_CONFIGURATION_TYPE_UNSUPPORTED"
            }
            Self::EnvironmentBlendModeUnsupported => "XR_ERROR_ENVIRONMENT_BLEND_MODE_UNSUPPORTED",
            Self::NameDuplicated => "XR_ERROR_NAME_DUPLICATED",
            Self::NameInvalid => "XR_ERROR_NAME_INVALID",
            Self::ActionsetNotAttached => "XR_ERROR_ACTIONSET_NOT_ATTACHED",
            Self::ActionsetsAlreadyAttached => "XR_ERROR_ACTIONSETS_ALREADY_ATTACHED",
            Self::LocalizedNameDuplicated => "XR_ERROR_LOCALIZED_NAME_DUPLICATED",
            Self::LocalizedNameInvalid => "XR_ERROR_LOCALIZED_NAME_INVALID",
            Self::GraphicsRequirementsCallMissing => "XR_ERROR_GRAPHICS_REQUIREMENTS_CALL_MISSING",
            Self::RuntimeUnavailable => "XR_ERROR_RUNTIME_UNAVAILABLE",
        }
    }
}

/// Symbolic name for any raw result value, including ones this runtime never returns.
pub fn result_name(raw: i32) -> String {
    match XrCode::from_raw(raw) {
        Some(code) => code.name().to_string(),
        None => format!("XR_UNKNOWN_RESULT_{raw}"),
    }
}

/// Failure of a runtime operation.
#[derive(Debug, Error)]
pub enum XrError {
    /// Null or malformed argument
    #[error("validation failure: {0}")]
    Validation(String),

    /// Unknown or stale handle
    #[error("invalid handle: {0}")]
    HandleInvalid(String),

    #[error("extension not present: {0}")]
    ExtensionNotPresent(String),

    #[error("api layer not present: {0}")]
    ApiLayerNotPresent(String),

    #[error("form factor {0} unsupported")]
    FormFactorUnsupported(i32),

    #[error("system id {0} invalid")]
    SystemInvalid(u64),

    #[error("view configuration type {0} unsupported")]
    ViewConfigurationUnsupported(i32),

    /// Missing or unrecognized graphics binding
    #[error("graphics device invalid: {0}")]
    GraphicsDeviceInvalid(String),

    #[error("swapchain format {0} unsupported")]
    SwapchainFormatUnsupported(i64),

    #[error("path {0:#x} invalid")]
    PathInvalid(u64),

    #[error("reference space type {0} unsupported")]
    ReferenceSpaceUnsupported(i32),

    #[error("function {0} unsupported")]
    FunctionUnsupported(String),

    /// Loader and runtime could not agree on an interface or API version
    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    /// Backend allocation or submission failure
    #[error("runtime failure: {0}")]
    Runtime(String),

    #[error(transparent)]
    Common(#[from] wxr_common::Error),
}

impl XrError {
    pub fn validation(msg: impl std::fmt::Display) -> Self {
        Self::Validation(msg.to_string())
    }

    pub fn handle(msg: impl std::fmt::Display) -> Self {
        Self::HandleInvalid(msg.to_string())
    }

    pub fn runtime(msg: impl std::fmt::Display) -> Self {
        Self::Runtime(msg.to_string())
    }

    pub fn graphics(msg: impl std::fmt::Display) -> Self {
        Self::GraphicsDeviceInvalid(msg.to_string())
    }

    pub fn code(&self) -> XrCode {
        match self {
            Self::Validation(_) => XrCode::ValidationFailure,
            Self::HandleInvalid(_) => XrCode::HandleInvalid,
            Self::ExtensionNotPresent(_) => XrCode::ExtensionNotPresent,
            Self::ApiLayerNotPresent(_) => XrCode::ApiLayerNotPresent,
            Self::FormFactorUnsupported(_) => XrCode::FormFactorUnsupported,
            Self::SystemInvalid(_) => XrCode::SystemInvalid,
            Self::ViewConfigurationUnsupported(_) => XrCode::ViewConfigurationTypeUnsupported,
            Self::GraphicsDeviceInvalid(_) => XrCode::GraphicsDeviceInvalid,
            Self::SwapchainFormatUnsupported(_) => XrCode::SwapchainFormatUnsupported,
            Self::PathInvalid(_) => XrCode::PathInvalid,
            Self::ReferenceSpaceUnsupported(_) => XrCode::ReferenceSpaceUnsupported,
            Self::FunctionUnsupported(_) => XrCode::FunctionUnsupported,
            Self::InitializationFailed(_) => XrCode::InitializationFailed,
            Self::Runtime(_) | Self::Common(_) => XrCode::RuntimeFailure,
        }
    }
}

pub type XrResult<T> = Result<T, XrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_round_trip_for_known_codes() {
        for code in ALL_CODES {
            assert_eq!(XrCode::from_raw(code.raw()), Some(*code));
        }
    }

    #[test]
    fn test_result_names() {
        assert_eq!(result_name(0), "XR_SUCCESS");
        assert_eq!(result_name(4), "XR_EVENT_UNAVAILABLE");
        assert_eq!(result_name(-38), "XR_ERROR_GRAPHICS_DEVICE_INVALID");
        assert_eq!(result_name(-999), "XR_UNKNOWN_RESULT_-999");
        assert_eq!(result_name(77), "XR_UNKNOWN_RESULT_77");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(XrError::validation("x").code(), XrCode::ValidationFailure);
        assert_eq!(
            XrError::ExtensionNotPresent("XR_FB_nope".into()).code(),
            XrCode::ExtensionNotPresent
        );
        assert_eq!(
            XrError::Common(wxr_common::Error::config("bad")).code(),
            XrCode::RuntimeFailure
        );
        assert!(!XrCode::HandleInvalid.is_success());
        assert!(XrCode::EventUnavailable.is_success());
    }
}
