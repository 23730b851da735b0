//! Runtime configuration.
//!
//! Values come from built-in defaults, then an optional JSON file named by `WXR_CONFIG`,
//! then individual `WXR_*` environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_PATH_ENV: &str = "WXR_CONFIG";

pub const DEFAULT_POSE_PORT: u16 = 7872;
pub const DEFAULT_CONTROL_PORT: u16 = 7278;
pub const DEFAULT_FRAME_RATE: f64 = 90.0;
pub const DEFAULT_FOV_DEGREES: u32 = 90;

/// Which eyes are drawn into the preview surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Both,
    LeftOnly,
    RightOnly,
}

/// How the two eyes share the preview surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayLayout {
    #[default]
    SideBySide,
    OverUnder,
    /// Red from the left eye, green and blue from the right eye.
    Anaglyph,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub preview_width: u32,
    pub preview_height: u32,
    pub view_mode: ViewMode,
    pub display_layout: DisplayLayout,
    /// Symmetric field of view reported by `xrLocateViews`.
    pub fov_degrees: u32,
    /// Ignore submitted sub-rectangles and always show the full image.
    pub show_full_render: bool,
    pub frame_rate: f64,
    pub pose_port: u16,
    pub control_port: u16,
    /// `None` blocks the frame loop until the first tracking packet arrives.
    pub pose_wait_timeout_ms: Option<u64>,
    pub hmd_make: String,
    pub hmd_model: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            preview_width: 1920,
            preview_height: 540,
            view_mode: ViewMode::Both,
            display_layout: DisplayLayout::SideBySide,
            fov_degrees: DEFAULT_FOV_DEGREES,
            show_full_render: false,
            frame_rate: DEFAULT_FRAME_RATE,
            pose_port: DEFAULT_POSE_PORT,
            control_port: DEFAULT_CONTROL_PORT,
            pose_wait_timeout_ms: None,
            hmd_make: "META".to_string(),
            hmd_model: "QUEST 3".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON text. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(Error::config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Load from `WXR_CONFIG` (if set) and apply `WXR_*` overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.preview_width = env_u32("WXR_PREVIEW_WIDTH", self.preview_width);
        self.preview_height = env_u32("WXR_PREVIEW_HEIGHT", self.preview_height);
        self.fov_degrees = env_u32("WXR_FOV_DEGREES", self.fov_degrees);
        self.show_full_render = env_bool("WXR_SHOW_FULL_RENDER", self.show_full_render);
        self.pose_port = env_u16("WXR_POSE_PORT", self.pose_port);
        self.control_port = env_u16("WXR_CONTROL_PORT", self.control_port);
        if let Some(ms) = std::env::var("WXR_POSE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.pose_wait_timeout_ms = if ms == 0 { None } else { Some(ms) };
        }
        if let Ok(value) = std::env::var("WXR_VIEW_MODE") {
            if let Ok(mode) = serde_json::from_value(serde_json::Value::String(value)) {
                self.view_mode = mode;
            }
        }
        if let Ok(value) = std::env::var("WXR_DISPLAY_LAYOUT") {
            if let Ok(layout) = serde_json::from_value(serde_json::Value::String(value)) {
                self.display_layout = layout;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.preview_width == 0 || self.preview_height == 0 {
            return Err(Error::config("preview size must be non-zero"));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(Error::config(format!(
                "frame rate must be positive, got {}",
                self.frame_rate
            )));
        }
        Ok(())
    }

    /// Field of view in degrees, falling back to 90 when out of range.
    pub fn effective_fov_degrees(&self) -> u32 {
        if self.fov_degrees == 0 || self.fov_degrees >= 180 {
            DEFAULT_FOV_DEGREES
        } else {
            self.fov_degrees
        }
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate)
    }

    pub fn pose_wait_timeout(&self) -> Option<Duration> {
        self.pose_wait_timeout_ms.map(Duration::from_millis)
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u16(name: &str, default: u16) -> u16 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u16>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_preview() {
        let config = RuntimeConfig::default();
        assert_eq!((config.preview_width, config.preview_height), (1920, 540));
        assert_eq!(config.view_mode, ViewMode::Both);
        assert_eq!(config.display_layout, DisplayLayout::SideBySide);
        assert_eq!(config.pose_port, 7872);
        assert_eq!(config.control_port, 7278);
        assert!(config.pose_wait_timeout().is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            RuntimeConfig::from_json(r#"{"display_layout":"anaglyph","fov_degrees":100}"#).unwrap();
        assert_eq!(config.display_layout, DisplayLayout::Anaglyph);
        assert_eq!(config.fov_degrees, 100);
        assert_eq!(config.preview_width, 1920);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = RuntimeConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = RuntimeConfig::from_file("/nonexistent/wxr/config.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_preview_rejected() {
        let err = RuntimeConfig::from_json(r#"{"preview_width":0}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_fov_fallback() {
        let mut config = RuntimeConfig::default();
        config.fov_degrees = 0;
        assert_eq!(config.effective_fov_degrees(), 90);
        config.fov_degrees = 180;
        assert_eq!(config.effective_fov_degrees(), 90);
        config.fov_degrees = 179;
        assert_eq!(config.effective_fov_degrees(), 179);
        config.fov_degrees = 110;
        assert_eq!(config.effective_fov_degrees(), 110);
    }

    #[test]
    fn test_frame_period() {
        let config = RuntimeConfig::default();
        let period = config.frame_period();
        assert!((period.as_secs_f64() - 1.0 / 90.0).abs() < 1e-9);
    }
}
