//! Capture configuration.
//!
//! Deserializable from a TOML fragment, with per-field defaults so a minimal
//! config only names what it changes:
//!
//! ```toml
//! width = 1280
//! height = 720
//! pixel_format = "nv12"
//! vsync_active_high = false
//! ```

use serde::Deserialize;
use vcap_core::format::{ImageFormat, PixelFormat};
use vcap_core::{CaptureError, Result};

/// Configuration for a capture engine instance.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Frame width in pixels (default: 1920).
    #[serde(default = "default_width")]
    pub width: u32,

    /// Frame height in pixels (default: 1080).
    #[serde(default = "default_height")]
    pub height: u32,

    /// Pixel layout (default: `nv12`).
    #[serde(default = "default_pixel_format")]
    pub pixel_format: PixelFormat,

    /// Horizontal sync is active-high on the bus (default: true).
    #[serde(default = "default_true")]
    pub hsync_active_high: bool,

    /// Vertical sync is active-high on the bus (default: true).
    #[serde(default = "default_true")]
    pub vsync_active_high: bool,

    /// Pixel clock samples on the rising edge (default: true).
    #[serde(default = "default_true")]
    pub pclk_active_high: bool,
}

fn default_width() -> u32 {
    1920
}
fn default_height() -> u32 {
    1080
}
fn default_pixel_format() -> PixelFormat {
    PixelFormat::Nv12
}
fn default_true() -> bool {
    true
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            pixel_format: default_pixel_format(),
            hsync_active_high: true,
            vsync_active_high: true,
            pclk_active_high: true,
        }
    }
}

impl CaptureConfig {
    /// Parse and validate a configuration from a TOML value.
    pub fn from_toml(value: toml::Value) -> Result<Self> {
        let config: Self = value
            .try_into()
            .map_err(|e: toml::de::Error| CaptureError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic validation beyond what parsing catches.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::InvalidConfig(
                "resolution must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// The image format this configuration requests.
    #[must_use]
    pub fn image_format(&self) -> ImageFormat {
        ImageFormat {
            width: self.width,
            height: self.height,
            pixel_format: self.pixel_format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.width, 1920);
        assert_eq!(config.height, 1080);
        assert_eq!(config.pixel_format, PixelFormat::Nv12);
        assert!(config.hsync_active_high);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let value: toml::Value = toml::from_str(
            r#"
            width = 640
            height = 480
            pixel_format = "yuyv"
            "#,
        )
        .unwrap();

        let config = CaptureConfig::from_toml(value).unwrap();
        assert_eq!(config.width, 640);
        assert_eq!(config.pixel_format, PixelFormat::Yuyv);
        // Unnamed fields keep their defaults.
        assert!(config.pclk_active_high);
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let value: toml::Value = toml::from_str("width = 0").unwrap();
        let err = CaptureConfig::from_toml(value).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_pixel_format_rejected() {
        let value: toml::Value = toml::from_str(r#"pixel_format = "bayer12""#).unwrap();
        assert!(CaptureConfig::from_toml(value).is_err());
    }
}
