//! Scanner configuration.
//!
//! Every section has working defaults, so an empty TOML file (or no file
//! at all) yields the stock 1280×720 rear-camera setup with a 120 ms
//! polling cadence and two-read confirmation.

use crate::conditioning::CropRegion;
use crate::decode::DecoderPreference;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Camera acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Preferred frame width in pixels.
    pub ideal_width: u32,
    /// Preferred frame height in pixels.
    pub ideal_height: u32,
    /// Zoom factor applied after acquisition, clamped to the device range.
    pub preferred_zoom: f64,
    /// Case-insensitive label fragments that identify a rear camera.
    pub label_keywords: Vec<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            preferred_zoom: 1.2,
            label_keywords: vec!["back".to_owned(), "rear".to_owned(), "environment".to_owned()],
        }
    }
}

/// Frame conditioning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditioningConfig {
    /// Region of the frame searched for a barcode.
    pub crop: CropRegion,
    /// Luma strictly above this value becomes white.
    pub luma_threshold: u8,
}

impl Default for ConditioningConfig {
    fn default() -> Self {
        Self {
            crop: CropRegion::default(),
            luma_threshold: 160,
        }
    }
}

/// Scan loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Delay between decode attempts in milliseconds.
    pub poll_interval_ms: u64,
    /// Identical consecutive reads needed to confirm a value.
    pub required_matches: u32,
    /// Stop after this many decode attempts. `None` scans until cancelled.
    pub max_attempts: Option<u64>,
    /// Which decoder variant to use.
    pub decoder: DecoderPreference,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 120,
            required_matches: 2,
            max_attempts: None,
            decoder: DecoderPreference::Auto,
        }
    }
}

impl SessionConfig {
    /// Returns the inter-attempt delay.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
    /// Print detections as JSON instead of plain text.
    pub json: bool,
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub conditioning: ConditioningConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid zoom factor {0}")]
    InvalidZoom(f64),
    #[error("crop region must lie within the frame and be non-empty")]
    InvalidCrop,
    #[error("poll interval must be greater than zero")]
    InvalidInterval,
    #[error("required matches must be at least 1")]
    InvalidMatchCount,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

impl ScanConfig {
    /// Validates all sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.ideal_width == 0 || self.camera.ideal_height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if !(self.camera.preferred_zoom.is_finite() && self.camera.preferred_zoom > 0.0) {
            return Err(ConfigError::InvalidZoom(self.camera.preferred_zoom));
        }
        if !self.conditioning.crop.is_valid() {
            return Err(ConfigError::InvalidCrop);
        }
        if self.session.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if self.session.required_matches == 0 {
            return Err(ConfigError::InvalidMatchCount);
        }
        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ScanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.poll_interval(), Duration::from_millis(120));
        assert_eq!(config.session.required_matches, 2);
        assert_eq!(config.conditioning.luma_threshold, 160);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ScanConfig::from_toml("").unwrap();
        assert_eq!(config.camera.ideal_width, 1280);
        assert_eq!(config.camera.ideal_height, 720);
        assert!(config.session.max_attempts.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = ScanConfig::from_toml(
            r#"
            [session]
            poll_interval_ms = 250
            max_attempts = 40
            decoder = "software"

            [conditioning.crop]
            top_pct = 40
            "#,
        )
        .unwrap();

        assert_eq!(config.session.poll_interval_ms, 250);
        assert_eq!(config.session.max_attempts, Some(40));
        assert_eq!(config.session.decoder, DecoderPreference::Software);
        assert_eq!(config.session.required_matches, 2);
        assert_eq!(config.conditioning.crop.top_pct, 40);
        assert_eq!(config.conditioning.crop.left_pct, 10);
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = ScanConfig::default();
        config.camera.ideal_width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_zero_interval_invalid() {
        assert!(matches!(
            ScanConfig::from_toml("[session]\npoll_interval_ms = 0\n"),
            Err(ConfigError::InvalidInterval)
        ));
    }

    #[test]
    fn test_crop_outside_frame_invalid() {
        assert!(matches!(
            ScanConfig::from_toml("[conditioning.crop]\nleft_pct = 50\nwidth_pct = 60\n"),
            Err(ConfigError::InvalidCrop)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            ScanConfig::from_toml("[session\n"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
