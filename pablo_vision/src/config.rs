//! Configuration for pablo_vision

use crate::core_modules::blob_detector::blob_detector::DEFAULT_STACK_CAPACITY;
use crate::core_modules::classifier::ColorRange;
use crate::error::VisionError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pixel formats the pipeline can classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PixelFormat {
    /// 5/6/5 bits, big-endian.
    #[default]
    Rgb565,
}

/// Sensor frame sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FrameSize {
    /// 160x120
    #[default]
    Qqvga,
    /// 240x176
    Hqvga,
    /// 320x240
    Qvga,
    /// Any other geometry, used by replay sources.
    Custom { width: u32, height: u32 },
}

impl FrameSize {
    pub fn dimensions(&self) -> (u32, u32) {
        match *self {
            FrameSize::Qqvga => (160, 120),
            FrameSize::Hqvga => (240, 176),
            FrameSize::Qvga => (320, 240),
            FrameSize::Custom { width, height } => (width, height),
        }
    }
}

/// Camera settings applied once at initialization and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    pub pixel_format: PixelFormat,
    pub frame_size: FrameSize,
    /// External clock in Hz.
    pub xclk_freq_hz: u32,
    /// -2..=2
    pub brightness: i8,
    /// -2..=2
    pub contrast: i8,
    /// -2..=2
    pub saturation: i8,
    /// Automatic exposure control. When off, `aec_value` is used.
    pub auto_exposure: bool,
    pub aec_value: u16,
    pub aec2: bool,
    /// Automatic gain control. When off, `agc_gain` is used.
    pub auto_gain: bool,
    pub agc_gain: u8,
    pub white_balance: bool,
    pub awb_gain: bool,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::Rgb565,
            frame_size: FrameSize::Qqvga,
            xclk_freq_hz: 20_000_000,
            brightness: 0,
            contrast: 2,
            saturation: 1,
            auto_exposure: false,
            aec_value: 50,
            aec2: false,
            auto_gain: false,
            agc_gain: 0,
            white_balance: true,
            awb_gain: true,
        }
    }
}

impl SensorSettings {
    fn validate(&self) -> Result<(), String> {
        for (name, level) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
        ] {
            if !(-2..=2).contains(&level) {
                return Err(format!("Sensor {name} must be between -2 and 2"));
            }
        }
        if self.aec_value > 1200 {
            return Err("AEC value must be at most 1200".to_string());
        }
        if self.agc_gain > 30 {
            return Err("AGC gain must be at most 30".to_string());
        }
        if self.xclk_freq_hz == 0 {
            return Err("XCLK frequency must be non-zero".to_string());
        }
        Ok(())
    }
}

/// Perception core configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub image_width: u32,
    pub image_height: u32,
    /// Components smaller than this are never reported.
    pub min_blob_area: u32,
    /// Minimum centroid distance between two accepted secondary targets.
    pub min_separation: u32,
    /// Radius of the square closing element (1 means 3x3).
    pub close_radius: usize,
    pub flood_stack_capacity: usize,
    /// Secondary candidates ranked before deduplication.
    pub raw_secondary_candidates: usize,
    pub primary_range: ColorRange,
    pub secondary_range: ColorRange,
    pub sensor: SensorSettings,
    /// Ceiling for per-frame working buffers, in bytes. `None` means unbounded.
    pub memory_budget: Option<usize>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            image_width: 160,
            image_height: 120,
            min_blob_area: 4,
            min_separation: 20,
            close_radius: 1,
            flood_stack_capacity: DEFAULT_STACK_CAPACITY,
            raw_secondary_candidates: 5,
            primary_range: ColorRange::YELLOW,
            secondary_range: ColorRange::PINK,
            sensor: SensorSettings::default(),
            memory_budget: None,
        }
    }
}

impl VisionConfig {
    /// A configuration for a non-standard frame geometry.
    pub fn with_resolution(width: u32, height: u32) -> Self {
        let frame_size = match (width, height) {
            (160, 120) => FrameSize::Qqvga,
            (240, 176) => FrameSize::Hqvga,
            (320, 240) => FrameSize::Qvga,
            _ => FrameSize::Custom { width, height },
        };
        Self {
            image_width: width,
            image_height: height,
            sensor: SensorSettings {
                frame_size,
                ..SensorSettings::default()
            },
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), VisionError> {
        self.check().map_err(VisionError::Config)
    }

    fn check(&self) -> Result<(), String> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err("Resolution must be non-zero".to_string());
        }
        if self.image_width > 2048 || self.image_height > 2048 {
            return Err("Resolution too large (max 2048 per side)".to_string());
        }
        self.image_width
            .checked_mul(self.image_height)
            .and_then(|pixels| pixels.checked_mul(2))
            .ok_or_else(|| "Resolution would cause integer overflow".to_string())?;

        if self.sensor.frame_size.dimensions() != (self.image_width, self.image_height) {
            let (w, h) = self.sensor.frame_size.dimensions();
            return Err(format!(
                "Sensor frame size {w}x{h} does not match image size {}x{}",
                self.image_width, self.image_height
            ));
        }
        if self.flood_stack_capacity == 0 {
            return Err("Flood fill stack capacity must be non-zero".to_string());
        }
        if self.raw_secondary_candidates == 0 {
            return Err("Raw secondary candidate count must be non-zero".to_string());
        }
        for (name, range) in [("primary", &self.primary_range), ("secondary", &self.secondary_range)] {
            if range.s_min > range.s_max || range.v_min > range.v_max {
                return Err(format!("The {name} color range {range} has an empty S or V interval"));
            }
            if range.h_min > 179 || range.h_max > 179 {
                return Err(format!("The {name} color range {range} has a hue above 179"));
            }
        }
        self.sensor.validate()
    }

    pub fn from_json_str(json: &str) -> Result<Self, VisionError> {
        let config: VisionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, VisionError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String, VisionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = VisionConfig::default();
        assert_eq!((config.image_width, config.image_height), (160, 120));
        assert_eq!(config.min_blob_area, 4);
        assert_eq!(config.min_separation, 20);
        assert_eq!(config.close_radius, 1);
        assert_eq!(config.flood_stack_capacity, 4000);
        assert_eq!(config.raw_secondary_candidates, 5);
        assert_eq!(config.primary_range, ColorRange::YELLOW);
        assert_eq!(config.secondary_range, ColorRange::PINK);
        assert_eq!(config.sensor.xclk_freq_hz, 20_000_000);
        assert_eq!(config.sensor.contrast, 2);
        assert!(!config.sensor.auto_exposure);
        assert!(config.sensor.white_balance);
        assert!(config.memory_budget.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_resolution_zero() {
        let mut config = VisionConfig::default();
        config.image_width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_frame_size_mismatch() {
        let mut config = VisionConfig::default();
        config.image_width = 320;
        config.image_height = 240;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("does not match"));

        assert!(VisionConfig::with_resolution(320, 240).validate().is_ok());
        assert!(VisionConfig::with_resolution(40, 30).validate().is_ok());
    }

    #[test]
    fn test_config_validation_ranges() {
        let mut config = VisionConfig::default();
        config.secondary_range = ColorRange::new(145, 175, 200, 100, 0, 255);
        assert!(config.validate().is_err());

        let mut config = VisionConfig::default();
        config.primary_range = ColorRange::new(15, 200, 0, 255, 0, 255);
        assert!(config.validate().is_err());

        // Wrapping hue is fine.
        let mut config = VisionConfig::default();
        config.primary_range = ColorRange::new(170, 10, 0, 255, 0, 255);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_extractor_limits() {
        let mut config = VisionConfig::default();
        config.flood_stack_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = VisionConfig::default();
        config.raw_secondary_candidates = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_sensor() {
        let mut config = VisionConfig::default();
        config.sensor.contrast = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = VisionConfig::from_json_str(r#"{ "min_blob_area": 10 }"#).unwrap();
        assert_eq!(config.min_blob_area, 10);
        assert_eq!(config.min_separation, 20);
        assert_eq!(config.secondary_range, ColorRange::PINK);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(matches!(
            VisionConfig::from_json_str("{ not json"),
            Err(VisionError::Json(_))
        ));
        assert!(matches!(
            VisionConfig::from_json_str(r#"{ "image_width": 0 }"#),
            Err(VisionError::Config(_))
        ));
    }

    #[test]
    fn test_json_file_round_trip() {
        let mut config = VisionConfig::default();
        config.memory_budget = Some(64 * 1024);
        config.sensor.aec_value = 300;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_json().unwrap().as_bytes()).unwrap();

        let loaded = VisionConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = VisionConfig::from_json_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, VisionError::Io(_)));
    }
}
