use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_device_index")]
    pub device_index: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Per-channel base threshold; a pixel counts as changed when the
    /// summed RGB delta exceeds 3x this value.
    #[serde(default = "default_pixel_threshold")]
    pub pixel_threshold: u32,
    /// Changed-pixel count above which the frame is flagged as motion.
    #[serde(default = "default_min_area")]
    pub min_area: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_alert_frequency")]
    pub frequency_hz: f32,
    #[serde(default = "default_alert_duration")]
    pub duration_ms: u64,
    /// Playback volume, 0-100.
    #[serde(default = "default_alert_volume")]
    pub volume: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    /// Cosmetic fixed label; nothing is measured.
    #[serde(default = "default_network_rate_label")]
    pub network_rate_label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_index: default_device_index(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            pixel_threshold: default_pixel_threshold(),
            min_area: default_min_area(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_alert_frequency(),
            duration_ms: default_alert_duration(),
            volume: default_alert_volume(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_secs: default_refresh_secs(),
            network_rate_label: default_network_rate_label(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Like `load`, but a missing file yields the built-in defaults.
    /// Every field is a self-sufficient tuning constant, so camwatch runs
    /// fine without a config file; a malformed one is still fatal.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// Default value functions
fn default_device_index() -> u32 {
    0
}
fn default_width() -> u32 {
    720
}
fn default_height() -> u32 {
    480
}
fn default_fps() -> u32 {
    30
}
fn default_pixel_threshold() -> u32 {
    28
}
fn default_min_area() -> u32 {
    600
}
fn default_alert_frequency() -> f32 {
    880.0
}
fn default_alert_duration() -> u64 {
    300
}
fn default_alert_volume() -> u8 {
    80
}
fn default_refresh_secs() -> u64 {
    1
}
fn default_network_rate_label() -> String {
    "1.2 Mbps".into()
}
fn default_log_level() -> String {
    "info".into()
}
