//! Configuration management for vat-annotator
//!
//! Optional settings beyond the four required command-line options live in a
//! TOML file. Command-line flags take precedence over file values.
//!
//! # Configuration File Location
//!
//! - Linux: `~/.config/vat/annotator.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use vat_transport::{SessionOptions, DEFAULT_PORT, DIRECTION_ID, IMAGE_READING_ID};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Annotator configuration
///
/// # Example TOML
///
/// ```toml
/// [logging]
/// level = "warn"
///
/// [session]
/// port = 12175
/// frame_type_id = 1055
/// annotation_type_id = 1037
/// sender_stamp = 0
///
/// [pipeline]
/// wait_slice_ms = 250
/// echo = true
///
/// [viewer]
/// queue_depth = 2
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub viewer: ViewerConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Message session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Data type whose envelopes carry frame sample times
    #[serde(default = "default_frame_type_id")]
    pub frame_type_id: i32,

    /// Data type annotations are published as
    #[serde(default = "default_annotation_type_id")]
    pub annotation_type_id: i32,

    #[serde(default)]
    pub sender_stamp: u32,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_frame_type_id() -> i32 {
    IMAGE_READING_ID
}

fn default_annotation_type_id() -> i32 {
    DIRECTION_ID
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            frame_type_id: default_frame_type_id(),
            annotation_type_id: default_annotation_type_id(),
            sender_stamp: 0,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Longest single wait for a frame before rechecking the session
    #[serde(default = "default_wait_slice_ms")]
    pub wait_slice_ms: u64,

    /// Print each emitted coordinate to stdout
    #[serde(default = "default_echo")]
    pub echo: bool,
}

fn default_wait_slice_ms() -> u64 {
    250
}

fn default_echo() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            wait_slice_ms: default_wait_slice_ms(),
            echo: default_echo(),
        }
    }
}

/// Viewer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    /// Undisplayed frames held before new ones are dropped
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

fn default_queue_depth() -> usize {
    2
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            queue_depth: default_queue_depth(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location, or defaults if absent
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from custom path or default
    pub fn load_from(custom_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = custom_path {
            Self::load(path)
        } else {
            Self::load_default()
        }
    }

    /// Get default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "vat")
            .map(|dirs| dirs.config_dir().join("annotator.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level '{}'. Valid values: {:?}",
                self.logging.level, valid_levels
            )));
        }

        if self.session.port == 0 {
            return Err(ConfigError::ValidationError(
                "port must be greater than 0".to_string(),
            ));
        }

        if self.session.frame_type_id <= 0 || self.session.annotation_type_id <= 0 {
            return Err(ConfigError::ValidationError(
                "data type ids must be positive".to_string(),
            ));
        }

        if self.session.frame_type_id == self.session.annotation_type_id {
            return Err(ConfigError::ValidationError(format!(
                "frame_type_id and annotation_type_id must differ (both {})",
                self.session.frame_type_id
            )));
        }

        if !(1..=10_000).contains(&self.pipeline.wait_slice_ms) {
            return Err(ConfigError::ValidationError(format!(
                "wait_slice_ms must be within 1..=10000, got {}",
                self.pipeline.wait_slice_ms
            )));
        }

        if self.viewer.queue_depth == 0 {
            return Err(ConfigError::ValidationError(
                "queue_depth must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn wait_slice(&self) -> Duration {
        Duration::from_millis(self.pipeline.wait_slice_ms)
    }

    /// Session options for this configuration
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            port: self.session.port,
            frame_type_id: self.session.frame_type_id,
            annotation_type_id: self.session.annotation_type_id,
            sender_stamp: self.session.sender_stamp,
            watch_ctrl_c: true,
        }
    }
}

/// CLI configuration overrides
///
/// Command-line arguments take precedence over config file values.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub verbose: Option<bool>,
    pub debug: Option<bool>,
    pub port: Option<u16>,
    pub echo: Option<bool>,
}

impl Config {
    /// Apply CLI overrides to configuration
    pub fn with_overrides(mut self, overrides: &CliOverrides) -> Self {
        if overrides.verbose == Some(true) {
            self.logging.level = "info".to_string();
        }
        if overrides.debug == Some(true) {
            self.logging.level = "debug".to_string();
        }
        if let Some(port) = overrides.port {
            self.session.port = port;
        }
        if let Some(echo) = overrides.echo {
            self.pipeline.echo = echo;
        }
        self
    }
}
