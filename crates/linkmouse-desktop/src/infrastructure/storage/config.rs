//! TOML-based configuration for the LinkMouse desktop.
//!
//! Reads `AppConfig` from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\LinkMouse\config.toml`
//! - Linux:    `~/.config/linkmouse/config.toml`
//! - macOS:    `~/Library/Application Support/LinkMouse/config.toml`
//!
//! Example:
//!
//! ```toml
//! [viewport]
//! width = 480
//! height = 270
//! radius = 20
//!
//! [capture]
//! auto_release_on_positive_x = false
//!
//! [relay]
//! share_base_url = "https://linkmouse.app"
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "some_fn")]` and every section is
//! `#[serde(default)]`, so an empty or partial file is valid.  This keeps the
//! app working on first run and after upgrades that add new fields.

use std::path::{Path, PathBuf};

use linkmouse_core::{RenderPosition, Viewport};
use serde::Deserialize;
use thiserror::Error;

use crate::application::pointer_capture::{AutoReleasePolicy, CaptureOptions, EngineSettings};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is unusable.
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub desktop: DesktopConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DesktopConfig {
    /// Schema version string.
    #[serde(default = "default_version")]
    pub version: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Preview canvas geometry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ViewportConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Dot radius; also the wraparound margin.
    #[serde(default = "default_radius")]
    pub radius: i32,
    #[serde(default = "default_start")]
    pub start_x: i32,
    #[serde(default = "default_start")]
    pub start_y: i32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaptureConfig {
    #[serde(default = "default_true")]
    pub raw_deltas: bool,
    /// Release capture once the cumulative X report turns positive.
    #[serde(default = "default_true")]
    pub auto_release_on_positive_x: bool,
    #[serde(default = "default_frame_rate_hz")]
    pub frame_rate_hz: u32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RelayConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Prefix the link identity is appended to when sharing.
    #[serde(default = "default_share_base_url")]
    pub share_base_url: String,
    /// Outbound messages buffered before new ones are dropped.
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_width() -> u32 {
    480
}
fn default_height() -> u32 {
    270
}
fn default_radius() -> i32 {
    20
}
fn default_start() -> i32 {
    50
}
fn default_true() -> bool {
    true
}
fn default_frame_rate_hz() -> u32 {
    60
}
fn default_server_url() -> String {
    "wss://browserkvm-backend.onrender.com:443".to_string()
}
fn default_share_base_url() -> String {
    "https://linkmouse.app".to_string()
}
fn default_outbound_queue_capacity() -> usize {
    256
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            radius: default_radius(),
            start_x: default_start(),
            start_y: default_start(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            raw_deltas: default_true(),
            auto_release_on_positive_x: default_true(),
            frame_rate_hz: default_frame_rate_hz(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            share_base_url: default_share_base_url(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
        }
    }
}

impl AppConfig {
    /// Rejects values that parse but cannot drive the engine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(ConfigError::Invalid {
                field: "viewport",
                reason: "width and height must be non-zero".to_string(),
            });
        }
        if self.viewport.radius < 0 {
            return Err(ConfigError::Invalid {
                field: "viewport.radius",
                reason: format!("{} is negative", self.viewport.radius),
            });
        }
        let viewport = self.engine_settings().viewport;
        if !viewport.is_representable() {
            return Err(ConfigError::Invalid {
                field: "viewport",
                reason: format!(
                    "width/height plus radius {} must not exceed {}",
                    self.viewport.radius,
                    i32::MAX
                ),
            });
        }
        let start = RenderPosition::new(self.viewport.start_x, self.viewport.start_y);
        if !viewport.contains(start) {
            return Err(ConfigError::Invalid {
                field: "viewport.start",
                reason: format!(
                    "({}, {}) lies outside the wraparound bounds",
                    start.x, start.y
                ),
            });
        }
        if self.relay.outbound_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "relay.outbound_queue_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Engine parameters derived from the `[viewport]` and `[capture]` sections.
    pub fn engine_settings(&self) -> EngineSettings {
        let v = &self.viewport;
        EngineSettings {
            viewport: Viewport::new(v.width, v.height, v.radius),
            start: RenderPosition::new(v.start_x, v.start_y),
            options: CaptureOptions {
                raw_deltas: self.capture.raw_deltas,
            },
            policy: AutoReleasePolicy::from_flag(self.capture.auto_release_on_positive_x),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::Invalid`] if a value is unusable.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let cfg = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str::<AppConfig>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Resolves the platform config directory, including the `LinkMouse`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("LinkMouse"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("linkmouse"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("LinkMouse")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
