//! Configuration management for traylink

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Tray appearance
    #[serde(default)]
    pub tray: TrayConfig,

    /// Desktop notification transport
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Path to config file (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrayConfig {
    /// Identifier registered with the desktop shell
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// Text shown next to the icon (macOS, Linux)
    #[serde(default = "default_title")]
    pub title: String,

    /// Text shown when hovering the icon
    #[serde(default)]
    pub tooltip: String,

    /// Icon file (.ico on Windows, .ico/.jpg/.png elsewhere)
    #[serde(default)]
    pub icon_path: Option<PathBuf>,

    /// Monochrome icon used on macOS; other platforms use `icon_path`
    #[serde(default)]
    pub template_icon_path: Option<PathBuf>,

    /// Whether the user may drag the icon out of the menu bar (macOS only)
    #[serde(default)]
    pub removal_allowed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationBackend {
    /// osascript on macOS, session bus on Linux
    #[default]
    Auto,
    Osascript,
    Dbus,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub backend: NotificationBackend,

    /// Expiry passed to the notification server (-1 lets the server decide)
    #[serde(default = "default_expire_timeout")]
    pub expire_timeout_ms: i32,

    /// Bus address to use instead of the session bus
    #[serde(default)]
    pub bus_address: Option<String>,
}

// Default value functions
fn default_app_id() -> String {
    "traylink".to_string()
}

fn default_title() -> String {
    "traylink".to_string()
}

fn default_true() -> bool {
    true
}

fn default_expire_timeout() -> i32 {
    crate::ui::DEFAULT_EXPIRE_TIMEOUT_MS
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            title: default_title(),
            tooltip: String::new(),
            icon_path: None,
            template_icon_path: None,
            removal_allowed: false,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: NotificationBackend::Auto,
            expire_timeout_ms: default_expire_timeout(),
            bus_address: None,
        }
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file, writing defaults if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let mut config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

            config.config_path = Some(config_path.to_path_buf());
            Ok(config)
        } else {
            let config = Config {
                config_path: Some(config_path.to_path_buf()),
                ..Config::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the config file path
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_config_path(),
        }
    }

    /// Get default config path
    fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("dev", "traylink", "traylink")
            .context("Failed to determine config directory")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}
