//! Application configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub usb: UsbSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Default log level when RUST_LOG is not set
    #[serde(default = "AppSettings::default_log_level")]
    pub log_level: String,
}

impl AppSettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsbSettings {
    /// Device filters (VID:PID format, e.g. "0x046d:*"); empty allows all
    #[serde(default)]
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Settings store location ("~" expands); defaults to the standard
    /// config directory
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSettings::default(),
            usb: UsbSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the specified path, or the default location
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => {
                let p = Self::default_path();
                if !p.exists() {
                    return Err(anyhow!("No configuration file found, using defaults"));
                }
                p
            }
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default config: {}", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("uvcview").join("config.toml")
        } else {
            PathBuf::from(".config/uvcview/config.toml")
        }
    }

    /// Resolve the settings store location
    pub fn store_path(&self) -> PathBuf {
        match &self.storage.path {
            Some(path) => PathBuf::from(shellexpand::tilde(path).as_ref()),
            None => crate::store::SettingsStore::default_path(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.app.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.app.log_level,
                valid_levels.join(", ")
            ));
        }

        for filter in &self.usb.filters {
            Self::validate_filter(filter)?;
        }

        Ok(())
    }

    /// Validate a USB device filter pattern (VID:PID)
    fn validate_filter(filter: &str) -> Result<()> {
        let Some((vid, pid)) = filter.split_once(':') else {
            return Err(anyhow!(
                "Invalid filter format '{}', expected VID:PID (e.g., '0x046d:0x0825' or '0x046d:*')",
                filter
            ));
        };

        if vid != "*" {
            Self::validate_hex_id(vid, "VID")?;
        }
        if pid != "*" {
            Self::validate_hex_id(pid, "PID")?;
        }

        Ok(())
    }

    /// Validate a hex ID (VID or PID)
    fn validate_hex_id(id: &str, name: &str) -> Result<()> {
        if !id.starts_with("0x") && !id.starts_with("0X") {
            return Err(anyhow!(
                "Invalid {} '{}', must start with '0x' (e.g., '0x046d')",
                name,
                id
            ));
        }

        let hex_part = &id[2..];
        if hex_part.is_empty() || hex_part.len() > 4 {
            return Err(anyhow!(
                "Invalid {} '{}', hex part must be 1-4 digits",
                name,
                id
            ));
        }

        u16::from_str_radix(hex_part, 16)
            .map_err(|_| anyhow!("Invalid {} '{}', not a valid hex number", name, id))?;

        Ok(())
    }
}
