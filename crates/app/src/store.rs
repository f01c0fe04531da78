//! Per-device settings persistence
//!
//! A flat TOML file maps device keys to their stored [`CameraSettings`] and
//! optional human-readable names. Read failures of any kind degrade to "no
//! stored data" with a logged warning; they never reach the caller.

use common::{CameraSettings, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    /// Device key -> stored settings
    #[serde(default)]
    settings: BTreeMap<String, CameraSettings>,
    /// Device key -> human readable name
    #[serde(default)]
    names: BTreeMap<String, String>,
}

/// Settings store backed by a single TOML file
///
/// Entries are created on first detection of a device, overwritten on
/// explicit save, and never deleted. Writes go through to disk immediately.
pub struct SettingsStore {
    path: PathBuf,
    file: StoreFile,
}

impl SettingsStore {
    /// Open the store at the given path
    ///
    /// A missing file yields an empty store. A malformed or unreadable file
    /// also yields an empty store: stored settings fail closed to "absent"
    /// and are regenerated from defaults as devices are seen again.
    pub fn open(path: PathBuf) -> Self {
        let file = match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(file) => file,
                Err(e) => {
                    warn!(
                        "Malformed settings store {}, starting empty: {}",
                        path.display(),
                        e
                    );
                    StoreFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings store at {}, starting empty", path.display());
                StoreFile::default()
            }
            Err(e) => {
                warn!(
                    "Failed to read settings store {}, starting empty: {}",
                    path.display(),
                    e
                );
                StoreFile::default()
            }
        };

        Self { path, file }
    }

    /// Default store location
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("uvcview").join("devices.toml")
        } else {
            PathBuf::from(".config/uvcview/devices.toml")
        }
    }

    /// Path this store persists to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load stored settings for a device key
    pub fn load(&self, key: &str) -> Option<CameraSettings> {
        self.file.settings.get(key).cloned()
    }

    /// Whether settings exist for a device key
    pub fn exists(&self, key: &str) -> bool {
        self.file.settings.contains_key(key)
    }

    /// Persist settings for a device key, overwriting any prior value
    pub fn save(&mut self, key: &str, settings: CameraSettings) -> Result<()> {
        self.file.settings.insert(key.to_string(), settings);
        self.persist()
    }

    /// Create and persist default settings for a newly found device
    ///
    /// Overwrites an existing entry; callers gate on [`exists`] when that
    /// matters. Returns the stored defaults.
    ///
    /// [`exists`]: SettingsStore::exists
    pub fn create_default(&mut self, key: &str, name: Option<&str>) -> Result<CameraSettings> {
        let defaults = CameraSettings::default();
        self.file.settings.insert(key.to_string(), defaults.clone());
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.file.names.insert(key.to_string(), name.to_string());
        }
        self.persist()?;
        Ok(defaults)
    }

    /// Human-readable name assigned to a device key
    pub fn name(&self, key: &str) -> Option<&str> {
        self.file.names.get(key).map(String::as_str)
    }

    /// Assign a human-readable name to a device key
    pub fn set_name(&mut self, key: &str, name: &str) -> Result<()> {
        self.file.names.insert(key.to_string(), name.to_string());
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let content = toml::to_string_pretty(&self.file)
            .map_err(|e| Error::Store(format!("failed to serialize settings: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, content)?;
        debug!("Persisted settings store to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("devices.toml"));
        assert!(!store.exists("usb_046d_0825"));
        assert!(store.load("usb_046d_0825").is_none());
        assert!(store.name("usb_046d_0825").is_none());
    }

    #[test]
    fn test_create_default_persists_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.toml");

        let mut store = SettingsStore::open(path.clone());
        let defaults = store
            .create_default("usb_046d_0825_SN1", Some("HD Webcam"))
            .unwrap();
        assert_eq!(defaults, CameraSettings::default());

        let reopened = SettingsStore::open(path);
        assert!(reopened.exists("usb_046d_0825_SN1"));
        assert_eq!(reopened.name("usb_046d_0825_SN1"), Some("HD Webcam"));
    }

    #[test]
    fn test_create_default_skips_empty_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SettingsStore::open(dir.path().join("devices.toml"));
        store.create_default("usb_046d_0825", Some("")).unwrap();
        assert!(store.name("usb_046d_0825").is_none());
    }

    #[test]
    fn test_partial_entry_fills_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.toml");
        fs::write(
            &path,
            "[settings.usb_046d_0825]\nresolution = \"640x480\"\n",
        )
        .unwrap();

        let store = SettingsStore::open(path);
        let settings = store.load("usb_046d_0825").unwrap();
        assert_eq!(settings.resolution, "640x480");
        assert_eq!(settings.fps, 30);
        assert_eq!(settings.format, common::PixelFormat::Mjpeg);
    }
}
