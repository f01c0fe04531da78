//! Integration tests for the settings store

use app::store::SettingsStore;
use common::{CameraSettings, PixelFormat};
use std::fs;

#[test]
fn save_then_load_roundtrips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devices.toml");

    let settings = CameraSettings {
        format: PixelFormat::Yuyv,
        resolution: "640x480".to_string(),
        fps: 15,
        rotate: 180,
    };

    let mut store = SettingsStore::open(path.clone());
    store.save("usb_046d_0825_SN1", settings.clone()).unwrap();

    assert_eq!(store.load("usb_046d_0825_SN1"), Some(settings.clone()));

    // And across a process restart
    let reopened = SettingsStore::open(path);
    assert_eq!(reopened.load("usb_046d_0825_SN1"), Some(settings));
}

#[test]
fn never_saved_key_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::open(dir.path().join("devices.toml"));
    assert_eq!(store.load("usb_dead_beef"), None);
    assert!(!store.exists("usb_dead_beef"));
}

#[test]
fn save_overwrites_unconditionally() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SettingsStore::open(dir.path().join("devices.toml"));

    store
        .save("usb_046d_0825", CameraSettings::default())
        .unwrap();
    let changed = CameraSettings {
        fps: 0,
        ..CameraSettings::default()
    };
    store.save("usb_046d_0825", changed.clone()).unwrap();

    assert_eq!(store.load("usb_046d_0825"), Some(changed));
}

#[test]
fn malformed_file_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devices.toml");
    fs::write(&path, "this is not { toml").unwrap();

    let mut store = SettingsStore::open(path.clone());
    assert_eq!(store.load("usb_046d_0825"), None);

    // The store stays usable: defaults can be regenerated and persisted
    store.create_default("usb_046d_0825", None).unwrap();
    let reopened = SettingsStore::open(path);
    assert_eq!(
        reopened.load("usb_046d_0825"),
        Some(CameraSettings::default())
    );
}

#[test]
fn unknown_stored_format_degrades_to_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devices.toml");
    fs::write(
        &path,
        "[settings.usb_046d_0825]\nformat = \"H264\"\n",
    )
    .unwrap();

    let store = SettingsStore::open(path);
    assert_eq!(store.load("usb_046d_0825"), None);
}

#[test]
fn names_roundtrip_independently_of_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devices.toml");

    let mut store = SettingsStore::open(path.clone());
    store.set_name("usb_046d_0825", "Desk camera").unwrap();

    let reopened = SettingsStore::open(path);
    assert_eq!(reopened.name("usb_046d_0825"), Some("Desk camera"));
    assert!(!reopened.exists("usb_046d_0825"));
}

#[test]
fn create_default_overwrites_existing_entry() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SettingsStore::open(dir.path().join("devices.toml"));

    store
        .save(
            "usb_046d_0825",
            CameraSettings {
                fps: 15,
                ..CameraSettings::default()
            },
        )
        .unwrap();

    let defaults = store.create_default("usb_046d_0825", None).unwrap();
    assert_eq!(defaults, CameraSettings::default());
    assert_eq!(store.load("usb_046d_0825"), Some(CameraSettings::default()));
}
