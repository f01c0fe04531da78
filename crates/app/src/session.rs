//! Settings reconciliation session
//!
//! Owns the two settings snapshots that exist while a device is selected:
//! `last_loaded` (the persisted baseline) and `pending` (the working copy the
//! user edits). Edits only ever touch `pending`; persistence happens solely
//! through an explicit [`SettingsSession::save`].

use crate::store::SettingsStore;
use common::{CameraSettings, PixelFormat, Result};
use tracing::debug;

/// Editor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawerState {
    /// Editor not visible; snapshots agree with the last decision
    Closed,
    /// Editor visible; `pending` tracks user edits
    Open,
    /// Editor closing with unsaved edits; waiting for save or discard
    Deciding,
}

/// Result of closing the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// No net change; nothing to do
    Unchanged,
    /// `pending` differs from `last_loaded`; caller must prompt the user
    /// and follow up with `save` or `discard`
    PromptSave,
}

/// Per-device settings editing session
#[derive(Debug)]
pub struct SettingsSession {
    device_key: String,
    last_loaded: CameraSettings,
    pending: CameraSettings,
    state: DrawerState,
}

impl SettingsSession {
    /// Initialize a session for a selected device
    ///
    /// Loads the stored settings, or defaults when nothing is stored yet.
    /// Both snapshots start equal and the editor starts closed.
    pub fn for_device(device_key: &str, store: &SettingsStore) -> Self {
        let loaded = store.load(device_key).unwrap_or_default();
        Self {
            device_key: device_key.to_string(),
            last_loaded: loaded.clone(),
            pending: loaded,
            state: DrawerState::Closed,
        }
    }

    /// Open the editor: reload the persisted baseline and reset both snapshots
    pub fn open(&mut self, store: &SettingsStore) {
        let loaded = store.load(&self.device_key).unwrap_or_default();
        self.last_loaded = loaded.clone();
        self.pending = loaded;
        self.state = DrawerState::Open;
    }

    /// Replace the pending resolution
    ///
    /// Selecting the current value is an idempotent no-op write.
    pub fn set_resolution(&mut self, resolution: &str) {
        self.pending = CameraSettings {
            resolution: resolution.to_string(),
            ..self.pending.clone()
        };
    }

    /// Replace the pending pixel format
    pub fn set_format(&mut self, format: PixelFormat) {
        self.pending = CameraSettings {
            format,
            ..self.pending.clone()
        };
    }

    /// Replace the pending frame rate
    pub fn set_fps(&mut self, fps: u32) {
        self.pending = CameraSettings {
            fps,
            ..self.pending.clone()
        };
    }

    /// Replace the pending rotation
    pub fn set_rotate(&mut self, rotate: u32) {
        self.pending = CameraSettings {
            rotate,
            ..self.pending.clone()
        };
    }

    /// Close the editor
    ///
    /// With no net change the session returns to closed immediately;
    /// otherwise it stays in the deciding state until `save` or `discard`.
    pub fn close(&mut self) -> CloseOutcome {
        if self.pending == self.last_loaded {
            self.state = DrawerState::Closed;
            CloseOutcome::Unchanged
        } else {
            self.state = DrawerState::Deciding;
            CloseOutcome::PromptSave
        }
    }

    /// Commit `pending` to the store and make it the new baseline
    pub fn save(&mut self, store: &mut SettingsStore) -> Result<()> {
        store.save(&self.device_key, self.pending.clone())?;
        self.last_loaded = self.pending.clone();
        self.state = DrawerState::Closed;
        debug!("Saved settings for {}", self.device_key);
        Ok(())
    }

    /// Drop the pending edits and restore the baseline
    pub fn discard(&mut self) {
        self.pending = self.last_loaded.clone();
        self.state = DrawerState::Closed;
    }

    /// Key of the device this session edits
    pub fn device_key(&self) -> &str {
        &self.device_key
    }

    /// Working copy reflecting unsaved edits
    pub fn pending(&self) -> &CameraSettings {
        &self.pending
    }

    /// Persisted baseline
    pub fn last_loaded(&self) -> &CameraSettings {
        &self.last_loaded
    }

    /// Current editor state
    pub fn state(&self) -> DrawerState {
        self.state
    }

    /// Option highlighting for the current pending values
    pub fn highlight(&self) -> Highlight {
        apply_highlighting(&self.pending)
    }
}

/// Resolution options offered by the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionChoice {
    Vga,
    Hd720,
    FullHd,
}

impl ResolutionChoice {
    /// Resolution string this option stands for
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vga => "640x480",
            Self::Hd720 => "1280x720",
            Self::FullHd => "1920x1080",
        }
    }
}

/// Frame rate options offered by the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpsChoice {
    Auto,
    Fps15,
    Fps30,
}

/// The one selected option per editor group
///
/// Returning one enum value per group makes "exactly one option highlighted"
/// hold by construction; the mapping below makes it total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub resolution: ResolutionChoice,
    pub format: PixelFormat,
    pub fps: FpsChoice,
}

/// Map settings values to highlighted options
///
/// Total over all possible stored values: an unrecognized resolution string
/// falls back to 1280x720, an unrecognized frame rate to 30.
pub fn apply_highlighting(settings: &CameraSettings) -> Highlight {
    let resolution = match settings.resolution.as_str() {
        "640x480" => ResolutionChoice::Vga,
        "1920x1080" => ResolutionChoice::FullHd,
        "1280x720" => ResolutionChoice::Hd720,
        _ => ResolutionChoice::Hd720,
    };

    let fps = match settings.fps {
        0 => FpsChoice::Auto,
        15 => FpsChoice::Fps15,
        30 => FpsChoice::Fps30,
        _ => FpsChoice::Fps30,
    };

    Highlight {
        resolution,
        format: settings.format,
        fps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(resolution: &str, fps: u32) -> CameraSettings {
        CameraSettings {
            resolution: resolution.to_string(),
            fps,
            ..CameraSettings::default()
        }
    }

    #[test]
    fn test_highlighting_known_values() {
        let h = apply_highlighting(&settings("640x480", 15));
        assert_eq!(h.resolution, ResolutionChoice::Vga);
        assert_eq!(h.fps, FpsChoice::Fps15);
        assert_eq!(h.format, PixelFormat::Mjpeg);

        let h = apply_highlighting(&settings("1920x1080", 0));
        assert_eq!(h.resolution, ResolutionChoice::FullHd);
        assert_eq!(h.fps, FpsChoice::Auto);
    }

    #[test]
    fn test_highlighting_fallbacks() {
        let h = apply_highlighting(&settings("800x600", 24));
        assert_eq!(h.resolution, ResolutionChoice::Hd720);
        assert_eq!(h.fps, FpsChoice::Fps30);

        let h = apply_highlighting(&settings("", 30));
        assert_eq!(h.resolution, ResolutionChoice::Hd720);
    }

    #[test]
    fn test_reselecting_current_value_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("devices.toml"));

        let mut session = SettingsSession::for_device("usb_046d_0825", &store);
        session.open(&store);
        session.set_resolution("1280x720");
        session.set_fps(30);
        assert_eq!(session.close(), CloseOutcome::Unchanged);
        assert_eq!(session.state(), DrawerState::Closed);
    }
}
