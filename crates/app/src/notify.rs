//! User-facing notifications
//!
//! The toast-equivalents of the app: short, transient messages about device
//! discovery, permission outcomes, and settings persistence. The binary logs
//! them; tests inject a recording implementation.

use std::fmt;

/// A transient user-facing notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A device was seen for the first time; defaults were stored
    NewDeviceFound { key: String, label: String },
    /// A device with stored settings was seen again
    KnownDeviceFound { key: String, label: String },
    /// The permission handshake ended in a grant
    PermissionGranted { label: String },
    /// The permission handshake ended in a denial; the user must re-scan
    PermissionDenied { label: String },
    /// Pending settings were committed to the store
    SettingsSaved { key: String },
    /// A scan returned nothing usable
    NoDevicesFound,
    /// The capture provider could not report its preview sizes
    PreviewSizesUnavailable,
    /// The capture provider failed to open or stream
    CaptureError { message: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewDeviceFound { label, .. } => write!(f, "New camera found: {}", label),
            Self::KnownDeviceFound { label, .. } => write!(f, "Known camera found: {}", label),
            Self::PermissionGranted { label } => write!(f, "Permission granted for {}", label),
            Self::PermissionDenied { label } => write!(f, "Permission denied for {}", label),
            Self::SettingsSaved { key } => write!(f, "Settings saved for {}", key),
            Self::NoDevicesFound => write!(f, "No USB cameras found"),
            Self::PreviewSizesUnavailable => write!(f, "Could not get camera preview sizes"),
            Self::CaptureError { message } => write!(f, "Camera error: {}", message),
        }
    }
}

/// Sink for user-facing notices
pub trait Notifier: Send {
    fn notify(&mut self, notice: Notice);
}

/// Notifier that surfaces notices through the log
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&mut self, notice: Notice) {
        match &notice {
            Notice::PermissionDenied { .. }
            | Notice::NoDevicesFound
            | Notice::PreviewSizesUnavailable
            | Notice::CaptureError { .. } => tracing::warn!("{}", notice),
            _ => tracing::info!("{}", notice),
        }
    }
}
