//! Shared value types
//!
//! Device descriptors produced by the USB scanner, per-device camera
//! settings, and the permission handshake request/response types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Runtime device identifier (scanner-assigned)
///
/// Stable for the lifetime of one run; not persisted. Persistent identity is
/// the device key derived from the descriptor fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

/// Permission request identity
///
/// Each permission request carries a unique id so that the single expected
/// response can be re-associated with the request that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

/// USB device descriptor information used for identity and selection
///
/// Optional fields are `None` when the string descriptor read failed; a
/// failed read is never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Runtime id assigned by the scanner
    pub id: DeviceId,
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Manufacturer string (if available)
    pub manufacturer: Option<String>,
    /// Product string (if available)
    pub product: Option<String>,
    /// Serial number string (if available)
    pub serial_number: Option<String>,
}

impl DeviceDescriptor {
    /// Short human-readable label, preferring the product string
    pub fn label(&self) -> String {
        match (&self.manufacturer, &self.product) {
            (_, Some(product)) => product.clone(),
            (Some(manufacturer), None) => manufacturer.clone(),
            (None, None) => format!("{:04x}:{:04x}", self.vendor_id, self.product_id),
        }
    }
}

/// A device reported by a scan, together with whether the host already
/// holds access to it (the fast path of the permission handshake).
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    pub descriptor: DeviceDescriptor,
    pub permission_granted: bool,
}

/// Preview pixel format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    #[default]
    #[serde(rename = "MJPEG")]
    Mjpeg,
    #[serde(rename = "YUYV")]
    Yuyv,
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mjpeg => write!(f, "MJPEG"),
            Self::Yuyv => write!(f, "YUYV"),
        }
    }
}

impl FromStr for PixelFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MJPEG" => Ok(Self::Mjpeg),
            "YUYV" => Ok(Self::Yuyv),
            other => Err(crate::Error::Config(format!(
                "unknown pixel format '{}', expected MJPEG or YUYV",
                other
            ))),
        }
    }
}

/// Persisted per-device preview settings
///
/// Replaced wholesale on change; there are no cross-field invariants and each
/// field falls back to its own default when absent from stored data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Preferred pixel format
    #[serde(default)]
    pub format: PixelFormat,
    /// Preferred resolution as "WIDTHxHEIGHT"
    #[serde(default = "CameraSettings::default_resolution")]
    pub resolution: String,
    /// Preferred frame rate (0 = auto)
    #[serde(default = "CameraSettings::default_fps")]
    pub fps: u32,
    /// Rotation in degrees
    #[serde(default)]
    pub rotate: u32,
}

impl CameraSettings {
    fn default_resolution() -> String {
        "1280x720".to_string()
    }

    fn default_fps() -> u32 {
        30
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            format: PixelFormat::default(),
            resolution: Self::default_resolution(),
            fps: Self::default_fps(),
            rotate: 0,
        }
    }
}

/// Preview resolution at the capture seam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            || crate::Error::Config(format!("invalid resolution '{}', expected WIDTHxHEIGHT", s));

        let (width, height) = s.split_once(['x', 'X']).ok_or_else(invalid)?;
        Ok(Self {
            width: width.trim().parse().map_err(|_| invalid())?,
            height: height.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// Tag attached to a permission request
///
/// The action string is scoped to this application so that responses meant
/// for other listeners are never mistaken for ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTag {
    /// Application-scoped action identifier
    pub action: String,
    /// Identity of the request this tag belongs to
    pub request: RequestId,
}

/// The single asynchronous response delivered for a permission request
#[derive(Debug, Clone)]
pub struct PermissionResponse {
    /// Tag echoed back from the request
    pub tag: RequestTag,
    /// The device the response is about, if it could still be resolved
    pub device: Option<DeviceDescriptor>,
    /// Whether access was granted
    pub granted: bool,
}

/// Lifecycle notifications from the capture provider
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// Preview is running
    Opened,
    /// Preview stopped
    Closed,
    /// Provider failed to open or stream
    Error { message: String },
    /// Periodic frame rate report
    FrameRate { fps: u32 },
}
