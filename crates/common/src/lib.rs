//! Common utilities for uvcview
//!
//! This crate provides functionality shared between the application loop and
//! the USB worker thread: value types, error handling, logging setup, and the
//! async channel bridge for USB thread communication.

pub mod channel;
pub mod error;
pub mod logging;
pub mod test_utils;
pub mod types;

pub use channel::{AppEvent, UsbBridge, UsbCommand, UsbWorker, create_usb_bridge};
pub use error::{Error, Result};
pub use logging::setup_logging;
pub use types::{
    CameraSettings, CaptureEvent, DeviceDescriptor, DeviceId, DiscoveredDevice,
    PermissionResponse, PixelFormat, RequestId, RequestTag, Resolution,
};
