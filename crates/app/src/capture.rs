//! Capture provider seam
//!
//! The preview engine is an injected collaborator: the coordinator hands it a
//! runtime device id and reacts to its lifecycle events, nothing more.
//! Rendering, decoding, and frame-rate measurement live behind this trait.

use async_channel::Sender;
use common::{AppEvent, CaptureEvent, DeviceId, Error, Resolution, Result};
use tracing::{debug, warn};

/// Video preview engine for a selected device
///
/// Lifecycle notifications ([`CaptureEvent`]) are delivered out-of-band on
/// the shared event channel, not returned from these calls. A resolution
/// change may restart the stream internally; failures of that restart are
/// reported as an `Error` event by the provider itself.
pub trait CaptureProvider: Send {
    /// Start the preview for a device
    fn open(&mut self, device: DeviceId) -> Result<()>;

    /// Stop the preview
    fn close(&mut self);

    /// Preview sizes the open device supports
    fn supported_resolutions(&self) -> Result<Vec<Resolution>>;

    /// Ask the provider to switch the preview resolution
    fn request_resolution(&mut self, resolution: Resolution) -> Result<()>;
}

/// Capture provider for running without a video stack
///
/// Emits the regular lifecycle events and offers a fixed resolution list so
/// the selection and settings flows behave exactly as with a real engine;
/// no frames are produced.
pub struct HeadlessCapture {
    events: Sender<AppEvent>,
    open_device: Option<DeviceId>,
}

impl HeadlessCapture {
    pub fn new(events: Sender<AppEvent>) -> Self {
        Self {
            events,
            open_device: None,
        }
    }

    fn emit(&self, event: CaptureEvent) {
        if let Err(e) = self.events.try_send(AppEvent::Capture(event)) {
            warn!("Failed to deliver capture event: {}", e);
        }
    }
}

impl CaptureProvider for HeadlessCapture {
    fn open(&mut self, device: DeviceId) -> Result<()> {
        debug!("Opening headless preview for device {:?}", device);
        self.open_device = Some(device);
        self.emit(CaptureEvent::Opened);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(device) = self.open_device.take() {
            debug!("Closing headless preview for device {:?}", device);
            self.emit(CaptureEvent::Closed);
        }
    }

    fn supported_resolutions(&self) -> Result<Vec<Resolution>> {
        if self.open_device.is_none() {
            return Err(Error::Capture("no device open".to_string()));
        }
        Ok(vec![
            Resolution {
                width: 640,
                height: 480,
            },
            Resolution {
                width: 1280,
                height: 720,
            },
            Resolution {
                width: 1920,
                height: 1080,
            },
        ])
    }

    fn request_resolution(&mut self, resolution: Resolution) -> Result<()> {
        if self.open_device.is_none() {
            return Err(Error::Capture("no device open".to_string()));
        }
        debug!("Headless preview switching to {}", resolution);
        Ok(())
    }
}
