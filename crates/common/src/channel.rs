//! Async channel bridge between the Tokio runtime and the USB thread

use crate::types::{CaptureEvent, DeviceId, DiscoveredDevice, PermissionResponse, RequestTag};
use async_channel::{Receiver, Sender, bounded};

/// Commands from the Tokio runtime to the USB thread
#[derive(Debug)]
pub enum UsbCommand {
    /// Enumerate connected video-capable USB devices
    ListDevices {
        /// Channel to send response back
        response: tokio::sync::oneshot::Sender<Vec<DiscoveredDevice>>,
    },

    /// Ask the platform for access to a device
    ///
    /// No response channel: the outcome arrives later as a single
    /// [`AppEvent::PermissionResolved`] carrying the same tag.
    RequestPermission {
        /// Device the request is for
        device_id: DeviceId,
        /// Tag echoed back in the response for re-association
        tag: RequestTag,
    },

    /// Shutdown the USB thread gracefully
    Shutdown,
}

/// Events from the USB thread and the capture provider
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The one-shot outcome of an outstanding permission request
    PermissionResolved(PermissionResponse),

    /// Capture provider lifecycle notification
    Capture(CaptureEvent),
}

/// Handle for the Tokio runtime (async)
#[derive(Clone)]
pub struct UsbBridge {
    cmd_tx: Sender<UsbCommand>,
    event_rx: Receiver<AppEvent>,
}

impl UsbBridge {
    /// Send a command to the USB thread
    pub async fn send_command(&self, cmd: UsbCommand) -> crate::Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Send a command without awaiting (for synchronous callers)
    pub fn try_send_command(&self, cmd: UsbCommand) -> crate::Result<()> {
        self.cmd_tx
            .try_send(cmd)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Receive an event from the USB thread
    pub async fn recv_event(&self) -> crate::Result<AppEvent> {
        self.event_rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Handle for the USB thread (blocking)
pub struct UsbWorker {
    pub(crate) cmd_rx: Receiver<UsbCommand>,
    /// Event sender (public so collaborators can deliver events on the
    /// same stream the app loop already listens on)
    pub event_tx: Sender<AppEvent>,
}

impl UsbWorker {
    /// Receive a command from the Tokio runtime (blocking)
    pub fn recv_command(&self) -> crate::Result<UsbCommand> {
        self.cmd_rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Try to receive a command without blocking
    pub fn try_recv_command(&self) -> Option<UsbCommand> {
        self.cmd_rx.try_recv().ok()
    }

    /// Send an event to the Tokio runtime (blocking)
    pub fn send_event(&self, event: AppEvent) -> crate::Result<()> {
        self.event_tx
            .send_blocking(event)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Create the channel bridge between Tokio and the USB thread
///
/// Returns (UsbBridge for Tokio, UsbWorker for the USB thread)
pub fn create_usb_bridge() -> (UsbBridge, UsbWorker) {
    let (cmd_tx, cmd_rx) = bounded(256);
    let (event_tx, event_rx) = bounded(256);

    (
        UsbBridge { cmd_tx, event_rx },
        UsbWorker { cmd_rx, event_tx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_bridge() {
        let (bridge, worker) = create_usb_bridge();

        // Spawn a thread to simulate the USB worker
        let handle = std::thread::spawn(move || {
            let cmd = worker.recv_command().unwrap();
            matches!(cmd, UsbCommand::ListDevices { .. })
        });

        // Send command from async context
        let (tx, _rx) = tokio::sync::oneshot::channel();
        bridge
            .send_command(UsbCommand::ListDevices { response: tx })
            .await
            .unwrap();

        assert!(handle.join().unwrap());
    }

    #[tokio::test]
    async fn test_event_delivery() {
        let (bridge, worker) = create_usb_bridge();

        worker
            .send_event(AppEvent::Capture(crate::types::CaptureEvent::Opened))
            .unwrap();

        match bridge.recv_event().await.unwrap() {
            AppEvent::Capture(crate::types::CaptureEvent::Opened) => {}
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
