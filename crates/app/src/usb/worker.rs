//! USB worker thread
//!
//! Dedicated thread for synchronous USB work. Processes commands from the
//! Tokio runtime and delivers permission outcomes back as events on the
//! shared channel.

use crate::usb::scanner::DeviceScanner;
use common::{AppEvent, PermissionResponse, UsbCommand, UsbWorker};
use tracing::{debug, error, info};

/// USB worker thread state
pub struct UsbWorkerThread {
    scanner: DeviceScanner,
    worker: UsbWorker,
}

impl UsbWorkerThread {
    pub fn new(worker: UsbWorker, filters: Vec<String>) -> Result<Self, rusb::Error> {
        let scanner = DeviceScanner::new(filters)?;
        Ok(Self { scanner, worker })
    }

    /// Run the command loop until Shutdown or until the bridge is dropped
    pub fn run(mut self) -> Result<(), rusb::Error> {
        info!("USB worker thread started");

        loop {
            let cmd = match self.worker.recv_command() {
                Ok(cmd) => cmd,
                Err(_) => {
                    debug!("Command channel closed, stopping USB worker");
                    break;
                }
            };

            if matches!(cmd, UsbCommand::Shutdown) {
                info!("USB worker shutting down");
                break;
            }

            self.handle_command(cmd);
        }

        info!("USB worker thread stopped");
        Ok(())
    }

    /// Handle a command from the Tokio runtime
    fn handle_command(&mut self, cmd: UsbCommand) {
        // Panic isolation: a misbehaving device must not take the thread down
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.handle_command_inner(cmd)
        }));

        if let Err(e) = result {
            error!("Panic in USB command handler: {:?}", e);
        }
    }

    fn handle_command_inner(&mut self, cmd: UsbCommand) {
        match cmd {
            UsbCommand::ListDevices { response } => {
                let devices = match self.scanner.scan() {
                    Ok(devices) => devices,
                    Err(e) => {
                        // Degrade to an empty scan; the caller surfaces
                        // "no devices found" to the user
                        tracing::warn!("Device scan failed: {}", e);
                        Vec::new()
                    }
                };
                debug!("Listing {} devices", devices.len());
                let _ = response.send(devices);
            }

            UsbCommand::RequestPermission { device_id, tag } => {
                debug!(
                    "Permission request {:?} for device {:?}",
                    tag.request, device_id
                );
                let (device, granted) = self.scanner.acquire(device_id);
                let response = PermissionResponse {
                    tag,
                    device,
                    granted,
                };
                if let Err(e) = self
                    .worker
                    .send_event(AppEvent::PermissionResolved(response))
                {
                    error!("Failed to deliver permission response: {}", e);
                }
            }

            UsbCommand::Shutdown => {
                // Already handled in the main loop
                unreachable!()
            }
        }
    }
}

/// Spawn the USB worker thread
///
/// Creates a new OS thread for USB operations and returns its join handle.
/// The thread runs until a Shutdown command is received.
pub fn spawn_usb_worker(
    worker: UsbWorker,
    filters: Vec<String>,
) -> std::thread::JoinHandle<Result<(), rusb::Error>> {
    std::thread::Builder::new()
        .name("usb-worker".to_string())
        .spawn(move || {
            let worker_thread = UsbWorkerThread::new(worker, filters)?;
            worker_thread.run()
        })
        .expect("Failed to spawn USB worker thread")
}
