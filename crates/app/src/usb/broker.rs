//! Permission broker backed by the USB worker thread
//!
//! Forwards permission requests onto the command channel; the worker answers
//! with a single PermissionResolved event carrying the request's tag.

use crate::permission::PermissionBroker;
use common::{DeviceDescriptor, RequestTag, UsbBridge, UsbCommand};

pub struct UsbPermissionBroker {
    bridge: UsbBridge,
}

impl UsbPermissionBroker {
    pub fn new(bridge: UsbBridge) -> Self {
        Self { bridge }
    }
}

impl PermissionBroker for UsbPermissionBroker {
    fn request(&mut self, device: &DeviceDescriptor, tag: &RequestTag) -> common::Result<()> {
        self.bridge.try_send_command(UsbCommand::RequestPermission {
            device_id: device.id,
            tag: tag.clone(),
        })
    }
}
