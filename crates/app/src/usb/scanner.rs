//! USB device scanner
//!
//! Enumerates video-capable devices, assigns runtime ids that stay stable
//! across re-scans within one run, and probes access by opening the device.
//! A successful open doubles as the "permission already granted" answer for
//! the discovery event; string descriptor reads degrade to absent fields.

use common::{DeviceDescriptor, DeviceId, DiscoveredDevice};
use rusb::{Context, Device, DeviceHandle, UsbContext};
use std::collections::HashMap;
use tracing::{debug, warn};

const USB_CLASS_VIDEO: u8 = 0x0e;
const USB_CLASS_MISC: u8 = 0xef;
const USB_CLASS_PER_INTERFACE: u8 = 0x00;

/// Scanner over the host's USB buses
pub struct DeviceScanner {
    /// USB context for device operations
    context: Context,
    /// Device filters (VID:PID patterns); empty means all
    filters: Vec<String>,
    /// (bus, address) -> assigned runtime id
    known: HashMap<(u8, u8), DeviceId>,
    /// Next runtime id to assign
    next_device_id: u32,
}

impl DeviceScanner {
    pub fn new(filters: Vec<String>) -> Result<Self, rusb::Error> {
        let context = Context::new()?;

        Ok(Self {
            context,
            filters,
            known: HashMap::new(),
            next_device_id: 1,
        })
    }

    /// Enumerate connected video-capable devices matching the filters
    pub fn scan(&mut self) -> Result<Vec<DiscoveredDevice>, rusb::Error> {
        let mut found = Vec::new();

        for device in self.context.devices()?.iter() {
            match self.probe(&device) {
                Ok(Some(discovered)) => found.push(discovered),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        "Failed to probe device at bus={} addr={}: {}",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                }
            }
        }

        debug!("Scan found {} video devices", found.len());
        Ok(found)
    }

    /// Re-probe a previously scanned device for access
    ///
    /// Backs a permission request: returns the device's current descriptor
    /// (None when it is gone) and whether opening it succeeded.
    pub fn acquire(&mut self, device_id: DeviceId) -> (Option<DeviceDescriptor>, bool) {
        let location = self
            .known
            .iter()
            .find_map(|(loc, id)| (*id == device_id).then_some(*loc));
        let Some(location) = location else {
            debug!("Acquire for unknown device {:?}", device_id);
            return (None, false);
        };

        let devices = match self.context.devices() {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Failed to enumerate devices during acquire: {}", e);
                return (None, false);
            }
        };

        for device in devices.iter() {
            if (device.bus_number(), device.address()) != location {
                continue;
            }
            return match self.probe(&device) {
                Ok(Some(discovered)) => {
                    (Some(discovered.descriptor), discovered.permission_granted)
                }
                Ok(None) => (None, false),
                Err(e) => {
                    warn!("Failed to re-probe device {:?}: {}", device_id, e);
                    (None, false)
                }
            };
        }

        debug!("Device {:?} no longer present", device_id);
        (None, false)
    }

    fn probe(&mut self, device: &Device<Context>) -> Result<Option<DiscoveredDevice>, rusb::Error> {
        let descriptor = device.device_descriptor()?;
        let (vendor_id, product_id) = (descriptor.vendor_id(), descriptor.product_id());

        if !check_filter(vendor_id, product_id, &self.filters) {
            return Ok(None);
        }
        if !is_video_device(device, descriptor.class_code()) {
            return Ok(None);
        }

        let id = self.assign_id(device.bus_number(), device.address());

        // Opening the device both reads the string descriptors and answers
        // whether access is already held.
        let (strings, permission_granted) = match device.open() {
            Ok(handle) => (read_strings(&descriptor, &handle), true),
            Err(rusb::Error::Access) => {
                debug!(
                    "No access to {:04x}:{:04x} yet, strings unavailable",
                    vendor_id, product_id
                );
                ((None, None, None), false)
            }
            Err(e) => {
                debug!("Could not open {:04x}:{:04x}: {}", vendor_id, product_id, e);
                ((None, None, None), false)
            }
        };
        let (manufacturer, product, serial_number) = strings;

        Ok(Some(DiscoveredDevice {
            descriptor: DeviceDescriptor {
                id,
                vendor_id,
                product_id,
                manufacturer,
                product,
                serial_number,
            },
            permission_granted,
        }))
    }

    fn assign_id(&mut self, bus: u8, address: u8) -> DeviceId {
        if let Some(&id) = self.known.get(&(bus, address)) {
            return id;
        }
        let id = DeviceId(self.next_device_id);
        self.next_device_id += 1;
        self.known.insert((bus, address), id);
        id
    }
}

/// Whether a device exposes a video function
///
/// Video-class at the device level, or a video interface on composite and
/// miscellaneous-class devices (the usual shape of UVC webcams).
fn is_video_device(device: &Device<Context>, class_code: u8) -> bool {
    if class_code == USB_CLASS_VIDEO {
        return true;
    }
    if class_code != USB_CLASS_PER_INTERFACE && class_code != USB_CLASS_MISC {
        return false;
    }

    let Ok(config) = device.config_descriptor(0) else {
        return false;
    };
    config
        .interfaces()
        .flat_map(|i| i.descriptors())
        .any(|d| d.class_code() == USB_CLASS_VIDEO)
}

/// Read string descriptors, treating every failure as "absent"
fn read_strings(
    descriptor: &rusb::DeviceDescriptor,
    handle: &DeviceHandle<Context>,
) -> (Option<String>, Option<String>, Option<String>) {
    let manufacturer = descriptor
        .manufacturer_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    let product = descriptor
        .product_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    let serial_number = descriptor
        .serial_number_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    (manufacturer, product, serial_number)
}

/// Check a VID/PID pair against the configured filter patterns
///
/// Filter format: "0xVID:0xPID", either side may be "*". An empty filter
/// list allows every device.
pub fn check_filter(vid: u16, pid: u16, filters: &[String]) -> bool {
    if filters.is_empty() {
        return true;
    }

    filters.iter().any(|filter| match filter.split_once(':') {
        Some((vid_pattern, pid_pattern)) => {
            side_matches(vid_pattern, vid) && side_matches(pid_pattern, pid)
        }
        None => false,
    })
}

fn side_matches(pattern: &str, value: u16) -> bool {
    if pattern == "*" {
        return true;
    }
    u16::from_str_radix(pattern.trim_start_matches("0x"), 16).is_ok_and(|p| p == value)
}
