//! Test utilities for uvcview
//!
//! Mock descriptor builders shared by unit and integration tests.

use crate::types::{DeviceDescriptor, DeviceId, DiscoveredDevice};

/// Create a mock DeviceDescriptor with all string fields populated
///
/// # Example
/// ```
/// use common::test_utils::mock_descriptor;
///
/// let device = mock_descriptor(1, 0x046d, 0x0825);
/// assert_eq!(device.vendor_id, 0x046d);
/// assert_eq!(device.serial_number.as_deref(), Some("SN000001"));
/// ```
pub fn mock_descriptor(id: u32, vendor_id: u16, product_id: u16) -> DeviceDescriptor {
    DeviceDescriptor {
        id: DeviceId(id),
        vendor_id,
        product_id,
        manufacturer: Some(format!("Test Manufacturer {}", id)),
        product: Some(format!("Test Product {}", id)),
        serial_number: Some(format!("SN{:06}", id)),
    }
}

/// Create a mock DeviceDescriptor with no string descriptors at all
pub fn mock_bare_descriptor(id: u32, vendor_id: u16, product_id: u16) -> DeviceDescriptor {
    DeviceDescriptor {
        id: DeviceId(id),
        vendor_id,
        product_id,
        manufacturer: None,
        product: None,
        serial_number: None,
    }
}

/// Wrap a descriptor in a discovery event
pub fn discovered(descriptor: DeviceDescriptor, permission_granted: bool) -> DiscoveredDevice {
    DiscoveredDevice {
        descriptor,
        permission_granted,
    }
}
