//! Stable device identity
//!
//! Derives the persistence key for a physical USB device from its descriptor.
//! The serial number wins when present; otherwise the name strings are used,
//! and as a last resort vendor and product id alone. The last form cannot
//! tell apart two identical unserialised devices plugged in at once; their
//! settings will share one key.

use common::DeviceDescriptor;

/// Derive the settings key for a device
///
/// Pure function of the descriptor. Repeated calls with identical input
/// yield identical output, and it never fails: absent optional fields simply
/// select the next fallback.
pub fn resolve_key(device: &DeviceDescriptor) -> String {
    let vid = device.vendor_id;
    let pid = device.product_id;

    if let Some(serial) = nonempty(device.serial_number.as_deref()) {
        return format!("usb_{:04x}_{:04x}_{}", vid, pid, serial);
    }

    let manufacturer = nonempty(device.manufacturer.as_deref());
    let product = nonempty(device.product.as_deref());
    if manufacturer.is_some() || product.is_some() {
        return format!(
            "usb_{:04x}_{:04x}_{}_{}",
            vid,
            pid,
            normalize(manufacturer.unwrap_or("")),
            normalize(product.unwrap_or(""))
        );
    }

    format!("usb_{:04x}_{:04x}", vid, pid)
}

fn nonempty(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}

/// Collapse whitespace runs to single underscores
fn normalize(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::{mock_bare_descriptor, mock_descriptor};

    #[test]
    fn test_serial_wins() {
        let device = mock_descriptor(1, 0x046d, 0x0825);
        assert_eq!(resolve_key(&device), "usb_046d_0825_SN000001");
    }

    #[test]
    fn test_deterministic() {
        let device = mock_descriptor(7, 0x1234, 0x5678);
        assert_eq!(resolve_key(&device), resolve_key(&device));
        assert_eq!(resolve_key(&device), resolve_key(&device.clone()));
    }

    #[test]
    fn test_name_fallback_normalizes_whitespace() {
        let mut device = mock_bare_descriptor(1, 0x046d, 0x0825);
        device.manufacturer = Some("Logitech  Inc".to_string());
        device.product = Some("HD Webcam\tC270".to_string());
        assert_eq!(
            resolve_key(&device),
            "usb_046d_0825_Logitech_Inc_HD_Webcam_C270"
        );
    }

    #[test]
    fn test_single_name_is_enough() {
        let mut device = mock_bare_descriptor(1, 0x046d, 0x0825);
        device.product = Some("HD Webcam".to_string());
        assert_eq!(resolve_key(&device), "usb_046d_0825__HD_Webcam");
    }

    #[test]
    fn test_vendor_product_fallback() {
        let device = mock_bare_descriptor(1, 0x046d, 0x0825);
        assert_eq!(resolve_key(&device), "usb_046d_0825");
    }

    #[test]
    fn test_blank_strings_treated_as_absent() {
        let mut device = mock_bare_descriptor(1, 0x046d, 0x0825);
        device.serial_number = Some("   ".to_string());
        device.manufacturer = Some("".to_string());
        assert_eq!(resolve_key(&device), "usb_046d_0825");
    }

    #[test]
    fn test_distinct_devices_distinct_keys() {
        let a = mock_descriptor(1, 0x046d, 0x0825);
        let b = mock_descriptor(2, 0x046d, 0x0825);
        let c = mock_descriptor(3, 0x1bcf, 0x2284);
        assert_ne!(resolve_key(&a), resolve_key(&b)); // differing serials
        assert_ne!(resolve_key(&a), resolve_key(&c));
    }
}
