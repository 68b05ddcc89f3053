use std::{
    collections::HashSet,
    ffi::{CStr, CString},
};

use hidapi::{DeviceInfo, HidApi};
use sony_gamepad_sys::{ConnectionType, DeviceType, SONY_VENDOR_ID};
use tracing::debug;

/// A supported controller seen during enumeration, not opened yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceContext {
    pub path: CString,
    pub product_id: u16,
    pub device_type: DeviceType,
    pub connection: ConnectionType,
}

impl DeviceContext {
    pub fn new(path: &CStr, vendor_id: u16, product_id: u16) -> Option<DeviceContext> {
        if vendor_id != SONY_VENDOR_ID {
            return None;
        }
        let device_type = DeviceType::from_product_id(product_id);
        if device_type == DeviceType::NotFound {
            return None;
        }
        Some(DeviceContext {
            path: path.to_owned(),
            product_id,
            device_type,
            connection: ConnectionType::from_path(&path.to_string_lossy()),
        })
    }

    pub fn from_info(info: &DeviceInfo) -> Option<DeviceContext> {
        DeviceContext::new(info.path(), info.vendor_id(), info.product_id())
    }
}

/// Keeps the first context of every path, in enumeration order.
///
/// Some platforms list one entry per HID collection of the same device.
pub fn dedup_by_path(contexts: impl IntoIterator<Item = DeviceContext>) -> Vec<DeviceContext> {
    let mut seen = HashSet::new();
    contexts
        .into_iter()
        .filter(|context| seen.insert(context.path.clone()))
        .collect()
}

pub fn find_devices(api: &HidApi) -> Vec<DeviceContext> {
    let devices = dedup_by_path(api.device_list().filter_map(DeviceContext::from_info));
    debug!(count = devices.len(), "enumerated controllers");
    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn filters_unknown_devices() {
        assert!(DeviceContext::new(&path("/dev/hidraw0"), 0x046D, 0x0CE6).is_none());
        assert!(DeviceContext::new(&path("/dev/hidraw0"), SONY_VENDOR_ID, 0x1234).is_none());
        let edge = DeviceContext::new(&path("/dev/hidraw1"), SONY_VENDOR_ID, 0x0DF2).unwrap();
        assert_eq!(edge.device_type, DeviceType::DualSenseEdge);
        assert_eq!(edge.connection, ConnectionType::Usb);
    }

    #[test]
    fn bluetooth_from_path() {
        let ds4 = DeviceContext::new(
            &path(r"\\?\HID#{00001124-0000-1000-8000-00805f9b34fb}_VID&0002054c_PID&09cc"),
            SONY_VENDOR_ID,
            0x09CC,
        )
        .unwrap();
        assert_eq!(ds4.device_type, DeviceType::DualShock4);
        assert_eq!(ds4.connection, ConnectionType::Bluetooth);
    }

    #[test]
    fn dedup_keeps_order() {
        let a = DeviceContext::new(&path("a"), SONY_VENDOR_ID, 0x0CE6).unwrap();
        let b = DeviceContext::new(&path("b"), SONY_VENDOR_ID, 0x05C4).unwrap();
        let devices = dedup_by_path(vec![a.clone(), b.clone(), a.clone()]);
        assert_eq!(devices, vec![a, b]);
    }
}
