//! Structs binary compatible with the HID reports of the DualShock 4.
//!
//! <https://www.psdevwiki.com/ps4/DS4-USB>

#[macro_use]
extern crate num_derive;

pub mod input;
pub mod output;

pub use sony_gamepad_sys::{
    raw::{RawId, I16LE, U32LE},
    ConnectionType, SONY_VENDOR_ID as HID_VENDOR_ID,
};

pub const HID_PRODUCT_ID_OLD: u16 = 0x05C4;
pub const HID_PRODUCT_ID_NEW: u16 = 0x09CC;

pub const DS4_REPORT_RATE: u32 = 250;

/// Reading this feature report switches the Bluetooth input to report 0x11.
pub const FEATURE_REPORT_CALIBRATION: u8 = 0x02;
pub const FEATURE_REPORT_CALIBRATION_SIZE: usize = 37;

pub const USB_INPUT_REPORT_SIZE: usize = 64;
pub const BT_INPUT_REPORT_SIZE: usize = 78;
pub const BT_SIMPLE_INPUT_REPORT_SIZE: usize = 10;

#[cfg(test)]
pub(crate) fn offset_of<A, B>(a: &A, b: &B) -> usize {
    b as *const _ as usize - a as *const _ as usize
}
