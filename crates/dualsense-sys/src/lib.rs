//! Structs binary compatible with the HID reports of the DualSense and
//! DualSense Edge.
//!
//! <https://github.com/torvalds/linux/blob/master/drivers/hid/hid-playstation.c>

#[macro_use]
extern crate num_derive;

pub mod input;
pub mod output;
pub mod trigger;

pub use sony_gamepad_sys::{
    raw::{RawId, I16LE, U32LE},
    ConnectionType, SONY_VENDOR_ID as HID_VENDOR_ID,
};

pub const HID_PRODUCT_ID_DUALSENSE: u16 = 0x0CE6;
pub const HID_PRODUCT_ID_EDGE: u16 = 0x0DF2;

pub const DS_REPORT_RATE: u32 = 250;

/// Reading this feature report switches the Bluetooth input to the full reports.
pub const FEATURE_REPORT_CALIBRATION: u8 = 0x05;
pub const FEATURE_REPORT_CALIBRATION_SIZE: usize = 41;

pub const USB_INPUT_REPORT_SIZE: usize = 64;
pub const BT_INPUT_REPORT_SIZE: usize = 78;
pub const BT_SIMPLE_INPUT_REPORT_SIZE: usize = 10;

#[cfg(test)]
pub(crate) fn offset_of<A, B>(a: &A, b: &B) -> usize {
    b as *const _ as usize - a as *const _ as usize
}
