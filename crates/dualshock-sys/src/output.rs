use sony_gamepad_sys::{crc, Color};

use crate::ConnectionType;

pub const USB_OUTPUT_REPORT_ID: u8 = 0x05;
pub const BT_OUTPUT_REPORT_ID: u8 = 0x11;
/// HID report with CRC.
pub const BT_HW_CONTROL: u8 = 0x80 | 0x40;

/// Rumble, lightbar and lightbar flash.
pub const VALID_FLAGS: u8 = 0x01 | 0x02 | 0x04;

#[repr(packed)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SetStateData {
    pub valid_flags: u8,
    _valid_flags2: u8,
    _reserved: u8,
    pub motor_right: u8,
    pub motor_left: u8,
    pub lightbar: [u8; 3],
    pub flash_on: u8,
    pub flash_off: u8,
}

#[repr(packed)]
#[derive(Clone, Copy, Debug)]
pub struct USBOutputReport {
    pub id: u8,
    pub data: SetStateData,
    _reserved: [u8; 21],
}

#[repr(packed)]
#[derive(Clone, Copy)]
pub struct BTOutputReport {
    pub id: u8,
    pub hw_control: u8,
    _audio_control: u8,
    pub data: SetStateData,
    _reserved: [u8; 61],
    crc: [u8; 4],
}

#[derive(Clone, Copy)]
pub enum OutputReport {
    Usb(USBOutputReport),
    Bluetooth(BTOutputReport),
}

impl OutputReport {
    pub fn new(conn: ConnectionType, data: SetStateData) -> OutputReport {
        match conn {
            ConnectionType::Bluetooth => {
                let mut report = BTOutputReport {
                    id: BT_OUTPUT_REPORT_ID,
                    hw_control: BT_HW_CONTROL,
                    _audio_control: 0,
                    data,
                    _reserved: [0; 61],
                    crc: [0; 4],
                };
                let bytes = unsafe {
                    std::slice::from_raw_parts_mut(
                        &mut report as *mut _ as *mut u8,
                        std::mem::size_of_val(&report),
                    )
                };
                crc::seal(bytes);
                OutputReport::Bluetooth(report)
            }
            _ => OutputReport::Usb(USBOutputReport {
                id: USB_OUTPUT_REPORT_ID,
                data,
                _reserved: [0; 21],
            }),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            OutputReport::Usb(r) => unsafe {
                std::slice::from_raw_parts(r as *const _ as *const u8, std::mem::size_of_val(r))
            },
            OutputReport::Bluetooth(r) => unsafe {
                std::slice::from_raw_parts(r as *const _ as *const u8, std::mem::size_of_val(r))
            },
        }
    }

    pub fn byte_size(&self) -> usize {
        self.as_bytes().len()
    }
}

/// Everything the controller is told, resent as a whole on every change.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutputState {
    pub lightbar: Color,
    pub flash_on: u8,
    pub flash_off: u8,
    pub rumble_left: u8,
    pub rumble_right: u8,
}

impl OutputState {
    pub fn data(&self) -> SetStateData {
        SetStateData {
            valid_flags: VALID_FLAGS,
            motor_right: self.rumble_right,
            motor_left: self.rumble_left,
            lightbar: [self.lightbar.r, self.lightbar.g, self.lightbar.b],
            flash_on: self.flash_on,
            flash_off: self.flash_off,
            ..SetStateData::default()
        }
    }

    pub fn report(&self, conn: ConnectionType) -> OutputReport {
        OutputReport::new(conn, self.data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> OutputState {
        OutputState {
            lightbar: Color::new(1, 2, 3),
            flash_on: 4,
            flash_off: 5,
            rumble_left: 6,
            rumble_right: 7,
        }
    }

    #[test]
    fn check_layout() {
        assert_eq!(10, std::mem::size_of::<SetStateData>());
        assert_eq!(32, std::mem::size_of::<USBOutputReport>());
        assert_eq!(78, std::mem::size_of::<BTOutputReport>());
    }

    #[test]
    fn usb() {
        let report = state().report(ConnectionType::Usb);
        let bytes = report.as_bytes();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[..11], [0x05, 0x07, 0, 0, 7, 6, 1, 2, 3, 4, 5]);
        assert!(bytes[11..].iter().all(|&b| b == 0));
    }

    #[test]
    fn bluetooth() {
        let report = state().report(ConnectionType::Bluetooth);
        let bytes = report.as_bytes();
        assert_eq!(bytes.len(), 78);
        assert_eq!(bytes[..13], [0x11, 0xC0, 0, 0x07, 0, 0, 7, 6, 1, 2, 3, 4, 5]);
        assert!(crc::verify(crc::OUTPUT_SEED, bytes));
    }
}
