use std::fmt;

use bitfield::bitfield;
use cgmath::{vec3, Vector3};
use sony_gamepad_sys::{crc, Battery, Dpad, TouchPoint};

pub use sony_gamepad_sys::raw::{Finger, Stick, Trigger};

use crate::{
    ConnectionType, RawId, BT_INPUT_REPORT_SIZE, BT_SIMPLE_INPUT_REPORT_SIZE, I16LE, U32LE,
    USB_INPUT_REPORT_SIZE,
};

/// LSB per deg/s, 2000 deg/s full scale.
pub const GYRO_RESOLUTION: f64 = 32768. / 2000.;
/// LSB per g.
pub const ACCEL_RESOLUTION: f64 = 8192.;

#[repr(packed)]
#[derive(Clone, Copy)]
pub struct InputReport {
    id: RawId<InputReportId>,
    u: InputReportData,
}

impl InputReport {
    pub fn new() -> InputReport {
        unsafe { std::mem::zeroed() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts(self as *const _ as *const u8, std::mem::size_of_val(self))
        }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe {
            std::slice::from_raw_parts_mut(self as *mut _ as *mut u8, std::mem::size_of_val(self))
        }
    }

    pub fn id(&self) -> RawId<InputReportId> {
        self.id
    }

    pub fn conn_type(nb_read: usize) -> ConnectionType {
        match nb_read {
            BT_INPUT_REPORT_SIZE | BT_SIMPLE_INPUT_REPORT_SIZE => ConnectionType::Bluetooth,
            USB_INPUT_REPORT_SIZE => ConnectionType::Usb,
            _ => ConnectionType::Unrecognized,
        }
    }

    pub fn usb_full(&self) -> Option<&USBReport> {
        if self.id == InputReportId::Simple {
            Some(unsafe { &self.u.usb })
        } else {
            None
        }
    }

    pub fn bt_simple(&self) -> Option<&SimpleReport> {
        if self.id == InputReportId::Simple {
            Some(unsafe { &self.u.simple })
        } else {
            None
        }
    }

    pub fn bt_full(&self) -> Option<&BTFullReport> {
        if self.id == InputReportId::Full {
            Some(unsafe { &self.u.bt })
        } else {
            None
        }
    }

    pub fn state(&self, conn: ConnectionType) -> Option<&InputState> {
        match conn {
            ConnectionType::Usb => self.usb_full().map(|r| &r.state),
            ConnectionType::Bluetooth => self.bt_full().map(|r| &r.state),
            ConnectionType::Unrecognized => None,
        }
    }

    pub fn validate(&self) -> bool {
        if self.id == InputReportId::Full {
            crc::verify(crc::INPUT_SEED, self.as_bytes())
        } else {
            true
        }
    }
}

impl Default for InputReport {
    fn default() -> Self {
        InputReport::new()
    }
}

impl fmt::Debug for InputReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.id.try_into() {
            Some(InputReportId::Simple) => self.usb_full().fmt(f),
            Some(InputReportId::Full) => self.bt_full().fmt(f),
            None => f.debug_tuple("InputReport").field(&self.id).finish(),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum InputReportId {
    Simple = 0x01,
    Full = 0x11,
}

#[repr(packed)]
#[derive(Clone, Copy)]
union InputReportData {
    usb: USBReport,
    simple: SimpleReport,
    bt: BTFullReport,
}

#[repr(packed)]
#[derive(Debug, Clone, Copy)]
pub struct USBReport {
    pub state: InputState,
    _reserved: [u8; 3],
}

#[repr(packed)]
#[derive(Debug, Clone, Copy)]
pub struct BTFullReport {
    _flags: [u8; 2],
    pub state: InputState,
    _extra_touch: TouchPacket,
    _reserved: [u8; 2],
    crc: U32LE,
}

/// Also the whole payload of the Bluetooth report 0x01.
#[repr(packed)]
#[derive(Debug, Clone, Copy)]
pub struct SimpleReport {
    pub left_stick: Stick,
    pub right_stick: Stick,
    pub buttons: Buttons<[u8; 3]>,
    pub left_trigger: Trigger,
    pub right_trigger: Trigger,
}

#[repr(packed)]
#[derive(Debug, Clone, Copy)]
pub struct InputState {
    pub base: SimpleReport,
    _sensor_timestamp: [u8; 2],
    _temperature: u8,
    pub gyro: Gyro,
    pub accel: Accel,
    _reserved: [u8; 5],
    pub status: Status,
    _reserved2: [u8; 2],
    pub touch_count: u8,
    pub touch: [TouchPacket; 3],
}

impl InputState {
    /// Fingers of the oldest pending packet.
    pub fn touch_points(&self) -> [TouchPoint; 2] {
        let fingers = self.touch[0].fingers;
        [fingers[0].point(), fingers[1].point()]
    }
}

bitfield! {
    #[repr(transparent)]
    #[derive(Copy, Clone, Default)]
    pub struct Buttons([u8]);
    impl Debug;
    u8;
    pub u8, into Dpad, dpad, _: 3, 0;
    pub square, _: 4;
    pub cross, _: 5;
    pub circle, _: 6;
    pub triangle, _: 7;
    pub l1, _: 8;
    pub r1, _: 9;
    pub l2, _: 10;
    pub r2, _: 11;
    pub share, _: 12;
    pub options, _: 13;
    pub l3, _: 14;
    pub r3, _: 15;
    pub ps, _: 16;
    pub touchpad, _: 17;
    pub counter, _: 23, 18;
}

bitfield! {
    #[repr(transparent)]
    #[derive(Copy, Clone, Default)]
    pub struct Status(u8);
    impl Debug;
    u8;
    pub battery_level, _: 3, 0;
    pub cable, _: 4;
    pub headphones, _: 5;
    pub mic, _: 6;
}

impl Status {
    /// Level 11 only happens on cable, once charged.
    pub fn battery(&self) -> Battery {
        let level = self.battery_level();
        Battery {
            level: (level as f32 * 10. + 5.).min(100.),
            charging: self.cable() && level <= 10,
            fully_charged: self.cable() && level == 11,
        }
    }
}

#[repr(packed)]
#[derive(Debug, Clone, Copy)]
pub struct TouchPacket {
    pub counter: u8,
    pub fingers: [Finger; 2],
}

#[repr(packed)]
#[derive(Debug, Clone, Copy)]
pub struct Gyro {
    pitch: I16LE,
    yaw: I16LE,
    roll: I16LE,
}

impl Gyro {
    /// deg/s
    pub fn normalize(&self) -> Vector3<f64> {
        vec3(
            i16::from(self.pitch) as f64,
            i16::from(self.yaw) as f64,
            i16::from(self.roll) as f64,
        ) / GYRO_RESOLUTION
    }
}

#[repr(packed)]
#[derive(Debug, Clone, Copy)]
pub struct Accel {
    x: I16LE,
    y: I16LE,
    z: I16LE,
}

impl Accel {
    /// In g.
    pub fn normalize(&self) -> Vector3<f64> {
        vec3(
            i16::from(self.x) as f64,
            i16::from(self.y) as f64,
            i16::from(self.z) as f64,
        ) / ACCEL_RESOLUTION
    }
}
