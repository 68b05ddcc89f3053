use std::fmt;

use bitfield::bitfield;
use cgmath::{vec3, Vector3};
use sony_gamepad_sys::{crc, Battery, Dpad, TouchPoint};

pub use sony_gamepad_sys::raw::{Finger, FingerCoord, Stick, Trigger};

use crate::{
    ConnectionType, RawId, BT_INPUT_REPORT_SIZE, BT_SIMPLE_INPUT_REPORT_SIZE, I16LE, U32LE,
    USB_INPUT_REPORT_SIZE,
};

/// LSB per deg/s.
pub const GYRO_RESOLUTION: f64 = 1024.;
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

    /// Guess the transport from the size of a read.
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

    /// Only sent over Bluetooth before the calibration is read.
    pub fn bt_simple(&self) -> Option<&BTSimpleReport> {
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

    /// Full state of the controller, whatever the transport.
    pub fn state(&self, conn: ConnectionType) -> Option<&InputState> {
        match conn {
            ConnectionType::Usb => self.usb_full().map(|r| &r.state),
            ConnectionType::Bluetooth => self.bt_full().map(|r| &r.state),
            ConnectionType::Unrecognized => None,
        }
    }

    /// Bluetooth full reports carry a CRC, everything else is trusted.
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
    Full = 0x31,
}

#[repr(packed)]
#[derive(Clone, Copy)]
union InputReportData {
    usb: USBReport,
    simple: BTSimpleReport,
    bt: BTFullReport,
}

#[repr(packed)]
#[derive(Debug, Clone, Copy)]
pub struct USBReport {
    pub state: InputState,
}

#[repr(packed)]
#[derive(Debug, Clone, Copy)]
pub struct BTSimpleReport {
    pub left_stick: Stick,
    pub right_stick: Stick,
    pub buttons: Buttons<[u8; 3]>,
    pub left_trigger: Trigger,
    pub right_trigger: Trigger,
}

#[repr(packed)]
#[derive(Debug, Clone, Copy)]
pub struct BTFullReport {
    _seq_tag: u8,
    pub state: InputState,
    _reserved: [u8; 9],
    crc: U32LE,
}

#[repr(packed)]
#[derive(Debug, Clone, Copy)]
pub struct InputState {
    pub left_stick: Stick,
    pub right_stick: Stick,
    pub left_trigger: Trigger,
    pub right_trigger: Trigger,
    pub seq_number: u8,
    pub buttons: Buttons<[u8; 3]>,
    _buttons_reserved: u8,
    _reserved: [u8; 4],
    pub gyro: Gyro,
    pub accel: Accel,
    pub sensor_timestamp: U32LE,
    _reserved2: u8,
    pub touch: [Finger; 2],
    _reserved3: [u8; 12],
    pub status: Status,
    pub peripherals: Peripherals,
    _reserved4: [u8; 9],
}

impl InputState {
    pub fn touch_points(&self) -> [TouchPoint; 2] {
        [self.touch[0].point(), self.touch[1].point()]
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
    pub create, _: 12;
    pub options, _: 13;
    pub l3, _: 14;
    pub r3, _: 15;
    pub ps, _: 16;
    pub touchpad, _: 17;
    pub mic, _: 18;
    pub fn_left, _: 20;
    pub fn_right, _: 21;
    pub paddle_left, _: 22;
    pub paddle_right, _: 23;
}

bitfield! {
    #[repr(transparent)]
    #[derive(Copy, Clone, Default)]
    pub struct Status(u8);
    impl Debug;
    u8;
    pub battery_level, _: 3, 0;
    pub power_state_raw, _: 7, 4;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, FromPrimitive)]
pub enum PowerState {
    Discharging = 0x0,
    Charging = 0x1,
    Complete = 0x2,
    AbnormalVoltage = 0xA,
    AbnormalTemperature = 0xB,
    ChargingError = 0xF,
}

impl Status {
    pub fn power_state(&self) -> Option<PowerState> {
        num::FromPrimitive::from_u8(self.power_state_raw())
    }

    /// Level is reported in tenths, rounded to the middle of the range.
    pub fn battery(&self) -> Battery {
        let state = self.power_state();
        let level = match state {
            Some(PowerState::Complete) => 100.,
            _ => (self.battery_level() as f32 * 10. + 5.).min(100.),
        };
        Battery {
            level,
            charging: state == Some(PowerState::Charging),
            fully_charged: state == Some(PowerState::Complete),
        }
    }
}

bitfield! {
    #[repr(transparent)]
    #[derive(Copy, Clone, Default)]
    pub struct Peripherals(u8);
    impl Debug;
    pub headset, _: 0;
    pub headphones, _: 1;
    pub mic_muted, _: 2;
}

#[repr(packed)]
#[derive(Debug, Clone, Copy)]
pub struct Gyro {
    pitch: I16LE,
    yaw: I16LE,
    roll: I16LE,
}

impl Gyro {
    /// SDL convention, deg/s.
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
    /// SDL convention, in g.
    pub fn normalize(&self) -> Vector3<f64> {
        vec3(
            i16::from(self.x) as f64,
            i16::from(self.y) as f64,
            i16::from(self.z) as f64,
        ) / ACCEL_RESOLUTION
    }
}
