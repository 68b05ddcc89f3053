pub mod crc;
mod dpad;
pub mod raw;
#[cfg(feature = "testing")]
pub mod testing;
pub mod validate;

use hidapi::HidResult;
pub use dpad::Dpad;
pub use sony_gamepad_types::*;

pub const SONY_VENDOR_ID: u16 = 0x054C;

/// Bluetooth HID service class, present in the path of paired devices on Windows.
const BT_HID_SERVICE_GUID: &str = "{00001124-0000-1000-8000-00805f9b34fb}";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionType {
    Usb,
    Bluetooth,
    Unrecognized,
}

impl ConnectionType {
    pub fn from_path(path: &str) -> ConnectionType {
        let lower = path.to_ascii_lowercase();
        if lower.contains(BT_HID_SERVICE_GUID) || lower.contains("bth") {
            ConnectionType::Bluetooth
        } else if path.is_empty() {
            ConnectionType::Unrecognized
        } else {
            ConnectionType::Usb
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeviceType {
    DualSense,
    DualSenseEdge,
    DualShock4,
    NotFound,
}

impl DeviceType {
    pub fn from_product_id(product_id: u16) -> DeviceType {
        match product_id {
            0x0CE6 => DeviceType::DualSense,
            0x0DF2 => DeviceType::DualSenseEdge,
            0x05C4 | 0x09CC => DeviceType::DualShock4,
            _ => DeviceType::NotFound,
        }
    }
}

/// Raw access to an opened HID device.
///
/// Implemented by [`hidapi::HidDevice`]; drivers are generic over it so they
/// can run against recorded reports.
pub trait HidIo {
    /// `timeout` in milliseconds, `-1` blocks. Returns 0 when nothing was read.
    fn read_timeout(&self, buf: &mut [u8], timeout: i32) -> HidResult<usize>;
    fn write(&self, data: &[u8]) -> HidResult<usize>;
    /// `buf[0]` holds the report id.
    fn get_feature_report(&self, buf: &mut [u8]) -> HidResult<usize>;
}

impl HidIo for hidapi::HidDevice {
    fn read_timeout(&self, buf: &mut [u8], timeout: i32) -> HidResult<usize> {
        hidapi::HidDevice::read_timeout(self, buf, timeout)
    }

    fn write(&self, data: &[u8]) -> HidResult<usize> {
        hidapi::HidDevice::write(self, data)
    }

    fn get_feature_report(&self, buf: &mut [u8]) -> HidResult<usize> {
        hidapi::HidDevice::get_feature_report(self, buf)
    }
}

pub trait GamepadDriver {
    fn init(
        &self,
        api: &hidapi::HidApi,
        device_info: &hidapi::DeviceInfo,
    ) -> anyhow::Result<Option<Box<dyn GamepadDevice>>>;
}

pub trait GamepadDevice {
    fn recv(&mut self) -> anyhow::Result<Report>;
    fn is_connected(&self) -> bool;
    fn connection(&self) -> ConnectionType;
    fn device_type(&self) -> DeviceType;
    fn controller_id(&self) -> u32;
    fn set_controller_id(&mut self, id: u32);
    /// First output after the controller id is assigned.
    fn initialize(&mut self) -> anyhow::Result<()>;

    fn set_lightbar(&mut self, color: Color) -> anyhow::Result<()>;
    /// Blink durations in seconds, 0 ... 1. Only honored by controllers
    /// with a hardware flash.
    fn set_lightbar_flash(&mut self, color: Color, on: f32, off: f32) -> anyhow::Result<()> {
        let _ = (on, off);
        self.set_lightbar(color)
    }
    fn set_player_led(&mut self, led: LedPlayer, brightness: LedBrightness) -> anyhow::Result<()>;
    fn set_mic_led(&mut self, led: LedMic) -> anyhow::Result<()>;
    fn set_vibration(&mut self, values: &ForceFeedbackValues) -> anyhow::Result<()>;
    fn settings(&mut self, settings: &DeviceSettings) -> anyhow::Result<()> {
        let _ = settings;
        Ok(())
    }
    /// Restores the default feature mode and the lights identifying the
    /// controller id.
    fn stop_all(&mut self) -> anyhow::Result<()>;
    fn send_out(&mut self) -> anyhow::Result<()>;
    /// Percent, from the last report.
    fn battery(&self) -> f32;

    fn set_touch(&mut self, enable: bool);
    fn touch_enabled(&self) -> bool;
    fn set_motion(&mut self, enable: bool);
    fn motion_enabled(&self) -> bool;

    /// Timeout of the first read of [`GamepadDevice::recv`], in milliseconds.
    fn set_read_timeout(&mut self, timeout: i32);

    fn triggers(&mut self) -> Option<&mut dyn TriggerDevice> {
        None
    }

    /// Drops every pending state, the device must be reopened afterward.
    fn shutdown(&mut self);

    fn as_any(&mut self) -> &mut dyn std::any::Any;
}

/// Adaptive trigger and haptic effects.
///
/// Positions and strengths are in 0 ... 8, frequencies in 0 ... 1.
pub trait TriggerDevice {
    fn set_trigger_property(&mut self, resistance: &TriggerResistance) -> anyhow::Result<()>;
    fn set_haptic_feedback(
        &mut self,
        hand: Hand,
        values: &HapticFeedbackValues,
    ) -> anyhow::Result<()>;
    fn set_resistance(&mut self, begin: u8, middle: u8, end: u8, hand: Hand)
        -> anyhow::Result<()>;
    fn set_automatic_gun(
        &mut self,
        begin: u8,
        middle: u8,
        end: u8,
        hand: Hand,
        keep_effect: bool,
    ) -> anyhow::Result<()>;
    fn set_continuous_resistance(&mut self, start: u8, strength: u8, hand: Hand)
        -> anyhow::Result<()>;
    fn set_section_resistance(&mut self, start: u8, end: u8, strength: u8, hand: Hand)
        -> anyhow::Result<()> {
        self.set_trigger_property(&TriggerResistance {
            start_position: start,
            end_position: end,
            start_strength: strength,
            end_strength: strength,
            affected: hand,
        })
    }
    fn set_galloping(
        &mut self,
        start: u8,
        end: u8,
        first_foot: u8,
        second_foot: u8,
        frequency: f32,
        hand: Hand,
    ) -> anyhow::Result<()>;
    #[allow(clippy::too_many_arguments)]
    fn set_machine(
        &mut self,
        start: u8,
        end: u8,
        amplitude_begin: u8,
        amplitude_end: u8,
        frequency: f32,
        period: f32,
        hand: Hand,
    ) -> anyhow::Result<()>;
    fn set_weapon(&mut self, start: u8, end: u8, strength: u8, hand: Hand) -> anyhow::Result<()>;
    fn set_bow(
        &mut self,
        start: u8,
        end: u8,
        begin_strength: u8,
        end_strength: u8,
        hand: Hand,
    ) -> anyhow::Result<()>;
    fn stop_trigger(&mut self, hand: Hand) -> anyhow::Result<()>;
    /// Rumble driven by an audio envelope, see [`validate::audio_intensity`].
    fn set_vibration_audio_based(
        &mut self,
        values: &ForceFeedbackValues,
        threshold: f32,
        exponent: f32,
        base_multiplier: f32,
    ) -> anyhow::Result<()>;
}
