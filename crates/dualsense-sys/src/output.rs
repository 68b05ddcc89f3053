//! Structs binary compatible with the HID output reports

use std::fmt;

use sony_gamepad_sys::{
    crc, AudioSwitch, Color, DeviceSettings, LedBrightness, LedMic, LedPlayer, VibrationMode,
};

use crate::{
    trigger::{RawTrigger, TriggerEffect},
    ConnectionType,
};

pub const USB_OUTPUT_REPORT_ID: u8 = 0x02;
pub const BT_OUTPUT_REPORT_ID: u8 = 0x31;
pub const BT_OUTPUT_TAG: u8 = 0x02;

/// Player LEDs fade in when this bit is absent.
const PLAYER_LED_INSTANT: u8 = 0x20;
const VALID_FLAG2_LIGHTBAR_SETUP: u8 = 0x04;

pub const FEATURE_MODE_DEFAULT: u8 = 0xF7;
/// Resets every LED and motor, sent once over Bluetooth before the normal mode.
pub const FEATURE_MODE_RESET: u8 = 0x01 | 0x02 | 0x04 | 0x08 | 0x10 | 0x40;

pub const AUDIO_MODE_HEADSET: u8 = 0x05;
pub const AUDIO_MODE_HEADSET_AND_SPEAKER: u8 = 0x21;
pub const AUDIO_MODE_SPEAKER: u8 = 0x31;

/// Common part of the USB and Bluetooth output reports.
#[repr(packed)]
#[derive(Clone, Copy, Default)]
pub struct SetStateData {
    pub vibration_mode: u8,
    pub feature_mode: u8,
    pub motor_right: u8,
    pub motor_left: u8,
    pub headphone_volume: u8,
    pub speaker_volume: u8,
    pub mic_volume: u8,
    pub audio_mode: u8,
    pub mic_led: u8,
    pub mic_status: u8,
    pub right_trigger: RawTrigger,
    pub left_trigger: RawTrigger,
    _reserved: [u8; 4],
    /// `softness << 4 | rumble reduction`
    pub haptic_attenuation: u8,
    pub audio_control2: u8,
    pub valid_flag2: u8,
    _reserved2: [u8; 2],
    pub lightbar_setup: u8,
    pub led_brightness: u8,
    pub player_leds: u8,
    pub lightbar: [u8; 3],
}

impl fmt::Debug for SetStateData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (right_trigger, left_trigger, lightbar) =
            (self.right_trigger, self.left_trigger, self.lightbar);
        f.debug_struct("SetStateData")
            .field("vibration_mode", &format_args!("0x{:02x}", self.vibration_mode))
            .field("feature_mode", &format_args!("0x{:02x}", self.feature_mode))
            .field("motors", &(self.motor_left, self.motor_right))
            .field("audio_mode", &format_args!("0x{:02x}", self.audio_mode))
            .field("right_trigger", &right_trigger)
            .field("left_trigger", &left_trigger)
            .field("player_leds", &format_args!("0x{:02x}", self.player_leds))
            .field("lightbar", &lightbar)
            .finish()
    }
}

/// Padded to the 63 bytes declared by the USB report descriptor.
#[repr(packed)]
#[derive(Clone, Copy, Debug)]
pub struct USBOutputReport {
    pub id: u8,
    pub data: SetStateData,
    _reserved: [u8; 15],
}

#[repr(packed)]
#[derive(Clone, Copy, Debug)]
pub struct BTOutputReport {
    pub id: u8,
    pub tag: u8,
    pub data: SetStateData,
    _reserved: [u8; 25],
    crc: [u8; 4],
}

#[derive(Clone, Copy, Debug)]
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
                    tag: BT_OUTPUT_TAG,
                    data,
                    _reserved: [0; 25],
                    crc: [0; 4],
                };
                crc::seal(report.as_bytes_mut());
                OutputReport::Bluetooth(report)
            }
            _ => OutputReport::Usb(USBOutputReport {
                id: USB_OUTPUT_REPORT_ID,
                data,
                _reserved: [0; 15],
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

    pub fn data(&self) -> &SetStateData {
        match self {
            OutputReport::Usb(r) => &r.data,
            OutputReport::Bluetooth(r) => &r.data,
        }
    }

    pub fn byte_size(&self) -> usize {
        self.as_bytes().len()
    }
}

impl BTOutputReport {
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe {
            std::slice::from_raw_parts_mut(self as *mut _ as *mut u8, std::mem::size_of_val(self))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConfig {
    pub mode: u8,
    pub headset_volume: u8,
    pub speaker_volume: u8,
    pub mic_volume: u8,
    pub mic_status: u8,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            mode: AUDIO_MODE_SPEAKER,
            headset_volume: 0x7C,
            speaker_volume: 0x7C,
            mic_volume: 0x7C,
            mic_status: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureConfig {
    pub feature_mode: u8,
    pub vibration_mode: u8,
    /// 0 ... 15
    pub soft_rumble_reduce: u8,
    pub trigger_softness: u8,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            feature_mode: FEATURE_MODE_DEFAULT,
            vibration_mode: VibrationMode::HapticSoftRumble as u8,
            soft_rumble_reduce: 0,
            trigger_softness: 0,
        }
    }
}

/// Everything the host controls on a DualSense, serialized in every output report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputState {
    pub lightbar: Color,
    pub mic_led: LedMic,
    pub player_led: LedPlayer,
    pub player_brightness: LedBrightness,
    pub rumble_left: u8,
    pub rumble_right: u8,
    pub audio: AudioConfig,
    pub feature: FeatureConfig,
    pub left_trigger: TriggerEffect,
    pub right_trigger: TriggerEffect,
}

impl Default for OutputState {
    fn default() -> Self {
        Self {
            lightbar: Color::BLACK,
            mic_led: LedMic::Off,
            player_led: LedPlayer::Off,
            player_brightness: LedBrightness::High,
            rumble_left: 0,
            rumble_right: 0,
            audio: AudioConfig::default(),
            feature: FeatureConfig::default(),
            left_trigger: TriggerEffect::Off,
            right_trigger: TriggerEffect::Off,
        }
    }
}

impl OutputState {
    pub fn apply_settings(&mut self, settings: &DeviceSettings) {
        self.feature.vibration_mode = match settings.vibration_mode {
            VibrationMode::Off => VibrationMode::DefaultRumble as u8,
            mode => mode as u8,
        };
        self.feature.soft_rumble_reduce = settings.soft_rumble_reduce & 0x0F;
        self.feature.trigger_softness = settings.trigger_softness as u8;
        self.audio.mic_status = settings.mic_status as u8;
        self.audio.mic_volume = settings.mic_volume;
        self.audio.headset_volume = settings.audio_volume;
        self.audio.speaker_volume = settings.audio_volume;
        match (settings.audio_headset, settings.audio_speaker) {
            (AudioSwitch::On, AudioSwitch::Off) => self.audio.mode = AUDIO_MODE_HEADSET,
            (AudioSwitch::On, AudioSwitch::On) => {
                self.audio.mode = AUDIO_MODE_HEADSET_AND_SPEAKER
            }
            (AudioSwitch::Off, AudioSwitch::On) => self.audio.mode = AUDIO_MODE_SPEAKER,
            (AudioSwitch::Off, AudioSwitch::Off) => {}
        }
    }

    pub fn data(&self, conn: ConnectionType) -> SetStateData {
        let mut data = SetStateData {
            vibration_mode: self.feature.vibration_mode,
            feature_mode: self.feature.feature_mode,
            motor_right: self.rumble_right,
            motor_left: self.rumble_left,
            mic_led: self.mic_led as u8,
            right_trigger: self.right_trigger.encode(),
            left_trigger: self.left_trigger.encode(),
            haptic_attenuation: (self.feature.trigger_softness << 4)
                | (self.feature.soft_rumble_reduce & 0x0F),
            valid_flag2: VALID_FLAG2_LIGHTBAR_SETUP,
            led_brightness: self.player_brightness as u8,
            player_leds: self.player_led as u8 | PLAYER_LED_INSTANT,
            lightbar: [self.lightbar.r, self.lightbar.g, self.lightbar.b],
            ..SetStateData::default()
        };
        // Audio routing is only accepted over USB.
        if conn != ConnectionType::Bluetooth {
            data.headphone_volume = self.audio.headset_volume;
            data.speaker_volume = self.audio.speaker_volume;
            data.mic_volume = self.audio.mic_volume;
            data.audio_mode = self.audio.mode;
            data.mic_status = self.audio.mic_status;
        }
        data
    }

    pub fn report(&self, conn: ConnectionType) -> OutputReport {
        OutputReport::new(conn, self.data(conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset_of;
    use sony_gamepad_sys::{TriggerSoftness, VibrationMode};

    #[test]
    fn check_layout() {
        let data = SetStateData::default();
        assert_eq!(47, std::mem::size_of_val(&data));
        assert_eq!(10, offset_of(&data, &data.right_trigger));
        assert_eq!(21, offset_of(&data, &data.left_trigger));
        assert_eq!(36, offset_of(&data, &data.haptic_attenuation));
        assert_eq!(38, offset_of(&data, &data.valid_flag2));
        assert_eq!(41, offset_of(&data, &data.lightbar_setup));
        assert_eq!(44, offset_of(&data, &data.lightbar));

        let usb = OutputState::default().report(ConnectionType::Usb);
        assert_eq!(63, usb.byte_size());
        let bt = OutputState::default().report(ConnectionType::Bluetooth);
        assert_eq!(78, bt.byte_size());
        if let OutputReport::Bluetooth(r) = &bt {
            assert_eq!(2, offset_of(r, &r.data));
            assert_eq!(74, offset_of(r, &r.crc));
        }
    }

    #[test]
    fn usb_report_bytes() {
        let state = OutputState {
            lightbar: Color::new(1, 2, 3),
            player_led: LedPlayer::Two,
            rumble_left: 200,
            rumble_right: 100,
            mic_led: LedMic::Pulse,
            ..OutputState::default()
        };
        let report = state.report(ConnectionType::Usb);
        let b = report.as_bytes();
        assert_eq!(b[0], 0x02);
        let d = &b[1..];
        assert_eq!(d[0], 0xFC);
        assert_eq!(d[1], 0xF7);
        assert_eq!(d[2], 100);
        assert_eq!(d[3], 200);
        assert_eq!(d[4..8], [0x7C, 0x7C, 0x7C, 0x31]);
        assert_eq!(d[8], 2);
        assert_eq!(d[38], 0x04);
        assert_eq!(d[43], 0x0A | 0x20);
        assert_eq!(d[44..47], [1, 2, 3]);
    }

    #[test]
    fn bluetooth_report_is_sealed() {
        let report = OutputState::default().report(ConnectionType::Bluetooth);
        let b = report.as_bytes();
        assert_eq!(b[..2], [0x31, 0x02]);
        // No audio over Bluetooth.
        assert_eq!(b[2 + 4..2 + 8], [0, 0, 0, 0]);
        assert!(crc::verify(crc::OUTPUT_SEED, b));
    }

    #[test]
    fn settings_mapping() {
        let mut state = OutputState::default();
        state.apply_settings(&DeviceSettings {
            audio_headset: AudioSwitch::On,
            audio_speaker: AudioSwitch::Off,
            vibration_mode: VibrationMode::Off,
            audio_volume: 60,
            mic_volume: 30,
            soft_rumble_reduce: 3,
            trigger_softness: TriggerSoftness::Soft,
            ..DeviceSettings::default()
        });
        assert_eq!(state.audio.mode, AUDIO_MODE_HEADSET);
        assert_eq!(state.feature.vibration_mode, 0xFF);
        assert_eq!(state.audio.headset_volume, 60);
        assert_eq!(state.audio.speaker_volume, 60);
        assert_eq!(state.audio.mic_volume, 30);
        assert_eq!(state.data(ConnectionType::Usb).haptic_attenuation, 0x63);

        state.apply_settings(&DeviceSettings {
            audio_headset: AudioSwitch::On,
            audio_speaker: AudioSwitch::On,
            ..DeviceSettings::default()
        });
        assert_eq!(state.audio.mode, AUDIO_MODE_HEADSET_AND_SPEAKER);

        state.apply_settings(&DeviceSettings {
            audio_headset: AudioSwitch::Off,
            audio_speaker: AudioSwitch::Off,
            ..DeviceSettings::default()
        });
        assert_eq!(state.audio.mode, AUDIO_MODE_HEADSET_AND_SPEAKER);

        state.apply_settings(&DeviceSettings::default());
        assert_eq!(state.audio.mode, AUDIO_MODE_SPEAKER);
    }
}
