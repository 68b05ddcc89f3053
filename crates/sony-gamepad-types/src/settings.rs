#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AudioSwitch {
    On = 0x00,
    Off = 0x10,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VibrationMode {
    /// Sent as `DefaultRumble`, the controller has no "off" value.
    Off = 0x00,
    DefaultRumble = 0xFF,
    HapticSoftRumble = 0xFC,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TriggerSoftness {
    Off = 0,
    VeryRigid = 1,
    Rigid = 2,
    Medium = 4,
    Soft = 6,
    VerySoft = 8,
}

/// Per-controller feature configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSettings {
    pub mic_status: AudioSwitch,
    pub audio_headset: AudioSwitch,
    pub audio_speaker: AudioSwitch,
    pub vibration_mode: VibrationMode,
    /// 0 ... 100
    pub mic_volume: u8,
    /// 0 ... 100, used for both headset and speaker
    pub audio_volume: u8,
    /// 0 ... 15
    pub soft_rumble_reduce: u8,
    pub trigger_softness: TriggerSoftness,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            mic_status: AudioSwitch::Off,
            audio_headset: AudioSwitch::Off,
            audio_speaker: AudioSwitch::On,
            vibration_mode: VibrationMode::DefaultRumble,
            mic_volume: 0,
            audio_volume: 0,
            soft_rumble_reduce: 0,
            trigger_softness: TriggerSoftness::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceSetting {
    MicStatus(AudioSwitch),
    AudioHeadset(AudioSwitch),
    AudioSpeaker(AudioSwitch),
    VibrationMode(VibrationMode),
    MicVolume(u8),
    AudioVolume(u8),
    SoftRumbleReduce(u8),
    TriggerSoftness(TriggerSoftness),
}

impl DeviceSettings {
    pub fn apply(&mut self, setting: DeviceSetting) {
        match setting {
            DeviceSetting::MicStatus(s) => self.mic_status = s,
            DeviceSetting::AudioHeadset(s) => self.audio_headset = s,
            DeviceSetting::AudioSpeaker(s) => self.audio_speaker = s,
            DeviceSetting::VibrationMode(m) => self.vibration_mode = m,
            DeviceSetting::MicVolume(v) => self.mic_volume = v.min(100),
            DeviceSetting::AudioVolume(v) => self.audio_volume = v.min(100),
            DeviceSetting::SoftRumbleReduce(v) => self.soft_rumble_reduce = v.min(15),
            DeviceSetting::TriggerSoftness(s) => self.trigger_softness = s,
        }
    }
}

#[test]
fn apply_clamps_ranges() {
    let mut settings = DeviceSettings::default();
    settings.apply(DeviceSetting::SoftRumbleReduce(40));
    settings.apply(DeviceSetting::AudioVolume(200));
    settings.apply(DeviceSetting::AudioHeadset(AudioSwitch::On));
    assert_eq!(settings.soft_rumble_reduce, 15);
    assert_eq!(settings.audio_volume, 100);
    assert_eq!(settings.audio_headset, AudioSwitch::On);
    assert_eq!(settings.trigger_softness, TriggerSoftness::Medium);
}
