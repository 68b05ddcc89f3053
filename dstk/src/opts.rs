use clap::{ArgEnum, Args, Parser, Subcommand};
use sony_gamepad::sys::{
    AudioSwitch, Color, DeviceSetting, Hand, LedBrightness, LedMic, LedPlayer, TriggerSoftness,
    VibrationMode,
};

/// Access every feature of the DualSense and DualShock 4 controllers
///
/// Env variables:
///
/// - `RUST_LOG=<level>`:
///
///   -   `trace`: log every HID report
///
///   -   `debug`: only log state changes
///
/// - `LOG_PRETTY=1`: use a more verbose logging format
///
/// - `LOG_TIMING=1`: show timings
#[derive(Parser)]
#[clap(version)]
pub struct Opts {
    #[clap(subcommand)]
    pub subcmd: SubCommand,
    /// Controller to use, in discovery order
    #[clap(short, long, default_value = "0")]
    pub controller: u32,
    /// Wait for a controller to connect
    #[clap(short, long)]
    pub wait: bool,
    /// Time between two polls of the controllers, in milliseconds
    #[clap(long, default_value = "33")]
    pub poll_ms: u64,
}

#[derive(Subcommand)]
pub enum SubCommand {
    /// List the connected controllers
    List,
    /// Show live inputs from the controller
    Monitor(Monitor),
    /// Print the battery level
    Battery,
    /// Change the color of the lightbar
    Lightbar(Lightbar),
    /// Light the player LEDs under the touchpad
    PlayerLed(PlayerLed),
    MicLed(MicLed),
    /// Run the rumble motors for a while
    Rumble(Rumble),
    /// Apply an adaptive trigger effect (DualSense only)
    Trigger(Trigger),
    /// Configure audio, vibration and trigger softness (DualSense only)
    Settings(Settings),
    /// Stop every effect and restore the default lights
    Reset,
}

#[derive(Args)]
pub struct Monitor {
    /// Show touchpad events
    #[clap(short, long)]
    pub touch: bool,
    /// Show gyroscope and accelerometer values
    #[clap(short, long)]
    pub motion: bool,
}

#[derive(Args)]
pub struct Lightbar {
    /// In `RRGGBB` format
    pub color: Color,
    /// Blink on duration in seconds, 0 ... 1 (DualShock 4 only)
    #[clap(long, default_value = "0")]
    pub on: f32,
    /// Blink off duration in seconds, 0 ... 1 (DualShock 4 only)
    #[clap(long, default_value = "0")]
    pub off: f32,
}

#[derive(Args)]
pub struct PlayerLed {
    #[clap(arg_enum)]
    pub led: PlayerLedArg,
    #[clap(short, long, arg_enum, default_value = "high")]
    pub brightness: BrightnessArg,
}

#[derive(Args)]
pub struct MicLed {
    #[clap(arg_enum)]
    pub led: MicLedArg,
}

#[derive(Args)]
pub struct Rumble {
    /// Strength of the left (large) motor, 0 ... 1
    pub left: f32,
    /// Strength of the right (small) motor, 0 ... 1
    pub right: f32,
    #[clap(short, long, default_value = "1000")]
    pub duration_ms: u64,
}

#[derive(Args)]
pub struct Trigger {
    #[clap(arg_enum)]
    pub hand: HandArg,
    #[clap(subcommand)]
    pub effect: Effect,
}

/// Positions and strengths are in 0 ... 8, frequencies in 0 ... 1
#[derive(Subcommand)]
pub enum Effect {
    Off,
    /// Strength of the start, middle and end of the course
    Feedback { begin: i32, middle: i32, end: i32 },
    /// Constant strength between two positions
    Resistance { start: i32, end: i32, strength: i32 },
    AutomaticGun {
        begin: i32,
        middle: i32,
        end: i32,
        /// Vibrate until the end of the course
        #[clap(long)]
        keep: bool,
    },
    Continuous { start: i32, strength: i32 },
    Galloping {
        start: i32,
        end: i32,
        first_foot: i32,
        second_foot: i32,
        frequency: f32,
    },
    Machine {
        start: i32,
        end: i32,
        amplitude_begin: i32,
        amplitude_end: i32,
        frequency: f32,
        /// In seconds, 0 ... 3
        period: f32,
    },
    Weapon { start: i32, end: i32, strength: i32 },
    Bow {
        start: i32,
        end: i32,
        begin_strength: i32,
        end_strength: i32,
    },
}

#[derive(Args)]
pub struct Settings {
    #[clap(long, arg_enum)]
    pub mic: Option<Switch>,
    #[clap(long, arg_enum)]
    pub headset: Option<Switch>,
    #[clap(long, arg_enum)]
    pub speaker: Option<Switch>,
    #[clap(long, arg_enum)]
    pub vibration: Option<VibrationArg>,
    /// 0 ... 100
    #[clap(long)]
    pub mic_volume: Option<u8>,
    /// Headset and speaker volume, 0 ... 100
    #[clap(long)]
    pub audio_volume: Option<u8>,
    /// 0 ... 15
    #[clap(long)]
    pub rumble_reduce: Option<u8>,
    #[clap(long, arg_enum)]
    pub softness: Option<SoftnessArg>,
}

impl Settings {
    pub fn changes(&self) -> Vec<DeviceSetting> {
        let mut changes = Vec::new();
        if let Some(s) = self.mic {
            changes.push(DeviceSetting::MicStatus(s.into()));
        }
        if let Some(s) = self.headset {
            changes.push(DeviceSetting::AudioHeadset(s.into()));
        }
        if let Some(s) = self.speaker {
            changes.push(DeviceSetting::AudioSpeaker(s.into()));
        }
        if let Some(m) = self.vibration {
            changes.push(DeviceSetting::VibrationMode(m.into()));
        }
        if let Some(v) = self.mic_volume {
            changes.push(DeviceSetting::MicVolume(v));
        }
        if let Some(v) = self.audio_volume {
            changes.push(DeviceSetting::AudioVolume(v));
        }
        if let Some(v) = self.rumble_reduce {
            changes.push(DeviceSetting::SoftRumbleReduce(v));
        }
        if let Some(s) = self.softness {
            changes.push(DeviceSetting::TriggerSoftness(s.into()));
        }
        changes
    }
}

#[derive(ArgEnum, Clone, Copy)]
pub enum HandArg {
    Left,
    Right,
    Both,
}

impl From<HandArg> for Hand {
    fn from(h: HandArg) -> Self {
        match h {
            HandArg::Left => Hand::Left,
            HandArg::Right => Hand::Right,
            HandArg::Both => Hand::Any,
        }
    }
}

#[derive(ArgEnum, Clone, Copy)]
pub enum PlayerLedArg {
    Off,
    One,
    Two,
    Three,
    Four,
    All,
}

impl From<PlayerLedArg> for LedPlayer {
    fn from(l: PlayerLedArg) -> Self {
        match l {
            PlayerLedArg::Off => LedPlayer::Off,
            PlayerLedArg::One => LedPlayer::One,
            PlayerLedArg::Two => LedPlayer::Two,
            PlayerLedArg::Three => LedPlayer::Three,
            PlayerLedArg::Four => LedPlayer::Four,
            PlayerLedArg::All => LedPlayer::All,
        }
    }
}

#[derive(ArgEnum, Clone, Copy)]
pub enum BrightnessArg {
    High,
    Medium,
    Low,
}

impl From<BrightnessArg> for LedBrightness {
    fn from(b: BrightnessArg) -> Self {
        match b {
            BrightnessArg::High => LedBrightness::High,
            BrightnessArg::Medium => LedBrightness::Medium,
            BrightnessArg::Low => LedBrightness::Low,
        }
    }
}

#[derive(ArgEnum, Clone, Copy)]
pub enum MicLedArg {
    Off,
    On,
    Pulse,
}

impl From<MicLedArg> for LedMic {
    fn from(m: MicLedArg) -> Self {
        match m {
            MicLedArg::Off => LedMic::Off,
            MicLedArg::On => LedMic::On,
            MicLedArg::Pulse => LedMic::Pulse,
        }
    }
}

#[derive(ArgEnum, Clone, Copy)]
pub enum Switch {
    On,
    Off,
}

impl From<Switch> for AudioSwitch {
    fn from(s: Switch) -> Self {
        match s {
            Switch::On => AudioSwitch::On,
            Switch::Off => AudioSwitch::Off,
        }
    }
}

#[derive(ArgEnum, Clone, Copy)]
pub enum VibrationArg {
    Off,
    Default,
    Soft,
}

impl From<VibrationArg> for VibrationMode {
    fn from(v: VibrationArg) -> Self {
        match v {
            VibrationArg::Off => VibrationMode::Off,
            VibrationArg::Default => VibrationMode::DefaultRumble,
            VibrationArg::Soft => VibrationMode::HapticSoftRumble,
        }
    }
}

#[derive(ArgEnum, Clone, Copy)]
pub enum SoftnessArg {
    Off,
    VeryRigid,
    Rigid,
    Medium,
    Soft,
    VerySoft,
}

impl From<SoftnessArg> for TriggerSoftness {
    fn from(s: SoftnessArg) -> Self {
        match s {
            SoftnessArg::Off => TriggerSoftness::Off,
            SoftnessArg::VeryRigid => TriggerSoftness::VeryRigid,
            SoftnessArg::Rigid => TriggerSoftness::Rigid,
            SoftnessArg::Medium => TriggerSoftness::Medium,
            SoftnessArg::Soft => TriggerSoftness::Soft,
            SoftnessArg::VerySoft => TriggerSoftness::VerySoft,
        }
    }
}
