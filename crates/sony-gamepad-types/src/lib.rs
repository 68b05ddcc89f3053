mod feedback;
mod settings;

use std::{fmt, ops::Mul, time::Duration};

use cgmath::{vec3, Deg, Euler, InnerSpace, Vector2, Vector3, Zero};
use enum_map::{Enum, EnumMap};

pub use feedback::*;
pub use settings::*;

/// Standard gravity, used to scale normalized acceleration.
pub const GRAVITY: f64 = 9.81;

#[derive(Enum, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GamepadKey {
    Cross,
    Square,
    Circle,
    Triangle,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
    L1,
    R1,
    L2,
    R2,
    L3,
    R3,
    Options,
    Create,
    PlayStation,
    TouchPad,
    Mic,
    FnLeft,
    FnRight,
    PaddleLeft,
    PaddleRight,
}

impl GamepadKey {
    /// Name under which the key is exposed to a host application.
    pub fn name(self) -> &'static str {
        match self {
            GamepadKey::Cross => "FaceButtonBottom",
            GamepadKey::Square => "FaceButtonLeft",
            GamepadKey::Circle => "FaceButtonRight",
            GamepadKey::Triangle => "FaceButtonTop",
            GamepadKey::DPadUp => "DPadUp",
            GamepadKey::DPadDown => "DPadDown",
            GamepadKey::DPadLeft => "DPadLeft",
            GamepadKey::DPadRight => "DPadRight",
            GamepadKey::L1 => "LeftShoulder",
            GamepadKey::R1 => "RightShoulder",
            GamepadKey::L2 => "LeftTriggerThreshold",
            GamepadKey::R2 => "RightTriggerThreshold",
            GamepadKey::L3 => "LeftThumb",
            GamepadKey::R3 => "RightThumb",
            GamepadKey::Options => "SpecialRight",
            GamepadKey::Create => "SpecialLeft",
            GamepadKey::PlayStation => "PS_Button",
            GamepadKey::TouchPad => "PS_TouchButtom",
            GamepadKey::Mic => "PS_Mic",
            GamepadKey::FnLeft => "PS_FunctionL",
            GamepadKey::FnRight => "PS_FunctionR",
            GamepadKey::PaddleLeft => "PS_PaddleL",
            GamepadKey::PaddleRight => "PS_PaddleR",
        }
    }

    /// Second name some keys are also reported under.
    pub fn alias(self) -> Option<&'static str> {
        match self {
            GamepadKey::L3 => Some("PS_PushLeftStick"),
            GamepadKey::R3 => Some("PS_PushRightStick"),
            GamepadKey::Options => Some("PS_Menu"),
            GamepadKey::Create => Some("PS_Share"),
            _ => None,
        }
    }
}

impl fmt::Display for GamepadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyStatus {
    Pressed,
    Released,
}

impl Default for KeyStatus {
    fn default() -> Self {
        KeyStatus::Released
    }
}

impl From<bool> for KeyStatus {
    fn from(b: bool) -> Self {
        if b {
            KeyStatus::Pressed
        } else {
            KeyStatus::Released
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AnalogAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

impl AnalogAxis {
    pub const ALL: [AnalogAxis; 6] = [
        AnalogAxis::LeftX,
        AnalogAxis::LeftY,
        AnalogAxis::RightX,
        AnalogAxis::RightY,
        AnalogAxis::LeftTrigger,
        AnalogAxis::RightTrigger,
    ];
}

#[derive(Debug, Clone)]
pub struct Report {
    pub keys: EnumMap<GamepadKey, KeyStatus>,
    /// -1 ... 1, up is positive.
    pub left_stick: Vector2<f64>,
    pub right_stick: Vector2<f64>,
    /// 0 ... 1
    pub left_trigger: f64,
    pub right_trigger: f64,
    pub motion: Option<Motion>,
    pub touch: Option<[TouchPoint; 2]>,
    pub battery: Battery,
    pub headset_connected: bool,
    pub frequency: u32,
}

impl Report {
    pub fn empty(frequency: u32) -> Report {
        Report {
            keys: EnumMap::default(),
            left_stick: Vector2::zero(),
            right_stick: Vector2::zero(),
            left_trigger: 0.,
            right_trigger: 0.,
            motion: None,
            touch: None,
            battery: Battery::default(),
            headset_connected: false,
            frequency,
        }
    }

    pub fn analog(&self, axis: AnalogAxis) -> f64 {
        match axis {
            AnalogAxis::LeftX => self.left_stick.x,
            AnalogAxis::LeftY => self.left_stick.y,
            AnalogAxis::RightX => self.right_stick.x,
            AnalogAxis::RightY => self.right_stick.y,
            AnalogAxis::LeftTrigger => self.left_trigger,
            AnalogAxis::RightTrigger => self.right_trigger,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Motion {
    pub rotation_speed: RotationSpeed,
    pub acceleration: Acceleration,
}

impl Motion {
    /// Direction of the acceleration, scaled to m/s².
    pub fn gravity(&self) -> Vector3<f64> {
        let acc = self.acceleration.as_vec();
        if acc.is_zero() {
            acc
        } else {
            acc.normalize() * GRAVITY
        }
    }

    pub fn tilt(&self) -> Vector3<f64> {
        self.acceleration.as_vec() + self.rotation_speed.as_vec()
    }
}

/// Uses the SDL convention.
///
/// Units are deg/s
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationSpeed {
    /// -x ... +x is left ... right
    pub x: f64,
    /// -y ... +y is down ... up
    pub y: f64,
    /// -z ... +z is forward ... backward
    pub z: f64,
}

impl RotationSpeed {
    pub fn as_vec(self) -> Vector3<f64> {
        vec3(self.x, self.y, self.z)
    }
}

impl From<Vector3<f64>> for RotationSpeed {
    fn from(raw: Vector3<f64>) -> Self {
        Self {
            x: raw.x,
            y: raw.y,
            z: raw.z,
        }
    }
}

impl Mul<Duration> for RotationSpeed {
    type Output = Euler<Deg<f64>>;

    fn mul(self, dt: Duration) -> Self::Output {
        Euler::new(
            Deg(self.x * dt.as_secs_f64()),
            Deg(self.y * dt.as_secs_f64()),
            Deg(self.z * dt.as_secs_f64()),
        )
    }
}

/// Uses the SDL convention.
///
/// Units are in g
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Acceleration {
    pub fn as_vec(self) -> Vector3<f64> {
        vec3(self.x, self.y, self.z)
    }
}

impl From<Vector3<f64>> for Acceleration {
    fn from(raw: Vector3<f64>) -> Self {
        Self {
            x: raw.x,
            y: raw.y,
            z: raw.z,
        }
    }
}

/// One finger on the touchpad, in raw pad coordinates.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct TouchPoint {
    pub id: u8,
    pub active: bool,
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Battery {
    /// Percent, 0 ... 100
    pub level: f32,
    pub charging: bool,
    pub fully_charged: bool,
}
