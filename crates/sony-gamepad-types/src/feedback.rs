use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Hand {
    Left,
    Right,
    Any,
}

impl Hand {
    pub fn left(self) -> bool {
        matches!(self, Hand::Left | Hand::Any)
    }

    pub fn right(self) -> bool {
        matches!(self, Hand::Right | Hand::Any)
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseColorError {
    #[error("expected 6 hex digits, got {0}")]
    Length(usize),
    #[error("invalid hex digit {0:?}")]
    InvalidDigit(char),
}

/// Parses `RRGGBB`, with an optional leading `#`.
impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        let len = digits.chars().count();
        if len != 6 {
            return Err(ParseColorError::Length(len));
        }
        let raw = digits.chars().try_fold(0u32, |acc, c| {
            c.to_digit(16)
                .map(|d| acc << 4 | d)
                .ok_or(ParseColorError::InvalidDigit(c))
        })?;
        Ok(Color::new((raw >> 16) as u8, (raw >> 8) as u8, raw as u8))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Rumble request from a host, every value in 0 ... 1.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ForceFeedbackValues {
    pub left_large: f32,
    pub left_small: f32,
    pub right_large: f32,
    pub right_small: f32,
}

impl ForceFeedbackValues {
    pub fn left(&self) -> f32 {
        self.left_large.max(self.left_small)
    }

    pub fn right(&self) -> f32 {
        self.right_large.max(self.right_small)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct HapticFeedbackValues {
    pub frequency: f32,
    pub amplitude: f32,
}

/// Resistance ramp applied to a trigger, positions and strengths in 0 ... 8.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TriggerResistance {
    pub start_position: u8,
    pub end_position: u8,
    pub start_strength: u8,
    pub end_strength: u8,
    pub affected: Hand,
}

impl Default for TriggerResistance {
    fn default() -> Self {
        Self {
            start_position: 0,
            end_position: 8,
            start_strength: 0,
            end_strength: 0,
            affected: Hand::Any,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DeviceProperty {
    LightColor(Color),
    TriggerResistance(TriggerResistance),
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LedPlayer {
    Off = 0,
    One = 0x04,
    Two = 0x0A,
    Three = 0x15,
    Four = 0x1B,
    All = 0x1F,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LedBrightness {
    High = 0x00,
    Medium = 0x01,
    Low = 0x02,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LedMic {
    Off = 0,
    On = 1,
    Pulse = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_color() {
        assert_eq!("FF8000".parse(), Ok(Color::new(255, 128, 0)));
        assert_eq!("#0000ff".parse(), Ok(Color::BLUE));
        assert_eq!("zzzzzz".parse::<Color>(), Err(ParseColorError::InvalidDigit('z')));
        assert_eq!("+FFFFF".parse::<Color>(), Err(ParseColorError::InvalidDigit('+')));
        assert_eq!(Color::new(1, 2, 255).to_string(), "0102FF");
    }

    #[test]
    fn color_needs_six_digits() {
        assert_eq!("FF000000".parse::<Color>(), Err(ParseColorError::Length(8)));
        assert_eq!("12".parse::<Color>(), Err(ParseColorError::Length(2)));
        assert_eq!("#".parse::<Color>(), Err(ParseColorError::Length(0)));
        assert_eq!("##FF0000".parse::<Color>(), Err(ParseColorError::Length(7)));
    }

    #[test]
    fn feedback_takes_strongest_motor() {
        let v = ForceFeedbackValues {
            left_large: 0.2,
            left_small: 0.7,
            right_large: 0.9,
            right_small: 0.1,
        };
        assert_eq!(v.left(), 0.7);
        assert_eq!(v.right(), 0.9);
    }

    #[test]
    fn hands() {
        assert!(Hand::Any.left() && Hand::Any.right());
        assert!(!Hand::Left.right());
        assert!(!Hand::Right.left());
    }
}
