//! Adaptive trigger effects.
//!
//! Trigger travel is split in 10 zones; positions given to the builders
//! address those zones and strengths are in 0 ... 8, 0 meaning inactive.
//!
//! <https://gist.github.com/Nielk1/6d54cc2c00d2201ccb8c2720ad7538db>

use std::fmt;

use sony_gamepad_sys::{
    validate::{to_255, to_255_scaled},
    TriggerResistance,
};

use crate::RawId;

pub const ZONES: usize = 10;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum TriggerMode {
    Off = 0x00,
    ContinuousResistance = 0x01,
    Feedback = 0x21,
    Bow = 0x22,
    Galloping = 0x23,
    Weapon = 0x25,
    Vibration = 0x26,
    Machine = 0x27,
}

/// Trigger section of the output report.
#[repr(packed)]
#[derive(Clone, Copy)]
pub struct RawTrigger {
    pub mode: RawId<TriggerMode>,
    pub params: [u8; 10],
}

impl Default for RawTrigger {
    fn default() -> Self {
        TriggerEffect::Off.encode()
    }
}

impl fmt::Debug for RawTrigger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let params = self.params;
        f.debug_struct("RawTrigger")
            .field("mode", &self.mode)
            .field("params", &params)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEffect {
    Off,
    ContinuousResistance {
        start: u8,
        strength: u8,
    },
    /// Resistance per zone.
    Feedback {
        strengths: [u8; ZONES],
    },
    Bow {
        start: u8,
        end: u8,
        strength: u8,
        snap_force: u8,
    },
    Galloping {
        start: u8,
        end: u8,
        first_foot: u8,
        second_foot: u8,
        frequency: u8,
    },
    Weapon {
        start: u8,
        end: u8,
        strength: u8,
    },
    /// Vibration amplitude per zone.
    Vibration {
        amplitudes: [u8; ZONES],
        frequency: u8,
    },
    Machine {
        start: u8,
        end: u8,
        amplitude_begin: u8,
        amplitude_end: u8,
        frequency: u8,
        period: u8,
    },
}

impl Default for TriggerEffect {
    fn default() -> Self {
        TriggerEffect::Off
    }
}

fn split_zones(begin: u8, middle: u8, end: u8) -> [u8; ZONES] {
    [
        begin, begin, begin, begin, middle, middle, middle, middle, end, end,
    ]
}

fn zone_bit(position: u8) -> u16 {
    1 << position.min(ZONES as u8 - 1)
}

/// Active zone mask and packed 3 bits values of every non-zero zone.
fn pack_zones(values: &[u8; ZONES]) -> (u16, u32) {
    let mut active = 0u16;
    let mut packed = 0u32;
    for (i, &v) in values.iter().enumerate() {
        if v > 0 {
            active |= 1 << i;
            packed |= ((v as u32 - 1) & 0x07) << (3 * i);
        }
    }
    (active, packed)
}

impl TriggerEffect {
    pub fn continuous_resistance(start: u8, strength: u8) -> TriggerEffect {
        TriggerEffect::ContinuousResistance { start, strength }
    }

    /// 4 zones at `begin`, 4 at `middle` and the last 2 at `end`.
    pub fn resistance(begin: u8, middle: u8, end: u8) -> TriggerEffect {
        TriggerEffect::Feedback {
            strengths: split_zones(begin, middle, end),
        }
    }

    /// Linear ramp between `start_position` and `end_position`, nothing
    /// outside of it.
    pub fn section_resistance(resistance: &TriggerResistance) -> TriggerEffect {
        let start = resistance.start_position as usize;
        let end = resistance.end_position as usize;
        let start_strength = resistance.start_strength as f32;
        let end_strength = resistance.end_strength as f32;
        let mut strengths = [0; ZONES];
        if end > start {
            for (i, strength) in strengths.iter_mut().enumerate().take(end + 1).skip(start) {
                let alpha = (i - start) as f32 / (end - start) as f32;
                *strength = (start_strength + alpha * (end_strength - start_strength)) as u8;
            }
        }
        TriggerEffect::Feedback { strengths }
    }

    /// Recoil on every zone, `keep_effect` forces the end zones at max.
    pub fn automatic_gun(begin: u8, middle: u8, end: u8, keep_effect: bool) -> TriggerEffect {
        let end = if keep_effect { 8 } else { end };
        TriggerEffect::Vibration {
            amplitudes: split_zones(begin, middle, end),
            frequency: to_255(0.05),
        }
    }

    pub fn galloping(
        start: u8,
        end: u8,
        first_foot: u8,
        second_foot: u8,
        frequency: f32,
    ) -> TriggerEffect {
        TriggerEffect::Galloping {
            start,
            end,
            first_foot,
            second_foot,
            frequency: to_255(frequency),
        }
    }

    /// `period` in seconds, clamped to 0 ... 3.
    pub fn machine(
        start: u8,
        end: u8,
        amplitude_begin: u8,
        amplitude_end: u8,
        frequency: f32,
        period: f32,
    ) -> TriggerEffect {
        let period = if (0. ..=3.).contains(&period) {
            period
        } else {
            3.
        };
        TriggerEffect::Machine {
            start,
            end,
            amplitude_begin,
            amplitude_end,
            frequency: to_255(frequency),
            period: (period * 10.) as u8,
        }
    }

    pub fn weapon(start: u8, end: u8, strength: u8) -> TriggerEffect {
        TriggerEffect::Weapon {
            start,
            end,
            strength,
        }
    }

    pub fn bow(start: u8, end: u8, strength: u8, snap_force: u8) -> TriggerEffect {
        TriggerEffect::Bow {
            start,
            end,
            strength,
            snap_force,
        }
    }

    pub fn mode(&self) -> TriggerMode {
        match self {
            TriggerEffect::Off => TriggerMode::Off,
            TriggerEffect::ContinuousResistance { .. } => TriggerMode::ContinuousResistance,
            TriggerEffect::Feedback { .. } => TriggerMode::Feedback,
            TriggerEffect::Bow { .. } => TriggerMode::Bow,
            TriggerEffect::Galloping { .. } => TriggerMode::Galloping,
            TriggerEffect::Weapon { .. } => TriggerMode::Weapon,
            TriggerEffect::Vibration { .. } => TriggerMode::Vibration,
            TriggerEffect::Machine { .. } => TriggerMode::Machine,
        }
    }

    /// Haptic frequency, ignored by effects without one.
    pub fn set_frequency(&mut self, value: u8) {
        match self {
            TriggerEffect::Galloping { frequency, .. }
            | TriggerEffect::Vibration { frequency, .. }
            | TriggerEffect::Machine { frequency, .. } => *frequency = value,
            _ => {}
        }
    }

    pub fn encode(&self) -> RawTrigger {
        let mut p = [0u8; 10];
        match *self {
            TriggerEffect::Off => {}
            TriggerEffect::ContinuousResistance { start, strength } => {
                p[0] = to_255_scaled(start, 8);
                p[1] = to_255_scaled(strength, 9);
            }
            TriggerEffect::Feedback { strengths } => {
                let (active, packed) = pack_zones(&strengths);
                p[0..2].copy_from_slice(&active.to_le_bytes());
                p[2..6].copy_from_slice(&packed.to_le_bytes());
            }
            TriggerEffect::Bow {
                start,
                end,
                strength,
                snap_force,
            } => {
                let active = zone_bit(start) | zone_bit(end);
                let pair = (strength.wrapping_sub(1) & 0x07) as u16
                    | ((snap_force.wrapping_sub(1) & 0x07) as u16) << 3;
                p[0..2].copy_from_slice(&active.to_le_bytes());
                p[2..4].copy_from_slice(&pair.to_le_bytes());
            }
            TriggerEffect::Galloping {
                start,
                end,
                first_foot,
                second_foot,
                frequency,
            } => {
                let active = zone_bit(start) | zone_bit(end);
                p[0..2].copy_from_slice(&active.to_le_bytes());
                p[2] = (first_foot & 0x07) | (second_foot & 0x07) << 3;
                p[3] = frequency;
            }
            TriggerEffect::Weapon {
                start,
                end,
                strength,
            } => {
                let active = zone_bit(start) | zone_bit(end);
                p[0..2].copy_from_slice(&active.to_le_bytes());
                p[2] = strength.wrapping_sub(1) & 0x07;
            }
            TriggerEffect::Vibration {
                amplitudes,
                frequency,
            } => {
                let (active, packed) = pack_zones(&amplitudes);
                p[0..2].copy_from_slice(&active.to_le_bytes());
                p[2..6].copy_from_slice(&packed.to_le_bytes());
                p[8] = frequency;
            }
            TriggerEffect::Machine {
                start,
                end,
                amplitude_begin,
                amplitude_end,
                frequency,
                period,
            } => {
                let active = zone_bit(start) | zone_bit(end);
                p[0..2].copy_from_slice(&active.to_le_bytes());
                p[2] = (amplitude_begin & 0x07) | (amplitude_end & 0x07) << 3;
                p[3] = frequency;
                p[4] = period;
            }
        }
        RawTrigger {
            mode: self.mode().into(),
            params: p,
        }
    }
}
