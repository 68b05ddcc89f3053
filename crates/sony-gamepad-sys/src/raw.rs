//! Field types shared by the report structs of every Sony controller.
//!
//! All of them have an alignment of 1 so they can be used inside
//! `#[repr(packed)]` structs.

use std::{fmt, marker::PhantomData};

use cgmath::{vec2, Vector2};
use num::{FromPrimitive, ToPrimitive};

use crate::TouchPoint;

#[repr(transparent)]
#[derive(Copy, Clone)]
pub struct RawId<Id>(u8, PhantomData<Id>);

impl<Id: FromPrimitive> RawId<Id> {
    pub fn try_into(self) -> Option<Id> {
        Id::from_u8(self.0)
    }

    pub fn raw(self) -> u8 {
        self.0
    }
}

impl<Id: ToPrimitive> From<Id> for RawId<Id> {
    fn from(id: Id) -> Self {
        RawId(id.to_u8().unwrap_or_default(), PhantomData)
    }
}

impl<Id: fmt::Debug + FromPrimitive + Copy> fmt::Debug for RawId<Id> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(id) = self.try_into() {
            write!(f, "{:?}", id)
        } else {
            f.debug_tuple("RawId")
                .field(&format!("0x{:x}", self.0))
                .finish()
        }
    }
}

impl<Id: FromPrimitive + PartialEq + Copy> PartialEq<Id> for RawId<Id> {
    fn eq(&self, other: &Id) -> bool {
        self.try_into().map(|x| x == *other).unwrap_or(false)
    }
}

#[derive(Copy, Clone, Default, Eq, PartialEq)]
pub struct I16LE(pub [u8; 2]);

impl From<i16> for I16LE {
    fn from(u: i16) -> I16LE {
        I16LE(u.to_le_bytes())
    }
}

impl From<I16LE> for i16 {
    fn from(u: I16LE) -> i16 {
        i16::from_le_bytes(u.0)
    }
}

impl fmt::Debug for I16LE {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        i16::from(*self).fmt(f)
    }
}

#[derive(Copy, Clone, Default, Eq, PartialEq)]
pub struct U32LE(pub [u8; 4]);

impl From<U32LE> for u32 {
    fn from(u: U32LE) -> u32 {
        u32::from_le_bytes(u.0)
    }
}

impl fmt::Debug for U32LE {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        u32::from(*self).fmt(f)
    }
}

impl From<u32> for U32LE {
    fn from(u: u32) -> U32LE {
        U32LE(u.to_le_bytes())
    }
}

#[repr(packed)]
#[derive(Clone, Copy)]
pub struct Stick {
    x: u8,
    y: u8,
}

impl Stick {
    pub fn val(&self) -> (u8, u8) {
        (self.x, self.y)
    }

    /// -1 ... 1, up is positive.
    pub fn normalize(&self) -> Vector2<f64> {
        let x = self.x as f64 - 128.;
        let y = self.y as f64 - 127.;
        vec2(x, -y) / 128.
    }
}

impl fmt::Debug for Stick {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = self.normalize();
        f.debug_tuple("Stick").field(&s.x).field(&s.y).finish()
    }
}

#[repr(transparent)]
#[derive(Clone, Copy, Debug)]
pub struct Trigger(u8);

impl Trigger {
    /// 0 ... 1
    pub fn normalize(&self) -> f64 {
        self.0 as f64 / 256.
    }
}

#[repr(packed)]
#[derive(Clone, Copy)]
pub struct Finger {
    id: u8,
    coordinate: FingerCoord,
}

impl Finger {
    pub fn is_active(&self) -> bool {
        self.id & 0x80 == 0
    }

    pub fn id(&self) -> u8 {
        self.id & 0x7F
    }

    pub fn point(&self) -> TouchPoint {
        let (x, y) = self.coordinate.val();
        TouchPoint {
            id: self.id(),
            active: self.is_active(),
            x,
            y,
        }
    }
}

impl fmt::Debug for Finger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_active() {
            f.debug_struct("Finger")
                .field("id", &self.id())
                .field("coordinate", &self.coordinate)
                .finish()
        } else {
            f.debug_struct("Finger (none)").finish()
        }
    }
}

/// Two 12 bits coordinates, 1920x1080 pad.
#[repr(packed)]
#[derive(Clone, Copy)]
pub struct FingerCoord(u8, u8, u8);

impl FingerCoord {
    pub fn val(&self) -> (u16, u16) {
        let (a, b, c) = (self.0 as u16, self.1 as u16, self.2 as u16);
        (((b & 0xf) << 8) | a, (c << 4) | ((b & 0xf0) >> 4))
    }
}

impl fmt::Debug for FingerCoord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let val = self.val();
        f.debug_tuple("FingerCoord")
            .field(&val.0)
            .field(&val.1)
            .finish()
    }
}
