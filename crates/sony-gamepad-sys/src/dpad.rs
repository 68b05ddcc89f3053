/// Hat switch value of the d-pad, clockwise from up, 8 when released.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Dpad(u8);

impl Dpad {
    pub fn up(self) -> bool {
        matches!(self.0, 7 | 0 | 1)
    }

    pub fn right(self) -> bool {
        matches!(self.0, 1 | 2 | 3)
    }

    pub fn down(self) -> bool {
        matches!(self.0, 3 | 4 | 5)
    }

    pub fn left(self) -> bool {
        matches!(self.0, 5 | 6 | 7)
    }

    pub fn raw(self) -> u8 {
        self.0
    }
}

impl From<u8> for Dpad {
    fn from(v: u8) -> Self {
        Dpad(v & 0x0F)
    }
}

impl std::fmt::Debug for Dpad {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let names = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
        match names.get(self.0 as usize) {
            Some(name) => write!(f, "Dpad({})", name),
            None => write!(f, "Dpad(-)"),
        }
    }
}

#[test]
fn diagonals_press_two_directions() {
    let ne = Dpad::from(1);
    assert!(ne.up() && ne.right() && !ne.down() && !ne.left());
    let sw = Dpad::from(5);
    assert!(sw.down() && sw.left() && !sw.up());
    let released = Dpad::from(8);
    assert!(!released.up() && !released.down() && !released.left() && !released.right());
}
