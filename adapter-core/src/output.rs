//! Controller output state produced by a [`ControllerMode`](crate::ControllerMode).

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Button state represented as a bitfield.
///
/// # Example
///
/// ```
/// use adapter_core::Buttons;
///
/// let buttons = Buttons::A | Buttons::START;
/// assert!(buttons.contains(Buttons::A));
/// assert!(!buttons.contains(Buttons::B));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u16);

impl Buttons {
    pub const A: Self = Self(1 << 0);
    pub const B: Self = Self(1 << 1);
    pub const X: Self = Self(1 << 2);
    pub const Y: Self = Self(1 << 3);
    pub const LB: Self = Self(1 << 4); // L digital
    pub const RB: Self = Self(1 << 5); // Z
    pub const BACK: Self = Self(1 << 6);
    pub const START: Self = Self(1 << 7);
    pub const GUIDE: Self = Self(1 << 8);
    pub const LS: Self = Self(1 << 9);
    pub const RS: Self = Self(1 << 10);
    pub const DPAD_UP: Self = Self(1 << 11);
    pub const DPAD_DOWN: Self = Self(1 << 12);
    pub const DPAD_LEFT: Self = Self(1 << 13);
    pub const DPAD_RIGHT: Self = Self(1 << 14);

    pub const NONE: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn contains(self, button: Buttons) -> bool {
        (self.0 & button.0) == button.0
    }

    #[inline]
    pub fn set(&mut self, button: Buttons, pressed: bool) {
        if pressed {
            self.0 |= button.0;
        } else {
            self.0 &= !button.0;
        }
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Buttons {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for Buttons {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

/// Analog stick, each axis in [-32767, 32767] with up and right positive.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogStick {
    pub x: i16,
    pub y: i16,
}

impl AnalogStick {
    pub const NEUTRAL: Self = Self { x: 0, y: 0 };

    #[must_use]
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    #[inline]
    #[must_use]
    pub const fn is_neutral(self) -> bool {
        self.x == 0 && self.y == 0
    }
}

/// One report's worth of controller output.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputState {
    pub buttons: Buttons,
    pub left_stick: AnalogStick,
    /// C-stick.
    pub right_stick: AnalogStick,
    pub left_trigger: u8,
    pub right_trigger: u8,
}

impl OutputState {
    /// No buttons pressed, sticks centred, triggers released.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            buttons: Buttons::NONE,
            left_stick: AnalogStick::NEUTRAL,
            right_stick: AnalogStick::NEUTRAL,
            left_trigger: 0,
            right_trigger: 0,
        }
    }
}
