//! Logical inputs and the enumerations referenced by configuration records.

use core::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// A logical digital input.
///
/// Names follow physical position on a leverless layout: left/right hand,
/// then finger (`F`) or thumb (`T`) row, plus the middle menu row (`Mb`).
/// The discriminant is the stable wire value and the bit index in
/// [`ButtonMask`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Button {
    Lf1 = 0,
    Lf2 = 1,
    Lf3 = 2,
    Lf4 = 3,
    Lt1 = 4,
    Lt2 = 5,
    Mb1 = 6,
    Mb2 = 7,
    Mb3 = 8,
    Rt1 = 9,
    Rt2 = 10,
    Rt3 = 11,
    Rt4 = 12,
    Rt5 = 13,
    Rf1 = 14,
    Rf2 = 15,
    Rf3 = 16,
    Rf4 = 17,
    Rf5 = 18,
    Rf6 = 19,
    Rf7 = 20,
    Rf8 = 21,
}

impl Button {
    /// Number of logical buttons.
    pub const COUNT: usize = 22;

    /// Every button, in wire order.
    pub const ALL: [Button; Self::COUNT] = [
        Button::Lf1,
        Button::Lf2,
        Button::Lf3,
        Button::Lf4,
        Button::Lt1,
        Button::Lt2,
        Button::Mb1,
        Button::Mb2,
        Button::Mb3,
        Button::Rt1,
        Button::Rt2,
        Button::Rt3,
        Button::Rt4,
        Button::Rt5,
        Button::Rf1,
        Button::Rf2,
        Button::Rf3,
        Button::Rf4,
        Button::Rf5,
        Button::Rf6,
        Button::Rf7,
        Button::Rf8,
    ];

    /// Index of this button (0-based, equal to the wire value).
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Single-bit mask for this button.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> ButtonMask {
        ButtonMask(1 << self as u32)
    }

    /// Look up a button from its wire value.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

/// Set of pressed (or required) buttons as a bitfield.
///
/// # Example
///
/// ```
/// use config_proto::{Button, ButtonMask};
///
/// let held = Button::Mb1.mask() | Button::Lt1.mask() | Button::Lf3.mask();
/// let binding = ButtonMask::from_buttons(&[Button::Mb1, Button::Lf3]);
/// assert!(held.contains_all(binding));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonMask(pub u32);

impl ButtonMask {
    /// No buttons.
    pub const NONE: Self = Self(0);

    /// Build a mask from a list of buttons.
    #[must_use]
    pub fn from_buttons(buttons: &[Button]) -> Self {
        buttons.iter().fold(Self::NONE, |acc, &b| acc | b.mask())
    }

    /// Check whether `button` is in the set.
    #[inline]
    #[must_use]
    pub const fn is_pressed(self, button: Button) -> bool {
        self.0 & (1 << button as u32) != 0
    }

    /// Check whether every button of `other` is in the set.
    #[inline]
    #[must_use]
    pub const fn contains_all(self, other: ButtonMask) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Set or clear a button.
    #[inline]
    pub fn set(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.0 |= button.mask().0;
        } else {
            self.0 &= !button.mask().0;
        }
    }

    /// Check if no buttons are in the set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ButtonMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ButtonMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ButtonMask {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl Not for ButtonMask {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

/// Controller mode profile identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ModeId {
    Melee = 1,
    ProjectM = 2,
    Ultimate = 3,
    /// Fighting-game layout: directions drive the d-pad instead of a stick.
    Fgc = 4,
    RivalsOfAether = 5,
}

impl ModeId {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Melee),
            2 => Some(Self::ProjectM),
            3 => Some(Self::Ultimate),
            4 => Some(Self::Fgc),
            5 => Some(Self::RivalsOfAether),
            _ => None,
        }
    }
}

/// Resolution strategy when both buttons of an opposing pair are held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SocdType {
    /// Both held cancels out.
    Neutral = 1,
    /// The most recently pressed direction wins.
    SecondInputPriority = 2,
    /// Like [`SocdType::SecondInputPriority`], but the overridden direction
    /// stays off until it is pressed again.
    SecondInputPriorityNoReactivation = 3,
    /// The first button of the pair always wins.
    DirOnePriority = 4,
    /// The second button of the pair always wins.
    DirTwoPriority = 5,
}

impl SocdType {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Neutral),
            2 => Some(Self::SecondInputPriority),
            3 => Some(Self::SecondInputPriorityNoReactivation),
            4 => Some(Self::DirOnePriority),
            5 => Some(Self::DirTwoPriority),
            _ => None,
        }
    }
}

/// Output protocol identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BackendId {
    /// Generic USB HID gamepad.
    DInput = 1,
    /// USB HID gamepad with an Xbox-style descriptor.
    XInput = 2,
    /// GameCube console port.
    GamecubeConsole = 3,
    /// N64 console port.
    N64Console = 4,
    /// Diagnostic viewer that reports snapshot changes over the debug link.
    InputViewer = 5,
}

impl BackendId {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::DInput),
            2 => Some(Self::XInput),
            3 => Some(Self::GamecubeConsole),
            4 => Some(Self::N64Console),
            5 => Some(Self::InputViewer),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_wire_values_match_order() {
        for (i, button) in Button::ALL.iter().enumerate() {
            assert_eq!(button.index(), i);
            assert_eq!(Button::from_u8(i as u8), Some(*button));
        }
        assert_eq!(Button::from_u8(Button::COUNT as u8), None);
    }

    #[test]
    fn test_mask_contains_all() {
        let held = ButtonMask::from_buttons(&[Button::Mb1, Button::Lt1, Button::Lf3]);
        assert!(held.contains_all(ButtonMask::from_buttons(&[Button::Mb1, Button::Lf3])));
        assert!(!held.contains_all(ButtonMask::from_buttons(&[Button::Mb1, Button::Lf2])));
        // The empty set is trivially contained; callers must skip empty bindings.
        assert!(held.contains_all(ButtonMask::NONE));
    }

    #[test]
    fn test_mask_set_clear() {
        let mut mask = ButtonMask::NONE;
        mask.set(Button::Rf8, true);
        assert!(mask.is_pressed(Button::Rf8));
        mask.set(Button::Rf8, false);
        assert!(mask.is_empty());
    }

    #[test]
    fn test_unknown_enum_values_rejected() {
        assert_eq!(ModeId::from_u8(0), None);
        assert_eq!(SocdType::from_u8(6), None);
        assert_eq!(BackendId::from_u8(0xFF), None);
    }
}
