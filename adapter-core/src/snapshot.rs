//! Shared input snapshot and field ownership.
//!
//! [`SharedInputs`] is written by input sources on both cores and read by the
//! backends. Every logical field is its own atomic cell, so a single field can
//! never be observed half-written. Fields are *not* updated together: a
//! reader may see a new stick X next to an old stick Y. Inputs change on a
//! human timescale, so one stale field for one cycle is accepted.
//!
//! Writers never overlap. Each [`InputSource`](crate::InputSource) declares
//! the [`FieldSet`] it owns and those sets must be pairwise disjoint.

use core::ops::BitOr;

use config_proto::{Button, ButtonMask};
use portable_atomic::{AtomicBool, AtomicU8, Ordering};

/// Analog axis in the snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Axis {
    StickX = 0,
    StickY = 1,
    CStickX = 2,
    CStickY = 3,
    TriggerL = 4,
    TriggerR = 5,
}

impl Axis {
    pub const COUNT: usize = 6;

    pub const ALL: [Axis; Self::COUNT] = [
        Axis::StickX,
        Axis::StickY,
        Axis::CStickX,
        Axis::CStickY,
        Axis::TriggerL,
        Axis::TriggerR,
    ];

    /// Resting value: centred for sticks, released for triggers.
    #[inline]
    #[must_use]
    pub const fn neutral(self) -> u8 {
        match self {
            Axis::TriggerL | Axis::TriggerR => 0,
            _ => AXIS_CENTER,
        }
    }
}

/// Centre value of a stick axis.
pub const AXIS_CENTER: u8 = 128;

const NEUTRAL_AXES: [u8; Axis::COUNT] = [
    AXIS_CENTER,
    AXIS_CENTER,
    AXIS_CENTER,
    AXIS_CENTER,
    0,
    0,
];

/// One writable field of the snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    Button(Button),
    Axis(Axis),
    ControllerConnected,
}

impl Field {
    const fn bit(self) -> u32 {
        match self {
            Field::Button(b) => 1 << b as u32,
            Field::Axis(a) => 1 << (Button::COUNT as u32 + a as u32),
            Field::ControllerConnected => 1 << (Button::COUNT + Axis::COUNT) as u32,
        }
    }
}

/// Set of snapshot fields, used to declare writer ownership.
///
/// # Example
///
/// ```
/// use adapter_core::{Axis, Field, FieldSet};
/// use config_proto::Button;
///
/// let buttons = FieldSet::EMPTY.with(Field::Button(Button::Lf1));
/// let controller = FieldSet::EMPTY.with(Field::Axis(Axis::StickX));
/// assert!(buttons.is_disjoint(controller));
/// assert!(!buttons.is_disjoint(buttons | controller));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldSet(u32);

impl FieldSet {
    pub const EMPTY: Self = Self(0);

    /// All analog axes.
    pub const AXES: Self = Self::EMPTY
        .with(Field::Axis(Axis::StickX))
        .with(Field::Axis(Axis::StickY))
        .with(Field::Axis(Axis::CStickX))
        .with(Field::Axis(Axis::CStickY))
        .with(Field::Axis(Axis::TriggerL))
        .with(Field::Axis(Axis::TriggerR));

    #[inline]
    #[must_use]
    pub const fn with(self, field: Field) -> Self {
        Self(self.0 | field.bit())
    }

    #[must_use]
    pub fn from_buttons(buttons: impl IntoIterator<Item = Button>) -> Self {
        buttons
            .into_iter()
            .fold(Self::EMPTY, |set, b| set.with(Field::Button(b)))
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub const fn is_disjoint(self, other: FieldSet) -> bool {
        self.0 & other.0 == 0
    }

    /// Check that no field is claimed by more than one writer.
    #[must_use]
    pub fn ensure_disjoint(sets: &[FieldSet]) -> bool {
        sets.iter()
            .enumerate()
            .all(|(i, a)| sets[i + 1..].iter().all(|b| a.is_disjoint(*b)))
    }
}

impl BitOr for FieldSet {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// A plain copy of the snapshot taken at one point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputState {
    pub buttons: ButtonMask,
    /// Indexed by [`Axis`].
    pub axes: [u8; Axis::COUNT],
    pub controller_connected: bool,
}

impl InputState {
    /// Nothing pressed, axes at rest, no controller.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            buttons: ButtonMask::NONE,
            axes: NEUTRAL_AXES,
            controller_connected: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn axis(&self, axis: Axis) -> u8 {
        self.axes[axis as usize]
    }

    #[inline]
    #[must_use]
    pub const fn is_pressed(&self, button: Button) -> bool {
        self.buttons.is_pressed(button)
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::neutral()
    }
}

/// The shared snapshot.
///
/// Meant to live in a `static` and be handed out as `&'static SharedInputs`.
pub struct SharedInputs {
    buttons: [AtomicBool; Button::COUNT],
    axes: [AtomicU8; Axis::COUNT],
    controller_connected: AtomicBool,
}

impl SharedInputs {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buttons: [const { AtomicBool::new(false) }; Button::COUNT],
            axes: [
                AtomicU8::new(AXIS_CENTER),
                AtomicU8::new(AXIS_CENTER),
                AtomicU8::new(AXIS_CENTER),
                AtomicU8::new(AXIS_CENTER),
                AtomicU8::new(0),
                AtomicU8::new(0),
            ],
            controller_connected: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn set_button(&self, button: Button, pressed: bool) {
        self.buttons[button.index()].store(pressed, Ordering::Relaxed);
    }

    #[inline]
    #[must_use]
    pub fn button(&self, button: Button) -> bool {
        self.buttons[button.index()].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_axis(&self, axis: Axis, value: u8) {
        self.axes[axis as usize].store(value, Ordering::Relaxed);
    }

    #[inline]
    #[must_use]
    pub fn axis(&self, axis: Axis) -> u8 {
        self.axes[axis as usize].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_controller_connected(&self, connected: bool) {
        self.controller_connected.store(connected, Ordering::Relaxed);
    }

    #[inline]
    #[must_use]
    pub fn controller_connected(&self) -> bool {
        self.controller_connected.load(Ordering::Relaxed)
    }

    /// Read every field into an [`InputState`].
    ///
    /// Fields are loaded one by one; see the module docs on tearing.
    #[must_use]
    pub fn snapshot(&self) -> InputState {
        let mut state = InputState::neutral();
        for button in Button::ALL {
            state.buttons.set(button, self.button(button));
        }
        for axis in Axis::ALL {
            state.axes[axis as usize] = self.axis(axis);
        }
        state.controller_connected = self.controller_connected();
        state
    }
}

impl Default for SharedInputs {
    fn default() -> Self {
        Self::new()
    }
}
