//! Buttons wired straight to GPIO pins.
//!
//! Pins are pulled up and a press shorts them to ground, so a low level
//! means pressed.

use config_proto::Button;
use embedded_hal::digital::InputPin;
use heapless::Vec;

use super::InputSource;
use crate::snapshot::{FieldSet, SharedInputs};

/// Digital buttons read from active-low pins.
pub struct GpioButtonInput<P> {
    pins: Vec<(Button, P), { Button::COUNT }>,
}

impl<P: InputPin> GpioButtonInput<P> {
    #[must_use]
    pub fn new() -> Self {
        Self { pins: Vec::new() }
    }

    /// Attach `pin` to `button`.
    ///
    /// Returns the pin back if every button already has one.
    pub fn add(&mut self, button: Button, pin: P) -> Result<(), P> {
        self.pins.push((button, pin)).map_err(|(_, pin)| pin)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

impl<P: InputPin> Default for GpioButtonInput<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: InputPin> FromIterator<(Button, P)> for GpioButtonInput<P> {
    /// Collect pin assignments. Entries beyond one per button are dropped.
    fn from_iter<I: IntoIterator<Item = (Button, P)>>(iter: I) -> Self {
        let mut input = Self::new();
        for (button, pin) in iter {
            if input.add(button, pin).is_err() {
                break;
            }
        }
        input
    }
}

impl<P: InputPin> InputSource for GpioButtonInput<P> {
    fn refresh(&mut self, inputs: &SharedInputs) {
        for (button, pin) in &mut self.pins {
            // A pin that cannot be read counts as released.
            let pressed = pin.is_low().unwrap_or(false);
            inputs.set_button(*button, pressed);
        }
    }

    fn owned_fields(&self) -> FieldSet {
        FieldSet::from_buttons(self.pins.iter().map(|(button, _)| *button))
    }
}
