//! Input sources that sample hardware into the shared snapshot.
//!
//! A source never fails outward: a read error degrades the fields it owns to
//! their inert values (button released, axis centred, controller absent).
//!
//! - [`gpio`]: one active-low pin per button ([`GpioButtonInput`])
//! - [`gamecube`]: GameCube controller on a joybus line ([`GamecubeControllerInput`])

pub mod gamecube;
pub mod gpio;

pub use gamecube::{GamecubeControllerInput, JoybusError, JoybusHost, GAMECUBE_FIELDS};
pub use gpio::GpioButtonInput;

use crate::snapshot::{FieldSet, SharedInputs};

/// Something that writes a fixed subset of [`SharedInputs`].
///
/// Implementations must only write the fields reported by
/// [`owned_fields`](InputSource::owned_fields). Sources running side by side
/// must own disjoint sets; see [`FieldSet::ensure_disjoint`].
pub trait InputSource {
    /// Sample the hardware and store the result.
    fn refresh(&mut self, inputs: &SharedInputs);

    /// Fields this source writes.
    fn owned_fields(&self) -> FieldSet;
}

impl<T: InputSource + ?Sized> InputSource for &mut T {
    fn refresh(&mut self, inputs: &SharedInputs) {
        (**self).refresh(inputs);
    }

    fn owned_fields(&self) -> FieldSet {
        (**self).owned_fields()
    }
}

/// Two sources refreshed in order.
impl<A: InputSource, B: InputSource> InputSource for (A, B) {
    fn refresh(&mut self, inputs: &SharedInputs) {
        self.0.refresh(inputs);
        self.1.refresh(inputs);
    }

    fn owned_fields(&self) -> FieldSet {
        self.0.owned_fields() | self.1.owned_fields()
    }
}
