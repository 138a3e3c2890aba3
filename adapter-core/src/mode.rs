//! Controller modes: turn the logical button snapshot into controller output.
//!
//! Each cycle runs the same pipeline:
//!
//! 1. button remapping from the mode config
//! 2. SOCD resolution for every configured opposing pair
//! 3. left stick from the four movement buttons, scaled by ModX / ModY
//! 4. c-stick from the right thumb cluster
//! 5. face, shoulder and menu buttons, digital shields
//! 6. analog axes of a connected controller fill in where the digital
//!    result is neutral
//!
//! [`ModeId::Fgc`] sends movement to the d-pad and leaves the left stick at
//! rest.
//!
//! SOCD resolution keeps state between cycles, so every backend owns its own
//! [`ControllerMode`].

use config_proto::{
    Button, ButtonMask, ButtonRemap, GameModeConfig, ModeId, SocdPair, SocdType, MAX_REMAPS,
    MAX_SOCD_PAIRS,
};
use heapless::Vec;

use crate::output::{AnalogStick, Buttons, OutputState};
use crate::snapshot::{Axis, InputState, AXIS_CENTER};

/// Full stick deflection.
pub const STICK_MAX: i16 = i16::MAX;

/// ModX scaling of (x, y) in thousandths.
const MOD_X: (i32, i32) = (663, 538);
/// ModY scaling of (x, y) in thousandths.
const MOD_Y: (i32, i32) = (338, 738);

/// Trigger value for the light shield button.
pub const LIGHT_SHIELD: u8 = 49;
/// Trigger value for the mid shield button.
pub const MID_SHIELD: u8 = 94;
/// Trigger value for a full digital press.
pub const TRIGGER_MAX: u8 = u8::MAX;

const LEFT: Button = Button::Lf3;
const RIGHT: Button = Button::Lf1;
const UP: Button = Button::Rf4;
const DOWN: Button = Button::Lf2;
const MOD_X_BUTTON: Button = Button::Lt1;
const MOD_Y_BUTTON: Button = Button::Lt2;

const C_LEFT: Button = Button::Rt3;
const C_RIGHT: Button = Button::Rt5;
const C_UP: Button = Button::Rt4;
const C_DOWN: Button = Button::Rt2;

const BUTTON_MAP: [(Button, Buttons); 9] = [
    (Button::Rt1, Buttons::A),
    (Button::Rf1, Buttons::B),
    (Button::Rf2, Buttons::X),
    (Button::Rf6, Buttons::Y),
    (Button::Rf3, Buttons::RB),
    (Button::Lf4, Buttons::LB),
    (Button::Mb1, Buttons::START),
    (Button::Mb2, Buttons::BACK),
    (Button::Mb3, Buttons::GUIDE),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Direction {
    One,
    Two,
}

/// Resolution state of one opposing pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct SocdState {
    pair: SocdPair,
    held1: bool,
    held2: bool,
    /// Direction currently winning while both are held.
    winner: Option<Direction>,
    /// Direction suppressed until released (no-reactivation only).
    locked: Option<Direction>,
}

impl SocdState {
    fn new(pair: SocdPair) -> Self {
        Self {
            pair,
            held1: false,
            held2: false,
            winner: None,
            locked: None,
        }
    }

    fn resolve(&mut self, buttons: &mut ButtonMask) {
        let dir1 = buttons.is_pressed(self.pair.button_dir1);
        let dir2 = buttons.is_pressed(self.pair.button_dir2);
        let (out1, out2) = self.step(dir1, dir2);
        buttons.set(self.pair.button_dir1, out1);
        buttons.set(self.pair.button_dir2, out2);
    }

    fn step(&mut self, dir1: bool, dir2: bool) -> (bool, bool) {
        let pressed1 = dir1 && !self.held1;
        let pressed2 = dir2 && !self.held2;
        self.held1 = dir1;
        self.held2 = dir2;

        match self.pair.socd_type {
            SocdType::Neutral if dir1 && dir2 => (false, false),
            SocdType::DirOnePriority if dir1 && dir2 => (true, false),
            SocdType::DirTwoPriority if dir1 && dir2 => (false, true),
            SocdType::Neutral | SocdType::DirOnePriority | SocdType::DirTwoPriority => (dir1, dir2),
            SocdType::SecondInputPriority | SocdType::SecondInputPriorityNoReactivation => {
                let lockout = self.pair.socd_type == SocdType::SecondInputPriorityNoReactivation;
                self.second_input(dir1, dir2, pressed1, pressed2, lockout)
            }
        }
    }

    fn second_input(
        &mut self,
        dir1: bool,
        dir2: bool,
        pressed1: bool,
        pressed2: bool,
        lockout: bool,
    ) -> (bool, bool) {
        if dir1 && dir2 {
            match (pressed1, pressed2) {
                // Pressed on the same cycle: nobody is "second".
                (true, true) => self.winner = None,
                (false, true) => self.winner = Some(Direction::Two),
                (true, false) => self.winner = Some(Direction::One),
                (false, false) => {}
            }
            if lockout {
                self.locked = match self.winner {
                    Some(Direction::One) => Some(Direction::Two),
                    Some(Direction::Two) => Some(Direction::One),
                    None => None,
                };
            }
            return match self.winner {
                Some(Direction::One) => (true, false),
                Some(Direction::Two) => (false, true),
                None => (false, false),
            };
        }

        self.winner = None;
        match self.locked {
            Some(Direction::One) if !dir1 => self.locked = None,
            Some(Direction::Two) if !dir2 => self.locked = None,
            _ => {}
        }
        (
            dir1 && self.locked != Some(Direction::One),
            dir2 && self.locked != Some(Direction::Two),
        )
    }
}

/// Convert an 8-bit snapshot axis into the output range.
#[inline]
fn widen_axis(value: u8) -> i16 {
    (i16::from(value) - i16::from(AXIS_CENTER)) * 256
}

#[inline]
fn scale(value: i16, thousandths: i32) -> i16 {
    (i32::from(value) * thousandths / 1000) as i16
}

#[inline]
fn axis_from(negative: bool, positive: bool) -> i16 {
    match (negative, positive) {
        (true, false) => -STICK_MAX,
        (false, true) => STICK_MAX,
        _ => 0,
    }
}

/// A game mode bound to its runtime state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerMode {
    mode_id: ModeId,
    remaps: Vec<ButtonRemap, MAX_REMAPS>,
    socd: Vec<SocdState, MAX_SOCD_PAIRS>,
}

impl ControllerMode {
    #[must_use]
    pub fn new(config: &GameModeConfig) -> Self {
        Self {
            mode_id: config.mode_id,
            remaps: config.button_remapping.clone(),
            socd: config.socd_pairs.iter().copied().map(SocdState::new).collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn mode_id(&self) -> ModeId {
        self.mode_id
    }

    /// Produce this cycle's output.
    pub fn update(&mut self, inputs: &InputState) -> OutputState {
        let mut buttons = self.remap(inputs.buttons);
        for pair in &mut self.socd {
            pair.resolve(&mut buttons);
        }

        let mut out = OutputState::neutral();
        self.update_movement(buttons, &mut out);

        out.right_stick = AnalogStick::new(
            axis_from(buttons.is_pressed(C_LEFT), buttons.is_pressed(C_RIGHT)),
            axis_from(buttons.is_pressed(C_DOWN), buttons.is_pressed(C_UP)),
        );

        for (button, output) in BUTTON_MAP {
            out.buttons.set(output, buttons.is_pressed(button));
        }
        if buttons.is_pressed(Button::Lf4) {
            out.left_trigger = TRIGGER_MAX;
        }
        if buttons.is_pressed(Button::Rf5) {
            out.right_trigger = TRIGGER_MAX;
        } else if buttons.is_pressed(Button::Rf8) {
            out.right_trigger = MID_SHIELD;
        } else if buttons.is_pressed(Button::Rf7) {
            out.right_trigger = LIGHT_SHIELD;
        }

        if inputs.controller_connected {
            blend_controller(inputs, &mut out);
        }
        out
    }

    fn remap(&self, physical: ButtonMask) -> ButtonMask {
        let mut logical = physical;
        for remap in &self.remaps {
            logical.set(remap.physical, false);
        }
        for remap in &self.remaps {
            if physical.is_pressed(remap.physical) {
                logical.set(remap.activates, true);
            }
        }
        logical
    }

    fn update_movement(&self, buttons: ButtonMask, out: &mut OutputState) {
        let left = buttons.is_pressed(LEFT);
        let right = buttons.is_pressed(RIGHT);
        let up = buttons.is_pressed(UP);
        let down = buttons.is_pressed(DOWN);

        if self.mode_id == ModeId::Fgc {
            out.buttons.set(Buttons::DPAD_LEFT, left);
            out.buttons.set(Buttons::DPAD_RIGHT, right);
            out.buttons.set(Buttons::DPAD_UP, up);
            out.buttons.set(Buttons::DPAD_DOWN, down);
            return;
        }

        let mut x = axis_from(left, right);
        let mut y = axis_from(down, up);
        let modifier = match (
            buttons.is_pressed(MOD_X_BUTTON),
            buttons.is_pressed(MOD_Y_BUTTON),
        ) {
            (true, false) => Some(MOD_X),
            (false, true) => Some(MOD_Y),
            _ => None,
        };
        if let Some((mx, my)) = modifier {
            x = scale(x, mx);
            y = scale(y, my);
        }
        out.left_stick = AnalogStick::new(x, y);
    }
}

fn blend_controller(inputs: &InputState, out: &mut OutputState) {
    if out.left_stick.is_neutral() {
        out.left_stick = AnalogStick::new(
            widen_axis(inputs.axis(Axis::StickX)),
            widen_axis(inputs.axis(Axis::StickY)),
        );
    }
    if out.right_stick.is_neutral() {
        out.right_stick = AnalogStick::new(
            widen_axis(inputs.axis(Axis::CStickX)),
            widen_axis(inputs.axis(Axis::CStickY)),
        );
    }
    out.left_trigger = out.left_trigger.max(inputs.axis(Axis::TriggerL));
    out.right_trigger = out.right_trigger.max(inputs.axis(Axis::TriggerR));
}
