//! Keyboard emulation overlay.

use core::future::Future;

use config_proto::KeyboardModeConfig;

use crate::backend::BackendError;
use crate::snapshot::InputState;

/// Maximum simultaneous non-modifier keys in a boot keyboard report.
pub const MAX_KEYS: usize = 6;

const MODIFIER_FIRST: u8 = 0xE0;
const MODIFIER_LAST: u8 = 0xE7;

/// Standard 8-byte HID boot keyboard report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    /// Bit `n` is modifier usage `0xE0 + n`.
    pub modifier: u8,
    pub keycodes: [u8; MAX_KEYS],
}

impl KeyboardReport {
    /// Serialize as `modifier, reserved, keycodes[6]`.
    #[must_use]
    pub fn as_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0] = self.modifier;
        bytes[2..].copy_from_slice(&self.keycodes);
        bytes
    }
}

/// Build the report for the buttons held in `inputs`.
///
/// Keys are taken in keymap order; presses beyond [`MAX_KEYS`] are dropped.
#[must_use]
pub fn keyboard_report(mode: &KeyboardModeConfig, inputs: &InputState) -> KeyboardReport {
    let mut report = KeyboardReport::default();
    let mut count = 0;
    for mapping in &mode.keymap {
        if !inputs.is_pressed(mapping.button) {
            continue;
        }
        match mapping.keycode {
            code @ MODIFIER_FIRST..=MODIFIER_LAST => report.modifier |= 1 << (code - MODIFIER_FIRST),
            0 => {}
            code if count < MAX_KEYS => {
                report.keycodes[count] = code;
                count += 1;
            }
            _ => {}
        }
    }
    report
}

/// Transport for keyboard reports.
pub trait KeyboardOverlay {
    fn send_report(&mut self, report: &KeyboardReport) -> impl Future<Output = Result<(), BackendError>>;
}

/// Overlay for builds without a keyboard transport.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoKeyboard;

impl KeyboardOverlay for NoKeyboard {
    async fn send_report(&mut self, _report: &KeyboardReport) -> Result<(), BackendError> {
        Err(BackendError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_proto::{default_config, Button, ButtonMask, KeyMapping};

    fn held(buttons: &[Button]) -> InputState {
        InputState {
            buttons: ButtonMask::from_buttons(buttons),
            ..InputState::neutral()
        }
    }

    #[test]
    fn test_default_keymap_letters() {
        let config = default_config();
        let mode = &config.keyboard_modes[0];
        let report = keyboard_report(mode, &held(&[Button::Lf1, Button::Lf3]));
        assert_eq!(report.modifier, 0);
        assert_eq!(report.keycodes, [0x04, 0x06, 0, 0, 0, 0]);
        assert_eq!(report.as_bytes(), [0, 0, 0x04, 0x06, 0, 0, 0, 0]);
    }

    #[test]
    fn test_at_most_six_keys() {
        let config = default_config();
        let report = keyboard_report(&config.keyboard_modes[0], &held(&Button::ALL));
        assert_eq!(report.keycodes, [0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);
    }

    #[test]
    fn test_modifier_usages_set_bits() {
        let mut mode = default_config().keyboard_modes[0].clone();
        mode.keymap.clear();
        let _ = mode.keymap.push(KeyMapping {
            button: Button::Lt1,
            keycode: 0xE1, // left shift
        });
        let _ = mode.keymap.push(KeyMapping {
            button: Button::Rt1,
            keycode: 0x2C, // space
        });
        let report = keyboard_report(&mode, &held(&[Button::Lt1, Button::Rt1]));
        assert_eq!(report.modifier, 0b0000_0010);
        assert_eq!(report.keycodes[0], 0x2C);
    }

    #[test]
    fn test_nothing_held_is_empty_report() {
        let config = default_config();
        let report = keyboard_report(&config.keyboard_modes[0], &InputState::neutral());
        assert_eq!(report, KeyboardReport::default());
    }
}
