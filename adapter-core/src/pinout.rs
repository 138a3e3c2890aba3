//! Compile-time board wiring.
//!
//! Default layout is a b0xx-style leverless controller on a Raspberry Pi
//! Pico. Comments give the Melee meaning of each button.

use config_proto::Button;

/// One digital button wired to one GPIO.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpioButtonMapping {
    pub button: Button,
    pub pin: u8,
}

const fn map(button: Button, pin: u8) -> GpioButtonMapping {
    GpioButtonMapping { button, pin }
}

/// Button to GPIO assignment.
pub const BUTTON_MAPPINGS: [GpioButtonMapping; Button::COUNT] = [
    map(Button::Lf1, 2),  // right
    map(Button::Lf2, 3),  // down
    map(Button::Lf3, 4),  // left
    map(Button::Lf4, 5),  // L digital
    map(Button::Lt1, 6),  // ModX
    map(Button::Lt2, 7),  // ModY
    map(Button::Mb1, 0),  // start
    map(Button::Mb2, 10), // select
    map(Button::Mb3, 11), // home
    map(Button::Rt1, 14), // A
    map(Button::Rt2, 15), // c-down
    map(Button::Rt3, 13), // c-left
    map(Button::Rt4, 12), // c-up
    map(Button::Rt5, 16), // c-right
    map(Button::Rf1, 26), // B
    map(Button::Rf2, 21), // X
    map(Button::Rf3, 19), // Z
    map(Button::Rf4, 17), // up
    map(Button::Rf5, 27), // R digital
    map(Button::Rf6, 22), // Y
    map(Button::Rf7, 20), // light shield
    map(Button::Rf8, 18), // mid shield
];

/// Optional peripheral pins. `None` means not fitted.
///
/// Passed to the backend factory at boot; console backends use
/// `joybus_data`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pinout {
    pub joybus_data: Option<u8>,
    pub nes_data: Option<u8>,
    pub nes_clock: Option<u8>,
    pub nes_latch: Option<u8>,
    pub mux: Option<u8>,
    pub nunchuk_detect: Option<u8>,
    pub nunchuk_sda: Option<u8>,
    pub nunchuk_scl: Option<u8>,
}

pub const PINOUT: Pinout = Pinout {
    joybus_data: Some(28),
    nes_data: None,
    nes_clock: None,
    nes_latch: None,
    mux: None,
    nunchuk_detect: None,
    nunchuk_sda: None,
    nunchuk_scl: None,
};

/// Port for a GameCube controller read by the second core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerPort {
    pub data_pin: u8,
    pub polling_rate_hz: u32,
}

impl ControllerPort {
    /// Time between polls.
    #[must_use]
    pub const fn period_us(&self) -> u32 {
        1_000_000 / self.polling_rate_hz
    }
}

pub const CONTROLLER_PORT: ControllerPort = ControllerPort {
    data_pin: 9,
    polling_rate_hz: 2500,
};

/// Held at power-on to reboot into the USB bootloader.
pub const REPROGRAM_HOLD: [Button; 1] = [Button::Rt2];

/// On-board LED, lit once the safety check has passed.
pub const LED_PIN: u8 = 25;
