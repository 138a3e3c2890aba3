//! Controller adapter firmware for RP2040.
//!
//! Board support for [`adapter_core`]: the pieces that touch RP2040
//! peripherals. Behaviour lives in the core crate.
//!
//! # Hardware Configuration
//!
//! | Function            | GPIO | Description |
//! |---------------------|------|-------------|
//! | Buttons             | see [`adapter_core::pinout::BUTTON_MAPPINGS`] | Active-low, pulled up |
//! | Controller port     | 9    | GameCube controller joybus data |
//! | LED                 | 25   | On once the boot safety check passes |
//! | USB                 | -    | HID gamepad and keyboard |
//!
//! # Architecture
//!
//! - **Core 0**: boot sequence, then the dispatch loop ([`adapter_core::App`]),
//!   plus the USB device task
//! - **Core 1**: its own executor running the
//!   [`SecondaryPoller`](adapter_core::SecondaryPoller) over a bit-banged
//!   joybus line ([`joybus::FlexJoybus`])
//!
//! # Modules
//!
//! - [`backend`]: closed set of backends ([`Backend`]) and their factory
//! - [`usb_output`]: USB HID gamepad and keyboard
//! - [`joybus`]: GPIO joybus host
//! - [`flash_store`]: config record in the last flash sector
//! - [`reboot`]: boot ROM access
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)

#![no_std]

use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::USB;

pub mod backend;
pub mod flash_store;
pub mod joybus;
pub mod reboot;
pub mod usb_output;

pub use backend::{Backend, UsbBackendFactory};
pub use flash_store::FlashMedium;
pub use joybus::FlexJoybus;
pub use reboot::RomBootloader;
pub use usb_output::{GamepadReport, ReportLayout, UsbGamepadBackend, UsbKeyboard, XInputReport};

/// Primary backend plus the most secondaries a backend config can list.
pub const MAX_BACKENDS: usize = 1 + config_proto::MAX_SECONDARY_BACKENDS;

bind_interrupts!(pub struct Irqs {
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});
