//! Backends this board can drive, and the factory that builds them.

use adapter_core::pinout::Pinout;
use adapter_core::{
    BackendError, BackendFactory, CommunicationBackend, ControllerMode, OutputState, SharedInputs,
};
use config_proto::{BackendId, Config};
use defmt::{info, warn};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_rp::Peri;
use embassy_usb::class::hid::State;
use embassy_usb::{Builder, Config as UsbConfig, UsbDevice};
use static_cell::StaticCell;

use crate::usb_output::{
    configure_gamepad_hid, configure_keyboard_hid, ReportLayout, UsbDriver, UsbGamepadBackend,
    UsbKeyboard,
};
use crate::Irqs;

/// USB device configuration buffers.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// One HID state per gamepad interface.
static GAMEPAD_STATES: [StaticCell<State<'static>>; 2] = [StaticCell::new(), StaticCell::new()];
static KEYBOARD_STATE: StaticCell<State<'static>> = StaticCell::new();

/// Every backend the firmware supports.
pub enum Backend {
    Gamepad(UsbGamepadBackend),
    InputViewer(InputViewerBackend),
}

impl CommunicationBackend for Backend {
    fn id(&self) -> BackendId {
        match self {
            Backend::Gamepad(b) => b.id(),
            Backend::InputViewer(b) => b.id(),
        }
    }

    fn inputs(&self) -> &'static SharedInputs {
        match self {
            Backend::Gamepad(b) => b.inputs(),
            Backend::InputViewer(b) => b.inputs(),
        }
    }

    fn set_game_mode(&mut self, mode: Option<ControllerMode>) {
        match self {
            Backend::Gamepad(b) => b.set_game_mode(mode),
            Backend::InputViewer(b) => b.set_game_mode(mode),
        }
    }

    async fn send_report(&mut self) -> Result<(), BackendError> {
        match self {
            Backend::Gamepad(b) => b.send_report().await,
            Backend::InputViewer(b) => b.send_report().await,
        }
    }
}

/// Logs the output state over RTT whenever it changes.
pub struct InputViewerBackend {
    inputs: &'static SharedInputs,
    mode: Option<ControllerMode>,
    last: Option<OutputState>,
}

impl InputViewerBackend {
    pub fn new(inputs: &'static SharedInputs) -> Self {
        Self {
            inputs,
            mode: None,
            last: None,
        }
    }
}

impl CommunicationBackend for InputViewerBackend {
    fn id(&self) -> BackendId {
        BackendId::InputViewer
    }

    fn inputs(&self) -> &'static SharedInputs {
        self.inputs
    }

    fn set_game_mode(&mut self, mode: Option<ControllerMode>) {
        self.mode = mode;
    }

    async fn send_report(&mut self) -> Result<(), BackendError> {
        let snapshot = self.inputs.snapshot();
        let state = match self.mode.as_mut() {
            Some(mode) => mode.update(&snapshot),
            None => OutputState::neutral(),
        };
        if self.last != Some(state) {
            info!("Viewer: {:?}", state);
            self.last = Some(state);
        }
        Ok(())
    }
}

/// Builds backends on one shared USB device.
///
/// The USB peripheral is only touched once the first USB backend is asked
/// for, after the boot safety check.
pub struct UsbBackendFactory {
    usb: Option<Peri<'static, USB>>,
    builder: Option<Builder<'static, UsbDriver>>,
    gamepads: usize,
}

impl UsbBackendFactory {
    pub fn new(usb: Peri<'static, USB>) -> Self {
        Self {
            usb: Some(usb),
            builder: None,
            gamepads: 0,
        }
    }

    fn builder(&mut self) -> Option<&mut Builder<'static, UsbDriver>> {
        if self.builder.is_none() {
            let usb = self.usb.take()?;
            let usb_driver = Driver::new(usb, Irqs);

            let mut usb_config = UsbConfig::new(0x1209, 0x0001); // pid.codes test VID/PID
            usb_config.manufacturer = Some("Rust Controller");
            usb_config.product = Some("Controller Adapter");
            usb_config.serial_number = Some("001");
            usb_config.max_power = 100;
            usb_config.max_packet_size_0 = 64;

            self.builder = Some(Builder::new(
                usb_driver,
                usb_config,
                CONFIG_DESCRIPTOR.init([0; 256]),
                BOS_DESCRIPTOR.init([0; 256]),
                MSOS_DESCRIPTOR.init([0; 256]),
                CONTROL_BUF.init([0; 64]),
            ));
        }
        self.builder.as_mut()
    }

    /// Build the USB device, if any backend needed it.
    pub fn finish(self) -> Option<UsbDevice<'static, Driver<'static, USB>>> {
        self.builder.map(Builder::build)
    }
}

impl BackendFactory for UsbBackendFactory {
    type Backend = Backend;
    type Keyboard = UsbKeyboard;

    fn build(
        &mut self,
        id: BackendId,
        pinout: &Pinout,
        inputs: &'static SharedInputs,
    ) -> Option<Backend> {
        match id {
            BackendId::InputViewer => {
                return Some(Backend::InputViewer(InputViewerBackend::new(inputs)));
            }
            BackendId::GamecubeConsole | BackendId::N64Console => {
                match pinout.joybus_data {
                    Some(pin) => warn!("No console output for {:?} on GPIO {}", id, pin),
                    None => warn!("No joybus pin fitted for {:?}", id),
                }
                return None;
            }
            BackendId::DInput | BackendId::XInput => {}
        }

        let layout = ReportLayout::for_backend(id)?;
        let Some(state) = GAMEPAD_STATES
            .get(self.gamepads)
            .and_then(|cell| cell.try_init(State::new()))
        else {
            warn!("No HID interface left for {:?}", id);
            return None;
        };
        self.gamepads += 1;
        let writer = configure_gamepad_hid(self.builder()?, state, layout);
        Some(Backend::Gamepad(UsbGamepadBackend::new(id, layout, writer, inputs)))
    }

    fn build_keyboard(&mut self, config: &Config) -> Option<UsbKeyboard> {
        let state = KEYBOARD_STATE.try_init(State::new())?;
        let writer = configure_keyboard_hid(self.builder()?, state);
        info!(
            "Keyboard overlay ready for {} modes",
            config.keyboard_modes.len()
        );
        Some(UsbKeyboard::new(writer))
    }
}
