//! USB HID gamepad and keyboard outputs.

use adapter_core::{
    BackendError, CommunicationBackend, ControllerMode, KeyboardOverlay, KeyboardReport,
    OutputState, SharedInputs,
};
use config_proto::BackendId;
use defmt::Format;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::class::hid::{HidBootProtocol, HidSubclass, HidWriter, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::Builder;
use usbd_hid::descriptor::{KeyboardReport as HidKeyboardReport, SerializedDescriptor};

/// Largest gamepad report of any layout.
pub const MAX_REPORT_SIZE: usize = XInputReport::SIZE;

pub type UsbDriver = Driver<'static, USB>;
pub type GamepadWriter = HidWriter<'static, UsbDriver, MAX_REPORT_SIZE>;
pub type KeyboardWriter = HidWriter<'static, UsbDriver, 8>;

/// Compact gamepad report for the generic descriptor.
///
/// Total size: 8 bytes (buttons: 2, sticks: 4x1, triggers: 2x1). Stick values
/// keep only the high byte of the 16-bit output.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Format)]
#[repr(C)]
pub struct GamepadReport {
    pub buttons: u16,
    pub left_stick_x: i8,
    pub left_stick_y: i8,
    pub right_stick_x: i8,
    pub right_stick_y: i8,
    pub left_trigger: u8,
    pub right_trigger: u8,
}

impl GamepadReport {
    pub const SIZE: usize = 8;

    #[must_use]
    pub fn as_bytes(&self) -> [u8; Self::SIZE] {
        let buttons_bytes = self.buttons.to_le_bytes();
        [
            buttons_bytes[0],
            buttons_bytes[1],
            self.left_stick_x as u8,
            self.left_stick_y as u8,
            self.right_stick_x as u8,
            self.right_stick_y as u8,
            self.left_trigger,
            self.right_trigger,
        ]
    }
}

impl From<&OutputState> for GamepadReport {
    // HID Y grows downward.
    fn from(state: &OutputState) -> Self {
        Self {
            buttons: state.buttons.raw(),
            left_stick_x: (state.left_stick.x >> 8) as i8,
            left_stick_y: (state.left_stick.y.saturating_neg() >> 8) as i8,
            right_stick_x: (state.right_stick.x >> 8) as i8,
            right_stick_y: (state.right_stick.y.saturating_neg() >> 8) as i8,
            left_trigger: state.left_trigger,
            right_trigger: state.right_trigger,
        }
    }
}

/// Full-resolution report for the Xbox-style descriptor.
///
/// Total size: 12 bytes (buttons: 2, sticks: 4x2 LE, triggers: 2x1).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Format)]
pub struct XInputReport {
    pub buttons: u16,
    pub left_stick: [i16; 2],
    pub right_stick: [i16; 2],
    pub left_trigger: u8,
    pub right_trigger: u8,
}

impl XInputReport {
    pub const SIZE: usize = 12;

    #[must_use]
    pub fn as_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..2].copy_from_slice(&self.buttons.to_le_bytes());
        for (i, value) in self
            .left_stick
            .iter()
            .chain(self.right_stick.iter())
            .enumerate()
        {
            let at = 2 + i * 2;
            bytes[at..at + 2].copy_from_slice(&value.to_le_bytes());
        }
        bytes[10] = self.left_trigger;
        bytes[11] = self.right_trigger;
        bytes
    }
}

impl From<&OutputState> for XInputReport {
    fn from(state: &OutputState) -> Self {
        Self {
            buttons: state.buttons.raw(),
            left_stick: [state.left_stick.x, state.left_stick.y.saturating_neg()],
            right_stick: [state.right_stick.x, state.right_stick.y.saturating_neg()],
            left_trigger: state.left_trigger,
            right_trigger: state.right_trigger,
        }
    }
}

/// Generic HID gamepad descriptor.
///
/// - 16 buttons
/// - 2 analog sticks (X/Y each, signed 8-bit)
/// - 2 triggers (unsigned 8-bit)
pub const DINPUT_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    //
    // --- Buttons (16 buttons) ---
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (Button 1)
    0x29, 0x10, //   Usage Maximum (Button 16)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x95, 0x10, //   Report Count (16)
    0x75, 0x01, //   Report Size (1)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Left Stick ---
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x30, //   Usage (X)
    0x09, 0x31, //   Usage (Y)
    0x15, 0x81, //   Logical Minimum (-127)
    0x25, 0x7F, //   Logical Maximum (127)
    0x95, 0x02, //   Report Count (2)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- C-Stick ---
    0x09, 0x32, //   Usage (Z)
    0x09, 0x35, //   Usage (Rz)
    0x95, 0x02, //   Report Count (2)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Triggers ---
    0x09, 0x33, //   Usage (Rx) - Left trigger
    0x09, 0x34, //   Usage (Ry) - Right trigger
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x95, 0x02, //   Report Count (2)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    0xC0, // End Collection
];

/// Xbox-style HID gamepad descriptor with 16-bit sticks.
pub const XINPUT_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    0xA1, 0x00, //   Collection (Physical)
    //
    // --- Buttons (16 buttons) ---
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum (Button 1)
    0x29, 0x10, //     Usage Maximum (Button 16)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x95, 0x10, //     Report Count (16)
    0x75, 0x01, //     Report Size (1)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    //
    // --- Left Stick ---
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x16, 0x01, 0x80, // Logical Minimum (-32767)
    0x26, 0xFF, 0x7F, // Logical Maximum (32767)
    0x95, 0x02, //     Report Count (2)
    0x75, 0x10, //     Report Size (16)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    //
    // --- C-Stick ---
    0x09, 0x32, //     Usage (Z)
    0x09, 0x35, //     Usage (Rz)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    //
    // --- Triggers ---
    0x09, 0x33, //     Usage (Rx)
    0x09, 0x34, //     Usage (Ry)
    0x15, 0x00, //     Logical Minimum (0)
    0x26, 0xFF, 0x00, // Logical Maximum (255)
    0x95, 0x02, //     Report Count (2)
    0x75, 0x08, //     Report Size (8)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    //
    0xC0, //   End Collection
    0xC0, // End Collection
];

/// Wire layout of a gamepad backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Format)]
pub enum ReportLayout {
    DInput,
    XInput,
}

impl ReportLayout {
    #[must_use]
    pub fn for_backend(id: BackendId) -> Option<Self> {
        match id {
            BackendId::DInput => Some(ReportLayout::DInput),
            BackendId::XInput => Some(ReportLayout::XInput),
            _ => None,
        }
    }

    #[must_use]
    pub fn descriptor(self) -> &'static [u8] {
        match self {
            ReportLayout::DInput => DINPUT_REPORT_DESCRIPTOR,
            ReportLayout::XInput => XINPUT_REPORT_DESCRIPTOR,
        }
    }

    #[must_use]
    pub fn report_size(self) -> usize {
        match self {
            ReportLayout::DInput => GamepadReport::SIZE,
            ReportLayout::XInput => XInputReport::SIZE,
        }
    }

    /// Encode `state` into `buf`, returning the report length.
    pub fn encode(self, state: &OutputState, buf: &mut [u8; MAX_REPORT_SIZE]) -> usize {
        match self {
            ReportLayout::DInput => {
                buf[..GamepadReport::SIZE].copy_from_slice(&GamepadReport::from(state).as_bytes());
            }
            ReportLayout::XInput => {
                buf.copy_from_slice(&XInputReport::from(state).as_bytes());
            }
        }
        self.report_size()
    }
}

fn map_endpoint_error(err: EndpointError) -> BackendError {
    match err {
        EndpointError::Disabled => BackendError::NotReady,
        EndpointError::BufferOverflow => BackendError::Io,
    }
}

/// Gamepad interface on the USB device.
pub struct UsbGamepadBackend {
    id: BackendId,
    layout: ReportLayout,
    writer: GamepadWriter,
    inputs: &'static SharedInputs,
    mode: Option<ControllerMode>,
}

impl UsbGamepadBackend {
    pub fn new(
        id: BackendId,
        layout: ReportLayout,
        writer: GamepadWriter,
        inputs: &'static SharedInputs,
    ) -> Self {
        Self {
            id,
            layout,
            writer,
            inputs,
            mode: None,
        }
    }
}

impl CommunicationBackend for UsbGamepadBackend {
    fn id(&self) -> BackendId {
        self.id
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
        let mut buf = [0u8; MAX_REPORT_SIZE];
        let len = self.layout.encode(&state, &mut buf);
        self.writer
            .write(&buf[..len])
            .await
            .map_err(map_endpoint_error)
    }
}

/// Boot keyboard interface on the USB device.
pub struct UsbKeyboard {
    writer: KeyboardWriter,
}

impl UsbKeyboard {
    pub fn new(writer: KeyboardWriter) -> Self {
        Self { writer }
    }
}

impl KeyboardOverlay for UsbKeyboard {
    async fn send_report(&mut self, report: &KeyboardReport) -> Result<(), BackendError> {
        self.writer
            .write(&report.as_bytes())
            .await
            .map_err(map_endpoint_error)
    }
}

/// Add a gamepad HID interface with `layout`'s descriptor.
pub fn configure_gamepad_hid(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static mut State<'static>,
    layout: ReportLayout,
) -> GamepadWriter {
    let config = embassy_usb::class::hid::Config {
        report_descriptor: layout.descriptor(),
        request_handler: None,
        poll_ms: 1,
        max_packet_size: 64,
        hid_subclass: HidSubclass::No,
        hid_boot_protocol: HidBootProtocol::None,
    };

    HidWriter::new(builder, state, config)
}

/// Add a boot keyboard HID interface.
pub fn configure_keyboard_hid(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static mut State<'static>,
) -> KeyboardWriter {
    let config = embassy_usb::class::hid::Config {
        report_descriptor: HidKeyboardReport::desc(),
        request_handler: None,
        poll_ms: 1,
        max_packet_size: 8,
        hid_subclass: HidSubclass::Boot,
        hid_boot_protocol: HidBootProtocol::Keyboard,
    };

    HidWriter::new(builder, state, config)
}
