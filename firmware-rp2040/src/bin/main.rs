#![no_std]
#![no_main]

use adapter_core::pinout::{BUTTON_MAPPINGS, CONTROLLER_PORT, LED_PIN, PINOUT, REPROGRAM_HOLD};
use adapter_core::{
    BackendHandle, Bootstrap, CodecStore, GamecubeControllerInput, GpioButtonInput, Publication,
    SecondaryPoller, SharedInputs, GAMECUBE_FIELDS,
};
use adapter_rp2040::{FlashMedium, FlexJoybus, RomBootloader, UsbBackendFactory, MAX_BACKENDS};
use defmt::{info, warn};
use defmt_rtt as _;
use embassy_executor::{Executor, Spawner};
use embassy_rp::flash::Flash;
use embassy_rp::gpio::{AnyPin, Flex, Input, Level, Output, Pull};
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_rp::Peri;
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

/// Input snapshot shared by both cores.
static INPUTS: SharedInputs = SharedInputs::new();

/// Backend set handle, published once core 0 has finished booting.
static BACKENDS: Publication<BackendHandle<MAX_BACKENDS>> = Publication::new();

static CORE1_STACK: StaticCell<Stack<4096>> = StaticCell::new();
static CORE1_EXECUTOR: StaticCell<Executor> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Controller adapter starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    let mut pins: [Option<Peri<'static, AnyPin>>; 30] = [
        Some(p.PIN_0.into()),
        Some(p.PIN_1.into()),
        Some(p.PIN_2.into()),
        Some(p.PIN_3.into()),
        Some(p.PIN_4.into()),
        Some(p.PIN_5.into()),
        Some(p.PIN_6.into()),
        Some(p.PIN_7.into()),
        Some(p.PIN_8.into()),
        Some(p.PIN_9.into()),
        Some(p.PIN_10.into()),
        Some(p.PIN_11.into()),
        Some(p.PIN_12.into()),
        Some(p.PIN_13.into()),
        Some(p.PIN_14.into()),
        Some(p.PIN_15.into()),
        Some(p.PIN_16.into()),
        Some(p.PIN_17.into()),
        Some(p.PIN_18.into()),
        Some(p.PIN_19.into()),
        Some(p.PIN_20.into()),
        Some(p.PIN_21.into()),
        Some(p.PIN_22.into()),
        Some(p.PIN_23.into()),
        Some(p.PIN_24.into()),
        Some(p.PIN_25.into()),
        Some(p.PIN_26.into()),
        Some(p.PIN_27.into()),
        Some(p.PIN_28.into()),
        Some(p.PIN_29.into()),
    ];

    // --- Core 1: controller port ---
    // Started first so it is already waiting when the backends are published.
    let Some(data_pin) = pins[usize::from(CONTROLLER_PORT.data_pin)].take() else {
        defmt::panic!("Controller data pin in use");
    };
    spawn_core1(p.CORE1, CORE1_STACK.init(Stack::new()), move || {
        let executor = CORE1_EXECUTOR.init(Executor::new());
        executor.run(|spawner| spawner.spawn(controller_task(data_pin).unwrap()));
    });

    // --- Core 0: buttons, config, backends ---
    let mut buttons = GpioButtonInput::new();
    for mapping in BUTTON_MAPPINGS.iter() {
        match pins[usize::from(mapping.pin)].take() {
            Some(pin) => {
                let _ = buttons.add(mapping.button, Input::new(pin, Pull::Up));
            }
            None => warn!("GPIO {} already in use, {:?} unmapped", mapping.pin, mapping.button),
        }
    }

    let Some(led_pin) = pins[usize::from(LED_PIN)].take() else {
        defmt::panic!("LED pin in use");
    };
    let mut bootloader = RomBootloader::new(Output::new(led_pin, Level::Low));
    let mut store = CodecStore::new(FlashMedium::new(Flash::new_blocking(p.FLASH)));
    let mut factory = UsbBackendFactory::new(p.USB);

    let mut app = Bootstrap {
        source: buttons,
        store: &mut store,
        factory: &mut factory,
        bootloader: &mut bootloader,
        inputs: &INPUTS,
        publication: &BACKENDS,
        pinout: &PINOUT,
        reprogram_hold: &REPROGRAM_HOLD,
        secondary_fields: GAMECUBE_FIELDS,
    }
    .run();

    match factory.finish() {
        Some(usb_device) => spawner.spawn(usb_task(usb_device).unwrap()),
        None => warn!("No USB backend configured"),
    }

    info!("Controller adapter initialized, mode {:?}", app.mode());
    app.run().await
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: embassy_usb::UsbDevice<'static, Driver<'static, USB>>) {
    device.run().await;
}

/// Controller task - polls the GameCube controller on core 1.
#[embassy_executor::task]
async fn controller_task(data_pin: Peri<'static, AnyPin>) {
    let mut poller = SecondaryPoller::new(
        &BACKENDS,
        move || GamecubeControllerInput::new(FlexJoybus::new(Flex::new(data_pin))),
        embassy_time::Delay,
        CONTROLLER_PORT.period_us(),
    );
    poller.run().await
}
