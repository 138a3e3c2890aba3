//! Boot ROM access and the status LED.

use adapter_core::Bootloader;
use defmt::info;
use embassy_rp::gpio::Output;
use embassy_rp::rom_data;

/// Reboots through the RP2040 boot ROM.
pub struct RomBootloader {
    led: Output<'static>,
}

impl RomBootloader {
    pub fn new(led: Output<'static>) -> Self {
        Self { led }
    }
}

impl Bootloader for RomBootloader {
    fn reboot_to_bootloader(&mut self) -> ! {
        info!("Rebooting to USB bootloader");
        // No activity LED and every boot interface enabled.
        #[allow(unused_unsafe)]
        unsafe {
            rom_data::reset_to_usb_boot(0, 0);
        }
        loop {
            cortex_m::asm::wfi();
        }
    }

    fn safety_check_passed(&mut self) {
        self.led.set_high();
    }
}
