//! Config record in the last sector of on-board flash.

use adapter_core::{ConfigMedium, PersistenceError};
use defmt::error;
use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;

/// Flash size of the Pico board.
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Start of the sector holding the record.
pub const CONFIG_OFFSET: u32 = (FLASH_SIZE - ERASE_SIZE) as u32;

pub struct FlashMedium {
    flash: Flash<'static, FLASH, Blocking, FLASH_SIZE>,
}

impl FlashMedium {
    pub fn new(flash: Flash<'static, FLASH, Blocking, FLASH_SIZE>) -> Self {
        Self { flash }
    }
}

impl ConfigMedium for FlashMedium {
    fn read(&mut self, buf: &mut [u8]) -> Result<(), PersistenceError> {
        self.flash.blocking_read(CONFIG_OFFSET, buf).map_err(|e| {
            error!("Flash read failed: {:?}", e);
            PersistenceError::Storage
        })
    }

    fn write(&mut self, data: &[u8]) -> Result<(), PersistenceError> {
        self.flash
            .blocking_erase(CONFIG_OFFSET, CONFIG_OFFSET + ERASE_SIZE as u32)
            .and_then(|()| self.flash.blocking_write(CONFIG_OFFSET, data))
            .map_err(|e| {
                error!("Flash write failed: {:?}", e);
                PersistenceError::Storage
            })
    }
}
