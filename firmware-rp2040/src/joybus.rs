//! Bit-banged joybus host on one GPIO.
//!
//! The line is open-drain with a pull-up: the host drives it low by switching
//! the pin to output, and releases it by switching back to input. Every bit
//! is a 4 us cell starting with a falling edge:
//!
//! ```text
//! 0: 3 us low, 1 us high
//! 1: 1 us low, 3 us high
//! ```
//!
//! A command ends with a single 1-bit stop bit. The device answers after a
//! short gap and its bits are sampled 2 us after each falling edge.

use adapter_core::{JoybusError, JoybusHost};
use cortex_m::asm;
use embassy_rp::gpio::{Flex, Pull};

/// Core clock cycles per microsecond at the default 125 MHz.
const CYCLES_PER_US: u32 = 125;

/// Spin-loop iterations per microsecond while watching the line.
const SPINS_PER_US: u32 = 8;

/// Longest wait for the first falling edge of a response.
const RESPONSE_TIMEOUT_US: u32 = 100;

/// Longest wait for the next edge inside a response.
const BIT_TIMEOUT_US: u32 = 8;

/// Host side of a joybus line.
pub struct FlexJoybus {
    pin: Flex<'static>,
}

impl FlexJoybus {
    pub fn new(mut pin: Flex<'static>) -> Self {
        pin.set_pull(Pull::Up);
        pin.set_low();
        pin.set_as_input();
        Self { pin }
    }

    #[inline(always)]
    fn delay_us(us: u32) {
        asm::delay(us * CYCLES_PER_US);
    }

    #[inline(always)]
    fn drive_low(&mut self) {
        self.pin.set_as_output();
    }

    #[inline(always)]
    fn release(&mut self) {
        self.pin.set_as_input();
    }

    fn write_bit(&mut self, one: bool) {
        let (low_us, high_us) = if one { (1, 3) } else { (3, 1) };
        self.drive_low();
        Self::delay_us(low_us);
        self.release();
        Self::delay_us(high_us);
    }

    fn write_byte(&mut self, byte: u8) {
        for bit in (0..8).rev() {
            self.write_bit(byte & (1 << bit) != 0);
        }
    }

    /// Spin until the line reads `high`, or fail after `timeout_us`.
    fn wait_for(&mut self, high: bool, timeout_us: u32) -> Result<(), JoybusError> {
        let mut spins = timeout_us * SPINS_PER_US;
        while self.pin.is_high() != high {
            if spins == 0 {
                return Err(JoybusError::Timeout);
            }
            spins -= 1;
            asm::delay(CYCLES_PER_US / SPINS_PER_US);
        }
        Ok(())
    }

    fn read_bit(&mut self, timeout_us: u32) -> Result<bool, JoybusError> {
        self.wait_for(false, timeout_us)?;
        Self::delay_us(2);
        let one = self.pin.is_high();
        self.wait_for(true, BIT_TIMEOUT_US)
            .map_err(|_| JoybusError::Framing)?;
        Ok(one)
    }

    fn read_byte(&mut self, first_timeout_us: u32) -> Result<u8, JoybusError> {
        let mut byte = 0u8;
        for i in 0..8 {
            let timeout = if i == 0 { first_timeout_us } else { BIT_TIMEOUT_US };
            let one = match self.read_bit(timeout) {
                Ok(one) => one,
                // A byte that stops halfway is corrupt, not merely over.
                Err(JoybusError::Timeout) if i > 0 => return Err(JoybusError::Framing),
                Err(e) => return Err(e),
            };
            byte = (byte << 1) | u8::from(one);
        }
        Ok(byte)
    }

    fn transfer_locked(
        &mut self,
        command: &[u8],
        response: &mut [u8],
    ) -> Result<usize, JoybusError> {
        for &byte in command {
            self.write_byte(byte);
        }
        self.write_bit(true);

        let mut len = 0;
        for slot in response.iter_mut() {
            let timeout = if len == 0 {
                RESPONSE_TIMEOUT_US
            } else {
                BIT_TIMEOUT_US
            };
            match self.read_byte(timeout) {
                Ok(byte) => {
                    *slot = byte;
                    len += 1;
                }
                Err(JoybusError::Timeout) if len == 0 => return Err(JoybusError::NoResponse),
                Err(JoybusError::Timeout) => break,
                Err(e) => return Err(e),
            }
        }

        // Device stop bit. The payload is already complete, so a missing or
        // malformed stop bit does not fail the transfer.
        let _ = self.read_bit(BIT_TIMEOUT_US);
        Ok(len)
    }
}

impl JoybusHost for FlexJoybus {
    fn transfer(&mut self, command: &[u8], response: &mut [u8]) -> Result<usize, JoybusError> {
        cortex_m::interrupt::free(|_| self.transfer_locked(command, response))
    }
}
