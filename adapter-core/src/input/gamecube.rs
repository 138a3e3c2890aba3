//! GameCube controller read over joybus.
//!
//! The controller is probed with command `0x00` until it answers with a
//! GameCube device id, then polled with `0x40 0x03 0x00`. The 8-byte poll
//! response is:
//!
//! ```text
//! byte  0-1  buttons (ignored, digital buttons come from GPIO)
//! byte  2    stick X
//! byte  3    stick Y
//! byte  4    c-stick X
//! byte  5    c-stick Y
//! byte  6    L analog
//! byte  7    R analog
//! ```
//!
//! Any failed transfer marks the controller as gone and centres its axes; the
//! next refresh probes again before polling.

use super::InputSource;
use crate::snapshot::{Axis, Field, FieldSet, SharedInputs};

/// Probe / identify command.
pub const PROBE_COMMAND: [u8; 1] = [0x00];
/// Status poll with rumble off.
pub const POLL_COMMAND: [u8; 3] = [0x40, 0x03, 0x00];
/// First byte of a standard GameCube controller's device id.
pub const GAMECUBE_DEVICE_ID: u8 = 0x09;

const PROBE_RESPONSE_LEN: usize = 3;
const POLL_RESPONSE_LEN: usize = 8;

/// Fields written by [`GamecubeControllerInput`].
pub const GAMECUBE_FIELDS: FieldSet = FieldSet::AXES.with(Field::ControllerConnected);

/// Error type for joybus transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JoybusError {
    /// No device drove the line after the command.
    NoResponse,
    /// The device stopped mid-response.
    Timeout,
    /// A bit cell did not decode.
    Framing,
    /// Fewer bytes than requested were received.
    ShortResponse,
}

/// Host side of a joybus line.
///
/// Transfers are blocking: the wire timing leaves no room for an executor
/// to run in between.
pub trait JoybusHost {
    /// Send `command` and read up to `response.len()` bytes back.
    ///
    /// Returns the number of bytes received.
    fn transfer(&mut self, command: &[u8], response: &mut [u8]) -> Result<usize, JoybusError>;
}

impl<T: JoybusHost + ?Sized> JoybusHost for &mut T {
    fn transfer(&mut self, command: &[u8], response: &mut [u8]) -> Result<usize, JoybusError> {
        (**self).transfer(command, response)
    }
}

/// Analog axes and presence of a GameCube controller.
pub struct GamecubeControllerInput<H> {
    host: H,
    connected: bool,
}

impl<H: JoybusHost> GamecubeControllerInput<H> {
    #[must_use]
    pub fn new(host: H) -> Self {
        Self {
            host,
            connected: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn probe(&mut self) -> Result<(), JoybusError> {
        let mut id = [0u8; PROBE_RESPONSE_LEN];
        let len = self.host.transfer(&PROBE_COMMAND, &mut id)?;
        if len == 0 {
            return Err(JoybusError::ShortResponse);
        }
        if id[0] != GAMECUBE_DEVICE_ID {
            return Err(JoybusError::Framing);
        }
        Ok(())
    }

    fn poll(&mut self) -> Result<[u8; POLL_RESPONSE_LEN], JoybusError> {
        let mut report = [0u8; POLL_RESPONSE_LEN];
        let len = self.host.transfer(&POLL_COMMAND, &mut report)?;
        if len < POLL_RESPONSE_LEN {
            return Err(JoybusError::ShortResponse);
        }
        Ok(report)
    }

    fn disconnect(&mut self, inputs: &SharedInputs) {
        for axis in Axis::ALL {
            inputs.set_axis(axis, axis.neutral());
        }
        inputs.set_controller_connected(false);
        self.connected = false;
    }
}

impl<H: JoybusHost> InputSource for GamecubeControllerInput<H> {
    fn refresh(&mut self, inputs: &SharedInputs) {
        if !self.connected {
            if self.probe().is_err() {
                self.disconnect(inputs);
                return;
            }
            debug!("GameCube controller detected");
            self.connected = true;
        }

        match self.poll() {
            Ok(report) => {
                for (axis, value) in Axis::ALL.iter().zip(&report[2..]) {
                    inputs.set_axis(*axis, *value);
                }
                inputs.set_controller_connected(true);
            }
            Err(e) => {
                debug!("GameCube controller lost: {:?}", e);
                self.disconnect(inputs);
            }
        }
    }

    fn owned_fields(&self) -> FieldSet {
        GAMECUBE_FIELDS
    }
}
