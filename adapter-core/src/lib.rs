//! Platform-agnostic runtime core of the controller adapter.
//!
//! This crate holds the adapter's behaviour without any chip-specific
//! dependencies, so it runs both on the RP2040 and on host for testing.
//!
//! # Overview
//!
//! - [`snapshot`]: the shared input snapshot ([`SharedInputs`]) and field
//!   ownership ([`FieldSet`])
//! - [`input`]: input sources ([`InputSource`], [`GpioButtonInput`],
//!   [`GamecubeControllerInput`])
//! - [`mode`]: controller modes turning buttons into output ([`ControllerMode`])
//! - [`keyboard`]: keyboard overlay reports ([`KeyboardReport`])
//! - [`backend`]: output backends and the sealed set ([`BackendSet`])
//! - [`arbiter`]: runtime mode switching ([`ModeArbiter`])
//! - [`persistence`]: config storage ([`ConfigStore`], [`load_config`])
//! - [`publish`]: one-shot cross-core publication ([`Publication`])
//! - [`bootstrap`]: the boot sequence ([`Bootstrap`])
//! - [`app`]: the primary dispatch loop ([`App`])
//! - [`poller`]: the secondary core loop ([`SecondaryPoller`])
//! - [`pinout`]: board wiring tables
//!
//! # Execution model
//!
//! ```text
//! core 0: Bootstrap -> App::run   { scan -> select mode -> report every backend -> keyboard }
//! core 1: SecondaryPoller::run    { wait for publication -> build source -> refresh forever }
//! ```
//!
//! The two cores share one [`SharedInputs`] and one [`Publication`], both
//! `'static`. Each core's input source writes its own disjoint set of fields.
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Log through `defmt` instead of the `log` facade

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod app;
pub mod arbiter;
pub mod backend;
pub mod bootstrap;
pub mod input;
pub mod keyboard;
pub mod mode;
pub mod output;
pub mod persistence;
pub mod pinout;
pub mod poller;
pub mod publish;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod testing;

pub use app::App;
pub use arbiter::{ModeArbiter, ModeState};
pub use backend::{
    initialize_backends, BackendError, BackendFactory, BackendHandle, BackendSet,
    CommunicationBackend,
};
pub use bootstrap::{BootStage, Bootloader, Bootstrap};
pub use input::{
    GamecubeControllerInput, GpioButtonInput, InputSource, JoybusError, JoybusHost,
    GAMECUBE_FIELDS,
};
pub use keyboard::{keyboard_report, KeyboardOverlay, KeyboardReport, NoKeyboard};
pub use mode::ControllerMode;
pub use output::{AnalogStick, Buttons, OutputState};
pub use persistence::{
    load_config, CodecStore, ConfigMedium, ConfigSource, ConfigStore, LoadedConfig,
    PersistenceError,
};
pub use poller::{PollerState, SecondaryPoller};
pub use publish::{Publication, PublishError};
pub use snapshot::{Axis, Field, FieldSet, InputState, SharedInputs, AXIS_CENTER};
