//! Configuration types and persisted format for the controller adapter.
//!
//! This crate holds everything that describes *how* the adapter should
//! behave, independent of any chip:
//!
//! - **Types**: logical inputs and configuration records
//!   - [`Button`] / [`ButtonMask`] - the 22 logical digital inputs
//!   - [`GameModeConfig`] - a selectable controller mode profile
//!   - [`KeyboardModeConfig`] - a keyboard-emulation profile
//!   - [`CommunicationBackendConfig`] - which output protocols to start
//!   - [`Config`] - the complete runtime configuration
//!
//! - **Defaults**: [`default_config()`] is the compiled fallback used when
//!   storage is blank or corrupt.
//!
//! - **Codec**: [`encode`] / [`decode`] convert a [`Config`] to and from the
//!   byte layout kept in persistent storage.
//!
//! # Persisted Format
//!
//! ```text
//! "HBXC" <version:u8> <payload_len:u16 LE> <payload...> <crc8>
//! ```
//!
//! The trailing checksum is CRC-8/SMBUS over everything before it. Erased
//! flash (all `0xFF`) fails the magic check, so a fresh device is detected as
//! "no configuration" rather than as a corrupt one.
//!
//! # Example
//!
//! ```
//! use config_proto::{decode, default_config, encode, MAX_ENCODED_SIZE};
//!
//! let config = default_config();
//! let mut buf = [0u8; MAX_ENCODED_SIZE];
//! let len = encode(&config, &mut buf).unwrap();
//! assert_eq!(decode(&buf[..len]).unwrap(), config);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod codec;
pub mod config;
pub mod crc;
pub mod defaults;
pub mod types;

pub use codec::{decode, encode, DecodeError, EncodeError, FORMAT_VERSION, MAGIC, MAX_ENCODED_SIZE};
pub use config::{
    binding_mask, Binding, ButtonRemap, CommunicationBackendConfig, Config, GameModeConfig, KeyMapping,
    KeyboardModeConfig, SocdPair, MAX_BACKEND_CONFIGS, MAX_BINDING_LEN, MAX_GAME_MODES,
    MAX_KEYBOARD_MODES, MAX_KEYMAP_LEN, MAX_REMAPS, MAX_SECONDARY_BACKENDS, MAX_SOCD_PAIRS,
};
pub use crc::calculate_crc8;
pub use defaults::default_config;
pub use types::{BackendId, Button, ButtonMask, ModeId, SocdType};
