//! Binary encoding of [`Config`] for persistent storage.
//!
//! # Layout
//!
//! ```text
//! offset  size  field
//! 0       4     magic "HBXC"
//! 4       1     format version
//! 5       2     payload length (LE)
//! 7       n     payload
//! 7+n     1     CRC-8/SMBUS of bytes [0, 7+n)
//! ```
//!
//! The payload is a flat sequence of `u8` fields. Every list is prefixed by
//! its element count:
//!
//! ```text
//! default_backend_config
//! game_modes:    count, { mode_id, binding, remaps{physical, activates}, socd{dir1, dir2, type} }
//! keyboard:      count, { id, binding, keymap{button, keycode} }
//! backends:      count, { backend_id, default_mode, binding, secondary{id} }
//! binding:       count, { button }
//! ```
//!
//! Decoding builds a fresh [`Config`] and only returns it once the whole
//! record has been validated, so a corrupt store never yields a partially
//! filled configuration.

use heapless::Vec;

use crate::config::{
    Binding, ButtonRemap, CommunicationBackendConfig, Config, GameModeConfig, KeyMapping,
    KeyboardModeConfig, SocdPair,
};
use crate::crc::calculate_crc8;
use crate::types::{BackendId, Button, ModeId, SocdType};

/// Magic prefix of a stored configuration.
pub const MAGIC: [u8; 4] = *b"HBXC";

/// Current format version.
pub const FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = MAGIC.len() + 1 + 2;

/// Upper bound on the encoded size of any [`Config`].
///
/// Rounded up to a multiple of 256 so the record fits whole flash pages.
pub const MAX_ENCODED_SIZE: usize = 1024;

/// Error type for decoding a stored configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Magic bytes missing (blank or foreign storage).
    BadMagic,
    /// Written by a format this build does not understand.
    UnsupportedVersion(u8),
    /// Record ends before the declared length.
    Truncated,
    /// Checksum mismatch.
    Checksum,
    /// A field holds a value outside its enumeration or capacity.
    Invalid,
}

/// Error type for encoding a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Output buffer too small.
    BufferTooSmall,
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    #[inline]
    fn new(buf: &'a mut [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    #[inline]
    fn u8(&mut self, value: u8) -> Result<(), EncodeError> {
        let slot = self.buf.get_mut(self.pos).ok_or(EncodeError::BufferTooSmall)?;
        *slot = value;
        self.pos += 1;
        Ok(())
    }

    #[inline]
    fn len(&mut self, len: usize) -> Result<(), EncodeError> {
        // Every list capacity is well below 256.
        self.u8(len as u8)
    }

    fn binding(&mut self, binding: &Binding) -> Result<(), EncodeError> {
        self.len(binding.len())?;
        for &button in binding {
            self.u8(button as u8)?;
        }
        Ok(())
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    #[inline]
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    fn u8(&mut self) -> Result<u8, DecodeError> {
        let value = *self.data.get(self.pos).ok_or(DecodeError::Truncated)?;
        self.pos += 1;
        Ok(value)
    }

    #[inline]
    fn button(&mut self) -> Result<Button, DecodeError> {
        Button::from_u8(self.u8()?).ok_or(DecodeError::Invalid)
    }

    /// Read a list count and check it against `capacity`.
    #[inline]
    fn count(&mut self, capacity: usize) -> Result<usize, DecodeError> {
        let count = self.u8()? as usize;
        if count > capacity {
            return Err(DecodeError::Invalid);
        }
        Ok(count)
    }

    fn binding(&mut self) -> Result<Binding, DecodeError> {
        let mut binding = Binding::new();
        for _ in 0..self.count(binding.capacity())? {
            binding.push(self.button()?).map_err(|_| DecodeError::Invalid)?;
        }
        Ok(binding)
    }

    #[inline]
    fn is_exhausted(&self) -> bool {
        self.pos == self.data.len()
    }
}

/// Push into a fixed-capacity list, mapping overflow to [`DecodeError::Invalid`].
#[inline]
fn push<T, const N: usize>(list: &mut Vec<T, N>, item: T) -> Result<(), DecodeError> {
    list.push(item).map_err(|_| DecodeError::Invalid)
}

/// Encode `config` into `buf`, returning the number of bytes written.
pub fn encode(config: &Config, buf: &mut [u8]) -> Result<usize, EncodeError> {
    if buf.len() < HEADER_LEN + 1 {
        return Err(EncodeError::BufferTooSmall);
    }

    let mut w = Writer::new(buf, HEADER_LEN);
    w.u8(config.default_backend_config)?;

    w.len(config.game_mode_configs.len())?;
    for mode in &config.game_mode_configs {
        w.u8(mode.mode_id as u8)?;
        w.binding(&mode.activation_binding)?;
        w.len(mode.button_remapping.len())?;
        for remap in &mode.button_remapping {
            w.u8(remap.physical as u8)?;
            w.u8(remap.activates as u8)?;
        }
        w.len(mode.socd_pairs.len())?;
        for pair in &mode.socd_pairs {
            w.u8(pair.button_dir1 as u8)?;
            w.u8(pair.button_dir2 as u8)?;
            w.u8(pair.socd_type as u8)?;
        }
    }

    w.len(config.keyboard_modes.len())?;
    for mode in &config.keyboard_modes {
        w.u8(mode.id)?;
        w.binding(&mode.activation_binding)?;
        w.len(mode.keymap.len())?;
        for mapping in &mode.keymap {
            w.u8(mapping.button as u8)?;
            w.u8(mapping.keycode)?;
        }
    }

    w.len(config.communication_backend_configs.len())?;
    for backend in &config.communication_backend_configs {
        w.u8(backend.backend_id as u8)?;
        w.u8(backend.default_mode_config)?;
        w.binding(&backend.activation_binding)?;
        w.len(backend.secondary_backends.len())?;
        for &id in &backend.secondary_backends {
            w.u8(id as u8)?;
        }
    }

    let end = w.pos;
    let payload_len = (end - HEADER_LEN) as u16;
    buf[..MAGIC.len()].copy_from_slice(&MAGIC);
    buf[4] = FORMAT_VERSION;
    buf[5..7].copy_from_slice(&payload_len.to_le_bytes());

    let crc = calculate_crc8(&buf[..end]);
    let slot = buf.get_mut(end).ok_or(EncodeError::BufferTooSmall)?;
    *slot = crc;
    Ok(end + 1)
}

/// Decode a stored configuration.
///
/// `data` may be longer than the record (e.g. a whole flash sector); bytes
/// after the checksum are ignored.
pub fn decode(data: &[u8]) -> Result<Config, DecodeError> {
    if data.len() < MAGIC.len() || data[..MAGIC.len()] != MAGIC {
        return Err(DecodeError::BadMagic);
    }
    if data.len() < HEADER_LEN {
        return Err(DecodeError::Truncated);
    }
    if data[4] != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion(data[4]));
    }

    let payload_len = u16::from_le_bytes([data[5], data[6]]) as usize;
    let end = HEADER_LEN + payload_len;
    if data.len() < end + 1 {
        return Err(DecodeError::Truncated);
    }
    if calculate_crc8(&data[..end]) != data[end] {
        return Err(DecodeError::Checksum);
    }

    let mut r = Reader::new(&data[HEADER_LEN..end]);
    let mut config = Config {
        default_backend_config: r.u8()?,
        ..Config::default()
    };

    for _ in 0..r.count(config.game_mode_configs.capacity())? {
        let mode_id = ModeId::from_u8(r.u8()?).ok_or(DecodeError::Invalid)?;
        let mut mode = GameModeConfig::new(mode_id);
        mode.activation_binding = r.binding()?;
        for _ in 0..r.count(mode.button_remapping.capacity())? {
            let remap = ButtonRemap {
                physical: r.button()?,
                activates: r.button()?,
            };
            push(&mut mode.button_remapping, remap)?;
        }
        for _ in 0..r.count(mode.socd_pairs.capacity())? {
            let pair = SocdPair {
                button_dir1: r.button()?,
                button_dir2: r.button()?,
                socd_type: SocdType::from_u8(r.u8()?).ok_or(DecodeError::Invalid)?,
            };
            push(&mut mode.socd_pairs, pair)?;
        }
        push(&mut config.game_mode_configs, mode)?;
    }

    for _ in 0..r.count(config.keyboard_modes.capacity())? {
        let id = r.u8()?;
        let activation_binding = r.binding()?;
        let mut keymap = Vec::new();
        for _ in 0..r.count(keymap.capacity())? {
            let mapping = KeyMapping {
                button: r.button()?,
                keycode: r.u8()?,
            };
            push(&mut keymap, mapping)?;
        }
        let mode = KeyboardModeConfig {
            id,
            activation_binding,
            keymap,
        };
        push(&mut config.keyboard_modes, mode)?;
    }

    for _ in 0..r.count(config.communication_backend_configs.capacity())? {
        let backend_id = BackendId::from_u8(r.u8()?).ok_or(DecodeError::Invalid)?;
        let default_mode_config = r.u8()?;
        let activation_binding = r.binding()?;
        let mut secondary_backends = Vec::new();
        for _ in 0..r.count(secondary_backends.capacity())? {
            let id = BackendId::from_u8(r.u8()?).ok_or(DecodeError::Invalid)?;
            push(&mut secondary_backends, id)?;
        }
        let backend = CommunicationBackendConfig {
            backend_id,
            default_mode_config,
            activation_binding,
            secondary_backends,
        };
        push(&mut config.communication_backend_configs, backend)?;
    }

    if !r.is_exhausted() {
        return Err(DecodeError::Invalid);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::default_config;

    fn encoded_default() -> ([u8; MAX_ENCODED_SIZE], usize) {
        let mut buf = [0u8; MAX_ENCODED_SIZE];
        let len = encode(&default_config(), &mut buf).unwrap();
        (buf, len)
    }

    #[test]
    fn test_default_config_survives_storage() {
        let (buf, len) = encoded_default();
        assert!(buf[..len].starts_with(&MAGIC));
        assert_eq!(decode(&buf[..len]), Ok(default_config()));
    }

    #[test]
    fn test_trailing_sector_bytes_ignored() {
        let mut sector = [0xFFu8; 4096];
        let (buf, len) = encoded_default();
        sector[..len].copy_from_slice(&buf[..len]);
        assert_eq!(decode(&sector), Ok(default_config()));
    }

    #[test]
    fn test_erased_flash_is_bad_magic() {
        assert_eq!(decode(&[0xFF; 64]), Err(DecodeError::BadMagic));
        assert_eq!(decode(&[]), Err(DecodeError::BadMagic));
    }

    #[test]
    fn test_corrupt_byte_fails_checksum() {
        let (mut buf, len) = encoded_default();
        buf[HEADER_LEN + 3] ^= 0x40;
        assert_eq!(decode(&buf[..len]), Err(DecodeError::Checksum));
    }

    #[test]
    fn test_truncated_record() {
        let (buf, len) = encoded_default();
        assert_eq!(decode(&buf[..len - 2]), Err(DecodeError::Truncated));
        assert_eq!(decode(&buf[..5]), Err(DecodeError::Truncated));
    }

    #[test]
    fn test_future_version_rejected() {
        let (mut buf, len) = encoded_default();
        buf[4] = FORMAT_VERSION + 1;
        assert_eq!(
            decode(&buf[..len]),
            Err(DecodeError::UnsupportedVersion(FORMAT_VERSION + 1))
        );
    }

    #[test]
    fn test_invalid_enum_with_valid_checksum() {
        let mut config = Config::default();
        let _ = config.game_mode_configs.push(GameModeConfig::new(ModeId::Melee));
        let mut buf = [0u8; 64];
        let len = encode(&config, &mut buf).unwrap();

        // Patch the mode id to an unknown value and re-seal the record.
        buf[HEADER_LEN + 2] = 0x7F;
        buf[len - 1] = calculate_crc8(&buf[..len - 1]);
        assert_eq!(decode(&buf[..len]), Err(DecodeError::Invalid));
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let mut buf = [0u8; 16];
        assert_eq!(
            encode(&default_config(), &mut buf),
            Err(EncodeError::BufferTooSmall)
        );
    }

    #[test]
    fn test_empty_config_encodes() {
        let mut buf = [0u8; 16];
        let len = encode(&Config::default(), &mut buf).unwrap();
        // header + default index + three empty counts + crc
        assert_eq!(len, HEADER_LEN + 4 + 1);
        assert_eq!(decode(&buf[..len]), Ok(Config::default()));
    }
}
