//! Loading and saving the configuration.

use config_proto::{decode, default_config, encode, Config, DecodeError, EncodeError, MAX_ENCODED_SIZE};

/// Error type for configuration storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistenceError {
    /// The storage medium failed to read or write.
    Storage,
    /// Stored bytes are not a valid configuration.
    Decode(DecodeError),
    /// The configuration does not fit the record.
    Encode(EncodeError),
}

impl From<DecodeError> for PersistenceError {
    fn from(err: DecodeError) -> Self {
        PersistenceError::Decode(err)
    }
}

impl From<EncodeError> for PersistenceError {
    fn from(err: EncodeError) -> Self {
        PersistenceError::Encode(err)
    }
}

/// Somewhere a [`Config`] can be kept across power cycles.
pub trait ConfigStore {
    fn load(&mut self) -> Result<Config, PersistenceError>;
    fn save(&mut self, config: &Config) -> Result<(), PersistenceError>;
}

impl<T: ConfigStore + ?Sized> ConfigStore for &mut T {
    fn load(&mut self) -> Result<Config, PersistenceError> {
        (**self).load()
    }

    fn save(&mut self, config: &Config) -> Result<(), PersistenceError> {
        (**self).save(config)
    }
}

/// Raw storage for one encoded configuration record.
pub trait ConfigMedium {
    /// Fill `buf` from the start of the record area.
    fn read(&mut self, buf: &mut [u8]) -> Result<(), PersistenceError>;

    /// Replace the record area with `data`.
    ///
    /// `data` is always [`MAX_ENCODED_SIZE`] bytes, padded with `0xFF`.
    fn write(&mut self, data: &[u8]) -> Result<(), PersistenceError>;
}

/// [`ConfigStore`] that keeps the `config-proto` binary record on a medium.
pub struct CodecStore<M> {
    medium: M,
}

impl<M: ConfigMedium> CodecStore<M> {
    #[must_use]
    pub fn new(medium: M) -> Self {
        Self { medium }
    }
}

impl<M: ConfigMedium> ConfigStore for CodecStore<M> {
    fn load(&mut self) -> Result<Config, PersistenceError> {
        let mut buf = [0u8; MAX_ENCODED_SIZE];
        self.medium.read(&mut buf)?;
        Ok(decode(&buf)?)
    }

    fn save(&mut self, config: &Config) -> Result<(), PersistenceError> {
        let mut buf = [0xFFu8; MAX_ENCODED_SIZE];
        let len = encode(config, &mut buf)?;
        trace!("Saving config ({} bytes)", len);
        self.medium.write(&buf)
    }
}

/// Where the active configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigSource {
    /// Decoded from storage.
    Loaded,
    /// Storage was unusable; compiled defaults are active. `persisted` is
    /// false when writing the defaults back failed.
    Defaulted { persisted: bool },
}

/// Result of [`load_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: ConfigSource,
}

/// Load the stored configuration, falling back to the compiled defaults.
///
/// A stored record is used whole or not at all. When it cannot be used the
/// defaults replace it in storage right away, so the next boot loads them.
/// A failed save is logged and reported in [`ConfigSource`]; it is not
/// retried.
pub fn load_config<C: ConfigStore>(store: &mut C) -> LoadedConfig {
    match store.load() {
        Ok(config) => {
            info!("Config loaded from storage");
            LoadedConfig {
                config,
                source: ConfigSource::Loaded,
            }
        }
        Err(e) => {
            warn!("Stored config unusable ({:?}), using defaults", e);
            let config = default_config();
            let persisted = match store.save(&config) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Saving default config failed: {:?}", e);
                    false
                }
            };
            LoadedConfig {
                config,
                source: ConfigSource::Defaulted { persisted },
            }
        }
    }
}
