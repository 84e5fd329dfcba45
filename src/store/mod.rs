//! Persistence for the connectivity configuration.
//!
//! The configuration lives in a small key-value store. Three keys are
//! recognized:
//!
//! - `mode` - one byte, 0 = access point, 1 = station
//! - `ssid` - UTF-8 string
//! - `password` - UTF-8 string; the key is absent when no password is set
//!
//! Loading never fails on missing keys: a device that has not been
//! configured yet comes up with the compiled-in defaults. Any other storage
//! fault is surfaced as a hard error and halts startup.

use std::collections::HashMap;
use std::fmt;

use log::warn;

use crate::config::{ConnectivityConfig, WifiMode};

#[cfg(feature = "esp32")]
pub mod nvs;

#[cfg(feature = "esp32")]
pub use nvs::NvsStore;

pub const KEY_MODE: &str = "mode";
pub const KEY_SSID: &str = "ssid";
pub const KEY_PASSWORD: &str = "password";

/// Key-value storage backend for the connectivity configuration.
///
/// The shape mirrors the typed NVS entry API so the flash-backed
/// implementation is a direct mapping.
pub trait ConfigStore: Send {
    fn get_u8(&self, key: &str) -> Result<Option<u8>, StoreError>;
    fn set_u8(&mut self, key: &str, value: u8) -> Result<(), StoreError>;
    fn get_str(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_str(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Remove a key. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Load the persisted configuration, substituting compiled-in defaults
/// where the store holds nothing usable.
///
/// The `ssid` key marks whether a configuration has ever been persisted;
/// without it the whole entry is treated as absent. A persisted entry that
/// fails validation (or a station entry without a password) is replaced by
/// the defaults so the device still comes up reachable. An unrecognized
/// mode byte is a storage fault.
pub fn load_config(store: &dyn ConfigStore) -> Result<ConnectivityConfig, StoreError> {
    let Some(ssid) = store.get_str(KEY_SSID)? else {
        return Ok(ConnectivityConfig::defaults());
    };

    let mode = match store.get_u8(KEY_MODE)? {
        None => WifiMode::AccessPoint,
        Some(raw) => WifiMode::from_u8(raw).ok_or_else(|| StoreError::Corrupted {
            key: KEY_MODE.to_owned(),
            reason: format!("unrecognized mode byte {:#04x}", raw),
        })?,
    };
    let password = store.get_str(KEY_PASSWORD)?;

    match ConnectivityConfig::new(mode, ssid, password) {
        Ok(config) => Ok(config),
        Err(err) => {
            warn!("persisted configuration is unusable ({}), using defaults", err);
            Ok(ConnectivityConfig::defaults())
        }
    }
}

/// Persist the configuration.
///
/// Only fields whose presence matters are kept: an absent password erases
/// the stored key rather than storing an empty string.
pub fn save_config(
    store: &mut dyn ConfigStore,
    config: &ConnectivityConfig,
) -> Result<(), StoreError> {
    store.set_u8(KEY_MODE, config.mode().as_u8())?;
    store.set_str(KEY_SSID, config.ssid())?;
    match config.password() {
        Some(password) => store.set_str(KEY_PASSWORD, password)?,
        None => store.remove(KEY_PASSWORD)?,
    }
    Ok(())
}

/// Remove every recognized key. The next load yields the defaults.
pub fn erase_config(store: &mut dyn ConfigStore) -> Result<(), StoreError> {
    store.remove(KEY_MODE)?;
    store.remove(KEY_SSID)?;
    store.remove(KEY_PASSWORD)?;
    Ok(())
}

/// In-memory store for host builds and tests.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn get_u8(&self, key: &str) -> Result<Option<u8>, StoreError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(bytes) if bytes.len() == 1 => Ok(Some(bytes[0])),
            Some(bytes) => Err(StoreError::Corrupted {
                key: key.to_owned(),
                reason: format!("expected a single byte, found {} bytes", bytes.len()),
            }),
        }
    }

    fn set_u8(&mut self, key: &str, value: u8) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), vec![value]);
        Ok(())
    }

    fn get_str(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes.clone()).map(Some).map_err(|_| {
                StoreError::Corrupted {
                    key: key.to_owned(),
                    reason: "stored value is not valid UTF-8".to_owned(),
                }
            }),
        }
    }

    fn set_str(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value.as_bytes().to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Storage faults. Missing keys are not errors; everything here is fatal.
#[derive(Debug)]
pub enum StoreError {
    /// A stored value cannot be interpreted.
    Corrupted { key: String, reason: String },
    /// Flash storage fault.
    #[cfg(feature = "esp32")]
    Nvs(esp_idf_sys::EspError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted { key, reason } => {
                write!(f, "corrupted entry '{}': {}", key, reason)
            }
            #[cfg(feature = "esp32")]
            Self::Nvs(e) => write!(f, "NVS error: {:?}", e),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for StoreError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Nvs(e)
    }
}
