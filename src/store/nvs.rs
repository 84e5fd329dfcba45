//! NVS-backed configuration store.
//!
//! Keeps the connectivity configuration in the ESP32's Non-Volatile Storage
//! so it survives reboots, including the reboot into the access-point
//! fallback.

use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};

use super::{ConfigStore, StoreError};
use crate::config::MAX_PASSWORD_LEN;

/// NVS namespace for the connectivity configuration.
const NVS_NAMESPACE: &str = "connectivity";

/// Read buffer for string entries. The password is the longest value we
/// store; one extra byte for the NUL terminator NVS appends.
const MAX_VALUE_LEN: usize = MAX_PASSWORD_LEN + 1;

/// Configuration store backed by the default NVS partition.
///
/// Takes the default partition on construction; the partition handle is
/// released when the store is dropped.
pub struct NvsStore {
    nvs: EspNvs<NvsDefault>,
}

impl NvsStore {
    pub fn new() -> Result<Self, StoreError> {
        let partition = EspNvsPartition::<NvsDefault>::take()?;
        let nvs = EspNvs::new(partition, NVS_NAMESPACE, true)?;
        Ok(Self { nvs })
    }
}

impl ConfigStore for NvsStore {
    fn get_u8(&self, key: &str) -> Result<Option<u8>, StoreError> {
        Ok(self.nvs.get_u8(key)?)
    }

    fn set_u8(&mut self, key: &str, value: u8) -> Result<(), StoreError> {
        self.nvs.set_u8(key, value)?;
        Ok(())
    }

    fn get_str(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut buf = [0u8; MAX_VALUE_LEN];
        let value = self.nvs.get_str(key, &mut buf)?;
        Ok(value.map(str::to_owned))
    }

    fn set_str(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.nvs.set_str(key, value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        // remove() reports whether the key existed; absent keys are fine.
        self.nvs.remove(key)?;
        Ok(())
    }
}
