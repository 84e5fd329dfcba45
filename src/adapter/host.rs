//! Host stand-in for the network stack.
//!
//! Accepts every request and emits no lifecycle events, so the state
//! machine stays wherever its configuration put it. Lets the firmware
//! binary and integration experiments run on a development machine.

use log::info;

use super::{AdapterError, NetAdapter};
use crate::config::WifiMode;

#[derive(Default)]
pub struct HostAdapter {
    active: bool,
}

impl HostAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NetAdapter for HostAdapter {
    fn start(
        &mut self,
        mode: WifiMode,
        ssid: &str,
        _password: Option<&str>,
    ) -> Result<(), AdapterError> {
        if self.active {
            return Err(AdapterError::AlreadyStarted);
        }
        self.active = true;
        info!("host adapter started in {} mode, ssid {}", mode, ssid);
        Ok(())
    }

    fn request_connect(&mut self) -> Result<(), AdapterError> {
        if !self.active {
            return Err(AdapterError::NotStarted);
        }
        info!("host adapter has no radio, connect request ignored");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AdapterError> {
        if self.active {
            info!("host adapter stopped");
        }
        self.active = false;
        Ok(())
    }
}
