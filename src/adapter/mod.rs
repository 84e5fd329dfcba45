//! Network stack adapter.
//!
//! This module provides the seam between the connectivity manager and the
//! underlying radio stack:
//! - **ESP32** (`esp32` feature): ESP-IDF WiFi driver via [`esp::EspNetAdapter`]
//! - **Host**: logging stand-in via [`host::HostAdapter`] for development
//!   without hardware
//!
//! `start` is synchronous and either brings the radio up or fails fatally;
//! everything that happens afterwards (association, disconnects, clients
//! joining the access point) arrives asynchronously as lifecycle events.

use std::fmt;

use crate::config::WifiMode;

#[cfg(feature = "esp32")]
pub mod esp;

#[cfg(not(feature = "esp32"))]
pub mod host;

#[cfg(feature = "esp32")]
pub use esp::EspNetAdapter;

#[cfg(not(feature = "esp32"))]
pub use host::HostAdapter;

/// Fixed channel for the soft access point.
pub const AP_CHANNEL: u8 = 1;

/// Maximum simultaneous clients in access-point mode.
pub const AP_MAX_CLIENTS: u16 = 2;

/// Driver facade for the radio interface.
///
/// The live interface is owned exclusively by the adapter; at most one
/// exists at a time, created by `start` and destroyed by `stop`.
pub trait NetAdapter: Send {
    /// Configure and start the radio in the given mode.
    ///
    /// Returns once the stack accepted the configuration and began
    /// operating. Connection outcomes are reported as lifecycle events,
    /// never through this call.
    fn start(
        &mut self,
        mode: WifiMode,
        ssid: &str,
        password: Option<&str>,
    ) -> Result<(), AdapterError>;

    /// Issue an asynchronous station connect request.
    fn request_connect(&mut self) -> Result<(), AdapterError>;

    /// Tear the interface down. Stopping an adapter that is not running is
    /// a no-op.
    fn stop(&mut self) -> Result<(), AdapterError>;
}

/// Errors surfaced by the adapter. All of these are fatal for the current
/// startup; post-start disconnects are events, not errors.
#[derive(Debug)]
pub enum AdapterError {
    /// A live interface already exists.
    AlreadyStarted,
    /// No live interface to operate on.
    NotStarted,
    /// SSID was rejected by the radio stack.
    InvalidSsid,
    /// Password was rejected by the radio stack.
    InvalidPassword,
    /// ESP-IDF driver fault.
    #[cfg(feature = "esp32")]
    Driver(esp_idf_sys::EspError),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyStarted => write!(f, "network interface already started"),
            Self::NotStarted => write!(f, "network interface not started"),
            Self::InvalidSsid => write!(f, "invalid SSID"),
            Self::InvalidPassword => write!(f, "invalid password"),
            #[cfg(feature = "esp32")]
            Self::Driver(e) => write!(f, "driver error: {:?}", e),
        }
    }
}

impl std::error::Error for AdapterError {}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for AdapterError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Driver(e)
    }
}
