//! Connectivity configuration data structures.
//!
//! This module contains platform-independent types for the device's network
//! configuration that can be tested on the host machine.
//!
//! # Example
//!
//! ```
//! use rclink_esp32::config::{ConnectivityConfig, WifiMode};
//!
//! let mut config = ConnectivityConfig::defaults();
//! assert_eq!(config.mode(), WifiMode::AccessPoint);
//!
//! config.set_ssid("Workshop").unwrap();
//! assert!(config.is_dirty());
//! ```

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum SSID length per IEEE 802.11 standard.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum password length for WPA2.
pub const MAX_PASSWORD_LEN: usize = 64;

/// Minimum password length for WPA2.
pub const MIN_PASSWORD_LEN: usize = 8;

/// SSID used when no configuration has been persisted yet, and after a
/// forced fallback to access-point mode.
pub const DEFAULT_SSID: &str = "RCLink";

/// Password paired with [`DEFAULT_SSID`].
pub const DEFAULT_PASSWORD: &str = "0123456789";

/// Operating mode of the radio interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    /// The device hosts its own network that other clients join.
    AccessPoint,
    /// The device joins an existing network as a client.
    Station,
}

impl WifiMode {
    /// Single-byte encoding used by the configuration store.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::AccessPoint => 0,
            Self::Station => 1,
        }
    }

    /// Decode the stored byte. Returns `None` for unrecognized values.
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::AccessPoint),
            1 => Some(Self::Station),
            _ => None,
        }
    }
}

impl fmt::Display for WifiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessPoint => write!(f, "access point"),
            Self::Station => write!(f, "station"),
        }
    }
}

/// In-memory network configuration.
///
/// There is exactly one instance per running device, owned by the manager.
/// `dirty` tracks whether the in-memory state differs from the persisted
/// copy; the manager persists at checkpoints (successful station connection
/// or forced fallback), never on every mutation.
///
/// Credentials are zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ConnectivityConfig {
    #[zeroize(skip)]
    mode: WifiMode,
    ssid: String,
    /// `None` means an open network in access-point mode; a station
    /// configuration always carries a password.
    password: Option<String>,
    #[zeroize(skip)]
    dirty: bool,
}

impl ConnectivityConfig {
    /// Compiled-in configuration used when the store holds no entry.
    pub fn defaults() -> Self {
        Self {
            mode: WifiMode::AccessPoint,
            ssid: DEFAULT_SSID.to_owned(),
            password: Some(DEFAULT_PASSWORD.to_owned()),
            dirty: false,
        }
    }

    /// Build a validated configuration, e.g. from persisted values.
    ///
    /// The result is clean (not dirty).
    pub fn new(
        mode: WifiMode,
        ssid: impl Into<String>,
        password: Option<impl Into<String>>,
    ) -> Result<Self, ConfigError> {
        let ssid = ssid.into();
        let password = password.map(Into::into);

        validate_ssid(&ssid)?;
        if let Some(password) = &password {
            validate_password(password)?;
        }
        if mode == WifiMode::Station && password.is_none() {
            return Err(ConfigError::PasswordRequired);
        }

        Ok(Self {
            mode,
            ssid,
            password,
            dirty: false,
        })
    }

    pub fn mode(&self) -> WifiMode {
        self.mode
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Whether the in-memory state differs from the persisted copy.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Switch the operating mode.
    ///
    /// Station mode requires a password to be present.
    pub fn set_mode(&mut self, mode: WifiMode) -> Result<(), ConfigError> {
        if mode == WifiMode::Station && self.password.is_none() {
            return Err(ConfigError::PasswordRequired);
        }
        self.mode = mode;
        self.dirty = true;
        Ok(())
    }

    /// Replace the SSID. Rejected input leaves the configuration unchanged.
    pub fn set_ssid(&mut self, ssid: &str) -> Result<(), ConfigError> {
        validate_ssid(ssid)?;
        self.ssid.zeroize();
        self.ssid = ssid.to_owned();
        self.dirty = true;
        Ok(())
    }

    /// Replace or clear the password.
    ///
    /// `None` encodes "no password" (open access point). Clearing the
    /// password while in station mode is rejected.
    pub fn set_password(&mut self, password: Option<&str>) -> Result<(), ConfigError> {
        match password {
            Some(password) => validate_password(password)?,
            None => {
                if self.mode == WifiMode::Station {
                    return Err(ConfigError::PasswordRequired);
                }
            }
        }
        self.password.zeroize();
        self.password = password.map(str::to_owned);
        self.dirty = true;
        Ok(())
    }

    /// Reset to the safe access-point defaults after station retries are
    /// exhausted. Marks the configuration dirty so the manager persists it
    /// before the reboot.
    pub(crate) fn apply_fallback(&mut self) {
        self.mode = WifiMode::AccessPoint;
        self.ssid.zeroize();
        self.ssid = DEFAULT_SSID.to_owned();
        self.password.zeroize();
        self.password = Some(DEFAULT_PASSWORD.to_owned());
        self.dirty = true;
    }

    /// Called after a successful save.
    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl fmt::Debug for ConnectivityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectivityConfig")
            .field("mode", &self.mode)
            .field("ssid", &self.ssid)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("dirty", &self.dirty)
            .finish()
    }
}

fn validate_ssid(ssid: &str) -> Result<(), ConfigError> {
    if ssid.is_empty() {
        return Err(ConfigError::SsidEmpty);
    }
    if ssid.len() > MAX_SSID_LEN {
        return Err(ConfigError::SsidTooLong {
            len: ssid.len(),
            max: MAX_SSID_LEN,
        });
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConfigError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ConfigError::PasswordTooShort {
            len: password.len(),
            min: MIN_PASSWORD_LEN,
        });
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(ConfigError::PasswordTooLong {
            len: password.len(),
            max: MAX_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Errors rejected at the configuration boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// SSID is empty.
    SsidEmpty,
    /// SSID exceeds the maximum length.
    SsidTooLong { len: usize, max: usize },
    /// Password is too short for WPA2.
    PasswordTooShort { len: usize, min: usize },
    /// Password exceeds the maximum length.
    PasswordTooLong { len: usize, max: usize },
    /// Station mode needs a password.
    PasswordRequired,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SsidEmpty => write!(f, "SSID cannot be empty"),
            Self::SsidTooLong { len, max } => {
                write!(f, "SSID too long: {} bytes (max {})", len, max)
            }
            Self::PasswordTooShort { len, min } => {
                write!(f, "password too short: {} bytes (min {})", len, min)
            }
            Self::PasswordTooLong { len, max } => {
                write!(f, "password too long: {} bytes (max {})", len, max)
            }
            Self::PasswordRequired => write!(f, "station mode requires a password"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectivityConfig::defaults();
        assert_eq!(config.mode(), WifiMode::AccessPoint);
        assert_eq!(config.ssid(), "RCLink");
        assert_eq!(config.password(), Some("0123456789"));
        assert!(!config.is_dirty());
    }

    #[test]
    fn test_valid_station_config() {
        let config =
            ConnectivityConfig::new(WifiMode::Station, "HomeNet", Some("password123")).unwrap();
        assert_eq!(config.mode(), WifiMode::Station);
        assert_eq!(config.ssid(), "HomeNet");
        assert!(!config.is_dirty());
    }

    #[test]
    fn test_station_requires_password() {
        let result = ConnectivityConfig::new(WifiMode::Station, "HomeNet", None::<String>);
        assert_eq!(result.unwrap_err(), ConfigError::PasswordRequired);
    }

    #[test]
    fn test_open_access_point() {
        let config =
            ConnectivityConfig::new(WifiMode::AccessPoint, "OpenNet", None::<String>).unwrap();
        assert_eq!(config.password(), None);
    }

    #[test]
    fn test_set_ssid_empty_rejected() {
        let mut config = ConnectivityConfig::defaults();
        assert_eq!(config.set_ssid(""), Err(ConfigError::SsidEmpty));
        assert_eq!(config.ssid(), "RCLink");
        assert!(!config.is_dirty());
    }

    #[test]
    fn test_set_ssid_too_long_rejected() {
        let mut config = ConnectivityConfig::defaults();
        let long = "a".repeat(33);
        assert!(matches!(
            config.set_ssid(&long),
            Err(ConfigError::SsidTooLong { .. })
        ));
        assert!(!config.is_dirty());
    }

    #[test]
    fn test_set_ssid_max_length() {
        let mut config = ConnectivityConfig::defaults();
        let max = "a".repeat(32);
        config.set_ssid(&max).unwrap();
        assert_eq!(config.ssid(), max);
        assert!(config.is_dirty());
    }

    #[test]
    fn test_set_password_too_short_rejected() {
        let mut config = ConnectivityConfig::defaults();
        assert!(matches!(
            config.set_password(Some("short")),
            Err(ConfigError::PasswordTooShort { .. })
        ));
        assert_eq!(config.password(), Some("0123456789"));
        assert!(!config.is_dirty());
    }

    #[test]
    fn test_set_password_too_long_rejected() {
        let mut config = ConnectivityConfig::defaults();
        let long = "a".repeat(65);
        assert!(matches!(
            config.set_password(Some(&long)),
            Err(ConfigError::PasswordTooLong { .. })
        ));
    }

    #[test]
    fn test_clear_password_in_access_point_mode() {
        let mut config = ConnectivityConfig::defaults();
        config.set_password(None).unwrap();
        assert_eq!(config.password(), None);
        assert!(config.is_dirty());
    }

    #[test]
    fn test_clear_password_in_station_mode_rejected() {
        let mut config =
            ConnectivityConfig::new(WifiMode::Station, "HomeNet", Some("password123")).unwrap();
        assert_eq!(config.set_password(None), Err(ConfigError::PasswordRequired));
        assert_eq!(config.password(), Some("password123"));
    }

    #[test]
    fn test_set_mode_station_without_password_rejected() {
        let mut config =
            ConnectivityConfig::new(WifiMode::AccessPoint, "OpenNet", None::<String>).unwrap();
        assert_eq!(
            config.set_mode(WifiMode::Station),
            Err(ConfigError::PasswordRequired)
        );
        assert_eq!(config.mode(), WifiMode::AccessPoint);
        assert!(!config.is_dirty());
    }

    #[test]
    fn test_apply_fallback() {
        let mut config =
            ConnectivityConfig::new(WifiMode::Station, "HomeNet", Some("password123")).unwrap();
        config.apply_fallback();
        assert_eq!(config.mode(), WifiMode::AccessPoint);
        assert_eq!(config.ssid(), DEFAULT_SSID);
        assert_eq!(config.password(), Some(DEFAULT_PASSWORD));
        assert!(config.is_dirty());
    }

    #[test]
    fn test_mode_byte_roundtrip() {
        assert_eq!(WifiMode::from_u8(WifiMode::AccessPoint.as_u8()), Some(WifiMode::AccessPoint));
        assert_eq!(WifiMode::from_u8(WifiMode::Station.as_u8()), Some(WifiMode::Station));
        assert_eq!(WifiMode::from_u8(2), None);
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ConnectivityConfig::defaults();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("0123456789"));
        assert!(debug.contains("RCLink"));
    }
}
