//! Connectivity state machine.
//!
//! Owns the in-memory configuration and the retry counter, and decides how
//! to react to lifecycle events: mode selection at startup, a bounded number
//! of station reconnect attempts, and the fallback to the safe access-point
//! configuration once those are exhausted.
//!
//! The machine itself performs no I/O. Every transition returns an
//! [`Effect`] that the caller executes (ask the adapter to reconnect,
//! persist the configuration, request a reboot). This keeps the transition
//! logic fully testable on the host.

use log::{debug, info, warn};

use crate::config::{ConnectivityConfig, WifiMode};
use crate::events::LifecycleEvent;

/// Consecutive station disconnects tolerated before falling back to
/// access-point mode.
pub const MAX_RETRIES: u8 = 3;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Constructed, adapter not started yet.
    Initializing,
    /// Station interface starting or connect request in flight.
    StationConnecting,
    /// Station joined the target network.
    StationConnected,
    /// Lost the connection, reconnect requested.
    StationRetrying,
    /// Serving as an access point.
    AccessPointActive,
    /// Retries exhausted; terminal until the device reboots.
    FallbackTriggered,
}

/// What the caller must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Effect {
    /// Nothing beyond the state update.
    None,
    /// Issue a station connect request to the adapter.
    RequestConnect,
    /// Persist the current configuration.
    Persist,
    /// Persist the fallback configuration, then request a device reboot.
    Fallback,
}

/// The transition core.
pub struct Connectivity {
    state: ConnState,
    config: ConnectivityConfig,
    retry_count: u8,
}

impl Connectivity {
    pub fn new(config: ConnectivityConfig) -> Self {
        Self {
            state: ConnState::Initializing,
            config,
            retry_count: 0,
        }
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    pub fn config(&self) -> &ConnectivityConfig {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut ConnectivityConfig {
        &mut self.config
    }

    /// Leave `Initializing` by selecting the operating mode. Returns the
    /// mode the adapter must be started in.
    pub fn begin(&mut self) -> WifiMode {
        debug_assert_eq!(self.state, ConnState::Initializing);
        let mode = self.config.mode();
        self.state = match mode {
            WifiMode::Station => ConnState::StationConnecting,
            WifiMode::AccessPoint => ConnState::AccessPointActive,
        };
        info!("starting in {} mode, ssid {}", mode, self.config.ssid());
        mode
    }

    /// Advance the machine by one lifecycle event.
    pub fn on_event(&mut self, event: &LifecycleEvent) -> Effect {
        if self.state == ConnState::FallbackTriggered {
            debug!("{} ignored, fallback already triggered", event);
            return Effect::None;
        }

        match event {
            LifecycleEvent::StationStarted => match self.state {
                ConnState::StationConnecting => {
                    info!("{}", event);
                    Effect::RequestConnect
                }
                _ => self.ignore(event),
            },

            LifecycleEvent::StationConnected { .. } => match self.state {
                ConnState::StationConnecting | ConnState::StationRetrying => {
                    info!("{}", event);
                    self.retry_count = 0;
                    self.state = ConnState::StationConnected;
                    if self.config.is_dirty() {
                        Effect::Persist
                    } else {
                        Effect::None
                    }
                }
                _ => self.ignore(event),
            },

            LifecycleEvent::StationDisconnected { .. } => match self.state {
                ConnState::StationConnecting
                | ConnState::StationConnected
                | ConnState::StationRetrying => {
                    self.retry_count += 1;
                    if self.retry_count < MAX_RETRIES {
                        warn!(
                            "{}, retrying ({}/{})",
                            event, self.retry_count, MAX_RETRIES
                        );
                        self.state = ConnState::StationRetrying;
                        Effect::RequestConnect
                    } else {
                        warn!("{}, retries exhausted, falling back to access point", event);
                        self.state = ConnState::FallbackTriggered;
                        self.config.apply_fallback();
                        Effect::Fallback
                    }
                }
                _ => self.ignore(event),
            },

            LifecycleEvent::ApClientJoined { .. } | LifecycleEvent::ApClientLeft { .. } => {
                match self.state {
                    ConnState::AccessPointActive => {
                        info!("{}", event);
                        Effect::None
                    }
                    _ => self.ignore(event),
                }
            }

            LifecycleEvent::IpAssigned { .. } => {
                info!("{}", event);
                Effect::None
            }
        }
    }

    /// Called after the configuration was written to the store.
    pub fn mark_persisted(&mut self) {
        self.config.mark_clean();
    }

    fn ignore(&mut self, event: &LifecycleEvent) -> Effect {
        debug!("{} ignored in state {:?}", event, self.state);
        Effect::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SSID;

    fn station_machine() -> Connectivity {
        let config =
            ConnectivityConfig::new(WifiMode::Station, "HomeNet", Some("password123")).unwrap();
        let mut machine = Connectivity::new(config);
        assert_eq!(machine.begin(), WifiMode::Station);
        machine
    }

    fn disconnected() -> LifecycleEvent {
        LifecycleEvent::StationDisconnected {
            ssid: "HomeNet".to_owned(),
        }
    }

    fn connected() -> LifecycleEvent {
        LifecycleEvent::StationConnected {
            ssid: "HomeNet".to_owned(),
        }
    }

    #[test]
    fn test_begin_selects_access_point() {
        let mut machine = Connectivity::new(ConnectivityConfig::defaults());
        assert_eq!(machine.begin(), WifiMode::AccessPoint);
        assert_eq!(machine.state(), ConnState::AccessPointActive);
    }

    #[test]
    fn test_station_started_requests_connect() {
        let mut machine = station_machine();
        assert_eq!(machine.state(), ConnState::StationConnecting);
        let effect = machine.on_event(&LifecycleEvent::StationStarted);
        assert_eq!(effect, Effect::RequestConnect);
        assert_eq!(machine.state(), ConnState::StationConnecting);
    }

    #[test]
    fn test_three_disconnects_trigger_fallback() {
        let mut machine = station_machine();

        assert_eq!(machine.on_event(&disconnected()), Effect::RequestConnect);
        assert_eq!(machine.state(), ConnState::StationRetrying);
        assert_eq!(machine.on_event(&disconnected()), Effect::RequestConnect);
        assert_eq!(machine.retry_count(), 2);

        assert_eq!(machine.on_event(&disconnected()), Effect::Fallback);
        assert_eq!(machine.state(), ConnState::FallbackTriggered);
        assert_eq!(machine.config().mode(), WifiMode::AccessPoint);
        assert_eq!(machine.config().ssid(), DEFAULT_SSID);
        assert!(machine.config().is_dirty());
    }

    #[test]
    fn test_connect_resets_retry_count() {
        let mut machine = station_machine();

        assert_eq!(machine.on_event(&disconnected()), Effect::RequestConnect);
        assert_eq!(machine.on_event(&disconnected()), Effect::RequestConnect);
        assert_eq!(machine.retry_count(), 2);

        let effect = machine.on_event(&connected());
        assert_eq!(effect, Effect::None);
        assert_eq!(machine.state(), ConnState::StationConnected);
        assert_eq!(machine.retry_count(), 0);
    }

    #[test]
    fn test_fallback_only_after_three_consecutive_disconnects() {
        // 2 disconnects, 1 connect, then 3 more disconnects: the counter was
        // reset, so only the 5th disconnect overall triggers the fallback.
        let mut machine = station_machine();

        let _ = machine.on_event(&disconnected());
        let _ = machine.on_event(&disconnected());
        let _ = machine.on_event(&connected());

        assert_eq!(machine.on_event(&disconnected()), Effect::RequestConnect);
        assert_eq!(machine.on_event(&disconnected()), Effect::RequestConnect);
        assert_eq!(machine.on_event(&disconnected()), Effect::Fallback);
        assert_eq!(machine.state(), ConnState::FallbackTriggered);
    }

    #[test]
    fn test_connect_persists_dirty_config() {
        let mut machine = station_machine();
        machine.config_mut().set_ssid("Renamed").unwrap();

        let effect = machine.on_event(&connected());
        assert_eq!(effect, Effect::Persist);

        machine.mark_persisted();
        assert!(!machine.config().is_dirty());

        // A later reconnect with a clean config persists nothing.
        let _ = machine.on_event(&disconnected());
        assert_eq!(machine.on_event(&connected()), Effect::None);
    }

    #[test]
    fn test_fallback_is_terminal() {
        let mut machine = station_machine();
        let _ = machine.on_event(&disconnected());
        let _ = machine.on_event(&disconnected());
        assert_eq!(machine.on_event(&disconnected()), Effect::Fallback);

        // Everything after the fallback is ignored; in particular no second
        // fallback effect is produced.
        assert_eq!(machine.on_event(&disconnected()), Effect::None);
        assert_eq!(machine.on_event(&connected()), Effect::None);
        assert_eq!(machine.state(), ConnState::FallbackTriggered);
    }

    #[test]
    fn test_ap_client_events_do_not_change_state() {
        let mut machine = Connectivity::new(ConnectivityConfig::defaults());
        let _ = machine.begin();

        let join = LifecycleEvent::ApClientJoined {
            mac: [2, 4, 8, 16, 32, 64],
        };
        let leave = LifecycleEvent::ApClientLeft {
            mac: [2, 4, 8, 16, 32, 64],
        };
        assert_eq!(machine.on_event(&join), Effect::None);
        assert_eq!(machine.on_event(&leave), Effect::None);
        assert_eq!(machine.state(), ConnState::AccessPointActive);
    }

    #[test]
    fn test_station_events_ignored_in_access_point_mode() {
        let mut machine = Connectivity::new(ConnectivityConfig::defaults());
        let _ = machine.begin();

        assert_eq!(machine.on_event(&disconnected()), Effect::None);
        assert_eq!(machine.retry_count(), 0);
        assert_eq!(machine.state(), ConnState::AccessPointActive);
    }

    #[test]
    fn test_ip_assignment_is_observational() {
        let mut machine = station_machine();
        let _ = machine.on_event(&connected());

        let event = LifecycleEvent::IpAssigned {
            addr: "10.0.0.7".parse().unwrap(),
        };
        assert_eq!(machine.on_event(&event), Effect::None);
        assert_eq!(machine.state(), ConnState::StationConnected);
    }

    #[test]
    fn test_disconnect_while_connecting_counts_toward_fallback() {
        // A connection that never succeeds (wrong password) must also
        // exhaust its retries.
        let mut machine = station_machine();
        let _ = machine.on_event(&LifecycleEvent::StationStarted);

        let _ = machine.on_event(&disconnected());
        let _ = machine.on_event(&disconnected());
        assert_eq!(machine.on_event(&disconnected()), Effect::Fallback);
    }
}
