//! ESP-IDF network stack adapter.
//!
//! Wraps the ESP-IDF WiFi driver and translates its raw events into
//! [`LifecycleEvent`]s for the dispatcher. Event callbacks run on the
//! system event loop task, not on the application's main control flow.

use std::sync::{Arc, Mutex, PoisonError};

use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
use esp_idf_svc::netif::IpEvent;
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiEvent,
};
use log::info;

use super::{AdapterError, NetAdapter, AP_CHANNEL, AP_MAX_CLIENTS};
use crate::config::WifiMode;
use crate::events::{EventDispatcher, LifecycleEvent};

/// ESP-IDF-backed radio adapter.
///
/// Owns the WiFi driver handle and the event subscriptions; both live
/// exactly as long as the adapter.
pub struct EspNetAdapter {
    wifi: EspWifi<'static>,
    active: bool,
    /// SSID the station is configured for, shared with the event callbacks
    /// so connect/disconnect events carry the network name.
    station_ssid: Arc<Mutex<String>>,
    _wifi_events: EspSubscription<'static, System>,
    _ip_events: EspSubscription<'static, System>,
}

impl EspNetAdapter {
    /// Initialize the WiFi driver and hook up event translation.
    ///
    /// Fails fatally on hardware or driver faults; there is no retry at
    /// this layer.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        dispatcher: Arc<EventDispatcher>,
    ) -> Result<Self, AdapterError> {
        let wifi = EspWifi::new(modem, sysloop.clone(), None)?;
        let station_ssid = Arc::new(Mutex::new(String::new()));

        let ssid = Arc::clone(&station_ssid);
        let events = Arc::clone(&dispatcher);
        let wifi_events = sysloop.subscribe::<WifiEvent, _>(move |event| {
            let target = || {
                ssid.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
            };
            match event {
                WifiEvent::StaStarted => events.dispatch(LifecycleEvent::StationStarted),
                WifiEvent::StaConnected(_) => {
                    events.dispatch(LifecycleEvent::StationConnected { ssid: target() })
                }
                WifiEvent::StaDisconnected(_) => {
                    events.dispatch(LifecycleEvent::StationDisconnected { ssid: target() })
                }
                WifiEvent::ApStaConnected(client) => {
                    events.dispatch(LifecycleEvent::ApClientJoined { mac: client.mac() })
                }
                WifiEvent::ApStaDisconnected(client) => {
                    events.dispatch(LifecycleEvent::ApClientLeft { mac: client.mac() })
                }
                _ => (),
            }
        })?;

        let events = dispatcher;
        let ip_events = sysloop.subscribe::<IpEvent, _>(move |event| match event {
            IpEvent::DhcpIpAssigned(assignment) => {
                events.dispatch(LifecycleEvent::IpAssigned {
                    addr: assignment.ip(),
                })
            }
            IpEvent::ApStaIpAssigned(assignment) => {
                events.dispatch(LifecycleEvent::IpAssigned {
                    addr: assignment.ip(),
                })
            }
            _ => (),
        })?;

        Ok(Self {
            wifi,
            active: false,
            station_ssid,
            _wifi_events: wifi_events,
            _ip_events: ip_events,
        })
    }
}

impl NetAdapter for EspNetAdapter {
    fn start(
        &mut self,
        mode: WifiMode,
        ssid: &str,
        password: Option<&str>,
    ) -> Result<(), AdapterError> {
        if self.active {
            return Err(AdapterError::AlreadyStarted);
        }

        let auth_method = if password.is_some() {
            AuthMethod::WPA2Personal
        } else {
            AuthMethod::None
        };

        let configuration = match mode {
            WifiMode::AccessPoint => Configuration::AccessPoint(AccessPointConfiguration {
                ssid: ssid.try_into().map_err(|_| AdapterError::InvalidSsid)?,
                password: password
                    .unwrap_or("")
                    .try_into()
                    .map_err(|_| AdapterError::InvalidPassword)?,
                channel: AP_CHANNEL,
                max_connections: AP_MAX_CLIENTS,
                auth_method,
                ..Default::default()
            }),
            WifiMode::Station => Configuration::Client(ClientConfiguration {
                ssid: ssid.try_into().map_err(|_| AdapterError::InvalidSsid)?,
                password: password
                    .unwrap_or("")
                    .try_into()
                    .map_err(|_| AdapterError::InvalidPassword)?,
                auth_method,
                ..Default::default()
            }),
        };

        if mode == WifiMode::Station {
            *self
                .station_ssid
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = ssid.to_owned();
        }

        self.wifi.set_configuration(&configuration)?;
        self.wifi.start()?;
        self.active = true;

        info!("radio started in {} mode, ssid {}", mode, ssid);
        Ok(())
    }

    fn request_connect(&mut self) -> Result<(), AdapterError> {
        if !self.active {
            return Err(AdapterError::NotStarted);
        }
        // Asynchronous; the outcome arrives as a lifecycle event.
        self.wifi.connect()?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AdapterError> {
        if !self.active {
            return Ok(());
        }
        self.wifi.stop()?;
        self.active = false;
        info!("radio stopped");
        Ok(())
    }
}
