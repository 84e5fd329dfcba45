//! Connectivity manager facade.
//!
//! The single process-wide owner of the network configuration and the
//! radio lifecycle. The application root constructs exactly one
//! [`ConnectivityManager`] and passes it by reference to whoever needs to
//! read or change the configuration.
//!
//! Construction loads the persisted configuration, registers the event
//! listener with the dispatcher, and starts the adapter in the configured
//! mode. Lifecycle events arrive on the network stack's event context; all
//! mutable state sits behind one lock, so event handling never races a
//! facade setter.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{error, info};

use crate::adapter::{AdapterError, NetAdapter};
use crate::config::{ConfigError, WifiMode};
use crate::events::{EventDispatcher, EventListener, LifecycleEvent};
use crate::machine::{ConnState, Connectivity, Effect};
use crate::store::{self, ConfigStore, StoreError};

pub struct ConnectivityManager {
    inner: Arc<Mutex<Inner>>,
    reboot_requested: Arc<AtomicBool>,
}

struct Inner {
    machine: Connectivity,
    adapter: Box<dyn NetAdapter>,
    store: Box<dyn ConfigStore>,
}

/// Listener handed to the dispatcher. Runs on the network stack's event
/// context and drives the state machine through the shared lock.
struct MachineListener {
    inner: Arc<Mutex<Inner>>,
    reboot_requested: Arc<AtomicBool>,
}

impl EventListener for MachineListener {
    fn on_lifecycle_event(&self, event: LifecycleEvent) {
        let mut inner = lock(&self.inner);
        let effect = inner.machine.on_event(&event);
        inner.run_effect(effect, &self.reboot_requested);
    }
}

impl Inner {
    fn run_effect(&mut self, effect: Effect, reboot_requested: &AtomicBool) {
        match effect {
            Effect::None => {}
            Effect::RequestConnect => {
                if let Err(err) = self.adapter.request_connect() {
                    error!("station connect request failed: {}", err);
                }
            }
            Effect::Persist => self.persist(),
            Effect::Fallback => {
                self.persist();
                if !reboot_requested.swap(true, Ordering::SeqCst) {
                    info!("requesting device reboot into access-point fallback");
                }
            }
        }
    }

    /// Write the configuration at a checkpoint. A failed write is logged
    /// and retried at the next checkpoint; the previous persisted state
    /// stays in place.
    fn persist(&mut self) {
        match store::save_config(self.store.as_mut(), self.machine.config()) {
            Ok(()) => {
                self.machine.mark_persisted();
                info!("configuration persisted");
            }
            Err(err) => error!("failed to persist configuration: {}", err),
        }
    }
}

impl ConnectivityManager {
    /// Load the persisted configuration and bring the radio up in the
    /// selected mode.
    ///
    /// A storage fault or an adapter fault is fatal: the caller must not
    /// continue with a half-initialized manager.
    pub fn new(
        store: Box<dyn ConfigStore>,
        adapter: Box<dyn NetAdapter>,
        dispatcher: &EventDispatcher,
    ) -> Result<Self, ManagerError> {
        let config = store::load_config(store.as_ref())?;
        info!("loaded configuration: {:?}", config);

        let inner = Arc::new(Mutex::new(Inner {
            machine: Connectivity::new(config),
            adapter,
            store,
        }));
        let reboot_requested = Arc::new(AtomicBool::new(false));

        // Register before starting the adapter so no event can be raised
        // without a listener in place.
        dispatcher.register(Arc::new(MachineListener {
            inner: Arc::clone(&inner),
            reboot_requested: Arc::clone(&reboot_requested),
        }));

        {
            let mut guard = lock(&inner);
            let Inner {
                machine, adapter, ..
            } = &mut *guard;
            let mode = machine.begin();
            let ssid = machine.config().ssid().to_owned();
            let password = machine.config().password().map(str::to_owned);
            adapter.start(mode, &ssid, password.as_deref())?;
        }

        Ok(Self {
            inner,
            reboot_requested,
        })
    }

    pub fn mode(&self) -> WifiMode {
        lock(&self.inner).machine.config().mode()
    }

    pub fn ssid(&self) -> String {
        lock(&self.inner).machine.config().ssid().to_owned()
    }

    pub fn password(&self) -> Option<String> {
        lock(&self.inner)
            .machine
            .config()
            .password()
            .map(str::to_owned)
    }

    pub fn state(&self) -> ConnState {
        lock(&self.inner).machine.state()
    }

    /// Change the operating mode. Takes effect on the next manager start.
    pub fn set_mode(&self, mode: WifiMode) -> Result<(), ConfigError> {
        lock(&self.inner).machine.config_mut().set_mode(mode)
    }

    /// Change the SSID. Takes effect on the next manager start.
    pub fn set_ssid(&self, ssid: &str) -> Result<(), ConfigError> {
        lock(&self.inner).machine.config_mut().set_ssid(ssid)
    }

    /// Change or clear the password. Takes effect on the next manager start.
    pub fn set_password(&self, password: Option<&str>) -> Result<(), ConfigError> {
        lock(&self.inner).machine.config_mut().set_password(password)
    }

    /// Whether the state machine asked for a device reboot. Set at most
    /// once per process; the application shell performs the restart.
    pub fn reboot_pending(&self) -> bool {
        self.reboot_requested.load(Ordering::SeqCst)
    }

    /// Stop the radio interface. Safe to call more than once.
    pub fn shutdown(&self) {
        let mut inner = lock(&self.inner);
        if let Err(err) = inner.adapter.stop() {
            error!("failed to stop network interface: {}", err);
        }
    }
}

impl Drop for ConnectivityManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fatal construction failures.
#[derive(Debug)]
pub enum ManagerError {
    Store(StoreError),
    Adapter(AdapterError),
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "configuration store error: {}", e),
            Self::Adapter(e) => write!(f, "network adapter error: {}", e),
        }
    }
}

impl std::error::Error for ManagerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Adapter(e) => Some(e),
        }
    }
}

impl From<StoreError> for ManagerError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<AdapterError> for ManagerError {
    fn from(e: AdapterError) -> Self {
        Self::Adapter(e)
    }
}
