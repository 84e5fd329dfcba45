//! Network lifecycle events and their routing.
//!
//! The network stack raises events asynchronously, on its own execution
//! context. The [`EventDispatcher`] is a pure routing layer: it hands each
//! event, in order, to the single registered listener and performs no
//! business logic of its own.

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

/// Asynchronous notification from the network stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The station interface finished starting; a connect may be requested.
    StationStarted,
    /// The station joined the target network.
    StationConnected { ssid: String },
    /// The station lost (or failed to establish) its connection.
    StationDisconnected { ssid: String },
    /// A client joined our access point.
    ApClientJoined { mac: [u8; 6] },
    /// A client left our access point.
    ApClientLeft { mac: [u8; 6] },
    /// An IP address was assigned, to us or to one of our clients.
    IpAssigned { addr: Ipv4Addr },
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StationStarted => write!(f, "station interface started"),
            Self::StationConnected { ssid } => write!(f, "connected to {}", ssid),
            Self::StationDisconnected { ssid } => write!(f, "disconnected from {}", ssid),
            Self::ApClientJoined { mac } => {
                write!(f, "new connection from {}", MacAddr(mac))
            }
            Self::ApClientLeft { mac } => {
                write!(f, "lost connection to {}", MacAddr(mac))
            }
            Self::IpAssigned { addr } => write!(f, "assigned ip {}", addr),
        }
    }
}

struct MacAddr<'a>(&'a [u8; 6]);

impl fmt::Display for MacAddr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

/// Receiver of lifecycle events.
///
/// Implementations must be callable from the network stack's event context;
/// the connectivity manager serializes its own state behind a lock.
pub trait EventListener: Send + Sync {
    fn on_lifecycle_event(&self, event: LifecycleEvent);
}

/// Routes lifecycle events to the single registered listener.
#[derive(Default)]
pub struct EventDispatcher {
    listener: RwLock<Option<Arc<dyn EventListener>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the listener, replacing any previous registration.
    pub fn register(&self, listener: Arc<dyn EventListener>) {
        let mut slot = self
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(listener);
    }

    /// Deliver one event synchronously.
    ///
    /// Delivery order matches the call order. Events arriving before a
    /// listener is registered are dropped.
    pub fn dispatch(&self, event: LifecycleEvent) {
        let listener = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match listener {
            Some(listener) => listener.on_lifecycle_event(event),
            None => debug!("no listener registered, dropping event: {}", event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<LifecycleEvent>>,
    }

    impl EventListener for Recorder {
        fn on_lifecycle_event(&self, event: LifecycleEvent) {
            self.seen.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_dispatch_preserves_order() {
        let dispatcher = EventDispatcher::new();
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        dispatcher.register(recorder.clone());

        dispatcher.dispatch(LifecycleEvent::StationStarted);
        dispatcher.dispatch(LifecycleEvent::StationConnected {
            ssid: "HomeNet".to_owned(),
        });
        dispatcher.dispatch(LifecycleEvent::IpAssigned {
            addr: Ipv4Addr::new(192, 168, 1, 20),
        });

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], LifecycleEvent::StationStarted);
        assert_eq!(
            seen[2],
            LifecycleEvent::IpAssigned {
                addr: Ipv4Addr::new(192, 168, 1, 20)
            }
        );
    }

    #[test]
    fn test_dispatch_without_listener_is_silent() {
        let dispatcher = EventDispatcher::new();
        dispatcher.dispatch(LifecycleEvent::StationStarted);
    }

    #[test]
    fn test_mac_formatting() {
        let event = LifecycleEvent::ApClientJoined {
            mac: [0xde, 0xad, 0xbe, 0xef, 0x00, 0x42],
        };
        assert_eq!(event.to_string(), "new connection from de:ad:be:ef:00:42");
    }
}
