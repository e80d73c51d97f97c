//! Lifecycle event monitor.
//!
//! Observation point for the stack's device-layer events. Every known kind
//! maps to one log line; unknown kinds are accepted and logged at debug so
//! newer stack versions never trip the light up.
//!
//! This is also where a status LED pattern per commissioning phase would
//! hook in; today the monitor keeps no state.

use crate::matter::events::{AddressChange, LifecycleEvent};
use crate::matter::stack::EventCallback;
use log::{debug, info};

#[derive(Debug, Default)]
pub struct LifecycleMonitor;

impl LifecycleMonitor {
    pub fn new() -> Self {
        Self
    }

    /// Log line for `event`, `None` for kinds this build does not know.
    pub fn describe(event: &LifecycleEvent) -> Option<String> {
        let message = match event {
            LifecycleEvent::AddressChanged(change) => {
                let change = match change {
                    AddressChange::Ipv4Assigned => "IPv4 assigned",
                    AddressChange::Ipv4Lost => "IPv4 lost",
                    AddressChange::Ipv6Assigned => "IPv6 assigned",
                    AddressChange::Ipv6Lost => "IPv6 lost",
                };
                format!("IP address changed ({change})")
            }
            LifecycleEvent::CommissioningComplete {
                node_id,
                fabric_index,
            } => format!(
                "Commissioning complete, joined fabric {fabric_index} as node {node_id:016X}"
            ),
            LifecycleEvent::FailSafeExpired { fabric_index } => {
                format!("Commissioning fail-safe timer expired (fabric {fabric_index})")
            }
            LifecycleEvent::CommissioningSessionStarted => {
                "Commissioning session started".to_string()
            }
            LifecycleEvent::CommissioningSessionStopped => {
                "Commissioning session stopped".to_string()
            }
            LifecycleEvent::CommissioningWindowOpened => "Commissioning window opened".to_string(),
            LifecycleEvent::CommissioningWindowClosed => "Commissioning window closed".to_string(),
            LifecycleEvent::Unknown { .. } => return None,
        };
        Some(message)
    }
}

impl EventCallback for LifecycleMonitor {
    fn on_event(&self, event: &LifecycleEvent) {
        match Self::describe(event) {
            Some(message) => info!("[Lifecycle] {}", message),
            None => debug!("[Lifecycle] Unhandled device event {:?}", event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matter::events::LifecycleEventKind;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_known_kind_is_described() {
        for kind in LifecycleEventKind::iter().filter(|k| *k != LifecycleEventKind::Unknown) {
            let event = LifecycleEvent::with_default_payload(kind);
            assert!(LifecycleMonitor::describe(&event).is_some(), "{kind}");
        }
    }

    #[test]
    fn test_unknown_events_are_accepted() {
        let monitor = LifecycleMonitor::new();
        for code in [0x0000, 0x8001, 0xFFFF] {
            let event = LifecycleEvent::Unknown { code };
            assert_eq!(LifecycleMonitor::describe(&event), None);
            monitor.on_event(&event);
        }
    }

    #[test]
    fn test_commissioning_complete_message() {
        let event = LifecycleEvent::CommissioningComplete {
            node_id: 0x1122,
            fabric_index: 2,
        };
        assert_eq!(
            LifecycleMonitor::describe(&event).unwrap(),
            "Commissioning complete, joined fabric 2 as node 0000000000001122"
        );
    }
}
