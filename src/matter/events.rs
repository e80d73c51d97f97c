//! Lifecycle events emitted by the stack's device layer.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Which IP address changed on the operational interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressChange {
    Ipv4Assigned,
    Ipv4Lost,
    Ipv6Assigned,
    Ipv6Lost,
}

/// Device-layer event with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    AddressChanged(AddressChange),
    CommissioningComplete { node_id: u64, fabric_index: u8 },
    FailSafeExpired { fabric_index: u8 },
    CommissioningSessionStarted,
    CommissioningSessionStopped,
    CommissioningWindowOpened,
    CommissioningWindowClosed,
    /// Any event type this build does not know about.
    Unknown { code: u16 },
}

/// Payload-free discriminant of [`LifecycleEvent`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum LifecycleEventKind {
    AddressChanged,
    CommissioningComplete,
    FailSafeExpired,
    CommissioningSessionStarted,
    CommissioningSessionStopped,
    CommissioningWindowOpened,
    CommissioningWindowClosed,
    Unknown,
}

impl LifecycleEvent {
    pub fn kind(&self) -> LifecycleEventKind {
        match self {
            Self::AddressChanged(_) => LifecycleEventKind::AddressChanged,
            Self::CommissioningComplete { .. } => LifecycleEventKind::CommissioningComplete,
            Self::FailSafeExpired { .. } => LifecycleEventKind::FailSafeExpired,
            Self::CommissioningSessionStarted => LifecycleEventKind::CommissioningSessionStarted,
            Self::CommissioningSessionStopped => LifecycleEventKind::CommissioningSessionStopped,
            Self::CommissioningWindowOpened => LifecycleEventKind::CommissioningWindowOpened,
            Self::CommissioningWindowClosed => LifecycleEventKind::CommissioningWindowClosed,
            Self::Unknown { .. } => LifecycleEventKind::Unknown,
        }
    }

    /// Event of `kind` with a placeholder payload.
    pub fn with_default_payload(kind: LifecycleEventKind) -> Self {
        match kind {
            LifecycleEventKind::AddressChanged => Self::AddressChanged(AddressChange::Ipv6Assigned),
            LifecycleEventKind::CommissioningComplete => Self::CommissioningComplete {
                node_id: 0,
                fabric_index: 1,
            },
            LifecycleEventKind::FailSafeExpired => Self::FailSafeExpired { fabric_index: 1 },
            LifecycleEventKind::CommissioningSessionStarted => Self::CommissioningSessionStarted,
            LifecycleEventKind::CommissioningSessionStopped => Self::CommissioningSessionStopped,
            LifecycleEventKind::CommissioningWindowOpened => Self::CommissioningWindowOpened,
            LifecycleEventKind::CommissioningWindowClosed => Self::CommissioningWindowClosed,
            LifecycleEventKind::Unknown => Self::Unknown { code: 0 },
        }
    }
}
