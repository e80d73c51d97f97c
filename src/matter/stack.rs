//! Capability interface of the external Matter stack.
//!
//! The stack owns commissioning, sessions, transport and attribute storage.
//! The light only needs a handful of entry points from it (node/endpoint
//! creation, cluster lookup, feature configuration, start) and registers
//! three callbacks in return. Keeping this surface behind a trait lets the
//! bootstrap run against a real stack or against [`SimulatedStack`].
//!
//! [`SimulatedStack`]: super::simulated::SimulatedStack

use super::attributes::AttributeUpdate;
use super::clusters::{ClusterId, EndpointId};
use super::device_info::NodeConfig;
use super::device_types::{DEV_TYPE_ON_OFF_LIGHT, DeviceType};
use super::events::LifecycleEvent;
use super::identify::IdentifyEvent;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StackError {
    #[error("stack start failed with status {0}")]
    Status(i32),

    #[error("stack already started")]
    AlreadyStarted,

    #[error("stack not started")]
    NotStarted,

    #[error("no node has been created")]
    NoNode,

    #[error("unknown endpoint {0}")]
    UnknownEndpoint(EndpointId),

    #[error("unknown cluster {cluster:#06x} on endpoint {endpoint}")]
    UnknownCluster {
        endpoint: EndpointId,
        cluster: ClusterId,
    },

    #[error("unknown attribute {attribute:#06x} in cluster {cluster:#06x} on endpoint {endpoint}")]
    UnknownAttribute {
        endpoint: EndpointId,
        cluster: ClusterId,
        attribute: u32,
    },

    #[error(
        "attribute {attribute:#06x} in cluster {cluster:#06x} on endpoint {endpoint} holds a {found}"
    )]
    TypeMismatch {
        endpoint: EndpointId,
        cluster: ClusterId,
        attribute: u32,
        found: &'static str,
    },

    #[error("callback failed: {0}")]
    Callback(#[from] CallbackError),
}

/// Failure returned by a callback. At the pre-update phase it aborts the write.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("rejected: {0}")]
    Rejected(String),
}

pub type CallbackResult = Result<(), CallbackError>;

/// Receives pre- and post-update notifications for every attribute of the node.
pub trait AttributeCallback: Send + Sync + 'static {
    fn on_attribute_update(&self, update: &AttributeUpdate) -> CallbackResult;
}

/// Receives identify start/stop requests for every endpoint of the node.
pub trait IdentifyCallback: Send + Sync + 'static {
    fn on_identify(&self, event: &IdentifyEvent) -> CallbackResult;
}

/// Receives device-layer lifecycle events once the stack runs.
pub trait EventCallback: Send + Sync + 'static {
    fn on_event(&self, event: &LifecycleEvent);
}

macro_rules! stack_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u32);

        impl $name {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

stack_handle!(
    /// Opaque reference to a node created by the stack.
    NodeHandle
);
stack_handle!(
    /// Opaque reference to an endpoint created by the stack.
    EndpointHandle
);
stack_handle!(
    /// Opaque reference to a cluster instance on an endpoint.
    ClusterHandle
);

/// Endpoint creation flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndpointFlags(u8);

impl EndpointFlags {
    pub const NONE: Self = Self(0);
    /// The endpoint may be destroyed at runtime.
    pub const DESTROYABLE: Self = Self(0x01);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// On/Off `StartUpOnOff` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartUpOnOff {
    Off,
    On,
    Toggle,
}

/// Initial values of an On/Off Light endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnOffLightConfig {
    pub on_off: bool,
    /// `None` keeps the last value across reboots only if the stack persists it.
    pub start_up_on_off: Option<StartUpOnOff>,
    pub identify_time: u16,
}

impl OnOffLightConfig {
    pub const DEVICE_TYPE: DeviceType = DEV_TYPE_ON_OFF_LIGHT;
}

impl Default for OnOffLightConfig {
    fn default() -> Self {
        Self {
            on_off: false,
            start_up_on_off: None,
            identify_time: 0,
        }
    }
}

/// On/Off cluster Lighting (LT) feature attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightingFeatureConfig {
    pub global_scene_control: bool,
    pub on_time: u16,
    pub off_wait_time: u16,
}

impl Default for LightingFeatureConfig {
    fn default() -> Self {
        Self {
            global_scene_control: true,
            on_time: 0,
            off_wait_time: 0,
        }
    }
}

/// Entry points of the Matter stack used by the bootstrap.
pub trait MatterStack {
    /// Create the node and register the attribute and identify callbacks.
    fn create_node(
        &mut self,
        config: &NodeConfig,
        attributes: Arc<dyn AttributeCallback>,
        identify: Arc<dyn IdentifyCallback>,
    ) -> Option<NodeHandle>;

    /// Create an On/Off Light endpoint on `node`.
    fn create_endpoint(
        &mut self,
        node: NodeHandle,
        config: &OnOffLightConfig,
        flags: EndpointFlags,
    ) -> Option<EndpointHandle>;

    fn endpoint_id(&self, endpoint: EndpointHandle) -> EndpointId;

    fn get_cluster(&self, endpoint: EndpointHandle, cluster: ClusterId) -> Option<ClusterHandle>;

    /// Enable the Lighting feature on an On/Off cluster.
    fn add_lighting_feature(
        &mut self,
        cluster: ClusterHandle,
        config: &LightingFeatureConfig,
    ) -> Result<(), StackError>;

    /// Start the stack; lifecycle events go to `events` from then on.
    fn start(&mut self, events: Arc<dyn EventCallback>) -> Result<(), StackError>;

    /// Whether the node already belongs to at least one fabric.
    fn is_commissioned(&self) -> bool {
        false
    }
}
