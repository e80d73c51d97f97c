//! Callbacks the light registers with the Matter stack.
//!
//! - `light`: On/Off attribute updates → LED driver
//! - `identify`: identify start/stop → transient blink on the LED
//! - `lifecycle`: device-layer events → log lines
//!
//! Callbacks are registered when the node is created, before the light's
//! endpoint exists. They share an [`EndpointBinding`] that the bootstrap
//! fills in once the stack has assigned the endpoint id.

pub mod identify;
pub mod lifecycle;
pub mod light;

pub use identify::IdentifyHandler;
pub use lifecycle::LifecycleMonitor;
pub use light::OnOffLightBridge;

use super::clusters::EndpointId;
use super::stack::EndpointHandle;
use std::sync::OnceLock;

/// The light's endpoint as registered with the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub id: EndpointId,
    pub handle: EndpointHandle,
}

/// Write-once slot holding the light's [`EndpointDescriptor`].
#[derive(Debug, Default)]
pub struct EndpointBinding(OnceLock<EndpointDescriptor>);

impl EndpointBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the endpoint. Fails with the existing descriptor if already bound.
    pub fn bind(&self, descriptor: EndpointDescriptor) -> Result<(), EndpointDescriptor> {
        self.0.set(descriptor).map_err(|_| self.0.get().copied().unwrap_or(descriptor))
    }

    pub fn get(&self) -> Option<EndpointDescriptor> {
        self.0.get().copied()
    }

    pub fn id(&self) -> Option<EndpointId> {
        self.0.get().map(|descriptor| descriptor.id)
    }
}
