//! Matter side of the light: identifiers, notification types, the stack
//! capability interface and the callbacks the light registers with it.

pub mod attributes;
pub mod clusters;
pub mod device_info;
pub mod device_types;
pub mod endpoints;
pub mod events;
pub mod identify;
pub mod simulated;
pub mod stack;

pub use device_info::NodeConfig;
pub use endpoints::{EndpointBinding, EndpointDescriptor};
pub use simulated::SimulatedStack;
pub use stack::MatterStack;
