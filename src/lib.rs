//! GPIO LED exposed as a Matter On/Off Light.
//!
//! The protocol stack (commissioning, sessions, transport, attribute storage)
//! is an external collaborator behind [`matter::MatterStack`]. This crate
//! drives the LED from committed On/Off values, runs identify effects,
//! observes lifecycle events and sequences startup.

pub mod bootstrap;
pub mod config;
pub mod device;
pub mod error;
pub mod matter;
pub mod storage;

pub use bootstrap::{BootStage, Bootstrap, LightDevice};
pub use config::Config;
pub use error::{LightError, Result};
