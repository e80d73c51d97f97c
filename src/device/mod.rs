//! Hardware side of the light: the output line and the LED driver on top of it.

pub mod led_driver;
pub mod pin;

pub use led_driver::{BlinkPattern, DriverError, EffectId, LedDriver, LedPolarity, PulseOutcome};
pub use pin::{OutputLine, PinConfig, PinWatch, SimulatedPin};
