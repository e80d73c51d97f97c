//! Output line abstraction for the LED.
//!
//! Builds on `embedded_hal::digital::OutputPin` and adds the configuration
//! step that GPIO peripherals need before the first write (direction,
//! interrupts, pull resistors). `SimulatedPin` is the host implementation:
//! it keeps the applied configuration and every level written so the
//! device can run (and be tested) without hardware.

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use parking_lot::Mutex;
use std::sync::Arc;

/// GPIO configuration applied once before the line is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    /// Open-drain instead of push-pull output.
    pub open_drain: bool,
    /// Edge interrupts enabled on the line.
    pub interrupts: bool,
    pub pull_up: bool,
    pub pull_down: bool,
}

impl PinConfig {
    /// Push-pull output, no interrupts, no pull resistors.
    pub const fn output() -> Self {
        Self {
            open_drain: false,
            interrupts: false,
            pull_up: false,
            pull_down: false,
        }
    }
}

/// A digital output line that can be configured before use.
pub trait OutputLine: OutputPin + Send + 'static {
    /// GPIO number, used for logging.
    fn line(&self) -> u8;

    /// Apply `config` to the underlying peripheral.
    fn configure(&mut self, config: &PinConfig) -> Result<(), Self::Error>;
}

#[derive(Debug, Default)]
struct PinTrace {
    config: Option<PinConfig>,
    high: bool,
    writes: Vec<bool>,
    fail_configure: bool,
    fail_writes: bool,
}

/// Host-side GPIO line that records what was done to it.
pub struct SimulatedPin {
    line: u8,
    trace: Arc<Mutex<PinTrace>>,
}

/// Read side of a [`SimulatedPin`], shared with tests and the console.
#[derive(Clone)]
pub struct PinWatch {
    trace: Arc<Mutex<PinTrace>>,
}

impl SimulatedPin {
    pub fn new(line: u8) -> Self {
        Self {
            line,
            trace: Arc::new(Mutex::new(PinTrace::default())),
        }
    }

    pub fn watch(&self) -> PinWatch {
        PinWatch {
            trace: self.trace.clone(),
        }
    }

    fn write(&mut self, high: bool) -> Result<(), ErrorKind> {
        let mut trace = self.trace.lock();
        if trace.fail_writes {
            return Err(ErrorKind::Other);
        }
        trace.high = high;
        trace.writes.push(high);
        log::debug!(
            "[GPIO{}] level {}",
            self.line,
            if high { "HIGH" } else { "LOW" }
        );
        Ok(())
    }
}

impl ErrorType for SimulatedPin {
    type Error = ErrorKind;
}

impl OutputPin for SimulatedPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

impl OutputLine for SimulatedPin {
    fn line(&self) -> u8 {
        self.line
    }

    fn configure(&mut self, config: &PinConfig) -> Result<(), Self::Error> {
        let mut trace = self.trace.lock();
        if trace.fail_configure {
            return Err(ErrorKind::Other);
        }
        trace.config = Some(*config);
        Ok(())
    }
}

impl PinWatch {
    /// Configuration applied by the driver, if any.
    pub fn config(&self) -> Option<PinConfig> {
        self.trace.lock().config
    }

    /// Current electrical level.
    pub fn is_high(&self) -> bool {
        self.trace.lock().high
    }

    /// Every level written so far, oldest first.
    pub fn writes(&self) -> Vec<bool> {
        self.trace.lock().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.trace.lock().writes.len()
    }

    /// Make the next `configure` calls fail.
    pub fn fail_configure(&self, fail: bool) {
        self.trace.lock().fail_configure = fail;
    }

    /// Make the next level writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.trace.lock().fail_writes = fail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::PinState;

    #[test]
    fn test_output_config_disables_interrupts_and_pulls() {
        let config = PinConfig::output();
        assert!(!config.open_drain);
        assert!(!config.interrupts);
        assert!(!config.pull_up);
        assert!(!config.pull_down);
    }

    #[test]
    fn test_simulated_pin_records_writes() {
        let mut pin = SimulatedPin::new(8);
        let watch = pin.watch();

        pin.set_high().unwrap();
        pin.set_state(PinState::Low).unwrap();
        pin.set_high().unwrap();

        assert!(watch.is_high());
        assert_eq!(watch.writes(), vec![true, false, true]);
    }

    #[test]
    fn test_simulated_pin_fault_injection() {
        let mut pin = SimulatedPin::new(8);
        let watch = pin.watch();

        watch.fail_configure(true);
        assert_eq!(pin.configure(&PinConfig::output()), Err(ErrorKind::Other));
        assert_eq!(watch.config(), None);

        watch.fail_writes(true);
        assert!(pin.set_high().is_err());
        assert_eq!(watch.write_count(), 0);
    }
}
