//! LED driver owning the single output line of the light.
//!
//! The driver keeps two levels apart:
//! - the *commanded* level, last value passed to [`LedDriver::set`], which is
//!   what [`LedDriver::get`] reports and what the On/Off attribute mirrors;
//! - the *physical* level currently on the line.
//!
//! They only differ while an identify effect owns the line. Effects are
//! opened with [`LedDriver::begin_effect`]; the newest effect wins and writes
//! from superseded effects are dropped. Ending an effect puts the commanded
//! level back on the line.
//!
//! All state sits behind one `parking_lot::Mutex` held for at most one line
//! write, so the driver can be shared between Matter callbacks running on
//! different stack contexts.

use super::pin::{OutputLine, PinConfig};
use embedded_hal::digital::{Error as _, ErrorKind, PinState};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("GPIO{line} configuration failed: {kind:?}")]
    Configure { line: u8, kind: ErrorKind },

    #[error("GPIO{line} write failed: {kind:?}")]
    Write { line: u8, kind: ErrorKind },

    #[error("GPIO{0} driver already initialized")]
    AlreadyInitialized(u8),
}

/// Electrical level that lights the LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedPolarity {
    #[default]
    ActiveHigh,
    ActiveLow,
}

impl LedPolarity {
    pub fn from_active_low(active_low: bool) -> Self {
        if active_low {
            Self::ActiveLow
        } else {
            Self::ActiveHigh
        }
    }

    fn pin_state(self, on: bool) -> PinState {
        match self {
            Self::ActiveHigh => PinState::from(on),
            Self::ActiveLow => PinState::from(!on),
        }
    }
}

/// Identifies one transient effect on the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EffectId(u64);

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// On/off timing of a blink effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPattern {
    pub on: Duration,
    pub off: Duration,
    /// Number of on/off cycles, `None` to blink until cancelled.
    pub repeats: Option<u32>,
}

impl BlinkPattern {
    /// Symmetric blink repeated until cancelled.
    pub const fn continuous(half_period: Duration) -> Self {
        Self {
            on: half_period,
            off: half_period,
            repeats: None,
        }
    }

    pub const fn finite(on: Duration, off: Duration, repeats: u32) -> Self {
        Self {
            on,
            off,
            repeats: Some(repeats),
        }
    }

    /// Total run time, `None` for continuous patterns.
    pub fn duration(&self) -> Option<Duration> {
        self.repeats.map(|n| (self.on + self.off) * n)
    }
}

/// How a [`LedDriver::pulse`] run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseOutcome {
    /// All cycles ran and the commanded level was restored.
    Completed,
    /// The cancellation token fired; the canceller restores the line.
    Cancelled,
    /// A newer effect took over the line.
    Superseded,
}

/// Object-safe view of an [`OutputLine`] with its error type erased.
trait DynLine: Send {
    fn configure(&mut self, config: &PinConfig) -> Result<(), ErrorKind>;
    fn write(&mut self, state: PinState) -> Result<(), ErrorKind>;
}

impl<T: OutputLine> DynLine for T {
    fn configure(&mut self, config: &PinConfig) -> Result<(), ErrorKind> {
        OutputLine::configure(self, config).map_err(|e| e.kind())
    }

    fn write(&mut self, state: PinState) -> Result<(), ErrorKind> {
        self.set_state(state).map_err(|e| e.kind())
    }
}

struct DriverState {
    line: Box<dyn DynLine>,
    initialized: bool,
    commanded: bool,
    /// Logical level on the line, `None` until written or after a failed write.
    physical: Option<bool>,
    effect: Option<EffectId>,
    next_effect: u64,
}

/// Thread-safe driver for one LED.
pub struct LedDriver {
    gpio: u8,
    polarity: LedPolarity,
    state: Mutex<DriverState>,
}

impl LedDriver {
    /// Take ownership of `line`. Nothing is written until [`initialize`](Self::initialize).
    pub fn new(line: impl OutputLine, polarity: LedPolarity) -> Self {
        Self {
            gpio: line.line(),
            polarity,
            state: Mutex::new(DriverState {
                line: Box::new(line),
                initialized: false,
                commanded: false,
                physical: None,
                effect: None,
                next_effect: 0,
            }),
        }
    }

    pub fn gpio(&self) -> u8 {
        self.gpio
    }

    pub fn polarity(&self) -> LedPolarity {
        self.polarity
    }

    /// Configure the line as a plain output and drive the LED off.
    ///
    /// Must run exactly once, before the Matter stack can deliver callbacks.
    pub fn initialize(&self) -> Result<(), DriverError> {
        info!("[Light] Initializing LED on GPIO {}", self.gpio);
        let mut state = self.state.lock();
        if state.initialized {
            return Err(DriverError::AlreadyInitialized(self.gpio));
        }

        state
            .line
            .configure(&PinConfig::output())
            .map_err(|kind| DriverError::Configure {
                line: self.gpio,
                kind,
            })?;
        state
            .line
            .write(self.polarity.pin_state(false))
            .map_err(|kind| DriverError::Write {
                line: self.gpio,
                kind,
            })?;

        state.commanded = false;
        state.physical = Some(false);
        state.initialized = true;
        info!("[Light] LED initialized (off)");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Command the LED on or off.
    ///
    /// The line is only written when its level differs. While an identify
    /// effect runs the value is recorded and applied when the effect ends.
    pub fn set(&self, on: bool) {
        let mut state = self.state.lock();
        state.commanded = on;
        if !state.initialized {
            warn!(
                "[Light] GPIO {} not initialized, deferring level {}",
                self.gpio,
                level_name(on)
            );
            return;
        }
        if let Some(effect) = state.effect {
            debug!(
                "[Light] Effect {} active, level {} applied when it ends",
                effect,
                level_name(on)
            );
            return;
        }
        self.apply(&mut state, on);
    }

    /// Last commanded level.
    pub fn get(&self) -> bool {
        self.state.lock().commanded
    }

    /// Logical level currently on the line, `None` if unknown.
    pub fn physical(&self) -> Option<bool> {
        self.state.lock().physical
    }

    pub fn is_effect_active(&self) -> bool {
        self.state.lock().effect.is_some()
    }

    /// Hand the line to a new effect, superseding any running one.
    pub fn begin_effect(&self) -> EffectId {
        let mut state = self.state.lock();
        state.next_effect += 1;
        let effect = EffectId(state.next_effect);
        if let Some(previous) = state.effect.replace(effect) {
            debug!("[Light] Effect {} superseded by {}", previous, effect);
        }
        effect
    }

    /// Drive the line for `effect`. Returns `false` if the effect no longer owns it.
    pub fn drive_effect(&self, effect: EffectId, on: bool) -> bool {
        let mut state = self.state.lock();
        if state.effect != Some(effect) || !state.initialized {
            return false;
        }
        self.apply(&mut state, on);
        true
    }

    /// Release the line from `effect` and restore the commanded level.
    ///
    /// Returns `false` (and changes nothing) if `effect` is not the active one.
    pub fn end_effect(&self, effect: EffectId) -> bool {
        let mut state = self.state.lock();
        if state.effect != Some(effect) {
            return false;
        }
        state.effect = None;
        let commanded = state.commanded;
        if state.initialized {
            self.apply(&mut state, commanded);
        }
        true
    }

    /// Blink the line for `effect` following `pattern`.
    ///
    /// Ends the effect itself when all cycles ran. On cancellation the line is
    /// left as is; whoever cancelled calls [`end_effect`](Self::end_effect).
    pub async fn pulse(
        &self,
        effect: EffectId,
        pattern: BlinkPattern,
        cancel: CancellationToken,
    ) -> PulseOutcome {
        let mut cycles = 0u32;
        while pattern.repeats.is_none_or(|n| cycles < n) {
            for (on, hold) in [(true, pattern.on), (false, pattern.off)] {
                if !self.drive_effect(effect, on) {
                    return PulseOutcome::Superseded;
                }
                tokio::select! {
                    () = cancel.cancelled() => return PulseOutcome::Cancelled,
                    () = tokio::time::sleep(hold) => {}
                }
            }
            cycles += 1;
        }

        if self.end_effect(effect) {
            PulseOutcome::Completed
        } else {
            PulseOutcome::Superseded
        }
    }

    fn apply(&self, state: &mut DriverState, on: bool) {
        if state.physical == Some(on) {
            return;
        }
        match state.line.write(self.polarity.pin_state(on)) {
            Ok(()) => state.physical = Some(on),
            Err(kind) => {
                state.physical = None;
                error!(
                    "[Light] Failed to drive GPIO {} {}: {:?}",
                    self.gpio,
                    level_name(on),
                    kind
                );
            }
        }
    }
}

fn level_name(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::pin::{PinConfig, SimulatedPin};
    use std::sync::Arc;

    fn driver(polarity: LedPolarity) -> (LedDriver, crate::device::pin::PinWatch) {
        let pin = SimulatedPin::new(8);
        let watch = pin.watch();
        (LedDriver::new(pin, polarity), watch)
    }

    #[test]
    fn test_initialize_configures_output_and_turns_off() {
        let (driver, watch) = driver(LedPolarity::ActiveHigh);
        driver.initialize().unwrap();

        let config = watch.config().unwrap();
        assert_eq!(config, PinConfig::output());
        assert_eq!(watch.writes(), vec![false]);
        assert!(!driver.get());
        assert_eq!(driver.physical(), Some(false));
    }

    #[test]
    fn test_initialize_twice_fails() {
        let (driver, _watch) = driver(LedPolarity::ActiveHigh);
        driver.initialize().unwrap();
        assert!(matches!(
            driver.initialize(),
            Err(DriverError::AlreadyInitialized(8))
        ));
    }

    #[test]
    fn test_initialize_reports_configure_failure() {
        let (driver, watch) = driver(LedPolarity::ActiveHigh);
        watch.fail_configure(true);
        assert!(matches!(
            driver.initialize(),
            Err(DriverError::Configure { line: 8, .. })
        ));
        assert!(!driver.is_initialized());
        assert_eq!(watch.write_count(), 0);
    }

    #[test]
    fn test_set_is_idempotent() {
        let (driver, watch) = driver(LedPolarity::ActiveHigh);
        driver.initialize().unwrap();

        driver.set(true);
        driver.set(true);
        assert!(driver.get());
        assert_eq!(watch.writes(), vec![false, true]);

        driver.set(false);
        driver.set(false);
        assert!(!driver.get());
        assert_eq!(watch.writes(), vec![false, true, false]);
    }

    #[test]
    fn test_active_low_inverts_line_only() {
        let (driver, watch) = driver(LedPolarity::ActiveLow);
        driver.initialize().unwrap();
        assert!(watch.is_high());

        driver.set(true);
        assert!(driver.get());
        assert!(!watch.is_high());
    }

    #[test]
    fn test_set_before_initialize_does_not_touch_line() {
        let (driver, watch) = driver(LedPolarity::ActiveHigh);
        driver.set(true);
        assert!(driver.get());
        assert_eq!(watch.write_count(), 0);

        // Initialization always lands on the safe default.
        driver.initialize().unwrap();
        assert!(!driver.get());
        assert!(!watch.is_high());
    }

    #[test]
    fn test_write_failure_keeps_commanded_level() {
        let (driver, watch) = driver(LedPolarity::ActiveHigh);
        driver.initialize().unwrap();

        watch.fail_writes(true);
        driver.set(true);
        assert!(driver.get());
        assert_eq!(driver.physical(), None);

        watch.fail_writes(false);
        driver.set(true);
        assert_eq!(driver.physical(), Some(true));
        assert!(watch.is_high());
    }

    #[test]
    fn test_effect_defers_set_until_end() {
        let (driver, watch) = driver(LedPolarity::ActiveHigh);
        driver.initialize().unwrap();

        let effect = driver.begin_effect();
        assert!(driver.drive_effect(effect, true));
        driver.set(false);
        assert!(watch.is_high());

        driver.set(true);
        assert!(driver.end_effect(effect));
        assert!(watch.is_high());
        assert!(driver.get());
        assert!(!driver.is_effect_active());
    }

    #[test]
    fn test_superseded_effect_cannot_write() {
        let (driver, watch) = driver(LedPolarity::ActiveHigh);
        driver.initialize().unwrap();

        let first = driver.begin_effect();
        let second = driver.begin_effect();
        assert!(!driver.drive_effect(first, true));
        assert!(!watch.is_high());
        assert!(!driver.end_effect(first));
        assert!(driver.is_effect_active());
        assert!(driver.end_effect(second));
    }

    #[test]
    fn test_blink_pattern_duration() {
        let pattern =
            BlinkPattern::finite(Duration::from_millis(250), Duration::from_millis(250), 2);
        assert_eq!(pattern.duration(), Some(Duration::from_secs(1)));
        assert_eq!(
            BlinkPattern::continuous(Duration::from_millis(500)).duration(),
            None
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_restores_commanded_level() {
        let (driver, watch) = driver(LedPolarity::ActiveHigh);
        driver.initialize().unwrap();
        driver.set(true);

        let effect = driver.begin_effect();
        let pattern =
            BlinkPattern::finite(Duration::from_millis(100), Duration::from_millis(100), 2);
        let outcome = driver
            .pulse(effect, pattern, CancellationToken::new())
            .await;

        assert_eq!(outcome, PulseOutcome::Completed);
        assert!(driver.get());
        assert!(watch.is_high());
        // init, set(on), two blink cycles (first "on" is a no-op), restore
        assert_eq!(watch.writes(), vec![false, true, false, true, false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_stops_on_cancel() {
        let (driver, _watch) = driver(LedPolarity::ActiveHigh);
        let driver = Arc::new(driver);
        driver.initialize().unwrap();

        let effect = driver.begin_effect();
        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let driver = driver.clone();
            let cancel = cancel.clone();
            async move {
                driver
                    .pulse(
                        effect,
                        BlinkPattern::continuous(Duration::from_millis(500)),
                        cancel,
                    )
                    .await
            }
        });

        tokio::time::sleep(Duration::from_millis(1200)).await;
        cancel.cancel();
        assert_eq!(task.await.unwrap(), PulseOutcome::Cancelled);
        assert!(driver.end_effect(effect));
        assert_eq!(driver.physical(), Some(false));
    }

    #[test]
    fn test_concurrent_sets_leave_consistent_state() {
        let (driver, watch) = driver(LedPolarity::ActiveHigh);
        let driver = Arc::new(driver);
        driver.initialize().unwrap();

        let handles: Vec<_> = [true, false]
            .into_iter()
            .map(|value| {
                let driver = driver.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        driver.set(value);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let last = driver.get();
        assert_eq!(driver.physical(), Some(last));
        assert_eq!(watch.is_high(), last);

        driver.set(!last);
        assert_eq!(driver.get(), !last);
        assert_eq!(watch.is_high(), !last);
    }
}
