//! Identify handler for the light endpoint.
//!
//! Lets a controller (or the person setting the device up) spot the physical
//! light by blinking it. The blink runs as an effect on the LED driver, so
//! the On/Off value reported to controllers never changes and the LED goes
//! back to its commanded level when identification ends.
//!
//! Effects run as tasks on the runtime handle given at construction, which
//! is the runtime hosting the stack's callbacks.

use super::EndpointBinding;
use crate::device::{BlinkPattern, EffectId, LedDriver, PulseOutcome};
use crate::matter::identify::{EFFECT_VARIANT_DEFAULT, IdentifyEffect, IdentifyEvent, IdentifyPhase};
use crate::matter::stack::{CallbackResult, IdentifyCallback};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

const BLINK: BlinkPattern =
    BlinkPattern::finite(Duration::from_millis(500), Duration::from_millis(500), 1);
const BREATHE: BlinkPattern =
    BlinkPattern::finite(Duration::from_millis(500), Duration::from_millis(500), 15);
const OKAY: BlinkPattern =
    BlinkPattern::finite(Duration::from_millis(250), Duration::from_millis(250), 2);

/// Cycles of the default blink used for effects this light cannot render.
const FALLBACK_CYCLES: u32 = 8;

enum IdentifyAction {
    Run(BlinkPattern),
    Stop,
}

struct ActiveIdentify {
    effect: EffectId,
    cancel: CancellationToken,
}

/// Runs identify effects on the LED.
pub struct IdentifyHandler {
    driver: Arc<LedDriver>,
    binding: Arc<EndpointBinding>,
    blink_period: Duration,
    runtime: Handle,
    active: Arc<Mutex<Option<ActiveIdentify>>>,
}

impl IdentifyHandler {
    /// `blink_period` is the half period of the default blink.
    pub fn new(
        driver: Arc<LedDriver>,
        binding: Arc<EndpointBinding>,
        blink_period: Duration,
        runtime: Handle,
    ) -> Self {
        Self {
            driver,
            binding,
            blink_period,
            runtime,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_identifying(&self) -> bool {
        self.active.lock().is_some()
    }

    fn action(&self, event: &IdentifyEvent) -> IdentifyAction {
        let Some(raw) = event.effect else {
            // Identify command: blink until the stack's IdentifyTime runs out.
            return IdentifyAction::Run(BlinkPattern::continuous(self.blink_period));
        };

        match IdentifyEffect::from_raw(raw) {
            Some(IdentifyEffect::FinishEffect | IdentifyEffect::StopEffect) => IdentifyAction::Stop,
            _ if event.variant != EFFECT_VARIANT_DEFAULT => {
                warn!(
                    "[Identify] Unsupported variant {:#04x} for effect {:#04x}, using default blink",
                    event.variant, raw
                );
                IdentifyAction::Run(self.fallback())
            }
            Some(IdentifyEffect::Blink) => IdentifyAction::Run(BLINK),
            Some(IdentifyEffect::Breathe) => IdentifyAction::Run(BREATHE),
            Some(IdentifyEffect::Okay) => IdentifyAction::Run(OKAY),
            Some(IdentifyEffect::ChannelChange) | None => {
                warn!(
                    "[Identify] Unsupported effect {:#04x}, using default blink",
                    raw
                );
                IdentifyAction::Run(self.fallback())
            }
        }
    }

    fn fallback(&self) -> BlinkPattern {
        BlinkPattern::finite(self.blink_period, self.blink_period, FALLBACK_CYCLES)
    }

    fn start(&self, pattern: BlinkPattern) {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            debug!("[Identify] Restarting, cancelling effect {}", previous.effect);
            previous.cancel.cancel();
        }

        let effect = self.driver.begin_effect();
        let cancel = CancellationToken::new();
        *active = Some(ActiveIdentify {
            effect,
            cancel: cancel.clone(),
        });
        drop(active);

        match pattern.duration() {
            Some(total) => info!("[Identify] Effect {} started for {:?}", effect, total),
            None => info!("[Identify] Effect {} started until stopped", effect),
        }
        let driver = self.driver.clone();
        let slot = self.active.clone();
        self.runtime.spawn(async move {
            if driver.pulse(effect, pattern, cancel).await == PulseOutcome::Completed {
                let mut active = slot.lock();
                if active.as_ref().is_some_and(|a| a.effect == effect) {
                    *active = None;
                }
                info!("[Identify] Effect {} finished", effect);
            }
        });
    }

    /// End the running effect, if any, and restore the commanded level.
    pub fn stop(&self) {
        let Some(active) = self.active.lock().take() else {
            debug!("[Identify] Stop without active effect");
            return;
        };
        active.cancel.cancel();
        self.driver.end_effect(active.effect);
        info!("[Identify] Effect {} stopped", active.effect);
    }
}

impl IdentifyCallback for IdentifyHandler {
    fn on_identify(&self, event: &IdentifyEvent) -> CallbackResult {
        info!(
            "[Identify] {:?} on endpoint {} (effect {:?}, variant {})",
            event.phase, event.endpoint, event.effect, event.variant
        );

        match self.binding.id() {
            Some(endpoint) if endpoint == event.endpoint => {}
            Some(_) => {
                debug!("[Identify] Not the light endpoint, ignoring");
                return Ok(());
            }
            None => {
                warn!("[Identify] Light endpoint not registered yet, ignoring");
                return Ok(());
            }
        }

        match event.phase {
            IdentifyPhase::Start => match self.action(event) {
                IdentifyAction::Run(pattern) => self.start(pattern),
                IdentifyAction::Stop => self.stop(),
            },
            IdentifyPhase::Stop => self.stop(),
        }
        Ok(())
    }
}
