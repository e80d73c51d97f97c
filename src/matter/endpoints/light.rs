//! Attribute bridge for the Matter On/Off Light endpoint.
//!
//! Turns committed On/Off attribute values into LED driver calls. Pre-update
//! notifications are only logged: the stack may still reject or roll back the
//! write, so the LED must never follow a tentative value.

use super::EndpointBinding;
use crate::device::LedDriver;
use crate::matter::attributes::{AttributeUpdate, AttributeValue, UpdatePhase};
use crate::matter::clusters::{AttributeId, ClusterId, EndpointId, on_off};
use crate::matter::stack::{AttributeCallback, CallbackResult};
use log::{debug, info, warn};
use std::sync::Arc;

/// Attribute update as seen from the light endpoint.
enum LightAttribute<'a> {
    OnOff(&'a AttributeValue),
    /// The endpoint has not been registered yet.
    Unbound,
    OtherEndpoint(EndpointId),
    Other {
        cluster: ClusterId,
        attribute: AttributeId,
    },
}

impl<'a> LightAttribute<'a> {
    fn decode(update: &'a AttributeUpdate, bound: Option<EndpointId>) -> Self {
        match bound {
            None => Self::Unbound,
            Some(endpoint) if endpoint != update.endpoint => Self::OtherEndpoint(update.endpoint),
            Some(_) => match (update.cluster, update.attribute) {
                (on_off::ID, on_off::attributes::ON_OFF) => Self::OnOff(&update.value),
                (cluster, attribute) => Self::Other { cluster, attribute },
            },
        }
    }
}

/// Bridges the On/Off attribute of the light endpoint to the LED.
pub struct OnOffLightBridge {
    driver: Arc<LedDriver>,
    binding: Arc<EndpointBinding>,
}

impl OnOffLightBridge {
    pub fn new(driver: Arc<LedDriver>, binding: Arc<EndpointBinding>) -> Self {
        Self { driver, binding }
    }

    fn apply(&self, update: &AttributeUpdate) {
        match LightAttribute::decode(update, self.binding.id()) {
            LightAttribute::OnOff(value) => match value.as_bool() {
                Some(on) => {
                    info!(
                        "[Light] OnOff cluster: light {}",
                        if on { "on" } else { "off" }
                    );
                    self.driver.set(on);
                }
                None => warn!(
                    "[Light] OnOff attribute carried a {} ({}), keeping LED {}",
                    value.type_name(),
                    value,
                    if self.driver.get() { "on" } else { "off" }
                ),
            },
            LightAttribute::Unbound => warn!(
                "[Light] Update for endpoint {} before the light endpoint was registered, ignoring",
                update.endpoint
            ),
            LightAttribute::OtherEndpoint(endpoint) => {
                debug!("[Light] Ignoring update for endpoint {}", endpoint);
            }
            LightAttribute::Other { cluster, attribute } => debug!(
                "[Light] Ignoring cluster {:#06x} attribute {:#06x}",
                cluster, attribute
            ),
        }
    }
}

impl AttributeCallback for OnOffLightBridge {
    fn on_attribute_update(&self, update: &AttributeUpdate) -> CallbackResult {
        match update.phase {
            UpdatePhase::PreUpdate => info!(
                "[Light] Attribute update: endpoint {}, cluster {:#06x}, attribute {:#06x}, value {}",
                update.endpoint, update.cluster, update.attribute, update.value
            ),
            UpdatePhase::PostUpdate => self.apply(update),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{LedPolarity, PinWatch, SimulatedPin};
    use crate::matter::clusters::identify;
    use crate::matter::endpoints::EndpointDescriptor;
    use crate::matter::stack::EndpointHandle;

    const LIGHT: EndpointId = 1;

    fn bridge() -> (OnOffLightBridge, Arc<LedDriver>, PinWatch) {
        let pin = SimulatedPin::new(8);
        let watch = pin.watch();
        let driver = Arc::new(LedDriver::new(pin, LedPolarity::ActiveHigh));
        driver.initialize().unwrap();

        let binding = Arc::new(EndpointBinding::new());
        binding
            .bind(EndpointDescriptor {
                id: LIGHT,
                handle: EndpointHandle::new(1),
            })
            .unwrap();
        (OnOffLightBridge::new(driver.clone(), binding), driver, watch)
    }

    fn on_off(phase: UpdatePhase, value: AttributeValue) -> AttributeUpdate {
        AttributeUpdate::new(
            phase,
            LIGHT,
            on_off::ID,
            on_off::attributes::ON_OFF,
            value,
        )
    }

    #[test]
    fn test_post_update_drives_led() {
        let (bridge, driver, watch) = bridge();

        for value in [true, false, true] {
            bridge
                .on_attribute_update(&on_off(
                    UpdatePhase::PostUpdate,
                    AttributeValue::Bool(value),
                ))
                .unwrap();
            assert_eq!(driver.get(), value);
            assert_eq!(watch.is_high(), value);
        }
    }

    #[test]
    fn test_pre_update_never_drives_led() {
        let (bridge, driver, watch) = bridge();

        for value in [
            AttributeValue::Bool(true),
            AttributeValue::Bool(false),
            AttributeValue::U8(1),
            AttributeValue::Null,
        ] {
            assert!(
                bridge
                    .on_attribute_update(&on_off(UpdatePhase::PreUpdate, value))
                    .is_ok()
            );
            assert!(!driver.get());
        }
        assert_eq!(watch.write_count(), 1);
    }

    #[test]
    fn test_non_boolean_payload_keeps_state() {
        let (bridge, driver, _watch) = bridge();
        bridge
            .on_attribute_update(&on_off(UpdatePhase::PostUpdate, AttributeValue::Bool(true)))
            .unwrap();

        let result = bridge.on_attribute_update(&on_off(
            UpdatePhase::PostUpdate,
            AttributeValue::U8(0),
        ));
        assert!(result.is_ok());
        assert!(driver.get());
    }

    #[test]
    fn test_unknown_attributes_are_ignored() {
        let (bridge, driver, watch) = bridge();

        let updates = [
            AttributeUpdate::new(
                UpdatePhase::PostUpdate,
                LIGHT,
                on_off::ID,
                on_off::attributes::ON_TIME,
                AttributeValue::U16(30),
            ),
            AttributeUpdate::new(
                UpdatePhase::PostUpdate,
                LIGHT,
                identify::ID,
                identify::attributes::IDENTIFY_TIME,
                AttributeValue::U16(10),
            ),
            AttributeUpdate::new(
                UpdatePhase::PostUpdate,
                LIGHT,
                0xFC00,
                0x0000,
                AttributeValue::Bool(true),
            ),
        ];
        for update in &updates {
            assert!(bridge.on_attribute_update(update).is_ok());
        }
        assert!(!driver.get());
        assert_eq!(watch.write_count(), 1);
    }

    #[test]
    fn test_other_endpoints_are_ignored() {
        let (bridge, driver, _watch) = bridge();
        let mut update = on_off(UpdatePhase::PostUpdate, AttributeValue::Bool(true));
        update.endpoint = 2;

        assert!(bridge.on_attribute_update(&update).is_ok());
        assert!(!driver.get());
    }

    #[test]
    fn test_updates_before_binding_are_ignored() {
        let pin = SimulatedPin::new(8);
        let driver = Arc::new(LedDriver::new(pin, LedPolarity::ActiveHigh));
        driver.initialize().unwrap();
        let bridge = OnOffLightBridge::new(driver.clone(), Arc::new(EndpointBinding::new()));

        assert!(
            bridge
                .on_attribute_update(&on_off(UpdatePhase::PostUpdate, AttributeValue::Bool(true)))
                .is_ok()
        );
        assert!(!driver.get());
    }
}
