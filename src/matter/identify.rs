//! Identify notifications delivered by the stack.
//!
//! The stack reports two sources of identification:
//! - the Identify command / IdentifyTime countdown, reported without an effect;
//! - the TriggerEffect command, reported with its effect identifier and variant.

use super::clusters::EndpointId;

/// Only variant defined by the Identify cluster.
pub const EFFECT_VARIANT_DEFAULT: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifyPhase {
    Start,
    Stop,
}

/// Identify cluster `EffectIdentifierEnum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IdentifyEffect {
    Blink = 0x00,
    Breathe = 0x01,
    Okay = 0x02,
    ChannelChange = 0x0B,
    FinishEffect = 0xFE,
    StopEffect = 0xFF,
}

impl IdentifyEffect {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x00 => Some(Self::Blink),
            0x01 => Some(Self::Breathe),
            0x02 => Some(Self::Okay),
            0x0B => Some(Self::ChannelChange),
            0xFE => Some(Self::FinishEffect),
            0xFF => Some(Self::StopEffect),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u8 {
        self as u8
    }
}

/// One identify notification, consumed once by the identify callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifyEvent {
    pub phase: IdentifyPhase,
    pub endpoint: EndpointId,
    /// Raw effect identifier, `None` for the Identify command.
    pub effect: Option<u8>,
    pub variant: u8,
}

impl IdentifyEvent {
    /// Identify command (IdentifyTime countdown started).
    pub fn start(endpoint: EndpointId) -> Self {
        Self {
            phase: IdentifyPhase::Start,
            endpoint,
            effect: None,
            variant: EFFECT_VARIANT_DEFAULT,
        }
    }

    /// TriggerEffect command.
    pub fn trigger(endpoint: EndpointId, effect: u8, variant: u8) -> Self {
        Self {
            phase: IdentifyPhase::Start,
            endpoint,
            effect: Some(effect),
            variant,
        }
    }

    pub fn stop(endpoint: EndpointId) -> Self {
        Self {
            phase: IdentifyPhase::Stop,
            endpoint,
            effect: None,
            variant: EFFECT_VARIANT_DEFAULT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_ids() {
        for effect in [
            IdentifyEffect::Blink,
            IdentifyEffect::Breathe,
            IdentifyEffect::Okay,
            IdentifyEffect::ChannelChange,
            IdentifyEffect::FinishEffect,
            IdentifyEffect::StopEffect,
        ] {
            assert_eq!(IdentifyEffect::from_raw(effect.as_raw()), Some(effect));
        }
        assert_eq!(IdentifyEffect::from_raw(0x03), None);
        assert_eq!(IdentifyEffect::from_raw(0x80), None);
    }
}
