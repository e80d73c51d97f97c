//! Attribute update notifications delivered by the stack.

use super::clusters::{AttributeId, ClusterId, EndpointId};
use std::fmt;

/// Value carried by an attribute update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    I16(i16),
    Str(String),
}

impl AttributeValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::I16(_) => "i16",
            Self::Str(_) => "string",
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// When the notification is sent relative to the attribute write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    /// Before the value is committed. Failing here aborts the write.
    PreUpdate,
    /// After the value is committed.
    PostUpdate,
}

/// One attribute change, consumed once by the attribute callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeUpdate {
    pub phase: UpdatePhase,
    pub endpoint: EndpointId,
    pub cluster: ClusterId,
    pub attribute: AttributeId,
    pub value: AttributeValue,
}

impl AttributeUpdate {
    pub fn new(
        phase: UpdatePhase,
        endpoint: EndpointId,
        cluster: ClusterId,
        attribute: AttributeId,
        value: AttributeValue,
    ) -> Self {
        Self {
            phase,
            endpoint,
            cluster,
            attribute,
            value,
        }
    }
}
