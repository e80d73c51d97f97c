//! Device type definitions used by the light,
//! following the Matter Device Library specification.

/// A Matter device type as declared in an endpoint's Descriptor cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceType {
    pub dtype: u32,
    pub drev: u16,
}

/// Matter Root Node device type
///
/// Device Type ID: 0x0016 (22 decimal)
/// Device Type Revision: 1
///
/// Lives on endpoint 0 and carries the node-wide system clusters
/// (Basic Information, General Commissioning, Network Commissioning, ...).
pub const DEV_TYPE_ROOT_NODE: DeviceType = DeviceType {
    dtype: 0x0016,
    drev: 1,
};

/// Matter On/Off Light device type
///
/// Device Type ID: 0x0100 (256 decimal)
/// Device Type Revision: 2
///
/// Required clusters:
/// - Identify (0x0003)
/// - Groups (0x0004)
/// - OnOff (0x0006)
/// - Descriptor (standard)
///
/// Used for simple on/off lights.
pub const DEV_TYPE_ON_OFF_LIGHT: DeviceType = DeviceType {
    dtype: 0x0100,
    drev: 2,
};
