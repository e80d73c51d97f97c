//! Node configuration handed to the stack when the node is created.

use crate::config::MatterConfig;

const VENDOR_NAME: &str = "matter-gpio-light";
const PRODUCT_NAME: &str = "GPIO On/Off Light";

/// Basic information and commissioning parameters of the node.
///
/// The stack exposes these through the Basic Information cluster and uses
/// the discriminator/passcode for its commissioning window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub vendor_name: &'static str,
    pub product_name: &'static str,
    pub device_name: String,
    pub hw_ver: u16,
    pub sw_ver_str: &'static str,
    pub discriminator: u16,
    pub passcode: u32,
}

impl From<&MatterConfig> for NodeConfig {
    fn from(config: &MatterConfig) -> Self {
        Self {
            vendor_id: config.vendor_id,
            product_id: config.product_id,
            vendor_name: VENDOR_NAME,
            product_name: PRODUCT_NAME,
            device_name: config.device_name.clone(),
            hw_ver: 1,
            sw_ver_str: env!("CARGO_PKG_VERSION"),
            discriminator: config.discriminator,
            passcode: config.passcode,
        }
    }
}
