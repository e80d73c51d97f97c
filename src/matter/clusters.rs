//! Matter identifiers used by the light.
//!
//! Only the clusters an On/Off Light endpoint carries are listed; values
//! follow the Matter Application Cluster specification.

pub type EndpointId = u16;
pub type ClusterId = u32;
pub type AttributeId = u32;

/// Endpoint 0 always holds the root node clusters.
pub const ROOT_ENDPOINT_ID: EndpointId = 0;

/// Global attribute present on every cluster.
pub const FEATURE_MAP_ATTRIBUTE_ID: AttributeId = 0xFFFC;

pub mod identify {
    use super::{AttributeId, ClusterId};

    pub const ID: ClusterId = 0x0003;

    pub mod attributes {
        use super::AttributeId;

        pub const IDENTIFY_TIME: AttributeId = 0x0000;
        pub const IDENTIFY_TYPE: AttributeId = 0x0001;
    }
}

pub mod groups {
    use super::ClusterId;

    pub const ID: ClusterId = 0x0004;
}

pub mod on_off {
    use super::{AttributeId, ClusterId};

    pub const ID: ClusterId = 0x0006;

    pub mod attributes {
        use super::AttributeId;

        pub const ON_OFF: AttributeId = 0x0000;
        pub const GLOBAL_SCENE_CONTROL: AttributeId = 0x4000;
        pub const ON_TIME: AttributeId = 0x4001;
        pub const OFF_WAIT_TIME: AttributeId = 0x4002;
        pub const START_UP_ON_OFF: AttributeId = 0x4003;
    }

    pub mod features {
        /// LT: behavior for lighting applications.
        pub const LIGHTING: u32 = 0x0001;
    }
}

pub mod descriptor {
    use super::ClusterId;

    pub const ID: ClusterId = 0x001D;
}

pub mod basic_information {
    use super::{AttributeId, ClusterId};

    pub const ID: ClusterId = 0x0028;

    pub mod attributes {
        use super::AttributeId;

        pub const VENDOR_NAME: AttributeId = 0x0001;
        pub const VENDOR_ID: AttributeId = 0x0002;
        pub const PRODUCT_NAME: AttributeId = 0x0003;
        pub const PRODUCT_ID: AttributeId = 0x0004;
        pub const NODE_LABEL: AttributeId = 0x0005;
        pub const HARDWARE_VERSION: AttributeId = 0x0007;
        pub const SOFTWARE_VERSION_STRING: AttributeId = 0x000A;
    }
}
