//! Startup sequence of the light.
//!
//! Stages run strictly in order and each one only starts after the previous
//! one succeeded:
//!
//! 1. persistent storage (erased and retried once if its content is unusable)
//! 2. LED driver, forced off
//! 3. node and On/Off Light endpoint, callbacks registered
//! 4. stack start, lifecycle monitor registered
//! 5. commissioning banner
//!
//! A failure stops the sequence at the last completed stage. The LED stays in
//! its safe default (off, or untouched if the driver never came up).

use crate::config::Config;
use crate::device::{LedDriver, LedPolarity, OutputLine};
use crate::error::{LightError, Result};
use crate::matter::clusters::on_off;
use crate::matter::device_info::NodeConfig;
use crate::matter::endpoints::{
    EndpointBinding, EndpointDescriptor, IdentifyHandler, LifecycleMonitor, OnOffLightBridge,
};
use crate::matter::stack::{
    EndpointFlags, EndpointHandle, LightingFeatureConfig, MatterStack, NodeHandle,
    OnOffLightConfig,
};
use crate::storage::ConfigStorage;
use log::{error, info, warn};
use std::sync::Arc;
use strum::Display;
use tokio::runtime::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum BootStage {
    Uninitialized,
    StorageReady,
    DriverReady,
    EndpointRegistered,
    StackStarted,
    CommissioningWindowOpen,
}

/// Everything the running light consists of once the bootstrap succeeded.
pub struct LightDevice {
    pub driver: Arc<LedDriver>,
    pub bridge: Arc<OnOffLightBridge>,
    pub identify: Arc<IdentifyHandler>,
    pub monitor: Arc<LifecycleMonitor>,
    pub node: NodeHandle,
    pub endpoint: EndpointDescriptor,
}

impl LightDevice {
    /// Leave the LED off. A running identify effect owns the line, so it is
    /// ended first.
    pub fn shutdown(&self) {
        self.identify.stop();
        self.driver.set(false);
        info!("[Light] Off for shutdown");
    }
}

pub struct Bootstrap<S, St> {
    config: Config,
    storage: St,
    stack: S,
    driver: Arc<LedDriver>,
    runtime: Handle,
    stage: BootStage,
    ran: bool,
}

impl<S: MatterStack, St: ConfigStorage> Bootstrap<S, St> {
    /// `runtime` hosts identify effects; it should be the runtime the stack
    /// delivers callbacks from.
    pub fn new(
        config: Config,
        storage: St,
        line: impl OutputLine,
        stack: S,
        runtime: Handle,
    ) -> Self {
        let polarity = LedPolarity::from_active_low(config.led.active_low);
        Self {
            config,
            storage,
            stack,
            driver: Arc::new(LedDriver::new(line, polarity)),
            runtime,
            stage: BootStage::Uninitialized,
            ran: false,
        }
    }

    /// Last stage that completed.
    pub fn stage(&self) -> BootStage {
        self.stage
    }

    pub fn driver(&self) -> &Arc<LedDriver> {
        &self.driver
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn storage(&self) -> &St {
        &self.storage
    }

    /// Run the startup sequence. Only the first call does anything.
    pub fn run(&mut self) -> Result<LightDevice> {
        if self.ran {
            return Err(LightError::BootstrapFinished(self.stage));
        }
        self.ran = true;

        info!("[Bootstrap] Starting {}", self.config.matter.device_name);
        self.advance().inspect_err(|e| {
            error!("[Bootstrap] Halted after stage {}: {}", self.stage, e);
        })
    }

    fn advance(&mut self) -> Result<LightDevice> {
        self.init_storage()?;
        self.reach(BootStage::StorageReady);

        self.driver.initialize()?;
        self.reach(BootStage::DriverReady);

        let binding = Arc::new(EndpointBinding::new());
        let bridge = Arc::new(OnOffLightBridge::new(self.driver.clone(), binding.clone()));
        let identify = Arc::new(IdentifyHandler::new(
            self.driver.clone(),
            binding.clone(),
            self.config.identify.blink_period(),
            self.runtime.clone(),
        ));

        let node_config = NodeConfig::from(&self.config.matter);
        let node = self
            .stack
            .create_node(&node_config, bridge.clone(), identify.clone())
            .ok_or(LightError::NodeCreationFailed)?;
        let handle = self
            .stack
            .create_endpoint(node, &OnOffLightConfig::default(), EndpointFlags::NONE)
            .ok_or(LightError::EndpointCreationFailed)?;
        let endpoint = EndpointDescriptor {
            id: self.stack.endpoint_id(handle),
            handle,
        };
        binding
            .bind(endpoint)
            .map_err(|existing| LightError::EndpointAlreadyBound(existing.id))?;
        info!("[Bootstrap] On/Off Light registered on endpoint {}", endpoint.id);
        self.enable_lighting(handle);
        self.reach(BootStage::EndpointRegistered);

        let monitor = Arc::new(LifecycleMonitor::new());
        self.stack.start(monitor.clone())?;
        self.reach(BootStage::StackStarted);

        self.announce();
        self.reach(BootStage::CommissioningWindowOpen);

        Ok(LightDevice {
            driver: self.driver.clone(),
            bridge,
            identify,
            monitor,
            node,
            endpoint,
        })
    }

    fn reach(&mut self, stage: BootStage) {
        self.stage = stage;
        info!("[Bootstrap] {}", stage);
    }

    fn init_storage(&mut self) -> Result<()> {
        match self.storage.init() {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable() => {
                warn!("[Bootstrap] Storage unusable ({}), erasing", e);
                self.storage.erase()?;
                self.storage.init()?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn enable_lighting(&mut self, endpoint: EndpointHandle) {
        let Some(cluster) = self.stack.get_cluster(endpoint, on_off::ID) else {
            warn!("[Bootstrap] Endpoint has no On/Off cluster, lighting feature not enabled");
            return;
        };
        if let Err(e) = self
            .stack
            .add_lighting_feature(cluster, &LightingFeatureConfig::default())
        {
            warn!("[Bootstrap] Failed to enable lighting feature: {}", e);
        }
    }

    fn announce(&self) {
        let matter = &self.config.matter;
        if self.stack.is_commissioned() {
            info!(
                "[Bootstrap] {} is already commissioned, commissioning window stays closed",
                matter.device_name
            );
            return;
        }
        info!("[Bootstrap] Commissioning window open");
        info!("[Bootstrap]   Device name:   {}", matter.device_name);
        info!("[Bootstrap]   Discriminator: {}", matter.discriminator);
        info!("[Bootstrap]   Passcode:      {}", matter.passcode);
        info!(
            "[Bootstrap]   Vendor/Product: 0x{:04X}/0x{:04X}",
            matter.vendor_id, matter.product_id
        );
    }
}
