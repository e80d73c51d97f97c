//! In-process Matter stack.
//!
//! Implements [`MatterStack`] without any transport: it keeps the node's
//! endpoints and attribute values in memory and delivers callbacks the same
//! way a real stack would (pre-update, commit, post-update). Used by the host
//! binary together with the [`console`] and by the test suite.

pub mod console;

use super::attributes::{AttributeUpdate, AttributeValue, UpdatePhase};
use super::clusters::{
    AttributeId, ClusterId, EndpointId, FEATURE_MAP_ATTRIBUTE_ID, ROOT_ENDPOINT_ID,
    basic_information, descriptor, groups, identify, on_off,
};
use super::device_info::NodeConfig;
use super::device_types::{DEV_TYPE_ROOT_NODE, DeviceType};
use super::events::LifecycleEvent;
use super::identify::IdentifyEvent;
use super::stack::{
    AttributeCallback, ClusterHandle, EndpointFlags, EndpointHandle, EventCallback,
    IdentifyCallback, LightingFeatureConfig, MatterStack, NodeHandle, OnOffLightConfig,
    StackError, StartUpOnOff,
};
use log::{debug, info, warn};
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Identify `IdentifyType` value for a light output.
const IDENTIFY_TYPE_LIGHT_OUTPUT: u8 = 0x01;

/// Failures the simulated stack should report instead of succeeding.
#[derive(Debug, Clone, Default)]
pub struct SimulatedFaults {
    /// `create_node` returns `None`.
    pub node: bool,
    /// `create_endpoint` returns `None`.
    pub endpoint: bool,
    /// `add_lighting_feature` fails.
    pub lighting_feature: bool,
    /// `start` fails with this status.
    pub start_status: Option<i32>,
}

/// On/Off cluster commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnOffCommand {
    Off,
    On,
    Toggle,
}

struct SimCluster {
    id: ClusterId,
    attributes: BTreeMap<AttributeId, AttributeValue>,
}

impl SimCluster {
    fn new(id: ClusterId) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(FEATURE_MAP_ATTRIBUTE_ID, AttributeValue::U32(0));
        Self { id, attributes }
    }

    fn with(mut self, attribute: AttributeId, value: AttributeValue) -> Self {
        self.attributes.insert(attribute, value);
        self
    }
}

struct SimEndpoint {
    id: EndpointId,
    device_type: DeviceType,
    clusters: Vec<SimCluster>,
}

impl SimEndpoint {
    fn cluster(&self, id: ClusterId) -> Option<&SimCluster> {
        self.clusters.iter().find(|c| c.id == id)
    }
}

struct SimNode {
    config: NodeConfig,
    attributes: Arc<dyn AttributeCallback>,
    identify: Arc<dyn IdentifyCallback>,
    endpoints: Vec<SimEndpoint>,
}

impl SimNode {
    fn endpoint(&self, id: EndpointId) -> Option<&SimEndpoint> {
        self.endpoints.iter().find(|e| e.id == id)
    }

    fn endpoint_mut(&mut self, id: EndpointId) -> Option<&mut SimEndpoint> {
        self.endpoints.iter_mut().find(|e| e.id == id)
    }

    fn value(
        &self,
        endpoint: EndpointId,
        cluster: ClusterId,
        attribute: AttributeId,
    ) -> Result<&AttributeValue, StackError> {
        let ep = self
            .endpoint(endpoint)
            .ok_or(StackError::UnknownEndpoint(endpoint))?;
        let cl = ep
            .cluster(cluster)
            .ok_or(StackError::UnknownCluster { endpoint, cluster })?;
        cl.attributes
            .get(&attribute)
            .ok_or(StackError::UnknownAttribute {
                endpoint,
                cluster,
                attribute,
            })
    }
}

#[derive(Default)]
struct SimState {
    faults: SimulatedFaults,
    node: Option<SimNode>,
    events: Option<Arc<dyn EventCallback>>,
    commissioned: bool,
    next_endpoint: EndpointId,
}

/// Cloneable handle to one simulated stack instance.
#[derive(Clone, Default)]
pub struct SimulatedStack {
    state: Arc<Mutex<SimState>>,
    // Serializes attribute writes from pre-update through post-update.
    // Reentrant so a callback may write from the same thread.
    writes: Arc<ReentrantMutex<()>>,
}

// Cluster handles pack the endpoint id in the upper half and the cluster's
// slot on that endpoint in the lower half.
fn cluster_handle(endpoint: EndpointId, slot: usize) -> ClusterHandle {
    ClusterHandle::new((u32::from(endpoint) << 16) | (slot as u32 & 0xFFFF))
}

fn basic_information_cluster(config: &NodeConfig) -> SimCluster {
    use basic_information::attributes::*;

    SimCluster::new(basic_information::ID)
        .with(VENDOR_NAME, AttributeValue::Str(config.vendor_name.to_string()))
        .with(VENDOR_ID, AttributeValue::U16(config.vendor_id))
        .with(PRODUCT_NAME, AttributeValue::Str(config.product_name.to_string()))
        .with(PRODUCT_ID, AttributeValue::U16(config.product_id))
        .with(NODE_LABEL, AttributeValue::Str(config.device_name.clone()))
        .with(HARDWARE_VERSION, AttributeValue::U16(config.hw_ver))
        .with(
            SOFTWARE_VERSION_STRING,
            AttributeValue::Str(config.sw_ver_str.to_string()),
        )
}

fn split_cluster_handle(handle: ClusterHandle) -> (EndpointId, usize) {
    let raw = handle.raw();
    ((raw >> 16) as EndpointId, (raw & 0xFFFF) as usize)
}

impl SimulatedStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: SimulatedFaults) -> Self {
        let stack = Self::new();
        stack.state.lock().faults = faults;
        stack
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().events.is_some()
    }

    /// Ids of all endpoints on the node, root included.
    pub fn endpoint_ids(&self) -> Vec<EndpointId> {
        self.state
            .lock()
            .node
            .as_ref()
            .map(|node| node.endpoints.iter().map(|e| e.id).collect())
            .unwrap_or_default()
    }

    pub fn device_type(&self, endpoint: EndpointId) -> Option<DeviceType> {
        let state = self.state.lock();
        state.node.as_ref()?.endpoint(endpoint).map(|e| e.device_type)
    }

    pub fn read_attribute(
        &self,
        endpoint: EndpointId,
        cluster: ClusterId,
        attribute: AttributeId,
    ) -> Option<AttributeValue> {
        let state = self.state.lock();
        state
            .node
            .as_ref()?
            .value(endpoint, cluster, attribute)
            .ok()
            .cloned()
    }

    /// Write an attribute the way a controller would.
    ///
    /// The pre-update callback may reject the write, in which case nothing is
    /// committed and no post-update is delivered.
    pub fn write_attribute(
        &self,
        endpoint: EndpointId,
        cluster: ClusterId,
        attribute: AttributeId,
        value: AttributeValue,
    ) -> Result<(), StackError> {
        let _write = self.writes.lock();
        let callback = {
            let state = self.state.lock();
            if state.events.is_none() {
                return Err(StackError::NotStarted);
            }
            let node = state.node.as_ref().ok_or(StackError::NoNode)?;
            node.value(endpoint, cluster, attribute)?;
            node.attributes.clone()
        };

        // Callbacks run without the state lock held so they may call back in.
        let mut update =
            AttributeUpdate::new(UpdatePhase::PreUpdate, endpoint, cluster, attribute, value);
        if let Err(e) = callback.on_attribute_update(&update) {
            warn!(
                "[SimStack] Write to {}/{:#06x}/{:#06x} aborted: {}",
                endpoint, cluster, attribute, e
            );
            return Err(e.into());
        }

        {
            let mut state = self.state.lock();
            let slot = state
                .node
                .as_mut()
                .and_then(|node| node.endpoint_mut(endpoint))
                .and_then(|ep| ep.clusters.iter_mut().find(|c| c.id == cluster))
                .and_then(|cl| cl.attributes.get_mut(&attribute))
                .ok_or(StackError::UnknownAttribute {
                    endpoint,
                    cluster,
                    attribute,
                })?;
            *slot = update.value.clone();
        }
        debug!(
            "[SimStack] Committed {}/{:#06x}/{:#06x} = {}",
            endpoint, cluster, attribute, update.value
        );

        update.phase = UpdatePhase::PostUpdate;
        if let Err(e) = callback.on_attribute_update(&update) {
            warn!("[SimStack] Post-update callback failed: {}", e);
        }
        Ok(())
    }

    /// Invoke an On/Off cluster command on `endpoint`.
    pub fn send_on_off_command(
        &self,
        endpoint: EndpointId,
        command: OnOffCommand,
    ) -> Result<(), StackError> {
        // Toggle reads and writes under one write lock.
        let _write = self.writes.lock();
        let on = match command {
            OnOffCommand::Off => false,
            OnOffCommand::On => true,
            OnOffCommand::Toggle => {
                let attribute = on_off::attributes::ON_OFF;
                let value = {
                    let state = self.state.lock();
                    let node = state.node.as_ref().ok_or(StackError::NoNode)?;
                    node.value(endpoint, on_off::ID, attribute)?.clone()
                };
                let current = value.as_bool().ok_or(StackError::TypeMismatch {
                    endpoint,
                    cluster: on_off::ID,
                    attribute,
                    found: value.type_name(),
                })?;
                !current
            }
        };
        info!("[SimStack] OnOff {:?} on endpoint {}", command, endpoint);
        self.write_attribute(
            endpoint,
            on_off::ID,
            on_off::attributes::ON_OFF,
            AttributeValue::Bool(on),
        )
    }

    /// Deliver an identify notification to the node's identify callback.
    pub fn identify(&self, event: IdentifyEvent) -> Result<(), StackError> {
        let callback = {
            let state = self.state.lock();
            let node = state.node.as_ref().ok_or(StackError::NoNode)?;
            let ep = node
                .endpoint(event.endpoint)
                .ok_or(StackError::UnknownEndpoint(event.endpoint))?;
            if ep.cluster(identify::ID).is_none() {
                return Err(StackError::UnknownCluster {
                    endpoint: event.endpoint,
                    cluster: identify::ID,
                });
            }
            node.identify.clone()
        };
        callback.on_identify(&event)?;
        Ok(())
    }

    /// Deliver a lifecycle event to the sink registered at start.
    pub fn post_event(&self, event: LifecycleEvent) -> Result<(), StackError> {
        let sink = {
            let mut state = self.state.lock();
            let Some(sink) = state.events.clone() else {
                warn!("[SimStack] Dropping {:?}, stack not started", event);
                return Err(StackError::NotStarted);
            };
            if let LifecycleEvent::CommissioningComplete { .. } = event {
                state.commissioned = true;
            }
            sink
        };
        sink.on_event(&event);
        Ok(())
    }

    /// Run through the event sequence of a successful commissioning.
    pub fn simulate_commissioning(&self, node_id: u64, fabric_index: u8) -> Result<(), StackError> {
        for event in [
            LifecycleEvent::CommissioningSessionStarted,
            LifecycleEvent::CommissioningComplete {
                node_id,
                fabric_index,
            },
            LifecycleEvent::CommissioningSessionStopped,
            LifecycleEvent::CommissioningWindowClosed,
        ] {
            self.post_event(event)?;
        }
        Ok(())
    }
}

impl MatterStack for SimulatedStack {
    fn create_node(
        &mut self,
        config: &NodeConfig,
        attributes: Arc<dyn AttributeCallback>,
        identify: Arc<dyn IdentifyCallback>,
    ) -> Option<NodeHandle> {
        let mut state = self.state.lock();
        if state.faults.node {
            warn!("[SimStack] Node creation failed (injected)");
            return None;
        }
        if state.node.is_some() {
            warn!("[SimStack] Node already exists");
            return None;
        }

        let root = SimEndpoint {
            id: ROOT_ENDPOINT_ID,
            device_type: DEV_TYPE_ROOT_NODE,
            clusters: vec![
                SimCluster::new(descriptor::ID),
                basic_information_cluster(config),
            ],
        };
        info!(
            "[SimStack] Node created: {} ({} {}, VID 0x{:04X}, PID 0x{:04X}, hw {}, sw {})",
            config.device_name,
            config.vendor_name,
            config.product_name,
            config.vendor_id,
            config.product_id,
            config.hw_ver,
            config.sw_ver_str
        );
        state.node = Some(SimNode {
            config: config.clone(),
            attributes,
            identify,
            endpoints: vec![root],
        });
        state.next_endpoint = ROOT_ENDPOINT_ID + 1;
        Some(NodeHandle::new(1))
    }

    fn create_endpoint(
        &mut self,
        node: NodeHandle,
        config: &OnOffLightConfig,
        flags: EndpointFlags,
    ) -> Option<EndpointHandle> {
        let mut state = self.state.lock();
        if state.faults.endpoint {
            warn!("[SimStack] Endpoint creation failed (injected)");
            return None;
        }
        if node != NodeHandle::new(1) {
            warn!("[SimStack] Unknown node {:?}", node);
            return None;
        }
        if flags.contains(EndpointFlags::DESTROYABLE) {
            warn!("[SimStack] Dynamic endpoints are not supported");
            return None;
        }

        let id = state.next_endpoint;
        let sim_node = state.node.as_mut()?;

        let mut on_off_cluster = SimCluster::new(on_off::ID)
            .with(on_off::attributes::ON_OFF, AttributeValue::Bool(config.on_off));
        let start_up = match config.start_up_on_off {
            None => AttributeValue::Null,
            Some(StartUpOnOff::Off) => AttributeValue::U8(0),
            Some(StartUpOnOff::On) => AttributeValue::U8(1),
            Some(StartUpOnOff::Toggle) => AttributeValue::U8(2),
        };
        on_off_cluster = on_off_cluster.with(on_off::attributes::START_UP_ON_OFF, start_up);

        sim_node.endpoints.push(SimEndpoint {
            id,
            device_type: OnOffLightConfig::DEVICE_TYPE,
            clusters: vec![
                SimCluster::new(descriptor::ID),
                SimCluster::new(identify::ID)
                    .with(
                        identify::attributes::IDENTIFY_TIME,
                        AttributeValue::U16(config.identify_time),
                    )
                    .with(
                        identify::attributes::IDENTIFY_TYPE,
                        AttributeValue::U8(IDENTIFY_TYPE_LIGHT_OUTPUT),
                    ),
                SimCluster::new(groups::ID),
                on_off_cluster,
            ],
        });
        state.next_endpoint = id + 1;
        info!(
            "[SimStack] Endpoint {} created (On/Off Light, flags {:?})",
            id, flags
        );
        Some(EndpointHandle::new(u32::from(id)))
    }

    fn endpoint_id(&self, endpoint: EndpointHandle) -> EndpointId {
        EndpointId::try_from(endpoint.raw()).unwrap_or(EndpointId::MAX)
    }

    fn get_cluster(&self, endpoint: EndpointHandle, cluster: ClusterId) -> Option<ClusterHandle> {
        let id = self.endpoint_id(endpoint);
        let state = self.state.lock();
        let slot = state
            .node
            .as_ref()?
            .endpoint(id)?
            .clusters
            .iter()
            .position(|c| c.id == cluster)?;
        Some(cluster_handle(id, slot))
    }

    fn add_lighting_feature(
        &mut self,
        cluster: ClusterHandle,
        config: &LightingFeatureConfig,
    ) -> Result<(), StackError> {
        let (endpoint, slot) = split_cluster_handle(cluster);
        let mut state = self.state.lock();
        if state.faults.lighting_feature {
            return Err(StackError::Status(-1));
        }
        let node = state.node.as_mut().ok_or(StackError::NoNode)?;
        let ep = node
            .endpoint_mut(endpoint)
            .ok_or(StackError::UnknownEndpoint(endpoint))?;
        let cl = ep
            .clusters
            .get_mut(slot)
            .filter(|c| c.id == on_off::ID)
            .ok_or(StackError::UnknownCluster {
                endpoint,
                cluster: on_off::ID,
            })?;

        let features = match cl.attributes.get(&FEATURE_MAP_ATTRIBUTE_ID) {
            Some(AttributeValue::U32(bits)) => *bits,
            _ => 0,
        };
        cl.attributes.insert(
            FEATURE_MAP_ATTRIBUTE_ID,
            AttributeValue::U32(features | on_off::features::LIGHTING),
        );
        cl.attributes.insert(
            on_off::attributes::GLOBAL_SCENE_CONTROL,
            AttributeValue::Bool(config.global_scene_control),
        );
        cl.attributes.insert(
            on_off::attributes::ON_TIME,
            AttributeValue::U16(config.on_time),
        );
        cl.attributes.insert(
            on_off::attributes::OFF_WAIT_TIME,
            AttributeValue::U16(config.off_wait_time),
        );
        debug!("[SimStack] Lighting feature enabled on endpoint {}", endpoint);
        Ok(())
    }

    fn start(&mut self, events: Arc<dyn EventCallback>) -> Result<(), StackError> {
        let open_window = {
            let mut state = self.state.lock();
            if let Some(status) = state.faults.start_status {
                return Err(StackError::Status(status));
            }
            if state.events.is_some() {
                return Err(StackError::AlreadyStarted);
            }
            let node = state.node.as_ref().ok_or(StackError::NoNode)?;
            info!(
                "[SimStack] Started, {} endpoint(s), discriminator {}",
                node.endpoints.len(),
                node.config.discriminator
            );
            state.events = Some(events.clone());
            !state.commissioned
        };

        if open_window {
            events.on_event(&LifecycleEvent::CommissioningWindowOpened);
        }
        Ok(())
    }

    fn is_commissioned(&self) -> bool {
        self.state.lock().commissioned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matter::device_types::DEV_TYPE_ON_OFF_LIGHT;
    use crate::matter::events::LifecycleEventKind;
    use crate::matter::stack::{CallbackError, CallbackResult};

    #[derive(Default)]
    struct Recorder {
        updates: Mutex<Vec<AttributeUpdate>>,
        identifies: Mutex<Vec<IdentifyEvent>>,
        events: Mutex<Vec<LifecycleEventKind>>,
        reject_pre: bool,
    }

    impl AttributeCallback for Recorder {
        fn on_attribute_update(&self, update: &AttributeUpdate) -> CallbackResult {
            self.updates.lock().push(update.clone());
            if self.reject_pre && update.phase == UpdatePhase::PreUpdate {
                return Err(CallbackError::Rejected("read-only".into()));
            }
            Ok(())
        }
    }

    impl IdentifyCallback for Recorder {
        fn on_identify(&self, event: &IdentifyEvent) -> CallbackResult {
            self.identifies.lock().push(*event);
            Ok(())
        }
    }

    impl EventCallback for Recorder {
        fn on_event(&self, event: &LifecycleEvent) {
            self.events.lock().push(event.kind());
        }
    }

    fn node_config() -> NodeConfig {
        NodeConfig::from(&crate::config::Config::default().matter)
    }

    fn started(recorder: Arc<Recorder>) -> (SimulatedStack, EndpointId) {
        let mut stack = SimulatedStack::new();
        let node = stack
            .create_node(&node_config(), recorder.clone(), recorder.clone())
            .unwrap();
        let ep = stack
            .create_endpoint(node, &OnOffLightConfig::default(), EndpointFlags::NONE)
            .unwrap();
        stack.start(recorder).unwrap();
        (stack.clone(), stack.endpoint_id(ep))
    }

    #[test]
    fn test_endpoint_layout() {
        let (stack, light) = started(Arc::new(Recorder::default()));
        assert_eq!(light, 1);
        assert_eq!(stack.endpoint_ids(), vec![0, 1]);
        assert_eq!(stack.device_type(0), Some(DEV_TYPE_ROOT_NODE));
        assert_eq!(stack.device_type(1), Some(DEV_TYPE_ON_OFF_LIGHT));
        assert_eq!(
            stack.read_attribute(light, on_off::ID, on_off::attributes::ON_OFF),
            Some(AttributeValue::Bool(false))
        );
        assert_eq!(
            stack.read_attribute(light, on_off::ID, on_off::attributes::START_UP_ON_OFF),
            Some(AttributeValue::Null)
        );
        assert!(
            stack
                .read_attribute(light, groups::ID, FEATURE_MAP_ATTRIBUTE_ID)
                .is_some()
        );
    }

    #[test]
    fn test_write_delivers_pre_then_post() {
        let recorder = Arc::new(Recorder::default());
        let (stack, light) = started(recorder.clone());

        stack.send_on_off_command(light, OnOffCommand::On).unwrap();
        let updates = recorder.updates.lock().clone();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].phase, UpdatePhase::PreUpdate);
        assert_eq!(updates[1].phase, UpdatePhase::PostUpdate);
        assert_eq!(updates[1].value, AttributeValue::Bool(true));

        stack.send_on_off_command(light, OnOffCommand::Toggle).unwrap();
        assert_eq!(
            stack.read_attribute(light, on_off::ID, on_off::attributes::ON_OFF),
            Some(AttributeValue::Bool(false))
        );
    }

    #[test]
    fn test_rejected_pre_update_aborts_write() {
        let recorder = Arc::new(Recorder {
            reject_pre: true,
            ..Default::default()
        });
        let (stack, light) = started(recorder.clone());

        let result = stack.send_on_off_command(light, OnOffCommand::On);
        assert!(matches!(result, Err(StackError::Callback(_))));
        assert_eq!(recorder.updates.lock().len(), 1);
        assert_eq!(
            stack.read_attribute(light, on_off::ID, on_off::attributes::ON_OFF),
            Some(AttributeValue::Bool(false))
        );
    }

    #[test]
    fn test_unknown_attribute_write_is_refused() {
        let recorder = Arc::new(Recorder::default());
        let (stack, light) = started(recorder.clone());

        let result = stack.write_attribute(light, on_off::ID, 0x7777, AttributeValue::U8(1));
        assert!(matches!(result, Err(StackError::UnknownAttribute { .. })));
        let result = stack.write_attribute(9, on_off::ID, 0, AttributeValue::Bool(true));
        assert!(matches!(result, Err(StackError::UnknownEndpoint(9))));
        assert!(recorder.updates.lock().is_empty());
    }

    #[test]
    fn test_lighting_feature() {
        let mut stack = SimulatedStack::new();
        let recorder = Arc::new(Recorder::default());
        let node = stack
            .create_node(&node_config(), recorder.clone(), recorder)
            .unwrap();
        let ep = stack
            .create_endpoint(node, &OnOffLightConfig::default(), EndpointFlags::NONE)
            .unwrap();

        let cluster = stack.get_cluster(ep, on_off::ID).unwrap();
        stack
            .add_lighting_feature(cluster, &LightingFeatureConfig::default())
            .unwrap();
        assert_eq!(
            stack.read_attribute(1, on_off::ID, FEATURE_MAP_ATTRIBUTE_ID),
            Some(AttributeValue::U32(on_off::features::LIGHTING))
        );
        assert_eq!(
            stack.read_attribute(1, on_off::ID, on_off::attributes::GLOBAL_SCENE_CONTROL),
            Some(AttributeValue::Bool(true))
        );

        // Only the On/Off cluster carries the lighting feature.
        let groups = stack.get_cluster(ep, groups::ID).unwrap();
        assert!(
            stack
                .add_lighting_feature(groups, &LightingFeatureConfig::default())
                .is_err()
        );
        assert_eq!(stack.get_cluster(ep, 0x0300), None);
    }

    #[test]
    fn test_start_opens_commissioning_window() {
        let recorder = Arc::new(Recorder::default());
        let (stack, _) = started(recorder.clone());
        assert_eq!(
            *recorder.events.lock(),
            vec![LifecycleEventKind::CommissioningWindowOpened]
        );
        assert!(!stack.is_commissioned());

        stack.simulate_commissioning(0x42, 1).unwrap();
        assert!(stack.is_commissioned());
        assert_eq!(recorder.events.lock().len(), 5);
    }

    #[test]
    fn test_faults() {
        let recorder = Arc::new(Recorder::default());

        let mut stack = SimulatedStack::with_faults(SimulatedFaults {
            node: true,
            ..Default::default()
        });
        assert!(
            stack
                .create_node(&node_config(), recorder.clone(), recorder.clone())
                .is_none()
        );

        let mut stack = SimulatedStack::with_faults(SimulatedFaults {
            start_status: Some(-3),
            ..Default::default()
        });
        stack
            .create_node(&node_config(), recorder.clone(), recorder.clone())
            .unwrap();
        assert!(matches!(
            stack.start(recorder.clone()),
            Err(StackError::Status(-3))
        ));
        assert!(!stack.is_started());
    }

    #[test]
    fn test_events_before_start_are_dropped() {
        let stack = SimulatedStack::new();
        assert!(matches!(
            stack.post_event(LifecycleEvent::CommissioningSessionStarted),
            Err(StackError::NotStarted)
        ));
    }

    /// Applies post-updates with a delay when turning on, like a slow driver.
    #[derive(Default)]
    struct SlowApply {
        applied: Mutex<Option<bool>>,
    }

    impl AttributeCallback for SlowApply {
        fn on_attribute_update(&self, update: &AttributeUpdate) -> CallbackResult {
            if update.phase == UpdatePhase::PostUpdate {
                let on = update.value.as_bool();
                if on == Some(true) {
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
                *self.applied.lock() = on;
            }
            Ok(())
        }
    }

    #[test]
    fn test_concurrent_writes_apply_in_commit_order() {
        let slow = Arc::new(SlowApply::default());
        let recorder = Arc::new(Recorder::default());
        let mut stack = SimulatedStack::new();
        let node = stack
            .create_node(&node_config(), slow.clone(), recorder.clone())
            .unwrap();
        let ep = stack
            .create_endpoint(node, &OnOffLightConfig::default(), EndpointFlags::NONE)
            .unwrap();
        stack.start(recorder).unwrap();
        let light = stack.endpoint_id(ep);

        let on = {
            let stack = stack.clone();
            std::thread::spawn(move || stack.send_on_off_command(light, OnOffCommand::On))
        };
        std::thread::sleep(std::time::Duration::from_millis(20));
        let off = {
            let stack = stack.clone();
            std::thread::spawn(move || stack.send_on_off_command(light, OnOffCommand::Off))
        };
        on.join().unwrap().unwrap();
        off.join().unwrap().unwrap();

        let committed = stack
            .read_attribute(light, on_off::ID, on_off::attributes::ON_OFF)
            .and_then(|v| v.as_bool());
        assert_eq!(*slow.applied.lock(), committed);
    }

    #[test]
    fn test_toggle_on_non_boolean_value_is_type_mismatch() {
        let recorder = Arc::new(Recorder::default());
        let (stack, light) = started(recorder.clone());

        stack
            .write_attribute(light, on_off::ID, on_off::attributes::ON_OFF, AttributeValue::U8(0))
            .unwrap();
        let result = stack.send_on_off_command(light, OnOffCommand::Toggle);
        assert!(matches!(
            result,
            Err(StackError::TypeMismatch {
                cluster: on_off::ID,
                found: "u8",
                ..
            })
        ));
        // Only the raw write reached the callback.
        assert_eq!(recorder.updates.lock().len(), 2);
    }

    #[test]
    fn test_node_carries_basic_information() {
        use basic_information::attributes::*;

        let (stack, _) = started(Arc::new(Recorder::default()));
        let config = node_config();
        let read = |attribute| stack.read_attribute(ROOT_ENDPOINT_ID, basic_information::ID, attribute);
        assert_eq!(
            read(VENDOR_NAME),
            Some(AttributeValue::Str(config.vendor_name.to_string()))
        );
        assert_eq!(
            read(PRODUCT_NAME),
            Some(AttributeValue::Str(config.product_name.to_string()))
        );
        assert_eq!(read(VENDOR_ID), Some(AttributeValue::U16(config.vendor_id)));
        assert_eq!(read(HARDWARE_VERSION), Some(AttributeValue::U16(config.hw_ver)));
        assert_eq!(
            read(SOFTWARE_VERSION_STRING),
            Some(AttributeValue::Str(config.sw_ver_str.to_string()))
        );
        assert_eq!(
            read(NODE_LABEL),
            Some(AttributeValue::Str(config.device_name.clone()))
        );
    }

    #[test]
    fn test_destroyable_endpoint_is_refused() {
        let mut stack = SimulatedStack::new();
        let recorder = Arc::new(Recorder::default());
        let node = stack
            .create_node(&node_config(), recorder.clone(), recorder)
            .unwrap();
        assert!(
            stack
                .create_endpoint(node, &OnOffLightConfig::default(), EndpointFlags::DESTROYABLE)
                .is_none()
        );
        assert_eq!(stack.endpoint_ids(), vec![ROOT_ENDPOINT_ID]);
    }

    #[test]
    fn test_identify_is_routed_to_callback() {
        let recorder = Arc::new(Recorder::default());
        let (stack, light) = started(recorder.clone());

        stack.identify(IdentifyEvent::start(light)).unwrap();
        stack.identify(IdentifyEvent::stop(light)).unwrap();
        assert_eq!(recorder.identifies.lock().len(), 2);

        // The root endpoint has no Identify cluster.
        assert!(stack.identify(IdentifyEvent::start(0)).is_err());
    }
}
