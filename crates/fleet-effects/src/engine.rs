//! Workload engine with a fixed capability set.

use async_trait::async_trait;
use fleet_core::effects::WorkloadEngine;
use fleet_core::{Capability, ReadyNode};
use parking_lot::Mutex;

/// Engine stand-in that advertises configured capabilities and records the
/// node it was handed.
#[derive(Debug, Default)]
pub struct StaticWorkloadEngine {
    capabilities: Vec<Capability>,
    ready: Mutex<Option<ReadyNode>>,
}

impl StaticWorkloadEngine {
    pub fn new(capabilities: Vec<Capability>) -> Self {
        Self {
            capabilities,
            ready: Mutex::new(None),
        }
    }

    /// The node handed over by the last successful bootstrap, if any
    pub fn ready_node(&self) -> Option<ReadyNode> {
        self.ready.lock().clone()
    }
}

#[async_trait]
impl WorkloadEngine for StaticWorkloadEngine {
    async fn capabilities(&self) -> Vec<Capability> {
        self.capabilities.clone()
    }

    async fn start(&self, node: ReadyNode) {
        tracing::info!(
            instance_id = %node.hardware_instance_id,
            registration = %node.registration_identity,
            cluster = %node.cluster,
            "workload engine taking over node"
        );
        *self.ready.lock() = Some(node);
    }
}
