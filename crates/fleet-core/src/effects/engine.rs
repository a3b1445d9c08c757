//! Workload engine contract.

use crate::identity::{Capability, ReadyNode};
use async_trait::async_trait;

/// The engine that runs workloads once the node is registered.
#[async_trait]
pub trait WorkloadEngine: Send + Sync {
    /// Capabilities to advertise at registration, in engine order
    async fn capabilities(&self) -> Vec<Capability>;

    /// Take ownership of a node that reached `Ready`
    async fn start(&self, node: ReadyNode);
}
