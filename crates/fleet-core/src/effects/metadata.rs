//! Instance metadata queries.

use crate::errors::MetadataError;
use crate::identity::{Credentials, NodeIdentity};
use async_trait::async_trait;

/// Read-only access to the local metadata facility.
///
/// Implementations make one network round trip per call and never retry.
#[async_trait]
pub trait MetadataEffects: Send + Sync {
    /// Identity of the machine the agent currently runs on
    async fn current_identity(&self) -> Result<NodeIdentity, MetadataError>;

    /// Short-lived credentials attached to the machine's role
    async fn credentials(&self) -> Result<Credentials, MetadataError>;
}
