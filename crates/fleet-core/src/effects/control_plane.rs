//! Control-plane registration.

use crate::errors::ControlPlaneError;
use crate::identity::{Credentials, RegistrationIdentity, RegistrationRequest};
use async_trait::async_trait;

/// The control-plane operation that registers or re-registers a node.
#[async_trait]
pub trait ControlPlaneEffects: Send + Sync {
    /// Register `request.prior_identity` (or a new node when it is the
    /// unregistered sentinel) and return the authoritative identity.
    async fn register_node(
        &self,
        request: &RegistrationRequest,
        credentials: &Credentials,
    ) -> Result<RegistrationIdentity, ControlPlaneError>;
}
