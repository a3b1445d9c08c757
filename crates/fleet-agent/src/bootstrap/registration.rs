//! Registration with the control plane.

use crate::runtime::cancellable;
use fleet_core::effects::{
    CancellationToken, CheckpointStore, ControlPlaneEffects, CredentialEffects, WorkloadEngine,
};
use fleet_core::{
    BootstrapError, BootstrapStep, ClusterName, ControlPlaneError, PersistedState,
    RegistrationIdentity, RegistrationRequest,
};
use std::sync::Arc;

/// Reconciled state a registration call runs against.
pub struct RegistrationContext<'a> {
    pub cluster: &'a ClusterName,
    pub hardware_instance_id: &'a str,
    pub store: &'a dyn CheckpointStore,
}

/// How a successful registration ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// First registration of this node; `checkpointed` is false if the save failed
    Registered { checkpointed: bool },
    /// An existing identity was confirmed
    Reregistered,
}

/// Wraps control-plane registration and the first-registration checkpoint.
pub struct RegistrationClient {
    credentials: Arc<dyn CredentialEffects>,
    control_plane: Arc<dyn ControlPlaneEffects>,
    engine: Arc<dyn WorkloadEngine>,
    cancellation: Arc<dyn CancellationToken>,
}

/// A parameter rejection is terminal only for a first registration. With a
/// prior identity it usually means the identity went stale, which a restart
/// can recover from.
fn rejection_for(request: &RegistrationRequest, err: ControlPlaneError) -> BootstrapError {
    match err {
        ControlPlaneError::InvalidParameter(message) if request.prior_identity.is_registered() => {
            tracing::warn!(
                prior = %request.prior_identity,
                %message,
                "re-registration rejected with invalid parameter"
            );
            ControlPlaneError::other(format!("invalid parameter on re-registration: {message}"))
                .into()
        }
        other => other.into(),
    }
}

impl RegistrationClient {
    pub fn new(
        credentials: Arc<dyn CredentialEffects>,
        control_plane: Arc<dyn ControlPlaneEffects>,
        engine: Arc<dyn WorkloadEngine>,
        cancellation: Arc<dyn CancellationToken>,
    ) -> Self {
        Self {
            credentials,
            control_plane,
            engine,
            cancellation,
        }
    }

    /// Register with `live` as the prior identity.
    ///
    /// `live` is replaced only when the control plane accepts the request. The
    /// checkpoint is written only if `live` was unregistered on entry.
    pub async fn register(
        &self,
        live: &mut RegistrationIdentity,
        context: &RegistrationContext<'_>,
    ) -> Result<RegistrationOutcome, BootstrapError> {
        let token = self.cancellation.as_ref();

        let credentials = cancellable(token, BootstrapStep::CredentialRetrieval, async {
            self.credentials
                .credentials()
                .await
                .map_err(BootstrapError::from)
        })
        .await?;

        let capabilities = cancellable(token, BootstrapStep::CapabilityDiscovery, async {
            Ok(self.engine.capabilities().await)
        })
        .await?;

        let request = RegistrationRequest {
            cluster: context.cluster.clone(),
            prior_identity: live.clone(),
            capabilities,
        };
        tracing::info!(
            cluster = %request.cluster,
            prior = %request.prior_identity,
            capabilities = request.capabilities.len(),
            "registering with control plane"
        );

        let identity = cancellable(token, BootstrapStep::Registration, async {
            self.control_plane
                .register_node(&request, &credentials)
                .await
                .map_err(|e| rejection_for(&request, e))
        })
        .await?;

        *live = identity;
        tracing::info!(registration = %live, "registration accepted");

        if request.prior_identity.is_registered() {
            return Ok(RegistrationOutcome::Reregistered);
        }

        let state = PersistedState::new(
            live.clone(),
            context.cluster.clone(),
            context.hardware_instance_id,
        );
        let checkpointed = match context.store.save(&state).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "failed to checkpoint new registration");
                false
            }
        };
        Ok(RegistrationOutcome::Registered { checkpointed })
    }
}
