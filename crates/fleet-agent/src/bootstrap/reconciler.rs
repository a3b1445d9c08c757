//! State reconciliation.
//!
//! Loads the checkpoint written by a previous boot and decides which parts of
//! it still hold for the machine the agent is running on now. A checkpoint
//! from different hardware loses its registration identity; a checkpoint from
//! a different cluster stops the boot.

use crate::runtime::cancellable;
use fleet_core::effects::{CancellationToken, CheckpointFactory, CheckpointStore, MetadataEffects};
use fleet_core::{
    BootstrapError, BootstrapStep, CheckpointError, CheckpointLayout, CheckpointSlot, ClusterName,
    NodeIdentity, PersistedState, RegistrationIdentity,
};
use fleet_effects::NoopCheckpointStore;
use std::fmt;
use std::sync::Arc;

/// What survives reconciliation and feeds registration.
#[derive(Clone)]
pub struct Reconciliation {
    /// Cluster the node will register into
    pub cluster: ClusterName,
    /// Identity to re-register, or unregistered for a fresh registration
    pub prior_identity: RegistrationIdentity,
    pub node: NodeIdentity,
    pub store: Arc<dyn CheckpointStore>,
}

impl fmt::Debug for Reconciliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciliation")
            .field("cluster", &self.cluster)
            .field("prior_identity", &self.prior_identity)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

/// Slot layout bound by every checkpointing boot.
pub fn standard_layout() -> Result<CheckpointLayout, CheckpointError> {
    let mut layout = CheckpointLayout::new();
    for slot in CheckpointSlot::ALL {
        layout.register(slot)?;
    }
    Ok(layout)
}

/// Keep the persisted registration identity only if it was recorded on this
/// hardware, or if no hardware was recorded at all.
pub fn resolve_prior_identity(
    persisted: &PersistedState,
    current_instance_id: &str,
) -> RegistrationIdentity {
    let recorded = persisted.hardware_instance_id.as_str();
    if recorded.is_empty() || recorded == current_instance_id {
        return persisted.registration_identity.clone();
    }

    tracing::warn!(
        persisted_instance_id = %recorded,
        current_instance_id = %current_instance_id,
        "checkpoint was written on different hardware; discarding registration identity"
    );
    RegistrationIdentity::unregistered()
}

/// Decide the effective cluster from configuration and checkpoint.
pub fn resolve_cluster(
    configured: &ClusterName,
    persisted: &ClusterName,
) -> Result<ClusterName, BootstrapError> {
    if configured.is_unset() {
        if !persisted.is_unset() {
            tracing::info!(cluster = %persisted, "adopting checkpointed cluster");
        }
        return Ok(persisted.clone());
    }
    if !persisted.is_unset() && configured != persisted {
        return Err(BootstrapError::cluster_mismatch(
            configured.clone(),
            persisted.clone(),
        ));
    }
    Ok(configured.clone())
}

/// Hardware instance id of this node, or an empty string if the metadata
/// service cannot say.
pub async fn best_effort_instance_id(metadata: &dyn MetadataEffects) -> String {
    match metadata.current_identity().await {
        Ok(identity) => identity.hardware_instance_id,
        Err(e) => {
            tracing::warn!(error = %e, "unable to determine hardware instance id");
            String::new()
        }
    }
}

/// Runs the reconciliation phase of a bootstrap pass
pub struct StateReconciler {
    checkpoints: Arc<dyn CheckpointFactory>,
    metadata: Arc<dyn MetadataEffects>,
    cancellation: Arc<dyn CancellationToken>,
}

impl StateReconciler {
    pub fn new(
        checkpoints: Arc<dyn CheckpointFactory>,
        metadata: Arc<dyn MetadataEffects>,
        cancellation: Arc<dyn CancellationToken>,
    ) -> Self {
        Self {
            checkpoints,
            metadata,
            cancellation,
        }
    }

    /// Load prior state, fetch the current identity and reconcile the two.
    pub async fn reconcile(
        &self,
        checkpoint_enabled: bool,
        configured_cluster: &ClusterName,
    ) -> Result<Reconciliation, BootstrapError> {
        let token = self.cancellation.as_ref();

        let (store, persisted) = if checkpoint_enabled {
            let layout = standard_layout().map_err(BootstrapError::CheckpointSetup)?;
            let store = cancellable(token, BootstrapStep::CheckpointOpen, async {
                self.checkpoints
                    .open(&layout)
                    .await
                    .map_err(BootstrapError::CheckpointSetup)
            })
            .await?;
            let persisted = cancellable(token, BootstrapStep::CheckpointLoad, async {
                store.load().await.map_err(BootstrapError::CheckpointLoad)
            })
            .await?;
            tracing::debug!(
                registration = %persisted.registration_identity,
                cluster = %persisted.cluster,
                instance_id = %persisted.hardware_instance_id,
                "loaded checkpoint"
            );
            (store, persisted)
        } else {
            tracing::debug!("checkpointing disabled; starting from empty state");
            let store: Arc<dyn CheckpointStore> = Arc::new(NoopCheckpointStore);
            (store, PersistedState::default())
        };

        let node = cancellable(token, BootstrapStep::MetadataFetch, async {
            self.metadata
                .current_identity()
                .await
                .map_err(BootstrapError::from)
        })
        .await?;

        let prior_identity = resolve_prior_identity(&persisted, &node.hardware_instance_id);
        let cluster = resolve_cluster(configured_cluster, &persisted.cluster)?;

        Ok(Reconciliation {
            cluster,
            prior_identity,
            node,
            store,
        })
    }
}
