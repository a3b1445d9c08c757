//! Bootstrap assembly.

use super::{AgentConfig, AgentError, AgentResult};
use crate::bootstrap::{BootstrapOrchestrator, RegistrationClient, StateReconciler};
use fleet_core::effects::{
    CancellationToken, CheckpointFactory, ControlPlaneEffects, CredentialEffects, MetadataEffects,
    NeverCancel, WorkloadEngine,
};
use fleet_core::ClusterName;
use fleet_effects::{
    CredentialChain, FilesystemCheckpointFactory, HttpControlPlaneClient, MetadataClient,
    StaticWorkloadEngine,
};
use std::sync::Arc;

/// Builder for a [`BootstrapOrchestrator`].
///
/// Every collaborator except the cancellation token must be supplied.
#[derive(Default)]
pub struct BootstrapBuilder {
    cluster: ClusterName,
    checkpoint_enabled: bool,
    metadata: Option<Arc<dyn MetadataEffects>>,
    checkpoints: Option<Arc<dyn CheckpointFactory>>,
    credentials: Option<Arc<dyn CredentialEffects>>,
    control_plane: Option<Arc<dyn ControlPlaneEffects>>,
    engine: Option<Arc<dyn WorkloadEngine>>,
    cancellation: Option<Arc<dyn CancellationToken>>,
}

impl BootstrapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder wired to the production handlers described by `config`.
    pub fn production(config: &AgentConfig) -> AgentResult<Self> {
        config.validate()?;

        let metadata: Arc<dyn MetadataEffects> = Arc::new(
            MetadataClient::http(config.metadata.endpoint.as_str(), config.metadata.timeout())
                .map_err(|e| AgentError::config(format!("metadata client: {e}")))?,
        );
        let control_plane = HttpControlPlaneClient::new(
            config.control_plane.endpoint.as_str(),
            config.control_plane.timeout(),
        )
        .map_err(|e| AgentError::config(format!("control plane client: {e}")))?;

        Ok(Self::new()
            .with_config(config)
            .with_credentials(Arc::new(CredentialChain::standard(metadata.clone())))
            .with_metadata(metadata)
            .with_checkpoint_factory(Arc::new(FilesystemCheckpointFactory::new(
                config.data_dir.clone(),
            )))
            .with_control_plane(Arc::new(control_plane))
            .with_workload_engine(Arc::new(StaticWorkloadEngine::new(
                config.capability_list(),
            ))))
    }

    /// Take cluster and checkpoint settings from `config`
    pub fn with_config(self, config: &AgentConfig) -> Self {
        self.with_cluster(config.cluster_name())
            .with_checkpointing(config.checkpoint)
    }

    pub fn with_cluster(mut self, cluster: ClusterName) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_checkpointing(mut self, enabled: bool) -> Self {
        self.checkpoint_enabled = enabled;
        self
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataEffects>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_checkpoint_factory(mut self, checkpoints: Arc<dyn CheckpointFactory>) -> Self {
        self.checkpoints = Some(checkpoints);
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialEffects>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_control_plane(mut self, control_plane: Arc<dyn ControlPlaneEffects>) -> Self {
        self.control_plane = Some(control_plane);
        self
    }

    pub fn with_workload_engine(mut self, engine: Arc<dyn WorkloadEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Token raced against every blocking step; defaults to never cancelling
    pub fn with_cancellation(mut self, cancellation: Arc<dyn CancellationToken>) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn build(self) -> AgentResult<BootstrapOrchestrator> {
        let metadata = self
            .metadata
            .ok_or_else(|| AgentError::config("metadata service required"))?;
        let checkpoints = self
            .checkpoints
            .ok_or_else(|| AgentError::config("checkpoint factory required"))?;
        let credentials = self
            .credentials
            .ok_or_else(|| AgentError::config("credential provider required"))?;
        let control_plane = self
            .control_plane
            .ok_or_else(|| AgentError::config("control plane client required"))?;
        let engine = self
            .engine
            .ok_or_else(|| AgentError::config("workload engine required"))?;
        let cancellation: Arc<dyn CancellationToken> = match self.cancellation {
            Some(cancellation) => cancellation,
            None => Arc::new(NeverCancel),
        };

        let reconciler = StateReconciler::new(checkpoints, metadata, cancellation.clone());
        let registration =
            RegistrationClient::new(credentials, control_plane, engine.clone(), cancellation);

        Ok(BootstrapOrchestrator::new(
            reconciler,
            registration,
            engine,
            self.checkpoint_enabled,
            self.cluster,
        ))
    }
}
