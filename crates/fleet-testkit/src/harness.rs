//! Bootstrap harness.
//!
//! Holds one mock per collaborator, all sharing a single [`CallLog`], and
//! builds orchestrators wired to them. Defaults describe a healthy first boot:
//! checkpointing on, no prior state, metadata answering `inst-1` in
//! `us-west-2`, and a control plane that hands out `container-instance1`.

use crate::call_log::CallLog;
use crate::mocks::{
    FailingCredentials, MemoryCheckpointFactory, MockControlPlane, MockMetadata,
    RecordingWorkloadEngine, StaticCredentials,
};
use fleet_agent::{AgentResult, BootstrapBuilder, BootstrapOrchestrator, BootstrapOutcome, ShutdownSignal};
use fleet_core::effects::CredentialEffects;
use fleet_core::{ClusterName, CredentialError, PersistedState};
use std::sync::Arc;

pub const DEFAULT_INSTANCE_ID: &str = "inst-1";
pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_REGISTRATION: &str = "container-instance1";

pub struct BootstrapHarness {
    pub log: CallLog,
    pub metadata: Arc<MockMetadata>,
    pub checkpoints: MemoryCheckpointFactory,
    pub credentials: Arc<dyn CredentialEffects>,
    pub control_plane: Arc<MockControlPlane>,
    pub engine: Arc<RecordingWorkloadEngine>,
    pub shutdown: ShutdownSignal,
    pub cluster: ClusterName,
    pub checkpoint_enabled: bool,
}

impl BootstrapHarness {
    pub fn new() -> Self {
        let log = CallLog::new();
        Self {
            metadata: Arc::new(
                MockMetadata::new(DEFAULT_INSTANCE_ID, DEFAULT_REGION).with_log(log.clone()),
            ),
            checkpoints: MemoryCheckpointFactory::new().with_log(log.clone()),
            credentials: Arc::new(StaticCredentials::default().with_log(log.clone())),
            control_plane: Arc::new(
                MockControlPlane::accepting(DEFAULT_REGISTRATION).with_log(log.clone()),
            ),
            engine: Arc::new(RecordingWorkloadEngine::default().with_log(log.clone())),
            shutdown: ShutdownSignal::new(),
            cluster: ClusterName::unset(),
            checkpoint_enabled: true,
            log,
        }
    }

    pub fn with_checkpointing(mut self, enabled: bool) -> Self {
        self.checkpoint_enabled = enabled;
        self
    }

    pub fn with_cluster(mut self, cluster: &str) -> Self {
        self.cluster = ClusterName::new(cluster);
        self
    }

    /// Seed the checkpoint with state from a previous boot
    pub fn with_persisted(mut self, persisted: PersistedState) -> Self {
        self.checkpoints = MemoryCheckpointFactory::with_state(persisted).with_log(self.log.clone());
        self
    }

    pub fn with_checkpoints(mut self, checkpoints: MemoryCheckpointFactory) -> Self {
        self.checkpoints = checkpoints.with_log(self.log.clone());
        self
    }

    pub fn with_metadata(mut self, metadata: MockMetadata) -> Self {
        self.metadata = Arc::new(metadata.with_log(self.log.clone()));
        self
    }

    pub fn with_control_plane(mut self, control_plane: MockControlPlane) -> Self {
        self.control_plane = Arc::new(control_plane.with_log(self.log.clone()));
        self
    }

    pub fn with_engine(mut self, engine: RecordingWorkloadEngine) -> Self {
        self.engine = Arc::new(engine.with_log(self.log.clone()));
        self
    }

    pub fn with_failing_credentials(mut self, error: CredentialError) -> Self {
        self.credentials = Arc::new(FailingCredentials::new(error).with_log(self.log.clone()));
        self
    }

    /// Orchestrator wired to this harness's mocks and shutdown signal
    pub fn orchestrator(&self) -> AgentResult<BootstrapOrchestrator> {
        BootstrapBuilder::new()
            .with_cluster(self.cluster.clone())
            .with_checkpointing(self.checkpoint_enabled)
            .with_metadata(self.metadata.clone())
            .with_checkpoint_factory(Arc::new(self.checkpoints.clone()))
            .with_credentials(self.credentials.clone())
            .with_control_plane(self.control_plane.clone())
            .with_workload_engine(self.engine.clone())
            .with_cancellation(self.shutdown.cancellation_token())
            .build()
    }

    /// Build an orchestrator and run one pass
    pub async fn run(&self) -> AgentResult<BootstrapOutcome> {
        let mut orchestrator = self.orchestrator()?;
        Ok(orchestrator.run().await)
    }
}

impl Default for BootstrapHarness {
    fn default() -> Self {
        Self::new()
    }
}
