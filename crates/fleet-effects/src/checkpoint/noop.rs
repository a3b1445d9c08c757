use async_trait::async_trait;
use fleet_core::effects::CheckpointStore;
use fleet_core::{CheckpointError, PersistedState};

/// Store used when checkpointing is disabled: loads nothing, keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCheckpointStore;

#[async_trait]
impl CheckpointStore for NoopCheckpointStore {
    async fn load(&self) -> Result<PersistedState, CheckpointError> {
        Ok(PersistedState::default())
    }

    async fn save(&self, _state: &PersistedState) -> Result<(), CheckpointError> {
        tracing::trace!("checkpointing disabled; discarding save");
        Ok(())
    }
}
