//! Durable checkpoint storage.

use crate::checkpoint::{CheckpointLayout, PersistedState};
use crate::errors::CheckpointError;
use async_trait::async_trait;
use std::sync::Arc;

/// Builds a checkpoint store for a fully registered slot layout.
///
/// Opening prepares the backing storage but does not read it.
#[async_trait]
pub trait CheckpointFactory: Send + Sync {
    async fn open(
        &self,
        layout: &CheckpointLayout,
    ) -> Result<Arc<dyn CheckpointStore>, CheckpointError>;
}

/// Whole-record load/save of the bootstrap checkpoint.
///
/// A store is exclusive to one agent process; implementations need not guard
/// against concurrent writers.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read the record. A store that has never been saved yields the empty record.
    async fn load(&self) -> Result<PersistedState, CheckpointError>;

    /// Replace the record atomically.
    async fn save(&self, state: &PersistedState) -> Result<(), CheckpointError>;
}
