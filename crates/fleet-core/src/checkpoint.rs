//! Checkpointed bootstrap state.
//!
//! The checkpoint is a single typed record, `PersistedState`, loaded and saved
//! as a unit. Slot registration survives as `CheckpointLayout`: the agent
//! declares which slots it binds before a store may be opened, and a store
//! refuses a layout that is missing any of them.

use crate::errors::CheckpointError;
use crate::identity::{ClusterName, RegistrationIdentity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named cell of the checkpoint record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckpointSlot {
    RegistrationIdentity,
    Cluster,
    HardwareInstanceId,
}

impl CheckpointSlot {
    /// Every slot, in registration order.
    pub const ALL: [CheckpointSlot; 3] = [
        CheckpointSlot::RegistrationIdentity,
        CheckpointSlot::Cluster,
        CheckpointSlot::HardwareInstanceId,
    ];

    /// Stable key used by on-disk formats.
    pub fn key(self) -> &'static str {
        match self {
            CheckpointSlot::RegistrationIdentity => "registration_identity",
            CheckpointSlot::Cluster => "cluster",
            CheckpointSlot::HardwareInstanceId => "hardware_instance_id",
        }
    }
}

impl fmt::Display for CheckpointSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Ordered set of slots bound into a checkpoint store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointLayout {
    slots: Vec<CheckpointSlot>,
}

impl CheckpointLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a slot. Binding the same slot twice is a wiring error.
    pub fn register(&mut self, slot: CheckpointSlot) -> Result<(), CheckpointError> {
        if self.slots.contains(&slot) {
            return Err(CheckpointError::DuplicateSlot { slot: slot.key() });
        }
        self.slots.push(slot);
        Ok(())
    }

    pub fn slots(&self) -> &[CheckpointSlot] {
        &self.slots
    }

    /// Whether every slot of `PersistedState` is bound.
    pub fn is_complete(&self) -> bool {
        CheckpointSlot::ALL.iter().all(|s| self.slots.contains(s))
    }

    /// Reject layouts that do not cover the full record.
    pub fn ensure_complete(&self) -> Result<(), CheckpointError> {
        match CheckpointSlot::ALL.iter().find(|s| !self.slots.contains(s)) {
            Some(missing) => Err(CheckpointError::MissingSlot {
                slot: missing.key(),
            }),
            None => Ok(()),
        }
    }
}

/// The durable triple `{registration identity, cluster, hardware instance id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub registration_identity: RegistrationIdentity,
    #[serde(default)]
    pub cluster: ClusterName,
    #[serde(default)]
    pub hardware_instance_id: String,
}

impl PersistedState {
    pub fn new(
        registration_identity: RegistrationIdentity,
        cluster: ClusterName,
        hardware_instance_id: impl Into<String>,
    ) -> Self {
        Self {
            registration_identity,
            cluster,
            hardware_instance_id: hardware_instance_id.into(),
        }
    }

    /// True for a node that has never checkpointed anything
    pub fn is_empty(&self) -> bool {
        !self.registration_identity.is_registered()
            && self.cluster.is_unset()
            && self.hardware_instance_id.is_empty()
    }
}
