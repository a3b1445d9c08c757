//! Closed error taxonomy for the bootstrap pass
//!
//! Every failure-producing step returns one of the variants below. The
//! classifier in `fleet-agent` is a total match over this set, so adding a
//! variant is a compile error until its verdict is decided.

use crate::identity::ClusterName;
use std::fmt;

/// Blocking steps of a bootstrap pass, used to report where cancellation hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapStep {
    CheckpointOpen,
    CheckpointLoad,
    MetadataFetch,
    CredentialRetrieval,
    CapabilityDiscovery,
    Registration,
    CheckpointSave,
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootstrapStep::CheckpointOpen => "checkpoint open",
            BootstrapStep::CheckpointLoad => "checkpoint load",
            BootstrapStep::MetadataFetch => "metadata fetch",
            BootstrapStep::CredentialRetrieval => "credential retrieval",
            BootstrapStep::CapabilityDiscovery => "capability discovery",
            BootstrapStep::Registration => "registration",
            BootstrapStep::CheckpointSave => "checkpoint save",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by a bootstrap pass
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootstrapError {
    /// Checkpoint slot wiring or store construction failed
    #[error("Checkpoint setup failed: {0}")]
    CheckpointSetup(CheckpointError),

    /// Durable state exists but could not be read
    #[error("Checkpoint load failed: {0}")]
    CheckpointLoad(CheckpointError),

    /// Configured and persisted cluster names disagree
    #[error(
        "Cluster mismatch: configured cluster '{configured}' does not match the checkpointed cluster '{persisted}'"
    )]
    ClusterMismatch {
        configured: ClusterName,
        persisted: ClusterName,
    },

    /// Metadata facility query failed
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Credential provider failed
    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialError),

    /// Control-plane registration failed
    #[error("Control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    /// The pass was cancelled while a step was outstanding
    #[error("Bootstrap cancelled during {step}")]
    Cancelled { step: BootstrapStep },
}

impl BootstrapError {
    pub fn cluster_mismatch(configured: ClusterName, persisted: ClusterName) -> Self {
        Self::ClusterMismatch {
            configured,
            persisted,
        }
    }

    pub fn cancelled(step: BootstrapStep) -> Self {
        Self::Cancelled { step }
    }
}

/// Checkpoint wiring, load and save failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckpointError {
    #[error("slot '{slot}' registered twice")]
    DuplicateSlot { slot: &'static str },

    #[error("slot '{slot}' was never registered")]
    MissingSlot { slot: &'static str },

    /// Backing storage could not be prepared
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    /// Durable state is present but not decodable
    #[error("corrupt checkpoint: {0}")]
    Corrupt(String),

    #[error("unsupported checkpoint version {found} (newest understood is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("write failed: {0}")]
    WriteFailed(String),
}

impl CheckpointError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn read_failed(message: impl Into<String>) -> Self {
        Self::ReadFailed(message.into())
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }

    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed(message.into())
    }
}

/// Metadata facility failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    /// The facility could not be reached
    #[error("metadata service unreachable: {0}")]
    Unreachable(String),

    #[error("metadata request for '{path}' returned status {status}")]
    Status { path: String, status: u16 },

    /// Response body did not have the expected shape
    #[error("malformed metadata response: {0}")]
    Malformed(String),

    #[error("metadata service reported failure: {0}")]
    Rejected(String),
}

impl MetadataError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// Credential provider failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("no credentials available: {0}")]
    NotFound(String),

    #[error("credentials expired")]
    Expired,

    #[error("credential source failed: {0}")]
    Source(String),
}

impl CredentialError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn source(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }
}

impl From<MetadataError> for CredentialError {
    fn from(err: MetadataError) -> Self {
        Self::Source(err.to_string())
    }
}

/// Control-plane registration failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlPlaneError {
    /// The instance class changed underneath an existing registration
    #[error("instance type changed: {0}")]
    InstanceTypeChanged(String),

    /// A node attribute was malformed or rejected
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// A request parameter was rejected by the control plane
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The origin stated whether retrying can help
    #[error("{message} (retryable: {retryable})")]
    Tagged { retryable: bool, message: String },

    #[error("request throttled: {0}")]
    Throttled(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("{0}")]
    Other(String),
}

impl ControlPlaneError {
    pub fn instance_type_changed(message: impl Into<String>) -> Self {
        Self::InstanceTypeChanged(message.into())
    }

    pub fn invalid_attribute(message: impl Into<String>) -> Self {
        Self::InvalidAttribute(message.into())
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn tagged(retryable: bool, message: impl Into<String>) -> Self {
        Self::Tagged {
            retryable,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Standard Result type for bootstrap operations
pub type Result<T> = std::result::Result<T, BootstrapError>;
