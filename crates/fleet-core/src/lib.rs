//! Fleet Core - Layer 1: Domain Types and Effect Interfaces
//!
//! This crate holds the vocabulary shared by every other fleet crate. It
//! contains no I/O: handlers live in `fleet-effects` (production) and
//! `fleet-testkit` (test doubles), and the bootstrap state machine lives in
//! `fleet-agent`.
//!
//! # Contents
//!
//! - **Identity values**: `NodeIdentity`, `ClusterName`, `RegistrationIdentity`,
//!   `Capability`, `Credentials`
//! - **Checkpoint model**: `PersistedState`, `CheckpointSlot`, `CheckpointLayout`
//! - **Error taxonomy**: the closed `BootstrapError` set and its sub-errors
//! - **Effect traits**: metadata, checkpoint, credentials, control plane,
//!   workload engine, cancellation
//! - **Exit codes**: the process-level outcome of a bootstrap pass

#![forbid(unsafe_code)]

/// Checkpointed state record and slot layout
pub mod checkpoint;

/// Effect traits describing the agent's external collaborators
pub mod effects;

/// Closed error taxonomy for the bootstrap pass
pub mod errors;

/// Process exit codes
pub mod exit;

/// Identity and credential value types
pub mod identity;

pub use checkpoint::{CheckpointLayout, CheckpointSlot, PersistedState};
pub use errors::{
    BootstrapError, BootstrapStep, CheckpointError, ControlPlaneError, CredentialError,
    MetadataError, Result,
};
pub use exit::ExitCode;
pub use identity::{
    Capability, ClusterName, Credentials, NodeIdentity, ReadyNode, RegistrationIdentity,
    RegistrationRequest,
};
