//! Effect traits for the agent's external collaborators.
//!
//! These traits define **what** the bootstrap pass may do to the outside
//! world; handlers define **how**. Production handlers live in
//! `fleet-effects`, deterministic doubles in `fleet-testkit`. The bootstrap
//! code in `fleet-agent` only ever sees `Arc<dyn ...>` of these traits, so any
//! collaborator can be substituted without touching orchestration logic.

pub mod checkpoint;
pub mod control_plane;
pub mod credentials;
pub mod engine;
pub mod metadata;
pub mod task;

pub use checkpoint::{CheckpointFactory, CheckpointStore};
pub use control_plane::ControlPlaneEffects;
pub use credentials::CredentialEffects;
pub use engine::WorkloadEngine;
pub use metadata::MetadataEffects;
pub use task::{CancellationToken, NeverCancel};
