//! Fleet Effects - Layer 3: Production Effect Handlers
//!
//! Stateless single-party implementations of the effect traits defined in
//! `fleet-core`. These handlers talk to the real world: the instance metadata
//! service, the local filesystem, and the control-plane HTTP endpoint.
//!
//! **Layer Constraint**: no mock handlers - those belong in `fleet-testkit`.

#![forbid(unsafe_code)]

pub mod checkpoint;
pub mod control_plane;
pub mod credentials;
pub mod engine;
pub mod metadata;

pub use checkpoint::{FilesystemCheckpointFactory, FilesystemCheckpointStore, NoopCheckpointStore};
pub use control_plane::HttpControlPlaneClient;
pub use credentials::{CredentialChain, EnvCredentialProvider, InstanceRoleCredentialProvider};
pub use engine::StaticWorkloadEngine;
pub use metadata::{MetadataClient, MetadataTransport, ReqwestTransport};
