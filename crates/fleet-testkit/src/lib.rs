//! Fleet Testing Infrastructure
//!
//! Deterministic doubles for every effect trait of `fleet-core`, plus a
//! harness that assembles them into a bootstrap pass.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```rust,ignore
//! use fleet_testkit::BootstrapHarness;
//!
//! let harness = BootstrapHarness::new().with_checkpointing(true);
//! let outcome = harness.run().await?;
//! assert_eq!(harness.checkpoints.save_count(), 1);
//! ```

pub mod call_log;
pub mod harness;
pub mod mocks;

pub use call_log::CallLog;
pub use harness::BootstrapHarness;
pub use mocks::{
    ControlPlaneResponse, FailingCredentials, MemoryCheckpointFactory, MemoryCheckpointStore,
    MockControlPlane, MockMetadata, RecordingWorkloadEngine, StaticCredentials,
};
