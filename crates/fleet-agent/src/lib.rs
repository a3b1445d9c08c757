//! # Fleet Agent - Layer 6: Bootstrap Runtime
//!
//! Brings a worker node from "just started" to "registered and ready":
//!
//! - **Reconciliation**: load the checkpoint of a previous boot and keep only
//!   what still holds for the current hardware and cluster
//! - **Registration**: register fresh or confirm the prior identity, and
//!   checkpoint the result of a first registration
//! - **Classification**: map every failure to a permanent or retryable
//!   verdict and from there to a process exit code
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fleet_agent::{AgentConfig, BootstrapBuilder, ShutdownSignal};
//!
//! let config = AgentConfig::load(None)?.apply_process_env()?;
//! let shutdown = ShutdownSignal::new();
//! let mut orchestrator = BootstrapBuilder::production(&config)?
//!     .with_cancellation(shutdown.cancellation_token())
//!     .build()?;
//! let outcome = orchestrator.run().await;
//! std::process::exit(outcome.exit_code().code().into());
//! ```

#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod core;
pub mod runtime;

pub use bootstrap::{
    classify, is_cluster_mismatch, is_retryable, BootstrapOrchestrator, BootstrapOutcome,
    BootstrapPhase, ClassifiedError, SpecialCase, Verdict,
};
pub use core::{AgentConfig, AgentError, AgentResult, BootstrapBuilder};
pub use runtime::ShutdownSignal;
