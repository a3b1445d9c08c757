//! Agent Core - Config, Errors and Assembly
//!
//! Everything needed to turn configuration into a runnable
//! `BootstrapOrchestrator`.

pub mod builder;
pub mod config;
pub mod error;

pub use builder::BootstrapBuilder;
pub use config::{default_data_dir, AgentConfig, ControlPlaneConfig, MetadataConfig};
pub use error::{AgentError, AgentResult};
