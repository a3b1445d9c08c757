//! Agent Configuration
//!
//! Layered configuration: built-in defaults, then an optional TOML file, then
//! `FLEET_*` environment variables. Command-line flags are applied last by the
//! binary.

use super::{AgentError, AgentResult};
use fleet_core::{Capability, ClusterName};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CLUSTER_VAR: &str = "FLEET_CLUSTER";
pub const CHECKPOINT_VAR: &str = "FLEET_CHECKPOINT";
pub const DATA_DIR_VAR: &str = "FLEET_DATADIR";
pub const METADATA_ENDPOINT_VAR: &str = "FLEET_METADATA_ENDPOINT";
pub const CONTROL_PLANE_ENDPOINT_VAR: &str = "FLEET_ENDPOINT";

/// Resolve the default data directory for the agent.
///
/// Priority:
/// 1. `$FLEET_PATH/.fleet` if FLEET_PATH is set
/// 2. `~/.fleet` (home directory)
/// 3. `./.fleet` (current directory fallback)
pub fn default_data_dir() -> PathBuf {
    std::env::var("FLEET_PATH")
        .ok()
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fleet")
}

fn default_metadata_endpoint() -> String {
    fleet_effects::metadata::DEFAULT_METADATA_ENDPOINT.to_string()
}

/// Agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Cluster to join; empty adopts the checkpointed cluster
    pub cluster: String,

    /// Persist identity across restarts
    pub checkpoint: bool,

    /// Directory holding the checkpoint file
    pub data_dir: PathBuf,

    pub metadata: MetadataConfig,

    pub control_plane: ControlPlaneConfig,

    /// Capabilities advertised by the workload engine
    pub capabilities: Vec<String>,
}

/// Instance metadata service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

/// Control plane configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Base URL of the control plane; required
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cluster: String::new(),
            checkpoint: false,
            data_dir: default_data_dir(),
            metadata: MetadataConfig::default(),
            control_plane: ControlPlaneConfig::default(),
            capabilities: Vec::new(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: default_metadata_endpoint(),
            timeout_secs: 5,
        }
    }
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_secs: 30,
        }
    }
}

impl MetadataConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ControlPlaneConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_bool(var: &str, value: &str) -> AgentResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(AgentError::config(format!(
            "{var} must be true, false, 1 or 0 (got '{other}')"
        ))),
    }
}

impl AgentConfig {
    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> AgentResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load from `path`, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> AgentResult<Self> {
        match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path).map_err(|e| {
                    AgentError::io(format!("failed to read {}: {e}", path.display()))
                })?;
                Self::from_toml_str(&contents)
            }
            None => Ok(Self::default()),
        }
    }

    /// Overlay `FLEET_*` variables from the process environment
    pub fn apply_process_env(self) -> AgentResult<Self> {
        self.apply_env(|name| std::env::var(name).ok())
    }

    /// Overlay `FLEET_*` variables from an arbitrary lookup.
    ///
    /// Empty values are ignored.
    pub fn apply_env<F>(mut self, lookup: F) -> AgentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(cluster) = var(CLUSTER_VAR) {
            self.cluster = cluster;
        }
        if let Some(checkpoint) = var(CHECKPOINT_VAR) {
            self.checkpoint = parse_bool(CHECKPOINT_VAR, &checkpoint)?;
        }
        if let Some(data_dir) = var(DATA_DIR_VAR) {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Some(endpoint) = var(METADATA_ENDPOINT_VAR) {
            self.metadata.endpoint = endpoint;
        }
        if let Some(endpoint) = var(CONTROL_PLANE_ENDPOINT_VAR) {
            self.control_plane.endpoint = endpoint;
        }
        Ok(self)
    }

    pub fn validate(&self) -> AgentResult<()> {
        if self.control_plane.endpoint.trim().is_empty() {
            return Err(AgentError::config(format!(
                "control plane endpoint is required (set control_plane.endpoint or {CONTROL_PLANE_ENDPOINT_VAR})"
            )));
        }
        if self.metadata.endpoint.trim().is_empty() {
            return Err(AgentError::config("metadata endpoint must not be empty"));
        }
        if self.checkpoint && self.data_dir.as_os_str().is_empty() {
            return Err(AgentError::config(
                "data_dir must be set when checkpointing is enabled",
            ));
        }
        Ok(())
    }

    pub fn cluster_name(&self) -> ClusterName {
        ClusterName::new(self.cluster.trim())
    }

    pub fn capability_list(&self) -> Vec<Capability> {
        self.capabilities
            .iter()
            .map(|c| Capability::new(c.as_str()))
            .collect()
    }
}
