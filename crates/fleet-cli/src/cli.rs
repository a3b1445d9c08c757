//! Command-line flags and their overlay onto the loaded configuration.

use clap::Parser;
use fleet_agent::{AgentConfig, AgentResult};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fleet-agent")]
#[command(about = "Fleet node agent - registers this node with the control plane", long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Cluster to join
    #[arg(long)]
    pub cluster: Option<String>,

    /// Persist registration state across restarts
    #[arg(long)]
    pub checkpoint: bool,

    /// Directory for the checkpoint file
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Defaults, then the config file, then `FLEET_*` variables, then flags.
    pub fn load_config(&self) -> AgentResult<AgentConfig> {
        let config = AgentConfig::load(self.config.as_deref())?.apply_process_env()?;
        Ok(self.apply_flags(config))
    }

    pub fn apply_flags(&self, mut config: AgentConfig) -> AgentConfig {
        if let Some(cluster) = &self.cluster {
            config.cluster = cluster.clone();
        }
        if self.checkpoint {
            config.checkpoint = true;
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        config
    }

    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
