//! Agent Error Types
//!
//! Failures of agent assembly: configuration loading and collaborator wiring.
//! Failures of the bootstrap pass itself are `fleet_core::BootstrapError`.

/// Agent-specific error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// Configuration error
    #[error("Agent configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Agent configuration parse error: {0}")]
    Parse(String),

    /// Configuration file could not be read
    #[error("Agent I/O error: {0}")]
    Io(String),
}

/// Agent result type
pub type AgentResult<T> = std::result::Result<T, AgentError>;

impl AgentError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an I/O error
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }
}

impl From<toml::de::Error> for AgentError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
