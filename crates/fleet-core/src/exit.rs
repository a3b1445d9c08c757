//! Process exit codes understood by the node supervisor.

/// Outcome of a bootstrap pass as seen by the process supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExitCode {
    /// Bootstrap completed; the node is ready
    Success = 0,
    /// Retryable failure; a restart may help
    Error = 1,
    /// Permanent failure; the supervisor must not restart the agent
    Terminal = 5,
}

impl ExitCode {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether a supervisor should restart the process after this exit
    pub fn is_restartable(self) -> bool {
        matches!(self, ExitCode::Error)
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::Error.code(), 1);
        assert_eq!(ExitCode::Terminal.code(), 5);
        assert!(ExitCode::Error.is_restartable());
        assert!(!ExitCode::Terminal.is_restartable());
        assert!(!ExitCode::Success.is_restartable());
    }
}
