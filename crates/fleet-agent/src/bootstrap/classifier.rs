//! Error classification.
//!
//! Turns any `BootstrapError` into a permanent or retryable verdict. The match
//! is total over the closed error set, so every new failure kind must be given
//! a verdict here before the crate compiles.

use fleet_core::{BootstrapError, ControlPlaneError, ExitCode};
use std::fmt;

/// Whether restarting the agent can help
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Permanent,
    Retryable,
}

impl Verdict {
    /// Process exit code for a pass that failed with this verdict
    pub fn exit_code(self) -> ExitCode {
        match self {
            Verdict::Permanent => ExitCode::Terminal,
            Verdict::Retryable => ExitCode::Error,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Permanent => f.write_str("permanent"),
            Verdict::Retryable => f.write_str("retryable"),
        }
    }
}

/// Failures that operators need to act on and that are called out by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialCase {
    AttributeValidation,
    InstanceTypeChanged,
    ClusterMismatch,
}

/// A verdict plus the cause it was derived from.
///
/// Only this module constructs values of this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    verdict: Verdict,
    cause: Option<String>,
}

impl ClassifiedError {
    fn new(verdict: Verdict, err: &BootstrapError) -> Self {
        Self {
            verdict,
            cause: Some(err.to_string()),
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    pub fn is_permanent(&self) -> bool {
        self.verdict == Verdict::Permanent
    }

    pub fn is_retryable(&self) -> bool {
        self.verdict == Verdict::Retryable
    }

    pub fn exit_code(&self) -> ExitCode {
        self.verdict.exit_code()
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} failure: {cause}", self.verdict),
            None => write!(f, "{} failure", self.verdict),
        }
    }
}

/// Classify any bootstrap error.
///
/// `InvalidParameter` is treated as permanent here; registration rewrites it
/// into a retryable rejection when a prior identity was presented.
pub fn classify(err: &BootstrapError) -> ClassifiedError {
    let verdict = match err {
        BootstrapError::ControlPlane(cp) => match cp {
            ControlPlaneError::InstanceTypeChanged(_) => Verdict::Permanent,
            ControlPlaneError::InvalidAttribute(_) => Verdict::Permanent,
            ControlPlaneError::InvalidParameter(_) => Verdict::Permanent,
            ControlPlaneError::Tagged {
                retryable: false, ..
            } => Verdict::Permanent,
            ControlPlaneError::Tagged {
                retryable: true, ..
            } => Verdict::Retryable,
            ControlPlaneError::Throttled(_)
            | ControlPlaneError::Transport(_)
            | ControlPlaneError::Other(_) => Verdict::Retryable,
        },
        BootstrapError::ClusterMismatch { .. } => Verdict::Permanent,
        BootstrapError::CheckpointSetup(_) | BootstrapError::CheckpointLoad(_) => {
            Verdict::Permanent
        }
        BootstrapError::Cancelled { .. } => Verdict::Retryable,
        BootstrapError::Metadata(_) | BootstrapError::Credentials(_) => Verdict::Retryable,
    };
    ClassifiedError::new(verdict, err)
}

/// Classify a failure of the reconciliation phase.
///
/// A broken checkpoint or identity lookup is never retried in place, whatever
/// the underlying cause; only cancellation stays retryable.
pub fn classify_reconciliation(err: &BootstrapError) -> ClassifiedError {
    match err {
        BootstrapError::Cancelled { .. } => ClassifiedError::new(Verdict::Retryable, err),
        _ => ClassifiedError::new(Verdict::Permanent, err),
    }
}

pub fn is_cluster_mismatch(err: &BootstrapError) -> bool {
    matches!(err, BootstrapError::ClusterMismatch { .. })
}

pub fn is_retryable(err: &BootstrapError) -> bool {
    classify(err).is_retryable()
}

/// The named special case `err` falls under, if any.
pub fn special_case(err: &BootstrapError) -> Option<SpecialCase> {
    match err {
        BootstrapError::ControlPlane(ControlPlaneError::InvalidAttribute(_)) => {
            Some(SpecialCase::AttributeValidation)
        }
        BootstrapError::ControlPlane(ControlPlaneError::InstanceTypeChanged(_)) => {
            Some(SpecialCase::InstanceTypeChanged)
        }
        BootstrapError::ClusterMismatch { .. } => Some(SpecialCase::ClusterMismatch),
        _ => None,
    }
}
