//! Bootstrap orchestration.
//!
//! One pass per process: reconcile, register, hand off. The orchestrator is
//! the only place a `BootstrapError` becomes a process exit code.

use super::classifier::{classify, classify_reconciliation, special_case, ClassifiedError, Verdict};
use super::reconciler::StateReconciler;
use super::registration::{RegistrationClient, RegistrationContext, RegistrationOutcome};
use fleet_core::effects::WorkloadEngine;
use fleet_core::{BootstrapError, ClusterName, ExitCode, ReadyNode, RegistrationIdentity};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Where a bootstrap pass currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapPhase {
    Start,
    Reconciling,
    Registering,
    Ready,
    Failed(Verdict),
}

impl BootstrapPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, BootstrapPhase::Ready | BootstrapPhase::Failed(_))
    }
}

impl fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapPhase::Start => f.write_str("start"),
            BootstrapPhase::Reconciling => f.write_str("reconciling"),
            BootstrapPhase::Registering => f.write_str("registering"),
            BootstrapPhase::Ready => f.write_str("ready"),
            BootstrapPhase::Failed(verdict) => write!(f, "failed ({verdict})"),
        }
    }
}

/// Result of a bootstrap pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The node is registered and the workload engine owns it
    Ready(ReadyNode),
    Failed {
        error: BootstrapError,
        classified: ClassifiedError,
    },
}

impl BootstrapOutcome {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            BootstrapOutcome::Ready(_) => ExitCode::Success,
            BootstrapOutcome::Failed { classified, .. } => classified.exit_code(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, BootstrapOutcome::Ready(_))
    }

    pub fn ready_node(&self) -> Option<&ReadyNode> {
        match self {
            BootstrapOutcome::Ready(node) => Some(node),
            BootstrapOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&BootstrapError> {
        match self {
            BootstrapOutcome::Ready(_) => None,
            BootstrapOutcome::Failed { error, .. } => Some(error),
        }
    }

    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            BootstrapOutcome::Ready(_) => None,
            BootstrapOutcome::Failed { classified, .. } => Some(classified),
        }
    }
}

/// Drives a node from start to ready, or to a classified failure.
///
/// Built by [`crate::BootstrapBuilder`].
pub struct BootstrapOrchestrator {
    reconciler: StateReconciler,
    registration: RegistrationClient,
    engine: Arc<dyn WorkloadEngine>,
    checkpoint_enabled: bool,
    configured_cluster: ClusterName,
    identity: RegistrationIdentity,
    phase_tx: watch::Sender<BootstrapPhase>,
    outcome: Option<BootstrapOutcome>,
}

impl BootstrapOrchestrator {
    pub(crate) fn new(
        reconciler: StateReconciler,
        registration: RegistrationClient,
        engine: Arc<dyn WorkloadEngine>,
        checkpoint_enabled: bool,
        configured_cluster: ClusterName,
    ) -> Self {
        let (phase_tx, _phase_rx) = watch::channel(BootstrapPhase::Start);
        Self {
            reconciler,
            registration,
            engine,
            checkpoint_enabled,
            configured_cluster,
            identity: RegistrationIdentity::unregistered(),
            phase_tx,
            outcome: None,
        }
    }

    pub fn phase(&self) -> BootstrapPhase {
        *self.phase_tx.borrow()
    }

    /// Observe phase transitions as they happen
    pub fn subscribe_phase(&self) -> watch::Receiver<BootstrapPhase> {
        self.phase_tx.subscribe()
    }

    /// The live registration identity, once the node is ready.
    pub fn registration_identity(&self) -> Option<&RegistrationIdentity> {
        match self.phase() {
            BootstrapPhase::Ready => Some(&self.identity),
            _ => None,
        }
    }

    /// Run the bootstrap pass.
    ///
    /// The pass runs at most once; later calls return the first outcome
    /// without touching any collaborator.
    pub async fn run(&mut self) -> BootstrapOutcome {
        if let Some(outcome) = &self.outcome {
            tracing::debug!(phase = %self.phase(), "bootstrap already ran");
            return outcome.clone();
        }
        let outcome = self.run_pass().await;
        self.outcome = Some(outcome.clone());
        outcome
    }

    async fn run_pass(&mut self) -> BootstrapOutcome {
        self.transition(BootstrapPhase::Reconciling);
        let reconciliation = match self
            .reconciler
            .reconcile(self.checkpoint_enabled, &self.configured_cluster)
            .await
        {
            Ok(reconciliation) => reconciliation,
            Err(error) => {
                let classified = classify_reconciliation(&error);
                return self.fail(error, classified);
            }
        };
        tracing::info!(
            cluster = %reconciliation.cluster,
            instance_id = %reconciliation.node.hardware_instance_id,
            region = %reconciliation.node.region,
            prior = %reconciliation.prior_identity,
            "state reconciled"
        );

        self.transition(BootstrapPhase::Registering);
        self.identity = reconciliation.prior_identity.clone();
        let context = RegistrationContext {
            cluster: &reconciliation.cluster,
            hardware_instance_id: &reconciliation.node.hardware_instance_id,
            store: reconciliation.store.as_ref(),
        };
        match self.registration.register(&mut self.identity, &context).await {
            Ok(RegistrationOutcome::Registered { checkpointed }) => {
                tracing::info!(registration = %self.identity, checkpointed, "registered node");
            }
            Ok(RegistrationOutcome::Reregistered) => {
                tracing::info!(registration = %self.identity, "re-registered node");
            }
            Err(error) => {
                let classified = classify(&error);
                return self.fail(error, classified);
            }
        }

        let node = ReadyNode {
            hardware_instance_id: reconciliation.node.hardware_instance_id.clone(),
            registration_identity: self.identity.clone(),
            cluster: reconciliation.cluster.clone(),
        };
        self.transition(BootstrapPhase::Ready);
        self.engine.start(node.clone()).await;
        BootstrapOutcome::Ready(node)
    }

    fn transition(&self, next: BootstrapPhase) {
        let previous = self.phase_tx.send_replace(next);
        tracing::info!(from = %previous, to = %next, "bootstrap phase transition");
    }

    fn fail(&self, error: BootstrapError, classified: ClassifiedError) -> BootstrapOutcome {
        let verdict = classified.verdict();
        tracing::error!(
            %verdict,
            special_case = ?special_case(&error),
            exit_code = classified.exit_code().code(),
            error = %error,
            "bootstrap failed"
        );
        self.transition(BootstrapPhase::Failed(verdict));
        BootstrapOutcome::Failed { error, classified }
    }
}
