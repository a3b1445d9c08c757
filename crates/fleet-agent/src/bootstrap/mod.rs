//! The bootstrap pass: reconciliation, registration and error classification.

pub mod classifier;
pub mod orchestrator;
pub mod reconciler;
pub mod registration;

pub use classifier::{
    classify, classify_reconciliation, is_cluster_mismatch, is_retryable, special_case,
    ClassifiedError, SpecialCase, Verdict,
};
pub use orchestrator::{BootstrapOrchestrator, BootstrapOutcome, BootstrapPhase};
pub use reconciler::{
    best_effort_instance_id, resolve_cluster, resolve_prior_identity, standard_layout,
    Reconciliation, StateReconciler,
};
pub use registration::{RegistrationClient, RegistrationContext, RegistrationOutcome};
