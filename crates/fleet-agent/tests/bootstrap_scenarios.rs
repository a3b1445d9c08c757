//! End-to-end bootstrap passes against the testkit harness.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_matches::assert_matches;
use fleet_agent::{is_cluster_mismatch, BootstrapOutcome, BootstrapPhase, SpecialCase, Verdict};
use fleet_agent::bootstrap::special_case;
use fleet_core::{
    BootstrapError, BootstrapStep, CheckpointError, CheckpointSlot, ClusterName,
    ControlPlaneError, CredentialError, ExitCode, MetadataError, PersistedState,
    RegistrationIdentity,
};
use fleet_testkit::{
    BootstrapHarness, ControlPlaneResponse, MemoryCheckpointFactory, MockControlPlane,
    MockMetadata, RecordingWorkloadEngine,
};
use std::time::Duration;

fn failure(outcome: &BootstrapOutcome) -> &BootstrapError {
    outcome.error().expect("expected a failed pass")
}

#[tokio::test]
async fn fresh_boot_registers_and_checkpoints_once() {
    let harness = BootstrapHarness::new();

    let outcome = harness.run().await.unwrap();

    assert_eq!(outcome.exit_code(), ExitCode::Success);
    let node = outcome.ready_node().unwrap();
    assert_eq!(
        node.registration_identity,
        RegistrationIdentity::from("container-instance1")
    );
    assert_eq!(node.hardware_instance_id, "inst-1");
    assert_eq!(
        harness.checkpoints.saves(),
        vec![PersistedState::new(
            "container-instance1".into(),
            ClusterName::unset(),
            "inst-1"
        )]
    );
    assert_eq!(harness.engine.started().as_ref(), Some(node));
    assert!(!harness
        .control_plane
        .last_request()
        .unwrap()
        .prior_identity
        .is_registered());
}

#[tokio::test]
async fn slots_are_bound_in_fixed_order() {
    let harness = BootstrapHarness::new();
    harness.run().await.unwrap();

    let layouts = harness.checkpoints.layouts();
    assert_eq!(layouts.len(), 1);
    assert_eq!(
        layouts[0].slots(),
        &[
            CheckpointSlot::RegistrationIdentity,
            CheckpointSlot::Cluster,
            CheckpointSlot::HardwareInstanceId,
        ]
    );
}

#[tokio::test]
async fn restart_on_same_hardware_reregisters_prior_identity() {
    let harness = BootstrapHarness::new()
        .with_persisted(PersistedState::new("prev-arn".into(), ClusterName::unset(), "inst-1"))
        .with_control_plane(MockControlPlane::accepting("prev-arn"));

    let outcome = harness.run().await.unwrap();

    assert!(outcome.is_ready());
    let request = harness.control_plane.last_request().unwrap();
    assert_eq!(request.prior_identity, RegistrationIdentity::from("prev-arn"));
    assert_eq!(harness.checkpoints.save_count(), 0);
}

#[tokio::test]
async fn restart_on_new_hardware_registers_fresh() {
    let harness = BootstrapHarness::new()
        .with_persisted(PersistedState::new("prev-arn".into(), ClusterName::unset(), "inst-1"))
        .with_metadata(MockMetadata::new("inst-2", "us-west-2"))
        .with_control_plane(MockControlPlane::accepting("new-arn"));

    let outcome = harness.run().await.unwrap();

    assert!(outcome.is_ready());
    let request = harness.control_plane.last_request().unwrap();
    assert!(!request.prior_identity.is_registered());
    assert_eq!(
        harness.checkpoints.persisted(),
        PersistedState::new("new-arn".into(), ClusterName::unset(), "inst-2")
    );
}

#[tokio::test]
async fn persisted_cluster_is_adopted_when_unconfigured() {
    let harness = BootstrapHarness::new()
        .with_persisted(PersistedState::new("prev-arn".into(), "foo".into(), "inst-1"));

    harness.run().await.unwrap();

    let request = harness.control_plane.last_request().unwrap();
    assert_eq!(request.cluster, ClusterName::from("foo"));
}

#[tokio::test]
async fn cluster_mismatch_is_terminal_and_persists_nothing() {
    let harness = BootstrapHarness::new()
        .with_cluster("bar")
        .with_persisted(PersistedState::new("prev-arn".into(), "foo".into(), "inst-1"));

    let outcome = harness.run().await.unwrap();

    assert_eq!(outcome.exit_code(), ExitCode::Terminal);
    assert!(is_cluster_mismatch(failure(&outcome)));
    assert_eq!(special_case(failure(&outcome)), Some(SpecialCase::ClusterMismatch));
    assert_eq!(harness.control_plane.call_count(), 0);
    assert_eq!(harness.checkpoints.save_count(), 0);
}

#[tokio::test]
async fn cluster_mismatch_is_detected_after_hardware_change() {
    let harness = BootstrapHarness::new()
        .with_cluster("bar")
        .with_persisted(PersistedState::new("prev-arn".into(), "foo".into(), "inst-1"))
        .with_metadata(MockMetadata::new("inst-2", "us-west-2"));

    let outcome = harness.run().await.unwrap();

    assert!(is_cluster_mismatch(failure(&outcome)));
    assert_eq!(outcome.exit_code(), ExitCode::Terminal);
}

#[tokio::test]
async fn disabled_checkpointing_touches_no_durable_state() {
    let harness = BootstrapHarness::new()
        .with_checkpointing(false)
        .with_persisted(PersistedState::new("prev-arn".into(), "foo".into(), "inst-1"));

    let outcome = harness.run().await.unwrap();

    assert!(outcome.is_ready());
    assert_eq!(harness.checkpoints.open_count(), 0);
    assert_eq!(harness.checkpoints.load_count(), 0);
    assert_eq!(harness.checkpoints.save_count(), 0);
    assert_eq!(harness.metadata.identity_calls(), 1);
    let request = harness.control_plane.last_request().unwrap();
    assert!(!request.prior_identity.is_registered());
    assert!(request.cluster.is_unset());
}

#[tokio::test]
async fn attribute_validation_failure_is_terminal() {
    let harness = BootstrapHarness::new().with_control_plane(MockControlPlane::rejecting(
        ControlPlaneError::invalid_attribute("capability 'bad cap' rejected"),
    ));

    let outcome = harness.run().await.unwrap();

    assert_eq!(outcome.exit_code(), ExitCode::Terminal);
    assert_eq!(
        special_case(failure(&outcome)),
        Some(SpecialCase::AttributeValidation)
    );
    assert_eq!(harness.checkpoints.save_count(), 0);
    assert_eq!(harness.engine.start_count(), 0);
}

#[tokio::test]
async fn instance_type_change_on_reregistration_is_terminal() {
    let harness = BootstrapHarness::new()
        .with_persisted(PersistedState::new("prev-arn".into(), ClusterName::unset(), "inst-1"))
        .with_control_plane(MockControlPlane::rejecting(
            ControlPlaneError::instance_type_changed("Container instance type changes are not supported"),
        ));

    let outcome = harness.run().await.unwrap();

    assert_eq!(outcome.exit_code(), ExitCode::Terminal);
    assert_eq!(
        special_case(failure(&outcome)),
        Some(SpecialCase::InstanceTypeChanged)
    );
}

#[tokio::test]
async fn invalid_parameter_on_first_registration_is_terminal() {
    let harness = BootstrapHarness::new().with_control_plane(MockControlPlane::rejecting(
        ControlPlaneError::invalid_parameter("bad cluster"),
    ));

    let outcome = harness.run().await.unwrap();

    assert_eq!(outcome.exit_code(), ExitCode::Terminal);
    assert_eq!(harness.checkpoints.save_count(), 0);
}

#[tokio::test]
async fn invalid_parameter_on_reregistration_is_retryable() {
    let harness = BootstrapHarness::new()
        .with_persisted(PersistedState::new("prev-arn".into(), ClusterName::unset(), "inst-1"))
        .with_control_plane(MockControlPlane::rejecting(
            ControlPlaneError::invalid_parameter("stale arn"),
        ));

    let outcome = harness.run().await.unwrap();

    assert_eq!(outcome.exit_code(), ExitCode::Error);
    assert_eq!(
        outcome.classified().unwrap().verdict(),
        Verdict::Retryable
    );
    assert_eq!(
        harness.control_plane.last_request().unwrap().prior_identity,
        RegistrationIdentity::from("prev-arn")
    );
}

#[tokio::test]
async fn unrecognized_registration_failure_is_retryable() {
    let harness = BootstrapHarness::new()
        .with_control_plane(MockControlPlane::rejecting(ControlPlaneError::other("error")));

    let outcome = harness.run().await.unwrap();

    assert_eq!(outcome.exit_code(), ExitCode::Error);
    assert_eq!(
        outcome.classified().unwrap().verdict(),
        Verdict::Retryable
    );
}

#[tokio::test]
async fn credential_failure_is_retryable() {
    let harness = BootstrapHarness::new()
        .with_failing_credentials(CredentialError::not_found("no provider"));

    let outcome = harness.run().await.unwrap();

    assert_eq!(outcome.exit_code(), ExitCode::Error);
    assert_eq!(harness.control_plane.call_count(), 0);
}

#[tokio::test]
async fn store_open_failure_is_terminal() {
    let harness = BootstrapHarness::new().with_checkpoints(
        MemoryCheckpointFactory::new().fail_open(CheckpointError::unavailable("read-only")),
    );

    let outcome = harness.run().await.unwrap();

    assert_eq!(outcome.exit_code(), ExitCode::Terminal);
    assert_matches!(failure(&outcome), BootstrapError::CheckpointSetup(_));
    assert_eq!(harness.metadata.identity_calls(), 0);
}

#[tokio::test]
async fn load_failure_is_terminal_and_skips_metadata() {
    let harness = BootstrapHarness::new().with_checkpoints(
        MemoryCheckpointFactory::new().fail_load(CheckpointError::corrupt("garbage")),
    );

    let outcome = harness.run().await.unwrap();

    assert_eq!(outcome.exit_code(), ExitCode::Terminal);
    assert_matches!(failure(&outcome), BootstrapError::CheckpointLoad(_));
    assert_eq!(harness.metadata.identity_calls(), 0);
    assert_eq!(harness.control_plane.call_count(), 0);
}

#[tokio::test]
async fn metadata_failure_during_reconciliation_is_terminal() {
    let harness = BootstrapHarness::new()
        .with_metadata(MockMetadata::failing(MetadataError::unreachable("timeout")));

    let outcome = harness.run().await.unwrap();

    assert_eq!(outcome.exit_code(), ExitCode::Terminal);
    assert_matches!(failure(&outcome), BootstrapError::Metadata(_));
}

#[tokio::test]
async fn collaborators_are_used_in_order() {
    let harness = BootstrapHarness::new();
    harness.run().await.unwrap();

    assert_eq!(
        harness.log.entries(),
        vec![
            "checkpoint.open",
            "checkpoint.load",
            "metadata.current_identity",
            "credentials.retrieve",
            "engine.capabilities",
            "control_plane.register",
            "checkpoint.save",
            "engine.start",
        ]
    );
}

#[tokio::test]
async fn capabilities_reach_the_control_plane_unchanged() {
    let harness = BootstrapHarness::new()
        .with_engine(RecordingWorkloadEngine::new(&["z.last", "a.first"]));

    harness.run().await.unwrap();

    let request = harness.control_plane.last_request().unwrap();
    let tokens: Vec<&str> = request.capabilities.iter().map(|c| c.as_str()).collect();
    assert_eq!(tokens, vec!["z.last", "a.first"]);
}

#[tokio::test]
async fn cancellation_before_start_is_retryable_and_touches_nothing() {
    let harness = BootstrapHarness::new();
    harness.shutdown.trigger();

    let outcome = harness.run().await.unwrap();

    assert_eq!(outcome.exit_code(), ExitCode::Error);
    assert_matches!(
        failure(&outcome),
        BootstrapError::Cancelled {
            step: BootstrapStep::CheckpointOpen
        }
    );
    assert!(harness.log.entries().is_empty());
}

#[tokio::test]
async fn cancellation_during_registration_is_retryable_without_save() {
    let harness = BootstrapHarness::new().with_control_plane(MockControlPlane::hanging());
    let trigger = harness.shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.trigger();
    });

    let mut orchestrator = harness.orchestrator().unwrap();
    let outcome = orchestrator.run().await;

    assert_eq!(outcome.exit_code(), ExitCode::Error);
    assert_matches!(
        failure(&outcome),
        BootstrapError::Cancelled {
            step: BootstrapStep::Registration
        }
    );
    assert_eq!(harness.checkpoints.save_count(), 0);
    assert!(orchestrator.registration_identity().is_none());
    assert_eq!(
        orchestrator.phase(),
        BootstrapPhase::Failed(Verdict::Retryable)
    );
}

#[tokio::test]
async fn orchestrator_exposes_identity_once_ready() {
    let harness = BootstrapHarness::new();
    let mut orchestrator = harness.orchestrator().unwrap();
    let phases = orchestrator.subscribe_phase();

    assert!(orchestrator.registration_identity().is_none());
    orchestrator.run().await;

    assert_eq!(orchestrator.phase(), BootstrapPhase::Ready);
    assert_eq!(*phases.borrow(), BootstrapPhase::Ready);
    assert_eq!(
        orchestrator.registration_identity(),
        Some(&RegistrationIdentity::from("container-instance1"))
    );
}

#[tokio::test]
async fn second_run_replays_first_outcome() {
    let harness = BootstrapHarness::new().with_control_plane(
        MockControlPlane::accepting("second")
            .then(ControlPlaneResponse::Respond(Ok("first".into()))),
    );
    let mut orchestrator = harness.orchestrator().unwrap();

    let first = orchestrator.run().await;
    let second = orchestrator.run().await;

    assert_eq!(first, second);
    assert_eq!(harness.control_plane.call_count(), 1);
    assert_eq!(harness.checkpoints.save_count(), 1);
}
