//! Mock effect handlers.
//!
//! Every mock counts its calls and can optionally append to a shared
//! [`CallLog`] so tests can assert on the order collaborators were used in.
//! Uses `parking_lot::Mutex`; no lock is held across an await point.

use crate::call_log::CallLog;
use async_trait::async_trait;
use fleet_core::effects::{
    CheckpointFactory, CheckpointStore, ControlPlaneEffects, CredentialEffects, MetadataEffects,
    WorkloadEngine,
};
use fleet_core::{
    Capability, CheckpointError, CheckpointLayout, ControlPlaneError, CredentialError,
    Credentials, MetadataError, NodeIdentity, PersistedState, ReadyNode, RegistrationIdentity,
    RegistrationRequest,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn record(log: &Option<CallLog>, entry: &'static str) {
    if let Some(log) = log {
        log.record(entry);
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Metadata service with a fixed answer
#[derive(Debug)]
pub struct MockMetadata {
    identity: Result<NodeIdentity, MetadataError>,
    credentials: Result<Credentials, MetadataError>,
    identity_calls: AtomicUsize,
    log: Option<CallLog>,
}

impl MockMetadata {
    pub fn new(hardware_instance_id: &str, region: &str) -> Self {
        Self {
            identity: Ok(NodeIdentity::new(hardware_instance_id, region)),
            credentials: Ok(Credentials::new("AKIDTEST", "SECRETTEST")),
            identity_calls: AtomicUsize::new(0),
            log: None,
        }
    }

    /// Metadata service that cannot be reached
    pub fn failing(error: MetadataError) -> Self {
        Self {
            identity: Err(error.clone()),
            credentials: Err(error),
            identity_calls: AtomicUsize::new(0),
            log: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Ok(credentials);
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataEffects for MockMetadata {
    async fn current_identity(&self) -> Result<NodeIdentity, MetadataError> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        record(&self.log, "metadata.current_identity");
        self.identity.clone()
    }

    async fn credentials(&self) -> Result<Credentials, MetadataError> {
        record(&self.log, "metadata.credentials");
        self.credentials.clone()
    }
}

// ============================================================================
// Checkpoint
// ============================================================================

#[derive(Debug, Default)]
struct CheckpointState {
    persisted: PersistedState,
    saves: Vec<PersistedState>,
    layouts: Vec<CheckpointLayout>,
    open_error: Option<CheckpointError>,
    load_error: Option<CheckpointError>,
    save_error: Option<CheckpointError>,
    loads: usize,
}

/// In-memory checkpoint factory with failure injection.
///
/// All stores opened from one factory share its state, so counters observed
/// on the factory cover every store it handed out.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointFactory {
    state: Arc<Mutex<CheckpointState>>,
    log: Option<CallLog>,
}

impl MemoryCheckpointFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose stores load `persisted`
    pub fn with_state(persisted: PersistedState) -> Self {
        let factory = Self::new();
        factory.state.lock().persisted = persisted;
        factory
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn fail_open(self, error: CheckpointError) -> Self {
        self.state.lock().open_error = Some(error);
        self
    }

    pub fn fail_load(self, error: CheckpointError) -> Self {
        self.state.lock().load_error = Some(error);
        self
    }

    pub fn fail_save(self, error: CheckpointError) -> Self {
        self.state.lock().save_error = Some(error);
        self
    }

    /// A store bound to this factory without going through `open`
    pub fn store(&self) -> MemoryCheckpointStore {
        MemoryCheckpointStore {
            state: self.state.clone(),
            log: self.log.clone(),
        }
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().layouts.len()
    }

    pub fn load_count(&self) -> usize {
        self.state.lock().loads
    }

    pub fn save_count(&self) -> usize {
        self.state.lock().saves.len()
    }

    /// Every record passed to `save`, successful or not
    pub fn saves(&self) -> Vec<PersistedState> {
        self.state.lock().saves.clone()
    }

    /// Current durable contents
    pub fn persisted(&self) -> PersistedState {
        self.state.lock().persisted.clone()
    }

    /// Layouts the factory was asked to open
    pub fn layouts(&self) -> Vec<CheckpointLayout> {
        self.state.lock().layouts.clone()
    }
}

#[async_trait]
impl CheckpointFactory for MemoryCheckpointFactory {
    async fn open(
        &self,
        layout: &CheckpointLayout,
    ) -> Result<Arc<dyn CheckpointStore>, CheckpointError> {
        record(&self.log, "checkpoint.open");
        let mut state = self.state.lock();
        state.layouts.push(layout.clone());
        if let Some(error) = state.open_error.clone() {
            return Err(error);
        }
        layout.ensure_complete()?;
        drop(state);
        Ok(Arc::new(self.store()))
    }
}

/// Store handed out by [`MemoryCheckpointFactory`]
#[derive(Debug, Clone)]
pub struct MemoryCheckpointStore {
    state: Arc<Mutex<CheckpointState>>,
    log: Option<CallLog>,
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<PersistedState, CheckpointError> {
        record(&self.log, "checkpoint.load");
        let mut state = self.state.lock();
        state.loads += 1;
        match state.load_error.clone() {
            Some(error) => Err(error),
            None => Ok(state.persisted.clone()),
        }
    }

    async fn save(&self, persisted: &PersistedState) -> Result<(), CheckpointError> {
        record(&self.log, "checkpoint.save");
        let mut state = self.state.lock();
        state.saves.push(persisted.clone());
        if let Some(error) = state.save_error.clone() {
            return Err(error);
        }
        state.persisted = persisted.clone();
        Ok(())
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Always hands out the same credentials
#[derive(Debug)]
pub struct StaticCredentials {
    credentials: Credentials,
    calls: AtomicUsize,
    log: Option<CallLog>,
}

impl StaticCredentials {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            calls: AtomicUsize::new(0),
            log: None,
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StaticCredentials {
    fn default() -> Self {
        Self::new(Credentials::new("AKIDTEST", "SECRETTEST"))
    }
}

#[async_trait]
impl CredentialEffects for StaticCredentials {
    async fn credentials(&self) -> Result<Credentials, CredentialError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        record(&self.log, "credentials.retrieve");
        Ok(self.credentials.clone())
    }
}

/// Credential provider that always fails
#[derive(Debug)]
pub struct FailingCredentials {
    error: CredentialError,
    log: Option<CallLog>,
}

impl FailingCredentials {
    pub fn new(error: CredentialError) -> Self {
        Self { error, log: None }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }
}

#[async_trait]
impl CredentialEffects for FailingCredentials {
    async fn credentials(&self) -> Result<Credentials, CredentialError> {
        record(&self.log, "credentials.retrieve");
        Err(self.error.clone())
    }
}

// ============================================================================
// Control plane
// ============================================================================

/// One scripted reaction of [`MockControlPlane`]
#[derive(Debug, Clone)]
pub enum ControlPlaneResponse {
    Respond(Result<RegistrationIdentity, ControlPlaneError>),
    /// Never answer; for cancellation tests
    Hang,
}

/// Control plane with scripted responses and request recording.
///
/// Scripted responses are consumed in order; once they run out every call
/// gets the fallback.
#[derive(Debug)]
pub struct MockControlPlane {
    scripted: Mutex<VecDeque<ControlPlaneResponse>>,
    fallback: ControlPlaneResponse,
    requests: Mutex<Vec<RegistrationRequest>>,
    log: Option<CallLog>,
}

impl MockControlPlane {
    fn with_fallback(fallback: ControlPlaneResponse) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fallback,
            requests: Mutex::new(Vec::new()),
            log: None,
        }
    }

    /// Accepts every registration, answering with `identity`
    pub fn accepting(identity: &str) -> Self {
        Self::with_fallback(ControlPlaneResponse::Respond(Ok(identity.into())))
    }

    pub fn rejecting(error: ControlPlaneError) -> Self {
        Self::with_fallback(ControlPlaneResponse::Respond(Err(error)))
    }

    pub fn hanging() -> Self {
        Self::with_fallback(ControlPlaneResponse::Hang)
    }

    /// Queue a response ahead of the fallback
    pub fn then(self, response: ControlPlaneResponse) -> Self {
        self.scripted.lock().push_back(response);
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn requests(&self) -> Vec<RegistrationRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<RegistrationRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl ControlPlaneEffects for MockControlPlane {
    async fn register_node(
        &self,
        request: &RegistrationRequest,
        _credentials: &Credentials,
    ) -> Result<RegistrationIdentity, ControlPlaneError> {
        record(&self.log, "control_plane.register");
        self.requests.lock().push(request.clone());
        let response = self
            .scripted
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match response {
            ControlPlaneResponse::Respond(result) => result,
            ControlPlaneResponse::Hang => futures::future::pending().await,
        }
    }
}

// ============================================================================
// Workload engine
// ============================================================================

/// Workload engine that records the hand-off
#[derive(Debug, Default)]
pub struct RecordingWorkloadEngine {
    capabilities: Vec<Capability>,
    started: Mutex<Vec<ReadyNode>>,
    log: Option<CallLog>,
}

impl RecordingWorkloadEngine {
    pub fn new(capabilities: &[&str]) -> Self {
        Self {
            capabilities: capabilities.iter().map(|c| Capability::from(*c)).collect(),
            started: Mutex::new(Vec::new()),
            log: None,
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Node handed over by the last `start`, if any
    pub fn started(&self) -> Option<ReadyNode> {
        self.started.lock().last().cloned()
    }

    pub fn start_count(&self) -> usize {
        self.started.lock().len()
    }
}

#[async_trait]
impl WorkloadEngine for RecordingWorkloadEngine {
    async fn capabilities(&self) -> Vec<Capability> {
        record(&self.log, "engine.capabilities");
        self.capabilities.clone()
    }

    async fn start(&self, node: ReadyNode) {
        record(&self.log, "engine.start");
        self.started.lock().push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use fleet_core::ClusterName;

    #[tokio::test]
    async fn memory_store_persists_successful_saves() {
        let factory = MemoryCheckpointFactory::new();
        let store = factory.store();
        let state = PersistedState::new("arn".into(), ClusterName::from("c"), "i-1");

        store.save(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap(), state);
        assert_eq!(factory.save_count(), 1);
        assert_eq!(factory.load_count(), 1);
    }

    #[tokio::test]
    async fn memory_store_records_failed_saves_without_persisting() {
        let factory = MemoryCheckpointFactory::new().fail_save(CheckpointError::write_failed("full"));
        let state = PersistedState::new("arn".into(), ClusterName::unset(), "i-1");

        assert!(factory.store().save(&state).await.is_err());
        assert_eq!(factory.save_count(), 1);
        assert!(factory.persisted().is_empty());
    }

    #[tokio::test]
    async fn factory_rejects_incomplete_layouts() {
        let factory = MemoryCheckpointFactory::new();
        assert_matches!(
            factory.open(&CheckpointLayout::new()).await.err(),
            Some(CheckpointError::MissingSlot { .. })
        );
        assert_eq!(factory.open_count(), 1);
    }

    #[tokio::test]
    async fn control_plane_consumes_script_before_fallback() {
        let control_plane = MockControlPlane::accepting("fallback").then(
            ControlPlaneResponse::Respond(Err(ControlPlaneError::other("first"))),
        );
        let request = RegistrationRequest {
            cluster: ClusterName::unset(),
            prior_identity: RegistrationIdentity::unregistered(),
            capabilities: vec![],
        };
        let creds = Credentials::new("a", "b");

        assert!(control_plane.register_node(&request, &creds).await.is_err());
        assert_eq!(
            control_plane.register_node(&request, &creds).await.unwrap(),
            RegistrationIdentity::from("fallback")
        );
        assert_eq!(control_plane.call_count(), 2);
    }

    #[tokio::test]
    async fn call_log_is_shared_between_mocks() {
        let log = CallLog::new();
        let metadata = MockMetadata::new("i-1", "r").with_log(log.clone());
        let credentials = StaticCredentials::default().with_log(log.clone());

        metadata.current_identity().await.unwrap();
        credentials.credentials().await.unwrap();
        assert_eq!(
            log.entries(),
            vec!["metadata.current_identity", "credentials.retrieve"]
        );
    }
}
