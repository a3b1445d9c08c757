//! Identity and credential values exchanged during bootstrap.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Current identity of the machine, as reported by the metadata facility.
///
/// Fetched at most once per reconciliation pass. Only `hardware_instance_id`
/// is ever persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// Opaque unique identifier of the underlying instance
    pub hardware_instance_id: String,
    /// Region the instance runs in
    pub region: String,
}

impl NodeIdentity {
    pub fn new(hardware_instance_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            hardware_instance_id: hardware_instance_id.into(),
            region: region.into(),
        }
    }
}

/// Name of the logical cluster a node joins. Empty means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterName(String);

impl ClusterName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The unset cluster name
    pub fn unset() -> Self {
        Self(String::new())
    }

    pub fn is_unset(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ClusterName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Handle issued by the control plane for this node's membership record.
///
/// The empty handle is the "not yet registered" sentinel; an empty prior
/// identity asks the control plane for a fresh registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationIdentity(String);

impl RegistrationIdentity {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// The "not yet registered" sentinel
    pub fn unregistered() -> Self {
        Self(String::new())
    }

    pub fn is_registered(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegistrationIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque feature token reported by the workload engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(String);

impl Capability {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Capability {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Short-lived access credentials.
///
/// `Debug` redacts the secret parts so credentials can sit inside logged
/// structures without leaking.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            expires_at: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: OffsetDateTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the credentials are past their expiry at `now`.
    /// Credentials without an expiry never expire.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Arguments of a single control-plane registration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub cluster: ClusterName,
    /// Identity to confirm, or the unregistered sentinel for a fresh registration
    pub prior_identity: RegistrationIdentity,
    /// Passed through in the order the workload engine reported them
    pub capabilities: Vec<Capability>,
}

/// What the workload engine receives once the node reaches `Ready`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyNode {
    pub hardware_instance_id: String,
    pub registration_identity: RegistrationIdentity,
    pub cluster: ClusterName,
}
