//! Credential providers.
//!
//! Registration needs credentials before it contacts the control plane.
//! Providers are tried in order by `CredentialChain`: explicit environment
//! credentials first, then the instance role from the metadata service.

use async_trait::async_trait;
use fleet_core::effects::{CredentialEffects, MetadataEffects};
use fleet_core::{CredentialError, Credentials};
use std::sync::Arc;
use time::OffsetDateTime;

pub const ACCESS_KEY_ID_VAR: &str = "FLEET_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_VAR: &str = "FLEET_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_VAR: &str = "FLEET_SESSION_TOKEN";

type VarLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Reads static credentials from environment variables
pub struct EnvCredentialProvider {
    lookup: Box<VarLookup>,
}

impl EnvCredentialProvider {
    pub fn new() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    /// Provider backed by an arbitrary variable lookup
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn var(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.is_empty())
    }
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EnvCredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvCredentialProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialEffects for EnvCredentialProvider {
    async fn credentials(&self) -> Result<Credentials, CredentialError> {
        let access_key_id = self
            .var(ACCESS_KEY_ID_VAR)
            .ok_or_else(|| CredentialError::not_found(format!("{ACCESS_KEY_ID_VAR} not set")))?;
        let secret_access_key = self.var(SECRET_ACCESS_KEY_VAR).ok_or_else(|| {
            CredentialError::not_found(format!("{SECRET_ACCESS_KEY_VAR} not set"))
        })?;

        let mut creds = Credentials::new(access_key_id, secret_access_key);
        if let Some(token) = self.var(SESSION_TOKEN_VAR) {
            creds = creds.with_session_token(token);
        }
        Ok(creds)
    }
}

/// Credentials of the instance role, read from the metadata service
pub struct InstanceRoleCredentialProvider {
    metadata: Arc<dyn MetadataEffects>,
}

impl InstanceRoleCredentialProvider {
    pub fn new(metadata: Arc<dyn MetadataEffects>) -> Self {
        Self { metadata }
    }
}

#[async_trait]
impl CredentialEffects for InstanceRoleCredentialProvider {
    async fn credentials(&self) -> Result<Credentials, CredentialError> {
        let creds = self.metadata.credentials().await?;
        if creds.is_expired_at(OffsetDateTime::now_utc()) {
            return Err(CredentialError::Expired);
        }
        Ok(creds)
    }
}

/// Tries providers in order; the first success wins
#[derive(Default)]
pub struct CredentialChain {
    providers: Vec<Arc<dyn CredentialEffects>>,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Arc<dyn CredentialEffects>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Environment credentials, then the instance role.
    pub fn standard(metadata: Arc<dyn MetadataEffects>) -> Self {
        Self::new()
            .with_provider(Arc::new(EnvCredentialProvider::new()))
            .with_provider(Arc::new(InstanceRoleCredentialProvider::new(metadata)))
    }
}

#[async_trait]
impl CredentialEffects for CredentialChain {
    async fn credentials(&self) -> Result<Credentials, CredentialError> {
        let mut last_error = CredentialError::not_found("no credential providers configured");

        for (index, provider) in self.providers.iter().enumerate() {
            match provider.credentials().await {
                Ok(creds) => return Ok(creds),
                Err(e) => {
                    tracing::debug!(provider = index, error = %e, "credential provider failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
