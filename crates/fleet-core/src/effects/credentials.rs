//! Access credential retrieval.

use crate::errors::CredentialError;
use crate::identity::Credentials;
use async_trait::async_trait;

/// Source of the credentials used to authenticate registration.
#[async_trait]
pub trait CredentialEffects: Send + Sync {
    async fn credentials(&self) -> Result<Credentials, CredentialError>;
}
