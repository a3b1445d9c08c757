//! Instance metadata service client.
//!
//! The client is split in two: `MetadataTransport` performs a single GET
//! against a metadata path, and `MetadataClient` turns responses into domain
//! values. Tests substitute the transport; production uses `ReqwestTransport`.

use async_trait::async_trait;
use fleet_core::effects::MetadataEffects;
use fleet_core::{Credentials, MetadataError, NodeIdentity};
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;

/// Default address of the link-local metadata service.
pub const DEFAULT_METADATA_ENDPOINT: &str = "http://169.254.169.254";

/// Signed identity document of the running instance.
pub const INSTANCE_IDENTITY_DOCUMENT_RESOURCE: &str = "latest/dynamic/instance-identity/document";

/// Listing of the instance role; append a role name to fetch its credentials.
pub const SECURITY_CREDENTIALS_RESOURCE: &str = "latest/meta-data/iam/security-credentials/";

const CREDENTIALS_SUCCESS_CODE: &str = "Success";

/// A single GET against the metadata service.
#[async_trait]
pub trait MetadataTransport: Send + Sync {
    /// Fetch the body at `path` (relative to the service root).
    async fn get(&self, path: &str) -> Result<String, MetadataError>;
}

/// HTTP transport for the metadata service
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base_url: String,
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MetadataError::unreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl MetadataTransport for ReqwestTransport {
    async fn get(&self, path: &str) -> Result<String, MetadataError> {
        let url = self.url_for(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MetadataError::unreachable(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(path, status = status.as_u16(), "metadata request failed");
            return Err(MetadataError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| MetadataError::malformed(format!("reading body of {path}: {e}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceIdentityDocument {
    instance_id: String,
    region: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoleCredentials {
    code: String,
    access_key_id: String,
    secret_access_key: String,
    token: String,
    #[serde(with = "time::serde::rfc3339")]
    expiration: OffsetDateTime,
}

/// Metadata client over an arbitrary transport
#[derive(Debug, Clone)]
pub struct MetadataClient<T> {
    transport: T,
}

impl<T: MetadataTransport> MetadataClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    async fn role_name(&self) -> Result<String, MetadataError> {
        let listing = self.transport.get(SECURITY_CREDENTIALS_RESOURCE).await?;
        listing
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| MetadataError::rejected("no instance role attached"))
    }
}

impl MetadataClient<ReqwestTransport> {
    /// Client for the metadata service at `endpoint`.
    pub fn http(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, MetadataError> {
        Ok(Self::new(ReqwestTransport::new(endpoint, timeout)?))
    }
}

#[async_trait]
impl<T: MetadataTransport> MetadataEffects for MetadataClient<T> {
    async fn current_identity(&self) -> Result<NodeIdentity, MetadataError> {
        let body = self
            .transport
            .get(INSTANCE_IDENTITY_DOCUMENT_RESOURCE)
            .await?;
        let doc: InstanceIdentityDocument = serde_json::from_str(&body)
            .map_err(|e| MetadataError::malformed(format!("instance identity document: {e}")))?;

        if doc.instance_id.is_empty() {
            return Err(MetadataError::malformed(
                "instance identity document has an empty instanceId",
            ));
        }

        Ok(NodeIdentity::new(doc.instance_id, doc.region))
    }

    async fn credentials(&self) -> Result<Credentials, MetadataError> {
        let role = self.role_name().await?;
        let body = self
            .transport
            .get(&format!("{SECURITY_CREDENTIALS_RESOURCE}{role}"))
            .await?;
        let creds: RoleCredentials = serde_json::from_str(&body)
            .map_err(|e| MetadataError::malformed(format!("role credentials: {e}")))?;

        if creds.code != CREDENTIALS_SUCCESS_CODE {
            return Err(MetadataError::rejected(format!(
                "credentials for role '{role}' reported status {}",
                creds.code
            )));
        }

        Ok(Credentials::new(creds.access_key_id, creds.secret_access_key)
            .with_session_token(creds.token)
            .with_expiry(creds.expiration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeTransport {
        responses: HashMap<String, Result<String, MetadataError>>,
    }

    impl FakeTransport {
        fn with(mut self, path: &str, response: Result<String, MetadataError>) -> Self {
            self.responses.insert(path.to_string(), response);
            self
        }
    }

    #[async_trait]
    impl MetadataTransport for FakeTransport {
        async fn get(&self, path: &str) -> Result<String, MetadataError> {
            self.responses.get(path).cloned().unwrap_or_else(|| {
                Err(MetadataError::Status {
                    path: path.to_string(),
                    status: 404,
                })
            })
        }
    }

    const IDENTITY_DOC: &str = r#"{
        "privateIp": "172.1.1.1",
        "availabilityZone": "us-east-1a",
        "version": "2010-08-31",
        "region": "us-east-1",
        "accountId": "012345678901",
        "instanceId": "i-01234567",
        "imageId": "ami-12345678",
        "instanceType": "t2.micro",
        "architecture": "x86_64"
    }"#;

    fn role_credentials(code: &str) -> String {
        format!(
            r#"{{
                "Code": "{code}",
                "LastUpdated": "2024-01-01T00:00:00Z",
                "Type": "AWS-HMAC",
                "AccessKeyId": "ACCESSKEY",
                "SecretAccessKey": "SECRETKEY",
                "Token": "TOKEN",
                "Expiration": "2030-01-01T02:00:00Z"
            }}"#
        )
    }

    #[tokio::test]
    async fn reads_identity_document() {
        let transport = FakeTransport::default()
            .with(INSTANCE_IDENTITY_DOCUMENT_RESOURCE, Ok(IDENTITY_DOC.to_string()));
        let client = MetadataClient::new(transport);

        let identity = client.current_identity().await.unwrap();
        assert_eq!(identity.hardware_instance_id, "i-01234567");
        assert_eq!(identity.region, "us-east-1");
    }

    #[tokio::test]
    async fn identity_error_propagates() {
        let transport = FakeTransport::default().with(
            INSTANCE_IDENTITY_DOCUMENT_RESOURCE,
            Err(MetadataError::unreachable("something broke")),
        );
        let client = MetadataClient::new(transport);

        assert_matches!(
            client.current_identity().await,
            Err(MetadataError::Unreachable(_))
        );
    }

    #[tokio::test]
    async fn malformed_identity_document_is_rejected() {
        let transport = FakeTransport::default()
            .with(INSTANCE_IDENTITY_DOCUMENT_RESOURCE, Ok("not json".to_string()));
        let client = MetadataClient::new(transport);

        assert_matches!(
            client.current_identity().await,
            Err(MetadataError::Malformed(_))
        );
    }

    #[tokio::test]
    async fn fetches_role_credentials_in_two_steps() {
        let transport = FakeTransport::default()
            .with(SECURITY_CREDENTIALS_RESOURCE, Ok("test-role\n".to_string()))
            .with(
                &format!("{SECURITY_CREDENTIALS_RESOURCE}test-role"),
                Ok(role_credentials("Success")),
            );
        let client = MetadataClient::new(transport);

        let creds = client.credentials().await.unwrap();
        assert_eq!(creds.access_key_id, "ACCESSKEY");
        assert_eq!(creds.secret_access_key, "SECRETKEY");
        assert_eq!(creds.session_token.as_deref(), Some("TOKEN"));
        assert!(creds.expires_at.is_some());
    }

    #[tokio::test]
    async fn non_success_credentials_code_is_rejected() {
        let transport = FakeTransport::default()
            .with(SECURITY_CREDENTIALS_RESOURCE, Ok("test-role".to_string()))
            .with(
                &format!("{SECURITY_CREDENTIALS_RESOURCE}test-role"),
                Ok(role_credentials("Failure")),
            );
        let client = MetadataClient::new(transport);

        assert_matches!(client.credentials().await, Err(MetadataError::Rejected(_)));
    }

    #[tokio::test]
    async fn missing_role_is_rejected() {
        let transport =
            FakeTransport::default().with(SECURITY_CREDENTIALS_RESOURCE, Ok("\n".to_string()));
        let client = MetadataClient::new(transport);

        assert_matches!(client.credentials().await, Err(MetadataError::Rejected(_)));
    }

    #[test]
    fn url_joins_without_double_slash() {
        let transport =
            ReqwestTransport::new("http://169.254.169.254/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            transport.url_for(INSTANCE_IDENTITY_DOCUMENT_RESOURCE),
            "http://169.254.169.254/latest/dynamic/instance-identity/document"
        );
    }
}
