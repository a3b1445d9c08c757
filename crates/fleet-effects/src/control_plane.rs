//! HTTP control-plane client.
//!
//! Registration is a single JSON POST. Failures are mapped into the closed
//! `ControlPlaneError` set here, at the edge, so the classifier never needs to
//! look at status codes or message text.

use async_trait::async_trait;
use fleet_core::effects::ControlPlaneEffects;
use fleet_core::{
    Capability, ControlPlaneError, Credentials, RegistrationIdentity, RegistrationRequest,
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REGISTER_PATH: &str = "v1/nodes/register";

/// Message fragment the control plane uses when a registered node's instance
/// class no longer matches its registration.
pub const INSTANCE_TYPE_CHANGED_MESSAGE: &str = "instance type changes are not supported";

const INVALID_PARAMETER_CODE: &str = "InvalidParameterException";
const ATTRIBUTE_VALIDATION_CODE: &str = "AttributeValidation";

const MAX_CAPABILITY_LEN: usize = 128;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterNodeBody<'a> {
    cluster: &'a str,
    registration_identity: &'a str,
    capabilities: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterNodeResponse {
    registration_identity: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Control-plane client speaking JSON over HTTP
#[derive(Debug, Clone)]
pub struct HttpControlPlaneClient {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpControlPlaneClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ControlPlaneError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ControlPlaneError::transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    fn register_url(&self) -> String {
        format!("{}/{REGISTER_PATH}", self.endpoint.trim_end_matches('/'))
    }
}

/// Reject capability tokens the control plane would refuse as attributes.
pub fn validate_capabilities(capabilities: &[Capability]) -> Result<(), ControlPlaneError> {
    for capability in capabilities {
        let token = capability.as_str();
        if token.is_empty() || token.len() > MAX_CAPABILITY_LEN {
            return Err(ControlPlaneError::invalid_attribute(format!(
                "capability '{token}' must be 1 to {MAX_CAPABILITY_LEN} characters"
            )));
        }
        if let Some(bad) = token
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/' | ':' | '@')))
        {
            return Err(ControlPlaneError::invalid_attribute(format!(
                "capability '{token}' contains invalid character '{bad}'"
            )));
        }
    }
    Ok(())
}

/// Body of a failed response, or empty if it could not be read. An empty
/// body leaves classification to the status code alone.
fn error_body<E: std::fmt::Display>(status: StatusCode, body: Result<String, E>) -> String {
    match body {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(%status, error = %e, "failed to read error response body");
            String::new()
        }
    }
}

/// Map a non-success response onto the error taxonomy.
pub fn map_error_response(status: StatusCode, body: &str) -> ControlPlaneError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = if parsed.message.is_empty() {
        format!("{status}: {body}")
    } else {
        parsed.message.clone()
    };

    if message.to_lowercase().contains(INSTANCE_TYPE_CHANGED_MESSAGE) {
        return ControlPlaneError::instance_type_changed(message);
    }
    match parsed.code.as_str() {
        INVALID_PARAMETER_CODE => return ControlPlaneError::invalid_parameter(message),
        ATTRIBUTE_VALIDATION_CODE => return ControlPlaneError::invalid_attribute(message),
        _ => {}
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        ControlPlaneError::Throttled(message)
    } else if status.is_client_error() {
        ControlPlaneError::tagged(false, message)
    } else if status.is_server_error() {
        ControlPlaneError::tagged(true, message)
    } else {
        ControlPlaneError::other(message)
    }
}

#[async_trait]
impl ControlPlaneEffects for HttpControlPlaneClient {
    async fn register_node(
        &self,
        request: &RegistrationRequest,
        credentials: &Credentials,
    ) -> Result<RegistrationIdentity, ControlPlaneError> {
        validate_capabilities(&request.capabilities)?;

        let body = RegisterNodeBody {
            cluster: request.cluster.as_str(),
            registration_identity: request.prior_identity.as_str(),
            capabilities: request.capabilities.iter().map(Capability::as_str).collect(),
        };

        let mut builder = self
            .client
            .post(self.register_url())
            .basic_auth(&credentials.access_key_id, Some(&credentials.secret_access_key))
            .json(&body);
        if let Some(token) = &credentials.session_token {
            builder = builder.header("x-fleet-session-token", token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ControlPlaneError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = error_body(status, response.text().await);
            return Err(map_error_response(status, &text));
        }

        let parsed: RegisterNodeResponse = response
            .json()
            .await
            .map_err(|e| ControlPlaneError::other(format!("malformed registration response: {e}")))?;
        if parsed.registration_identity.is_empty() {
            return Err(ControlPlaneError::other(
                "control plane returned an empty registration identity",
            ));
        }

        Ok(RegistrationIdentity::new(parsed.registration_identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn caps(tokens: &[&str]) -> Vec<Capability> {
        tokens.iter().map(|t| Capability::from(*t)).collect()
    }

    #[test]
    fn accepts_well_formed_capabilities() {
        let capabilities = caps(&[
            "com.fleet.capability.runtime-api.1.17",
            "com.fleet.capability.logging-driver/json-file",
        ]);
        assert!(validate_capabilities(&capabilities).is_ok());
    }

    #[test]
    fn rejects_malformed_capabilities() {
        assert_matches!(
            validate_capabilities(&caps(&[""])),
            Err(ControlPlaneError::InvalidAttribute(_))
        );
        assert_matches!(
            validate_capabilities(&caps(&["has space"])),
            Err(ControlPlaneError::InvalidAttribute(_))
        );
        let long = "a".repeat(MAX_CAPABILITY_LEN + 1);
        assert_matches!(
            validate_capabilities(&caps(&[long.as_str()])),
            Err(ControlPlaneError::InvalidAttribute(_))
        );
    }

    #[test]
    fn instance_type_change_is_recognized_by_message() {
        let body = r#"{"code":"InvalidParameterException","message":"Container instance type changes are not supported."}"#;
        assert_matches!(
            map_error_response(StatusCode::BAD_REQUEST, body),
            ControlPlaneError::InstanceTypeChanged(_)
        );
    }

    #[test]
    fn error_codes_map_to_kinds() {
        assert_matches!(
            map_error_response(
                StatusCode::BAD_REQUEST,
                r#"{"code":"InvalidParameterException","message":"bad cluster"}"#
            ),
            ControlPlaneError::InvalidParameter(m) if m == "bad cluster"
        );
        assert_matches!(
            map_error_response(
                StatusCode::BAD_REQUEST,
                r#"{"code":"AttributeValidation","message":"bad attr"}"#
            ),
            ControlPlaneError::InvalidAttribute(_)
        );
    }

    #[test]
    fn status_classes_map_to_tags() {
        assert_matches!(
            map_error_response(StatusCode::TOO_MANY_REQUESTS, ""),
            ControlPlaneError::Throttled(_)
        );
        assert_matches!(
            map_error_response(StatusCode::FORBIDDEN, "denied"),
            ControlPlaneError::Tagged {
                retryable: false,
                ..
            }
        );
        assert_matches!(
            map_error_response(StatusCode::SERVICE_UNAVAILABLE, "busy"),
            ControlPlaneError::Tagged {
                retryable: true,
                ..
            }
        );
    }

    #[test]
    fn register_url_is_joined() {
        let client =
            HttpControlPlaneClient::new("https://fleet.example.com/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            client.register_url(),
            "https://fleet.example.com/v1/nodes/register"
        );
    }

    #[test]
    fn unreadable_error_body_falls_back_to_status() {
        let body = error_body(StatusCode::SERVICE_UNAVAILABLE, Err("connection reset"));
        assert!(body.is_empty());
        assert_matches!(
            map_error_response(StatusCode::SERVICE_UNAVAILABLE, &body),
            ControlPlaneError::Tagged {
                retryable: true,
                ..
            }
        );
        assert_eq!(
            error_body::<&str>(StatusCode::BAD_REQUEST, Ok("bad".to_string())),
            "bad"
        );
    }
}
