//! REST adapter for the certificate authority seam.
//!
//! Speaks the CA service's JSON surface: `POST /api/v1/enroll` with the
//! label/secret as basic auth, `POST /api/v1/identities` for
//! registration with the registrar's certificate attached. Certificate
//! and key bytes travel hex-encoded inside the JSON envelope.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use convene_core::identity::{EnrollmentMaterial, Identity, IdentityRole};

use crate::ports::{CaApiError, CertificateAuthorityApi, RegistrationRequest};

/// HTTP client for one CA endpoint.
pub struct HttpCa {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCa {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

// ── Wire shapes ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EnrollBody<'a> {
    label: &'a str,
}

#[derive(Deserialize)]
struct EnrollResult {
    /// Hex-encoded PEM certificate.
    certificate: String,
    /// Hex-encoded private key.
    private_key: String,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    label: &'a str,
    affiliation: &'a str,
    #[serde(rename = "type")]
    role: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RegisterResult {
    secret: String,
}

#[derive(Deserialize)]
struct CaEnvelope<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<CaServiceError>,
}

#[derive(Deserialize)]
struct CaServiceError {
    #[allow(dead_code)]
    code: i64,
    message: String,
}

impl<T> CaEnvelope<T> {
    fn into_result(self, deny: impl Fn(String) -> CaApiError) -> Result<T, CaApiError> {
        if self.success {
            if let Some(result) = self.result {
                return Ok(result);
            }
        }
        let message = self
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "CA reported failure without detail".to_string());
        Err(deny(message))
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> CaApiError {
    CaApiError::Unreachable(format!("failed to reach CA at {url}: {err}"))
}

// ── Port implementation ───────────────────────────────────────────────────────

#[async_trait]
impl CertificateAuthorityApi for HttpCa {
    async fn enroll(&self, label: &str, secret: &str) -> Result<EnrollmentMaterial, CaApiError> {
        let url = self.url("/api/v1/enroll");
        let response = self
            .client
            .post(&url)
            .basic_auth(label, Some(secret))
            .json(&EnrollBody { label })
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CaApiError::AuthenticationFailed(format!(
                "secret rejected for {label}"
            )));
        }

        let envelope: CaEnvelope<EnrollResult> = response
            .json()
            .await
            .map_err(|e| transport_error(&url, e))?;
        let result = envelope.into_result(CaApiError::AuthenticationFailed)?;

        let certificate = hex::decode(&result.certificate)
            .map_err(|e| CaApiError::AuthenticationFailed(format!("bad certificate encoding: {e}")))?;
        let private_key = hex::decode(&result.private_key)
            .map_err(|e| CaApiError::AuthenticationFailed(format!("bad key encoding: {e}")))?;
        tracing::debug!(label, "enrollment material received from CA");
        Ok(EnrollmentMaterial::new(certificate.into(), private_key))
    }

    async fn register(
        &self,
        registrar: &Identity,
        request: &RegistrationRequest,
    ) -> Result<String, CaApiError> {
        let url = self.url("/api/v1/identities");
        let role = match request.role {
            IdentityRole::Admin => "admin",
            IdentityRole::Client => "client",
        };
        let response = self
            .client
            .post(&url)
            .header("x-registrar", registrar.label.as_str())
            .header("x-registrar-cert", hex::encode(&registrar.certificate))
            .json(&RegisterBody {
                label: &request.label,
                affiliation: &request.affiliation,
                role,
                secret: request.secret_hint.as_deref(),
            })
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CaApiError::AuthenticationFailed(format!(
                "registrar {} not accepted by CA",
                registrar.label
            )));
        }

        let envelope: CaEnvelope<RegisterResult> = response
            .json()
            .await
            .map_err(|e| transport_error(&url, e))?;
        let result = envelope.into_result(CaApiError::Denied)?;
        tracing::debug!(label = %request.label, "registration accepted by CA");
        Ok(result.secret)
    }
}
