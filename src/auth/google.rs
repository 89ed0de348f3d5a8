use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::AppError;

const TOKENINFO_ENDPOINT: &str = "https://oauth2.googleapis.com/tokeninfo";

/// GoogleIdentity
///
/// The verified facts taken from a Google ID token.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleIdentity {
    pub email: String,
    // The stable Google account id (`sub`).
    pub subject: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// IdentityVerifier
///
/// Checks an ID-token credential and returns the identity it vouches for.
/// Rejected or mis-addressed tokens are `InvalidCredential`; a provider outage is
/// `Upstream`; a missing client id is `Configuration`.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<GoogleIdentity, AppError>;
}

pub type IdentityState = Arc<dyn IdentityVerifier>;

/// GoogleTokenInfoVerifier
///
/// Verifies ID tokens through Google's `tokeninfo` endpoint, which checks the
/// signature and expiry. The audience and `email_verified` are checked here.
#[derive(Clone)]
pub struct GoogleTokenInfoVerifier {
    http: reqwest::Client,
    client_id: Option<String>,
    endpoint: String,
}

impl GoogleTokenInfoVerifier {
    pub fn new(http: reqwest::Client, client_id: Option<String>) -> Self {
        Self {
            http,
            client_id,
            endpoint: TOKENINFO_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    #[serde(default)]
    aud: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
    // Google sends these as strings ("true", "1700000000"); tolerate either form.
    #[serde(default)]
    email_verified: Option<Value>,
    #[serde(default)]
    exp: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn as_i64(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenInfoVerifier {
    async fn verify(&self, credential: &str) -> Result<GoogleIdentity, AppError> {
        let client_id = self.client_id.as_deref().ok_or_else(|| {
            AppError::Configuration("GOOGLE_CLIENT_ID is not configured".to_string())
        })?;

        debug!("validating Google credential with tokeninfo endpoint");

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("id_token", credential)])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP error contacting Google tokeninfo endpoint");
                AppError::Upstream(format!("Google token verification unavailable: {e}"))
            })?;

        let status = response.status();
        match status {
            s if s.is_success() => {}
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                warn!(http_status = %status, "Google rejected the credential");
                return Err(AppError::InvalidCredential(
                    "Invalid Google credential".to_string(),
                ));
            }
            _ => {
                error!(http_status = %status, "Google tokeninfo returned an error status");
                return Err(AppError::Upstream(format!(
                    "Google token verification failed with status {status}"
                )));
            }
        }

        let info: TokenInfo = response.json().await.map_err(|e| {
            error!(error = %e, "failed to parse Google tokeninfo response");
            AppError::Upstream(format!("Unreadable Google tokeninfo response: {e}"))
        })?;

        if info.aud.as_deref() != Some(client_id) {
            warn!("Google credential was issued for a different client");
            return Err(AppError::InvalidCredential(
                "Google credential was not issued for this application".to_string(),
            ));
        }

        if let Some(exp) = as_i64(info.exp.as_ref()) {
            if exp < Utc::now().timestamp() {
                return Err(AppError::InvalidCredential(
                    "Google credential has expired".to_string(),
                ));
            }
        }

        if !truthy(info.email_verified.as_ref()) {
            return Err(AppError::InvalidCredential(
                "Google account email is not verified".to_string(),
            ));
        }

        match (info.email, info.sub) {
            (Some(email), Some(subject)) if !email.is_empty() && !subject.is_empty() => {
                Ok(GoogleIdentity {
                    email: email.to_lowercase(),
                    subject,
                    name: info.name,
                    picture: info.picture,
                })
            }
            _ => Err(AppError::InvalidCredential(
                "Google credential is missing required fields".to_string(),
            )),
        }
    }
}

/// StaticIdentityVerifier
///
/// In-process verifier with a fixed credential table. Unknown credentials are
/// rejected as invalid; `unavailable()` simulates a provider outage.
#[derive(Clone, Default)]
pub struct StaticIdentityVerifier {
    identities: HashMap<String, GoogleIdentity>,
    unavailable: bool,
}

impl StaticIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, credential: &str, identity: GoogleIdentity) -> Self {
        self.identities.insert(credential.to_string(), identity);
        self
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, credential: &str) -> Result<GoogleIdentity, AppError> {
        if self.unavailable {
            return Err(AppError::Upstream(
                "Google token verification unavailable".to_string(),
            ));
        }
        self.identities
            .get(credential)
            .cloned()
            .ok_or_else(|| AppError::InvalidCredential("Invalid Google credential".to_string()))
    }
}
