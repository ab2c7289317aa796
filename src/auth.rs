//! Service-account credentials and the OAuth2 token exchange.
//!
//! A key is read from the JSON key file downloaded from the Google Cloud
//! console. When that file does not exist the same fields are read from
//! `FIREBASE_*` environment variables instead. The key is then exchanged
//! once for a bearer token via the JWT bearer grant (RFC 7523).

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

pub const PROJECT_ID_ENV: &str = "FIREBASE_PROJECT_ID";
pub const PRIVATE_KEY_ID_ENV: &str = "FIREBASE_PRIVATE_KEY_ID";
pub const PRIVATE_KEY_ENV: &str = "FIREBASE_PRIVATE_KEY";
pub const CLIENT_EMAIL_ENV: &str = "FIREBASE_CLIENT_EMAIL";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to read credential file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential file is not a valid service-account key: {0}")]
    Json(#[from] serde_json::Error),

    #[error("credential has type '{0}', expected 'service_account'")]
    WrongType(String),

    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("invalid service-account private key: {0}")]
    Key(#[source] jsonwebtoken::errors::Error),

    #[error("token exchange failed: {0}")]
    Token(String),
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service-account key file that the uploader needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

// Keeps the private key out of logs.
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"[REDACTED]")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(content: &str) -> Result<Self, AuthError> {
        let key: ServiceAccountKey = serde_json::from_str(content)?;
        match key.key_type.as_deref() {
            None | Some("service_account") => Ok(key),
            Some(other) => Err(AuthError::WrongType(other.to_string())),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AuthError> {
        let path_ref = path.as_ref();
        let content = fs::read_to_string(path_ref).map_err(|e| {
            error!(error = ?e, credentials = ?path_ref, "Failed to read credential file");
            AuthError::Io {
                path: path_ref.to_path_buf(),
                source: e,
            }
        })?;
        let key = Self::from_json(&content)?;
        info!(
            project_id = %key.project_id,
            client_email = %key.client_email,
            "Loaded service-account key from file"
        );
        Ok(key)
    }

    /// Builds a key from `FIREBASE_*` environment variables. Escaped `\n`
    /// sequences in the private key are turned into real newlines.
    pub fn from_env() -> Result<Self, AuthError> {
        let var = |name: &'static str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or(AuthError::MissingEnv(name))
        };

        let project_id = var(PROJECT_ID_ENV)?;
        let private_key = var(PRIVATE_KEY_ENV)?.replace("\\n", "\n");
        let client_email = var(CLIENT_EMAIL_ENV)?;
        let private_key_id = var(PRIVATE_KEY_ID_ENV).ok();

        info!(project_id = %project_id, "Loaded service-account key from environment");
        Ok(ServiceAccountKey {
            key_type: Some("service_account".to_string()),
            project_id,
            private_key_id,
            private_key,
            client_email,
            token_uri: default_token_uri(),
        })
    }

    /// Reads the key file when it exists, otherwise falls back to the environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AuthError> {
        let path_ref = path.as_ref();
        if path_ref.exists() {
            return Self::from_file(path_ref);
        }
        warn!(
            credentials = ?path_ref,
            "Credential file not found, reading service account from environment"
        );
        Self::from_env().map_err(|e| {
            error!(error = %e, "No usable service-account credential");
            e
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs the RS256 assertion presented to the token endpoint.
pub fn build_assertion(key: &ServiceAccountKey, issued_at: i64) -> Result<String, AuthError> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let claims = Claims {
        iss: key.client_email.clone(),
        scope: DATASTORE_SCOPE.to_string(),
        aud: key.token_uri.clone(),
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };

    let signing_key =
        EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(AuthError::Key)?;
    encode(&header, &claims, &signing_key).map_err(AuthError::Key)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// A bearer token for the document store.
#[derive(Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_in: Option<u64>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Exchanges a signed assertion for an access token.
pub async fn fetch_access_token(
    http: &reqwest::Client,
    key: &ServiceAccountKey,
) -> Result<AccessToken, AuthError> {
    let assertion = build_assertion(key, Utc::now().timestamp())?;
    info!(token_uri = %key.token_uri, "Requesting access token");

    let response = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| {
            error!(error = ?e, "Token request could not be sent");
            AuthError::Token(e.to_string())
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(status = status.as_u16(), body = %body, "Token endpoint rejected the assertion");
        return Err(AuthError::Token(format!("status {}: {}", status.as_u16(), body)));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| AuthError::Token(format!("unreadable token response: {e}")))?;
    info!(expires_in = ?token.expires_in, "Access token acquired");
    Ok(AccessToken {
        value: token.access_token,
        expires_in: token.expires_in,
    })
}
