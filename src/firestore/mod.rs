#![doc = "Firestore integration: implements the core DocumentStore contract against the Firestore REST API."]
//
//! # Firestore client
//!
//! [`FirestoreClient`] is the production [`DocumentStore`]. It is built once
//! per run by [`FirestoreClient::connect`], which performs the only
//! authentication step, and then reused for every insert.
//!
//! - Documents are created with
//!   `POST {base}/projects/{project}/databases/{database}/documents/{collection}`
//!   and no `documentId`, so Firestore picks the id. Path ids are
//!   percent-encoded segment by segment.
//! - When `FIRESTORE_EMULATOR_HOST` is set the client talks plain HTTP to the
//!   emulator with the `owner` token and skips the credential exchange.

pub mod value;

use anyhow::{Context, Result};
use async_trait::async_trait;
use outfit_rules_core::collection::CollectionId;
use outfit_rules_core::contract::{DocumentStore, StoreError, StoredDocument};
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use crate::auth::{fetch_access_token, ServiceAccountKey};
use crate::load_config::UploaderConfig;

pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const EMULATOR_TOKEN: &str = "owner";
const EMULATOR_PROJECT_ENVS: [&str; 2] = ["FIREBASE_PROJECT_ID", "GCLOUD_PROJECT"];

pub struct FirestoreClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    database: String,
    token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedDocument {
    name: String,
    #[serde(default)]
    create_time: Option<String>,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    message: String,
}

impl FirestoreClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        database: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        FirestoreClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            database: database.into(),
            token: token.into(),
        }
    }

    /// Authenticates once and returns a client ready for inserts.
    pub async fn connect(config: &UploaderConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        if let Some(host) = &config.emulator_host {
            let project_id = config
                .project_id
                .clone()
                .or_else(|| {
                    EMULATOR_PROJECT_ENVS
                        .iter()
                        .find_map(|k| std::env::var(k).ok().filter(|v| !v.is_empty()))
                })
                .context("A project id is required with FIRESTORE_EMULATOR_HOST (set --project-id or FIREBASE_PROJECT_ID)")?;
            info!(emulator_host = %host, project_id = %project_id, "Using Firestore emulator");
            return Ok(Self::new(
                http,
                format!("http://{host}/v1"),
                project_id,
                config.database.clone(),
                EMULATOR_TOKEN,
            ));
        }

        let key = ServiceAccountKey::load(&config.credentials)?;
        let token = fetch_access_token(&http, &key).await?;
        let project_id = config
            .project_id
            .clone()
            .unwrap_or_else(|| key.project_id.clone());
        info!(project_id = %project_id, database = %config.database, "Initialized FirestoreClient");

        Ok(Self::new(
            http,
            FIRESTORE_BASE_URL,
            project_id,
            config.database.clone(),
            token.value,
        ))
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Documents endpoint of `collection`. Every id is pushed as its own
    /// percent-encoded path segment.
    pub fn collection_url(&self, collection: &CollectionId) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            StoreError::Transport(format!("invalid base url '{}': {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                StoreError::Transport(format!("base url '{}' cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend([
                "projects",
                self.project_id.as_str(),
                "databases",
                self.database.as_str(),
                "documents",
                collection.as_str(),
            ]);
        Ok(url)
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn add_document(
        &self,
        collection: &CollectionId,
        document: &Map<String, Value>,
    ) -> Result<StoredDocument, StoreError> {
        let fields = value::encode_fields(document).map_err(|e| {
            error!(error = %e, "Document cannot be encoded for Firestore");
            StoreError::Encode(e.to_string())
        })?;
        let body = json!({ "fields": fields });
        let url = self.collection_url(collection)?;
        debug!(url = %url, body = %body, "Creating document");

        let response = self
            .http
            .post(url.clone())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, url = %url, "Request to Firestore failed");
                StoreError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleErrorBody>(&raw)
                .map(|b| b.error.message)
                .unwrap_or(raw);
            error!(status = status.as_u16(), message = %message, "Firestore rejected document");
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreatedDocument = response.json().await.map_err(|e| {
            error!(error = ?e, "Unreadable Firestore response");
            StoreError::Decode(e.to_string())
        })?;
        let id = created
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        info!(collection = %collection, document_id = %id, "Document created");

        Ok(StoredDocument {
            name: created.name,
            id,
            create_time: created.create_time,
        })
    }
}
