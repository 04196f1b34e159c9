use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{Permit, PermitDraft, PermitStatus};

/// Partial update body; only supplied fields are merged into the record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PermitStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_end_date: Option<String>,
}

impl PermitUpdate {
    pub fn status(status: PermitStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Error enumeration for store failures. `Unavailable` is the transient
/// kind; everything else is permanent from the caller's point of view.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("permit store unreachable: {0}")]
    Unavailable(String),
    #[error("permit store rejected the request with status {status}")]
    Rejected { status: u16 },
    #[error("permit store returned an unreadable payload: {0}")]
    Payload(String),
    #[error("permit {0} not found")]
    NotFound(String),
}

impl StoreError {
    /// Whether retrying after a backoff is worthwhile.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Storage abstraction over the external permit collection so the monitor
/// and the HTTP surface can be exercised in isolation.
#[async_trait]
pub trait PermitStore: Send + Sync {
    /// The complete current permit set; the collection is small enough that
    /// no pagination is assumed.
    async fn list_all(&self) -> Result<Vec<Permit>, StoreError>;
    async fn create(&self, draft: &PermitDraft) -> Result<Permit, StoreError>;
    async fn update(&self, id: &str, update: &PermitUpdate) -> Result<Permit, StoreError>;
    /// Idempotent: deleting an id the store no longer holds is a success.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Client for a restdb.io-style collection: JSON bodies, static `x-apikey`
/// header, records addressed as `/rest/scaffolds/{id}`.
pub struct RestDbStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestDbStore {
    pub fn new(config: &crate::config::StoreConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/rest/scaffolds", self.base_url)
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/rest/scaffolds/{id}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        request
            .header("x-apikey", &self.api_key)
            .send()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }

    fn check_status(response: &reqwest::Response) -> Result<(), StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StoreError::Rejected {
                status: status.as_u16(),
            })
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        response
            .json::<T>()
            .await
            .map_err(|err| StoreError::Payload(err.to_string()))
    }
}

impl std::fmt::Debug for RestDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestDbStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PermitStore for RestDbStore {
    async fn list_all(&self) -> Result<Vec<Permit>, StoreError> {
        let response = self.send(self.http.get(self.collection_url())).await?;
        Self::check_status(&response)?;
        Self::decode(response).await
    }

    async fn create(&self, draft: &PermitDraft) -> Result<Permit, StoreError> {
        let response = self
            .send(self.http.post(self.collection_url()).json(draft))
            .await?;
        Self::check_status(&response)?;
        Self::decode(response).await
    }

    async fn update(&self, id: &str, update: &PermitUpdate) -> Result<Permit, StoreError> {
        let response = self
            .send(self.http.put(self.record_url(id)).json(update))
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Self::check_status(&response)?;
        Self::decode(response).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let response = self.send(self.http.delete(self.record_url(id))).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            // Already gone; deletion is idempotent by contract.
            return Ok(());
        }
        Self::check_status(&response)
    }
}
