use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

/// Provisioning state of a single access key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Active,
    Expired,
}

#[derive(Debug, Clone)]
struct AccessKey {
    user: String,
    status: KeyStatus,
}

/// Answer of a lookup. The wire contract is inherited from the field
/// tooling: a valid key echoes back, anything else gets a marker string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyVerdict {
    Valid,
    Expired,
    Invalid,
}

#[derive(Debug, thiserror::Error)]
#[error("malformed access key entry '{0}' (expected key:user[:expired])")]
pub struct AccessKeyParseError(String);

/// Immutable lookup table of provisioned access keys, loaded once at
/// startup from configuration.
#[derive(Debug, Default, Clone)]
pub struct AccessKeyRegistry {
    keys: HashMap<String, AccessKey>,
}

impl AccessKeyRegistry {
    /// Parse a comma-separated `key:user[:expired]` table. An empty string
    /// yields an empty registry (every lookup answers `Invalid`).
    pub fn from_entries(raw: &str) -> Result<Self, AccessKeyParseError> {
        let mut keys = HashMap::new();

        for entry in raw.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let mut parts = entry.split(':');
            let key = parts.next().unwrap_or_default();
            let user = parts.next().unwrap_or_default();
            let status = match parts.next() {
                None => KeyStatus::Active,
                Some("expired") => KeyStatus::Expired,
                Some(_) => return Err(AccessKeyParseError(entry.to_string())),
            };

            if key.is_empty() || user.is_empty() || parts.next().is_some() {
                return Err(AccessKeyParseError(entry.to_string()));
            }

            keys.insert(
                key.to_string(),
                AccessKey {
                    user: user.to_string(),
                    status,
                },
            );
        }

        Ok(Self { keys })
    }

    pub fn verdict(&self, key: &str) -> KeyVerdict {
        match self.keys.get(key) {
            Some(record) if record.status == KeyStatus::Active => KeyVerdict::Valid,
            Some(_) => KeyVerdict::Expired,
            None => KeyVerdict::Invalid,
        }
    }

    /// Registered user for a key, regardless of its status.
    pub fn user_of(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(|record| record.user.as_str())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    #[serde(default)]
    key: Option<String>,
}

/// Router builder for the key-verification lookup used by field tooling.
pub fn key_router(registry: Arc<AccessKeyRegistry>) -> Router {
    Router::new()
        .route("/api/v1/keys/verify", post(verify_handler))
        .with_state(registry)
}

async fn verify_handler(
    State(registry): State<Arc<AccessKeyRegistry>>,
    payload: Option<Json<VerifyRequest>>,
) -> Json<String> {
    let key = payload.and_then(|Json(request)| request.key);

    let answer = match key {
        Some(key) => match registry.verdict(&key) {
            KeyVerdict::Valid => key,
            KeyVerdict::Expired => "expirado".to_string(),
            KeyVerdict::Invalid => "invalid".to_string(),
        },
        None => "invalid".to_string(),
    };

    Json(answer)
}
