//! REST access for seeding store snapshots.
//!
//! Stores only need `GET` + JSON, so the seam is a single-method trait; tests
//! substitute an in-memory implementation.

use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::types::{ApiErrorBody, ClientConfig};
use tracing::{debug, warn};

use crate::error::ClientError;

#[async_trait]
pub trait Api: Send + Sync {
    /// `GET {base}{path}` and decode the body as JSON.
    async fn get_json(&self, path: &str) -> Result<Value, ClientError>;
}

/// Decode a list endpoint. Accepts a bare array or a `{ "data": [...] }`
/// envelope (also `{ "data": { "<anything>": [...] } }` with a single list).
pub async fn fetch_list<T: DeserializeOwned>(
    api: &dyn Api,
    path: &str,
) -> Result<Vec<T>, ClientError> {
    let body = api.get_json(path).await?;
    Ok(serde_json::from_value(unwrap_list(body))?)
}

fn unwrap_list(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Object(inner)) if inner.len() == 1 => {
                inner.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null)
            }
            Some(data) => data,
            None => Value::Object(map),
        },
        other => other,
    }
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

/// HTTP client with a bearer token on every request.
#[derive(Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpApi")
            .field("base_url", &self.base_url)
            .field("has_token", &self.current_token().is_some())
            .finish()
    }
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(token)),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.server.base_url.clone(), config.auth.resolved_token())
    }

    /// Swap the bearer token, e.g. after the identity provider refreshed it.
    pub fn set_token(&self, token: Option<String>) {
        *self
            .token
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = token;
    }

    fn current_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Api for HttpApi {
    async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let mut request = self.http.get(&url);
        if let Some(token) = self.current_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<Value>().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ApiErrorBody>(&text).ok();
        warn!("GET {} failed with {}", url, status);
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
