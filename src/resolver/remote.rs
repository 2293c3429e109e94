//! Remote content store
//!
//! Templates may live in a GraphQL content service. Each document carries a
//! rendered form and the markup it was rendered from; the rendered form wins.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::RemoteConfig;

const TEMPLATE_QUERY: &str = "query GetTemplate($id: ID!) { getJSX(id: $id) { id sha nonce jsx mdx } }";

/// Errors talking to a remote content store
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Query errors: {0}")]
    Query(String),

    #[error("Invalid response: {0}")]
    Json(#[from] serde_json::Error),
}

/// A document returned by the remote store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteDocument {
    pub id: String,
    pub revision: Option<String>,
    /// Primary rendered output
    pub rendered: Option<String>,
    /// Source markup, used when nothing rendered is available
    pub markup: Option<String>,
}

impl RemoteDocument {
    /// Content to use for this document, preferring the rendered form
    pub fn content(&self) -> Option<&str> {
        self.rendered
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.markup.as_deref().filter(|s| !s.is_empty()))
    }
}

/// A source of template content addressed by id
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch one document; `Ok(None)` means the store has nothing for `id`
    async fn fetch(&self, id: &str) -> Result<Option<RemoteDocument>, RemoteError>;
}

/// GraphQL-backed content store
pub struct GraphqlStore {
    endpoint: String,
    token: Option<String>,
    http: Client,
}

impl GraphqlStore {
    pub fn new(endpoint: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            token,
            http,
        })
    }

    /// Build a store from config, or `None` when no endpoint is configured
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>, RemoteError> {
        let Some(endpoint) = config.endpoint() else {
            debug!("from_config: no remote endpoint configured");
            return Ok(None);
        };
        let timeout = Duration::from_millis(config.timeout_ms);
        Self::new(endpoint, config.token(), timeout).map(Some)
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<GraphqlData>,
    #[serde(default)]
    errors: Vec<GraphqlErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphqlData {
    #[serde(rename = "getJSX")]
    template: Option<GraphqlTemplate>,
}

#[derive(Debug, Deserialize)]
struct GraphqlTemplate {
    id: Option<String>,
    sha: Option<String>,
    jsx: Option<String>,
    mdx: Option<String>,
}

#[async_trait]
impl ContentStore for GraphqlStore {
    async fn fetch(&self, id: &str) -> Result<Option<RemoteDocument>, RemoteError> {
        debug!(%id, endpoint = %self.endpoint, "fetch: called");
        let body = serde_json::json!({
            "query": TEMPLATE_QUERY,
            "variables": { "id": id },
        });

        let mut request = self
            .http
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "fetch: HTTP error");
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        let parsed: GraphqlResponse = serde_json::from_str(&text)?;

        if !parsed.errors.is_empty() {
            let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(RemoteError::Query(messages.join(", ")));
        }

        let Some(template) = parsed.data.and_then(|d| d.template) else {
            debug!(%id, "fetch: no document");
            return Ok(None);
        };

        Ok(Some(RemoteDocument {
            id: template.id.unwrap_or_else(|| id.to_string()),
            revision: template.sha,
            rendered: template.jsx,
            markup: template.mdx,
        }))
    }
}
