//! Backend-independent access to Confluence.
//!
//! The rest of the crate talks to Confluence only through
//! [`ConfluenceGateway`]. Two implementations exist, one per REST
//! dialect, each composing a thin HTTP client with a pure response
//! mapper:
//!
//! ```text
//!             ┌──────────────────────┐
//!             │  ConfluenceGateway   │
//!             └──────────┬───────────┘
//!          ┌─────────────┴─────────────┐
//!          ▼                           ▼
//!   ┌──────────────┐            ┌──────────────┐
//!   │ CloudGateway │            │OnPremGateway │
//!   │ client+mapper│            │ client+mapper│
//!   └──────────────┘            └──────────────┘
//! ```
//!
//! [`create_gateway`] picks the implementation from `confluence.hosting`.

pub mod cloud;
pub mod onprem;
pub(crate) mod raw;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::auth::Credential;
use crate::config::Config;
use crate::cql::CqlError;
use crate::diagnostics::{Dialect, Diagnostics};
use crate::http::HttpError;
use crate::models::{ContentItem, GetContentParams, SearchRequestParams, SearchResponsePage};

/// Failure of a gateway operation.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The CQL was rejected locally; no request was sent.
    #[error("invalid CQL: {0}")]
    InvalidQuery(#[from] CqlError),

    /// The backend request failed. Passed through unchanged.
    #[error(transparent)]
    Http(#[from] HttpError),
}

/// Read-only capability surface over one Confluence site.
#[async_trait]
pub trait ConfluenceGateway: Send + Sync {
    /// Which REST dialect this gateway speaks.
    fn dialect(&self) -> Dialect;

    /// Runs one CQL search. The query is validated before any request.
    async fn search(&self, params: &SearchRequestParams)
        -> Result<SearchResponsePage, GatewayError>;

    /// Fetches one content item by id.
    async fn get_content(&self, params: &GetContentParams) -> Result<ContentItem, GatewayError>;
}

/// Connection settings shared by both backend clients.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Site root as configured, without trailing slash.
    pub base_url: String,
    pub credential: Credential,
    pub timeout: Duration,
}

impl ClientSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.confluence.base_url.clone(),
            credential: config.credential(),
            timeout: Duration::from_millis(config.confluence.timeout_ms),
        }
    }
}

/// Builds the gateway for the configured hosting mode.
///
/// `"cloud"` selects the Cloud dialect. Every other value selects
/// Server/Data Center; rejecting unknown values is the config loader's job.
pub fn create_gateway(
    config: &Config,
    diagnostics: Arc<dyn Diagnostics>,
) -> Arc<dyn ConfluenceGateway> {
    let settings = ClientSettings::from_config(config);
    let http = build_http_client();

    match config.confluence.hosting.as_str() {
        "cloud" => Arc::new(cloud::CloudGateway::new(
            cloud::CloudClient::new(http, settings),
            diagnostics,
        )),
        _ => Arc::new(onprem::OnPremGateway::new(
            onprem::OnPremClient::new(http, settings),
            diagnostics,
        )),
    }
}

fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("confluence-mcp/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// `expand` value for a content fetch: space, version, the requested
/// body representation, and labels only when asked for.
pub fn content_expand(params: &GetContentParams) -> String {
    let mut parts = vec![
        "space".to_string(),
        "version".to_string(),
        format!("body.{}", params.body_representation.as_str()),
    ];
    if params.include_labels {
        parts.push("metadata.labels".to_string());
    }
    parts.join(",")
}
