//! JSON-over-HTTP with a hard deadline.
//!
//! [`fetch_json`] performs exactly one GET. There are no retries: the tool
//! layer reports the failure and the agent decides what to do next.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Failure of a single backend request.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The backend answered with a non-2xx status.
    #[error("HTTP {status} {status_text}: {body}")]
    Status {
        status: u16,
        status_text: String,
        body: String,
    },

    /// The deadline elapsed before the response was fully read. The
    /// in-flight request has been dropped.
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl HttpError {
    /// True when the request was aborted by the deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Timeout { .. })
    }

    /// HTTP status code, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// GETs `url` and decodes the JSON body into `T`.
///
/// The whole exchange (connect, headers, body) must finish within
/// `timeout`; otherwise the request future is dropped and
/// [`HttpError::Timeout`] is returned.
pub async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: Url,
    headers: HeaderMap,
    timeout: Duration,
) -> Result<T, HttpError> {
    let url_text = url.to_string();

    let exchange = async {
        let resp = client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .headers(headers)
            .send()
            .await
            .map_err(|source| HttpError::Network {
                url: url_text.clone(),
                source,
            })?;

        let status = resp.status();
        tracing::debug!(
            url = %url_text,
            status = status.as_u16(),
            content_type = ?resp.headers().get(reqwest::header::CONTENT_TYPE),
            "confluence response"
        );

        // Body text is read even on failure so the error carries it.
        let body = resp.text().await.map_err(|source| HttpError::Network {
            url: url_text.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                body,
            });
        }

        serde_json::from_str::<T>(&body).map_err(|source| HttpError::Decode {
            url: url_text.clone(),
            source,
        })
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(result) => result,
        Err(_) => Err(HttpError::Timeout {
            url: url_text.clone(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}
