use reqwest::Client;

use super::api::{ContentResponse, SearchResponse};
use crate::auth::auth_headers;
use crate::confluence::ClientSettings;
use crate::http::{fetch_json, HttpError};
use crate::links::{content_url, join_url_with_expand};

/// Issues the two raw Server/Data Center REST calls. Paths hang directly
/// off the configured base URL, which already includes any context path.
#[derive(Debug, Clone)]
pub struct OnPremClient {
    http: Client,
    settings: ClientSettings,
}

impl OnPremClient {
    pub fn new(http: Client, settings: ClientSettings) -> Self {
        Self { http, settings }
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    pub async fn search_raw(
        &self,
        cql: &str,
        limit: u32,
        start: u32,
    ) -> Result<SearchResponse, HttpError> {
        let mut url = join_url_with_expand(&self.settings.base_url, "/rest/api/search", None)?;
        url.query_pairs_mut()
            .append_pair("cql", cql)
            .append_pair("limit", &limit.to_string())
            .append_pair("start", &start.to_string());

        fetch_json(
            &self.http,
            url,
            auth_headers(&self.settings.credential),
            self.settings.timeout,
        )
        .await
    }

    pub async fn get_content_raw(
        &self,
        id: &str,
        expand: &str,
    ) -> Result<ContentResponse, HttpError> {
        let url = content_url(&self.settings.base_url, id, expand)?;

        fetch_json(
            &self.http,
            url,
            auth_headers(&self.settings.credential),
            self.settings.timeout,
        )
        .await
    }
}
