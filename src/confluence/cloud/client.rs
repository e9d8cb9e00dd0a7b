use reqwest::Client;

use super::api::{ContentResponse, SearchResponse};
use crate::auth::auth_headers;
use crate::confluence::ClientSettings;
use crate::http::{fetch_json, HttpError};
use crate::links::{cloud_wiki_base, content_url, join_url_with_expand};

/// Issues the two raw Cloud REST calls. Every path lives under `/wiki`.
#[derive(Debug, Clone)]
pub struct CloudClient {
    http: Client,
    settings: ClientSettings,
    wiki_base: String,
}

impl CloudClient {
    pub fn new(http: Client, settings: ClientSettings) -> Self {
        let wiki_base = cloud_wiki_base(&settings.base_url);
        Self {
            http,
            settings,
            wiki_base,
        }
    }

    /// Root used for API paths and for resolving relative `webui` links.
    pub fn wiki_base(&self) -> &str {
        &self.wiki_base
    }

    pub async fn search_raw(
        &self,
        cql: &str,
        limit: u32,
        start: u32,
    ) -> Result<SearchResponse, HttpError> {
        let mut url = join_url_with_expand(&self.wiki_base, "/rest/api/search", None)?;
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
        let url = content_url(&self.wiki_base, id, expand)?;

        fetch_json(
            &self.http,
            url,
            auth_headers(&self.settings.credential),
            self.settings.timeout,
        )
        .await
    }
}
