//! Confluence Server / Data Center dialect.

pub mod api;
mod client;
pub mod mapper;

pub use client::OnPremClient;

use async_trait::async_trait;
use std::sync::Arc;

use crate::confluence::{content_expand, ConfluenceGateway, GatewayError};
use crate::cql::validate_cql;
use crate::diagnostics::{Diagnostics, Dialect};
use crate::models::{ContentItem, GetContentParams, SearchRequestParams, SearchResponsePage};

/// [`ConfluenceGateway`] for self-hosted sites.
pub struct OnPremGateway {
    client: OnPremClient,
    diagnostics: Arc<dyn Diagnostics>,
}

impl OnPremGateway {
    pub fn new(client: OnPremClient, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            client,
            diagnostics,
        }
    }
}

#[async_trait]
impl ConfluenceGateway for OnPremGateway {
    fn dialect(&self) -> Dialect {
        Dialect::OnPrem
    }

    async fn search(
        &self,
        params: &SearchRequestParams,
    ) -> Result<SearchResponsePage, GatewayError> {
        validate_cql(&params.cql)?;

        let raw = self
            .client
            .search_raw(&params.cql, params.limit, params.start)
            .await?;

        Ok(mapper::to_search_page(
            params,
            &raw,
            self.client.base_url(),
            self.diagnostics.as_ref(),
        ))
    }

    async fn get_content(&self, params: &GetContentParams) -> Result<ContentItem, GatewayError> {
        let expand = content_expand(params);
        let raw = self.client.get_content_raw(&params.id, &expand).await?;

        Ok(mapper::to_content_item(params, &raw, self.client.base_url()))
    }
}
