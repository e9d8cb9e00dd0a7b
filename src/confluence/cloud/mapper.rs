//! Cloud raw responses to normalized DTOs.
//!
//! Pure functions: the only side channel is the injected [`Diagnostics`].

use super::api::{ContentBody, ContentResponse, SearchResponse, SearchResult};
use crate::confluence::raw::{clean_labels, non_empty};
use crate::diagnostics::{DiagnosticEvent, Diagnostics, Dialect};
use crate::links::to_web_url;
use crate::models::{
    BodyRepresentation, ContentBody as Body, ContentItem, GetContentParams, SearchRequestParams,
    SearchResponsePage, SearchResultItem,
};

/// Maps a search response. `web_base` is the `/wiki` root that relative
/// links are resolved against.
pub fn to_search_page(
    params: &SearchRequestParams,
    raw: &SearchResponse,
    web_base: &str,
    diagnostics: &dyn Diagnostics,
) -> SearchResponsePage {
    let results: Vec<SearchResultItem> = raw
        .results
        .iter()
        .filter_map(|r| to_search_item(r, web_base, diagnostics))
        .collect();

    SearchResponsePage {
        total: raw.total_size.unwrap_or(results.len() as u64),
        start: raw.start.unwrap_or(params.start),
        limit: raw.limit.unwrap_or(params.limit),
        results,
    }
}

fn to_search_item(
    r: &SearchResult,
    web_base: &str,
    diagnostics: &dyn Diagnostics,
) -> Option<SearchResultItem> {
    let content = r.content.as_ref();

    let id = non_empty(content.and_then(|c| c.id.as_deref()));
    let title = non_empty(r.title.as_deref()).or(non_empty(content.and_then(|c| c.title.as_deref())));

    let (Some(id), Some(title)) = (id, title) else {
        diagnostics.warn(DiagnosticEvent::SearchHitSkipped {
            dialect: Dialect::Cloud,
            id: id.map(str::to_string),
            title: title.map(str::to_string),
        });
        return None;
    };

    let link = non_empty(r.url.as_deref())
        .or(non_empty(
            content
                .and_then(|c| c.links.as_ref())
                .and_then(|l| l.webui.as_deref()),
        ))
        .or(non_empty(
            r.result_global_container
                .as_ref()
                .and_then(|c| c.display_url.as_deref()),
        ));
    let space = content.and_then(|c| c.space.as_ref());

    Some(SearchResultItem {
        id: id.to_string(),
        title: title.to_string(),
        content_type: r
            .entity_type
            .clone()
            .or_else(|| content.and_then(|c| c.content_type.clone())),
        url: to_web_url(web_base, link),
        space_key: space.and_then(|s| s.key.clone()),
        space_name: space.and_then(|s| s.name.clone()),
        excerpt: r.excerpt.clone(),
        last_modified: r.last_modified.clone().or_else(|| {
            content
                .and_then(|c| c.version.as_ref())
                .and_then(|v| v.when.clone())
        }),
    })
}

/// Maps a content response.
pub fn to_content_item(
    params: &GetContentParams,
    raw: &ContentResponse,
    web_base: &str,
) -> ContentItem {
    let space = raw.space.as_ref();
    let version = raw.version.as_ref();

    let labels = params.include_labels.then(|| {
        raw.metadata
            .as_ref()
            .and_then(|m| m.labels.as_ref())
            .map(|page| clean_labels(page.results.iter().map(|l| l.name.as_deref())))
            .unwrap_or_default()
    });

    ContentItem {
        id: raw.id.clone().unwrap_or_else(|| params.id.clone()),
        title: raw.title.clone().unwrap_or_default(),
        content_type: raw.content_type.clone(),
        url: to_web_url(web_base, raw.links.as_ref().and_then(|l| l.webui.as_deref())),
        space_key: space.and_then(|s| s.key.clone()),
        space_name: space.and_then(|s| s.name.clone()),
        updated: version.and_then(|v| v.when.clone()),
        version: version.and_then(|v| v.number.clone()),
        body: raw
            .body
            .as_ref()
            .and_then(|b| pick_body(params.body_representation, b)),
        labels,
    }
}

/// Requested representation first, then storage, view, export_view.
fn pick_body(requested: BodyRepresentation, body: &ContentBody) -> Option<Body> {
    let slot = |rep: BodyRepresentation| {
        let value = match rep {
            BodyRepresentation::Storage => body.storage.as_ref(),
            BodyRepresentation::View => body.view.as_ref(),
            BodyRepresentation::ExportView => body.export_view.as_ref(),
        };
        value.and_then(|v| v.non_empty()).map(|value| Body {
            representation: rep,
            value: value.to_string(),
        })
    };

    slot(requested)
        .or_else(|| slot(BodyRepresentation::Storage))
        .or_else(|| slot(BodyRepresentation::View))
        .or_else(|| slot(BodyRepresentation::ExportView))
}
