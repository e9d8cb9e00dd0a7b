//! Server/Data Center raw responses to normalized DTOs.

use super::api::{ContentBody, ContentResponse, Labels, SearchResponse, SearchResult};
use crate::confluence::raw::{clean_labels, non_empty, RawContainer};
use crate::diagnostics::{DiagnosticEvent, Diagnostics, Dialect};
use crate::links::to_web_url;
use crate::models::{
    BodyRepresentation, ContentBody as Body, ContentItem, GetContentParams, SearchRequestParams,
    SearchResponsePage, SearchResultItem,
};

/// Prefix of ids synthesized from a hit's URL.
pub const SYNTHETIC_ID_PREFIX: &str = "url:";

pub fn to_search_page(
    params: &SearchRequestParams,
    raw: &SearchResponse,
    base_url: &str,
    diagnostics: &dyn Diagnostics,
) -> SearchResponsePage {
    let results: Vec<SearchResultItem> = raw
        .results
        .iter()
        .filter_map(|r| to_search_item(r, base_url, diagnostics))
        .collect();

    SearchResponsePage {
        total: raw.total_count.unwrap_or(results.len() as u64),
        start: raw.start.unwrap_or(params.start),
        limit: raw.limit.unwrap_or(params.limit),
        results,
    }
}

fn to_search_item(
    r: &SearchResult,
    base_url: &str,
    diagnostics: &dyn Diagnostics,
) -> Option<SearchResultItem> {
    let content = r.content.as_ref();

    // Search hits carry no structural id on some versions; the resolved
    // link then becomes the id. Containers come last.
    let link = non_empty(r.url.as_deref())
        .or(non_empty(
            content
                .and_then(|c| c.links.as_ref())
                .and_then(|l| l.webui.as_deref()),
        ))
        .or(non_empty(container_url(r.result_parent_container.as_ref())))
        .or(non_empty(container_url(r.result_global_container.as_ref())));
    let url = to_web_url(base_url, link);

    let id = non_empty(r.id.as_deref())
        .or(non_empty(content.and_then(|c| c.id.as_deref())))
        .map(str::to_string)
        .or_else(|| {
            url.as_ref()
                .map(|url| format!("{}{}", SYNTHETIC_ID_PREFIX, url))
        });
    let title = non_empty(r.title.as_deref()).or(non_empty(content.and_then(|c| c.title.as_deref())));

    let (Some(id), Some(title)) = (id.clone(), title) else {
        diagnostics.warn(DiagnosticEvent::SearchHitSkipped {
            dialect: Dialect::OnPrem,
            id,
            title: title.map(str::to_string),
        });
        return None;
    };

    let space = r.space.as_ref().or(content.and_then(|c| c.space.as_ref()));

    Some(SearchResultItem {
        id,
        title: title.to_string(),
        content_type: r
            .entity_type
            .clone()
            .or_else(|| content.and_then(|c| c.content_type.clone())),
        url,
        space_key: space.and_then(|s| s.key.clone()),
        space_name: space.and_then(|s| s.name.clone()),
        excerpt: r.excerpt.clone(),
        last_modified: r.last_modified.clone(),
    })
}

/// Maps a content response. All fields are read from
/// [`ContentResponse::source`]; the id falls back to the requested one.
pub fn to_content_item(
    params: &GetContentParams,
    raw: &ContentResponse,
    base_url: &str,
) -> ContentItem {
    let src = raw.source();
    let space = src.space.as_ref();
    let version = src.version.as_ref();

    let labels = params.include_labels.then(|| {
        src.metadata
            .as_ref()
            .and_then(|m| m.labels.as_ref())
            .map(label_names)
            .unwrap_or_default()
    });

    ContentItem {
        id: src.id.clone().unwrap_or_else(|| params.id.clone()),
        title: src.title.clone().unwrap_or_default(),
        content_type: src.content_type.clone(),
        url: to_web_url(base_url, src.links.as_ref().and_then(|l| l.webui.as_deref())),
        space_key: space.and_then(|s| s.key.clone()),
        space_name: space.and_then(|s| s.name.clone()),
        updated: version.and_then(|v| v.when.clone()),
        version: version.and_then(|v| v.number.clone()),
        body: src
            .body
            .as_ref()
            .and_then(|b| pick_body(params.body_representation, b)),
        labels,
    }
}

fn container_url(container: Option<&RawContainer>) -> Option<&str> {
    container.and_then(|c| c.display_url.as_deref())
}

fn label_names(labels: &Labels) -> Vec<String> {
    match labels {
        Labels::Names(values) => clean_labels(values.iter().map(|v| v.as_str())),
        Labels::Page { results } => clean_labels(
            results
                .iter()
                .map(|l| non_empty(l.name.as_deref()).or(l.label.as_deref())),
        ),
    }
}

/// Requested representation first, then storage, then view. A request
/// for `export_view` always falls through.
fn pick_body(requested: BodyRepresentation, body: &ContentBody) -> Option<Body> {
    let slot = |rep: BodyRepresentation| {
        let value = match rep {
            BodyRepresentation::Storage => body.storage.as_ref(),
            BodyRepresentation::View => body.view.as_ref(),
            BodyRepresentation::ExportView => None,
        };
        value.and_then(|v| v.non_empty()).map(|value| Body {
            representation: rep,
            value: value.to_string(),
        })
    };

    slot(requested)
        .or_else(|| slot(BodyRepresentation::Storage))
        .or_else(|| slot(BodyRepresentation::View))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingDiagnostics;
    use crate::models::ContentVersion;
    use serde_json::json;

    const BASE: &str = "https://wiki.example.com/confluence";

    fn search_params() -> SearchRequestParams {
        SearchRequestParams {
            cql: "type = page".to_string(),
            limit: 10,
            start: 0,
        }
    }

    fn content_params(rep: BodyRepresentation, include_labels: bool) -> GetContentParams {
        GetContentParams {
            id: "555".to_string(),
            body_representation: rep,
            include_labels,
        }
    }

    fn search_raw(value: serde_json::Value) -> SearchResponse {
        serde_json::from_value(value).unwrap()
    }

    fn content_raw(value: serde_json::Value) -> ContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_search_synthesizes_id_from_url() {
        let raw = search_raw(json!({
            "results": [{
                "title": "Release checklist",
                "url": "/display/OPS/Release+checklist",
                "excerpt": "steps",
                "lastModified": "2024-06-01T10:00:00.000Z",
                "entityType": "content"
            }],
            "totalCount": 1
        }));
        let diag = RecordingDiagnostics::new();
        let page = to_search_page(&search_params(), &raw, BASE, &diag);

        assert_eq!(page.results.len(), 1);
        let hit = &page.results[0];
        assert_eq!(
            hit.id,
            "url:https://wiki.example.com/confluence/display/OPS/Release+checklist"
        );
        assert_eq!(
            hit.url.as_deref(),
            Some("https://wiki.example.com/confluence/display/OPS/Release+checklist")
        );
        assert_eq!(hit.excerpt.as_deref(), Some("steps"));
        assert_eq!(hit.last_modified.as_deref(), Some("2024-06-01T10:00:00.000Z"));
        assert!(diag.events().is_empty());
    }

    #[test]
    fn test_search_prefers_structural_ids() {
        let raw = search_raw(json!({
            "results": [
                { "id": 77, "title": "direct", "url": "/x" },
                { "content": { "id": "88", "title": "nested", "type": "page",
                               "space": { "key": "DEV", "name": "Development" } },
                  "url": "/y" }
            ]
        }));
        let page = to_search_page(&search_params(), &raw, BASE, &RecordingDiagnostics::new());
        assert_eq!(page.results[0].id, "77");
        assert_eq!(page.results[1].id, "88");
        assert_eq!(page.results[1].title, "nested");
        assert_eq!(page.results[1].content_type.as_deref(), Some("page"));
        assert_eq!(page.results[1].space_key.as_deref(), Some("DEV"));
    }

    #[test]
    fn test_search_hit_space_wins_over_content_space() {
        let raw = search_raw(json!({
            "results": [{
                "id": "1", "title": "t",
                "space": { "key": "HIT" },
                "content": { "space": { "key": "CONTENT", "name": "C" } }
            }]
        }));
        let page = to_search_page(&search_params(), &raw, BASE, &RecordingDiagnostics::new());
        assert_eq!(page.results[0].space_key.as_deref(), Some("HIT"));
        assert_eq!(page.results[0].space_name, None);
    }

    #[test]
    fn test_search_container_url_chain() {
        let raw = search_raw(json!({
            "results": [
                { "id": "1", "title": "has id",
                  "resultParentContainer": { "displayUrl": "/display/OPS/Parent" },
                  "resultGlobalContainer": { "displayUrl": "/display/OPS" } },
                { "id": "2", "title": "global only",
                  "resultGlobalContainer": { "displayUrl": "/display/OPS" } },
                { "id": "3", "title": "own link wins", "url": "/display/OPS/Own",
                  "resultParentContainer": { "displayUrl": "/display/OPS/Parent" } }
            ]
        }));
        let page = to_search_page(&search_params(), &raw, BASE, &RecordingDiagnostics::new());

        let urls: Vec<_> = page.results.iter().map(|r| r.url.as_deref()).collect();
        assert_eq!(
            urls,
            vec![
                Some("https://wiki.example.com/confluence/display/OPS/Parent"),
                Some("https://wiki.example.com/confluence/display/OPS"),
                Some("https://wiki.example.com/confluence/display/OPS/Own"),
            ]
        );
    }

    #[test]
    fn test_search_synthesizes_id_from_container_url() {
        let raw = search_raw(json!({
            "results": [{
                "title": "Release checklist",
                "resultParentContainer": { "displayUrl": "/display/OPS/Parent" },
                "resultGlobalContainer": { "displayUrl": "/display/OPS" }
            }]
        }));
        let diag = RecordingDiagnostics::new();
        let page = to_search_page(&search_params(), &raw, BASE, &diag);

        assert_eq!(page.results.len(), 1);
        assert_eq!(
            page.results[0].id,
            "url:https://wiki.example.com/confluence/display/OPS/Parent"
        );
        assert!(diag.events().is_empty());
    }

    #[test]
    fn test_search_drops_hit_without_any_link() {
        let raw = search_raw(json!({ "results": [{ "title": "no id" }] }));
        let diag = RecordingDiagnostics::new();
        let page = to_search_page(&search_params(), &raw, BASE, &diag);

        assert!(page.results.is_empty());
        assert_eq!(
            diag.events(),
            vec![DiagnosticEvent::SearchHitSkipped {
                dialect: Dialect::OnPrem,
                id: None,
                title: Some("no id".to_string()),
            }]
        );
    }

    #[test]
    fn test_search_drops_hit_without_title() {
        let raw = search_raw(json!({ "results": [{ "id": "5", "title": "" }] }));
        let diag = RecordingDiagnostics::new();
        let page = to_search_page(&search_params(), &raw, BASE, &diag);
        assert!(page.results.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(
            diag.events(),
            vec![DiagnosticEvent::SearchHitSkipped {
                dialect: Dialect::OnPrem,
                id: Some("5".to_string()),
                title: None,
            }]
        );
    }

    #[test]
    fn test_search_total_count_verbatim() {
        let raw = search_raw(json!({
            "results": [{ "id": "1", "title": "a" }],
            "totalCount": 999, "start": 100, "limit": 50
        }));
        let page = to_search_page(&search_params(), &raw, BASE, &RecordingDiagnostics::new());
        assert_eq!((page.total, page.start, page.limit), (999, 100, 50));
    }

    #[test]
    fn test_search_ignores_size_and_container_title() {
        let raw = search_raw(json!({
            "results": [{
                "id": "1", "title": "a",
                "resultGlobalContainer": { "title": "Operations", "displayUrl": "/display/OPS" }
            }],
            "size": 1, "totalCount": 40, "start": 0, "limit": 25
        }));
        let page = to_search_page(&search_params(), &raw, BASE, &RecordingDiagnostics::new());

        assert_eq!((page.total, page.start, page.limit), (40, 0, 25));
        assert_eq!(page.results[0].space_name, None);
        assert_eq!(
            page.results[0].url.as_deref(),
            Some("https://wiki.example.com/confluence/display/OPS")
        );
    }

    #[test]
    fn test_content_data_wrapper_is_authoritative() {
        let raw = content_raw(json!({
            "id": "top-id",
            "type": "top-type",
            "title": "Top title",
            "space": { "key": "TOP", "name": "Top space" },
            "version": { "number": "1", "when": "2020-01-01" },
            "body": { "storage": { "value": "<p>top</p>" } },
            "metadata": { "labels": ["top-label"] },
            "_links": { "webui": "/display/TOP/page" },
            "data": {
                "id": "data-id",
                "type": "page",
                "title": "Data title",
                "space": { "key": "DATA", "name": "Data space" },
                "version": { "number": "9", "when": "2024-09-09" },
                "body": { "storage": { "value": "<p>data</p>" } },
                "metadata": { "labels": ["data-label"] },
                "_links": { "webui": "/display/DATA/page" }
            }
        }));
        let item = to_content_item(&content_params(BodyRepresentation::Storage, true), &raw, BASE);

        assert_eq!(item.id, "data-id");
        assert_eq!(item.title, "Data title");
        assert_eq!(item.content_type.as_deref(), Some("page"));
        assert_eq!(
            item.url.as_deref(),
            Some("https://wiki.example.com/confluence/display/DATA/page")
        );
        assert_eq!(item.space_key.as_deref(), Some("DATA"));
        assert_eq!(item.space_name.as_deref(), Some("Data space"));
        assert_eq!(item.updated.as_deref(), Some("2024-09-09"));
        assert_eq!(item.version, Some(ContentVersion::Text("9".into())));
        assert_eq!(item.body.unwrap().value, "<p>data</p>");
        assert_eq!(item.labels, Some(vec!["data-label".to_string()]));
    }

    #[test]
    fn test_content_data_wrapper_does_not_mix_in_top_level() {
        let raw = content_raw(json!({
            "id": "1",
            "title": "Top title",
            "space": { "key": "TOP" },
            "data": { "title": "Only title" }
        }));
        let item = to_content_item(&content_params(BodyRepresentation::Storage, false), &raw, BASE);
        assert_eq!(item.title, "Only title");
        assert_eq!(item.id, "555");
        assert_eq!(item.space_key, None);
    }

    #[test]
    fn test_content_top_level_without_data() {
        let raw = content_raw(json!({
            "id": 42,
            "title": "Top",
            "version": { "number": 3 },
            "body": { "view": { "value": "<p>view</p>" } }
        }));
        let item = to_content_item(&content_params(BodyRepresentation::View, false), &raw, BASE);
        assert_eq!(item.id, "42");
        assert_eq!(item.version, Some(ContentVersion::Number(3)));
        let body = item.body.unwrap();
        assert_eq!(body.representation, BodyRepresentation::View);
    }

    #[test]
    fn test_content_export_view_request_falls_back() {
        let raw = content_raw(json!({
            "id": "1", "title": "t",
            "body": { "view": { "value": "<p>v</p>" }, "export_view": { "value": "<p>e</p>" } }
        }));
        let item =
            to_content_item(&content_params(BodyRepresentation::ExportView, false), &raw, BASE);
        let body = item.body.unwrap();
        assert_eq!(body.representation, BodyRepresentation::View);
        assert_eq!(body.value, "<p>v</p>");
    }

    #[test]
    fn test_content_view_request_reports_storage_when_view_missing() {
        let raw = content_raw(json!({
            "id": "1", "title": "t",
            "body": { "storage": { "value": "<p>s</p>" } }
        }));
        let item = to_content_item(&content_params(BodyRepresentation::View, false), &raw, BASE);
        assert_eq!(item.body.unwrap().representation, BodyRepresentation::Storage);
    }

    #[test]
    fn test_labels_from_result_objects() {
        let raw = content_raw(json!({
            "id": "1", "title": "t",
            "metadata": { "labels": { "results": [
                { "prefix": "global", "name": "ops" },
                { "label": " runbook " },
                { "name": "", "label": "fallback" },
                { "name": 3 },
                { "id": "7" }
            ] } }
        }));
        let item = to_content_item(&content_params(BodyRepresentation::Storage, true), &raw, BASE);
        assert_eq!(
            item.labels,
            Some(vec![
                "ops".to_string(),
                "runbook".to_string(),
                "fallback".to_string()
            ])
        );
    }

    #[test]
    fn test_labels_from_plain_list() {
        let raw = content_raw(json!({
            "data": { "id": "1", "title": "t", "metadata": { "labels": ["a", 1, null, "  ", " b "] } }
        }));
        let item = to_content_item(&content_params(BodyRepresentation::Storage, true), &raw, BASE);
        assert_eq!(item.labels, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_labels_omitted_unless_requested() {
        let raw = content_raw(json!({
            "id": "1", "title": "t", "metadata": { "labels": ["a"] }
        }));
        let item = to_content_item(&content_params(BodyRepresentation::Storage, false), &raw, BASE);
        assert_eq!(item.labels, None);
        assert!(serde_json::to_value(&item).unwrap().get("labels").is_none());
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let raw = search_raw(json!({
            "results": [{ "title": "a", "url": "/display/A/a" }, { "id": "2", "title": "b" }]
        }));
        let first = to_search_page(&search_params(), &raw, BASE, &RecordingDiagnostics::new());
        let second = to_search_page(&search_params(), &raw, BASE, &RecordingDiagnostics::new());
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
