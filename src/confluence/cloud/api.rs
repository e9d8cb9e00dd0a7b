//! Raw Confluence Cloud REST v1 response shapes.
//!
//! Search: `GET /wiki/rest/api/search`. Content: `GET /wiki/rest/api/content/{id}`.
//! Only the fields the mapper reads are declared.

use serde::Deserialize;

use crate::confluence::raw::{
    lenient, lenient_id, lenient_items, RawBodyValue, RawContainer, RawLabel, RawLinks, RawSpace,
    RawVersion,
};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "lenient_items")]
    pub results: Vec<SearchResult>,
    #[serde(default, deserialize_with = "lenient")]
    pub start: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub limit: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<SearchContent>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub excerpt: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub entity_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_modified: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub result_global_container: Option<RawContainer>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchContent {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub space: Option<RawSpace>,
    #[serde(default, deserialize_with = "lenient")]
    pub version: Option<RawVersion>,
    #[serde(rename = "_links", default, deserialize_with = "lenient")]
    pub links: Option<RawLinks>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContentResponse {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub space: Option<RawSpace>,
    #[serde(default, deserialize_with = "lenient")]
    pub version: Option<RawVersion>,
    #[serde(default, deserialize_with = "lenient")]
    pub body: Option<ContentBody>,
    #[serde(default, deserialize_with = "lenient")]
    pub metadata: Option<Metadata>,
    #[serde(rename = "_links", default, deserialize_with = "lenient")]
    pub links: Option<RawLinks>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContentBody {
    #[serde(default, deserialize_with = "lenient")]
    pub storage: Option<RawBodyValue>,
    #[serde(default, deserialize_with = "lenient")]
    pub view: Option<RawBodyValue>,
    #[serde(default, deserialize_with = "lenient")]
    pub export_view: Option<RawBodyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Metadata {
    #[serde(default, deserialize_with = "lenient")]
    pub labels: Option<LabelPage>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LabelPage {
    #[serde(default, deserialize_with = "lenient_items")]
    pub results: Vec<RawLabel>,
}
