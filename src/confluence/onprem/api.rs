//! Raw Confluence Server / Data Center REST response shapes.
//!
//! Differences from Cloud that the mapper has to absorb:
//!
//! * search hits may carry no id at all, only a `url`;
//! * the paging total is `totalCount`, not `totalSize`;
//! * content responses may nest the real object under `data`;
//! * labels come either as a plain string list or as `{results: [...]}`;
//! * there is no `export_view` body.

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
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
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
    pub space: Option<RawSpace>,
    #[serde(default, deserialize_with = "lenient")]
    pub result_global_container: Option<RawContainer>,
    #[serde(default, deserialize_with = "lenient")]
    pub result_parent_container: Option<RawContainer>,
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
    #[serde(rename = "_links", default, deserialize_with = "lenient")]
    pub links: Option<RawLinks>,
}

/// Content response. When `data` is present it is authoritative and the
/// top-level fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContentResponse {
    #[serde(flatten)]
    pub top: ContentFields,
    #[serde(default, deserialize_with = "lenient")]
    pub data: Option<ContentFields>,
}

impl ContentResponse {
    /// The object every content field is read from.
    pub fn source(&self) -> &ContentFields {
        self.data.as_ref().unwrap_or(&self.top)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContentFields {
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
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Metadata {
    #[serde(default, deserialize_with = "lenient")]
    pub labels: Option<Labels>,
}

/// The two label shapes seen in the wild.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Labels {
    /// `["ops", "runbook"]`. Non-string entries are kept as raw values
    /// and filtered by the mapper.
    Names(Vec<serde_json::Value>),
    /// `{"results": [{"name": "ops"}, {"label": "runbook"}]}`.
    Page {
        #[serde(default, deserialize_with = "lenient_items")]
        results: Vec<RawLabel>,
    },
}
