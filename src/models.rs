//! Normalized, backend-independent data types.
//!
//! Both dialect mappers produce these shapes. Optional fields are skipped
//! when serializing so that presence of a key is itself meaningful.

use serde::{Deserialize, Serialize};

/// Input to [`ConfluenceGateway::search`](crate::confluence::ConfluenceGateway::search).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequestParams {
    /// CQL expression. Validated by the gateway before it leaves the process.
    pub cql: String,
    pub limit: u32,
    pub start: u32,
}

/// One normalized search hit. `id` and `title` are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// A page of search hits plus the paging values the backend reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponsePage {
    pub total: u64,
    pub start: u32,
    pub limit: u32,
    pub results: Vec<SearchResultItem>,
}

/// Rendering of a content body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BodyRepresentation {
    /// Raw storage-format XHTML.
    #[default]
    Storage,
    /// Rendered HTML.
    View,
    /// Export-oriented HTML. Cloud only.
    ExportView,
}

impl BodyRepresentation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyRepresentation::Storage => "storage",
            BodyRepresentation::View => "view",
            BodyRepresentation::ExportView => "export_view",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "storage" => Some(BodyRepresentation::Storage),
            "view" => Some(BodyRepresentation::View),
            "export_view" => Some(BodyRepresentation::ExportView),
            _ => None,
        }
    }
}

impl std::fmt::Display for BodyRepresentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to [`ConfluenceGateway::get_content`](crate::confluence::ConfluenceGateway::get_content).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetContentParams {
    pub id: String,
    pub body_representation: BodyRepresentation,
    pub include_labels: bool,
}

/// A resolved content body. `representation` is the one actually used,
/// which may differ from the one requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBody {
    pub representation: BodyRepresentation,
    pub value: String,
}

/// Content version as reported by the backend. Cloud sends a number,
/// Server/Data Center sometimes a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentVersion {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for ContentVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentVersion::Number(n) => write!(f, "{}", n),
            ContentVersion::Text(s) => f.write_str(s),
        }
    }
}

/// One normalized content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<ContentVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ContentBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}
