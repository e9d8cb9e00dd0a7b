//! Raw response pieces shared by both dialects.
//!
//! Every field is optional and deserialized leniently: a field holding
//! the wrong JSON type reads as absent instead of failing the whole
//! response. The mappers decide what absence means.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::ContentVersion;

/// Deserializes `Option<T>`, turning any type mismatch into `None`.
pub(crate) fn lenient<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(de)?;
    Ok(T::deserialize(value).ok())
}

/// Deserializes an id that may be sent as a string or a number.
pub(crate) fn lenient_id<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Deserializes an array, keeping only the elements that parse as `T`.
/// A non-array reads as empty.
pub(crate) fn lenient_items<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| T::deserialize(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawSpace {
    #[serde(default, deserialize_with = "lenient")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawVersion {
    #[serde(default, deserialize_with = "lenient")]
    pub number: Option<ContentVersion>,
    #[serde(default, deserialize_with = "lenient")]
    pub when: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawBodyValue {
    #[serde(default, deserialize_with = "lenient")]
    pub value: Option<String>,
}

impl RawBodyValue {
    /// The body text, if it is present and non-empty.
    pub fn non_empty(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawLinks {
    #[serde(default, deserialize_with = "lenient")]
    pub webui: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContainer {
    #[serde(default, deserialize_with = "lenient")]
    pub display_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawLabel {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub label: Option<String>,
}

/// Trims and drops empty names, preserving order.
pub(crate) fn clean_labels<'a>(names: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    names
        .flatten()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Treats an empty string as absent.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
