//! Read snapshot of a hosted feature layer item.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Outcome of a per-item lookup that is allowed to fail without aborting
/// the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Lookup<T> {
    Fetched(T),
    Unavailable(String),
}

impl<T> Lookup<T> {
    /// Map a fallible fetch into a lookup, keeping the error text.
    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Fetched(value),
            Err(error) => Self::Unavailable(error.to_string()),
        }
    }

    pub fn fetched(&self) -> Option<&T> {
        match self {
            Self::Fetched(value) => Some(value),
            Self::Unavailable(_) => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// A Feature Service item as enumerated from the owner's folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    pub item_id: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Folder title; `None` is the owner's root folder.
    #[serde(default)]
    pub folder: Option<String>,
    /// Titles of the groups the item is shared with.
    pub groups: Lookup<Vec<String>>,
    #[serde(default)]
    pub protected: bool,
    /// Feature service capabilities (`Query`, `Extract`, ...).
    pub capabilities: Lookup<Vec<String>>,
    #[serde(default)]
    pub service_url: Option<String>,
}

impl RemoteItem {
    /// An item in the root folder with no groups, no capabilities, and no
    /// protection. Mostly useful for fixtures.
    pub fn new(item_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            title: title.into(),
            tags: Vec::new(),
            folder: None,
            groups: Lookup::Fetched(Vec::new()),
            protected: false,
            capabilities: Lookup::Fetched(Vec::new()),
            service_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_from_result_keeps_error_text() {
        let failed: Lookup<Vec<String>> = Lookup::from_result(Err::<Vec<String>, _>("HTTP 500"));
        assert_eq!(failed, Lookup::Unavailable("HTTP 500".to_string()));
        assert!(failed.is_unavailable());
        assert!(failed.fetched().is_none());

        let ok: Lookup<u8> = Lookup::from_result(Ok::<u8, String>(3));
        assert_eq!(ok.fetched(), Some(&3));
    }

    #[test]
    fn lookup_serializes_with_state_tag() {
        let value = serde_json::to_value(Lookup::<Vec<String>>::Unavailable("boom".to_string()))
            .expect("lookup should serialize");
        assert_eq!(value["state"], "unavailable");
        assert_eq!(value["value"], "boom");
    }
}
