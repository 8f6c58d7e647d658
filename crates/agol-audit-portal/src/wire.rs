//! ArcGIS REST response bodies and the shared request helper.
//!
//! Portal errors arrive with HTTP 200 and an `error` object in the body, so
//! every response is decoded through [`send`], which checks for it before
//! deserializing the expected shape.

use agol_audit_core::PortalError;
use reqwest::blocking::RequestBuilder;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Vec<String>,
}

impl ErrorBody {
    fn describe(&self) -> String {
        let mut text = self
            .message
            .clone()
            .unwrap_or_else(|| "unspecified error".to_string());
        if let Some(code) = self.code {
            text = format!("{text} (code {code})");
        }
        let details: Vec<&str> = self
            .details
            .iter()
            .map(String::as_str)
            .filter(|d| !d.is_empty())
            .collect();
        if !details.is_empty() {
            text = format!("{text}: {}", details.join("; "));
        }
        text
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserContent {
    #[serde(default)]
    pub items: Vec<ItemRecord>,
    #[serde(default)]
    pub folders: Vec<FolderRecord>,
    #[serde(default = "end_of_pages")]
    pub next_start: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ItemRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FolderRecord {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GroupRecord {
    pub id: String,
    pub title: String,
}

/// Groups an item is shared with, split by the caller's role in each.
#[derive(Debug, Deserialize)]
pub(crate) struct ItemGroups {
    #[serde(default)]
    pub admin: Vec<GroupRecord>,
    #[serde(default)]
    pub member: Vec<GroupRecord>,
    #[serde(default)]
    pub other: Vec<GroupRecord>,
}

impl ItemGroups {
    pub fn titles(self) -> Vec<String> {
        self.admin
            .into_iter()
            .chain(self.member)
            .chain(self.other)
            .map(|group| group.title)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GroupSearch {
    #[serde(default)]
    pub results: Vec<GroupRecord>,
    #[serde(default = "end_of_pages")]
    pub next_start: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServiceInfo {
    #[serde(default)]
    pub capabilities: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ShareResponse {
    #[serde(default)]
    pub not_shared_with: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub exceeded_transfer_limit: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Feature {
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
}

fn end_of_pages() -> i64 {
    -1
}

/// Split a comma-separated capability list.
pub(crate) fn split_capabilities(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Send `request` and decode the body as `T`.
pub(crate) fn send<T: DeserializeOwned>(
    operation: &str,
    endpoint: &str,
    request: RequestBuilder,
) -> Result<T, PortalError> {
    let transport = |message: String| PortalError::Transport {
        endpoint: endpoint.to_string(),
        message,
    };

    tracing::debug!(operation, endpoint, "portal request");
    let response = request.send().map_err(|e| transport(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(transport(format!("HTTP {status}")));
    }
    let body: Value = response.json().map_err(|e| transport(e.to_string()))?;
    decode(operation, body)
}

pub(crate) fn decode<T: DeserializeOwned>(operation: &str, body: Value) -> Result<T, PortalError> {
    if let Some(error) = body.get("error") {
        let error: ErrorBody = serde_json::from_value(error.clone()).unwrap_or(ErrorBody {
            code: None,
            message: Some(error.to_string()),
            details: Vec::new(),
        });
        return Err(PortalError::rejected(operation, error.describe()));
    }
    serde_json::from_value(body)
        .map_err(|e| PortalError::rejected(operation, format!("unexpected response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_body_becomes_rejection() {
        let body = json!({
            "error": {"code": 498, "message": "Invalid token.", "details": ["expired"]}
        });
        match decode::<SuccessResponse>("protect", body) {
            Err(PortalError::Rejected { operation, message }) => {
                assert_eq!(operation, "protect");
                assert_eq!(message, "Invalid token. (code 498): expired");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn missing_next_start_ends_paging() {
        let content: UserContent =
            decode("list", json!({"items": []})).expect("content should decode");
        assert_eq!(content.next_start, -1);
    }

    #[test]
    fn item_groups_flatten_all_roles() {
        let groups: ItemGroups = decode(
            "groups",
            json!({
                "admin": [{"id": "1", "title": "Utah SGID Water"}],
                "member": [],
                "other": [{"id": "2", "title": "Open Data"}]
            }),
        )
        .expect("groups should decode");
        assert_eq!(groups.titles(), vec!["Utah SGID Water", "Open Data"]);
    }

    #[test]
    fn capabilities_split_and_trim() {
        assert_eq!(
            split_capabilities("Query, Extract,,Sync"),
            vec!["Query", "Extract", "Sync"]
        );
    }
}
