//! Metatable published as a hosted table.

use crate::wire::{QueryResponse, send};
use agol_audit_core::catalog::CATALOG_FIELDS;
use agol_audit_core::{CatalogEntry, CatalogError, CatalogSource};
use reqwest::blocking::Client;
use serde_json::Value;

/// Catalog source backed by a feature layer `query` endpoint.
///
/// Pages are requested by `resultOffset` until the service stops reporting
/// `exceededTransferLimit`.
#[derive(Debug, Clone)]
pub struct HostedTableCatalog {
    http: Client,
    url: String,
    token: Option<String>,
}

impl HostedTableCatalog {
    pub fn new(http: Client, url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http,
            url: url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Anonymous access to a public table.
    pub fn public(url: impl Into<String>) -> Self {
        Self::new(Client::new(), url, None)
    }

    fn page(&self, offset: usize) -> Result<QueryResponse, CatalogError> {
        let endpoint = format!("{}/query", self.url);
        let out_fields = CATALOG_FIELDS.join(",");
        let offset = offset.to_string();
        let mut query = vec![
            ("where", "1=1"),
            ("outFields", out_fields.as_str()),
            ("returnGeometry", "false"),
            ("resultOffset", offset.as_str()),
            ("f", "json"),
        ];
        if let Some(token) = self.token.as_deref() {
            query.push(("token", token));
        }
        let request = self.http.get(&endpoint).query(&query);
        send("query catalog", &endpoint, request).map_err(|e| CatalogError::Read {
            source_name: self.describe(),
            message: e.to_string(),
        })
    }
}

fn text(attributes: &serde_json::Map<String, Value>, field: &str) -> String {
    match attributes.get(field) {
        Some(Value::String(value)) => value.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

impl CatalogSource for HostedTableCatalog {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn load(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut entries = Vec::new();
        loop {
            let page = self.page(entries.len())?;
            let fetched = page.features.len();
            for feature in page.features {
                let attributes = feature.attributes;
                entries.push(CatalogEntry::new(
                    text(&attributes, CATALOG_FIELDS[0]),
                    text(&attributes, CATALOG_FIELDS[1]),
                    text(&attributes, CATALOG_FIELDS[2]),
                ));
            }
            if !page.exceeded_transfer_limit || fetched == 0 {
                break;
            }
        }
        tracing::debug!(source = %self.url, rows = entries.len(), "queried hosted catalog");
        Ok(entries)
    }
}
