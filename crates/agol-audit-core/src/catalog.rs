//! The SGID metatable: authoritative source name, item id, and published
//! title for every published layer.

use crate::tags::{SGID_GROUP_MARKER, title_case};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Columns every catalog source must provide.
pub const CATALOG_FIELDS: [&str; 3] = ["TABLENAME", "AGOL_ITEM_ID", "AGOL_PUBLISHED_NAME"];

/// Errors raised while reading or indexing the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {source_name}: {message}")]
    Read {
        source_name: String,
        message: String,
    },

    #[error("catalog {source_name} row {row}: {message}")]
    Row {
        source_name: String,
        row: usize,
        message: String,
    },

    #[error("duplicate item ids in catalog: {}", .0.join(", "))]
    DuplicateItemIds(Vec<String>),
}

/// One metatable row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Dotted source name, e.g. `SGID.Boundaries.Municipalities`.
    pub source_name: String,
    pub item_id: String,
    pub published_name: String,
}

impl CatalogEntry {
    pub fn new(
        source_name: impl Into<String>,
        item_id: impl Into<String>,
        published_name: impl Into<String>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            item_id: item_id.into(),
            published_name: published_name.into(),
        }
    }

    /// Title-cased second segment of the source name.
    pub fn category(&self) -> Option<String> {
        let segment = self.source_name.split('.').nth(1)?.trim();
        if segment.is_empty() {
            None
        } else {
            Some(title_case(segment))
        }
    }

    /// The SGID group the item should be shared with.
    pub fn expected_group(&self) -> Option<String> {
        self.category()
            .map(|category| format!("{SGID_GROUP_MARKER} {category}"))
    }
}

/// Canonical key for an item id: lowercase 32-hex form.
///
/// Ids that do not parse as UUIDs mark layers that are not published.
pub fn item_key(item_id: &str) -> Option<String> {
    Uuid::parse_str(item_id.trim())
        .ok()
        .map(|id| id.simple().to_string())
}

/// Read-only catalog snapshot indexed by item id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
    skipped_rows: usize,
}

impl Catalog {
    /// Index entries by item id.
    ///
    /// Rows whose item id is not a UUID are skipped and counted. Any item id
    /// that appears more than once is an error, listing every duplicate.
    pub fn from_entries(
        entries: impl IntoIterator<Item = CatalogEntry>,
    ) -> Result<Self, CatalogError> {
        let mut index = BTreeMap::new();
        let mut skipped_rows = 0usize;
        let mut duplicates = BTreeSet::new();

        for entry in entries {
            let Some(key) = item_key(&entry.item_id) else {
                skipped_rows += 1;
                continue;
            };
            if index.contains_key(&key) {
                duplicates.insert(key);
                continue;
            }
            index.insert(key, entry);
        }

        if !duplicates.is_empty() {
            return Err(CatalogError::DuplicateItemIds(
                duplicates.into_iter().collect(),
            ));
        }

        Ok(Self {
            entries: index,
            skipped_rows,
        })
    }

    pub fn get(&self, item_id: &str) -> Option<&CatalogEntry> {
        item_key(item_id).and_then(|key| self.entries.get(&key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows dropped because their item id was not a UUID.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

/// A table the catalog can be read from.
pub trait CatalogSource {
    /// Human-readable location, used in logs and errors.
    fn describe(&self) -> String;

    fn load(&self) -> Result<Vec<CatalogEntry>, CatalogError>;
}

/// Read every source and index the combined rows.
pub fn load_catalog(sources: &[Box<dyn CatalogSource>]) -> Result<Catalog, CatalogError> {
    let mut entries = Vec::new();
    for source in sources {
        let rows = source.load()?;
        tracing::info!(source = %source.describe(), rows = rows.len(), "read catalog source");
        entries.extend(rows);
    }
    let catalog = Catalog::from_entries(entries)?;
    if catalog.skipped_rows() > 0 {
        tracing::info!(
            skipped = catalog.skipped_rows(),
            "skipped catalog rows without a published item id"
        );
    }
    Ok(catalog)
}

/// Catalog exported to a CSV file with the metatable's column names.
#[derive(Debug, Clone)]
pub struct CsvCatalog {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvCatalogRecord {
    #[serde(rename = "TABLENAME", default)]
    table_name: Option<String>,
    #[serde(rename = "AGOL_ITEM_ID", default)]
    item_id: Option<String>,
    #[serde(rename = "AGOL_PUBLISHED_NAME", default)]
    published_name: Option<String>,
}

impl CsvCatalog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CatalogSource for CsvCatalog {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| CatalogError::Read {
                source_name: self.describe(),
                message: e.to_string(),
            })?;

        let headers = reader.headers().map_err(|e| CatalogError::Read {
            source_name: self.describe(),
            message: e.to_string(),
        })?;
        let missing: Vec<&str> = CATALOG_FIELDS
            .iter()
            .copied()
            .filter(|field| !headers.iter().any(|h| h == *field))
            .collect();
        if !missing.is_empty() {
            return Err(CatalogError::Read {
                source_name: self.describe(),
                message: format!("missing column(s): {}", missing.join(", ")),
            });
        }

        let mut entries = Vec::new();
        for (index, record) in reader.deserialize::<CsvCatalogRecord>().enumerate() {
            let record = record.map_err(|e| CatalogError::Row {
                source_name: self.describe(),
                row: index + 1,
                message: e.to_string(),
            })?;
            entries.push(CatalogEntry {
                source_name: record.table_name.unwrap_or_default(),
                item_id: record.item_id.unwrap_or_default(),
                published_name: record.published_name.unwrap_or_default(),
            });
        }
        Ok(entries)
    }
}
