//! Check report: one row per audited item, persisted as CSV.

use crate::checks::{CheckResult, CheckStatus};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

/// Report columns after the `item_id` index column.
pub const REPORT_COLUMNS: [&str; 14] = [
    "fix_title",
    "old_title",
    "new_title",
    "fix_groups",
    "old_groups",
    "new_group",
    "fix_folder",
    "old_folder",
    "new_folder",
    "fix_tags",
    "old_tags",
    "new_tags",
    "fix_downloads",
    "fix_delete_protection",
];

const INDEX_COLUMN: &str = "item_id";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report {path}: I/O error: {message}")]
    Io { path: String, message: String },

    #[error("report header mismatch: expected `{expected}`, found `{found}`")]
    Header { expected: String, found: String },

    #[error("report row {row}: {message}")]
    Row { row: usize, message: String },

    #[error("report lists item {0} more than once")]
    DuplicateItem(String),
}

/// Check outcomes for one item.
///
/// Downloads and delete protection are flag-only columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub item_id: String,
    pub title: CheckResult,
    pub groups: CheckResult,
    pub folder: CheckResult,
    pub tags: CheckResult,
    pub downloads: CheckStatus,
    pub delete_protection: CheckStatus,
}

impl ReportRow {
    pub fn needs_any_fix(&self) -> bool {
        self.title.needs_fix()
            || self.groups.needs_fix()
            || self.folder.needs_fix()
            || self.tags.needs_fix()
            || self.downloads == CheckStatus::Fix
            || self.delete_protection == CheckStatus::Fix
    }

    fn to_record(&self) -> Vec<&str> {
        let mut record = vec![self.item_id.as_str()];
        for result in [&self.title, &self.groups, &self.folder, &self.tags] {
            record.extend([result.status().flag(), result.old(), result.new()]);
        }
        record.push(self.downloads.flag());
        record.push(self.delete_protection.flag());
        record
    }

    fn from_record(row: usize, record: &csv::StringRecord) -> Result<Self, ReportError> {
        let invalid = |message: String| ReportError::Row { row, message };
        let field = |index: usize| record.get(index).unwrap_or("");
        let status = |index: usize| {
            CheckStatus::from_flag(field(index)).ok_or_else(|| {
                invalid(format!(
                    "unknown flag {:?} in {}",
                    field(index),
                    REPORT_COLUMNS[index - 1]
                ))
            })
        };
        let result = |index: usize| -> Result<CheckResult, ReportError> {
            CheckResult::from_parts(status(index)?, field(index + 1), field(index + 2))
                .map_err(|message| invalid(format!("{}: {message}", REPORT_COLUMNS[index - 1])))
        };

        let item_id = field(0).trim();
        if item_id.is_empty() {
            return Err(invalid("missing item_id".to_string()));
        }

        Ok(Self {
            item_id: item_id.to_string(),
            title: result(1)?,
            groups: result(4)?,
            folder: result(7)?,
            tags: result(10)?,
            downloads: status(13)?,
            delete_protection: status(14)?,
        })
    }
}

/// Ordered report rows, unique by item id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    rows: Vec<ReportRow>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row. A row for an item already in the report is rejected.
    pub fn push(&mut self, row: ReportRow) -> Result<(), ReportError> {
        if self.get(&row.item_id).is_some() {
            return Err(ReportError::DuplicateItem(row.item_id));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn get(&self, item_id: &str) -> Option<&ReportRow> {
        self.rows.iter().find(|row| row.item_id == item_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows with at least one fixable check.
    pub fn fixable_rows(&self) -> usize {
        self.rows.iter().filter(|row| row.needs_any_fix()).count()
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let path = path.as_ref();
        let io_error = |message: String| ReportError::Io {
            path: path.display().to_string(),
            message,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| io_error(e.to_string()))?;
        }
        let file = fs::File::create(path).map_err(|e| io_error(e.to_string()))?;
        self.write_to(file).map_err(|e| match e {
            ReportError::Io { message, .. } => io_error(message),
            other => other,
        })
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let io_error = |message: String| ReportError::Io {
            path: "<writer>".to_string(),
            message,
        };
        let mut writer = csv::Writer::from_writer(writer);
        writer
            .write_record(header())
            .map_err(|e| io_error(e.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(row.to_record())
                .map_err(|e| io_error(e.to_string()))?;
        }
        writer.flush().map_err(|e| io_error(e.to_string()))
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|e| ReportError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::read_from(file).map_err(|e| match e {
            ReportError::Io { message, .. } => ReportError::Io {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Parse a report, validating the header and every row's flags.
    pub fn read_from<R: Read>(reader: R) -> Result<Self, ReportError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let found = reader.headers().map_err(|e| ReportError::Io {
            path: "<reader>".to_string(),
            message: e.to_string(),
        })?;
        let expected = header();
        if !found.iter().eq(expected.iter().copied()) {
            return Err(ReportError::Header {
                expected: expected.join(","),
                found: found.iter().collect::<Vec<_>>().join(","),
            });
        }

        let mut report = Self::new();
        let mut seen = BTreeSet::new();
        for (index, record) in reader.records().enumerate() {
            let row = index + 1;
            let record = record.map_err(|e| ReportError::Row {
                row,
                message: e.to_string(),
            })?;
            let parsed = ReportRow::from_record(row, &record)?;
            if !seen.insert(parsed.item_id.clone()) {
                return Err(ReportError::DuplicateItem(parsed.item_id));
            }
            report.rows.push(parsed);
        }
        Ok(report)
    }
}

fn header() -> Vec<&'static str> {
    let mut columns = vec![INDEX_COLUMN];
    columns.extend(REPORT_COLUMNS);
    columns
}

/// Report file name for a check run on `date`.
pub fn checks_file_name(date: NaiveDate) -> String {
    format!("checks_{}.csv", date.format("%Y-%m-%d"))
}

/// Outcome file name for a fix run on `date`.
pub fn fixes_file_name(date: NaiveDate) -> String {
    format!("fixes_{}.csv", date.format("%Y-%m-%d"))
}
