//! Per-attribute checks comparing an item against its desired state.

use crate::catalog::CatalogEntry;
use crate::item::{Lookup, RemoteItem};
use crate::tags::{TagPolicy, TagReconciliation, reconcile_tags};
use serde::{Deserialize, Serialize};

/// Placeholder for an empty old/new value on a check that needs fixing.
pub const EMPTY_VALUE: &str = "(none)";

/// Folder value reported for the owner's root folder.
pub const ROOT_FOLDER: &str = "/";

/// Value separator for list-valued report fields.
pub const LIST_SEPARATOR: &str = "; ";

/// Join values into one report cell.
///
/// `;` and `\` inside a value are escaped with `\`, as is a value spelling
/// [`EMPTY_VALUE`], so [`split_list`] gives the same values back.
pub fn join_list<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|value| escape_list_value(value.as_ref()))
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

fn escape_list_value(value: &str) -> String {
    if value == EMPTY_VALUE {
        return format!("\\{value}");
    }
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == ';' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Values of a report cell written by [`join_list`]. [`EMPTY_VALUE`] is the
/// empty list.
pub fn split_list(cell: &str) -> Vec<String> {
    if cell == EMPTY_VALUE {
        return Vec::new();
    }
    let mut values = Vec::new();
    let mut current = String::new();
    let mut chars = cell.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => current.extend(chars.next()),
            ';' => values.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    values.push(current);
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

pub const EXTRACT_CAPABILITY: &str = "Extract";

/// Outcome class of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// The attribute already matches.
    Pass,
    /// The attribute differs and can be fixed.
    Fix,
    /// The current value could not be read; nothing can be fixed.
    Unavailable,
    /// The check does not apply (item not in the catalog).
    Skipped,
}

impl CheckStatus {
    /// Report flag: `Y`, `N`, `Error`, or empty for skipped checks.
    pub fn flag(self) -> &'static str {
        match self {
            Self::Pass => "N",
            Self::Fix => "Y",
            Self::Unavailable => "Error",
            Self::Skipped => "",
        }
    }

    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.trim() {
            "N" => Some(Self::Pass),
            "Y" => Some(Self::Fix),
            "Error" => Some(Self::Unavailable),
            "" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// Result of one check.
///
/// A result that needs fixing always carries non-empty old and new values;
/// every other result carries empty ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    status: CheckStatus,
    old: String,
    new: String,
}

impl CheckResult {
    pub fn pass() -> Self {
        Self::bare(CheckStatus::Pass)
    }

    pub fn skipped() -> Self {
        Self::bare(CheckStatus::Skipped)
    }

    pub fn unavailable() -> Self {
        Self::bare(CheckStatus::Unavailable)
    }

    /// A fixable mismatch. Empty values are replaced with [`EMPTY_VALUE`].
    pub fn fix(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Fix,
            old: non_empty(old.into()),
            new: non_empty(new.into()),
        }
    }

    /// Rebuild a result from persisted parts, enforcing the old/new invariant.
    pub fn from_parts(status: CheckStatus, old: &str, new: &str) -> Result<Self, String> {
        let (old, new) = (old.trim(), new.trim());
        match status {
            CheckStatus::Fix if old.is_empty() || new.is_empty() => {
                Err("fix flagged without old and new values".to_string())
            }
            CheckStatus::Fix => Ok(Self::fix(old, new)),
            _ if !old.is_empty() || !new.is_empty() => Err(format!(
                "flag {:?} must not carry old/new values",
                status.flag()
            )),
            other => Ok(Self::bare(other)),
        }
    }

    fn bare(status: CheckStatus) -> Self {
        Self {
            status,
            old: String::new(),
            new: String::new(),
        }
    }

    pub fn status(&self) -> CheckStatus {
        self.status
    }

    pub fn needs_fix(&self) -> bool {
        self.status == CheckStatus::Fix
    }

    pub fn old(&self) -> &str {
        &self.old
    }

    pub fn new(&self) -> &str {
        &self.new
    }
}

fn non_empty(value: String) -> String {
    if value.trim().is_empty() {
        EMPTY_VALUE.to_string()
    } else {
        value
    }
}

/// Title the item should carry: the catalog's published name, if any.
pub fn desired_title(entry: Option<&CatalogEntry>) -> Option<&str> {
    entry
        .map(|e| e.published_name.trim())
        .filter(|title| !title.is_empty())
}

pub fn check_title(item: &RemoteItem, entry: Option<&CatalogEntry>) -> CheckResult {
    if entry.is_none() {
        return CheckResult::skipped();
    }
    match desired_title(entry) {
        Some(title) if title != item.title => CheckResult::fix(item.title.clone(), title),
        _ => CheckResult::pass(),
    }
}

pub fn check_groups(item: &RemoteItem, entry: Option<&CatalogEntry>) -> CheckResult {
    let Some(group) = entry.and_then(CatalogEntry::expected_group) else {
        return CheckResult::skipped();
    };
    match &item.groups {
        Lookup::Unavailable(_) => CheckResult::unavailable(),
        Lookup::Fetched(current) if current.contains(&group) => CheckResult::pass(),
        Lookup::Fetched(current) => CheckResult::fix(join_list(current), group),
    }
}

pub fn check_folder(item: &RemoteItem, entry: Option<&CatalogEntry>) -> CheckResult {
    let Some(folder) = entry.and_then(CatalogEntry::category) else {
        return CheckResult::skipped();
    };
    if item.folder.as_deref() == Some(folder.as_str()) {
        CheckResult::pass()
    } else {
        CheckResult::fix(item.folder.as_deref().unwrap_or(ROOT_FOLDER), folder)
    }
}

/// Reconcile the item's tags against `title` and report whether they change.
pub fn check_tags(
    item: &RemoteItem,
    title: &str,
    policy: &TagPolicy,
) -> (CheckResult, TagReconciliation) {
    let reconciliation = reconcile_tags(&item.tags, title, &item.groups, policy);
    let result = if reconciliation.changed {
        CheckResult::fix(
            join_list(&item.tags),
            join_list(&reconciliation.tags),
        )
    } else {
        CheckResult::pass()
    };
    (result, reconciliation)
}

/// Downloads are enabled when the service has the `Extract` capability.
///
/// Unreadable capabilities pass: the service may not be a hosted layer the
/// owner can administer.
pub fn check_downloads(item: &RemoteItem) -> CheckResult {
    let Some(current) = item.capabilities.fetched() else {
        return CheckResult::pass();
    };
    if current
        .iter()
        .any(|c| c.trim().eq_ignore_ascii_case(EXTRACT_CAPABILITY))
    {
        return CheckResult::pass();
    }
    let mut enabled = current.clone();
    enabled.push(EXTRACT_CAPABILITY.to_string());
    CheckResult::fix(current.join(","), enabled.join(","))
}

pub fn check_delete_protection(item: &RemoteItem) -> CheckResult {
    if item.protected {
        CheckResult::pass()
    } else {
        CheckResult::fix("false", "true")
    }
}
