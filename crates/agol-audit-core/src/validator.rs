//! Check phase and fix phase.

use crate::catalog::Catalog;
use crate::checks::{
    check_delete_protection, check_downloads, check_folder, check_groups, check_tags,
    check_title, desired_title,
};
use crate::item::RemoteItem;
use crate::org::duplicate_titles;
use crate::plan::{ItemPlan, Mutation, MutationKind, Plan};
use crate::portal::{Portal, PortalError};
use crate::report::{Report, ReportError, ReportRow};
use crate::tags::TagPolicy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Everything the checks found for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAudit {
    pub row: ReportRow,
    pub plan: ItemPlan,
    pub groups_unavailable: bool,
}

/// Output of the check phase.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRun {
    pub report: Report,
    pub plan: Plan,
    /// Items whose group membership could not be read.
    pub failed_group_items: Vec<String>,
    pub duplicate_titles: BTreeMap<String, Vec<String>>,
}

/// Runs every attribute check against a catalog snapshot.
pub struct Validator<'a> {
    catalog: &'a Catalog,
    policy: &'a TagPolicy,
}

impl<'a> Validator<'a> {
    pub fn new(catalog: &'a Catalog, policy: &'a TagPolicy) -> Self {
        Self { catalog, policy }
    }

    pub fn audit_item(&self, item: &RemoteItem) -> ItemAudit {
        let entry = self.catalog.get(&item.item_id);
        let title = desired_title(entry).unwrap_or(&item.title);
        let (tags, reconciliation) = check_tags(item, title, self.policy);

        let row = ReportRow {
            item_id: item.item_id.clone(),
            title: check_title(item, entry),
            groups: check_groups(item, entry),
            folder: check_folder(item, entry),
            tags,
            downloads: check_downloads(item).status(),
            delete_protection: check_delete_protection(item).status(),
        };
        let plan = ItemPlan::from_row(&row);
        ItemAudit {
            row,
            plan,
            groups_unavailable: reconciliation.groups_unavailable,
        }
    }

    /// Check every item, in order. Lookup failures never abort the run.
    pub fn check(&self, items: &[RemoteItem]) -> CheckRun {
        let mut run = CheckRun::default();
        let mut plans = Vec::new();

        for item in items {
            let audit = self.audit_item(item);
            if audit.groups_unavailable {
                run.failed_group_items.push(item.item_id.clone());
            }
            tracing::info!(
                item = %item.item_id,
                title = %item.title,
                needs_fix = audit.row.needs_any_fix(),
                "checked item"
            );
            if let Err(ReportError::DuplicateItem(id)) = run.report.push(audit.row) {
                tracing::warn!(item = %id, "item enumerated twice; keeping the first");
                continue;
            }
            plans.push(audit.plan);
        }

        run.plan = Plan::from_item_plans(plans);
        run.duplicate_titles = duplicate_titles(items);
        run
    }

    pub fn apply<P: Portal + ?Sized>(
        &self,
        portal: &P,
        plan: &Plan,
        items: &[RemoteItem],
    ) -> FixRun {
        apply_plan(portal, plan, items)
    }
}

/// Result of one mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixOutcome {
    pub item_id: String,
    pub kind: MutationKind,
    pub succeeded: bool,
    pub message: String,
}

/// Output of the fix phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FixRun {
    pub outcomes: Vec<FixOutcome>,
}

const FIX_COLUMNS: [&str; 4] = ["item_id", "mutation", "result", "message"];

impl FixRun {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Successful fixes per mutation kind.
    pub fn fixed_counts(&self) -> BTreeMap<MutationKind, usize> {
        let mut counts = BTreeMap::new();
        for outcome in self.outcomes.iter().filter(|o| o.succeeded) {
            *counts.entry(outcome.kind).or_insert(0) += 1;
        }
        counts
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
        let mut writer = csv::Writer::from_path(path).map_err(|e| io_error(e.to_string()))?;
        writer
            .write_record(FIX_COLUMNS)
            .map_err(|e| io_error(e.to_string()))?;
        for outcome in &self.outcomes {
            let result = if outcome.succeeded { "ok" } else { "failed" };
            writer
                .write_record([
                    outcome.item_id.as_str(),
                    outcome.kind.as_str(),
                    result,
                    outcome.message.as_str(),
                ])
                .map_err(|e| io_error(e.to_string()))?;
        }
        writer.flush().map_err(|e| io_error(e.to_string()))
    }
}

/// Apply every mutation of `plan`, each independently.
///
/// Items are looked up by id. A failed call is recorded and the remaining
/// mutations still run; a plan entry whose item was not enumerated records
/// a failure for each of its mutations.
pub fn apply_plan<P: Portal + ?Sized>(portal: &P, plan: &Plan, items: &[RemoteItem]) -> FixRun {
    let by_id: BTreeMap<&str, &RemoteItem> = items
        .iter()
        .map(|item| (item.item_id.as_str(), item))
        .collect();

    let mut run = FixRun::default();
    for item_plan in plan.items() {
        let item = by_id.get(item_plan.item_id.as_str()).copied();
        for mutation in &item_plan.mutations {
            let outcome = match item {
                Some(item) => apply_one(portal, item, mutation),
                None => FixOutcome {
                    item_id: item_plan.item_id.clone(),
                    kind: mutation.kind(),
                    succeeded: false,
                    message: format!("Failed to {}: missing item", mutation.kind()),
                },
            };
            if outcome.succeeded {
                tracing::info!(item = %outcome.item_id, mutation = %outcome.kind, "{}", outcome.message);
            } else {
                tracing::warn!(item = %outcome.item_id, mutation = %outcome.kind, "{}", outcome.message);
            }
            run.outcomes.push(outcome);
        }
    }
    run
}

fn apply_one<P: Portal + ?Sized>(portal: &P, item: &RemoteItem, mutation: &Mutation) -> FixOutcome {
    let (result, success, failure): (Result<(), PortalError>, String, String) = match mutation {
        Mutation::UpdateDetails { title, tags } => {
            let mut parts = Vec::new();
            if let Some(title) = title {
                parts.push(format!("title to {title}"));
            }
            if let Some(tags) = tags {
                parts.push(format!("tags to [{}]", tags.join(", ")));
            }
            let parts = parts.join(", ");
            (
                portal.update_details(item, title.as_deref(), tags.as_deref()),
                format!("Updated {parts}"),
                format!("Failed to update {parts}"),
            )
        }
        Mutation::ShareWithGroup { group } => (
            portal.share_with_group(item, group),
            format!("Group updated to {group}"),
            format!("Failed to update group to {group}"),
        ),
        Mutation::MoveToFolder { folder } => (
            portal.move_to_folder(item, folder),
            format!("Item moved to {folder}"),
            format!("Failed to move item to {folder}"),
        ),
        Mutation::Protect => (
            portal.protect(item),
            "Item protected".to_string(),
            "Failed to protect item".to_string(),
        ),
        Mutation::EnableDownloads => (
            portal.enable_downloads(item),
            "Downloads enabled".to_string(),
            "Failed to enable downloads".to_string(),
        ),
    };

    let (succeeded, message) = match result {
        Ok(()) => (true, success),
        Err(error) => (false, format!("{failure}: {error}")),
    };
    FixOutcome {
        item_id: item.item_id.clone(),
        kind: mutation.kind(),
        succeeded,
        message,
    }
}
