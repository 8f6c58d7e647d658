//! Mutations derived from a report.

use crate::checks::{CheckStatus, split_list};
use crate::report::{Report, ReportRow};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// One portal write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    /// Title and tags are written by the same item update call.
    UpdateDetails {
        title: Option<String>,
        tags: Option<Vec<String>>,
    },
    ShareWithGroup {
        group: String,
    },
    MoveToFolder {
        folder: String,
    },
    Protect,
    EnableDownloads,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    UpdateDetails,
    ShareWithGroup,
    MoveToFolder,
    Protect,
    EnableDownloads,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpdateDetails => "update_details",
            Self::ShareWithGroup => "share_with_group",
            Self::MoveToFolder => "move_to_folder",
            Self::Protect => "protect",
            Self::EnableDownloads => "enable_downloads",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::UpdateDetails { .. } => MutationKind::UpdateDetails,
            Self::ShareWithGroup { .. } => MutationKind::ShareWithGroup,
            Self::MoveToFolder { .. } => MutationKind::MoveToFolder,
            Self::Protect => MutationKind::Protect,
            Self::EnableDownloads => MutationKind::EnableDownloads,
        }
    }
}

/// Mutations for one item, in application order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPlan {
    pub item_id: String,
    pub mutations: Vec<Mutation>,
}

impl ItemPlan {
    /// Every fixable check of `row` becomes a mutation.
    pub fn from_row(row: &ReportRow) -> Self {
        let mut mutations = Vec::new();

        let title = row.title.needs_fix().then(|| row.title.new().to_string());
        let tags = row.tags.needs_fix().then(|| split_list(row.tags.new()));
        if title.is_some() || tags.is_some() {
            mutations.push(Mutation::UpdateDetails { title, tags });
        }
        if row.groups.needs_fix() {
            mutations.push(Mutation::ShareWithGroup {
                group: row.groups.new().to_string(),
            });
        }
        if row.folder.needs_fix() {
            mutations.push(Mutation::MoveToFolder {
                folder: row.folder.new().to_string(),
            });
        }
        if row.delete_protection == CheckStatus::Fix {
            mutations.push(Mutation::Protect);
        }
        if row.downloads == CheckStatus::Fix {
            mutations.push(Mutation::EnableDownloads);
        }

        Self {
            item_id: row.item_id.clone(),
            mutations,
        }
    }
}

/// Items with at least one mutation, in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    items: Vec<ItemPlan>,
}

impl Plan {
    pub fn from_report(report: &Report) -> Self {
        Self::from_item_plans(report.rows().iter().map(ItemPlan::from_row))
    }

    /// Keep the item plans that have something to do.
    pub fn from_item_plans(items: impl IntoIterator<Item = ItemPlan>) -> Self {
        let items = items
            .into_iter()
            .filter(|plan| !plan.mutations.is_empty())
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[ItemPlan] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn mutation_count(&self) -> usize {
        self.items.iter().map(|item| item.mutations.len()).sum()
    }

    pub fn counts(&self) -> BTreeMap<MutationKind, usize> {
        let mut counts = BTreeMap::new();
        for mutation in self.items.iter().flat_map(|item| &item.mutations) {
            *counts.entry(mutation.kind()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{CheckResult, EMPTY_VALUE, join_list};

    fn clean_row(item_id: &str) -> ReportRow {
        ReportRow {
            item_id: item_id.to_string(),
            title: CheckResult::pass(),
            groups: CheckResult::pass(),
            folder: CheckResult::pass(),
            tags: CheckResult::pass(),
            downloads: CheckStatus::Pass,
            delete_protection: CheckStatus::Pass,
        }
    }

    #[test]
    fn clean_rows_produce_no_plan_items() {
        let mut report = Report::new();
        report.push(clean_row("aaa")).expect("row should push");
        let plan = Plan::from_report(&report);
        assert!(plan.is_empty());
        assert_eq!(plan.mutation_count(), 0);
    }

    #[test]
    fn title_and_tags_collapse_into_one_update() {
        let mut row = clean_row("aaa");
        row.title = CheckResult::fix("roads", "Utah Roads");
        row.tags = CheckResult::fix("roads", "Transportation; SGID; AGRC");
        let plan = ItemPlan::from_row(&row);
        assert_eq!(
            plan.mutations,
            vec![Mutation::UpdateDetails {
                title: Some("Utah Roads".to_string()),
                tags: Some(vec![
                    "Transportation".to_string(),
                    "SGID".to_string(),
                    "AGRC".to_string()
                ]),
            }]
        );
    }

    #[test]
    fn tags_only_update_leaves_title_unset() {
        let mut row = clean_row("aaa");
        row.tags = CheckResult::fix("roads; .sd", EMPTY_VALUE);
        let plan = ItemPlan::from_row(&row);
        assert_eq!(
            plan.mutations,
            vec![Mutation::UpdateDetails {
                title: None,
                tags: Some(Vec::new()),
            }]
        );
    }

    #[test]
    fn unavailable_and_skipped_checks_never_mutate() {
        let mut row = clean_row("aaa");
        row.groups = CheckResult::unavailable();
        row.title = CheckResult::skipped();
        row.folder = CheckResult::skipped();
        assert!(ItemPlan::from_row(&row).mutations.is_empty());
    }

    #[test]
    fn counts_group_by_kind() {
        let mut first = clean_row("aaa");
        first.groups = CheckResult::fix("(none)", "Utah SGID Water");
        first.folder = CheckResult::fix("/", "Water");
        first.delete_protection = CheckStatus::Fix;
        let mut second = clean_row("bbb");
        second.delete_protection = CheckStatus::Fix;
        second.downloads = CheckStatus::Fix;

        let mut report = Report::new();
        report.push(first).expect("row should push");
        report.push(clean_row("ccc")).expect("row should push");
        report.push(second).expect("row should push");

        let plan = Plan::from_report(&report);
        assert_eq!(plan.items().len(), 2);
        assert_eq!(plan.mutation_count(), 5);
        let counts = plan.counts();
        assert_eq!(counts.get(&MutationKind::Protect), Some(&2));
        assert_eq!(counts.get(&MutationKind::ShareWithGroup), Some(&1));
        assert_eq!(counts.get(&MutationKind::UpdateDetails), None);
        assert_eq!(
            plan.items()[0].mutations,
            vec![
                Mutation::ShareWithGroup {
                    group: "Utah SGID Water".to_string()
                },
                Mutation::MoveToFolder {
                    folder: "Water".to_string()
                },
                Mutation::Protect,
            ]
        );
    }

    #[test]
    fn mutations_serialize_with_kind_tag() {
        let value = serde_json::to_value(Mutation::MoveToFolder {
            folder: "Water".to_string(),
        })
        .expect("mutation should serialize");
        assert_eq!(value["kind"], "move_to_folder");
        assert_eq!(value["folder"], "Water");
    }

    #[test]
    fn tag_values_with_separators_survive_the_report() {
        let mut row = clean_row("aaa");
        row.tags = CheckResult::fix(
            join_list(&["roads"]),
            join_list(&["Trails; Paths", EMPTY_VALUE]),
        );
        let mut report = Report::new();
        report.push(row).expect("row should push");
        let mut buffer = Vec::new();
        report.write_to(&mut buffer).expect("report should render");
        let reloaded = Report::read_from(buffer.as_slice()).expect("report should read");

        assert_eq!(
            Plan::from_report(&reloaded).items()[0].mutations,
            vec![Mutation::UpdateDetails {
                title: None,
                tags: Some(vec!["Trails; Paths".to_string(), EMPTY_VALUE.to_string()]),
            }]
        );
    }
}
