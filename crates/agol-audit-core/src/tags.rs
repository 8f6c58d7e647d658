//! Tag normalization and reconciliation.
//!
//! Tags are cased against two exception lists (words that are always
//! uppercased, and articles that are always lowercased) and otherwise
//! title-cased. Reconciliation then drops deleted and title-redundant tags
//! and synthesizes SGID category tags from group membership.

use crate::item::Lookup;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Group titles carrying this marker are SGID category groups.
pub const SGID_GROUP_MARKER: &str = "Utah SGID";
const SGID_GROUP_PREFIX: &str = "Utah SGID ";
const UTAH_TAG: &str = "Utah";
const SGID_TAG: &str = "SGID";
const AGRC_TAG: &str = "AGRC";

const DEFAULT_UPPERCASED: &[&str] = &[
    "2g", "3g", "4g", "agol", "agrc", "aog", "at&t", "atv", "blm", "brat", "caf", "cdl", "dabc",
    "daq", "dem", "dfcm", "dfirm", "dnr", "dogm", "dot", "dsl", "dsm", "dtm", "dwq", "e911", "ems",
    "epa", "fae", "fcc", "fema", "gcdb", "gis", "gnis", "hava", "huc", "lir", "lrs", "lte", "luca",
    "mrrc", "nca", "ng911", "ngda", "nox", "npsbn", "ntia", "nwi", "osa", "pli", "plss", "pm10",
    "ppm", "psap", "sao", "sbdc", "sbi", "sgid", "sitla", "sligp", "trax", "uca", "udot", "ugs",
    "uhp", "uic", "uipa", "us", "usao", "usdw", "usfs", "usfws", "usps", "ustc", "ut", "uta",
    "utsc", "vcp", "vista", "voc", "wbd", "wre",
];

const DEFAULT_ARTICLES: &[&str] = &["a", "an", "the", "of", "is", "in"];

const DEFAULT_DELETE: &[&str] = &[
    ".sd",
    "service definition",
    "required: common-use word or phrase used to describe the subject of the data set",
    "required: common-use word or phrase used to describe the subject of the data set.",
    "002",
];

/// Casing and deletion rules applied to every tag.
///
/// All three sets hold lowercase entries; constructors lowercase their input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPolicy {
    pub uppercased: BTreeSet<String>,
    pub articles: BTreeSet<String>,
    pub delete: BTreeSet<String>,
}

impl TagPolicy {
    pub fn new<I, J, K, S>(uppercased: I, articles: J, delete: K) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = S>,
        K: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            uppercased: lowercase_set(uppercased),
            articles: lowercase_set(articles),
            delete: lowercase_set(delete),
        }
    }
}

impl Default for TagPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_UPPERCASED.iter().copied(),
            DEFAULT_ARTICLES.iter().copied(),
            DEFAULT_DELETE.iter().copied(),
        )
    }
}

fn lowercase_set<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|value| collapse_whitespace(value.as_ref()).to_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title-case one token: every letter that follows a non-letter is
/// uppercased and the rest are lowercased, so `water-related` becomes
/// `Water-Related` and `3d` becomes `3D`.
///
/// A letter whose uppercase form is more than one character (`ß`) is left
/// lowercase, which keeps the result stable when cased again.
pub fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut at_word_start = true;
    for ch in word.chars() {
        if !ch.is_alphabetic() {
            out.push(ch);
            at_word_start = true;
            continue;
        }
        if at_word_start {
            let mut upper = ch.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(single), None) => out.push(single),
                _ => out.extend(ch.to_lowercase()),
            }
        } else {
            out.extend(ch.to_lowercase());
        }
        at_word_start = false;
    }
    out
}

/// Normalize a single or multi-word tag.
///
/// Periods are removed from every word; words in `policy.uppercased` are
/// uppercased, words in `policy.articles` are lowercased, and everything else
/// is title-cased. Articles are lowercased even at the start of a tag.
pub fn normalize_tag(tag: &str, policy: &TagPolicy) -> String {
    tag.split_whitespace()
        .map(|word| {
            let cleaned = word.replace('.', "");
            let lower = cleaned.to_lowercase();
            if policy.uppercased.contains(&lower) {
                cleaned.to_uppercase()
            } else if policy.articles.contains(&lower) {
                lower
            } else {
                title_case(&cleaned)
            }
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result of reconciling one item's tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagReconciliation {
    pub tags: Vec<String>,
    pub changed: bool,
    /// Group membership could not be read, so no category tags were added.
    pub groups_unavailable: bool,
}

/// Build the canonical tag list for an item.
///
/// `title` is the title the item should have (the catalog title when one
/// exists). Title matching is case-insensitive: single-word tags are dropped
/// when they equal a title word, multi-word tags when they occur anywhere in
/// the title. Deletion and title matching see the tag both as written and
/// with its periods removed, so `U.S.` is redundant in `US Highways`.
pub fn reconcile_tags(
    existing: &[String],
    title: &str,
    groups: &Lookup<Vec<String>>,
    policy: &TagPolicy,
) -> TagReconciliation {
    let title_key = collapse_whitespace(title).to_lowercase();
    let title_words: Vec<&str> = title_key.split(' ').collect();

    let in_title = |key: &str| {
        title_words.contains(&key) || (key.contains(' ') && title_key.contains(key))
    };

    let mut tags: Vec<String> = Vec::new();
    for raw in existing {
        let key = collapse_whitespace(raw).to_lowercase();
        // The tag as it reads once normalized; a kept tag must clear both keys.
        let stripped = collapse_whitespace(&key.replace('.', ""));
        if stripped.is_empty() {
            continue;
        }
        let redundant = in_title(&key) || in_title(&stripped);

        if stripped == "utah" && !redundant {
            push_unique(&mut tags, UTAH_TAG.to_string());
        } else if policy.delete.contains(&key) || policy.delete.contains(&stripped) || redundant {
            continue;
        } else {
            let cased = normalize_tag(raw, policy);
            if !cased.is_empty() {
                push_unique(&mut tags, cased);
            }
        }
    }

    let groups_unavailable = match groups {
        Lookup::Fetched(titles) => {
            for group in titles.iter().filter(|g| g.contains(SGID_GROUP_MARKER)) {
                if let Some(category) = group.rsplit(SGID_GROUP_PREFIX).next() {
                    let category = category.trim();
                    if !category.is_empty() {
                        ensure_single(&mut tags, category);
                    }
                }
                ensure_single(&mut tags, SGID_TAG);
                ensure_single(&mut tags, AGRC_TAG);
            }
            false
        }
        Lookup::Unavailable(_) => true,
    };

    let mut before: Vec<&str> = existing.iter().map(String::as_str).collect();
    let mut after: Vec<&str> = tags.iter().map(String::as_str).collect();
    before.sort_unstable();
    after.sort_unstable();
    let changed = before != after;

    TagReconciliation {
        tags,
        changed,
        groups_unavailable,
    }
}

fn push_unique(tags: &mut Vec<String>, tag: String) {
    if !tags.contains(&tag) {
        tags.push(tag);
    }
}

/// Keep exactly one tag matching `canonical` case-insensitively, spelled as
/// `canonical`, at the position of the first match (or appended).
fn ensure_single(tags: &mut Vec<String>, canonical: &str) {
    let wanted = canonical.to_lowercase();
    let mut seen = false;
    tags.retain_mut(|tag| {
        if tag.to_lowercase() != wanted {
            return true;
        }
        if seen {
            return false;
        }
        seen = true;
        *tag = canonical.to_string();
        true
    });
    if !seen {
        tags.push(canonical.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn no_groups() -> Lookup<Vec<String>> {
        Lookup::Fetched(Vec::new())
    }

    #[test]
    fn normalize_applies_exception_lists() {
        let policy = TagPolicy::default();
        assert_eq!(normalize_tag("agrc", &policy), "AGRC");
        assert_eq!(normalize_tag("udot", &policy), "UDOT");
        assert_eq!(normalize_tag("Plss Fabric", &policy), "PLSS Fabric");
        assert_eq!(normalize_tag("water-related", &policy), "Water-Related");
        assert_eq!(
            normalize_tag("U.S. bureau Of Geoinformation", &policy),
            "US Bureau of Geoinformation"
        );
    }

    #[test]
    fn normalize_lowercases_leading_articles() {
        let policy = TagPolicy::default();
        assert_eq!(normalize_tag("The Great Salt Lake", &policy), "the Great Salt Lake");
    }

    #[test]
    fn normalize_collapses_whitespace() {
        let policy = TagPolicy::default();
        assert_eq!(normalize_tag("  salt   lake  ", &policy), "Salt Lake");
    }

    #[test]
    fn normalize_is_idempotent() {
        let policy = TagPolicy::default();
        for tag in [
            "agrc",
            "Plss Fabric",
            "water-related",
            "U.S. bureau Of Geoinformation",
            "at&t towers",
            "e911 PSAP boundaries",
            "o'brien's   field",
            "3d buildings",
            "straße ß",
            "a tale of the CITY",
            "...",
        ] {
            let once = normalize_tag(tag, &policy);
            assert_eq!(normalize_tag(&once, &policy), once, "tag {tag:?}");
        }
    }

    #[test]
    fn title_case_handles_punctuation_runs() {
        assert_eq!(title_case("water-related"), "Water-Related");
        assert_eq!(title_case("o'brien"), "O'Brien");
        assert_eq!(title_case("3d"), "3D");
        assert_eq!(title_case("pm2.5"), "Pm2.5");
        assert_eq!(title_case("BOUNDARIES"), "Boundaries");
        assert_eq!(title_case("landownership/parcels"), "Landownership/Parcels");
    }

    #[test]
    fn policy_constructor_lowercases_entries() {
        let policy = TagPolicy::new(["AGRC"], ["Of"], ["Service  Definition"]);
        assert!(policy.uppercased.contains("agrc"));
        assert!(policy.articles.contains("of"));
        assert!(policy.delete.contains("service definition"));
    }

    #[test]
    fn reconcile_removes_deleted_tags_regardless_of_case() {
        let policy = TagPolicy::default();
        let result = reconcile_tags(
            &strings(&[".SD", "Service Definition", "roads"]),
            "Highways",
            &no_groups(),
            &policy,
        );
        assert_eq!(result.tags, strings(&["Roads"]));
        assert!(result.changed);
    }

    #[test]
    fn reconcile_drops_title_redundant_tags() {
        let policy = TagPolicy::default();
        let result = reconcile_tags(
            &strings(&["Parcels", "salt lake", "County", "Lake Parcel"]),
            "Salt Lake County Parcels",
            &no_groups(),
            &policy,
        );
        // "Lake Parcel" is not a substring of the title.
        assert_eq!(result.tags, strings(&["Lake Parcel"]));
    }

    #[test]
    fn reconcile_keeps_utah_literal_unless_title_word() {
        let policy = TagPolicy::default();
        let kept = reconcile_tags(
            &strings(&["utah", "UTAH"]),
            "Bicycle Network",
            &no_groups(),
            &policy,
        );
        assert_eq!(kept.tags, strings(&["Utah"]));

        let dropped = reconcile_tags(&strings(&["utah"]), "Utah Roads", &no_groups(), &policy);
        assert!(dropped.tags.is_empty());
    }

    #[test]
    fn reconcile_dedupes_after_normalizing() {
        let policy = TagPolicy::default();
        let result = reconcile_tags(
            &strings(&["roads", "Roads", " ROADS "]),
            "Transportation",
            &no_groups(),
            &policy,
        );
        assert_eq!(result.tags, strings(&["Roads"]));
    }

    #[test]
    fn reconcile_skips_blank_tags() {
        let policy = TagPolicy::default();
        let result = reconcile_tags(&strings(&["", "   ", "."]), "Title", &no_groups(), &policy);
        assert!(result.tags.is_empty());
        assert!(result.changed);
    }

    #[test]
    fn reconcile_adds_category_sgid_and_agrc_once() {
        let policy = TagPolicy::default();
        let groups = Lookup::Fetched(strings(&["Utah SGID Boundaries", "Open Data"]));
        let result = reconcile_tags(
            &strings(&["sgid", "SGID", "Agrc", "boundaries"]),
            "Municipal Boundaries Layer",
            &groups,
            &policy,
        );
        for expected in ["Boundaries", "SGID", "AGRC"] {
            assert_eq!(
                result.tags.iter().filter(|t| t.as_str() == expected).count(),
                1,
                "{expected} should appear once in {:?}",
                result.tags
            );
        }
        assert_eq!(result.tags.len(), 3);
    }

    #[test]
    fn reconcile_replaces_miscased_category_tag_in_place() {
        let policy = TagPolicy::default();
        let groups = Lookup::Fetched(strings(&["Utah SGID Water"]));
        let result = reconcile_tags(
            &strings(&["WATER", "Streams", "SGID", "AGRC"]),
            "Rivers",
            &groups,
            &policy,
        );
        assert_eq!(result.tags, strings(&["Water", "Streams", "SGID", "AGRC"]));
        assert!(result.changed);
    }

    #[test]
    fn reconcile_flags_unavailable_groups() {
        let policy = TagPolicy::default();
        let result = reconcile_tags(
            &strings(&["Roads"]),
            "Highways",
            &Lookup::Unavailable("timeout".to_string()),
            &policy,
        );
        assert!(result.groups_unavailable);
        assert_eq!(result.tags, strings(&["Roads"]));
        assert!(!result.changed);
    }

    #[test]
    fn reconcile_bicycle_network_scenario() {
        let policy = TagPolicy::default();
        let result = reconcile_tags(
            &strings(&["Cycle Net", ".SD", "utah", "water-related"]),
            "Bicycle Network",
            &no_groups(),
            &policy,
        );
        assert_eq!(result.tags, strings(&["Utah", "Water-Related"]));
        assert!(result.changed);

        let with_groups = reconcile_tags(
            &strings(&["Cycle Net", ".SD", "utah", "water-related"]),
            "Bicycle Network",
            &Lookup::Fetched(strings(&["Utah SGID Transportation"])),
            &policy,
        );
        assert_eq!(
            with_groups.tags,
            strings(&["Utah", "Water-Related", "Transportation", "SGID", "AGRC"])
        );
    }

    #[test]
    fn reconcile_matches_tags_with_periods_removed() {
        let policy = TagPolicy::default();
        let redundant = reconcile_tags(&strings(&["U.S."]), "US Highways", &no_groups(), &policy);
        assert!(redundant.tags.is_empty());

        let deleted = reconcile_tags(&strings(&["002.", ".sd"]), "Roads", &no_groups(), &policy);
        assert!(deleted.tags.is_empty());

        // ".sd" is only deleted as written; without the period it is a plain tag.
        let kept = reconcile_tags(&strings(&["s.d."]), "Roads", &no_groups(), &policy);
        assert_eq!(kept.tags, strings(&["Sd"]));
    }

    #[test]
    fn reconcile_is_stable_on_second_pass() {
        let policy = TagPolicy::default();
        let groups = Lookup::Fetched(strings(&["Utah SGID Boundaries"]));
        let cases: Vec<(Vec<String>, &str)> = vec![
            (
                strings(&["Cycle Net", ".SD", "utah", "water-related"]),
                "Bicycle Network",
            ),
            (
                strings(&["boundaries", "sgid", "u.s. census", "the county"]),
                "Boundaries of Counties",
            ),
            (strings(&["service  definition", "DEM"]), "Elevation"),
            (strings(&["U.S.", "roads"]), "US Highways"),
            (strings(&["002.", "s.d.", "Salt.Lake"]), "Roads"),
        ];
        for (tags, title) in cases {
            let first = reconcile_tags(&tags, title, &groups, &policy);
            let second = reconcile_tags(&first.tags, title, &groups, &policy);
            assert!(!second.changed, "second pass changed {:?}", first.tags);
        }
    }

    #[test]
    fn unchanged_tags_report_no_change() {
        let policy = TagPolicy::default();
        let result = reconcile_tags(
            &strings(&["AGRC", "SGID", "Roads"]),
            "Highways",
            &Lookup::Fetched(strings(&["Utah SGID Roads"])),
            &policy,
        );
        assert!(!result.changed);
    }
}
