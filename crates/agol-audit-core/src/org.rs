//! Checks across all enumerated items rather than one at a time.

use crate::item::RemoteItem;
use std::collections::BTreeMap;

/// Titles carried by more than one item, with the ids of those items in
/// enumeration order. Titles are compared exactly.
pub fn duplicate_titles(items: &[RemoteItem]) -> BTreeMap<String, Vec<String>> {
    let mut seen: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for item in items {
        seen.entry(item.title.as_str())
            .or_default()
            .push(item.item_id.clone());
    }
    seen.into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(title, ids)| (title.to_string(), ids))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_only_repeated_titles() {
        let items = vec![
            RemoteItem::new("1", "Roads"),
            RemoteItem::new("2", "Parcels"),
            RemoteItem::new("3", "Roads"),
            RemoteItem::new("4", "roads"),
        ];
        let duplicates = duplicate_titles(&items);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(
            duplicates.get("Roads"),
            Some(&vec!["1".to_string(), "3".to_string()])
        );
    }

    #[test]
    fn no_items_means_no_duplicates() {
        assert!(duplicate_titles(&[]).is_empty());
    }
}
