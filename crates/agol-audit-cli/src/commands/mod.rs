pub mod audit;
pub mod fix;
pub mod tags;

use agol_audit_core::{FixRun, ReportError, fixes_file_name};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Write fix outcomes into `report_dir`, if one is configured.
pub(crate) fn write_fixes(
    fixes: &FixRun,
    report_dir: Option<&Path>,
    date: chrono::NaiveDate,
) -> Result<Option<PathBuf>, ReportError> {
    let Some(dir) = report_dir else {
        return Ok(None);
    };
    let path = dir.join(fixes_file_name(date));
    fixes.write_csv(&path)?;
    tracing::info!(path = %path.display(), "wrote fixes report");
    Ok(Some(path))
}

fn counts_by_name<K: ToString>(counts: &BTreeMap<K, usize>) -> BTreeMap<String, usize> {
    counts.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

pub(crate) fn fixes_json(fixes: &FixRun) -> Value {
    json!({
        "succeeded": fixes.succeeded(),
        "failed": fixes.failed(),
        "fixedCounts": counts_by_name(&fixes.fixed_counts()),
        "outcomes": fixes.outcomes,
    })
}

pub(crate) fn print_counts<K: ToString>(label: &str, counts: &BTreeMap<K, usize>) {
    if counts.is_empty() {
        println!("  {label}: none");
        return;
    }
    println!("  {label}:");
    for (kind, count) in counts_by_name(counts) {
        println!("    - {kind}: {count}");
    }
}

pub(crate) fn print_fixes(fixes: &FixRun) {
    println!(
        "  Fixes applied: {} succeeded, {} failed",
        fixes.succeeded(),
        fixes.failed()
    );
    print_counts("Fixed", &fixes.fixed_counts());
    let failures: Vec<_> = fixes.outcomes.iter().filter(|o| !o.succeeded).collect();
    if !failures.is_empty() {
        println!("  Failures:");
        for outcome in failures {
            println!("    - {}: {}", outcome.item_id, outcome.message);
        }
    }
}
