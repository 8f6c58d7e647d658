use super::{fixes_json, print_counts, print_fixes, write_fixes};
use crate::cli::PortalArgs;
use crate::config::{CatalogLocation, FileConfig};
use crate::support::{
    catalog_sources, connect_or_exit, exit_with, init_tracing, load_config_or_exit, print_json,
    resolve_settings, today, yes_no,
};
use agol_audit_core::catalog::item_key;
use agol_audit_core::{
    Catalog, Portal, RemoteItem, Validator, checks_file_name, load_catalog,
};
use serde_json::json;
use std::path::PathBuf;

pub struct Args {
    pub portal: PortalArgs,
    pub catalogs: Vec<PathBuf>,
    pub catalog_urls: Vec<String>,
    pub dry: bool,
    pub items: Vec<String>,
}

/// Catalogs given on the command line replace the configured ones.
fn catalog_locations(args: &Args, config: &FileConfig) -> Vec<CatalogLocation> {
    if args.catalogs.is_empty() && args.catalog_urls.is_empty() {
        return config.catalogs();
    }
    args.catalogs
        .iter()
        .cloned()
        .map(CatalogLocation::Csv)
        .chain(args.catalog_urls.iter().cloned().map(CatalogLocation::Url))
        .collect()
}

fn id_key(id: &str) -> String {
    item_key(id).unwrap_or_else(|| id.trim().to_string())
}

/// Keep only the requested items, warning about ids that were not found.
fn select_items(items: Vec<RemoteItem>, wanted: &[String]) -> Vec<RemoteItem> {
    if wanted.is_empty() {
        return items;
    }
    let keys: Vec<String> = wanted.iter().map(|id| id_key(id)).collect();
    for (id, key) in wanted.iter().zip(&keys) {
        if !items.iter().any(|item| id_key(&item.item_id) == *key) {
            tracing::warn!(item = %id, "requested item is not one of the user's feature services");
        }
    }
    items
        .into_iter()
        .filter(|item| keys.contains(&id_key(&item.item_id)))
        .collect()
}

pub fn run(args: Args) {
    init_tracing(args.portal.verbose);
    let config = load_config_or_exit(args.portal.config.as_deref());
    let settings = resolve_settings(&args.portal, &config).unwrap_or_else(|e| exit_with(e));
    let policy = config.tag_policy();
    let locations = catalog_locations(&args, &config);

    let client = connect_or_exit(&settings);

    let catalog = if locations.is_empty() {
        tracing::warn!("no catalog configured; title, group, and folder checks are skipped");
        Catalog::default()
    } else {
        load_catalog(&catalog_sources(&locations, &client)).unwrap_or_else(|e| exit_with(e))
    };

    let items = client
        .feature_service_items()
        .unwrap_or_else(|e| exit_with(e));
    let items = select_items(items, &args.items);

    let validator = Validator::new(&catalog, &policy);
    let run = validator.check(&items);

    for item in &run.failed_group_items {
        tracing::warn!(item = %item, "group membership unavailable; group and tag categories not verified");
    }
    for (title, ids) in &run.duplicate_titles {
        tracing::warn!(%title, items = %ids.join(", "), "duplicate title");
    }

    let date = today();
    let report_path = settings
        .report_dir
        .as_ref()
        .map(|dir| dir.join(checks_file_name(date)));
    if let Some(path) = &report_path {
        run.report.write_csv(path).unwrap_or_else(|e| exit_with(e));
        tracing::info!(path = %path.display(), "wrote checks report");
    }

    let fixes = if args.dry {
        None
    } else {
        let fixes = validator.apply(&client, &run.plan, &items);
        write_fixes(&fixes, settings.report_dir.as_deref(), date)
            .unwrap_or_else(|e| exit_with(e));
        Some(fixes)
    };

    if args.portal.json {
        print_json(
            "agol_validator.audit.v1",
            json!({
                "org": settings.org,
                "user": settings.user,
                "dry": args.dry,
                "catalogEntries": catalog.len(),
                "itemsChecked": items.len(),
                "itemsNeedingFixes": run.report.fixable_rows(),
                "reportPath": report_path.as_ref().map(|p| p.display().to_string()),
                "report": run.report,
                "plan": run.plan,
                "failedGroupItems": run.failed_group_items,
                "duplicateTitles": run.duplicate_titles,
                "fixes": fixes.as_ref().map(fixes_json),
            }),
        );
        return;
    }

    println!("agol-validator audit {}", settings.user);
    println!("  Portal: {}", settings.org);
    println!("  Catalog entries: {}", catalog.len());
    println!("  Items checked: {}", items.len());
    println!("  Items needing fixes: {}", run.report.fixable_rows());
    print_counts("Planned fixes", &run.plan.counts());
    if !run.failed_group_items.is_empty() {
        println!("  Group lookups failed:");
        for item in &run.failed_group_items {
            println!("    - {item}");
        }
    }
    if !run.duplicate_titles.is_empty() {
        println!("  Duplicate titles:");
        for (title, ids) in &run.duplicate_titles {
            println!("    - {title}: {}", ids.join(", "));
        }
    }
    if let Some(path) = &report_path {
        println!("  Report: {}", path.display());
    }
    println!("  Dry run: {}", yes_no(args.dry));
    if let Some(fixes) = &fixes {
        print_fixes(fixes);
    }
}
