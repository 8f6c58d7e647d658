use super::{fixes_json, print_counts, print_fixes, write_fixes};
use crate::cli::PortalArgs;
use crate::support::{
    connect_or_exit, exit_with, init_tracing, load_config_or_exit, print_json, resolve_settings,
    today,
};
use agol_audit_core::{Plan, Portal, Report, apply_plan};
use serde_json::json;
use std::path::PathBuf;

pub fn run(args: PortalArgs, report_path: PathBuf) {
    init_tracing(args.verbose);
    let config = load_config_or_exit(args.config.as_deref());
    let settings = resolve_settings(&args, &config).unwrap_or_else(|e| exit_with(e));

    // The report is validated before any portal traffic.
    let report = Report::read_csv(&report_path).unwrap_or_else(|e| exit_with(e));
    let plan = Plan::from_report(&report);
    tracing::info!(
        report = %report_path.display(),
        rows = report.len(),
        mutations = plan.mutation_count(),
        "loaded report"
    );

    let fixes = if plan.is_empty() {
        None
    } else {
        let client = connect_or_exit(&settings);
        let items = client
            .feature_service_items()
            .unwrap_or_else(|e| exit_with(e));
        let fixes = apply_plan(&client, &plan, &items);
        write_fixes(&fixes, settings.report_dir.as_deref(), today())
            .unwrap_or_else(|e| exit_with(e));
        Some(fixes)
    };

    if args.json {
        print_json(
            "agol_validator.fix.v1",
            json!({
                "org": settings.org,
                "user": settings.user,
                "report": report_path.display().to_string(),
                "rows": report.len(),
                "plan": plan,
                "fixes": fixes.as_ref().map(fixes_json),
            }),
        );
        return;
    }

    println!("agol-validator fix {}", report_path.display());
    println!("  Portal: {}", settings.org);
    println!("  Rows: {}", report.len());
    print_counts("Planned fixes", &plan.counts());
    match &fixes {
        Some(fixes) => print_fixes(fixes),
        None => println!("  Nothing to fix"),
    }
}
