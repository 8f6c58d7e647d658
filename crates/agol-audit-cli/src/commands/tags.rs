use crate::support::{init_tracing, load_config_or_exit, print_json, yes_no};
use agol_audit_core::{Lookup, reconcile_tags};
use serde_json::json;
use std::path::PathBuf;

pub fn run(
    title: String,
    groups: Vec<String>,
    config: Option<PathBuf>,
    tags: Vec<String>,
    json_output: bool,
) {
    init_tracing(false);
    let config = load_config_or_exit(config.as_deref());
    let policy = config.tag_policy();

    let result = reconcile_tags(&tags, &title, &Lookup::Fetched(groups.clone()), &policy);

    if json_output {
        print_json(
            "agol_validator.tags.v1",
            json!({
                "title": title,
                "groups": groups,
                "input": tags,
                "tags": result.tags,
                "changed": result.changed,
            }),
        );
        return;
    }

    println!("agol-validator tags");
    println!("  Title: {title}");
    if !groups.is_empty() {
        println!("  Groups: {}", groups.join("; "));
    }
    println!("  Input: {}", tags.join("; "));
    println!("  Result: {}", result.tags.join("; "));
    println!("  Changed: {}", yes_no(result.changed));
}
