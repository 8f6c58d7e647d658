//! # agol-audit-core
//!
//! Domain layer for auditing hosted feature layers against the SGID
//! metatable.
//!
//! This crate provides:
//! - `Catalog` (the metatable snapshot) and `RemoteItem` (the portal snapshot)
//! - tag normalization and reconciliation
//! - per-attribute checkers producing `CheckResult` values
//! - `Report` rows with CSV persistence, and the `Plan` of mutations derived
//!   from them
//! - `Validator`, which runs the check phase and applies a plan through a
//!   `Portal` collaborator
//!
//! It performs no network I/O itself. Portal and catalog access live behind
//! the `Portal` and `CatalogSource` traits (see `agol-audit-portal`).
//!
//! ## Data flow
//!
//! ```text
//! CatalogSource* ─┐
//!                 ├─> Validator::check ─> Report ─> Plan ─> apply_plan ─> FixRun
//! Portal items  ──┘          (CSV sink)   (CSV reload)
//! ```

pub mod catalog;
pub mod checks;
pub mod item;
pub mod org;
pub mod plan;
pub mod portal;
pub mod report;
pub mod tags;
pub mod validator;

pub use catalog::{Catalog, CatalogEntry, CatalogError, CatalogSource, CsvCatalog, load_catalog};
pub use checks::{
    CheckResult, CheckStatus, EMPTY_VALUE, check_delete_protection, check_downloads,
    check_folder, check_groups, check_tags, check_title,
};
pub use item::{Lookup, RemoteItem};
pub use org::duplicate_titles;
pub use plan::{ItemPlan, Mutation, MutationKind, Plan};
pub use portal::{Portal, PortalError};
pub use report::{
    REPORT_COLUMNS, Report, ReportError, ReportRow, checks_file_name, fixes_file_name,
};
pub use tags::{TagPolicy, TagReconciliation, normalize_tag, reconcile_tags, title_case};
pub use validator::{CheckRun, FixOutcome, FixRun, ItemAudit, Validator, apply_plan};
