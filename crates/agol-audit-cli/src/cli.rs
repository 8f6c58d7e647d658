use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "agol-validator",
    about = "Audit hosted feature layers against the SGID metatable and fix what drifted",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Connection flags shared by commands that talk to the portal.
#[derive(Args, Debug, Clone, Default)]
pub struct PortalArgs {
    /// Portal URL (default: https://www.arcgis.com)
    #[arg(long)]
    pub org: Option<String>,

    /// Portal user whose content is audited
    #[arg(long)]
    pub user: Option<String>,

    /// TOML config file (default: ./agol-validator.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for checks/fixes CSV files
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Log progress at info level (RUST_LOG overrides)
    #[arg(long)]
    pub verbose: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check every Feature Service item and apply fixes unless --dry
    Audit {
        #[command(flatten)]
        portal: PortalArgs,

        /// Metatable CSV export (repeatable; replaces configured catalogs)
        #[arg(long = "catalog")]
        catalogs: Vec<PathBuf>,

        /// Metatable hosted table URL (repeatable; replaces configured catalogs)
        #[arg(long = "catalog-url")]
        catalog_urls: Vec<String>,

        /// Check only; write the report but change nothing
        #[arg(long)]
        dry: bool,

        /// Only check these item ids
        items: Vec<String>,
    },

    /// Apply the fixes recorded in a saved checks report
    Fix {
        #[command(flatten)]
        portal: PortalArgs,

        /// checks_*.csv written by a previous audit
        #[arg(long)]
        report: PathBuf,
    },

    /// Preview tag reconciliation without contacting the portal
    Tags {
        /// Title the tags are checked against
        #[arg(long, default_value = "")]
        title: String,

        /// Group the item is shared with (repeatable)
        #[arg(long = "group")]
        groups: Vec<String>,

        /// TOML config file supplying tag lists
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Tags to reconcile
        #[arg(required = true)]
        tags: Vec<String>,
    },
}
