//! agol-validator CLI: the `agol-validator` command.

mod cli;
mod commands;
mod config;
mod support;

use clap::Parser;
use clap::error::ErrorKind;
use cli::{Cli, Commands};

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => error.exit(),
            _ => {
                // Bad arguments are reported but are not a failed run.
                eprintln!("\n*** Invalid input ***\n");
                eprintln!("{error}");
                return;
            }
        },
    };

    match cli.command {
        Commands::Audit {
            portal,
            catalogs,
            catalog_urls,
            dry,
            items,
        } => commands::audit::run(commands::audit::Args {
            portal,
            catalogs,
            catalog_urls,
            dry,
            items,
        }),

        Commands::Fix { portal, report } => commands::fix::run(portal, report),

        Commands::Tags {
            title,
            groups,
            config,
            json,
            tags,
        } => commands::tags::run(title, groups, config, tags, json),
    }
}
