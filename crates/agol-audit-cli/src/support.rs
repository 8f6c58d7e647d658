use crate::cli::PortalArgs;
use crate::config::{self, CatalogLocation, FileConfig};
use agol_audit_core::{CatalogSource, CsvCatalog};
use agol_audit_portal::{DEFAULT_ORG, PortalClient};
use chrono::{Local, NaiveDate};
use serde_json::Value;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub const JSON_SCHEMA: u64 = 1;
pub const PASSWORD_ENV: &str = "AGOL_PASSWORD";

/// Install the global subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn exit_with(error: impl Display) -> ! {
    eprintln!("error: {error}");
    std::process::exit(1);
}

/// Print `payload` wrapped in the `schema`/`kind` envelope.
pub fn print_json(kind: &str, payload: Value) {
    let mut envelope = serde_json::json!({
        "schema": JSON_SCHEMA,
        "kind": kind,
    });
    if let (Value::Object(target), Value::Object(fields)) = (&mut envelope, payload) {
        target.extend(fields);
    }
    match serde_json::to_string_pretty(&envelope) {
        Ok(text) => println!("{text}"),
        Err(e) => exit_with(format!("failed to render JSON: {e}")),
    }
}

pub fn load_config_or_exit(path: Option<&Path>) -> FileConfig {
    config::load(path).unwrap_or_else(|e| exit_with(e))
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Connection settings after merging flags over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub org: String,
    pub user: String,
    pub report_dir: Option<PathBuf>,
}

pub fn resolve_settings(args: &PortalArgs, config: &FileConfig) -> Result<Settings, String> {
    let org = args
        .org
        .clone()
        .or_else(|| config.org.clone())
        .unwrap_or_else(|| DEFAULT_ORG.to_string());
    let user = args
        .user
        .clone()
        .or_else(|| config.user.clone())
        .filter(|user| !user.trim().is_empty())
        .ok_or_else(|| "no portal user given (use --user or `user` in the config)".to_string())?;
    let report_dir = args
        .report_dir
        .clone()
        .or_else(|| config.report_dir.clone());
    Ok(Settings {
        org,
        user,
        report_dir,
    })
}

fn password_for(user: &str) -> Result<String, String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    rpassword::prompt_password(format!("{user}'s password: "))
        .map_err(|e| format!("failed to read password: {e}"))
}

pub fn connect_or_exit(settings: &Settings) -> PortalClient {
    let password = password_for(&settings.user).unwrap_or_else(|e| exit_with(e));
    PortalClient::connect(&settings.org, &settings.user, &password).unwrap_or_else(|e| exit_with(e))
}

/// Catalog sources in load order. URL sources reuse the portal session.
pub fn catalog_sources(
    locations: &[CatalogLocation],
    client: &PortalClient,
) -> Vec<Box<dyn CatalogSource>> {
    locations
        .iter()
        .map(|location| -> Box<dyn CatalogSource> {
            match location {
                CatalogLocation::Csv(path) => Box::new(CsvCatalog::new(path)),
                CatalogLocation::Url(url) => Box::new(client.hosted_table(url.clone())),
            }
        })
        .collect()
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_values() {
        let config = FileConfig {
            org: Some("https://utah.maps.arcgis.com".to_string()),
            user: Some("UtahAGRC".to_string()),
            report_dir: Some(PathBuf::from("reports")),
            ..FileConfig::default()
        };
        let args = PortalArgs {
            user: Some("Tester".to_string()),
            ..PortalArgs::default()
        };
        let settings = resolve_settings(&args, &config).expect("settings should resolve");
        assert_eq!(settings.org, "https://utah.maps.arcgis.com");
        assert_eq!(settings.user, "Tester");
        assert_eq!(settings.report_dir, Some(PathBuf::from("reports")));
    }

    #[test]
    fn org_defaults_and_user_is_required() {
        let settings = resolve_settings(
            &PortalArgs {
                user: Some("UtahAGRC".to_string()),
                ..PortalArgs::default()
            },
            &FileConfig::default(),
        )
        .expect("settings should resolve");
        assert_eq!(settings.org, DEFAULT_ORG);

        let missing = resolve_settings(&PortalArgs::default(), &FileConfig::default());
        assert!(missing.is_err());
    }
}
