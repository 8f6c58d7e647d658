//! Optional TOML configuration.
//!
//! ```toml
//! org = "https://www.arcgis.com"
//! user = "UtahAGRC"
//! report_dir = "reports"
//!
//! [[catalog]]
//! csv = "metatable.csv"
//!
//! [tags]
//! uppercased = ["agrc", "sgid"]
//! ```
//!
//! Relative paths are resolved against the config file's directory.

use agol_audit_core::TagPolicy;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "agol-validator.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid config {path}: {message}")]
    Parse { path: String, message: String },

    #[error("config {path}: catalog #{index} must set exactly one of `csv` or `url`")]
    Catalog { path: String, index: usize },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub org: Option<String>,
    pub user: Option<String>,
    pub report_dir: Option<PathBuf>,
    #[serde(default)]
    pub catalog: Vec<CatalogConfig>,
    #[serde(default)]
    pub tags: TagsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    pub csv: Option<PathBuf>,
    pub url: Option<String>,
}

/// Lists that replace the built-in defaults when present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagsConfig {
    pub uppercased: Option<Vec<String>>,
    pub articles: Option<Vec<String>>,
    pub delete: Option<Vec<String>>,
}

/// Where the metatable is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLocation {
    Csv(PathBuf),
    Url(String),
}

impl FileConfig {
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for (index, entry) in config.catalog.iter_mut().enumerate() {
            match (&mut entry.csv, &entry.url) {
                (Some(csv), None) => {
                    if csv.is_relative() {
                        *csv = base.join(&*csv);
                    }
                }
                (None, Some(_)) => {}
                _ => {
                    return Err(ConfigError::Catalog {
                        path: path.display().to_string(),
                        index: index + 1,
                    });
                }
            }
        }
        if let Some(dir) = config.report_dir.as_mut()
            && dir.is_relative()
        {
            *dir = base.join(&*dir);
        }
        Ok(config)
    }

    pub fn catalogs(&self) -> Vec<CatalogLocation> {
        self.catalog
            .iter()
            .filter_map(|entry| match (&entry.csv, &entry.url) {
                (Some(csv), _) => Some(CatalogLocation::Csv(csv.clone())),
                (None, Some(url)) => Some(CatalogLocation::Url(url.clone())),
                (None, None) => None,
            })
            .collect()
    }

    pub fn tag_policy(&self) -> TagPolicy {
        let defaults = TagPolicy::default();
        let replace = |configured: &Option<Vec<String>>, default: &BTreeSet<String>| {
            configured
                .clone()
                .unwrap_or_else(|| default.iter().cloned().collect())
        };
        TagPolicy::new(
            replace(&self.tags.uppercased, &defaults.uppercased),
            replace(&self.tags.articles, &defaults.articles),
            replace(&self.tags.delete, &defaults.delete),
        )
    }
}

/// Read `explicit`, or the default file if it exists, or fall back to an
/// empty config.
pub fn load(explicit: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !default.is_file() {
                return Ok(FileConfig::default());
            }
            default
        }
    };
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let config = FileConfig::parse(&text, &path)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config_and_resolves_paths() {
        let text = r#"
org = "https://utah.maps.arcgis.com"
user = "UtahAGRC"
report_dir = "reports"

[[catalog]]
csv = "metatable.csv"

[[catalog]]
url = "https://services.arcgis.com/x/arcgis/rest/services/Meta/FeatureServer/0"

[tags]
uppercased = ["agrc", "SGID"]
"#;
        let config = FileConfig::parse(text, Path::new("/etc/agol/agol-validator.toml"))
            .expect("config should parse");
        assert_eq!(config.user.as_deref(), Some("UtahAGRC"));
        assert_eq!(config.report_dir, Some(PathBuf::from("/etc/agol/reports")));
        assert_eq!(
            config.catalogs(),
            vec![
                CatalogLocation::Csv(PathBuf::from("/etc/agol/metatable.csv")),
                CatalogLocation::Url(
                    "https://services.arcgis.com/x/arcgis/rest/services/Meta/FeatureServer/0"
                        .to_string()
                ),
            ]
        );

        let policy = config.tag_policy();
        assert_eq!(policy.uppercased.len(), 2);
        assert!(policy.uppercased.contains("sgid"));
        assert_eq!(policy.articles, TagPolicy::default().articles);
    }

    #[test]
    fn catalog_needs_exactly_one_location() {
        let text = "[[catalog]]\ncsv = \"a.csv\"\nurl = \"https://x\"\n";
        match FileConfig::parse(text, Path::new("cfg.toml")) {
            Err(ConfigError::Catalog { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected catalog error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        match FileConfig::parse("usr = \"typo\"\n", Path::new("cfg.toml")) {
            Err(ConfigError::Parse { message, .. }) => assert!(message.contains("usr")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join(format!(
            "agol-validator-missing-{}.toml",
            std::process::id()
        ));
        assert!(matches!(
            load(Some(path.as_path())),
            Err(ConfigError::Read { .. })
        ));
    }
}
