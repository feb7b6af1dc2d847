use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::TableName;
use crate::error::MmashError;

pub const MMASH_URL: &str = "https://physionet.org/files/mmash/1.0.0/MMASH.zip";
pub const DEFAULT_ROOT: &str = "data";

/// On-disk form of the loader configuration (`mmash.json`).
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub tables: Option<Vec<String>>,
    #[serde(default)]
    pub dev: bool,
    #[serde(default)]
    pub archive_url: Option<String>,
    /// Options forwarded verbatim to the sample store.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    pub root: Utf8PathBuf,
    pub tables: Vec<TableName>,
    pub dev: bool,
    pub archive_url: String,
    pub extra: BTreeMap<String, Value>,
}

impl DatasetConfig {
    /// Validates the table selection. Nothing touches the filesystem here.
    pub fn new<S: AsRef<str>>(
        root: impl Into<Utf8PathBuf>,
        tables: &[S],
        dev: bool,
    ) -> Result<Self, MmashError> {
        Ok(Self {
            root: root.into(),
            tables: parse_tables(tables)?,
            dev,
            archive_url: MMASH_URL.to_string(),
            extra: BTreeMap::new(),
        })
    }

    pub fn with_archive_url(mut self, url: impl Into<String>) -> Self {
        self.archive_url = url.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: &str) -> Result<DatasetConfig, MmashError> {
        let config_path = PathBuf::from(path);
        let content = fs::read_to_string(&config_path)
            .map_err(|_| MmashError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| MmashError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<DatasetConfig, MmashError> {
        let tables = config.tables.ok_or_else(|| MmashError::MissingTables {
            allowed: TableName::allowed(),
        })?;
        let root = config.root.unwrap_or_else(|| DEFAULT_ROOT.to_string());

        let mut resolved = DatasetConfig::new(root, &tables, config.dev)?;
        if let Some(url) = config.archive_url {
            resolved.archive_url = url;
        }
        resolved.extra = config.extra;
        Ok(resolved)
    }
}

fn parse_tables<S: AsRef<str>>(tables: &[S]) -> Result<Vec<TableName>, MmashError> {
    if tables.is_empty() {
        return Err(MmashError::MissingTables {
            allowed: TableName::allowed(),
        });
    }
    let mut parsed = Vec::with_capacity(tables.len());
    for value in tables {
        let table: TableName = value.as_ref().parse()?;
        if !parsed.contains(&table) {
            parsed.push(table);
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn duplicate_tables_collapse() {
        let config = DatasetConfig::new("data", &["rr", "sleep", "rr"], false).unwrap();
        assert_eq!(config.tables, vec![TableName::Rr, TableName::Sleep]);
        assert_eq!(config.archive_url, MMASH_URL);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let none: [&str; 0] = [];
        let err = DatasetConfig::new("data", &none, false).unwrap_err();
        assert_matches!(err, MmashError::MissingTables { .. });
    }

    #[test]
    fn error_names_offending_value_and_allowed_set() {
        let err = DatasetConfig::new("data", &["sleep", "ecg"], false).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("ecg"));
        assert!(message.contains("'questionnaire'"));
    }

    #[test]
    fn parse_config_with_extra_options() {
        let config: Config = serde_json::from_str(
            r#"{"tables": ["user_info"], "dev": true, "refresh_cache": true}"#,
        )
        .unwrap();
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.root, Utf8PathBuf::from(DEFAULT_ROOT));
        assert!(resolved.dev);
        assert_eq!(resolved.extra.get("refresh_cache"), Some(&Value::Bool(true)));
    }
}
