use std::fs;

use assert_matches::assert_matches;

use mmash_dataset::config::{ConfigLoader, MMASH_URL};
use mmash_dataset::domain::TableName;
use mmash_dataset::error::MmashError;

#[test]
fn resolve_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("mmash.json");
    fs::write(
        &path,
        r#"{"root": "/srv/mmash", "tables": ["rr", "questionnaire"], "dev": true, "seed": 7}"#,
    )
    .unwrap();

    let config = ConfigLoader::resolve(path.to_str().unwrap()).unwrap();
    assert_eq!(config.root.as_str(), "/srv/mmash");
    assert_eq!(config.tables, [TableName::Rr, TableName::Questionnaire]);
    assert!(config.dev);
    assert_eq!(config.archive_url, MMASH_URL);
    assert_eq!(config.extra.get("seed"), Some(&serde_json::json!(7)));
}

#[test]
fn config_without_tables_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("mmash.json");
    fs::write(&path, r#"{"root": "data"}"#).unwrap();

    let err = ConfigLoader::resolve(path.to_str().unwrap()).unwrap_err();
    assert_matches!(err, MmashError::MissingTables { allowed } if allowed.contains("'rr'"));
}

#[test]
fn missing_config_file() {
    let err = ConfigLoader::resolve("/nonexistent/mmash.json").unwrap_err();
    assert_matches!(err, MmashError::ConfigRead(_));
}
