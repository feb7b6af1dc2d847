use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MmashError {
    #[error("`tables` must be specified from {allowed}")]
    MissingTables { allowed: String },

    #[error("unsupported table: {table}. Must be one of {allowed}")]
    UnsupportedTable { table: String, allowed: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("archive request failed: {0}")]
    ArchiveHttp(String),

    #[error("archive server returned status {status}: {message}")]
    ArchiveStatus { status: u16, message: String },

    #[error("malformed archive: {0}")]
    Archive(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("table file not found: {0}")]
    TableNotFound(PathBuf),

    #[error("malformed table: {0}")]
    TableShape(String),

    #[error("failed to parse {path}: {message}")]
    Csv { path: PathBuf, message: String },
}
