pub mod archive;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod output;
pub mod store;
pub mod table;
