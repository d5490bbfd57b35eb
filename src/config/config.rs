use crate::common::{Error, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Size of one disk page. Every frame in the buffer pool and every index
/// page layout assumes exactly this many bytes.
pub const FERRO_DB_PAGE_SIZE_BYTES: usize = 4096;

/// Default directory database files are created under, relative to the
/// working directory. Override with the `FERRODB_DATA_DIR` environment
/// variable.
pub const FERRO_DB_DATA_DIR: &str = "data";

const DEFAULT_POOL_SIZE: usize = 64;

static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    let dir = std::env::var("FERRODB_DATA_DIR").unwrap_or_else(|_| FERRO_DB_DATA_DIR.to_string());
    let path = PathBuf::from(dir);
    fs::create_dir_all(&path).expect("Unable to create the database data directory.");
    path
});

/// Resolves (and on first use creates) the directory database files live in.
pub fn data_dir() -> &'static Path {
    DATA_DIR.as_path()
}

/// Tunable settings for a database instance. Values come from built-in
/// defaults overridden by `FERRODB_`-prefixed environment variables, e.g.
/// `FERRODB_POOL_SIZE=256`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DbConfig {
    pub pool_size: usize,
    pub data_dir: String,
}

impl DbConfig {
    pub fn load() -> Result<Self> {
        ::config::Config::builder()
            .set_default("pool_size", DEFAULT_POOL_SIZE as u64)
            .map_err(|e| Error::InvalidData(e.to_string()))?
            .set_default("data_dir", FERRO_DB_DATA_DIR)
            .map_err(|e| Error::InvalidData(e.to_string()))?
            .add_source(::config::Environment::with_prefix("FERRODB"))
            .build()
            .map_err(|e| Error::InvalidData(e.to_string()))?
            .try_deserialize()
            .map_err(|e| Error::InvalidData(e.to_string()))
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            pool_size: DEFAULT_POOL_SIZE,
            data_dir: FERRO_DB_DATA_DIR.to_string(),
        }
    }
}
