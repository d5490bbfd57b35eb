pub mod config;

pub use config::{data_dir, DbConfig, FERRO_DB_DATA_DIR, FERRO_DB_PAGE_SIZE_BYTES};
