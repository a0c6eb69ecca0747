mod file_config;

use std::path::PathBuf;

use anyhow::{bail, Result};

pub use file_config::FileConfig;

pub const DEFAULT_READ_POOL_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub read_pool_size: usize,
}

impl AppConfig {
    /// Command-line values win over the config file; the pool size falls back
    /// to a default, the database path is mandatory.
    pub fn resolve(
        cli_db_path: Option<PathBuf>,
        cli_read_pool_size: Option<usize>,
        file: FileConfig,
    ) -> Result<Self> {
        let Some(db_path) = cli_db_path.or(file.db_path) else {
            bail!("No database path given, pass --db or set db_path in the config file");
        };
        let read_pool_size = cli_read_pool_size
            .or(file.read_pool_size)
            .unwrap_or(DEFAULT_READ_POOL_SIZE);
        if read_pool_size == 0 {
            bail!("read_pool_size must be at least 1");
        }
        Ok(Self {
            db_path,
            read_pool_size,
        })
    }
}
