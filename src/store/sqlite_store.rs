use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use tracing::{error, info};

use super::error::StoreError;
use super::schema::MUSIC_VERSIONED_SCHEMAS;
use crate::sqlite_persistence::BASE_DB_VERSION;

/// Single-writer store over one SQLite file. Mutating operations go through
/// `write_conn`, reads are spread round-robin over a pool of read-only
/// connections; WAL keeps the two sides from blocking each other.
pub struct SqliteMusicStore {
    pub(super) write_conn: Arc<Mutex<Connection>>,
    read_conns: Vec<Arc<Mutex<Connection>>>,
    next_read_conn: AtomicUsize,
}

impl SqliteMusicStore {
    pub fn new(db_path: &Path, read_pool_size: usize) -> Result<Self> {
        if read_pool_size == 0 {
            bail!("read_pool_size must be at least 1");
        }

        let write_conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;
        write_conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::migrate_if_needed(&write_conn)?;

        let read_conns = (0..read_pool_size)
            .map(|_| {
                let conn = Connection::open_with_flags(
                    db_path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?;
                Ok(Arc::new(Mutex::new(conn)))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            path = ?db_path,
            read_pool_size,
            "music store ready"
        );
        Ok(Self {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_conns,
            next_read_conn: AtomicUsize::new(0),
        })
    }

    fn migrate_if_needed(conn: &Connection) -> Result<()> {
        let latest = MUSIC_VERSIONED_SCHEMAS
            .last()
            .context("No schema versions defined")?;

        let table_count: usize = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            [],
            |row| row.get(0),
        )?;
        if table_count == 0 {
            latest.create(conn)?;
            info!(version = latest.version, "created fresh database");
            return Ok(());
        }

        let user_version: usize = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if user_version < BASE_DB_VERSION {
            bail!(
                "Database has user_version {}, not one of ours",
                user_version
            );
        }
        let mut version = user_version - BASE_DB_VERSION;
        if version > latest.version {
            bail!(
                "Database schema version {} is newer than the latest known ({})",
                version,
                latest.version
            );
        }

        for schema in MUSIC_VERSIONED_SCHEMAS {
            if schema.version <= version {
                continue;
            }
            let Some(migration) = schema.migration else {
                bail!(
                    "No migration path from schema version {} to {}",
                    version,
                    schema.version
                );
            };
            migration(conn)?;
            conn.execute(
                &format!("PRAGMA user_version = {}", BASE_DB_VERSION + schema.version),
                [],
            )?;
            info!(from = version, to = schema.version, "migrated database schema");
            version = schema.version;
        }

        latest.validate(conn)?;
        Ok(())
    }

    pub(super) fn read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.next_read_conn.fetch_add(1, Ordering::Relaxed) % self.read_conns.len();
        self.read_conns[index].clone()
    }

    pub fn counts(&self) -> Result<StoreCounts, StoreError> {
        let conn = self.read_conn();
        let conn = conn.lock().unwrap();
        let count = |table: &str| -> Result<i64, rusqlite::Error> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
        };
        Ok(StoreCounts {
            artists: count("Artists").map_err(|e| io_err("counts", "Artists", e))?,
            albums: count("Albums").map_err(|e| io_err("counts", "Albums", e))?,
            songs: count("Songs").map_err(|e| io_err("counts", "Songs", e))?,
            users: count("Users").map_err(|e| io_err("counts", "Users", e))?,
            playlists: count("Playlists").map_err(|e| io_err("counts", "Playlists", e))?,
            ratings: count("Ratings").map_err(|e| io_err("counts", "Ratings", e))?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreCounts {
    pub artists: i64,
    pub albums: i64,
    pub songs: i64,
    pub users: i64,
    pub playlists: i64,
    pub ratings: i64,
}

pub(super) fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::ConstraintViolation,
                ..
            },
            _,
        )
    )
}

/// Log a database fault with the operation name and the keys involved, then
/// wrap it. Callers use this on every path that can only fail on IO.
pub(super) fn io_err(
    operation: &'static str,
    detail: impl fmt::Display,
    e: rusqlite::Error,
) -> StoreError {
    error!(operation, %detail, error = %e, "store operation failed");
    StoreError::Io(e)
}
