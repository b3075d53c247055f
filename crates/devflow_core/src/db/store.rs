//! Process-owned store client.
//!
//! # Responsibility
//! - Hold the database location and connection settings for one process.
//! - Migrate once at `open`, then hand out independent per-request
//!   connections.
//! - Provide explicit teardown.
//!
//! # Invariants
//! - Connections returned by `connect()` see a fully migrated schema.
//! - No connection is cached or shared between requests.

use super::migrations::latest_version;
use super::open::{bootstrap, configure_connection};
use super::{DbError, DbResult};
use crate::config::StoreConfig;
use log::{info, warn};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File-backed store shared by concurrent request handlers.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Store {
    /// Validates config, bootstraps the schema and enables WAL journaling.
    pub fn open(config: &StoreConfig) -> DbResult<Self> {
        let path = config
            .path
            .clone()
            .ok_or_else(|| DbError::InvalidConfig("store.path is required".to_string()))?;
        if path.as_os_str().is_empty() {
            return Err(DbError::InvalidConfig("store.path cannot be empty".to_string()));
        }

        let busy_timeout = config.busy_timeout();
        let conn = bootstrap("file", || Connection::open(&path), busy_timeout)?;
        let journal_mode: String =
            conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
        info!(
            "event=store_open module=db status=ok journal_mode={} schema_version={}",
            journal_mode,
            latest_version()
        );

        Ok(Self { path, busy_timeout })
    }

    /// Opens a fresh connection for one logical request.
    pub fn connect(&self) -> DbResult<Connection> {
        let conn = Connection::open(&self.path)?;
        configure_connection(&conn, self.busy_timeout)?;
        let version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if version != latest_version() {
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: version,
                latest_supported: latest_version(),
            });
        }
        Ok(conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checkpoints the write-ahead log. Call once at process shutdown.
    pub fn close(self) -> DbResult<()> {
        let conn = self.connect()?;
        match conn.query_row("PRAGMA wal_checkpoint(TRUNCATE);", [], |row| {
            row.get::<_, i64>(0)
        }) {
            Ok(0) => info!("event=store_close module=db status=ok"),
            Ok(busy) => warn!("event=store_close module=db status=partial busy={busy}"),
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }
}
