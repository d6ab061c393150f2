use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::{info, warn};

use super::error::StoreError;
use super::schema;
use crate::config::StoreConfig;

/// Shared SQLite connection with bounded waits.
///
/// Every call acquires the connection with `try_lock_for(timeout)` and SQLite's own
/// busy timeout uses the same bound, so callers see [`StoreError::Unavailable`] instead
/// of hanging.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
    timeout: Duration,
    read_retries: u32,
    retry_backoff: Duration,
}

impl Database {
    /// Open or create a database file and migrate it to the current schema.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    StoreError::Unavailable(format!("create {}: {err}", parent.display()))
                })?;
            }
        }

        let conn = Connection::open(&config.path)?;
        let database = Self::prepare(conn, config)?;
        info!(path = %config.path.display(), "database opened");
        Ok(database)
    }

    /// Open a private in-memory database (tests and demos).
    pub fn in_memory() -> Result<Self, StoreError> {
        let config = StoreConfig {
            path: PathBuf::from(":memory:"),
            ..StoreConfig::default()
        };
        Self::in_memory_with(&config)
    }

    pub fn in_memory_with(config: &StoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::prepare(conn, config)
    }

    fn prepare(conn: Connection, config: &StoreConfig) -> Result<Self, StoreError> {
        conn.busy_timeout(config.timeout)?;
        conn.execute_batch(schema::PRAGMAS)
            .map_err(|err| StoreError::Migration(format!("pragmas: {err}")))?;
        let found = schema::migrate(&conn)?;
        if found < schema::SCHEMA_VERSION {
            info!(from = found, to = schema::SCHEMA_VERSION, "schema upgraded");
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: config.path.clone(),
            timeout: config.timeout,
            read_retries: config.read_retries,
            retry_backoff: config.retry_backoff,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        self.read(schema::current_version)
    }

    /// Run `f` with exclusive access to the connection. Writes go through here and are
    /// never retried.
    pub fn with_conn<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.conn.try_lock_for(self.timeout).ok_or_else(|| {
            StoreError::Unavailable(format!(
                "timed out after {}ms waiting for the store connection",
                self.timeout.as_millis()
            ))
        })?;
        f(&mut conn)
    }

    /// Run an idempotent read, retrying with linear backoff while the store is unavailable.
    pub fn read<F, T>(&self, mut f: F) -> Result<T, StoreError>
    where
        F: FnMut(&Connection) -> Result<T, StoreError>,
    {
        let mut attempt = 0;
        loop {
            match self.with_conn(|conn| f(conn)) {
                Err(StoreError::Unavailable(detail)) if attempt < self.read_retries => {
                    attempt += 1;
                    warn!(attempt, %detail, "store unavailable; retrying read");
                    std::thread::sleep(self.retry_backoff * attempt);
                }
                other => return other,
            }
        }
    }
}
