//! Database module for persistent storage.
//!
//! Uses rusqlite (SQLite). The request path shares one connection through
//! [`Database::with_conn`]; background jobs open their own connection with
//! [`Database::open_session`] so their transactions never interleave.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};

pub mod error;
pub mod media_repo;
pub mod migrations;
pub mod mood_repo;

pub use error::DatabaseError;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Thread-safe database handle.
///
/// Cloning is cheap (inner `Arc`). Access through `with_conn` is serialized
/// by a `Mutex`; WAL mode lets isolated sessions read and write alongside it.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    location: Arc<Location>,
}

impl Database {
    /// Opens (or creates) the database at the given path and runs all
    /// pending migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        configure(&conn)?;

        migrations::run_all(&conn)?;

        log::info!("Database opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: Arc::new(Location::File(path.to_path_buf())),
        })
    }

    /// Opens an in-memory database for testing. Runs all migrations.
    ///
    /// Isolated sessions are not available on in-memory databases.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;

        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: Arc::new(Location::Memory),
        })
    }

    /// Provides locked access to the shared connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    /// Opens a new connection to the same database file, owned exclusively
    /// by the caller until dropped.
    pub fn open_session(&self) -> Result<UnitOfWork, DatabaseError> {
        match self.location.as_ref() {
            Location::File(path) => {
                let conn = Connection::open(path)?;
                configure(&conn)?;
                Ok(UnitOfWork { conn })
            }
            Location::Memory => Err(DatabaseError::SessionUnavailable),
        }
    }

    /// Path of the backing file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        match self.location.as_ref() {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }
}

fn configure(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

/// An isolated storage session with its own connection.
///
/// The connection closes when the session is dropped, whichever way the
/// owning job ends.
pub struct UnitOfWork {
    conn: Connection,
}

impl UnitOfWork {
    /// Runs `f` inside a write transaction. Commits when `f` returns `Ok`,
    /// rolls back otherwise.
    pub fn run<F, T>(&mut self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, DatabaseError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Read access outside of an explicit transaction.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub(crate) fn parse_timestamp(
    column: &'static str,
    value: &str,
) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::InvalidValue {
            column,
            value: value.to_string(),
        })
}

/// Returns the canonical database path: `~/.journal/data/journal.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".journal").join("data").join("journal.db"))
}
