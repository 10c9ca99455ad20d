use std::path::Path;

use rusqlite::Connection;
use sqlinit_common::{Error, Result};
use tracing::{debug, error, info};

use crate::migrations::{MigrationEngine, MigrationReport};
use crate::source::ScriptSource;

/// Locator for a private in-memory database.
pub const MEMORY_LOCATOR: &str = ":memory:";

/// Opens a SQLite store, applies the required pragmas and brings its schema
/// up to date before handing the connection out.
#[derive(Debug, Clone)]
pub struct StoreInitializer {
    locator: String,
    engine: MigrationEngine,
}

impl StoreInitializer {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            engine: MigrationEngine::default(),
        }
    }

    /// Glob selecting migration scripts, `*.sql` by default.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.engine = self.engine.with_pattern(pattern);
        self
    }

    pub fn open<S: ScriptSource + ?Sized>(&self, source: &S) -> Result<Connection> {
        self.open_with_report(source).map(|(conn, _)| conn)
    }

    /// Like [`open`](Self::open), also returning what the migration pass did.
    ///
    /// On error the connection is dropped; nothing is cleaned up on disk.
    pub fn open_with_report<S: ScriptSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<(Connection, MigrationReport)> {
        if self.locator.is_empty() {
            error!("the database locator must be specified");
            return Err(Error::Config("database locator is empty".into()));
        }
        info!("opening SQLite database at {}", self.locator);

        let mut conn = self.connect()?;
        apply_pragmas(&conn).map_err(|e| self.context(e))?;

        let report = self.engine.apply(&mut conn, source).map_err(|e| {
            error!("error applying migrations to {}: {e}", self.locator);
            self.context(e)
        })?;
        Ok((conn, report))
    }

    fn connect(&self) -> Result<Connection> {
        if self.locator == MEMORY_LOCATOR {
            return Connection::open_in_memory()
                .map_err(|e| Error::Environment(format!("failed to open in-memory database: {e}")));
        }

        let path = Path::new(&self.locator);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                error!("error creating directory for on-disk database: {e}");
                Error::Environment(format!(
                    "cannot create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        Connection::open(path).map_err(|e| {
            Error::Environment(format!("failed to open database {}: {e}", self.locator))
        })
    }

    /// Prefix the locator onto the error's message, keeping its variant and
    /// migration name.
    fn context(&self, e: Error) -> Error {
        let at = |m: String| format!("{}: {m}", self.locator);
        match e {
            Error::Config(m) => Error::Config(at(m)),
            Error::Environment(m) => Error::Environment(at(m)),
            Error::Ledger(m) => Error::Ledger(at(m)),
            Error::Discovery(m) => Error::Discovery(at(m)),
            Error::ScriptRead { name, reason } => Error::ScriptRead {
                name,
                reason: at(reason),
            },
            Error::ScriptExecution {
                name,
                command,
                reason,
            } => Error::ScriptExecution {
                name,
                command,
                reason: at(reason),
            },
            Error::Migration { name, reason } => Error::Migration {
                name,
                reason: at(reason),
            },
        }
    }
}

/// Open `locator` and apply every pending migration from `source`.
pub fn open<S: ScriptSource + ?Sized>(locator: &str, source: &S) -> Result<Connection> {
    StoreInitializer::new(locator).open(source)
}

/// WAL lets readers proceed while a writer is active. Foreign keys are off by
/// default in SQLite and migrations may depend on them, so they are enabled
/// before any script runs.
fn apply_pragmas(conn: &Connection) -> Result<()> {
    let mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .map_err(|e| Error::Environment(format!("enable wal: {e}")))?;
    debug!("journal mode is {mode}");

    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|e| Error::Environment(format!("foreign keys pragma: {e}")))?;
    Ok(())
}
