//! Ordered, idempotent application of migration scripts.
//!
//! Candidates are the entries of a [`ScriptSource`] matching a glob pattern,
//! applied in byte-wise lexicographic order of their names. Each script runs
//! in its own transaction together with the insert of its ledger entry, so a
//! script's effects and its ledger row become visible together or not at all.

use rusqlite::{Connection, TransactionBehavior};
use sqlinit_common::{Error, Result};
use tracing::{debug, error, info, warn};

use crate::ledger::{Ledger, Recorded};
use crate::source::ScriptSource;

/// A named script body, held only while it is being applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    name: String,
    body: String,
}

impl MigrationScript {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    /// Read `name` from `source`; the content must be UTF-8 text.
    pub fn load<S: ScriptSource + ?Sized>(source: &S, name: &str) -> Result<Self> {
        let bytes = source.read(name)?;
        let body = String::from_utf8(bytes).map_err(|e| Error::ScriptRead {
            name: name.to_string(),
            reason: format!("content is not valid UTF-8: {e}"),
        })?;
        Ok(Self::new(name, body))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Scripts executed and recorded by this pass, in application order.
    pub applied: Vec<String>,
    /// Scripts found already recorded in the ledger.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MigrationEngine {
    pattern: String,
}

impl Default for MigrationEngine {
    fn default() -> Self {
        Self {
            pattern: Self::DEFAULT_PATTERN.to_string(),
        }
    }
}

impl MigrationEngine {
    pub const DEFAULT_PATTERN: &'static str = "*.sql";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Names of all candidate scripts, sorted byte-wise.
    pub fn candidates<S: ScriptSource + ?Sized>(&self, source: &S) -> Result<Vec<String>> {
        let mut names = source.list(&self.pattern)?;
        names.sort_unstable();
        names.dedup();
        Ok(names)
    }

    /// Run one pass: ensure the ledger, then apply every unrecorded candidate
    /// in order. Stops at the first failure; scripts applied before it stay
    /// committed and a later pass resumes from the failed one.
    pub fn apply<S: ScriptSource + ?Sized>(
        &self,
        conn: &mut Connection,
        source: &S,
    ) -> Result<MigrationReport> {
        debug!("applying migrations from {}", source.describe());
        Ledger::ensure(conn)?;

        let names = self.candidates(source)?;
        let mut report = MigrationReport::default();
        for name in names {
            match self.apply_one(conn, source, &name) {
                Ok(true) => report.applied.push(name),
                Ok(false) => report.skipped.push(name),
                Err(e) => {
                    error!(migration = %name, "error applying migration: {e}");
                    return Err(e);
                }
            }
        }

        info!(
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            "all migrations applied"
        );
        Ok(report)
    }

    /// Apply a single script inside its own transaction.
    ///
    /// Returns `Ok(false)` when the ledger already records `name`, including
    /// the case where a concurrent initializer recorded it first.
    ///
    /// Scripts must not contain `BEGIN`, `COMMIT` or `ROLLBACK`: the engine owns
    /// the transaction. A script that leaves the connection in autocommit mode
    /// is rejected and not recorded, but anything it committed itself stays.
    pub fn apply_one<S: ScriptSource + ?Sized>(
        &self,
        conn: &mut Connection,
        source: &S,
        name: &str,
    ) -> Result<bool> {
        debug!(migration = name, "applying migration");
        // IMMEDIATE takes the write lock up front so the ledger check and the
        // insert below see the same state.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::Migration {
                name: name.to_string(),
                reason: format!("cannot begin transaction: {e}"),
            })?;

        if Ledger::contains(&tx, name)? {
            debug!(migration = name, "migration already applied, skipping");
            return Ok(false);
        }

        let script = MigrationScript::load(source, name)?;
        if let Err(e) = tx.execute_batch(script.body()) {
            error!(
                migration = script.name(),
                command = script.body(),
                "error executing migration: {e}"
            );
            return Err(Error::ScriptExecution {
                name: script.name,
                command: script.body,
                reason: e.to_string(),
            });
        }

        if tx.is_autocommit() {
            error!(migration = name, "migration ended its own transaction");
            return Err(Error::ScriptExecution {
                name: script.name,
                command: script.body,
                reason: "script ended the migration transaction".into(),
            });
        }

        if Ledger::record(&tx, name)? == Recorded::AlreadyPresent {
            warn!(migration = name, "migration recorded by another initializer, rolling back");
            return Ok(false);
        }

        tx.commit().map_err(|e| Error::Migration {
            name: name.to_string(),
            reason: format!("commit failed: {e}"),
        })?;
        info!(migration = name, "migration applied");
        Ok(true)
    }
}
