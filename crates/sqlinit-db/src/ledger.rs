use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use sqlinit_common::{Error, Result};

/// The `migrations` table recording which scripts have been applied.
///
/// The schema is a single `name TEXT PRIMARY KEY` column and must stay
/// that way so existing databases keep working.
pub struct Ledger;

/// Outcome of recording a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Inserted,
    /// The primary key already held this name.
    AlreadyPresent,
}

impl Ledger {
    /// Create the ledger table if it does not exist.
    pub fn ensure(conn: &Connection) -> Result<()> {
        conn.execute_batch("CREATE TABLE IF NOT EXISTS migrations (name TEXT PRIMARY KEY);")
            .map_err(|e| Error::Ledger(format!("cannot create migrations table: {e}")))
    }

    pub fn contains(conn: &Connection, name: &str) -> Result<bool> {
        conn.query_row(
            "SELECT 1 FROM migrations WHERE name = ?1",
            params![name],
            |_| Ok(()),
        )
        .optional()
        .map(|row| row.is_some())
        .map_err(|e| Error::Migration {
            name: name.to_string(),
            reason: format!("cannot read migrations table: {e}"),
        })
    }

    pub fn record(conn: &Connection, name: &str) -> Result<Recorded> {
        match conn.execute("INSERT INTO migrations (name) VALUES (?1)", params![name]) {
            Ok(_) => Ok(Recorded::Inserted),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Ok(Recorded::AlreadyPresent)
            }
            Err(e) => Err(Error::Migration {
                name: name.to_string(),
                reason: format!("cannot record migration: {e}"),
            }),
        }
    }

    /// All recorded names in ascending order.
    pub fn applied(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn
            .prepare("SELECT name FROM migrations ORDER BY name")
            .map_err(|e| Error::Ledger(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| Error::Ledger(format!("failed to query migrations: {e}")))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Ledger(format!("failed to read migration row: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        Ledger::ensure(&conn).unwrap();
        Ledger::ensure(&conn).unwrap();

        let columns: Vec<String> = conn
            .prepare("SELECT name FROM pragma_table_info('migrations')")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(columns, vec!["name"]);
    }

    #[test]
    fn record_and_contains() {
        let conn = Connection::open_in_memory().unwrap();
        Ledger::ensure(&conn).unwrap();

        assert!(!Ledger::contains(&conn, "0001_init.sql").unwrap());
        assert_eq!(
            Ledger::record(&conn, "0001_init.sql").unwrap(),
            Recorded::Inserted
        );
        assert!(Ledger::contains(&conn, "0001_init.sql").unwrap());
    }

    #[test]
    fn duplicate_record_reports_already_present() {
        let conn = Connection::open_in_memory().unwrap();
        Ledger::ensure(&conn).unwrap();
        Ledger::record(&conn, "0001_init.sql").unwrap();
        assert_eq!(
            Ledger::record(&conn, "0001_init.sql").unwrap(),
            Recorded::AlreadyPresent
        );
        assert_eq!(Ledger::applied(&conn).unwrap(), vec!["0001_init.sql"]);
    }

    #[test]
    fn applied_is_sorted() {
        let conn = Connection::open_in_memory().unwrap();
        Ledger::ensure(&conn).unwrap();
        for name in ["010_y.sql", "001_z.sql", "002_x.sql"] {
            Ledger::record(&conn, name).unwrap();
        }
        assert_eq!(
            Ledger::applied(&conn).unwrap(),
            vec!["001_z.sql", "002_x.sql", "010_y.sql"]
        );
    }

    #[test]
    fn missing_table_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            Ledger::applied(&conn).unwrap_err(),
            Error::Ledger(_)
        ));
    }
}
