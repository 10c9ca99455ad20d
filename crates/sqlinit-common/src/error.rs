use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("environment error: {0}")]
    Environment(String),

    #[error("ledger setup error: {0}")]
    Ledger(String),

    #[error("discovery error: {0}")]
    Discovery(String),

    #[error("cannot read migration {name}: {reason}")]
    ScriptRead { name: String, reason: String },

    /// The script body is kept so the failing command can be located.
    #[error("migration {name} failed: {reason} (command: {command})")]
    ScriptExecution {
        name: String,
        command: String,
        reason: String,
    },

    #[error("migration {name} failed: {reason}")]
    Migration { name: String, reason: String },
}

impl Error {
    /// Name of the migration this error is attributed to, if any.
    pub fn migration_name(&self) -> Option<&str> {
        match self {
            Error::ScriptRead { name, .. }
            | Error::ScriptExecution { name, .. }
            | Error::Migration { name, .. } => Some(name),
            _ => None,
        }
    }
}
