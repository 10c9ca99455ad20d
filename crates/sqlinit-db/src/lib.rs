pub mod embedded;
pub mod ledger;
pub mod migrations;
pub mod source;
pub mod store;

pub use embedded::EmbeddedSource;
pub use ledger::Ledger;
pub use migrations::{MigrationEngine, MigrationReport, MigrationScript};
pub use source::{DirectorySource, MemorySource, ScriptSource};
pub use store::{MEMORY_LOCATOR, StoreInitializer, open};
