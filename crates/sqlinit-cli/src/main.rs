mod cli;
mod logging;
mod summary;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;
use sqlinit_config::loader::load_file;
use sqlinit_config::{AppConfig, ConfigLoader, DatabaseConfig};
use sqlinit_db::{
    DirectorySource, EmbeddedSource, MigrationReport, ScriptSource, StoreInitializer,
};
use tracing::{debug, error, info};

use crate::cli::Cli;

const APP: &str = "sqlinit";

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let loader = ConfigLoader::new(APP);
    let config_path = loader.locate(cli.config.as_deref());
    let mut config = match &config_path {
        Some(path) => load_file(path).context("error loading configuration")?,
        None => AppConfig::default(),
    };
    cli.apply_overrides(&mut config);

    logging::init(&config.log, APP)?;
    info!("{APP} starting");
    match &config_path {
        Some(path) => info!("configuration loaded from {}", path.display()),
        None => debug!("no config file for {APP} found, using defaults"),
    }

    let source = script_source(&config.database);
    let (conn, report) = bootstrap(&config.database, source.as_ref())?;
    summary::print_report(&config.database.path, &source.describe(), &report);

    if let Some(table) = cli.count_table() {
        let count = count_rows(&conn, table)
            .with_context(|| format!("error querying database table {table}"))?;
        println!("count: {count}");
    }
    Ok(())
}

fn script_source(config: &DatabaseConfig) -> Box<dyn ScriptSource> {
    match &config.scripts_dir {
        Some(dir) => Box::new(DirectorySource::new(dir)),
        None => Box::new(EmbeddedSource::bundled()),
    }
}

/// Open the configured store and apply all pending migrations.
fn bootstrap(
    config: &DatabaseConfig,
    source: &dyn ScriptSource,
) -> Result<(Connection, MigrationReport)> {
    StoreInitializer::new(&config.path)
        .with_pattern(&config.pattern)
        .open_with_report(source)
        .with_context(|| format!("error opening database {}", config.path))
}

fn count_rows(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    let sql = format!("SELECT count(*) FROM \"{}\"", table.replace('"', "\"\""));
    conn.query_row(&sql, [], |row| row.get(0))
}
