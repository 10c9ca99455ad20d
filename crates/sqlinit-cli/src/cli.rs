use std::path::PathBuf;

use clap::Parser;
use sqlinit_config::{AppConfig, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "sqlinit",
    version,
    about = "Open a SQLite store and apply pending migration scripts"
)]
pub struct Cli {
    /// Directory of migration scripts. Uses the bundled scripts when omitted.
    pub scripts: Option<PathBuf>,

    /// Config file (.yml, .yaml, .toml or .json).
    #[arg(short, long, env = "SQLINIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file, or `:memory:`.
    #[arg(short, long, env = "SQLINIT_DATABASE")]
    pub database: Option<String>,

    /// Glob selecting migration scripts.
    #[arg(long)]
    pub pattern: Option<String>,

    #[arg(long)]
    pub log_level: Option<String>,

    /// compact, pretty or json.
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Table whose row count is printed once the store is ready.
    #[arg(long, value_name = "TABLE", default_value = "pairs")]
    pub count: String,

    /// Skip the row count.
    #[arg(long)]
    pub no_count: bool,
}

impl Cli {
    /// Command-line values win over the config file.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.scripts {
            config.database.scripts_dir = Some(dir.clone());
        }
        if let Some(path) = &self.database {
            config.database.path = path.clone();
        }
        if let Some(pattern) = &self.pattern {
            config.database.pattern = pattern.clone();
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log.format = format;
        }
    }

    pub fn count_table(&self) -> Option<&str> {
        (!self.no_count).then_some(self.count.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config_values() {
        let cli = Cli::try_parse_from([
            "sqlinit",
            "./scripts",
            "--database",
            "/tmp/x.db",
            "--pattern",
            "*.up.sql",
            "--log-format",
            "json",
        ])
        .unwrap();

        let mut config = AppConfig::default();
        config.log.level = "debug".into();
        cli.apply_overrides(&mut config);

        assert_eq!(
            config.database.scripts_dir,
            Some(PathBuf::from("./scripts"))
        );
        assert_eq!(config.database.path, "/tmp/x.db");
        assert_eq!(config.database.pattern, "*.up.sql");
        assert_eq!(config.log.format, LogFormat::Json);
        // not given on the command line
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn count_defaults_to_pairs_and_can_be_disabled() {
        let cli = Cli::try_parse_from(["sqlinit"]).unwrap();
        assert_eq!(cli.count_table(), Some("pairs"));

        let cli = Cli::try_parse_from(["sqlinit", "--no-count"]).unwrap();
        assert_eq!(cli.count_table(), None);
    }
}
