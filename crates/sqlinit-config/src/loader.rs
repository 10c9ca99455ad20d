use std::path::{Path, PathBuf};

use sqlinit_common::{Error, Result};

use crate::model::AppConfig;

const CANDIDATE_EXTENSIONS: [&str; 4] = ["yml", "yaml", "toml", "json"];

/// Locates and parses the configuration file for a named application.
pub struct ConfigLoader {
    app: String,
    search_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            search_dir: PathBuf::from("."),
        }
    }

    /// Directory searched for `<app>.{yml,yaml,toml,json}`.
    pub fn search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dir = dir.into();
        self
    }

    /// The file `load` would read: `explicit` if given, otherwise the first
    /// `<app>.<ext>` present in the search directory.
    pub fn locate(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        CANDIDATE_EXTENSIONS
            .iter()
            .map(|ext| self.search_dir.join(format!("{}.{ext}", self.app)))
            .find(|candidate| candidate.is_file())
    }

    /// Load `explicit` if given (it must exist), otherwise the first
    /// `<app>.<ext>` found in the search directory, otherwise defaults.
    pub fn load(&self, explicit: Option<&Path>) -> Result<AppConfig> {
        match self.locate(explicit) {
            Some(path) => load_file(&path),
            None => Ok(AppConfig::default()),
        }
    }
}

/// Parse a config file, choosing the format from its extension.
pub fn load_file(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let config = match ext {
        "yml" | "yaml" => serde_yaml::from_str(&contents)
            .map_err(|e| Error::Config(format!("YAML parse error in {}: {e}", path.display())))?,
        "toml" => toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("TOML parse error in {}: {e}", path.display())))?,
        "json" => serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("JSON parse error in {}: {e}", path.display())))?,
        other => {
            return Err(Error::Config(format!(
                "unsupported config extension: {other}"
            )));
        }
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogFormat;

    #[test]
    fn falls_back_to_defaults_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::new("sqlinit")
            .search_dir(dir.path())
            .load(None)
            .unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn loads_yaml_from_search_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("sqlinit.yml"),
            "database:\n  path: data/app.db\n  pattern: \"*.up.sql\"\nlog:\n  format: json\n",
        )
        .unwrap();

        let config = ConfigLoader::new("sqlinit")
            .search_dir(dir.path())
            .load(None)
            .unwrap();
        assert_eq!(config.database.path, "data/app.db");
        assert_eq!(config.database.pattern, "*.up.sql");
        assert_eq!(config.log.format, LogFormat::Json);
        // untouched fields keep their defaults
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn loads_toml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("a.toml");
        std::fs::write(
            &toml_path,
            "[database]\nscripts_dir = \"migrations\"\n[log]\nlevel = \"debug\"\n",
        )
        .unwrap();
        let config = load_file(&toml_path).unwrap();
        assert_eq!(
            config.database.scripts_dir.as_deref(),
            Some(Path::new("migrations"))
        );
        assert_eq!(config.log.level, "debug");

        let json_path = dir.path().join("b.json");
        std::fs::write(&json_path, r#"{"log": {"file_per_process": true}}"#).unwrap();
        let config = load_file(&json_path).unwrap();
        assert!(config.log.file_per_process);
    }

    #[test]
    fn locate_prefers_explicit_then_extension_order() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new("sqlinit").search_dir(dir.path());
        assert_eq!(loader.locate(None), None);

        std::fs::write(dir.path().join("sqlinit.toml"), "").unwrap();
        std::fs::write(dir.path().join("sqlinit.json"), "{}").unwrap();
        assert_eq!(loader.locate(None), Some(dir.path().join("sqlinit.toml")));

        let explicit = dir.path().join("other.yml");
        assert_eq!(loader.locate(Some(explicit.as_path())), Some(explicit.clone()));
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::new("sqlinit")
            .load(Some(&dir.path().join("missing.yml")))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "path = x").unwrap();
        let err = load_file(&path).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: unsupported config extension: ini"
        );
    }
}
