use include_dir::{Dir, include_dir};
use sqlinit_common::{Error, Result};

use crate::source::{NamePattern, ScriptSource};

static BUNDLED: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

/// Scripts compiled into the binary from a directory at build time.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedSource {
    dir: &'static Dir<'static>,
}

impl EmbeddedSource {
    pub fn new(dir: &'static Dir<'static>) -> Self {
        Self { dir }
    }

    /// The scripts shipped in this crate's `migrations/` directory.
    pub fn bundled() -> Self {
        Self::new(&BUNDLED)
    }
}

impl ScriptSource for EmbeddedSource {
    fn describe(&self) -> String {
        "embedded migrations".to_string()
    }

    fn list(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = NamePattern::new(pattern)?;
        Ok(self
            .dir
            .files()
            .filter_map(|f| f.path().file_name().and_then(|n| n.to_str()))
            .filter(|name| matcher.matches(name))
            .map(str::to_owned)
            .collect())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.dir
            .files()
            .find(|f| f.path().file_name().and_then(|n| n.to_str()) == Some(name))
            .map(|f| f.contents().to_vec())
            .ok_or_else(|| Error::ScriptRead {
                name: name.to_string(),
                reason: "not embedded in this binary".into(),
            })
    }
}
