use std::path::PathBuf;

use regex::Regex;
use sqlinit_common::{Error, Result};
use tracing::{debug, warn};

/// A named collection of migration scripts, independent of where the bytes live.
///
/// Implementations enumerate top-level entry names matching a glob pattern and
/// read an entry's raw content by name. Ordering of `list` is unspecified; the
/// migration engine sorts.
pub trait ScriptSource {
    /// Human-readable origin, used in log fields.
    fn describe(&self) -> String;

    /// Names of all entries matching `pattern` (`*`, `?`, `[...]`).
    fn list(&self, pattern: &str) -> Result<Vec<String>>;

    /// Full content of the entry called `name`.
    fn read(&self, name: &str) -> Result<Vec<u8>>;
}

impl<S: ScriptSource + ?Sized> ScriptSource for &S {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn list(&self, pattern: &str) -> Result<Vec<String>> {
        (**self).list(pattern)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        (**self).read(name)
    }
}

/// Compiled glob over entry names. Wildcards never match `/`.
#[derive(Debug, Clone)]
pub struct NamePattern {
    regex: Regex,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let source = glob_to_regex(pattern)?;
        let regex = Regex::new(&source)
            .map_err(|e| Error::Discovery(format!("invalid pattern {pattern:?}: {e}")))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

fn glob_to_regex(pattern: &str) -> Result<String> {
    let bad = |why: &str| Error::Discovery(format!("invalid pattern {pattern:?}: {why}"));

    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '\\' => {
                let escaped = chars.next().ok_or_else(|| bad("trailing backslash"))?;
                out.push_str(&regex::escape(&escaped.to_string()));
            }
            '[' => {
                let mut class = String::from("[");
                if matches!(chars.peek(), Some('!') | Some('^')) {
                    chars.next();
                    class.push_str("^/");
                }
                let mut members = 0usize;
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        ']' if members > 0 => {
                            closed = true;
                            break;
                        }
                        ']' => return Err(bad("empty character class")),
                        '-' if members > 0 && chars.peek().is_some_and(|n| *n != ']') => {
                            class.push('-')
                        }
                        '\\' => {
                            let escaped =
                                chars.next().ok_or_else(|| bad("trailing backslash"))?;
                            class.push_str(&regex::escape(&escaped.to_string()));
                            members += 1;
                        }
                        other => {
                            class.push_str(&regex::escape(&other.to_string()));
                            members += 1;
                        }
                    }
                }
                if !closed {
                    return Err(bad("unterminated character class"));
                }
                class.push(']');
                out.push_str(&class);
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Ok(out)
}

/// Rejects names that would escape a flat source.
fn check_entry_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::ScriptRead {
            name: name.to_string(),
            reason: "not a top-level entry name".into(),
        });
    }
    Ok(())
}

/// Scripts stored as files in a directory on local disk.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ScriptSource for DirectorySource {
    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }

    fn list(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = NamePattern::new(pattern)?;
        let entries = std::fs::read_dir(&self.root).map_err(|e| {
            Error::Discovery(format!("cannot list {}: {e}", self.root.display()))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::Discovery(format!("cannot list {}: {e}", self.root.display()))
            })?;
            if !entry.path().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                warn!(
                    "skipping non UTF-8 file name in {}: {:?}",
                    self.root.display(),
                    entry.file_name()
                );
                continue;
            };
            if matcher.matches(&name) {
                names.push(name);
            }
        }
        debug!(source = %self.describe(), count = names.len(), "listed scripts");
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        check_entry_name(name)?;
        std::fs::read(self.root.join(name)).map_err(|e| Error::ScriptRead {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Scripts held in process memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: Vec<(String, Vec<u8>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script, replacing any existing entry with the same name.
    pub fn with(mut self, name: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.insert(name, body);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, body: impl Into<Vec<u8>>) {
        let name = name.into();
        let body = body.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = body,
            None => self.entries.push((name, body)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ScriptSource for MemorySource {
    fn describe(&self) -> String {
        format!("memory ({} entries)", self.entries.len())
    }

    fn list(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = NamePattern::new(pattern)?;
        Ok(self
            .entries
            .iter()
            .map(|(name, _)| name)
            .filter(|name| matcher.matches(name))
            .cloned()
            .collect())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, body)| body.clone())
            .ok_or_else(|| Error::ScriptRead {
                name: name.to_string(),
                reason: "no such entry".into(),
            })
    }
}
