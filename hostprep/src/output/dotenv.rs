//! Single-file `KEY=VALUE` layout.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::{create_parent, EnvFileFormat};

/// A dotenv file.
///
/// Lines are sorted by key. Backslashes, newlines and carriage returns
/// inside values are written as `\\`, `\n` and `\r` and turned back on read,
/// so any value survives a write and read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotenvFile {
    path: PathBuf,
}

impl DotenvFile {
    /// A dotenv file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render `env` as dotenv text.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostprep::output::DotenvFile;
    /// use std::collections::BTreeMap;
    ///
    /// let env = BTreeMap::from([
    ///     ("B".to_string(), "2".to_string()),
    ///     ("A".to_string(), "x\ny".to_string()),
    /// ]);
    /// assert_eq!(DotenvFile::marshal(&env), "A=x\\ny\nB=2\n");
    /// assert_eq!(DotenvFile::marshal(&BTreeMap::new()), "\n");
    /// ```
    #[must_use]
    pub fn marshal(env: &BTreeMap<String, String>) -> String {
        let lines: Vec<String> = env
            .iter()
            .map(|(key, value)| format!("{key}={}", escape(value)))
            .collect();
        format!("{}\n", lines.join("\n"))
    }

    /// Parse dotenv text.
    ///
    /// Blank lines are skipped. Each other line is split on its first `=`
    /// and its value unescaped. A trailing `\r` from CRLF line endings is
    /// dropped; carriage returns inside values are always escaped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEnvFile`] for a line without `=`.
    pub fn parse(contents: &str) -> Result<BTreeMap<String, String>> {
        let mut env = BTreeMap::new();
        for line in contents.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| Error::InvalidEnvFile {
                line: line.to_string(),
            })?;
            env.insert(key.to_string(), unescape(value));
        }
        Ok(env)
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

// Unknown escapes are kept verbatim so hand-written files still load.
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

impl EnvFileFormat for DotenvFile {
    fn write(&self, env: &BTreeMap<String, String>) -> Result<()> {
        create_parent(&self.path)?;
        fs::write(&self.path, Self::marshal(env)).map_err(|e| Error::io(&self.path, e))
    }

    fn read(&self) -> Result<BTreeMap<String, String>> {
        let contents = fs::read_to_string(&self.path).map_err(|e| Error::io(&self.path, e))?;
        Self::parse(&contents)
    }
}
