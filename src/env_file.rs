//! Loader for `.env.deploy`-style settings files.
//!
//! The format is line oriented `KEY=VALUE`. Lines are trimmed, blank lines and
//! `#` comments are skipped, and each line is split on its first `=` only so
//! values may carry `=` themselves. Values are kept raw: no quoting rules and
//! no variable expansion.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::DeployError;

/// Raw key/value pairs read from a settings file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    vars: BTreeMap<String, String>,
}

impl EnvVars {
    /// Read and parse a settings file.
    ///
    /// Callers that want fail-soft behaviour report the error and fall back
    /// to `EnvVars::default()`.
    pub fn load(path: &Path) -> Result<Self, DeployError> {
        let content = fs::read_to_string(path).map_err(|source| DeployError::EnvFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    /// Parse settings file content
    pub fn parse(content: &str) -> Self {
        let mut vars = BTreeMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            if key.is_empty() {
                continue;
            }

            vars.insert(key.to_string(), value.to_string());
        }

        Self { vars }
    }

    /// Raw value for a key, if present
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Value for a key, treating an empty value as absent
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Key names in sorted order (never the values)
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
