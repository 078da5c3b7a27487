//! Search path configuration.
//!
//! A [`SearchConfig`] is built once (programmatically, from a JSON file, or by
//! overlaying environment variables) and handed to
//! [`Resolver::new`](super::Resolver::new). Nothing reads ambient state after
//! that point.

use super::format::FormatClass;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// One directory on a search path.
///
/// Written as `dir//` in configuration, a directory is searched recursively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDir {
    pub path: PathBuf,
    pub recursive: bool,
}

impl SearchDir {
    pub fn new(path: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            path: path.into(),
            recursive,
        }
    }

    /// Interpret a configured path, honouring a trailing `//`.
    pub fn parse(path: &Path) -> Self {
        let text = path.to_string_lossy();
        match text.strip_suffix("//") {
            Some(stripped) if !stripped.is_empty() => Self::new(stripped, true),
            _ => Self::new(path, false),
        }
    }
}

/// Immutable description of where resources live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// TEXMF trees; each contributes `<root>/<class subdir>//` as a default.
    pub texmf_roots: Vec<PathBuf>,
    /// Per-class lists consulted before anything else.
    pub overrides: BTreeMap<FormatClass, Vec<PathBuf>>,
    /// Per-class default directories, consulted after overrides.
    pub defaults: BTreeMap<FormatClass, Vec<PathBuf>>,
    /// `ls-R` style filename databases (optionally `.gz`), consulted last.
    pub databases: Vec<PathBuf>,
    /// Cache resolved paths for the resolver's lifetime.
    pub cache: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            texmf_roots: Vec::new(),
            overrides: BTreeMap::new(),
            defaults: BTreeMap::new(),
            databases: Vec::new(),
            cache: true,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Add a TEXMF root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.texmf_roots.push(root.into());
        self
    }

    /// Append an override directory for `class`.
    pub fn with_override(mut self, class: FormatClass, dir: impl Into<PathBuf>) -> Self {
        self.overrides.entry(class).or_default().push(dir.into());
        self
    }

    /// Append a default directory for `class`.
    pub fn with_default(mut self, class: FormatClass, dir: impl Into<PathBuf>) -> Self {
        self.defaults.entry(class).or_default().push(dir.into());
        self
    }

    /// Append a filename database.
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.databases.push(path.into());
        self
    }

    /// Disable the resolution cache.
    pub fn without_cache(mut self) -> Self {
        self.cache = false;
        self
    }

    /// Overlay kpathsea-style environment variables from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var_os(key))
    }

    /// Overlay environment variables obtained through `lookup`.
    ///
    /// For every class whose variable (see [`FormatClass::env_var`]) is set,
    /// the listed directories are prepended to that class's overrides. Empty
    /// list elements are ignored.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        for class in FormatClass::ALL {
            let Some(value) = lookup(class.env_var()) else {
                continue;
            };
            let dirs: Vec<PathBuf> = std::env::split_paths(&value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if dirs.is_empty() {
                continue;
            }
            tracing::debug!(class = %class, count = dirs.len(), "search path from environment");
            let existing = self.overrides.remove(&class).unwrap_or_default();
            let mut merged = dirs;
            merged.extend(existing);
            self.overrides.insert(class, merged);
        }
        self
    }

    /// Override directories for `class`, in search order.
    pub fn override_dirs(&self, class: FormatClass) -> Vec<SearchDir> {
        self.overrides
            .get(&class)
            .map(|dirs| dirs.iter().map(|d| SearchDir::parse(d)).collect())
            .unwrap_or_default()
    }

    /// Default directories for `class`: explicit defaults, then TEXMF roots.
    pub fn default_dirs(&self, class: FormatClass) -> Vec<SearchDir> {
        let mut dirs: Vec<SearchDir> = self
            .defaults
            .get(&class)
            .map(|dirs| dirs.iter().map(|d| SearchDir::parse(d)).collect())
            .unwrap_or_default();
        dirs.extend(
            self.texmf_roots
                .iter()
                .map(|root| SearchDir::new(root.join(class.texmf_subdir()), true)),
        );
        dirs
    }
}
