//! Search backends: plain directories and filename databases.

use super::config::SearchDir;
use super::format::FormatClass;
use crate::error::Result;
use flate2::read::GzDecoder;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};

/// Recursive searches stop descending past this depth.
const MAX_RECURSION_DEPTH: usize = 32;

/// A source of resource locations.
///
/// The resolver consults its backends in order and takes the first answer.
/// Callers never see which backend produced a path.
pub trait SearchBackend: Send + Sync {
    /// Locate the first of `candidates` for `class`.
    fn find(&self, class: FormatClass, candidates: &[String]) -> Option<PathBuf>;

    /// Short human-readable description, used in log output.
    fn label(&self) -> &str;
}

// ============================================================================
// Directory search
// ============================================================================

/// Searches per-class lists of directories on disk.
#[derive(Debug, Default)]
pub struct DirectorySearch {
    label: String,
    dirs: FxHashMap<FormatClass, Vec<SearchDir>>,
}

impl DirectorySearch {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            dirs: FxHashMap::default(),
        }
    }

    /// Set the directories searched for `class`.
    pub fn set_dirs(&mut self, class: FormatClass, dirs: Vec<SearchDir>) {
        if dirs.is_empty() {
            self.dirs.remove(&class);
        } else {
            self.dirs.insert(class, dirs);
        }
    }

    pub fn dirs(&self, class: FormatClass) -> &[SearchDir] {
        self.dirs.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

fn find_in_dir(dir: &Path, candidates: &[String]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

fn find_recursive(dir: &Path, candidates: &[String], depth: usize) -> Option<PathBuf> {
    if let Some(found) = find_in_dir(dir, candidates) {
        return Some(found);
    }
    if depth >= MAX_RECURSION_DEPTH {
        tracing::debug!(dir = %dir.display(), "recursion depth limit reached");
        return None;
    }
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::trace!(dir = %dir.display(), %err, "cannot list directory");
            return None;
        }
    };
    let mut subdirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    subdirs.sort();
    subdirs
        .iter()
        .find_map(|sub| find_recursive(sub, candidates, depth + 1))
}

impl SearchBackend for DirectorySearch {
    fn find(&self, class: FormatClass, candidates: &[String]) -> Option<PathBuf> {
        self.dirs(class).iter().find_map(|dir| {
            if dir.recursive {
                find_recursive(&dir.path, candidates, 0)
            } else {
                find_in_dir(&dir.path, candidates)
            }
        })
    }

    fn label(&self) -> &str {
        &self.label
    }
}

// ============================================================================
// Filename database (ls-R)
// ============================================================================

/// An `ls-R` filename database mapping file names to the directories holding them.
///
/// The format is a sequence of blocks, each introduced by a `dir:` line and
/// followed by the names in that directory. Directory lines are relative to
/// the database's own location. Lines starting with `%` are comments.
#[derive(Debug, Default)]
pub struct FilenameDatabase {
    label: String,
    entries: FxHashMap<String, Vec<PathBuf>>,
}

impl FilenameDatabase {
    /// Load a database from disk, transparently decompressing `.gz` files.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let root = path.parent().unwrap_or(Path::new("."));
        let db = Self::parse(BufReader::new(reader), root, path.display().to_string())?;
        tracing::debug!(db = %path.display(), files = db.len(), "loaded filename database");
        Ok(db)
    }

    /// Parse database text whose relative directories are anchored at `root`.
    pub fn parse<R: BufRead>(reader: R, root: &Path, label: impl Into<String>) -> Result<Self> {
        let mut entries: FxHashMap<String, Vec<PathBuf>> = FxHashMap::default();
        let mut current = root.to_path_buf();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('%') {
                continue;
            }
            if let Some(dir) = line.strip_suffix(':') {
                current = root.join(normalize_relative(dir));
                continue;
            }
            entries
                .entry(line.to_string())
                .or_default()
                .push(current.clone());
        }
        Ok(Self {
            label: label.into(),
            entries,
        })
    }

    /// Number of distinct file names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All directories recorded for `name`.
    pub fn directories(&self, name: &str) -> &[PathBuf] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Strip a leading `./` so joins stay tidy.
fn normalize_relative(dir: &str) -> PathBuf {
    Path::new(dir)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

impl SearchBackend for FilenameDatabase {
    fn find(&self, class: FormatClass, candidates: &[String]) -> Option<PathBuf> {
        let subdir = Path::new(class.texmf_subdir());
        for name in candidates {
            let dirs = self.directories(name);
            if dirs.is_empty() {
                continue;
            }
            // Prefer a directory inside the class's conventional subtree.
            let dir = dirs
                .iter()
                .find(|d| contains_subpath(d, subdir))
                .unwrap_or(&dirs[0]);
            return Some(dir.join(name));
        }
        None
    }

    fn label(&self) -> &str {
        &self.label
    }
}

fn contains_subpath(dir: &Path, sub: &Path) -> bool {
    let dir: Vec<Component<'_>> = dir.components().collect();
    let sub: Vec<Component<'_>> = sub.components().collect();
    !sub.is_empty() && dir.windows(sub.len()).any(|w| w == sub.as_slice())
}
