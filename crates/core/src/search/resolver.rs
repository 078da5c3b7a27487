//! Layered resource resolution with a process-lifetime cache.

use super::backend::{DirectorySearch, FilenameDatabase, SearchBackend};
use super::config::SearchConfig;
use super::format::FormatClass;
use crate::error::{DviError, Result};
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::sync::RwLock;

type CacheKey = (FormatClass, String);

/// Resolves logical resource names to files.
///
/// Backends are consulted in order: per-class overrides, per-class defaults,
/// then filename databases. The first hit wins and, when caching is enabled,
/// is remembered for the lifetime of the resolver. Misses are not cached.
///
/// The resolver is `Send + Sync`; concurrent lookups share the cache. Two
/// threads missing on the same key may both search and store the same path.
pub struct Resolver {
    config: SearchConfig,
    backends: Vec<Box<dyn SearchBackend>>,
    cache: Option<RwLock<FxHashMap<CacheKey, PathBuf>>>,
}

impl Resolver {
    /// Build a resolver from a configuration.
    ///
    /// Databases that cannot be read are skipped with a warning.
    pub fn new(config: SearchConfig) -> Self {
        let mut overrides = DirectorySearch::new("overrides");
        let mut defaults = DirectorySearch::new("defaults");
        for class in FormatClass::ALL {
            overrides.set_dirs(class, config.override_dirs(class));
            defaults.set_dirs(class, config.default_dirs(class));
        }

        let mut backends: Vec<Box<dyn SearchBackend>> = Vec::new();
        if !overrides.is_empty() {
            backends.push(Box::new(overrides));
        }
        if !defaults.is_empty() {
            backends.push(Box::new(defaults));
        }
        for path in &config.databases {
            match FilenameDatabase::load(path) {
                Ok(db) => backends.push(Box::new(db)),
                Err(err) => {
                    tracing::warn!(db = %path.display(), %err, "skipping unreadable filename database");
                }
            }
        }

        let cache = config.cache.then(|| RwLock::new(FxHashMap::default()));
        Self {
            config,
            backends,
            cache,
        }
    }

    /// Append a custom backend, consulted after the configured ones.
    pub fn push_backend(&mut self, backend: Box<dyn SearchBackend>) {
        self.backends.push(backend);
    }

    /// The configuration this resolver was built from.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Number of cached resolutions.
    pub fn cached_len(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| {
            cache.read().unwrap_or_else(|e| e.into_inner()).len()
        })
    }

    /// Locate `name` for `class`, or `None` if no backend has it.
    pub fn find(&self, name: &str, class: FormatClass) -> Option<PathBuf> {
        let key = (class, name.to_string());
        if let Some(cache) = &self.cache
            && let Some(path) = cache.read().unwrap_or_else(|e| e.into_inner()).get(&key)
        {
            tracing::trace!(name, %class, "resolver cache hit");
            return Some(path.clone());
        }

        let candidates = class.candidates(name);
        let found = self.backends.iter().find_map(|backend| {
            let path = backend.find(class, &candidates)?;
            tracing::debug!(name, %class, backend = backend.label(), path = %path.display(), "resolved");
            Some(path)
        })?;

        if let Some(cache) = &self.cache {
            cache
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(key, found.clone());
        }
        Some(found)
    }

    /// Locate `name` for `class`, reporting a miss as [`DviError::NotFound`].
    pub fn resolve(&self, name: &str, class: FormatClass) -> Result<PathBuf> {
        self.find(name, class).ok_or_else(|| {
            tracing::debug!(name, %class, "not found on any search path");
            DviError::NotFound {
                name: name.to_string(),
                class,
            }
        })
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field(
                "backends",
                &self.backends.iter().map(|b| b.label()).collect::<Vec<_>>(),
            )
            .field("cached", &self.cached_len())
            .finish()
    }
}
