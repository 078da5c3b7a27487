//! Font resources consulted by the interpreter.
//!
//! When the interpreter meets a font definition it asks a [`MetricsProvider`]
//! for whatever the environment knows about that font: metrics for advancing
//! the current point, and the font map entry a driver would use.

use super::fontmap::{FontMapRecord, FontMapTable};
use super::tfm::TfmMetrics;
use crate::dvi::FontDefinition;
use crate::search::{FormatClass, Resolver};
use rustc_hash::FxHashMap;
use std::sync::{Arc, RwLock};

/// What a provider found for one font definition.
#[derive(Debug, Clone, Default)]
pub struct ResolvedFont {
    pub metrics: Option<Arc<TfmMetrics>>,
    pub map_record: Option<FontMapRecord>,
}

/// Supplies font resources to the interpreter.
pub trait MetricsProvider {
    fn resolve(&self, def: &FontDefinition) -> ResolvedFont;
}

/// Provider that knows nothing; every character gets an unknown width.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetrics;

impl MetricsProvider for NoMetrics {
    fn resolve(&self, _def: &FontDefinition) -> ResolvedFont {
        ResolvedFont::default()
    }
}

/// Provider backed by an in-memory set of already loaded metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsTable {
    fonts: FxHashMap<String, Arc<TfmMetrics>>,
}

impl MetricsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, metrics: TfmMetrics) {
        self.fonts.insert(name.into(), Arc::new(metrics));
    }
}

impl MetricsProvider for MetricsTable {
    fn resolve(&self, def: &FontDefinition) -> ResolvedFont {
        ResolvedFont {
            metrics: self.fonts.get(&def.name).cloned(),
            map_record: None,
        }
    }
}

/// Provider that locates TFM files through a [`Resolver`] and consults a
/// font map table.
///
/// Loaded metrics (and failed loads) are cached by font name, so a font
/// defined in the body and again in the postamble is read once. The cache
/// is shared across threads.
pub struct FontResolver {
    resolver: Arc<Resolver>,
    fontmap: Option<Arc<FontMapTable>>,
    cache: RwLock<FxHashMap<String, Option<Arc<TfmMetrics>>>>,
}

impl FontResolver {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self {
            resolver,
            fontmap: None,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// Attach a font map table.
    pub fn with_fontmap(mut self, fontmap: Arc<FontMapTable>) -> Self {
        self.fontmap = Some(fontmap);
        self
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn fontmap(&self) -> Option<&FontMapTable> {
        self.fontmap.as_deref()
    }

    /// Metrics for TeX font `name`, loading them on first use.
    pub fn metrics(&self, name: &str) -> Option<Arc<TfmMetrics>> {
        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
        {
            return cached.clone();
        }

        let loaded = match self.resolver.resolve(name, FormatClass::Tfm) {
            Ok(path) => match TfmMetrics::load(&path) {
                Ok(metrics) => Some(Arc::new(metrics)),
                Err(err) => {
                    tracing::warn!(font = name, path = %path.display(), %err, "cannot load font metrics");
                    None
                }
            },
            Err(err) => {
                tracing::debug!(font = name, %err, "no metrics for font");
                None
            }
        };

        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), loaded.clone());
        loaded
    }
}

impl MetricsProvider for FontResolver {
    fn resolve(&self, def: &FontDefinition) -> ResolvedFont {
        let map_record = self.fontmap.as_ref().and_then(|table| match table.lookup(&def.name) {
            Ok(record) => Some(record.clone()),
            Err(err) => {
                tracing::debug!(font = %def.name, %err, "font map lookup failed");
                None
            }
        });

        let metrics = self.metrics(&def.name);
        if let Some(m) = &metrics
            && def.checksum != 0
            && m.checksum != 0
            && def.checksum != m.checksum
        {
            tracing::warn!(
                font = %def.name,
                dvi = def.checksum,
                tfm = m.checksum,
                "font checksum mismatch"
            );
        }

        ResolvedFont {
            metrics,
            map_record,
        }
    }
}

impl std::fmt::Debug for FontResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontResolver")
            .field("resolver", &self.resolver)
            .field("fontmap", &self.fontmap.as_ref().map(|t| t.len()))
            .finish()
    }
}
