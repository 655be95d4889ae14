use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use super::{Backend, RasterBackend, VectorBackend};

/// Table of backend kinds available to a catalog.
///
/// Kinds are kept in sorted order so that aggregated lookups over the
/// services built from this table are deterministic.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: BTreeMap<String, Arc<dyn Backend>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in vector and raster backends.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(VectorBackend::new()));
        registry.register(Arc::new(RasterBackend::new()));
        registry
    }

    /// Register a backend under its own kind, replacing any previous one.
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        let kind = backend.kind().to_string();
        if self.backends.insert(kind.clone(), backend).is_some() {
            warn!(kind = %kind, "Replaced previously registered backend");
        }
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn Backend>> {
        self.backends.get(kind).cloned()
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Backend>> {
        self.backends.values()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
