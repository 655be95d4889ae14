//! Provider: one backing source exposed as a catalog of named layers.
//!
//! A provider composes a scan-built index with a bounded cache of open
//! dataset handles:
//!
//! ```text
//!   get(name)
//!     │
//!     ├─ index lookup ───────────── absent ──► None
//!     │
//!     ├─ cache lookup ───────────── hit ─────► LayerDetails
//!     │
//!     └─ backend.open(locator) ──── failure ─► None (logged)
//!          │
//!          └─ cache.put(canonical name) ─────► LayerDetails
//! ```
//!
//! # Lifecycle
//!
//! `Provider::new` either fails with [`CatalogError::Configuration`] or
//! returns a ready provider. `reload` rescans and swaps the index as a whole;
//! `dispose` empties everything for good, after which `get` and `reload`
//! return [`CatalogError::Disposed`].
//!
//! # Concurrency
//!
//! The index sits behind an `RwLock` and is replaced, never edited. Readers
//! hold the read lock only long enough to clone the index `Arc`; opens run
//! with no provider lock held. Each reload bumps a generation counter, and a
//! handle opened under an older generation is returned to its caller but not
//! cached, so the cache never holds handles from before a reload.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::{debug, info, trace, warn};

use crate::backend::{Backend, DatasetHandle};
use crate::cache::{CacheStats, ResourceCache};
use crate::config::{LayerConfig, ProviderConfig};
use crate::error::{CatalogError, ScanWarning};
use crate::name::{Name, NamespacePolicy};
use crate::scan::{LayerIndex, LayerSelection};

// =============================================================================
// LayerDetails
// =============================================================================

/// Per-layer display and query metadata merged from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayerMetadata {
    pub styles: Vec<String>,
    pub time_field: Option<String>,
    pub elevation_field: Option<String>,
}

impl From<&LayerConfig> for LayerMetadata {
    fn from(config: &LayerConfig) -> Self {
        Self {
            styles: config.styles.clone(),
            time_field: config.time_field.clone(),
            elevation_field: config.elevation_field.clone(),
        }
    }
}

/// An open dataset plus its layer metadata, handed to protocol workers.
///
/// The dataset handle is shared with the provider cache; dropping the
/// details never closes it.
#[derive(Debug, Clone)]
pub struct LayerDetails {
    name: Name,
    provider: String,
    kind: String,
    dataset: DatasetHandle,
    metadata: LayerMetadata,
}

impl LayerDetails {
    /// Canonical name of the layer.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Id of the provider that served the layer.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn dataset(&self) -> &DatasetHandle {
        &self.dataset
    }

    pub fn metadata(&self) -> &LayerMetadata {
        &self.metadata
    }

    pub fn styles(&self) -> &[String] {
        &self.metadata.styles
    }
}

impl Serialize for LayerDetails {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("LayerDetails", 5)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("provider", &self.provider)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("metadata", &self.metadata)?;
        state.serialize_field("dataset", &self.dataset.describe())?;
        state.end()
    }
}

// =============================================================================
// Provider State
// =============================================================================

enum ProviderState {
    Ready {
        index: Arc<LayerIndex>,
        generation: u64,
    },
    Disposed,
}

/// Outcome of a successful reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadSummary {
    pub layers: usize,
    pub warnings: Vec<ScanWarning>,
}

// =============================================================================
// Provider
// =============================================================================

/// One configured backing source of a single backend kind.
pub struct Provider {
    config: ProviderConfig,
    backend: Arc<dyn Backend>,
    namespace: Option<String>,
    selection: LayerSelection,
    state: RwLock<ProviderState>,
    cache: ResourceCache<DatasetHandle>,
    /// Scan-derived name -> canonical name, for datasets that name themselves
    aliases: Mutex<HashMap<Name, Name>>,
}

impl Provider {
    /// Validate the root, scan it once, and return a ready provider.
    pub fn new(config: ProviderConfig, backend: Arc<dyn Backend>) -> Result<Self, CatalogError> {
        validate_root(&config.root)?;

        let namespace = NamespacePolicy::from_param(config.namespace.as_deref())
            .resolve(backend.default_namespace())
            .map(str::to_string);
        let selection = LayerSelection::from_config(&config);

        let report = backend.scan(&config.root, namespace.as_deref(), &selection);

        info!(
            provider = %config.id,
            kind = backend.kind(),
            root = %config.root.display(),
            layers = report.index.len(),
            warnings = report.warnings.len(),
            "Provider ready"
        );

        let cache = ResourceCache::new(config.effective_cache_capacity());

        Ok(Self {
            namespace,
            selection,
            state: RwLock::new(ProviderState::Ready {
                index: Arc::new(report.index),
                generation: 0,
            }),
            cache,
            aliases: Mutex::new(HashMap::new()),
            backend,
            config,
        })
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn kind(&self) -> &str {
        self.backend.kind()
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Namespace stamped on every name this provider indexes.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn is_disposed(&self) -> bool {
        matches!(*self.read_state(), ProviderState::Disposed)
    }

    /// Names currently indexed; empty once disposed.
    pub fn keys(&self) -> BTreeSet<Name> {
        match &*self.read_state() {
            ProviderState::Ready { index, .. } => index.names().cloned().collect(),
            ProviderState::Disposed => BTreeSet::new(),
        }
    }

    /// Whether `name` is currently indexed.
    pub fn contains(&self, name: &Name) -> bool {
        match &*self.read_state() {
            ProviderState::Ready { index, .. } => index.contains(name),
            ProviderState::Disposed => false,
        }
    }

    /// Number of open handles currently cached.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache.capacity()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Resolve a layer name to an open dataset.
    ///
    /// Returns `Ok(None)` when the name is not indexed or the dataset could
    /// not be opened; open failures are logged, never propagated.
    pub fn get(&self, name: &Name) -> Result<Option<LayerDetails>, CatalogError> {
        let (index, generation) = self.snapshot()?;

        let Some(locator) = index.get(name) else {
            trace!(provider = %self.id(), name = %name, "Layer not indexed");
            return Ok(None);
        };

        let key = self.cache_key(name);
        if let Some(handle) = self.cache.get(&key) {
            if handle.locator() == locator {
                trace!(provider = %self.id(), name = %key, "Cache hit");
                return Ok(Some(self.details(key, name, handle)));
            }
            // The key now belongs to another file's handle.
            debug!(
                provider = %self.id(),
                name = %name,
                key = %key,
                cached = %handle.locator(),
                "Cached handle is for another file, reopening"
            );
            self.lock_aliases().remove(name);
        }

        debug!(provider = %self.id(), name = %name, locator = %locator, "Cache miss, opening");

        let handle = match self.backend.open(locator) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(
                    provider = %self.id(),
                    name = %name,
                    locator = %locator,
                    error = %e,
                    "Failed to open layer, treating as not found"
                );
                return Ok(None);
            }
        };

        let canonical = self
            .backend
            .canonical_name(handle.as_ref(), self.namespace.as_deref());
        self.insert(generation, name, canonical.clone(), Arc::clone(&handle));

        Ok(Some(self.details(canonical, name, handle)))
    }

    /// Rescan the root and replace the index and cache wholesale.
    ///
    /// The scan runs before the exclusive lock is taken; only the swap
    /// happens under it, so concurrent readers see either the old or the
    /// new index in full.
    pub fn reload(&self) -> Result<ReloadSummary, CatalogError> {
        self.snapshot()?;

        let report = self
            .backend
            .scan(&self.config.root, self.namespace.as_deref(), &self.selection);
        let layers = report.index.len();

        let drained = {
            let mut state = self.write_state();
            match &mut *state {
                ProviderState::Disposed => return Err(self.disposed_error()),
                ProviderState::Ready { index, generation } => {
                    *index = Arc::new(report.index);
                    *generation += 1;
                }
            }
            self.lock_aliases().clear();
            self.cache.clear()
        };

        let released = drained.len();
        for (_, handle) in drained {
            self.backend.close(handle);
        }

        info!(
            provider = %self.id(),
            layers,
            released,
            warnings = report.warnings.len(),
            "Provider reloaded"
        );

        Ok(ReloadSummary {
            layers,
            warnings: report.warnings,
        })
    }

    /// Release every cached handle, empty the index, and refuse further use.
    ///
    /// Disposing twice is a no-op.
    pub fn dispose(&self) {
        let drained = {
            let mut state = self.write_state();
            if matches!(*state, ProviderState::Disposed) {
                return;
            }
            *state = ProviderState::Disposed;
            self.lock_aliases().clear();
            self.cache.clear()
        };

        let released = drained.len();
        for (_, handle) in drained {
            self.backend.close(handle);
        }

        info!(provider = %self.id(), released, "Provider disposed");
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn read_state(&self) -> RwLockReadGuard<'_, ProviderState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ProviderState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_aliases(&self) -> MutexGuard<'_, HashMap<Name, Name>> {
        self.aliases.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn disposed_error(&self) -> CatalogError {
        CatalogError::Disposed {
            provider: self.id().to_string(),
        }
    }

    /// Current index and generation, or `Disposed`.
    fn snapshot(&self) -> Result<(Arc<LayerIndex>, u64), CatalogError> {
        match &*self.read_state() {
            ProviderState::Ready { index, generation } => Ok((Arc::clone(index), *generation)),
            ProviderState::Disposed => Err(self.disposed_error()),
        }
    }

    fn cache_key(&self, name: &Name) -> Name {
        self.lock_aliases()
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.clone())
    }

    /// Cache a freshly opened handle unless a reload or dispose happened
    /// since the open started.
    fn insert(&self, generation: u64, requested: &Name, canonical: Name, handle: DatasetHandle) {
        let state = self.read_state();
        let current = match &*state {
            ProviderState::Ready { generation, .. } => Some(*generation),
            ProviderState::Disposed => None,
        };

        if current != Some(generation) {
            debug!(
                provider = %self.id(),
                name = %canonical,
                "Provider changed while opening, not caching handle"
            );
            return;
        }

        if &canonical != requested {
            debug!(
                provider = %self.id(),
                requested = %requested,
                canonical = %canonical,
                "Dataset reports a different name"
            );
            self.lock_aliases().insert(requested.clone(), canonical.clone());
        }

        let displaced = self.cache.put(canonical, Arc::clone(&handle));
        drop(state);

        if let Some((evicted, old)) = displaced {
            if !Arc::ptr_eq(&old, &handle) {
                trace!(provider = %self.id(), name = %evicted, "Releasing displaced handle");
                self.backend.close(old);
            }
        }
    }

    fn details(&self, canonical: Name, requested: &Name, dataset: DatasetHandle) -> LayerDetails {
        let metadata = self
            .config
            .layers
            .get(canonical.local_part())
            .or_else(|| self.config.layers.get(requested.local_part()))
            .map(LayerMetadata::from)
            .unwrap_or_default();

        LayerDetails {
            name: canonical,
            provider: self.id().to_string(),
            kind: self.kind().to_string(),
            dataset,
            metadata,
        }
    }
}

fn validate_root(root: &Path) -> Result<(), CatalogError> {
    let metadata = std::fs::metadata(root).map_err(|e| CatalogError::Configuration {
        root: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    if !metadata.is_dir() {
        return Err(CatalogError::Configuration {
            root: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
