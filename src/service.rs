//! Provider services and the catalog that aggregates them.
//!
//! A [`ProviderService`] owns the live providers of one backend kind and
//! isolates construction failures: a misconfigured source is logged and
//! skipped, the rest of the catalog still starts.
//!
//! A [`Catalog`] is an explicit registry object holding one service per
//! registered kind. It is built once and passed to whatever needs name
//! resolution; several independent catalogs can coexist.
//!
//! # Example
//!
//! ```ignore
//! use sdi_catalog::{BackendRegistry, Catalog, CatalogConfig};
//!
//! let config = CatalogConfig::load(Path::new("catalog.json"))?;
//! let catalog = Catalog::from_config(&config, BackendRegistry::with_defaults());
//!
//! for name in catalog.keys() {
//!     if let Some(layer) = catalog.get(&name) {
//!         println!("{} -> {}", name, layer.dataset().describe());
//!     }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, error, info, warn};

use crate::backend::{Backend, BackendRegistry};
use crate::config::{CatalogConfig, ProviderConfig, SourceConfig};
use crate::error::CatalogError;
use crate::name::Name;
use crate::provider::{LayerDetails, Provider, ReloadSummary};

// =============================================================================
// ProviderService
// =============================================================================

/// Live providers of a single backend kind, in creation order.
pub struct ProviderService {
    backend: Arc<dyn Backend>,
    providers: RwLock<Vec<Arc<Provider>>>,
}

impl ProviderService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            providers: RwLock::new(Vec::new()),
        }
    }

    pub fn kind(&self) -> &str {
        self.backend.kind()
    }

    /// Construct a provider and start tracking it.
    ///
    /// Construction errors and ids already tracked by this service are
    /// logged and yield `None`; they never propagate to the caller.
    pub fn create_provider(&self, config: ProviderConfig) -> Option<Arc<Provider>> {
        let id = config.id.clone();

        if self.find(&id).is_some() {
            error!(kind = self.kind(), provider = %id, "Duplicate provider id, source skipped");
            return None;
        }

        match Provider::new(config, Arc::clone(&self.backend)) {
            Ok(provider) => {
                let provider = Arc::new(provider);
                let mut providers = self.write_providers();
                // Another caller may have registered the id during the scan.
                if providers.iter().any(|p| p.id() == id) {
                    drop(providers);
                    error!(kind = self.kind(), provider = %id, "Duplicate provider id, source skipped");
                    provider.dispose();
                    return None;
                }
                providers.push(Arc::clone(&provider));
                Some(provider)
            }
            Err(e) => {
                error!(
                    kind = self.kind(),
                    provider = %id,
                    error = %e,
                    "Failed to create provider"
                );
                None
            }
        }
    }

    /// Snapshot of the live providers.
    pub fn providers(&self) -> Vec<Arc<Provider>> {
        self.read_providers().clone()
    }

    /// Live provider with the given id.
    pub fn find(&self, id: &str) -> Option<Arc<Provider>> {
        self.read_providers().iter().find(|p| p.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_providers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_providers().is_empty()
    }

    /// Union of the names indexed by every live provider.
    pub fn keys(&self) -> BTreeSet<Name> {
        self.providers().iter().flat_map(|p| p.keys()).collect()
    }

    /// First live provider, in creation order, that indexes `name`.
    pub fn owner(&self, name: &Name) -> Option<Arc<Provider>> {
        self.providers().into_iter().find(|p| p.contains(name))
    }

    /// Dispose a tracked provider and stop tracking it.
    ///
    /// Membership is by identity: a provider built elsewhere with the same id
    /// is rejected with [`CatalogError::Ownership`].
    pub fn dispose_provider(&self, provider: &Arc<Provider>) -> Result<(), CatalogError> {
        let removed = {
            let mut providers = self.write_providers();
            let position = providers
                .iter()
                .position(|p| Arc::ptr_eq(p, provider))
                .ok_or_else(|| CatalogError::Ownership {
                    provider: provider.id().to_string(),
                })?;
            providers.remove(position)
        };

        removed.dispose();
        Ok(())
    }

    /// Dispose every tracked provider.
    pub fn dispose_all(&self) {
        let drained: Vec<_> = self.write_providers().drain(..).collect();
        for provider in drained {
            provider.dispose();
        }
    }

    fn read_providers(&self) -> RwLockReadGuard<'_, Vec<Arc<Provider>>> {
        self.providers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_providers(&self) -> RwLockWriteGuard<'_, Vec<Arc<Provider>>> {
        self.providers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Name resolution across every provider of every registered kind.
///
/// Services are visited in kind order and providers in creation order, so
/// when two providers index the same name the first one wins.
pub struct Catalog {
    services: BTreeMap<String, ProviderService>,
}

impl Catalog {
    /// Create a catalog with one empty service per registered backend.
    pub fn new(registry: BackendRegistry) -> Self {
        let services = registry
            .iter()
            .map(|backend| {
                (
                    backend.kind().to_string(),
                    ProviderService::new(Arc::clone(backend)),
                )
            })
            .collect();

        Self { services }
    }

    /// Create a catalog and a provider for every configured source.
    ///
    /// Sources that fail to construct are logged and skipped.
    pub fn from_config(config: &CatalogConfig, registry: BackendRegistry) -> Self {
        let catalog = Self::new(registry);

        for source in &config.sources {
            catalog.add_source(source);
        }

        info!(
            sources = config.sources.len(),
            providers = catalog.providers().len(),
            layers = catalog.keys().len(),
            "Catalog ready"
        );

        catalog
    }

    /// Create a provider for `source` in the service of its kind.
    ///
    /// Provider ids are unique across the whole catalog; a source whose id
    /// is already live under any kind is skipped.
    pub fn add_source(&self, source: &SourceConfig) -> Option<Arc<Provider>> {
        if let Some(existing) = self.provider(&source.provider.id) {
            error!(
                provider = %source.provider.id,
                kind = %source.kind,
                existing_kind = existing.kind(),
                "Duplicate provider id, source skipped"
            );
            return None;
        }

        match self.service(&source.kind) {
            Ok(service) => service.create_provider(source.provider.clone()),
            Err(e) => {
                error!(provider = %source.provider.id, error = %e, "Skipping source");
                None
            }
        }
    }

    /// Service for one backend kind.
    pub fn service(&self, kind: &str) -> Result<&ProviderService, CatalogError> {
        self.services
            .get(kind)
            .ok_or_else(|| CatalogError::UnknownKind(kind.to_string()))
    }

    pub fn services(&self) -> impl Iterator<Item = &ProviderService> {
        self.services.values()
    }

    /// Every live provider, kind by kind.
    pub fn providers(&self) -> Vec<Arc<Provider>> {
        self.services
            .values()
            .flat_map(ProviderService::providers)
            .collect()
    }

    /// Live provider with the given id.
    pub fn provider(&self, id: &str) -> Option<Arc<Provider>> {
        self.services.values().find_map(|service| service.find(id))
    }

    /// Every name resolvable through this catalog.
    pub fn keys(&self) -> BTreeSet<Name> {
        self.services
            .values()
            .flat_map(ProviderService::keys)
            .collect()
    }

    /// Resolve a name through the first provider that owns it.
    ///
    /// A provider disposed between the ownership check and the lookup is
    /// treated as not owning the name.
    pub fn get(&self, name: &Name) -> Option<LayerDetails> {
        let provider = self.services.values().find_map(|s| s.owner(name))?;

        match provider.get(name) {
            Ok(details) => details,
            Err(e) => {
                debug!(name = %name, error = %e, "Owner went away during lookup");
                None
            }
        }
    }

    /// Rescan one provider.
    pub fn reload_provider(&self, id: &str) -> Option<Result<ReloadSummary, CatalogError>> {
        self.provider(id).map(|provider| provider.reload())
    }

    /// Rescan every live provider.
    ///
    /// Returns the ids of providers that failed to reload.
    pub fn reload_all(&self) -> Vec<String> {
        self.providers()
            .into_iter()
            .filter_map(|provider| match provider.reload() {
                Ok(_) => None,
                Err(e) => {
                    warn!(provider = %provider.id(), error = %e, "Reload failed");
                    Some(provider.id().to_string())
                }
            })
            .collect()
    }

    /// Dispose one provider and remove it from its service.
    ///
    /// Returns `Ok(false)` when no live provider has that id.
    pub fn dispose_provider(&self, id: &str) -> Result<bool, CatalogError> {
        for service in self.services.values() {
            if let Some(provider) = service.find(id) {
                service.dispose_provider(&provider)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Dispose every provider. Used on shutdown.
    pub fn dispose_all(&self) {
        for service in self.services.values() {
            service.dispose_all();
        }
        info!("Catalog disposed");
    }
}

// =============================================================================
// Tests
// =============================================================================
