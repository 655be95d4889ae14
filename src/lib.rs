//! # SDI Catalog
//!
//! A named-resource catalog for spatial data servers.
//!
//! Each backing source (a directory of shapefiles, a directory of GeoTIFFs)
//! becomes a [`Provider`] that maps qualified layer names to located datasets,
//! opens them on demand and keeps a bounded number of open handles around.
//! Protocol workers only ever need two operations: list the names, and
//! resolve one name to a [`LayerDetails`].
//!
//! ## Architecture
//!
//! - [`name`] - Qualified names, locators and namespace policy
//! - [`scan`] - Filesystem scan that builds a layer index
//! - [`cache`] - Fixed-capacity LRU of open handles
//! - [`mod@format`] - Shapefile and TIFF header readers
//! - [`backend`] - Per-kind capability interface and built-in kinds
//! - [`provider`] - Index + cache + lifecycle for one source
//! - [`service`] - Per-kind provider services and the aggregating catalog
//! - [`server`] - Axum-based HTTP surface
//! - [`config`] - CLI and catalog file types
//!
//! ## Example
//!
//! ```rust,no_run
//! use sdi_catalog::{BackendRegistry, Catalog, Dataset, Name, ProviderConfig};
//!
//! let catalog = Catalog::new(BackendRegistry::with_defaults());
//! if let Ok(service) = catalog.service("vector") {
//!     service.create_provider(ProviderConfig::new("base", "/data/shapefiles"));
//! }
//!
//! let roads = Name::new(Some("vector"), "roads");
//! if let Some(layer) = catalog.get(&roads) {
//!     println!("{}", layer.dataset().describe());
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod name;
pub mod provider;
pub mod scan;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use backend::{
    Backend, BackendRegistry, Dataset, DatasetHandle, RasterBackend, VectorBackend, RASTER_KIND,
    VECTOR_KIND,
};
pub use cache::{CacheStats, ResourceCache, DEFAULT_CACHE_CAPACITY};
pub use config::{CatalogConfig, LayerConfig, ProviderConfig, SourceConfig};
pub use error::{ApiError, CatalogError, OpenError, ScanWarning};
pub use name::{IndexEntry, Locator, Name, NamespacePolicy, NO_NAMESPACE};
pub use provider::{LayerDetails, LayerMetadata, Provider, ReloadSummary};
pub use scan::{LayerIndex, LayerSelection, ScanReport, SourceScanner, SuffixMask};
pub use server::{create_router, AppState, RouterConfig};
pub use service::{Catalog, ProviderService};
