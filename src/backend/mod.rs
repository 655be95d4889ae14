//! Backend kinds.
//!
//! A backend is the capability set a provider needs from one kind of data:
//! find candidate files, open one into a [`Dataset`] handle, report the
//! name the handle knows itself by, and release it.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Provider                  │
//! │   (index + cache + lifecycle)           │
//! └────────────────────┬────────────────────┘
//!                      │ scan / open / canonical_name / close
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             Backend Trait               │
//! └────────────────────┬────────────────────┘
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │  VectorBackend  │    │   RasterBackend     │
//! │  (.shp)         │    │   (.tif / .tiff)    │
//! └─────────────────┘    └─────────────────────┘
//! ```
//!
//! New kinds are added by implementing [`Backend`] and registering an
//! instance in a [`BackendRegistry`]; nothing else changes.

mod raster;
mod registry;
mod vector;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::OpenError;
use crate::name::{Locator, Name};
use crate::scan::{LayerSelection, ScanReport, SourceScanner, SuffixMask};

pub use raster::{RasterBackend, RasterDataset, RASTER_KIND};
pub use registry::BackendRegistry;
pub use vector::{ShapefileDataset, VectorBackend, VECTOR_KIND};

/// An open, read-only dataset.
///
/// Handles are shared between the provider cache and any number of
/// concurrent readers, so implementations must be safe for concurrent reads.
pub trait Dataset: Send + Sync + fmt::Debug {
    /// Identifier the dataset reports for itself (local part of its name).
    fn identifier(&self) -> &str;

    /// Where the dataset was opened from.
    fn locator(&self) -> &Locator;

    /// Format-specific description handed to protocol workers.
    fn describe(&self) -> serde_json::Value;
}

/// Shared handle to an open dataset.
pub type DatasetHandle = Arc<dyn Dataset>;

/// Capability interface implemented once per backend kind.
pub trait Backend: Send + Sync {
    /// Kind identifier used in catalog configuration (e.g. "vector").
    fn kind(&self) -> &str;

    /// Namespace applied when a source does not configure one.
    fn default_namespace(&self) -> Option<&str>;

    /// File suffixes this backend can open.
    fn mask(&self) -> &SuffixMask;

    /// Build an index for `root` without opening anything.
    fn scan(&self, root: &Path, namespace: Option<&str>, selection: &LayerSelection) -> ScanReport {
        SourceScanner::scan(root, self.mask(), namespace, selection)
    }

    /// Open the dataset at `locator`.
    fn open(&self, locator: &Locator) -> Result<DatasetHandle, OpenError>;

    /// Name the opened dataset is cached under.
    ///
    /// This may differ from the scan-derived name when the dataset carries
    /// its own identity.
    fn canonical_name(&self, handle: &dyn Dataset, namespace: Option<&str>) -> Name {
        Name::new(namespace, handle.identifier())
    }

    /// Release a handle that is leaving the cache.
    ///
    /// The handle may still be referenced by in-flight readers; dropping the
    /// last reference frees it.
    fn close(&self, handle: DatasetHandle) {
        drop(handle);
    }
}

/// Derive the fallback identifier of a file: its stem.
pub(crate) fn file_stem(locator: &Locator) -> String {
    locator
        .path()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
