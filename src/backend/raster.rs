//! Raster backend over TIFF / BigTIFF files.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use super::{file_stem, Backend, Dataset, DatasetHandle};
use crate::error::OpenError;
use crate::format::RasterInfo;
use crate::io::RangeReader;
use crate::name::Locator;
use crate::scan::SuffixMask;

/// Kind identifier of the raster backend.
pub const RASTER_KIND: &str = "raster";

/// An opened raster.
///
/// Its identifier is the TIFF `DocumentName` when the file carries one,
/// otherwise the file stem.
#[derive(Debug, Clone)]
pub struct RasterDataset {
    identifier: String,
    locator: Locator,
    info: RasterInfo,
}

impl RasterDataset {
    pub fn info(&self) -> &RasterInfo {
        &self.info
    }
}

impl Dataset for RasterDataset {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn locator(&self) -> &Locator {
        &self.locator
    }

    fn describe(&self) -> serde_json::Value {
        json!({
            "format": if self.info.is_bigtiff { "bigtiff" } else { "tiff" },
            "width": self.info.width,
            "height": self.info.height,
            "bits_per_sample": self.info.bits_per_sample,
            "samples_per_pixel": self.info.samples_per_pixel,
            "compression": self.info.compression,
        })
    }
}

/// Backend for directories of `.tif` / `.tiff` files.
#[derive(Debug, Clone)]
pub struct RasterBackend {
    default_namespace: Option<String>,
    mask: SuffixMask,
}

impl RasterBackend {
    /// Create a raster backend whose default namespace is `"raster"`.
    pub fn new() -> Self {
        Self::with_default_namespace(RASTER_KIND)
    }

    pub fn with_default_namespace(namespace: impl Into<String>) -> Self {
        Self {
            default_namespace: Some(namespace.into()),
            mask: SuffixMask::new(["tif", "tiff"]),
        }
    }
}

impl Default for RasterBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for RasterBackend {
    fn kind(&self) -> &str {
        RASTER_KIND
    }

    fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    fn mask(&self) -> &SuffixMask {
        &self.mask
    }

    fn open(&self, locator: &Locator) -> Result<DatasetHandle, OpenError> {
        let mut reader = RangeReader::open(locator.path())?;
        let info = RasterInfo::read(&mut reader)?;

        debug!(
            locator = %locator,
            width = info.width,
            height = info.height,
            "Opened raster"
        );

        let identifier = info
            .document_name
            .clone()
            .unwrap_or_else(|| file_stem(locator));

        Ok(Arc::new(RasterDataset {
            identifier,
            locator: locator.clone(),
            info,
        }))
    }
}
