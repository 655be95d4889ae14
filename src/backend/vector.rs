//! Vector backend over ESRI shapefiles.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use super::{file_stem, Backend, Dataset, DatasetHandle};
use crate::error::OpenError;
use crate::format::ShapefileHeader;
use crate::io::RangeReader;
use crate::name::Locator;
use crate::scan::SuffixMask;

/// Kind identifier of the vector backend.
pub const VECTOR_KIND: &str = "vector";

/// An opened shapefile.
#[derive(Debug, Clone)]
pub struct ShapefileDataset {
    identifier: String,
    locator: Locator,
    header: ShapefileHeader,
}

impl ShapefileDataset {
    pub fn header(&self) -> &ShapefileHeader {
        &self.header
    }
}

impl Dataset for ShapefileDataset {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn locator(&self) -> &Locator {
        &self.locator
    }

    fn describe(&self) -> serde_json::Value {
        json!({
            "format": "shapefile",
            "shape_type": self.header.shape_type,
            "bbox": self.header.bbox,
            "file_length": self.header.file_length,
        })
    }
}

/// Backend for directories of `.shp` files.
#[derive(Debug, Clone)]
pub struct VectorBackend {
    default_namespace: Option<String>,
    mask: SuffixMask,
}

impl VectorBackend {
    /// Create a vector backend whose default namespace is `"vector"`.
    pub fn new() -> Self {
        Self::with_default_namespace(VECTOR_KIND)
    }

    pub fn with_default_namespace(namespace: impl Into<String>) -> Self {
        Self {
            default_namespace: Some(namespace.into()),
            mask: SuffixMask::new(["shp"]),
        }
    }
}

impl Default for VectorBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for VectorBackend {
    fn kind(&self) -> &str {
        VECTOR_KIND
    }

    fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    fn mask(&self) -> &SuffixMask {
        &self.mask
    }

    fn open(&self, locator: &Locator) -> Result<DatasetHandle, OpenError> {
        let mut reader = RangeReader::open(locator.path())?;
        let header = ShapefileHeader::read(&mut reader)?;

        debug!(
            locator = %locator,
            shape_type = ?header.shape_type,
            "Opened shapefile"
        );

        Ok(Arc::new(ShapefileDataset {
            identifier: file_stem(locator),
            locator: locator.clone(),
            header,
        }))
    }
}
