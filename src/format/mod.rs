//! Header readers for the dataset formats the built-in backends open.
//!
//! Only what is needed to validate a file and describe it is decoded:
//!
//! - **Shapefile** (`.shp`): main-file header with geometry type and extent
//! - **TIFF / BigTIFF** (`.tif`, `.tiff`): first image directory with
//!   dimensions and the optional `DocumentName` tag

pub mod shapefile;
pub mod tiff;

pub use shapefile::{BoundingBox, ShapeType, ShapefileHeader};
pub use tiff::RasterInfo;
