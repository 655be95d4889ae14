use std::path::PathBuf;

use thiserror::Error;

use crate::name::Name;

/// Errors raised by the catalog lifecycle.
///
/// Only `Configuration` can prevent a provider from existing; the others are
/// returned by operations on providers and services that already exist.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// The backing root is missing or is not a directory
    #[error("Invalid source root {}: {reason}", root.display())]
    Configuration { root: PathBuf, reason: String },

    /// Operation attempted on a provider that has been disposed
    #[error("Provider '{provider}' has been disposed")]
    Disposed { provider: String },

    /// Provider is not tracked by the service asked to dispose it
    #[error("Provider '{provider}' is not owned by this service")]
    Ownership { provider: String },

    /// No backend is registered for the requested kind
    #[error("Unknown backend kind: {0}")]
    UnknownKind(String),

    /// The catalog configuration file could not be read or parsed
    #[error("Invalid catalog file {}: {reason}", path.display())]
    CatalogFile { path: PathBuf, reason: String },
}

/// Failure to open a located resource.
///
/// Providers convert these into "not found" after logging them.
#[derive(Debug, Clone, Error)]
pub enum OpenError {
    /// The resource could not be read
    #[error("I/O error on {resource}: {reason}")]
    Io { resource: String, reason: String },

    /// Shapefile header is malformed
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] ShapefileError),

    /// TIFF structure is malformed
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),
}

impl OpenError {
    /// Wrap an I/O error together with the resource it happened on.
    pub fn io(resource: impl Into<String>, err: impl std::fmt::Display) -> Self {
        OpenError::Io {
            resource: resource.into(),
            reason: err.to_string(),
        }
    }
}

/// Recoverable problems found while scanning a source root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanWarning {
    /// A directory or entry could not be read and was skipped
    #[error("Skipped unreadable entry {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    /// Two entries derived the same name; the later one replaced the earlier
    #[error("Layer {name} at {} replaces {}", kept.display(), replaced.display())]
    Collision {
        name: Name,
        kept: PathBuf,
        replaced: PathBuf,
    },
}

/// Errors that can occur when reading an ESRI shapefile main header
#[derive(Debug, Clone, Error)]
pub enum ShapefileError {
    /// File is shorter than the fixed 100-byte header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// File code is not 9994
    #[error("Invalid shapefile file code: expected 9994, got {0}")]
    InvalidFileCode(i32),

    /// Version is not 1000
    #[error("Invalid shapefile version: expected 1000, got {0}")]
    InvalidVersion(i32),

    /// Shape type is not one of the defined codes
    #[error("Unknown shape type: {0}")]
    UnknownShapeType(i32),
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain the structure being read
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),
}

/// Errors returned by the HTTP layer
#[derive(Debug, Error)]
pub enum ApiError {
    /// No provider resolves the requested layer name
    #[error("Layer not found: {name}")]
    LayerNotFound { name: String },

    /// The layer name in the request path is malformed
    #[error("{0}")]
    InvalidName(String),

    /// No live provider has the requested id
    #[error("Provider not found: {id}")]
    ProviderNotFound { id: String },

    /// Lifecycle error from the catalog
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A blocking catalog task panicked or was cancelled
    #[error("Internal error: {0}")]
    Internal(String),
}
