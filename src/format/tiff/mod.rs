//! TIFF reader for raster datasets.
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian,
//!   MM = big-endian) in the header. All multi-byte values are read in that order.
//!
//! - **Classic TIFF vs BigTIFF**: classic TIFF uses 32-bit offsets, BigTIFF
//!   64-bit offsets. Both are handled transparently.
//!
//! - **Inline vs offset values**: values that fit in an entry's value field
//!   are stored inline; larger ones live at the offset the field points to.

mod directory;
mod parser;
mod tags;

pub use directory::RasterInfo;
pub use parser::{ByteOrder, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use tags::{FieldType, TiffTag};

#[cfg(test)]
pub(crate) use directory::tests::build_tiff;
