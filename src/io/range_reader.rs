use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::OpenError;

/// Positional reader over a seekable byte source.
///
/// Format readers only need a handful of small reads at known offsets
/// (headers, directory entries), so this reads exactly what is asked for
/// and never buffers the whole file.
pub struct RangeReader<R> {
    inner: R,
    size: u64,
    identifier: String,
}

impl RangeReader<BufReader<File>> {
    /// Open a local file.
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        let identifier = path.display().to_string();
        let file = File::open(path).map_err(|e| OpenError::io(identifier.as_str(), e))?;
        RangeReader::new(BufReader::new(file), identifier)
    }
}

impl<R: Read + Seek> RangeReader<R> {
    /// Wrap a seekable source; `identifier` is used in error messages.
    pub fn new(mut inner: R, identifier: impl Into<String>) -> Result<Self, OpenError> {
        let identifier = identifier.into();
        let size = inner
            .seek(SeekFrom::End(0))
            .map_err(|e| OpenError::io(identifier.as_str(), e))?;

        Ok(Self {
            inner,
            size,
            identifier,
        })
    }

    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns an error if the range is out of bounds or if the read fails.
    pub fn read_exact_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, OpenError> {
        let end = offset.saturating_add(len as u64);
        if end > self.size {
            return Err(OpenError::io(
                self.identifier.as_str(),
                format!(
                    "range out of bounds: requested {} bytes at offset {}, size is {}",
                    len, offset, self.size
                ),
            ));
        }

        let mut buf = vec![0u8; len];
        self.inner
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.inner.read_exact(&mut buf))
            .map_err(|e| OpenError::io(self.identifier.as_str(), e))?;

        Ok(buf)
    }

    /// Total size of the source in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Identifier of the source, for logging.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// Endian Helper Functions
// =============================================================================
//
// Both supported formats mix byte orders (shapefiles use big-endian and
// little-endian fields in the same header; TIFF declares its order up front).

/// Read a little-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_le(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

/// Read a big-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_be(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Read a little-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a big-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_be(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a little-endian u64 from a byte slice.
#[inline]
pub fn read_u64_le(bytes: &[u8]) -> u64 {
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Read a big-endian u64 from a byte slice.
#[inline]
pub fn read_u64_be(bytes: &[u8]) -> u64 {
    u64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Read a little-endian IEEE 754 double from a byte slice.
#[inline]
pub fn read_f64_le(bytes: &[u8]) -> f64 {
    f64::from_bits(read_u64_le(bytes))
}
