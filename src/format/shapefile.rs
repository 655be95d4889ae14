//! ESRI shapefile main-file (`.shp`) header reader.
//!
//! # Header Structure (100 bytes)
//!
//! ```text
//! Bytes 0-3:   File code 9994           (big-endian)
//! Bytes 4-23:  Unused
//! Bytes 24-27: File length in 16-bit words (big-endian)
//! Bytes 28-31: Version 1000             (little-endian)
//! Bytes 32-35: Shape type               (little-endian)
//! Bytes 36-67: Xmin, Ymin, Xmax, Ymax   (little-endian f64)
//! Bytes 68-99: Zmin, Zmax, Mmin, Mmax   (little-endian f64)
//! ```

use std::io::{Read, Seek};

use serde::Serialize;

use crate::error::{OpenError, ShapefileError};
use crate::io::{read_f64_le, read_u32_be, read_u32_le, RangeReader};

/// Size of the fixed main-file header.
pub const SHAPEFILE_HEADER_SIZE: usize = 100;

const FILE_CODE: i32 = 9994;
const VERSION: i32 = 1000;

/// Geometry type shared by every record of a shapefile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeType {
    Null,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
    PointZ,
    PolyLineZ,
    PolygonZ,
    MultiPointZ,
    PointM,
    PolyLineM,
    PolygonM,
    MultiPointM,
    MultiPatch,
}

impl ShapeType {
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => ShapeType::Null,
            1 => ShapeType::Point,
            3 => ShapeType::PolyLine,
            5 => ShapeType::Polygon,
            8 => ShapeType::MultiPoint,
            11 => ShapeType::PointZ,
            13 => ShapeType::PolyLineZ,
            15 => ShapeType::PolygonZ,
            18 => ShapeType::MultiPointZ,
            21 => ShapeType::PointM,
            23 => ShapeType::PolyLineM,
            25 => ShapeType::PolygonM,
            28 => ShapeType::MultiPointM,
            31 => ShapeType::MultiPatch,
            _ => return None,
        })
    }
}

/// 2D bounding box in the dataset's coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// Parsed main-file header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapefileHeader {
    pub shape_type: ShapeType,
    /// File length in bytes, as declared by the header
    pub file_length: u64,
    pub bbox: BoundingBox,
}

impl ShapefileHeader {
    /// Parse the 100-byte header.
    pub fn parse(bytes: &[u8]) -> Result<Self, ShapefileError> {
        if bytes.len() < SHAPEFILE_HEADER_SIZE {
            return Err(ShapefileError::FileTooSmall {
                required: SHAPEFILE_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        let file_code = read_u32_be(&bytes[0..4]) as i32;
        if file_code != FILE_CODE {
            return Err(ShapefileError::InvalidFileCode(file_code));
        }

        let version = read_u32_le(&bytes[28..32]) as i32;
        if version != VERSION {
            return Err(ShapefileError::InvalidVersion(version));
        }

        let code = read_u32_le(&bytes[32..36]) as i32;
        let shape_type =
            ShapeType::from_code(code).ok_or(ShapefileError::UnknownShapeType(code))?;

        Ok(ShapefileHeader {
            shape_type,
            file_length: read_u32_be(&bytes[24..28]) as u64 * 2,
            bbox: BoundingBox {
                min_x: read_f64_le(&bytes[36..44]),
                min_y: read_f64_le(&bytes[44..52]),
                max_x: read_f64_le(&bytes[52..60]),
                max_y: read_f64_le(&bytes[60..68]),
            },
        })
    }

    /// Read and parse the header from the start of a source.
    pub fn read<R: Read + Seek>(reader: &mut RangeReader<R>) -> Result<Self, OpenError> {
        if reader.size() < SHAPEFILE_HEADER_SIZE as u64 {
            return Err(ShapefileError::FileTooSmall {
                required: SHAPEFILE_HEADER_SIZE as u64,
                actual: reader.size(),
            }
            .into());
        }

        let bytes = reader.read_exact_at(0, SHAPEFILE_HEADER_SIZE)?;
        Ok(Self::parse(&bytes)?)
    }
}
