//! Summary of the first image file directory (IFD).
//!
//! Opening a raster dataset only needs its dimensions, sample layout and
//! the optional `DocumentName` tag, all of which live in the first IFD.
//! Pixel data is never touched.

use std::io::{Read, Seek};

use serde::Serialize;

use super::parser::{TiffHeader, BIGTIFF_HEADER_SIZE};
use super::tags::{FieldType, TiffTag};
use crate::error::{OpenError, TiffError};
use crate::io::RangeReader;

/// One raw entry of an IFD.
#[derive(Debug, Clone)]
struct IfdEntry {
    tag: u16,
    field_type: Option<FieldType>,
    count: u64,
    /// Raw value/offset field (4 or 8 bytes)
    value_field: Vec<u8>,
}

impl IfdEntry {
    fn parse(bytes: &[u8], header: &TiffHeader) -> Self {
        let order = header.byte_order;
        let (count, value_start) = if header.is_bigtiff {
            (order.read_u64(&bytes[4..12]), 12)
        } else {
            (order.read_u32(&bytes[4..8]) as u64, 8)
        };

        Self {
            tag: order.read_u16(&bytes[0..2]),
            field_type: FieldType::from_u16(order.read_u16(&bytes[2..4])),
            count,
            value_field: bytes[value_start..value_start + header.value_offset_size()].to_vec(),
        }
    }

    /// Total size of the entry's values in bytes, if the type is known.
    fn value_len(&self) -> Option<u64> {
        self.field_type
            .map(|t| t.size_in_bytes() as u64)
            .and_then(|size| size.checked_mul(self.count))
    }
}

/// Dimensions and identity of a raster's first image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RasterInfo {
    pub width: u64,
    pub height: u64,
    pub bits_per_sample: u16,
    pub samples_per_pixel: u16,
    pub compression: u16,
    pub document_name: Option<String>,
    pub is_bigtiff: bool,
}

impl RasterInfo {
    /// Read the header and first IFD of a TIFF or BigTIFF source.
    pub fn read<R: Read + Seek>(reader: &mut RangeReader<R>) -> Result<Self, OpenError> {
        let size = reader.size();
        let head_len = size.min(BIGTIFF_HEADER_SIZE as u64) as usize;
        let head = reader.read_exact_at(0, head_len)?;
        let header = TiffHeader::parse(&head, size)?;
        let order = header.byte_order;

        // Entry count
        let count_offset = header.first_ifd_offset;
        let count_size = header.ifd_count_size();
        ensure_within(count_offset, count_size as u64, size)?;
        let count_bytes = reader.read_exact_at(count_offset, count_size)?;
        let entry_count = if header.is_bigtiff {
            order.read_u64(&count_bytes)
        } else {
            order.read_u16(&count_bytes) as u64
        };

        // Entries
        let entries_offset = count_offset + count_size as u64;
        let entry_size = header.ifd_entry_size();
        let entries_len = entry_count.saturating_mul(entry_size as u64);
        ensure_within(entries_offset, entries_len, size)?;
        let block = reader.read_exact_at(entries_offset, entries_len as usize)?;

        let mut info = RasterInfo {
            width: 0,
            height: 0,
            bits_per_sample: 1,
            samples_per_pixel: 1,
            compression: 1,
            document_name: None,
            is_bigtiff: header.is_bigtiff,
        };
        let mut width = None;
        let mut height = None;

        for chunk in block.chunks_exact(entry_size) {
            let entry = IfdEntry::parse(chunk, &header);
            let Some(tag) = TiffTag::from_u16(entry.tag) else {
                continue;
            };

            match tag {
                TiffTag::ImageWidth => width = first_unsigned(&entry, &header),
                TiffTag::ImageLength => height = first_unsigned(&entry, &header),
                TiffTag::Compression => {
                    if let Some(v) = first_unsigned(&entry, &header) {
                        info.compression = v as u16;
                    }
                }
                TiffTag::SamplesPerPixel => {
                    if let Some(v) = first_unsigned(&entry, &header) {
                        info.samples_per_pixel = v as u16;
                    }
                }
                TiffTag::BitsPerSample => {
                    let bytes = entry_values(reader, &entry, &header)?;
                    if bytes.len() >= 2 {
                        info.bits_per_sample = order.read_u16(&bytes);
                    }
                }
                TiffTag::DocumentName => {
                    let bytes = entry_values(reader, &entry, &header)?;
                    let text = String::from_utf8_lossy(&bytes);
                    let text = text.trim_end_matches('\0').trim();
                    if !text.is_empty() {
                        info.document_name = Some(text.to_string());
                    }
                }
            }
        }

        info.width = width.ok_or(TiffError::MissingTag("ImageWidth"))?;
        info.height = height.ok_or(TiffError::MissingTag("ImageLength"))?;
        Ok(info)
    }
}

fn ensure_within(offset: u64, len: u64, size: u64) -> Result<(), TiffError> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(TiffError::FileTooSmall {
            required: offset.saturating_add(len),
            actual: size,
        }),
    }
}

/// First value of an inline SHORT/LONG/LONG8 entry.
fn first_unsigned(entry: &IfdEntry, header: &TiffHeader) -> Option<u64> {
    let order = header.byte_order;
    match entry.field_type? {
        FieldType::Short => Some(order.read_u16(&entry.value_field) as u64),
        FieldType::Long => Some(order.read_u32(&entry.value_field) as u64),
        FieldType::Long8 if header.is_bigtiff => Some(order.read_u64(&entry.value_field)),
        _ => None,
    }
}

/// All value bytes of an entry, whether inline or stored at an offset.
fn entry_values<R: Read + Seek>(
    reader: &mut RangeReader<R>,
    entry: &IfdEntry,
    header: &TiffHeader,
) -> Result<Vec<u8>, OpenError> {
    let Some(len) = entry.value_len() else {
        return Ok(Vec::new());
    };

    if len <= header.value_offset_size() as u64 {
        return Ok(entry.value_field[..len as usize].to_vec());
    }

    let offset = header.read_offset(&entry.value_field);
    ensure_within(offset, len, reader.size())?;
    reader.read_exact_at(offset, len as usize)
}
