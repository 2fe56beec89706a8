//! Chunk, page and chunk-group structural records
//!
//! These are the marker-prefixed records of the data section. Each decoder
//! starts right after the record's marker byte and consumes exactly the
//! record's own bytes.

use crate::error::TsFileResult;
use crate::file::datatype::{CompressionType, TsDataType, TsEncoding};
use crate::file::statistics::Statistics;
use crate::file::{read_string, read_u32, read_u64, read_u8, string_len, write_string};
use serde::Serialize;
use std::io::Read;

/// Header of one chunk: a compressed run of values for one measurement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkHeader {
    /// Measurement this chunk belongs to
    pub measurement_id: String,
    /// Total bytes of the chunk's page headers + page payloads
    pub data_size: u32,
    /// Logical type of the values
    pub data_type: TsDataType,
    /// Number of pages in the chunk
    pub num_pages: u32,
    /// Value encoding inside the page payloads
    pub encoding: TsEncoding,
    /// Compression applied to the page payloads
    pub compression: CompressionType,
}

impl ChunkHeader {
    /// Serialized byte length of this header, excluding the marker byte
    pub fn serialized_size(&self) -> usize {
        string_len(&self.measurement_id) + 4 + 1 + 4 + 1 + 1
    }

    pub fn serialize_to(&self, buf: &mut Vec<u8>) {
        write_string(buf, &self.measurement_id);
        buf.extend_from_slice(&self.data_size.to_le_bytes());
        buf.push(self.data_type as u8);
        buf.extend_from_slice(&self.num_pages.to_le_bytes());
        buf.push(self.encoding as u8);
        buf.push(self.compression as u8);
    }

    pub fn deserialize_from<R: Read>(reader: &mut R) -> TsFileResult<Self> {
        let measurement_id = read_string(reader)?;
        let data_size = read_u32(reader)?;
        let data_type = TsDataType::try_from(read_u8(reader)?)?;
        let num_pages = read_u32(reader)?;
        let encoding = TsEncoding::try_from(read_u8(reader)?)?;
        let compression = CompressionType::try_from(read_u8(reader)?)?;
        Ok(Self {
            measurement_id,
            data_size,
            data_type,
            num_pages,
            encoding,
            compression,
        })
    }
}

/// Header of one page within a chunk.
/// The payload (`compressed_size` bytes) follows immediately; this crate
/// never decodes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageHeader {
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    /// Summary of the page's values
    pub statistics: Statistics,
}

impl PageHeader {
    pub fn serialize_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        buf.extend_from_slice(&self.compressed_size.to_le_bytes());
        self.statistics.serialize_to(buf);
    }

    /// The page's statistics are typed by the enclosing chunk's data type
    pub fn deserialize_from<R: Read>(
        reader: &mut R,
        data_type: TsDataType,
    ) -> TsFileResult<Self> {
        let uncompressed_size = read_u32(reader)?;
        let compressed_size = read_u32(reader)?;
        let statistics = Statistics::deserialize_from(reader, data_type)?;
        Ok(Self {
            uncompressed_size,
            compressed_size,
            statistics,
        })
    }
}

/// Footer closing one device's contiguous run of chunks.
/// A chunk group is atomic: it only exists once its footer is on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkGroupFooter {
    /// Device whose chunks the group holds
    pub device_id: String,
    /// Bytes of the group's chunk records
    pub data_size: u64,
    /// Number of chunks in the group
    pub num_chunks: u32,
}

impl ChunkGroupFooter {
    pub fn serialize_to(&self, buf: &mut Vec<u8>) {
        write_string(buf, &self.device_id);
        buf.extend_from_slice(&self.data_size.to_le_bytes());
        buf.extend_from_slice(&self.num_chunks.to_le_bytes());
    }

    pub fn deserialize_from<R: Read>(reader: &mut R) -> TsFileResult<Self> {
        let device_id = read_string(reader)?;
        let data_size = read_u64(reader)?;
        let num_chunks = read_u32(reader)?;
        Ok(Self {
            device_id,
            data_size,
            num_chunks,
        })
    }
}
