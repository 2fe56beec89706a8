//! Metadata records: the index tree, per-series descriptors and file metadata
//!
//! The metadata index tree maps device and measurement names to byte regions.
//! Nodes share one shape (sorted children + end offset) and differ only in a
//! type tag; internal nodes point at deeper nodes, leaf nodes at payload
//! regions (measurement leaves point at flat runs of [`TimeseriesMetadata`]
//! records).

use crate::error::{TsFileError, TsFileResult};
use crate::file::datatype::{CompressionType, TsDataType, TsEncoding};
use crate::file::statistics::Statistics;
use crate::file::{read_string, read_u32, read_u64, read_u8, write_string};
use serde::Serialize;
use std::io::Read;

/// Position of a node within the index tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MetadataIndexNodeType {
    /// Children are deeper device-level nodes
    InternalDevice = 0,
    /// Children name devices; each points at a measurement subtree
    LeafDevice = 1,
    /// Children are deeper measurement-level nodes (or, at the root of a
    /// device-less tree, name devices directly)
    InternalMeasurement = 2,
    /// Children point at flat runs of timeseries metadata records
    LeafMeasurement = 3,
}

impl TryFrom<u8> for MetadataIndexNodeType {
    type Error = TsFileError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MetadataIndexNodeType::InternalDevice),
            1 => Ok(MetadataIndexNodeType::LeafDevice),
            2 => Ok(MetadataIndexNodeType::InternalMeasurement),
            3 => Ok(MetadataIndexNodeType::LeafMeasurement),
            _ => Err(TsFileError::Corruption(format!(
                "unknown index node type: {}",
                value
            ))),
        }
    }
}

/// One child of an index node: a name and the absolute offset where the
/// child's byte region begins. The region ends at the next sibling's offset,
/// or at the parent's `end_offset` for the last child.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataIndexEntry {
    pub name: String,
    pub offset: u64,
}

/// One level of the on-disk metadata index tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataIndexNode {
    /// Children, strictly ordered by name
    pub children: Vec<MetadataIndexEntry>,
    /// End of the last child's byte region
    pub end_offset: u64,
    pub node_type: MetadataIndexNodeType,
}

impl MetadataIndexNode {
    /// Binary search the children for `name`, returning the matching entry
    /// and the end offset of its region.
    ///
    /// With `exact`, only a child named exactly `name` matches. Without it,
    /// the greatest child whose name is ≤ `name` matches (the subtree that
    /// could contain `name`); `None` means `name` precedes every child.
    pub fn child_entry(&self, name: &str, exact: bool) -> Option<(MetadataIndexEntry, u64)> {
        let index = match self
            .children
            .binary_search_by(|entry| entry.name.as_str().cmp(name))
        {
            Ok(i) => i,
            Err(_) if exact => return None,
            Err(0) => return None,
            Err(i) => i - 1,
        };
        Some((self.children[index].clone(), self.child_region_end(index)))
    }

    /// End offset of the `index`-th child's region
    pub fn child_region_end(&self, index: usize) -> u64 {
        if index + 1 < self.children.len() {
            self.children[index + 1].offset
        } else {
            self.end_offset
        }
    }

    pub fn serialize_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.children.len() as u32).to_le_bytes());
        for child in &self.children {
            write_string(buf, &child.name);
            buf.extend_from_slice(&child.offset.to_le_bytes());
        }
        buf.extend_from_slice(&self.end_offset.to_le_bytes());
        buf.push(self.node_type as u8);
    }

    pub fn deserialize_from<R: Read>(reader: &mut R) -> TsFileResult<Self> {
        let child_count = read_u32(reader)?;
        let mut children = Vec::with_capacity(child_count as usize);
        for _ in 0..child_count {
            let name = read_string(reader)?;
            let offset = read_u64(reader)?;
            children.push(MetadataIndexEntry { name, offset });
        }
        if children.is_empty() {
            return Err(TsFileError::Corruption(
                "index node has no children".to_string(),
            ));
        }
        let end_offset = read_u64(reader)?;
        let node_type = MetadataIndexNodeType::try_from(read_u8(reader)?)?;
        Ok(Self {
            children,
            end_offset,
            node_type,
        })
    }
}

/// Descriptor of one measurement under one device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeseriesMetadata {
    pub measurement_id: String,
    pub data_type: TsDataType,
    /// Start of this series' chunk metadata list in the metadata section
    pub chunk_metadata_list_offset: u64,
    /// Byte size of that list
    pub chunk_metadata_list_size: u32,
    /// Summary over all of the series' chunks
    pub statistics: Statistics,
}

impl TimeseriesMetadata {
    pub fn serialize_to(&self, buf: &mut Vec<u8>) {
        write_string(buf, &self.measurement_id);
        buf.push(self.data_type as u8);
        buf.extend_from_slice(&self.chunk_metadata_list_offset.to_le_bytes());
        buf.extend_from_slice(&self.chunk_metadata_list_size.to_le_bytes());
        self.statistics.serialize_to(buf);
    }

    pub fn deserialize_from<R: Read>(reader: &mut R) -> TsFileResult<Self> {
        let measurement_id = read_string(reader)?;
        let data_type = TsDataType::try_from(read_u8(reader)?)?;
        let chunk_metadata_list_offset = read_u64(reader)?;
        let chunk_metadata_list_size = read_u32(reader)?;
        let statistics = Statistics::deserialize_from(reader, data_type)?;
        Ok(Self {
            measurement_id,
            data_type,
            chunk_metadata_list_offset,
            chunk_metadata_list_size,
            statistics,
        })
    }
}

/// A closed time interval of deleted values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub min: i64,
    pub max: i64,
}

impl TimeRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.min <= timestamp && timestamp <= self.max
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.min <= other.max && self.max >= other.min
    }
}

/// Descriptor of one chunk, either deserialized from the index region or
/// synthesized by the recovery scan. Immutable once built, except for the
/// post-hoc version stamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkMetadata {
    pub measurement_id: String,
    pub data_type: TsDataType,
    /// Absolute file offset of the chunk's marker byte
    pub offset_of_chunk_header: u64,
    /// Fold of the chunk's page statistics
    pub statistics: Statistics,
    /// Deleted time intervals, attached by higher layers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_intervals: Option<Vec<TimeRange>>,
    /// Effective write version, stamped from the file's version info
    pub version: u64,
}

impl ChunkMetadata {
    pub fn new(
        measurement_id: String,
        data_type: TsDataType,
        offset_of_chunk_header: u64,
        statistics: Statistics,
    ) -> Self {
        Self {
            measurement_id,
            data_type,
            offset_of_chunk_header,
            statistics,
            delete_intervals: None,
            version: 0,
        }
    }

    pub fn start_time(&self) -> i64 {
        self.statistics.start_time
    }

    pub fn end_time(&self) -> i64 {
        self.statistics.end_time
    }

    /// Version and delete intervals are in-memory state and are not written
    pub fn serialize_to(&self, buf: &mut Vec<u8>) {
        write_string(buf, &self.measurement_id);
        buf.extend_from_slice(&self.offset_of_chunk_header.to_le_bytes());
        buf.push(self.data_type as u8);
        self.statistics.serialize_to(buf);
    }

    pub fn deserialize_from<R: Read>(reader: &mut R) -> TsFileResult<Self> {
        let measurement_id = read_string(reader)?;
        let offset_of_chunk_header = read_u64(reader)?;
        let data_type = TsDataType::try_from(read_u8(reader)?)?;
        let statistics = Statistics::deserialize_from(reader, data_type)?;
        Ok(Self {
            measurement_id,
            data_type,
            offset_of_chunk_header,
            statistics,
            delete_intervals: None,
            version: 0,
        })
    }
}

/// One committed chunk group: a device and its chunks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkGroupMetadata {
    pub device_id: String,
    pub chunk_metadata: Vec<ChunkMetadata>,
}

/// Shape of one measurement as declared by a chunk header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementSchema {
    pub measurement_id: String,
    pub data_type: TsDataType,
    pub encoding: TsEncoding,
    pub compression: CompressionType,
}

impl MeasurementSchema {
    pub fn from_chunk_header(header: &super::header::ChunkHeader) -> Self {
        Self {
            measurement_id: header.measurement_id.clone(),
            data_type: header.data_type,
            encoding: header.encoding,
            compression: header.compression,
        }
    }
}

/// File-level metadata stored in the trailer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TsFileMetadata {
    /// Root of the metadata index tree
    pub metadata_index: MetadataIndexNode,
    /// Start of the metadata section (first byte after the separator marker)
    pub meta_offset: u64,
    /// (file position, version) pairs in file order
    pub version_info: Vec<(u64, u64)>,
}

impl TsFileMetadata {
    pub fn serialize_to(&self, buf: &mut Vec<u8>) {
        self.metadata_index.serialize_to(buf);
        buf.extend_from_slice(&self.meta_offset.to_le_bytes());
        buf.extend_from_slice(&(self.version_info.len() as u32).to_le_bytes());
        for (position, version) in &self.version_info {
            buf.extend_from_slice(&position.to_le_bytes());
            buf.extend_from_slice(&version.to_le_bytes());
        }
    }

    pub fn deserialize_from<R: Read>(reader: &mut R) -> TsFileResult<Self> {
        let metadata_index = MetadataIndexNode::deserialize_from(reader)?;
        let meta_offset = read_u64(reader)?;
        let pair_count = read_u32(reader)?;
        let mut version_info = Vec::with_capacity(pair_count as usize);
        for _ in 0..pair_count {
            let position = read_u64(reader)?;
            let version = read_u64(reader)?;
            version_info.push((position, version));
        }
        Ok(Self {
            metadata_index,
            meta_offset,
            version_info,
        })
    }
}

/// Stamp each chunk with its effective version: the first version record
/// positioned after the chunk's header supersedes it.
pub fn apply_version(chunks: &mut [ChunkMetadata], version_info: &[(u64, u64)]) {
    for chunk in chunks {
        for &(position, version) in version_info {
            if chunk.offset_of_chunk_header < position {
                chunk.version = version;
                break;
            }
        }
    }
}
