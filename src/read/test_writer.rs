//! Test-only TsFile writer
//!
//! Builds small but structurally complete files so the readers can be
//! exercised against real bytes: header, chunk groups with per-page
//! statistics, version records, and a trailing metadata index tree. The
//! fan-out of the index tree is configurable so tests can force internal
//! levels on both the device and measurement axes.

use crate::config::{MAGIC, VERSION_NUMBER};
use crate::file::datatype::{CompressionType, TsDataType, TsEncoding};
use crate::file::header::{ChunkGroupFooter, ChunkHeader, PageHeader};
use crate::file::marker;
use crate::file::metadata::{
    ChunkMetadata, MetadataIndexEntry, MetadataIndexNode, MetadataIndexNodeType,
    TimeseriesMetadata, TsFileMetadata,
};
use crate::file::statistics::{Statistics, ValueStatistics};
use std::collections::BTreeMap;

/// Double-typed page statistics plus a plain payload for the given values
pub(crate) fn page(start: i64, end: i64, values: &[f64]) -> (Statistics, Vec<u8>) {
    let mut min = f64::MAX;
    let mut max = f64::MIN;
    let mut sum = 0.0;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    let stats = Statistics {
        count: values.len() as u64,
        start_time: start,
        end_time: end,
        values: ValueStatistics::Double {
            min,
            max,
            first: values[0],
            last: values[values.len() - 1],
            sum,
        },
    };
    let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    (stats, payload)
}

pub(crate) struct TestFileWriter {
    buf: Vec<u8>,
    max_degree: usize,
    collapsed: bool,
    pending: Vec<ChunkMetadata>,
    group_start: Option<u64>,
    devices: BTreeMap<String, BTreeMap<String, Vec<ChunkMetadata>>>,
    version_info: Vec<(u64, u64)>,
}

impl TestFileWriter {
    pub fn new(max_degree: usize) -> Self {
        let mut writer = Self {
            buf: Vec::new(),
            max_degree,
            collapsed: false,
            pending: Vec::new(),
            group_start: None,
            devices: BTreeMap::new(),
            version_info: Vec::new(),
        };
        writer.buf.extend_from_slice(&MAGIC);
        writer.buf.extend_from_slice(&VERSION_NUMBER);
        writer
    }

    /// Write a device-less index: the root is typed internal-measurement and
    /// its children name devices directly
    pub fn collapsed(mut self) -> Self {
        self.collapsed = true;
        self
    }

    pub fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn add_chunk(
        &mut self,
        measurement: &str,
        data_type: TsDataType,
        pages: &[(Statistics, Vec<u8>)],
    ) {
        let offset = self.position();
        if self.group_start.is_none() {
            self.group_start = Some(offset);
        }
        self.buf.push(marker::CHUNK_HEADER);

        let mut page_bytes = Vec::new();
        let mut chunk_stats = Statistics::empty(data_type);
        for (stats, payload) in pages {
            let page_header = PageHeader {
                uncompressed_size: payload.len() as u32,
                compressed_size: payload.len() as u32,
                statistics: stats.clone(),
            };
            page_header.serialize_to(&mut page_bytes);
            page_bytes.extend_from_slice(payload);
            chunk_stats.merge(stats).unwrap();
        }

        let header = ChunkHeader {
            measurement_id: measurement.to_string(),
            data_size: page_bytes.len() as u32,
            data_type,
            num_pages: pages.len() as u32,
            encoding: TsEncoding::Plain,
            compression: CompressionType::Uncompressed,
        };
        header.serialize_to(&mut self.buf);
        self.buf.extend_from_slice(&page_bytes);

        self.pending.push(ChunkMetadata::new(
            measurement.to_string(),
            data_type,
            offset,
            chunk_stats,
        ));
    }

    pub fn end_chunk_group(&mut self, device: &str) {
        let group_start = self.group_start.take().unwrap_or_else(|| self.position());
        let footer = ChunkGroupFooter {
            device_id: device.to_string(),
            data_size: self.position() - group_start,
            num_chunks: self.pending.len() as u32,
        };
        self.buf.push(marker::CHUNK_GROUP_FOOTER);
        footer.serialize_to(&mut self.buf);

        let by_measurement = self.devices.entry(device.to_string()).or_default();
        for chunk in self.pending.drain(..) {
            by_measurement
                .entry(chunk.measurement_id.clone())
                .or_default()
                .push(chunk);
        }
    }

    pub fn add_version(&mut self, version: u64) {
        self.buf.push(marker::VERSION);
        self.buf.extend_from_slice(&version.to_le_bytes());
        self.version_info.push((self.position(), version));
    }

    /// Header plus data section as written so far, with no separator or
    /// trailer: an in-progress (crashed) file
    pub fn into_data_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Close the data section and append the metadata index and trailer
    pub fn finish(mut self) -> Vec<u8> {
        self.buf.push(marker::SEPARATOR);
        let meta_offset = self.buf.len() as u64;

        // chunk metadata lists, device-major, measurement order; each
        // device's lists end up contiguous
        let mut device_series: BTreeMap<String, Vec<TimeseriesMetadata>> = BTreeMap::new();
        for (device, measurements) in &self.devices {
            for (measurement, chunks) in measurements {
                let mut list_bytes = Vec::new();
                let mut series_stats = Statistics::empty(chunks[0].data_type);
                for chunk in chunks {
                    chunk.serialize_to(&mut list_bytes);
                    series_stats.merge(&chunk.statistics).unwrap();
                }
                let offset = self.buf.len() as u64;
                self.buf.extend_from_slice(&list_bytes);
                device_series
                    .entry(device.clone())
                    .or_default()
                    .push(TimeseriesMetadata {
                        measurement_id: measurement.clone(),
                        data_type: chunks[0].data_type,
                        chunk_metadata_list_offset: offset,
                        chunk_metadata_list_size: list_bytes.len() as u32,
                        statistics: series_stats,
                    });
            }
        }

        // per device: flat record regions, leaf nodes over them, and an
        // internal node when the leaves overflow one node
        let mut device_roots: Vec<(String, u64)> = Vec::new();
        for (device, series) in &device_series {
            let mut regions: Vec<(String, u64, u64)> = Vec::new(); // (first name, offset, end)
            for group in series.chunks(self.max_degree) {
                let offset = self.buf.len() as u64;
                for meta in group {
                    meta.serialize_to(&mut self.buf);
                }
                regions.push((
                    group[0].measurement_id.clone(),
                    offset,
                    self.buf.len() as u64,
                ));
            }

            let mut leaf_nodes: Vec<(String, u64)> = Vec::new();
            for group in regions.chunks(self.max_degree) {
                let node = MetadataIndexNode {
                    children: group
                        .iter()
                        .map(|(name, offset, _)| MetadataIndexEntry {
                            name: name.clone(),
                            offset: *offset,
                        })
                        .collect(),
                    end_offset: group[group.len() - 1].2,
                    node_type: MetadataIndexNodeType::LeafMeasurement,
                };
                let node_offset = self.buf.len() as u64;
                node.serialize_to(&mut self.buf);
                leaf_nodes.push((group[0].0.clone(), node_offset));
            }

            let root_offset = if leaf_nodes.len() == 1 {
                leaf_nodes[0].1
            } else {
                let leaves_end = self.buf.len() as u64;
                let node = MetadataIndexNode {
                    children: leaf_nodes
                        .iter()
                        .map(|(name, offset)| MetadataIndexEntry {
                            name: name.clone(),
                            offset: *offset,
                        })
                        .collect(),
                    end_offset: leaves_end,
                    node_type: MetadataIndexNodeType::InternalMeasurement,
                };
                let offset = self.buf.len() as u64;
                node.serialize_to(&mut self.buf);
                offset
            };
            device_roots.push((device.clone(), root_offset));
        }
        let device_level_end = self.buf.len() as u64;

        let device_entries = |roots: &[(String, u64)]| {
            roots
                .iter()
                .map(|(name, offset)| MetadataIndexEntry {
                    name: name.clone(),
                    offset: *offset,
                })
                .collect::<Vec<_>>()
        };

        let root = if self.collapsed {
            MetadataIndexNode {
                children: device_entries(&device_roots),
                end_offset: device_level_end,
                node_type: MetadataIndexNodeType::InternalMeasurement,
            }
        } else if device_roots.len() <= self.max_degree {
            MetadataIndexNode {
                children: device_entries(&device_roots),
                end_offset: device_level_end,
                node_type: MetadataIndexNodeType::LeafDevice,
            }
        } else {
            let mut leaf_nodes: Vec<(String, u64)> = Vec::new();
            let groups: Vec<_> = device_roots.chunks(self.max_degree).collect();
            for (i, group) in groups.iter().enumerate() {
                let end = if i + 1 < groups.len() {
                    groups[i + 1][0].1
                } else {
                    device_level_end
                };
                let node = MetadataIndexNode {
                    children: device_entries(group),
                    end_offset: end,
                    node_type: MetadataIndexNodeType::LeafDevice,
                };
                let node_offset = self.buf.len() as u64;
                node.serialize_to(&mut self.buf);
                leaf_nodes.push((group[0].0.clone(), node_offset));
            }
            let leaves_end = self.buf.len() as u64;
            MetadataIndexNode {
                children: device_entries(&leaf_nodes),
                end_offset: leaves_end,
                node_type: MetadataIndexNodeType::InternalDevice,
            }
        };

        let metadata = TsFileMetadata {
            metadata_index: root,
            meta_offset,
            version_info: self.version_info.clone(),
        };
        let mut meta_bytes = Vec::new();
        metadata.serialize_to(&mut meta_bytes);
        self.buf.extend_from_slice(&meta_bytes);
        self.buf
            .extend_from_slice(&(meta_bytes.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(&MAGIC);
        self.buf
    }
}
