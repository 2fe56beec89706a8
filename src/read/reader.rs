//! TsFile reader: metadata-index descent and the lookup surface
//!
//! A reader owns one cursor over one file and caches the trailing file
//! metadata after the first load. Lookups resolve names through the metadata
//! index tree: nearest-preceding binary search steers the descent at internal
//! levels, exact search answers at the final level. A missing device or
//! measurement is a `None`/empty result; malformed offsets and truncated
//! records are errors.

use crate::config::{HEADER_LEN, MAGIC, MIN_COMPLETE_LEN, VERSION_NUMBER};
use crate::error::{TsFileError, TsFileResult};
use crate::file::header::ChunkHeader;
use crate::file::marker;
use crate::file::metadata::{
    apply_version, ChunkMetadata, MetadataIndexEntry, MetadataIndexNode, MetadataIndexNodeType,
    TimeseriesMetadata, TsFileMetadata,
};
use crate::read::chunk::Chunk;
use crate::read::input::TsFileInput;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};

pub struct TsFileReader {
    pub(crate) path: PathBuf,
    pub(crate) input: TsFileInput,
    /// (offset, size) of the trailing file-metadata blob, once located
    pub(crate) metadata_location: Option<(u64, u32)>,
    /// Cached trailing metadata, loaded on first use
    pub(crate) file_metadata: Option<TsFileMetadata>,
    /// Chunks counted by the last recovery scan (committed groups only)
    pub(crate) total_chunk_num: u64,
}

impl TsFileReader {
    /// Open a reader over the given file. The trailer is not touched until
    /// a lookup needs it, so incomplete files can be opened for self-check.
    pub fn open(path: impl AsRef<Path>) -> TsFileResult<Self> {
        let path = path.as_ref().to_path_buf();
        let input = TsFileInput::open(&path)?;
        Ok(Self {
            path,
            input,
            metadata_location: None,
            file_metadata: None,
            total_chunk_num: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_size(&self) -> u64 {
        self.input.size()
    }

    /// Chunks seen by the last recovery scan, committed groups only
    pub fn total_chunk_num(&self) -> u64 {
        self.total_chunk_num
    }

    pub fn read_head_magic(&mut self) -> TsFileResult<[u8; 6]> {
        let buf = self.input.read_at(0, MAGIC.len())?;
        let mut magic = [0u8; 6];
        magic.copy_from_slice(&buf);
        Ok(magic)
    }

    pub fn read_tail_magic(&mut self) -> TsFileResult<[u8; 6]> {
        let buf = self
            .input
            .read_at(self.input.size() - MAGIC.len() as u64, MAGIC.len())?;
        let mut magic = [0u8; 6];
        magic.copy_from_slice(&buf);
        Ok(magic)
    }

    pub fn read_version_number(&mut self) -> TsFileResult<[u8; 6]> {
        let buf = self
            .input
            .read_at(MAGIC.len() as u64, VERSION_NUMBER.len())?;
        let mut version = [0u8; 6];
        version.copy_from_slice(&buf);
        Ok(version)
    }

    /// A file is complete when it is long enough to hold both magics and the
    /// tail magic repeats the head magic.
    pub fn is_complete(&mut self) -> TsFileResult<bool> {
        if self.input.size() < MIN_COMPLETE_LEN {
            return Ok(false);
        }
        Ok(self.read_tail_magic()? == self.read_head_magic()?)
    }

    /// Locate the trailing file-metadata blob from the fixed-size tail
    pub(crate) fn load_metadata_location(&mut self) -> TsFileResult<(u64, u32)> {
        if let Some(location) = self.metadata_location {
            return Ok(location);
        }
        let size = self.input.size();
        if size < MIN_COMPLETE_LEN + 4 {
            return Err(TsFileError::Incompatible(format!(
                "file too short ({} bytes) to hold trailing metadata",
                size
            )));
        }
        let size_pos = size - MAGIC.len() as u64 - 4;
        let buf = self.input.read_at(size_pos, 4)?;
        let metadata_size = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let metadata_pos = size_pos.checked_sub(metadata_size as u64).filter(|&p| p >= HEADER_LEN);
        let metadata_pos = metadata_pos.ok_or_else(|| {
            TsFileError::Corruption(format!(
                "trailing metadata size {} reaches outside the file",
                metadata_size
            ))
        })?;
        self.metadata_location = Some((metadata_pos, metadata_size));
        Ok((metadata_pos, metadata_size))
    }

    fn ensure_file_metadata(&mut self) -> TsFileResult<&TsFileMetadata> {
        if self.file_metadata.is_none() {
            let (pos, size) = self.load_metadata_location()?;
            let buf = self.input.read_at(pos, size as usize)?;
            let metadata = TsFileMetadata::deserialize_from(&mut buf.as_slice())?;
            self.file_metadata = Some(metadata);
        }
        self.file_metadata
            .as_ref()
            .ok_or_else(|| TsFileError::Corruption("file metadata unavailable".to_string()))
    }

    /// File-level metadata, cached after the first call
    pub fn read_file_metadata(&mut self) -> TsFileResult<TsFileMetadata> {
        Ok(self.ensure_file_metadata()?.clone())
    }

    fn metadata_index(&mut self) -> TsFileResult<MetadataIndexNode> {
        Ok(self.ensure_file_metadata()?.metadata_index.clone())
    }

    fn version_info(&mut self) -> TsFileResult<Vec<(u64, u64)>> {
        Ok(self.ensure_file_metadata()?.version_info.clone())
    }

    /// Read the bounded region `[offset, end)` named by an index entry
    fn read_region(&mut self, offset: u64, end: u64) -> TsFileResult<Vec<u8>> {
        if offset >= end {
            return Err(TsFileError::Corruption(format!(
                "index entry region [{}, {}) is empty or inverted",
                offset, end
            )));
        }
        self.input.read_at(offset, (end - offset) as usize)
    }

    /// Descend the index tree towards `name`.
    ///
    /// While the node's type equals `target` (an internal level), the child
    /// whose name range covers `name` is located by nearest-preceding search
    /// and its region deserialized as the next node. Once the node type
    /// differs, a single search over its children answers: exact at the
    /// final resolution step, nearest-preceding while steering further
    /// descent (trees may collapse levels, so the base case can be reached
    /// at any depth).
    fn get_metadata_and_end_offset(
        &mut self,
        node: &MetadataIndexNode,
        name: &str,
        target: MetadataIndexNodeType,
        exact: bool,
    ) -> TsFileResult<Option<(MetadataIndexEntry, u64)>> {
        if node.node_type != target {
            return Ok(node.child_entry(name, exact));
        }
        let Some((entry, end)) = node.child_entry(name, false) else {
            return Ok(None);
        };
        let buf = self.read_region(entry.offset, end)?;
        let child = MetadataIndexNode::deserialize_from(&mut buf.as_slice())?;
        // exact applies to the base-case search, however deep it sits
        self.get_metadata_and_end_offset(&child, name, target, exact)
    }

    fn parse_timeseries_list(buf: &[u8]) -> TsFileResult<Vec<TimeseriesMetadata>> {
        let mut slice = buf;
        let mut list = Vec::new();
        while !slice.is_empty() {
            list.push(TimeseriesMetadata::deserialize_from(&mut slice)?);
        }
        Ok(list)
    }

    /// Look up one series' descriptor. `None` if the device or measurement
    /// is absent from a well-formed index.
    pub fn read_timeseries_metadata(
        &mut self,
        device: &str,
        measurement: &str,
    ) -> TsFileResult<Option<TimeseriesMetadata>> {
        let root = self.metadata_index()?;
        let Some((entry, end)) = self.get_metadata_and_end_offset(
            &root,
            device,
            MetadataIndexNodeType::InternalDevice,
            true,
        )?
        else {
            return Ok(None);
        };
        let mut buf = self.read_region(entry.offset, end)?;
        if root.node_type != MetadataIndexNodeType::LeafMeasurement {
            let node = MetadataIndexNode::deserialize_from(&mut buf.as_slice())?;
            let Some((entry, end)) = self.get_metadata_and_end_offset(
                &node,
                measurement,
                MetadataIndexNodeType::InternalMeasurement,
                false,
            )?
            else {
                return Ok(None);
            };
            buf = self.read_region(entry.offset, end)?;
        }
        let list = Self::parse_timeseries_list(&buf)?;
        let found = list
            .binary_search_by(|m| m.measurement_id.as_str().cmp(measurement))
            .ok();
        Ok(found.map(|i| list[i].clone()))
    }

    /// Look up several series of one device in one pass.
    ///
    /// Measurements are resolved lazily: each physical leaf buffer is read
    /// once and answers every still-unresolved name it holds, and the walk
    /// stops as soon as all names are found. A name whose subtree cannot be
    /// resolved is skipped; results found for the other names are kept.
    pub fn read_timeseries_metadata_batch(
        &mut self,
        device: &str,
        measurements: &[String],
    ) -> TsFileResult<Vec<TimeseriesMetadata>> {
        let root = self.metadata_index()?;
        let Some((device_entry, device_end)) = self.get_metadata_and_end_offset(
            &root,
            device,
            MetadataIndexNodeType::InternalDevice,
            false,
        )?
        else {
            return Ok(Vec::new());
        };

        let requested: HashSet<&str> = measurements.iter().map(|m| m.as_str()).collect();
        let mut found: HashSet<String> = HashSet::new();
        let mut results = Vec::new();

        for i in 0..measurements.len() {
            let measurement = &measurements[i];
            if found.contains(measurement) {
                continue;
            }
            let device_buf = self.read_region(device_entry.offset, device_end)?;
            let leaf_buf = if root.node_type != MetadataIndexNodeType::LeafMeasurement {
                let node = MetadataIndexNode::deserialize_from(&mut device_buf.as_slice())?;
                match self.get_metadata_and_end_offset(
                    &node,
                    measurement,
                    MetadataIndexNodeType::InternalMeasurement,
                    false,
                )? {
                    Some((entry, end)) => self.read_region(entry.offset, end)?,
                    None => {
                        tracing::debug!(measurement = %measurement, "no index subtree covers it");
                        continue;
                    }
                }
            } else {
                device_buf
            };
            let list = Self::parse_timeseries_list(&leaf_buf)?;
            for current in &measurements[i..] {
                if found.contains(current) {
                    continue;
                }
                if let Ok(k) = list.binary_search_by(|m| m.measurement_id.as_str().cmp(current)) {
                    results.push(list[k].clone());
                    found.insert(current.clone());
                }
                if found.len() == requested.len() {
                    return Ok(results);
                }
            }
        }
        Ok(results)
    }

    /// All device names in the file
    pub fn get_all_devices(&mut self) -> TsFileResult<Vec<String>> {
        let root = self.metadata_index()?;
        self.collect_devices(&root)
    }

    fn collect_devices(&mut self, node: &MetadataIndexNode) -> TsFileResult<Vec<String>> {
        match node.node_type {
            // a device leaf names devices, and so does a measurement-typed
            // node with no device level above it
            MetadataIndexNodeType::LeafDevice | MetadataIndexNodeType::InternalMeasurement => {
                Ok(node.children.iter().map(|e| e.name.clone()).collect())
            }
            MetadataIndexNodeType::InternalDevice => {
                let mut devices = Vec::new();
                for i in 0..node.children.len() {
                    let end = node.child_region_end(i);
                    let buf = self.read_region(node.children[i].offset, end)?;
                    let child = MetadataIndexNode::deserialize_from(&mut buf.as_slice())?;
                    devices.extend(self.collect_devices(&child)?);
                }
                Ok(devices)
            }
            MetadataIndexNodeType::LeafMeasurement => Err(TsFileError::Corruption(
                "device listing descended into a measurement leaf".to_string(),
            )),
        }
    }

    /// Every series in the file, grouped by device
    pub fn get_all_timeseries_metadata(
        &mut self,
    ) -> TsFileResult<HashMap<String, Vec<TimeseriesMetadata>>> {
        let root = self.metadata_index()?;
        let mut map = HashMap::new();
        for i in 0..root.children.len() {
            let end = root.child_region_end(i);
            let entry = root.children[i].clone();
            let buf = self.read_region(entry.offset, end)?;
            self.collect_timeseries(&entry, buf, root.node_type, None, &mut map)?;
        }
        Ok(map)
    }

    /// Walk a subtree, tracking which device the leaves below belong to.
    /// `parent_type` is the type of the node whose child `entry` is.
    fn collect_timeseries(
        &mut self,
        entry: &MetadataIndexEntry,
        buf: Vec<u8>,
        parent_type: MetadataIndexNodeType,
        device: Option<String>,
        out: &mut HashMap<String, Vec<TimeseriesMetadata>>,
    ) -> TsFileResult<()> {
        if parent_type == MetadataIndexNodeType::LeafMeasurement {
            let device = device.ok_or_else(|| {
                TsFileError::Corruption("timeseries records reached without a device".to_string())
            })?;
            let list = Self::parse_timeseries_list(&buf)?;
            out.entry(device).or_default().extend(list);
            return Ok(());
        }

        // entries under a device leaf name devices; so do the children of a
        // measurement-typed root that has no device level above it
        let device = if parent_type == MetadataIndexNodeType::LeafDevice
            || (parent_type == MetadataIndexNodeType::InternalMeasurement && device.is_none())
        {
            Some(entry.name.clone())
        } else {
            device
        };

        let node = MetadataIndexNode::deserialize_from(&mut buf.as_slice())?;
        for i in 0..node.children.len() {
            let end = node.child_region_end(i);
            let child = node.children[i].clone();
            let child_buf = self.read_region(child.offset, end)?;
            self.collect_timeseries(&child, child_buf, node.node_type, device.clone(), out)?;
        }
        Ok(())
    }

    fn get_device_timeseries_metadata(
        &mut self,
        device: &str,
    ) -> TsFileResult<Vec<TimeseriesMetadata>> {
        let root = self.metadata_index()?;
        let Some((entry, end)) = self.get_metadata_and_end_offset(
            &root,
            device,
            MetadataIndexNodeType::InternalDevice,
            true,
        )?
        else {
            return Ok(Vec::new());
        };
        let buf = self.read_region(entry.offset, end)?;
        let mut map = HashMap::new();
        self.collect_timeseries(
            &entry,
            buf,
            MetadataIndexNodeType::LeafDevice,
            None,
            &mut map,
        )?;
        let mut list = map.remove(device).unwrap_or_default();
        list.sort_by(|a, b| a.measurement_id.cmp(&b.measurement_id));
        Ok(list)
    }

    /// All chunk descriptors of one device, keyed by measurement.
    /// Empty map if the device is absent.
    pub fn read_chunk_metadata_in_device(
        &mut self,
        device: &str,
    ) -> TsFileResult<HashMap<String, Vec<ChunkMetadata>>> {
        let series = self.get_device_timeseries_metadata(device)?;
        if series.is_empty() {
            return Ok(HashMap::new());
        }

        // a device's chunk metadata lists are contiguous; read them in one go
        let start = series[0].chunk_metadata_list_offset;
        let total: u64 = series
            .iter()
            .map(|m| m.chunk_metadata_list_size as u64)
            .sum();
        let buf = self.input.read_at(start, total as usize)?;

        let mut by_measurement: HashMap<String, Vec<ChunkMetadata>> = HashMap::new();
        let mut slice = buf.as_slice();
        while !slice.is_empty() {
            let chunk = ChunkMetadata::deserialize_from(&mut slice)?;
            by_measurement
                .entry(chunk.measurement_id.clone())
                .or_default()
                .push(chunk);
        }

        let version_info = self.version_info()?;
        for list in by_measurement.values_mut() {
            apply_version(list, &version_info);
        }
        Ok(by_measurement)
    }

    /// Chunk descriptors of one series, version-stamped
    pub fn read_chunk_metadata_list(
        &mut self,
        series: &TimeseriesMetadata,
    ) -> TsFileResult<Vec<ChunkMetadata>> {
        let version_info = self.version_info()?;
        let buf = self.input.read_at(
            series.chunk_metadata_list_offset,
            series.chunk_metadata_list_size as usize,
        )?;
        let mut slice = buf.as_slice();
        let mut list = Vec::new();
        while !slice.is_empty() {
            list.push(ChunkMetadata::deserialize_from(&mut slice)?);
        }
        apply_version(&mut list, &version_info);
        Ok(list)
    }

    /// Lift one chunk off disk: header plus raw page bytes
    pub fn read_chunk(&mut self, metadata: &ChunkMetadata) -> TsFileResult<Chunk> {
        self.input.seek(metadata.offset_of_chunk_header)?;
        let m = crate::file::read_u8(&mut self.input)?;
        if m != marker::CHUNK_HEADER {
            return Err(TsFileError::Corruption(format!(
                "expected chunk header marker at offset {}, found {:#04x}",
                metadata.offset_of_chunk_header, m
            )));
        }
        let header = ChunkHeader::deserialize_from(&mut self.input)?;
        let mut data = vec![0u8; header.data_size as usize];
        self.input.read_exact(&mut data)?;
        Ok(Chunk {
            header,
            data,
            statistics: metadata.statistics.clone(),
            delete_intervals: metadata.delete_intervals.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::datatype::TsDataType;
    use crate::read::test_writer::{page, TestFileWriter};

    /// Two devices, several measurements, small fan-out so the tree has
    /// internal levels on both the device and measurement axes.
    fn two_device_file() -> Vec<u8> {
        let mut writer = TestFileWriter::new(2);
        writer.add_chunk(
            "s1",
            TsDataType::Double,
            &[page(0, 99, &[1.0, 2.0]), page(100, 199, &[3.0])],
        );
        writer.add_chunk("s2", TsDataType::Double, &[page(0, 99, &[10.0])]);
        writer.add_chunk("s3", TsDataType::Double, &[page(0, 99, &[20.0])]);
        writer.end_chunk_group("root.sg1.d1");
        writer.add_version(4);
        writer.add_chunk("s1", TsDataType::Double, &[page(200, 299, &[4.0])]);
        writer.add_chunk("s9", TsDataType::Double, &[page(200, 299, &[9.0])]);
        writer.end_chunk_group("root.sg1.d2");
        writer.add_version(7);
        writer.finish()
    }

    fn open(bytes: Vec<u8>) -> (tempfile::TempDir, TsFileReader) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.tsfile");
        std::fs::write(&path, bytes).unwrap();
        (dir, TsFileReader::open(&path).unwrap())
    }

    #[test]
    fn test_head_magic_and_completeness() {
        let (_dir, mut reader) = open(two_device_file());
        assert_eq!(reader.read_head_magic().unwrap(), MAGIC);
        assert_eq!(reader.read_version_number().unwrap(), VERSION_NUMBER);
        assert!(reader.is_complete().unwrap());
    }

    #[test]
    fn test_file_metadata_is_cached() {
        let (_dir, mut reader) = open(two_device_file());
        let first = reader.read_file_metadata().unwrap();
        let second = reader.read_file_metadata().unwrap();
        assert_eq!(first, second);
        assert!(reader.file_metadata.is_some());
    }

    #[test]
    fn test_get_all_devices() {
        let (_dir, mut reader) = open(two_device_file());
        let mut devices = reader.get_all_devices().unwrap();
        devices.sort();
        assert_eq!(devices, vec!["root.sg1.d1", "root.sg1.d2"]);
    }

    #[test]
    fn test_read_timeseries_metadata_exact() {
        let (_dir, mut reader) = open(two_device_file());

        let meta = reader
            .read_timeseries_metadata("root.sg1.d1", "s2")
            .unwrap()
            .unwrap();
        assert_eq!(meta.measurement_id, "s2");
        assert_eq!(meta.data_type, TsDataType::Double);
        assert_eq!(meta.statistics.count, 1);

        // absent measurement and absent device are not errors
        assert!(reader
            .read_timeseries_metadata("root.sg1.d1", "nope")
            .unwrap()
            .is_none());
        assert!(reader
            .read_timeseries_metadata("root.sg9.d9", "s1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_batch_lookup_preserves_partial_results() {
        let (_dir, mut reader) = open(two_device_file());

        let wanted = vec![
            "s1".to_string(),
            "missing".to_string(),
            "s3".to_string(),
        ];
        let found = reader
            .read_timeseries_metadata_batch("root.sg1.d1", &wanted)
            .unwrap();
        let mut names: Vec<_> = found.iter().map(|m| m.measurement_id.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["s1", "s3"]);
    }

    #[test]
    fn test_batch_lookup_short_circuits_on_all_found() {
        let (_dir, mut reader) = open(two_device_file());
        let wanted = vec!["s1".to_string(), "s2".to_string(), "s3".to_string()];
        let found = reader
            .read_timeseries_metadata_batch("root.sg1.d1", &wanted)
            .unwrap();
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_get_all_timeseries_metadata() {
        let (_dir, mut reader) = open(two_device_file());
        let all = reader.get_all_timeseries_metadata().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["root.sg1.d1"].len(), 3);
        assert_eq!(all["root.sg1.d2"].len(), 2);
    }

    #[test]
    fn test_read_chunk_metadata_in_device_applies_versions() {
        let (_dir, mut reader) = open(two_device_file());

        let d1 = reader.read_chunk_metadata_in_device("root.sg1.d1").unwrap();
        assert_eq!(d1.len(), 3);
        // d1's chunks precede the first version record (version 4)
        for list in d1.values() {
            for chunk in list {
                assert_eq!(chunk.version, 4);
            }
        }

        let d2 = reader.read_chunk_metadata_in_device("root.sg1.d2").unwrap();
        for list in d2.values() {
            for chunk in list {
                assert_eq!(chunk.version, 7);
            }
        }

        assert!(reader
            .read_chunk_metadata_in_device("root.sg9.d9")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_read_chunk_roundtrips_payload() {
        let (_dir, mut reader) = open(two_device_file());

        let meta = reader
            .read_timeseries_metadata("root.sg1.d1", "s1")
            .unwrap()
            .unwrap();
        let chunks = reader.read_chunk_metadata_list(&meta).unwrap();
        assert_eq!(chunks.len(), 1);

        let chunk = reader.read_chunk(&chunks[0]).unwrap();
        assert_eq!(chunk.header.measurement_id, "s1");
        assert_eq!(chunk.data.len(), chunk.header.data_size as usize);
        assert_eq!(chunk.statistics, chunks[0].statistics);
    }

    #[test]
    fn test_deep_tree_with_internal_levels() {
        // fan-out of one forces internal nodes on both axes
        let mut writer = TestFileWriter::new(1);
        for device in ["root.sg1.d1", "root.sg1.d2", "root.sg1.d3"] {
            writer.add_chunk("s1", TsDataType::Double, &[page(0, 99, &[1.0])]);
            writer.add_chunk("s2", TsDataType::Double, &[page(0, 99, &[2.0])]);
            writer.add_chunk("s3", TsDataType::Double, &[page(0, 99, &[3.0])]);
            writer.end_chunk_group(device);
        }
        let (_dir, mut reader) = open(writer.finish());

        let mut devices = reader.get_all_devices().unwrap();
        devices.sort();
        assert_eq!(devices, vec!["root.sg1.d1", "root.sg1.d2", "root.sg1.d3"]);

        for device in devices {
            for measurement in ["s1", "s2", "s3"] {
                let meta = reader
                    .read_timeseries_metadata(&device, measurement)
                    .unwrap()
                    .unwrap();
                assert_eq!(meta.measurement_id, measurement);
            }
            assert!(reader
                .read_timeseries_metadata(&device, "s0")
                .unwrap()
                .is_none());
        }

        let all = reader.get_all_timeseries_metadata().unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.values().all(|series| series.len() == 3));

        // a missing device stays missing even through internal levels
        assert!(reader
            .read_timeseries_metadata("root.sg1.d0", "s1")
            .unwrap()
            .is_none());
        assert!(reader
            .read_chunk_metadata_in_device("root.sg1.d4")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_collapsed_tree_without_device_level() {
        // single device, index root typed internal-measurement: its children
        // name devices directly
        let mut writer = TestFileWriter::new(16).collapsed();
        writer.add_chunk("s1", TsDataType::Int64, &[]);
        writer.add_chunk("s2", TsDataType::Int64, &[]);
        writer.end_chunk_group("root.sg1.d1");
        let (_dir, mut reader) = open(writer.finish());

        assert_eq!(reader.get_all_devices().unwrap(), vec!["root.sg1.d1"]);
        let meta = reader
            .read_timeseries_metadata("root.sg1.d1", "s2")
            .unwrap()
            .unwrap();
        assert_eq!(meta.measurement_id, "s2");

        let all = reader.get_all_timeseries_metadata().unwrap();
        assert_eq!(all["root.sg1.d1"].len(), 2);
    }
}
