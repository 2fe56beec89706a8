//! Per-device time-range index
//!
//! Tracks the start/end timestamp of every device in one file, enforces the
//! single-time-partition-per-file invariant, estimates its own RAM footprint
//! for memory quotas, and round-trips through a fixed binary layout when the
//! owning file resource closes.
//!
//! Serialized layout: device count (u32), then per device: name (u32 length
//! + UTF-8 bytes), start_time (i64), end_time (i64). On disk the minimum
//! i64 is reserved to mean "no end time recorded"; in memory that state is
//! an explicit `None` so even an end time of `i64::MIN` counts as recorded.

use crate::error::{TsFileError, TsFileResult};
use crate::file::metadata::ChunkGroupMetadata;
use crate::file::{read_i64, read_string, read_u32, write_string};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Write};

/// Reserved on-disk sentinel marking "no end time recorded yet"
pub const EMPTY_END_TIME: i64 = i64::MIN;

/// Estimated bytes per tracked device beyond its name: two timestamps plus
/// map-entry bookkeeping
const RAM_BYTES_PER_DEVICE: u64 = 48;

/// Start/end timestamps of one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceTimeRange {
    pub start_time: i64,
    /// `None` until the first end-time update
    pub end_time: Option<i64>,
}

impl DeviceTimeRange {
    fn unbounded() -> Self {
        Self {
            start_time: i64::MAX,
            end_time: None,
        }
    }
}

/// Time-range index over the devices of one file
#[derive(Debug, Clone)]
pub struct DeviceTimeIndex {
    devices: HashMap<String, DeviceTimeRange>,
    partition_interval_ms: i64,
    sealed: bool,
}

impl DeviceTimeIndex {
    pub fn new(partition_interval_ms: i64) -> Self {
        Self {
            devices: HashMap::new(),
            partition_interval_ms,
            sealed: false,
        }
    }

    /// Build an index from recovered chunk groups: every chunk's statistics
    /// widen its device's time range
    pub fn from_chunk_groups(groups: &[ChunkGroupMetadata], partition_interval_ms: i64) -> Self {
        let mut index = Self::new(partition_interval_ms);
        for group in groups {
            for chunk in &group.chunk_metadata {
                if chunk.statistics.is_empty() {
                    continue;
                }
                index.update_start_time(&group.device_id, chunk.start_time());
                index.update_end_time(&group.device_id, chunk.end_time());
            }
        }
        index
    }

    /// Widen the device's start time downwards
    pub fn update_start_time(&mut self, device: &str, time: i64) {
        if self.sealed {
            tracing::warn!(device, "update on a sealed time index ignored");
            return;
        }
        let range = self
            .devices
            .entry(device.to_string())
            .or_insert_with(DeviceTimeRange::unbounded);
        if time < range.start_time {
            range.start_time = time;
        }
    }

    /// Widen the device's end time upwards
    pub fn update_end_time(&mut self, device: &str, time: i64) {
        if self.sealed {
            tracing::warn!(device, "update on a sealed time index ignored");
            return;
        }
        let range = self
            .devices
            .entry(device.to_string())
            .or_insert_with(DeviceTimeRange::unbounded);
        match range.end_time {
            Some(end) if end >= time => {}
            _ => range.end_time = Some(time),
        }
    }

    pub fn time_range(&self, device: &str) -> Option<DeviceTimeRange> {
        self.devices.get(device).copied()
    }

    pub fn start_time(&self, device: &str) -> Option<i64> {
        self.devices.get(device).map(|r| r.start_time)
    }

    pub fn end_time(&self, device: &str) -> Option<i64> {
        self.devices.get(device).and_then(|r| r.end_time)
    }

    pub fn devices(&self) -> Vec<&str> {
        self.devices.keys().map(|k| k.as_str()).collect()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// True while no device has seen an end-time update
    pub fn end_time_empty(&self) -> bool {
        self.devices.values().all(|r| r.end_time.is_none())
    }

    /// True if any device's data may still be alive at or after
    /// `time_lower_bound` (a missing end time means "still open")
    pub fn still_lives(&self, time_lower_bound: i64) -> bool {
        self.devices
            .values()
            .any(|r| match r.end_time {
                None => true,
                Some(end) => end >= time_lower_bound,
            })
    }

    fn partition_of(&self, timestamp: i64) -> i64 {
        timestamp.div_euclid(self.partition_interval_ms)
    }

    /// Partition of this file, derived from one representative timestamp.
    /// An index with no devices cannot name a partition.
    pub fn get_time_partition(&self, file_path: &str) -> TsFileResult<i64> {
        match self.devices.values().next() {
            Some(range) => Ok(self.partition_of(range.start_time)),
            None => Err(TsFileError::PartitionViolation {
                file: file_path.to_string(),
                partitions: Vec::new(),
            }),
        }
    }

    /// Partition of this file, verified across every device's start and end
    /// time. More than one distinct partition is a violation, never silently
    /// resolved.
    pub fn get_time_partition_with_check(&self, file_path: &str) -> TsFileResult<i64> {
        let mut partitions: Vec<i64> = Vec::new();
        for range in self.devices.values() {
            let start_partition = self.partition_of(range.start_time);
            if !partitions.contains(&start_partition) {
                partitions.push(start_partition);
            }
            if let Some(end) = range.end_time {
                let end_partition = self.partition_of(end);
                if !partitions.contains(&end_partition) {
                    partitions.push(end_partition);
                }
            }
        }
        partitions.sort_unstable();
        match partitions[..] {
            [single] => Ok(single),
            _ => Err(TsFileError::PartitionViolation {
                file: file_path.to_string(),
                partitions,
            }),
        }
    }

    /// Estimated resident size of the index
    pub fn calculate_ram_size(&self) -> u64 {
        self.devices
            .keys()
            .map(|name| name.len() as u64 + RAM_BYTES_PER_DEVICE)
            .sum()
    }

    /// Marginal cost of registering one more device, for pre-charging memory
    /// quotas before insertion. Does not mutate the index.
    pub fn estimate_ram_increment(&self, device: &str) -> u64 {
        if self.devices.contains_key(device) {
            0
        } else {
            device.len() as u64 + RAM_BYTES_PER_DEVICE
        }
    }

    /// Seal the index when the owning file resource closes; later updates
    /// are ignored
    pub fn close(&mut self) {
        self.sealed = true;
        self.devices.shrink_to_fit();
    }

    pub fn serialize<W: Write>(&self, writer: &mut W) -> TsFileResult<()> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(self.devices.len() as u32).to_le_bytes());
        // stable output: name order
        let mut names: Vec<&String> = self.devices.keys().collect();
        names.sort();
        for name in names {
            let range = self.devices[name];
            write_string(&mut buf, name);
            buf.extend_from_slice(&range.start_time.to_le_bytes());
            buf.extend_from_slice(&range.end_time.unwrap_or(EMPTY_END_TIME).to_le_bytes());
        }
        writer.write_all(&buf)?;
        Ok(())
    }

    pub fn deserialize<R: Read>(reader: &mut R, partition_interval_ms: i64) -> TsFileResult<Self> {
        let device_count = read_u32(reader)?;
        let mut devices = HashMap::with_capacity(device_count as usize);
        for _ in 0..device_count {
            let name = read_string(reader)?;
            let start_time = read_i64(reader)?;
            let end_raw = read_i64(reader)?;
            let end_time = if end_raw == EMPTY_END_TIME {
                None
            } else {
                Some(end_raw)
            };
            devices.insert(
                name,
                DeviceTimeRange {
                    start_time,
                    end_time,
                },
            );
        }
        Ok(Self {
            devices,
            partition_interval_ms,
            sealed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: i64 = 1000;

    #[test]
    fn test_update_times_widen_monotonically() {
        let mut index = DeviceTimeIndex::new(INTERVAL);
        index.update_start_time("d1", 500);
        index.update_start_time("d1", 700); // larger: ignored
        index.update_start_time("d1", 300);
        assert_eq!(index.start_time("d1"), Some(300));

        index.update_end_time("d1", 800);
        index.update_end_time("d1", 600); // smaller: ignored
        index.update_end_time("d1", 900);
        assert_eq!(index.end_time("d1"), Some(900));
    }

    #[test]
    fn test_end_time_empty_sentinel() {
        let mut index = DeviceTimeIndex::new(INTERVAL);
        index.update_start_time("d1", 100);
        assert!(index.end_time_empty());
        assert_eq!(index.end_time("d1"), None);

        // any update flips it, including the minimum representable value
        index.update_end_time("d1", i64::MIN);
        assert!(!index.end_time_empty());
        assert_eq!(index.end_time("d1"), Some(i64::MIN));
    }

    #[test]
    fn test_partition_check_single_partition() {
        let mut index = DeviceTimeIndex::new(INTERVAL);
        index.update_start_time("d1", 3000);
        index.update_end_time("d1", 3400);
        index.update_start_time("d2", 3100);
        index.update_end_time("d2", 3999);

        assert_eq!(index.get_time_partition_with_check("f.tsfile").unwrap(), 3);
        assert_eq!(index.get_time_partition("f.tsfile").unwrap(), 3);
    }

    #[test]
    fn test_partition_check_detects_violation() {
        let mut index = DeviceTimeIndex::new(INTERVAL);
        index.update_start_time("d1", 3000);
        index.update_end_time("d1", 3400);
        index.update_start_time("d2", 4100);
        index.update_end_time("d2", 4500);

        let err = index.get_time_partition_with_check("f.tsfile").unwrap_err();
        match err {
            TsFileError::PartitionViolation { file, partitions } => {
                assert_eq!(file, "f.tsfile");
                assert_eq!(partitions, vec![3, 4]);
            }
            other => panic!("expected partition violation, got {:?}", other),
        }
    }

    #[test]
    fn test_partition_of_negative_timestamps() {
        let mut index = DeviceTimeIndex::new(INTERVAL);
        index.update_start_time("d1", -1);
        index.update_end_time("d1", -1);
        assert_eq!(index.get_time_partition_with_check("f").unwrap(), -1);
    }

    #[test]
    fn test_still_lives() {
        let mut index = DeviceTimeIndex::new(INTERVAL);
        index.update_start_time("d1", 100);
        index.update_end_time("d1", 200);
        assert!(index.still_lives(150));
        assert!(index.still_lives(200));
        assert!(!index.still_lives(201));

        // an open device keeps the whole index alive
        index.update_start_time("d2", 100);
        assert!(index.still_lives(10_000));
    }

    #[test]
    fn test_ram_estimate_does_not_mutate() {
        let mut index = DeviceTimeIndex::new(INTERVAL);
        index.update_start_time("d1", 100);
        let base = index.calculate_ram_size();

        let increment = index.estimate_ram_increment("device-with-a-long-name");
        assert!(increment > 0);
        assert_eq!(index.calculate_ram_size(), base);
        assert_eq!(index.device_count(), 1);

        // a known device costs nothing more
        assert_eq!(index.estimate_ram_increment("d1"), 0);
    }

    #[test]
    fn test_serialize_roundtrip() {
        for device_count in [0usize, 1, 20] {
            let mut index = DeviceTimeIndex::new(INTERVAL);
            for i in 0..device_count {
                let name = format!("root.sg1.dévice_{}", i);
                index.update_start_time(&name, i as i64 * 10);
                index.update_end_time(&name, i as i64 * 10 + 5);
            }
            // one device with the end still empty
            if device_count > 1 {
                index.update_start_time("root.sg1.open", 77);
            }

            let mut buf = Vec::new();
            index.serialize(&mut buf).unwrap();
            let restored = DeviceTimeIndex::deserialize(&mut buf.as_slice(), INTERVAL).unwrap();

            assert_eq!(restored.device_count(), index.device_count());
            for device in index.devices() {
                assert_eq!(restored.start_time(device), index.start_time(device));
                assert_eq!(restored.end_time(device), index.end_time(device));
            }
        }
    }

    #[test]
    fn test_close_seals_the_index() {
        let mut index = DeviceTimeIndex::new(INTERVAL);
        index.update_start_time("d1", 100);
        index.close();
        index.update_start_time("d1", 5);
        index.update_end_time("d1", 500);
        assert_eq!(index.start_time("d1"), Some(100));
        assert!(index.end_time_empty());
    }
}
