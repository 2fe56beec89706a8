//! Self-check and recovery scan
//!
//! Replays the data section marker-by-marker, folding page statistics into
//! chunk metadata and committing chunk groups only when their footer is read.
//! The scan never consults the metadata index tree (after a crash it may not
//! exist), and it always leaves the caller with a truncation offset: bytes
//! before it form a valid prefix that appends can continue from, everything
//! after it (including any old trailing metadata) is void.

use crate::config::{HEADER_LEN, MAGIC, VERSION_NUMBER};
use crate::error::{TsFileError, TsFileResult};
use crate::file::header::{ChunkGroupFooter, ChunkHeader, PageHeader};
use crate::file::marker;
use crate::file::metadata::{ChunkGroupMetadata, ChunkMetadata, MeasurementSchema};
use crate::file::statistics::Statistics;
use crate::file::{read_u64, read_u8};
use crate::read::reader::TsFileReader;
use serde::Serialize;
use std::collections::HashMap;

/// Outcome of a self-check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckResult {
    /// Head and tail magic both present; the file is structurally complete
    Complete,
    /// Bytes in `[0, offset)` are a valid prefix; everything after must be
    /// truncated and the trailing metadata rebuilt
    TruncateAt(u64),
    /// The backing file does not exist
    FileNotFound,
    /// Not this format at all: header magic/version mismatch, or the file is
    /// too short to hold a header
    Incompatible,
}

/// Chunks and schemas of the group currently being read. Committed into the
/// outputs only when the group's footer arrives; dropped wholesale otherwise.
#[derive(Default)]
struct PendingGroup {
    chunks: Vec<ChunkMetadata>,
    schemas: Vec<MeasurementSchema>,
}

impl TsFileReader {
    /// Scan the file and return the position before which the data is safe.
    ///
    /// Committed chunk groups are appended to `chunk_groups`, their
    /// measurement shapes to `schemas` (first registration wins per
    /// device/measurement pair), and version records to `version_info`. With
    /// `fast_finish`, a structurally complete file returns
    /// [`CheckResult::Complete`] without touching any of the outputs.
    ///
    /// Decode errors inside the data section do not propagate: the scan
    /// stops, logs the position, and reports the end of the last committed
    /// record as the truncation offset.
    pub fn self_check(
        &mut self,
        schemas: &mut HashMap<(String, String), MeasurementSchema>,
        chunk_groups: &mut Vec<ChunkGroupMetadata>,
        version_info: &mut Vec<(u64, u64)>,
        fast_finish: bool,
    ) -> TsFileResult<CheckResult> {
        let file_size = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CheckResult::FileNotFound);
            }
            Err(e) => return Err(e.into()),
        };

        if file_size < HEADER_LEN {
            return Ok(CheckResult::Incompatible);
        }
        if self.read_head_magic()? != MAGIC || self.read_version_number()? != VERSION_NUMBER {
            return Ok(CheckResult::Incompatible);
        }

        if file_size == HEADER_LEN {
            // a bare header holds no data and is already a valid prefix
            return Ok(CheckResult::TruncateAt(HEADER_LEN));
        }
        if self.is_complete()? {
            match self.load_metadata_location() {
                Ok(_) => {
                    if fast_finish {
                        return Ok(CheckResult::Complete);
                    }
                }
                // magic matched but the trailer is unreadable; fall through
                // to re-derivation, which voids the trailer anyway
                Err(e) => tracing::warn!(
                    file = %self.path.display(),
                    error = %e,
                    "trailing metadata unreadable, re-deriving structure"
                ),
            }
        }

        // not complete, or a re-derivation was requested: replay the data
        // section and keep the last safe offset as we go
        self.input.seek(HEADER_LEN)?;
        let mut truncated = HEADER_LEN;
        if let Err(e) = self.scan_data_section(schemas, chunk_groups, version_info, &mut truncated)
        {
            tracing::warn!(
                file = %self.path.display(),
                position = self.input.position(),
                error = %e,
                "self-check cannot proceed, truncating at last safe offset"
            );
        }
        Ok(CheckResult::TruncateAt(truncated))
    }

    fn scan_data_section(
        &mut self,
        schemas: &mut HashMap<(String, String), MeasurementSchema>,
        chunk_groups: &mut Vec<ChunkGroupMetadata>,
        version_info: &mut Vec<(u64, u64)>,
        truncated: &mut u64,
    ) -> TsFileResult<()> {
        let mut pending: Option<PendingGroup> = None;

        loop {
            let marker = read_u8(&mut self.input)?;
            match marker {
                marker::SEPARATOR => {
                    // the separator belongs to the trailing metadata section
                    *truncated = self.input.position() - 1;
                    return Ok(());
                }
                marker::CHUNK_HEADER => {
                    let group = pending.get_or_insert_with(PendingGroup::default);
                    let chunk_offset = self.input.position() - 1;
                    let header = ChunkHeader::deserialize_from(&mut self.input)?;

                    let mut chunk_stats = Statistics::empty(header.data_type);
                    for _ in 0..header.num_pages {
                        let page = PageHeader::deserialize_from(&mut self.input, header.data_type)?;
                        chunk_stats.merge(&page.statistics)?;
                        self.input.skip(page.compressed_size as u64)?;
                    }

                    group.schemas.push(MeasurementSchema::from_chunk_header(&header));
                    group.chunks.push(ChunkMetadata::new(
                        header.measurement_id,
                        header.data_type,
                        chunk_offset,
                        chunk_stats,
                    ));
                }
                marker::CHUNK_GROUP_FOOTER => {
                    // commit point: the group exists only now that its footer
                    // is on disk
                    let footer = ChunkGroupFooter::deserialize_from(&mut self.input)?;
                    let group = pending.take().unwrap_or_default();
                    for schema in &group.schemas {
                        schemas
                            .entry((footer.device_id.clone(), schema.measurement_id.clone()))
                            .or_insert_with(|| schema.clone());
                    }
                    self.total_chunk_num += group.chunks.len() as u64;
                    chunk_groups.push(ChunkGroupMetadata {
                        device_id: footer.device_id,
                        chunk_metadata: group.chunks,
                    });
                    *truncated = self.input.position();
                }
                marker::VERSION => {
                    let version = read_u64(&mut self.input)?;
                    version_info.push((self.input.position(), version));
                    *truncated = self.input.position();
                }
                other => {
                    return Err(TsFileError::Corruption(format!(
                        "unexpected marker {:#04x} at position {}",
                        other,
                        self.input.position() - 1
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::datatype::TsDataType;
    use crate::read::test_writer::{page, TestFileWriter};
    use std::collections::HashMap;

    fn open(bytes: &[u8]) -> (tempfile::TempDir, TsFileReader) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.tsfile");
        std::fs::write(&path, bytes).unwrap();
        (dir, TsFileReader::open(&path).unwrap())
    }

    fn check(
        reader: &mut TsFileReader,
        fast_finish: bool,
    ) -> (
        CheckResult,
        HashMap<(String, String), MeasurementSchema>,
        Vec<ChunkGroupMetadata>,
        Vec<(u64, u64)>,
    ) {
        let mut schemas = HashMap::new();
        let mut groups = Vec::new();
        let mut versions = Vec::new();
        let result = reader
            .self_check(&mut schemas, &mut groups, &mut versions, fast_finish)
            .unwrap();
        (result, schemas, groups, versions)
    }

    fn two_group_writer() -> TestFileWriter {
        let mut writer = TestFileWriter::new(16);
        writer.add_chunk(
            "s1",
            TsDataType::Double,
            &[page(0, 99, &[1.0, 2.0]), page(100, 199, &[3.0])],
        );
        writer.add_chunk("s2", TsDataType::Double, &[page(0, 99, &[5.0])]);
        writer.end_chunk_group("root.sg1.d1");
        writer.add_chunk("s1", TsDataType::Double, &[page(200, 299, &[4.0])]);
        writer.end_chunk_group("root.sg1.d2");
        writer
    }

    #[test]
    fn test_complete_file_fast_finish_leaves_outputs_untouched() {
        let (_dir, mut reader) = open(&two_group_writer().finish());
        let (result, schemas, groups, versions) = check(&mut reader, true);
        assert_eq!(result, CheckResult::Complete);
        assert!(schemas.is_empty());
        assert!(groups.is_empty());
        assert!(versions.is_empty());
        assert_eq!(reader.total_chunk_num(), 0);
    }

    #[test]
    fn test_complete_file_rederivation() {
        let mut writer = two_group_writer();
        let separator_pos = writer.position();
        let bytes = writer.finish();
        let (_dir, mut reader) = open(&bytes);

        let (result, schemas, groups, _) = check(&mut reader, false);
        // the old trailing metadata is void once structure was re-derived
        assert_eq!(result, CheckResult::TruncateAt(separator_pos));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].device_id, "root.sg1.d1");
        assert_eq!(groups[0].chunk_metadata.len(), 2);
        assert_eq!(groups[1].device_id, "root.sg1.d2");
        assert_eq!(reader.total_chunk_num(), 3);
        assert!(schemas.contains_key(&("root.sg1.d1".to_string(), "s1".to_string())));
        assert!(schemas.contains_key(&("root.sg1.d2".to_string(), "s1".to_string())));
    }

    #[test]
    fn test_rederived_statistics_match_pages() {
        let (_dir, mut reader) = open(&two_group_writer().finish());
        let (_, _, groups, _) = check(&mut reader, false);

        let chunk = &groups[0].chunk_metadata[0];
        assert_eq!(chunk.measurement_id, "s1");
        assert_eq!(chunk.statistics.count, 3);
        assert_eq!(chunk.statistics.start_time, 0);
        assert_eq!(chunk.statistics.end_time, 199);
    }

    #[test]
    fn test_header_only_file_truncates_at_header() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&VERSION_NUMBER);
        let (_dir, mut reader) = open(&bytes);

        let (result, _, groups, _) = check(&mut reader, true);
        assert_eq!(result, CheckResult::TruncateAt(HEADER_LEN));
        assert!(groups.is_empty());
    }

    #[test]
    fn test_incompatible_magic_and_short_files() {
        let (_dir, mut reader) = open(b"NotAFile0002xxxxxxxx");
        let (result, _, _, _) = check(&mut reader, true);
        assert_eq!(result, CheckResult::Incompatible);

        let (_dir, mut reader) = open(b"TsF");
        let (result, _, _, _) = check(&mut reader, true);
        assert_eq!(result, CheckResult::Incompatible);

        // right magic, wrong version
        let (_dir, mut reader) = open(b"TsFile000001");
        let (result, _, _, _) = check(&mut reader, true);
        assert_eq!(result, CheckResult::Incompatible);
    }

    #[test]
    fn test_missing_file_reports_not_found() {
        let (_dir, mut reader) = open(&two_group_writer().finish());
        std::fs::remove_file(reader.path().to_path_buf()).unwrap();
        let (result, _, _, _) = check(&mut reader, true);
        assert_eq!(result, CheckResult::FileNotFound);
    }

    #[test]
    fn test_partial_trailing_group_is_dropped() {
        let mut writer = two_group_writer();
        let safe_end = writer.position();
        // a third group begins but its footer never makes it to disk
        writer.add_chunk("s7", TsDataType::Double, &[page(300, 399, &[7.0])]);
        let mut bytes = writer.into_data_bytes();
        // and its last chunk is itself cut short
        bytes.truncate(bytes.len() - 5);
        let (_dir, mut reader) = open(&bytes);

        let (result, schemas, groups, _) = check(&mut reader, false);
        assert_eq!(result, CheckResult::TruncateAt(safe_end));
        assert_eq!(groups.len(), 2);
        assert_eq!(reader.total_chunk_num(), 3);
        // nothing of the dangling group leaks into the outputs
        assert!(!schemas
            .keys()
            .any(|(_, measurement)| measurement == "s7"));
    }

    #[test]
    fn test_uncommitted_group_even_when_chunks_are_whole() {
        let mut writer = two_group_writer();
        let safe_end = writer.position();
        // fully written chunk, but the group footer is missing entirely
        writer.add_chunk("s8", TsDataType::Double, &[page(300, 399, &[8.0])]);
        let (_dir, mut reader) = open(&writer.into_data_bytes());

        let (result, _, groups, _) = check(&mut reader, false);
        assert_eq!(result, CheckResult::TruncateAt(safe_end));
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_version_record_advances_truncation() {
        let mut writer = two_group_writer();
        writer.add_version(42);
        let safe_end = writer.position();
        writer.add_chunk("s9", TsDataType::Double, &[page(400, 499, &[9.0])]);
        let (_dir, mut reader) = open(&writer.into_data_bytes());

        let (result, _, groups, versions) = check(&mut reader, false);
        assert_eq!(result, CheckResult::TruncateAt(safe_end));
        assert_eq!(groups.len(), 2);
        assert_eq!(versions, vec![(safe_end, 42)]);
    }

    #[test]
    fn test_corrupt_marker_stops_at_last_commit() {
        let mut writer = two_group_writer();
        let safe_end = writer.position();
        let mut bytes = writer.into_data_bytes();
        bytes.push(0x7F); // no such marker
        bytes.extend_from_slice(&[0u8; 16]);
        let (_dir, mut reader) = open(&bytes);

        let (result, _, groups, _) = check(&mut reader, false);
        assert_eq!(result, CheckResult::TruncateAt(safe_end));
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_first_registration_wins_for_schemas() {
        let mut writer = TestFileWriter::new(16);
        writer.add_chunk("s1", TsDataType::Double, &[page(0, 9, &[1.0])]);
        writer.end_chunk_group("root.sg1.d1");
        // same series again in a later group
        writer.add_chunk("s1", TsDataType::Double, &[page(10, 19, &[2.0])]);
        writer.end_chunk_group("root.sg1.d1");
        let (_dir, mut reader) = open(&writer.into_data_bytes());

        let (_, schemas, groups, _) = check(&mut reader, false);
        assert_eq!(groups.len(), 2);
        assert_eq!(schemas.len(), 1);
    }
}
