//! In-memory chunk as handed to value decoders

use crate::file::header::ChunkHeader;
use crate::file::metadata::TimeRange;
use crate::file::statistics::Statistics;

/// One chunk lifted off disk: its header, the raw page bytes (headers +
/// payloads, still encoded), the chunk-level statistics and any delete
/// intervals carried over from its metadata.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub header: ChunkHeader,
    /// `header.data_size` bytes of page headers and payloads
    pub data: Vec<u8>,
    pub statistics: Statistics,
    pub delete_intervals: Option<Vec<TimeRange>>,
}
