//! # TsFile
//!
//! Reader and crash-recovery layer for the legacy TsFile columnar
//! time-series format. A TsFile packs per-device, per-measurement value
//! chunks sequentially and trails them with a hierarchical metadata index
//! that allows random lookup without a full scan.
//!
//! ## Features
//!
//! - **Index lookups**: resolve a device/measurement name to its chunk
//!   descriptors through the on-disk index tree, with exact and
//!   nearest-preceding binary search
//! - **Bulk listings**: all devices, or every series grouped by device
//! - **Self-check / recovery**: re-derive a file's structure by sequential
//!   replay when the trailing index is missing, truncated, or corrupted,
//!   and compute the last safely-truncatable offset
//! - **Device time index**: per-device time ranges with time-partition
//!   enforcement and RAM accounting
//!
//! ## Modules
//!
//! - [`file`]: on-disk structures and their decoders
//! - [`read`]: the reader (lookup path) and recovery scanner
//! - [`timeindex`]: per-device time-range index
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use tsfile::{CheckResult, TsFileReader};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut reader = TsFileReader::open("data-1.tsfile")?;
//!
//!     // validate the file, re-deriving structure if it is incomplete
//!     let mut schemas = HashMap::new();
//!     let mut chunk_groups = Vec::new();
//!     let mut versions = Vec::new();
//!     match reader.self_check(&mut schemas, &mut chunk_groups, &mut versions, true)? {
//!         CheckResult::Complete => {
//!             for device in reader.get_all_devices()? {
//!                 let chunks = reader.read_chunk_metadata_in_device(&device)?;
//!                 println!("{}: {} series", device, chunks.len());
//!             }
//!         }
//!         CheckResult::TruncateAt(offset) => {
//!             println!("file is safe up to byte {}", offset);
//!         }
//!         status => println!("cannot use file: {:?}", status),
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod file;
pub mod read;
pub mod timeindex;

// Re-export top-level types for convenience
pub use config::{TsFileConfig, HEADER_LEN, MAGIC, MIN_COMPLETE_LEN, VERSION_NUMBER};

pub use error::{TsFileError, TsFileResult};

pub use file::{
    apply_version, ChunkGroupFooter, ChunkGroupMetadata, ChunkHeader, ChunkMetadata,
    CompressionType, MeasurementSchema, MetadataIndexEntry, MetadataIndexNode,
    MetadataIndexNodeType, PageHeader, Statistics, TimeRange, TimeseriesMetadata, TsDataType,
    TsEncoding, TsFileMetadata,
};

pub use read::{CheckResult, Chunk, TsFileInput, TsFileReader};

pub use timeindex::{DeviceTimeIndex, DeviceTimeRange, EMPTY_END_TIME};
