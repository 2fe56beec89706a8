//! Discriminant enums shared by chunk headers, statistics and metadata records

use crate::error::{TsFileError, TsFileResult};
use serde::{Deserialize, Serialize};

/// Logical type of a measurement's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TsDataType {
    Boolean = 0,
    Int32 = 1,
    Int64 = 2,
    Float = 3,
    Double = 4,
    Text = 5,
}

impl TryFrom<u8> for TsDataType {
    type Error = TsFileError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TsDataType::Boolean),
            1 => Ok(TsDataType::Int32),
            2 => Ok(TsDataType::Int64),
            3 => Ok(TsDataType::Float),
            4 => Ok(TsDataType::Double),
            5 => Ok(TsDataType::Text),
            _ => Err(TsFileError::Corruption(format!(
                "unknown data type: {}",
                value
            ))),
        }
    }
}

/// Value encoding applied inside page payloads.
/// Payload bytes are opaque to this crate; the tag is carried through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TsEncoding {
    Plain = 0,
    TimeDelta = 1,
    Rle = 2,
    Gorilla = 3,
}

impl TryFrom<u8> for TsEncoding {
    type Error = TsFileError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TsEncoding::Plain),
            1 => Ok(TsEncoding::TimeDelta),
            2 => Ok(TsEncoding::Rle),
            3 => Ok(TsEncoding::Gorilla),
            _ => Err(TsFileError::Corruption(format!(
                "unknown encoding: {}",
                value
            ))),
        }
    }
}

/// Compression applied to page payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CompressionType {
    Uncompressed = 0,
    Snappy = 1,
    Gzip = 2,
    Lz4 = 3,
}

impl TryFrom<u8> for CompressionType {
    type Error = TsFileError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CompressionType::Uncompressed),
            1 => Ok(CompressionType::Snappy),
            2 => Ok(CompressionType::Gzip),
            3 => Ok(CompressionType::Lz4),
            _ => Err(TsFileError::Corruption(format!(
                "unknown compression type: {}",
                value
            ))),
        }
    }
}
