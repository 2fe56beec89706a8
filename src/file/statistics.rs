//! Mergeable value statistics
//!
//! Every page carries a statistics summary; chunk statistics are the fold of
//! the chunk's page statistics, and timeseries statistics the fold of the
//! series' chunks. `merge` is commutative and associative: min/max/count/sum
//! fold freely, and first/last are selected by comparing start/end times
//! rather than by merge order, so recovery can fold pages in read order and
//! still produce an order-independent result.

use crate::error::{TsFileError, TsFileResult};
use crate::file::datatype::TsDataType;
use crate::file::{
    read_f32, read_f64, read_i32, read_i64, read_string, read_u64, read_u8, write_string,
};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Statistics over one span of values (a page, a chunk, or a whole series)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Number of values in the span
    pub count: u64,
    /// Smallest timestamp in the span (`i64::MAX` while empty)
    pub start_time: i64,
    /// Largest timestamp in the span (`i64::MIN` while empty)
    pub end_time: i64,
    /// Per-type value summary
    pub values: ValueStatistics,
}

/// Typed value summary carried inside [`Statistics`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueStatistics {
    /// `sum` counts the true values
    Boolean { first: bool, last: bool, sum: u64 },
    Int32 { min: i32, max: i32, first: i32, last: i32, sum: i64 },
    Int64 { min: i64, max: i64, first: i64, last: i64, sum: f64 },
    Float { min: f32, max: f32, first: f32, last: f32, sum: f64 },
    Double { min: f64, max: f64, first: f64, last: f64, sum: f64 },
    Text { first: String, last: String },
}

impl Statistics {
    /// An empty statistics aggregate for the given type.
    /// Merging anything into it (or it into anything) is the identity.
    pub fn empty(data_type: TsDataType) -> Self {
        let values = match data_type {
            TsDataType::Boolean => ValueStatistics::Boolean {
                first: false,
                last: false,
                sum: 0,
            },
            TsDataType::Int32 => ValueStatistics::Int32 {
                min: i32::MAX,
                max: i32::MIN,
                first: 0,
                last: 0,
                sum: 0,
            },
            TsDataType::Int64 => ValueStatistics::Int64 {
                min: i64::MAX,
                max: i64::MIN,
                first: 0,
                last: 0,
                sum: 0.0,
            },
            TsDataType::Float => ValueStatistics::Float {
                min: f32::MAX,
                max: f32::MIN,
                first: 0.0,
                last: 0.0,
                sum: 0.0,
            },
            TsDataType::Double => ValueStatistics::Double {
                min: f64::MAX,
                max: f64::MIN,
                first: 0.0,
                last: 0.0,
                sum: 0.0,
            },
            TsDataType::Text => ValueStatistics::Text {
                first: String::new(),
                last: String::new(),
            },
        };
        Self {
            count: 0,
            start_time: i64::MAX,
            end_time: i64::MIN,
            values,
        }
    }

    /// Logical type this aggregate summarizes
    pub fn data_type(&self) -> TsDataType {
        match self.values {
            ValueStatistics::Boolean { .. } => TsDataType::Boolean,
            ValueStatistics::Int32 { .. } => TsDataType::Int32,
            ValueStatistics::Int64 { .. } => TsDataType::Int64,
            ValueStatistics::Float { .. } => TsDataType::Float,
            ValueStatistics::Double { .. } => TsDataType::Double,
            ValueStatistics::Text { .. } => TsDataType::Text,
        }
    }

    /// True before any values have been folded in
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Fold another aggregate of the same type into this one
    pub fn merge(&mut self, other: &Statistics) -> TsFileResult<()> {
        if self.data_type() != other.data_type() {
            return Err(TsFileError::Corruption(format!(
                "cannot merge {:?} statistics into {:?}",
                other.data_type(),
                self.data_type()
            )));
        }
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            *self = other.clone();
            return Ok(());
        }

        // first/last follow the time bounds, not the merge order
        let take_first = other.start_time < self.start_time;
        let take_last = other.end_time > self.end_time;
        self.values.merge(&other.values, take_first, take_last);

        self.count += other.count;
        self.start_time = self.start_time.min(other.start_time);
        self.end_time = self.end_time.max(other.end_time);
        Ok(())
    }

    pub fn serialize_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.count.to_le_bytes());
        buf.extend_from_slice(&self.start_time.to_le_bytes());
        buf.extend_from_slice(&self.end_time.to_le_bytes());
        match &self.values {
            ValueStatistics::Boolean { first, last, sum } => {
                buf.push(*first as u8);
                buf.push(*last as u8);
                buf.extend_from_slice(&sum.to_le_bytes());
            }
            ValueStatistics::Int32 {
                min,
                max,
                first,
                last,
                sum,
            } => {
                buf.extend_from_slice(&min.to_le_bytes());
                buf.extend_from_slice(&max.to_le_bytes());
                buf.extend_from_slice(&first.to_le_bytes());
                buf.extend_from_slice(&last.to_le_bytes());
                buf.extend_from_slice(&sum.to_le_bytes());
            }
            ValueStatistics::Int64 {
                min,
                max,
                first,
                last,
                sum,
            } => {
                buf.extend_from_slice(&min.to_le_bytes());
                buf.extend_from_slice(&max.to_le_bytes());
                buf.extend_from_slice(&first.to_le_bytes());
                buf.extend_from_slice(&last.to_le_bytes());
                buf.extend_from_slice(&sum.to_le_bytes());
            }
            ValueStatistics::Float {
                min,
                max,
                first,
                last,
                sum,
            } => {
                buf.extend_from_slice(&min.to_le_bytes());
                buf.extend_from_slice(&max.to_le_bytes());
                buf.extend_from_slice(&first.to_le_bytes());
                buf.extend_from_slice(&last.to_le_bytes());
                buf.extend_from_slice(&sum.to_le_bytes());
            }
            ValueStatistics::Double {
                min,
                max,
                first,
                last,
                sum,
            } => {
                buf.extend_from_slice(&min.to_le_bytes());
                buf.extend_from_slice(&max.to_le_bytes());
                buf.extend_from_slice(&first.to_le_bytes());
                buf.extend_from_slice(&last.to_le_bytes());
                buf.extend_from_slice(&sum.to_le_bytes());
            }
            ValueStatistics::Text { first, last } => {
                write_string(buf, first);
                write_string(buf, last);
            }
        }
    }

    /// The enclosing record supplies the data type; the typed value section
    /// has no discriminant of its own.
    pub fn deserialize_from<R: Read>(
        reader: &mut R,
        data_type: TsDataType,
    ) -> TsFileResult<Self> {
        let count = read_u64(reader)?;
        let start_time = read_i64(reader)?;
        let end_time = read_i64(reader)?;
        let values = match data_type {
            TsDataType::Boolean => ValueStatistics::Boolean {
                first: read_u8(reader)? != 0,
                last: read_u8(reader)? != 0,
                sum: read_u64(reader)?,
            },
            TsDataType::Int32 => ValueStatistics::Int32 {
                min: read_i32(reader)?,
                max: read_i32(reader)?,
                first: read_i32(reader)?,
                last: read_i32(reader)?,
                sum: read_i64(reader)?,
            },
            TsDataType::Int64 => ValueStatistics::Int64 {
                min: read_i64(reader)?,
                max: read_i64(reader)?,
                first: read_i64(reader)?,
                last: read_i64(reader)?,
                sum: read_f64(reader)?,
            },
            TsDataType::Float => ValueStatistics::Float {
                min: read_f32(reader)?,
                max: read_f32(reader)?,
                first: read_f32(reader)?,
                last: read_f32(reader)?,
                sum: read_f64(reader)?,
            },
            TsDataType::Double => ValueStatistics::Double {
                min: read_f64(reader)?,
                max: read_f64(reader)?,
                first: read_f64(reader)?,
                last: read_f64(reader)?,
                sum: read_f64(reader)?,
            },
            TsDataType::Text => ValueStatistics::Text {
                first: read_string(reader)?,
                last: read_string(reader)?,
            },
        };
        Ok(Self {
            count,
            start_time,
            end_time,
            values,
        })
    }
}

impl ValueStatistics {
    fn merge(&mut self, other: &ValueStatistics, take_first: bool, take_last: bool) {
        match (self, other) {
            (
                ValueStatistics::Boolean { first, last, sum },
                ValueStatistics::Boolean {
                    first: of,
                    last: ol,
                    sum: os,
                },
            ) => {
                if take_first {
                    *first = *of;
                }
                if take_last {
                    *last = *ol;
                }
                *sum += os;
            }
            (
                ValueStatistics::Int32 {
                    min,
                    max,
                    first,
                    last,
                    sum,
                },
                ValueStatistics::Int32 {
                    min: omin,
                    max: omax,
                    first: of,
                    last: ol,
                    sum: os,
                },
            ) => {
                *min = (*min).min(*omin);
                *max = (*max).max(*omax);
                if take_first {
                    *first = *of;
                }
                if take_last {
                    *last = *ol;
                }
                *sum += os;
            }
            (
                ValueStatistics::Int64 {
                    min,
                    max,
                    first,
                    last,
                    sum,
                },
                ValueStatistics::Int64 {
                    min: omin,
                    max: omax,
                    first: of,
                    last: ol,
                    sum: os,
                },
            ) => {
                *min = (*min).min(*omin);
                *max = (*max).max(*omax);
                if take_first {
                    *first = *of;
                }
                if take_last {
                    *last = *ol;
                }
                *sum += os;
            }
            (
                ValueStatistics::Float {
                    min,
                    max,
                    first,
                    last,
                    sum,
                },
                ValueStatistics::Float {
                    min: omin,
                    max: omax,
                    first: of,
                    last: ol,
                    sum: os,
                },
            ) => {
                *min = min.min(*omin);
                *max = max.max(*omax);
                if take_first {
                    *first = *of;
                }
                if take_last {
                    *last = *ol;
                }
                *sum += os;
            }
            (
                ValueStatistics::Double {
                    min,
                    max,
                    first,
                    last,
                    sum,
                },
                ValueStatistics::Double {
                    min: omin,
                    max: omax,
                    first: of,
                    last: ol,
                    sum: os,
                },
            ) => {
                *min = min.min(*omin);
                *max = max.max(*omax);
                if take_first {
                    *first = *of;
                }
                if take_last {
                    *last = *ol;
                }
                *sum += os;
            }
            (
                ValueStatistics::Text { first, last },
                ValueStatistics::Text {
                    first: of,
                    last: ol,
                },
            ) => {
                if take_first {
                    *first = of.clone();
                }
                if take_last {
                    *last = ol.clone();
                }
            }
            // merge() checked the types already
            _ => {}
        }
    }
}
