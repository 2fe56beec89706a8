//! Positioned, length-bounded byte source over a local file
//!
//! One `TsFileInput` is one logical cursor. Random lookups use
//! [`TsFileInput::read_at`] (seek + bounded read), the recovery scan reads
//! sequentially through the same cursor via [`std::io::Read`]. Both paths
//! hand the resulting bytes to the same decoders.

use crate::error::{TsFileError, TsFileResult};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

pub struct TsFileInput {
    file: File,
    size: u64,
    position: u64,
}

impl TsFileInput {
    pub fn open(path: impl AsRef<Path>) -> TsFileResult<Self> {
        let file = File::open(path.as_ref())?;
        let size = file.metadata()?.len();
        Ok(Self {
            file,
            size,
            position: 0,
        })
    }

    /// Total length of the underlying file, captured at open time
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Current cursor position
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn seek(&mut self, position: u64) -> TsFileResult<()> {
        self.file.seek(SeekFrom::Start(position))?;
        self.position = position;
        Ok(())
    }

    /// Advance the cursor without reading (page payloads are skipped, not
    /// decoded)
    pub fn skip(&mut self, bytes: u64) -> TsFileResult<()> {
        self.seek(self.position + bytes)
    }

    /// Read the bounded region `[offset, offset + len)`.
    /// A region reaching past the end of the file is a decode failure, not a
    /// short read.
    pub fn read_at(&mut self, offset: u64, len: usize) -> TsFileResult<Vec<u8>> {
        let end = offset
            .checked_add(len as u64)
            .ok_or_else(|| TsFileError::Corruption("region offset overflows".to_string()))?;
        if end > self.size {
            return Err(TsFileError::Corruption(format!(
                "region [{}, {}) reaches past end of file ({} bytes)",
                offset, end, self.size
            )));
        }
        self.seek(offset)?;
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl Read for TsFileInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.file.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}
