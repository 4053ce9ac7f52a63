//! TFRecord container framing
//!
//! Each record is stored as
//! `u64 length | u32 masked_crc32c(length) | data | u32 masked_crc32c(data)`,
//! all little-endian.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use prost::Message;
use crate::error::{PrepError, Result};
use super::example::Example;

const MASK_DELTA: u32 = 0xa282_ead8;

/// CRC32C as stored in TFRecord files
pub fn masked_crc32c(data: &[u8]) -> u32 {
    crc32c::crc32c(data).rotate_right(15).wrapping_add(MASK_DELTA)
}

/// Appends records to a byte sink
pub struct RecordWriter<W: Write> {
    inner: W,
    count: usize,
}

impl RecordWriter<BufWriter<File>> {
    /// Create (or truncate) a record file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| PrepError::record(format!("Cannot create {}: {}", path.display(), e)))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    pub fn write_record(&mut self, data: &[u8]) -> Result<()> {
        let length = (data.len() as u64).to_le_bytes();

        self.inner.write_all(&length)?;
        self.inner.write_all(&masked_crc32c(&length).to_le_bytes())?;
        self.inner.write_all(data)?;
        self.inner.write_all(&masked_crc32c(data).to_le_bytes())?;

        self.count += 1;
        Ok(())
    }

    pub fn write_example(&mut self, example: &Example) -> Result<()> {
        self.write_record(&example.encode_to_vec())
    }

    /// Records written so far
    pub fn count(&self) -> usize {
        self.count
    }

    /// Flush and hand back the sink
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Reads records back, verifying both checksums
pub struct RecordReader<R: Read> {
    inner: R,
    offset: u64,
}

impl RecordReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| PrepError::record(format!("Cannot open {}: {}", path.display(), e)))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Next record payload, `None` at a clean end of input
    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>> {
        let mut length = [0u8; 8];
        match read_full(&mut self.inner, &mut length)? {
            0 => return Ok(None),
            8 => {}
            n => {
                return Err(PrepError::record(format!(
                    "Truncated record header at offset {} ({} of 8 bytes)", self.offset, n
                )));
            }
        }

        let length_crc = self.read_u32()?;
        if masked_crc32c(&length) != length_crc {
            return Err(PrepError::record(format!("Length checksum mismatch at offset {}", self.offset)));
        }

        let len = u64::from_le_bytes(length) as usize;
        let mut data = vec![0u8; len];
        self.inner.read_exact(&mut data).map_err(|e| {
            PrepError::record(format!("Truncated record payload at offset {}: {}", self.offset, e))
        })?;

        let data_crc = self.read_u32()?;
        if masked_crc32c(&data) != data_crc {
            return Err(PrepError::record(format!("Data checksum mismatch at offset {}", self.offset)));
        }

        self.offset += 16 + len as u64;
        Ok(Some(data))
    }

    pub fn read_example(&mut self) -> Result<Option<Example>> {
        match self.read_record()? {
            Some(data) => Ok(Some(Example::decode(data.as_slice())?)),
            None => Ok(None),
        }
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf).map_err(|e| {
            PrepError::record(format!("Truncated record checksum at offset {}: {}", self.offset, e))
        })?;
        Ok(u32::from_le_bytes(buf))
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Like `read_exact`, but reports how many bytes arrived before EOF
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
