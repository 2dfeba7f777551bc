//! Trace file header and record layout
//!
//! All integers are little-endian.
//!
//! ```text
//! header (16 bytes):  magic u32 | version u32 | record_count u64
//! record (16 + n):    no u32 | thread_id u32 | flags u32 | payload_len u32 | payload[n]
//! ```
//!
//! `record_count` is informational; zero means the writer did not know it.

use crate::utils::TraceError;

/// Trace magic number, the bytes `RLAY` read as a little-endian u32
pub const TRACE_MAGIC: u32 = u32::from_le_bytes(*b"RLAY");

/// Current format version
pub const TRACE_VERSION: u32 = 1;

/// Header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Fixed part of every record in bytes
pub const RECORD_HEADER_SIZE: usize = 16;

/// Parsed trace header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceHeader {
    pub magic: u32,
    pub version: u32,
    pub record_count: u64,
}

impl TraceHeader {
    pub fn new(record_count: u64) -> Self {
        Self {
            magic: TRACE_MAGIC,
            version: TRACE_VERSION,
            record_count,
        }
    }

    /// Decode and validate a header from the start of `bytes`
    pub fn parse(bytes: &[u8]) -> Result<Self, TraceError> {
        if bytes.len() < HEADER_SIZE {
            return Err(TraceError::FileTooSmall {
                size: bytes.len() as u64,
                minimum: HEADER_SIZE as u64,
            });
        }

        let header = Self {
            magic: read_u32(bytes, 0),
            version: read_u32(bytes, 4),
            record_count: u64::from_le_bytes([
                bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14],
                bytes[15],
            ]),
        };

        if header.magic != TRACE_MAGIC {
            return Err(TraceError::InvalidMagic {
                expected: TRACE_MAGIC,
                actual: header.magic,
            });
        }
        if header.version == 0 || header.version > TRACE_VERSION {
            return Err(TraceError::UnsupportedVersion(header.version));
        }

        Ok(header)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..8].copy_from_slice(&self.version.to_le_bytes());
        out[8..16].copy_from_slice(&self.record_count.to_le_bytes());
        out
    }
}

/// Read a little-endian u32 at `offset`; caller guarantees the bounds
#[inline]
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
