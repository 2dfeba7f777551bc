//! Memory-mapped trace files
//!
//! The trace file is mapped read-only and decoded one record at a time as
//! the race asks for the next call.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use super::call::{Call, CallFlags, Leg};
use super::header::{read_u32, TraceHeader, HEADER_SIZE, RECORD_HEADER_SIZE};
use super::source::CallSource;
use crate::utils::TraceError;

/// Memory-mapped trace reader
pub struct TraceFile {
    /// Memory-mapped file
    mmap: Mmap,
    header: TraceHeader,
    /// Byte offset of the next record
    offset: usize,
    /// Number of the last call handed out
    last_call_no: Option<u32>,
}

impl TraceFile {
    /// Open and validate a trace file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let open_failed = |source: std::io::Error| TraceError::OpenFailed {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(open_failed)?;

        let size = file.metadata().map_err(open_failed)?.len();
        if size < HEADER_SIZE as u64 {
            return Err(TraceError::FileTooSmall {
                size,
                minimum: HEADER_SIZE as u64,
            });
        }

        // SAFETY: The file is opened read-only and we don't modify the memory
        let mmap = unsafe { Mmap::map(&file) }.map_err(open_failed)?;
        let header = TraceHeader::parse(&mmap)?;

        debug!(
            "Opened trace {:?}: version {}, {} bytes, {} records declared",
            path,
            header.version,
            size,
            header.record_count
        );

        Ok(Self {
            mmap,
            header,
            offset: HEADER_SIZE,
            last_call_no: None,
        })
    }

    pub fn header(&self) -> &TraceHeader {
        &self.header
    }

    /// Bytes left to decode
    pub fn remaining_bytes(&self) -> usize {
        self.mmap.len() - self.offset
    }

    fn truncated(&self, needed: usize) -> TraceError {
        TraceError::Truncated {
            offset: self.offset as u64,
            needed: needed as u64,
            available: self.remaining_bytes() as u64,
        }
    }
}

impl CallSource for TraceFile {
    fn next_call(&mut self) -> Result<Option<Call>, TraceError> {
        if self.remaining_bytes() == 0 {
            return Ok(None);
        }
        if self.remaining_bytes() < RECORD_HEADER_SIZE {
            return Err(self.truncated(RECORD_HEADER_SIZE));
        }

        let record = &self.mmap[self.offset..];
        let no = read_u32(record, 0);
        let thread_id: Leg = read_u32(record, 4);
        let flags = CallFlags::from_bits_retain(read_u32(record, 8));
        let payload_len = read_u32(record, 12) as usize;

        let total = RECORD_HEADER_SIZE + payload_len;
        if record.len() < total {
            return Err(self.truncated(total));
        }

        if let Some(previous) = self.last_call_no {
            if no <= previous {
                return Err(TraceError::OutOfOrder {
                    previous,
                    actual: no,
                });
            }
        }

        let payload = record[RECORD_HEADER_SIZE..total].to_vec();
        self.offset += total;
        self.last_call_no = Some(no);

        Ok(Some(Call {
            no,
            thread_id,
            flags,
            payload,
        }))
    }
}

/// Trace file writer
pub struct TraceWriter<W: Write + Seek> {
    out: W,
    records: u64,
}

impl TraceWriter<File> {
    /// Create (or truncate) a trace file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, TraceError> {
        let file = File::create(path).map_err(TraceError::WriteFailed)?;
        Self::new(file)
    }
}

impl<W: Write + Seek> TraceWriter<W> {
    /// Start a trace on `out`, writing a provisional header
    pub fn new(mut out: W) -> Result<Self, TraceError> {
        out.write_all(&TraceHeader::new(0).to_bytes())
            .map_err(TraceError::WriteFailed)?;
        Ok(Self { out, records: 0 })
    }

    /// Append one call record
    pub fn write_call(&mut self, call: &Call) -> Result<(), TraceError> {
        let mut record = Vec::with_capacity(RECORD_HEADER_SIZE + call.payload.len());
        record.extend_from_slice(&call.no.to_le_bytes());
        record.extend_from_slice(&call.thread_id.to_le_bytes());
        record.extend_from_slice(&call.flags.bits().to_le_bytes());
        record.extend_from_slice(&(call.payload.len() as u32).to_le_bytes());
        record.extend_from_slice(&call.payload);
        self.out
            .write_all(&record)
            .map_err(TraceError::WriteFailed)?;
        self.records += 1;
        Ok(())
    }

    /// Patch the record count into the header and hand back the writer
    pub fn finish(mut self) -> Result<W, TraceError> {
        self.out
            .seek(SeekFrom::Start(0))
            .map_err(TraceError::WriteFailed)?;
        self.out
            .write_all(&TraceHeader::new(self.records).to_bytes())
            .map_err(TraceError::WriteFailed)?;
        self.out
            .seek(SeekFrom::End(0))
            .map_err(TraceError::WriteFailed)?;
        self.out.flush().map_err(TraceError::WriteFailed)?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    fn write_trace(calls: &[Call]) -> NamedTempFile {
        let tmp = NamedTempFile::new().unwrap();
        let mut writer = TraceWriter::new(tmp.reopen().unwrap()).unwrap();
        for call in calls {
            writer.write_call(call).unwrap();
        }
        writer.finish().unwrap();
        tmp
    }

    #[test]
    fn test_read_back_calls() {
        let calls = vec![
            Call::new(0, 0).with_payload(vec![1, 2]),
            Call::new(1, 1).with_flags(CallFlags::SWAP_RENDERTARGET),
            Call::new(5, 0)
                .with_flags(CallFlags::END_FRAME)
                .with_payload(vec![9; 40]),
        ];
        let tmp = write_trace(&calls);

        let mut trace = TraceFile::open(tmp.path()).unwrap();
        assert_eq!(trace.header().record_count, 3);

        let mut read = Vec::new();
        while let Some(call) = trace.next_call().unwrap() {
            read.push(call);
        }
        assert_eq!(read, calls);
        assert!(trace.next_call().unwrap().is_none());
    }

    #[test]
    fn test_unknown_flag_bits_survive_file() {
        let flags = CallFlags::from_bits_retain(0x100) | CallFlags::END_FRAME;
        let tmp = write_trace(&[Call::new(0, 0).with_flags(flags)]);

        let mut trace = TraceFile::open(tmp.path()).unwrap();
        let call = trace.next_call().unwrap().unwrap();
        assert_eq!(call.flags.bits(), 0x101);
        assert!(call.ends_frame());
        assert!(!call.swaps_render_target());
    }

    #[test]
    fn test_empty_trace() {
        let tmp = write_trace(&[]);
        let mut trace = TraceFile::open(tmp.path()).unwrap();
        assert_eq!(trace.header().record_count, 0);
        assert!(trace.next_call().unwrap().is_none());
    }

    #[test]
    fn test_truncated_record() {
        let mut writer = TraceWriter::new(Cursor::new(Vec::new())).unwrap();
        writer
            .write_call(&Call::new(0, 0).with_payload(vec![7; 10]))
            .unwrap();
        let mut bytes = writer.finish().unwrap().into_inner();
        bytes.truncate(bytes.len() - 4);

        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), &bytes).unwrap();

        let mut trace = TraceFile::open(tmp.path()).unwrap();
        assert!(matches!(
            trace.next_call(),
            Err(TraceError::Truncated { needed: 26, available: 22, .. })
        ));
    }

    #[test]
    fn test_out_of_order_calls() {
        let tmp = write_trace(&[Call::new(4, 0), Call::new(4, 1)]);
        let mut trace = TraceFile::open(tmp.path()).unwrap();
        assert!(trace.next_call().unwrap().is_some());
        assert!(matches!(
            trace.next_call(),
            Err(TraceError::OutOfOrder { previous: 4, actual: 4 })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            TraceFile::open("/nonexistent/trace.rlay"),
            Err(TraceError::OpenFailed { ref path, .. })
                if path == Path::new("/nonexistent/trace.rlay")
        ));
    }

    #[test]
    fn test_short_file() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), b"RLAY").unwrap();
        assert!(matches!(
            TraceFile::open(tmp.path()),
            Err(TraceError::FileTooSmall { size: 4, .. })
        ));
    }
}
