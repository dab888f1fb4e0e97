//! The single-threaded consumer: pulls assembled entries from the ordered
//! queue in submission order, writes local headers and payload bytes, and
//! emits the central directory and EOCD on close.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crossbeam_channel::Receiver;

use crate::error::CoreError;
use crate::format::central_dir::CentralDirectoryHeader;
use crate::format::eocd::{archive_needs_zip64, write_eocd, write_zip64_eocd};
use crate::format::local_header::LocalFileHeader;
use crate::planner::{AssembledEntry, Payload};

const SPLICE_COPY_BUFFER: usize = 64 * 1024;

struct PendingCdRecord {
    name: String,
    method: crate::format::CompressionMethod,
    mtime: i64,
    crc32: u32,
    csize: u64,
    usize: u64,
    local_header_offset: u64,
    external_attributes: u32,
}

/// Owns the output file exclusively. Receives one `Receiver` per entry, in
/// submission order, and blocks on each in turn, which is what gives chunk
/// compression (out of order, concurrent) a deterministic output order.
pub struct Writer {
    out: BufWriter<File>,
    output_path: PathBuf,
    position: u64,
    seen_names: HashSet<String>,
    records: Vec<PendingCdRecord>,
    closed: bool,
}

impl Writer {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref().to_path_buf();
        let file = File::options()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(CoreError::OutputIO)?;
        Ok(Self {
            out: BufWriter::new(file),
            output_path: path,
            position: 0,
            seen_names: HashSet::new(),
            records: Vec::new(),
            closed: false,
        })
    }

    /// Runs the writer loop: pulls handles off `queue` in order, blocks on
    /// each for its assembled entry, and commits it. Returns the first
    /// archive-fatal error encountered, if any; on error the caller is
    /// expected to call [`Writer::abort`].
    pub fn run(&mut self, queue: Receiver<Receiver<Result<AssembledEntry, CoreError>>>) -> Result<(), CoreError> {
        for handle in queue {
            let assembled = match handle.recv() {
                Ok(Ok(entry)) => entry,
                Ok(Err(e)) => {
                    if e.is_archive_fatal() {
                        tracing::error!(error = %e, "archive-fatal error, closing output");
                        return Err(e);
                    }
                    tracing::warn!(error = %e, "entry rejected, skipping");
                    continue;
                }
                Err(_) => {
                    return Err(CoreError::Inconsistent("planner thread dropped without a result".into()));
                }
            };
            self.commit(assembled)?;
        }
        Ok(())
    }

    fn commit(&mut self, entry: AssembledEntry) -> Result<(), CoreError> {
        let _span = tracing::info_span!("zip_commit", archive_name = %entry.archive_name).entered();

        if self.seen_names.contains(&entry.archive_name) {
            tracing::warn!(archive_name = %entry.archive_name, "duplicate name, skipping");
            return Ok(());
        }

        let local_header_offset = self.position;
        let header = LocalFileHeader {
            name: &entry.archive_name,
            method: entry.method,
            mtime: entry.mtime,
            ac_time: entry.ac_time,
            cr_time: entry.cr_time,
            crc32: entry.crc32,
            csize: entry.csize,
            usize: entry.usize,
        };
        let header_len = header.write(&mut self.out).map_err(CoreError::OutputIO)?;
        self.position += header_len;

        let payload_len = self.write_payload(entry.payload)?;
        self.position += payload_len;

        self.seen_names.insert(entry.archive_name.clone());
        self.records.push(PendingCdRecord {
            name: entry.archive_name,
            method: entry.method,
            mtime: entry.mtime,
            crc32: entry.crc32,
            csize: entry.csize,
            usize: entry.usize,
            local_header_offset,
            external_attributes: (entry.mode << 16),
        });

        Ok(())
    }

    fn write_payload(&mut self, payload: Payload) -> Result<u64, CoreError> {
        match payload {
            Payload::Chunks(chunks) => {
                let mut total = 0u64;
                for chunk in chunks {
                    self.out.write_all(&chunk).map_err(CoreError::OutputIO)?;
                    total += chunk.len() as u64;
                }
                Ok(total)
            }
            Payload::Bytes(bytes) => {
                self.out.write_all(&bytes).map_err(CoreError::OutputIO)?;
                Ok(bytes.len() as u64)
            }
            Payload::SourceRange(source, offset, length) => {
                self.out.write_all(source.range(offset, length)).map_err(CoreError::OutputIO)?;
                Ok(length as u64)
            }
            Payload::Splice(mut reader, length) => {
                let mut buf = [0u8; SPLICE_COPY_BUFFER];
                let mut remaining = length;
                while remaining > 0 {
                    let want = remaining.min(buf.len() as u64) as usize;
                    let n = reader.read(&mut buf[..want]).map_err(CoreError::SourceIO)?;
                    if n == 0 {
                        return Err(CoreError::Inconsistent("splice source ended early".into()));
                    }
                    self.out.write_all(&buf[..n]).map_err(CoreError::OutputIO)?;
                    remaining -= n as u64;
                }
                Ok(length)
            }
        }
    }

    /// Writes the central directory and EOCD (or ZIP64 EOCD + locator then
    /// EOCD) and flushes the output file.
    pub fn close(mut self) -> Result<(), CoreError> {
        let cd_start = self.position;
        let mut cd_size = 0u64;
        for record in &self.records {
            let header = CentralDirectoryHeader {
                name: &record.name,
                method: record.method,
                mtime: record.mtime,
                crc32: record.crc32,
                csize: record.csize,
                usize: record.usize,
                local_header_offset: record.local_header_offset,
                external_attributes: record.external_attributes,
            };
            cd_size += header.write(&mut self.out).map_err(CoreError::OutputIO)?;
        }

        let entry_count = self.records.len() as u64;
        if archive_needs_zip64(entry_count, cd_size, cd_start) {
            write_zip64_eocd(&mut self.out, entry_count, cd_size, cd_start, cd_start + cd_size)
                .map_err(CoreError::OutputIO)?;
        }
        write_eocd(&mut self.out, entry_count, cd_size, cd_start).map_err(CoreError::OutputIO)?;
        self.out.flush().map_err(CoreError::OutputIO)?;
        self.closed = true;
        Ok(())
    }

    /// Drops the output without completing the central directory and
    /// removes the partially written file.
    pub fn abort(self) {
        let path = self.output_path.clone();
        drop(self);
        let _ = std::fs::remove_file(path);
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        if !self.closed {
            // best-effort: if `close` was never called and `abort` didn't
            // already remove the file, leave cleanup to the caller driving
            // the Archive state machine. Nothing to do here but avoid a
            // panic on an unflushed buffer.
            let _ = self.out.flush();
        }
    }
}
