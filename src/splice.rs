//! Splicing pre-compressed entries from an existing archive without
//! recompression. The core never parses a central directory itself; it
//! trusts whatever implements [`SourceArchive`] to hand back correct
//! offsets and sizes.

use std::io::{self, Read};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver};

use crate::entry::{validate_archive_name, Mode, SpliceMethod};
use crate::error::CoreError;
use crate::format::CompressionMethod;
use crate::planner::{AssembledEntry, Payload};

/// Metadata for one entry available to splice out of a [`SourceArchive`].
/// `offset` is the byte position, within whatever `open_range` addresses,
/// where this entry's compressed stream begins (no local-header bytes).
#[derive(Debug, Clone)]
pub struct PrecompressedEntry {
    pub name: String,
    pub method: SpliceMethod,
    pub crc32: u32,
    pub csize: u64,
    pub usize: u64,
    pub offset: u64,
    pub mtime: i64,
    pub mode: Mode,
}

/// An existing archive (or any byte-range source) that entries can be
/// spliced out of verbatim.
pub trait SourceArchive: Send + Sync {
    /// Lists the entries available to splice, with their byte offsets.
    fn entries(&self) -> Vec<PrecompressedEntry>;

    /// Opens a reader over exactly `length` bytes starting at `offset`.
    /// Must return precisely that many bytes with no local-header framing.
    fn open_range(&self, offset: u64, length: u64) -> io::Result<Box<dyn Read + Send>>;
}

fn method_to_format(method: SpliceMethod) -> CompressionMethod {
    match method {
        SpliceMethod::Store => CompressionMethod::Store,
        SpliceMethod::Deflate => CompressionMethod::Deflate,
        SpliceMethod::Zstd => CompressionMethod::Zstd,
    }
}

/// Builds a ready-made [`AssembledEntry`] for a spliced entry and wraps it
/// in the same one-shot-receiver shape the planner uses, so the Writer's
/// ordered queue doesn't need to distinguish splice from fresh entries.
#[allow(clippy::too_many_arguments)]
pub fn enqueue_precompressed(
    name: String,
    method: SpliceMethod,
    source: Arc<dyn SourceArchive>,
    source_offset: u64,
    csize: u64,
    usize: u64,
    crc32: u32,
    mtime: i64,
    mode: Mode,
) -> Receiver<Result<AssembledEntry, CoreError>> {
    let (tx, rx) = bounded(1);
    let result = (|| -> Result<AssembledEntry, CoreError> {
        validate_archive_name(&name)?;
        let reader = source.open_range(source_offset, csize).map_err(CoreError::SourceIO)?;
        Ok(AssembledEntry::spliced(
            name,
            method_to_format(method),
            crc32,
            csize,
            usize,
            mtime,
            mode,
            Payload::Splice(reader, csize),
        ))
    })();
    let _ = tx.send(result);
    rx
}
