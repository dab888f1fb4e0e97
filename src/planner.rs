//! Entry planning: turns a [`PendingEntry`] into an [`AssembledEntry`] by
//! sniffing, choosing a compression method, partitioning into chunks,
//! dispatching them to the compressor pool, and reassembling the results in
//! order.
//!
//! Planning for one entry runs on a dedicated `std::thread`, not on the
//! rayon pool: it blocks on a channel waiting for chunk results, and if the
//! pool has only one worker thread, scheduling the wait itself onto that
//! pool would deadlock against the chunk jobs it's waiting on.

use std::fs::File;
use std::io::Read;
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver};
use memmap2::Mmap;

use crate::budget::{BudgetGuard, Budgets};
use crate::chooser::{Chooser, Decision};
use crate::crc;
use crate::entry::{validate_archive_name, EntrySource, PendingEntry};
use crate::error::CoreError;
use crate::format::CompressionMethod;
use crate::job::{ChunkJob, ChunkMethod, ChunkResult, SourceRef};
use crate::level::CompressionLevel;
use crate::platform;

const SNIFF_LEN: usize = 16 * 1024;

/// Where an assembled entry's payload bytes live.
pub enum Payload {
    /// Ordered, already-compressed chunks (raw deflate fragments) to be
    /// written back to back.
    Chunks(Vec<Vec<u8>>),
    /// A single buffer (zstd frame, or a downgraded/tiny stored copy).
    Bytes(Vec<u8>),
    /// A byte range of the (possibly memory-mapped) source, written
    /// without copying into an intermediate buffer until write time.
    SourceRange(SourceRef, usize, usize),
    /// A splice transfer: a reader over a source archive's compressed
    /// bytes, copied through a bounded buffer without recompression.
    Splice(Box<dyn Read + Send>, u64),
}

/// A fully planned entry, ready for the Writer.
pub struct AssembledEntry {
    pub archive_name: String,
    pub method: CompressionMethod,
    pub crc32: u32,
    pub csize: u64,
    pub usize: u64,
    pub mtime: i64,
    pub ac_time: Option<i64>,
    pub cr_time: Option<i64>,
    pub mode: u32,
    pub payload: Payload,
    /// Budget reservations kept alive until the Writer is done with this
    /// entry, then released on drop.
    _guards: Vec<BudgetGuard>,
}

impl AssembledEntry {
    /// Builds an assembled entry with no budget reservations attached, for
    /// the splice path (which holds no open-file or in-flight-byte budget:
    /// the splice reader is opened lazily and copied through a fixed-size
    /// buffer, not memory-mapped).
    #[allow(clippy::too_many_arguments)]
    pub fn spliced(
        archive_name: String,
        method: CompressionMethod,
        crc32: u32,
        csize: u64,
        usize: u64,
        mtime: i64,
        mode: u32,
        payload: Payload,
    ) -> Self {
        Self {
            archive_name,
            method,
            crc32,
            csize,
            usize,
            mtime,
            ac_time: None,
            cr_time: None,
            mode,
            payload,
            _guards: Vec::new(),
        }
    }
}

/// Per-entry tuning the Archive's options feed into the planner.
pub struct PlannerConfig {
    pub deflate_chunk_size: usize,
    #[cfg_attr(not(feature = "zstd"), allow(dead_code))]
    pub zstd_chunk_size: usize,
    pub chooser: Arc<Chooser>,
}

struct Compressed {
    method: CompressionMethod,
    csize: u64,
    crc32: u32,
    payload: Payload,
    guards: Vec<BudgetGuard>,
}

/// Spawns the dedicated planning thread for one entry and returns a
/// one-shot receiver the Writer will eventually pull from, in submission
/// order.
pub fn spawn_plan_entry(
    entry_id: u64,
    entry: PendingEntry,
    config: Arc<PlannerConfig>,
    budgets: Arc<Budgets>,
    pool: Arc<rayon::ThreadPool>,
) -> Receiver<Result<AssembledEntry, CoreError>> {
    let (tx, rx) = bounded(1);
    std::thread::spawn(move || {
        let result = plan_entry(entry_id, entry, &config, &budgets, &pool);
        let _ = tx.send(result);
    });
    rx
}

fn plan_entry(
    entry_id: u64,
    entry: PendingEntry,
    config: &PlannerConfig,
    budgets: &Budgets,
    pool: &rayon::ThreadPool,
) -> Result<AssembledEntry, CoreError> {
    let _span = tracing::info_span!("zip_entry", archive_name = %entry.archive_name).entered();
    validate_archive_name(&entry.archive_name)?;
    let mut guards = Vec::new();

    let (source, usize_, mtime, ac_time, cr_time, mode) = match entry.source {
        EntrySource::FilePath(path) => {
            guards.push(BudgetGuard::acquire(budgets.open_files.clone(), 1));
            let file = File::open(&path).map_err(CoreError::SourceIO)?;
            let metadata = file.metadata().map_err(CoreError::SourceIO)?;
            let len = metadata.len() as usize;
            let source_ref = if len == 0 {
                SourceRef::Owned(Arc::new(Vec::new()))
            } else {
                // SAFETY: the file is not concurrently truncated by this
                // process; an external truncation mid-map surfaces as a
                // `SourceIO` failure on the later read, not UB here.
                let mmap = unsafe { Mmap::map(&file) }.map_err(CoreError::SourceIO)?;
                SourceRef::Mmap(Arc::new(mmap))
            };
            let times = platform::times_from_fs(&metadata);
            let mtime = entry.mtime.or(times.mtime).unwrap_or(0);
            let mode = entry.mode.unwrap_or_else(|| platform::attributes_from_fs(&metadata));
            (source_ref, len, mtime, times.atime, times.ctime, mode)
        }
        EntrySource::Blob(bytes) => {
            let len = bytes.len();
            let mtime = entry.mtime.unwrap_or(0);
            let mode = entry.mode.unwrap_or(platform::DEFAULT_UNIX_FILE_ATTRS);
            (SourceRef::Owned(Arc::new(bytes)), len, mtime, None, None, mode)
        }
    };

    if usize_ == 0 {
        return Ok(AssembledEntry {
            archive_name: entry.archive_name,
            method: CompressionMethod::Store,
            crc32: 0,
            csize: 0,
            usize: 0,
            mtime,
            ac_time,
            cr_time,
            mode,
            payload: Payload::Bytes(Vec::new()),
            _guards: guards,
        });
    }

    let sample_len = usize_.min(SNIFF_LEN);
    let decision = config.chooser.decide(&entry.archive_name, source.range(0, sample_len));

    let mut compressed = match decision {
        Decision::Store => store_entry(&source, usize_),
        Decision::Deflate(level) => plan_deflate(entry_id, &source, usize_, level, config, budgets, pool)?,
        #[cfg(feature = "zstd")]
        Decision::Zstd(level) => plan_zstd(&source, usize_, level, config, budgets)?,
    };

    if compressed.method != CompressionMethod::Store
        && Chooser::downgrade_if_ineffective(compressed.csize, usize_ as u64)
    {
        tracing::warn!(archive_name = %entry.archive_name, usize_, csize = compressed.csize, "downgrading entry to store");
        compressed = store_entry(&source, usize_);
    }

    guards.extend(compressed.guards);

    Ok(AssembledEntry {
        archive_name: entry.archive_name,
        method: compressed.method,
        crc32: compressed.crc32,
        csize: compressed.csize,
        usize: usize_ as u64,
        mtime,
        ac_time,
        cr_time,
        mode,
        payload: compressed.payload,
        _guards: guards,
    })
}

fn store_entry(source: &SourceRef, usize_: usize) -> Compressed {
    Compressed {
        method: CompressionMethod::Store,
        csize: usize_ as u64,
        crc32: crc::crc32(source.range(0, usize_)),
        payload: Payload::SourceRange(source.clone(), 0, usize_),
        guards: Vec::new(),
    }
}

fn plan_deflate(
    entry_id: u64,
    source: &SourceRef,
    usize_: usize,
    level: CompressionLevel,
    config: &PlannerConfig,
    budgets: &Budgets,
    pool: &rayon::ThreadPool,
) -> Result<Compressed, CoreError> {
    let chunk_size = config.deflate_chunk_size.max(1);
    let chunk_count = usize_.div_ceil(chunk_size);
    let (result_tx, result_rx) = bounded::<Result<ChunkResult, CoreError>>(chunk_count);
    let mut guards = Vec::with_capacity(chunk_count);

    for chunk_index in 0..chunk_count {
        let offset = chunk_index * chunk_size;
        let length = chunk_size.min(usize_ - offset);
        let is_final = chunk_index + 1 == chunk_count;

        guards.push(BudgetGuard::acquire(budgets.in_flight_bytes.clone(), length as u64));

        let job = ChunkJob {
            entry_id,
            chunk_index: chunk_index as u32,
            source: source.clone(),
            offset,
            length,
            method: ChunkMethod::Deflate { level, is_final },
        };
        let tx = result_tx.clone();
        pool.spawn(move || {
            let _span = tracing::debug_span!("zip_chunk", entry_id, chunk_index = job.chunk_index).entered();
            let _ = tx.send(job.run());
        });
    }
    drop(result_tx);

    let mut results: Vec<Option<ChunkResult>> = (0..chunk_count).map(|_| None).collect();
    for _ in 0..chunk_count {
        let result = result_rx
            .recv()
            .map_err(|_| CoreError::Inconsistent("chunk channel closed early".into()))??;
        let idx = result.chunk_index as usize;
        results[idx] = Some(result);
    }

    let mut chunks = Vec::with_capacity(chunk_count);
    let mut crc_parts = Vec::with_capacity(chunk_count);
    let mut csize = 0u64;
    for slot in results {
        let result = slot.ok_or_else(|| CoreError::Inconsistent("missing chunk result".into()))?;
        csize += result.compressed.len() as u64;
        crc_parts.push((result.crc32, result.uncompressed_len));
        chunks.push(result.compressed);
    }

    Ok(Compressed {
        method: CompressionMethod::Deflate,
        csize,
        crc32: crc::combine_ordered(crc_parts),
        payload: Payload::Chunks(chunks),
        guards,
    })
}

#[cfg(feature = "zstd")]
fn plan_zstd(
    source: &SourceRef,
    usize_: usize,
    level: crate::level::ZstdLevel,
    config: &PlannerConfig,
    budgets: &Budgets,
) -> Result<Compressed, CoreError> {
    // zstd compresses the whole entry as one frame (not chunk-combinable
    // like sync-flush deflate), but the in-flight-byte budget still has to
    // be acquired in bounded steps: reserving `usize_` in one call can ask
    // for more than the semaphore's total capacity ever holds, which would
    // block the planning thread forever. `zstd_chunk_size` bounds each step.
    let step_size = config.zstd_chunk_size.max(1);
    let mut guards = Vec::with_capacity(usize_.div_ceil(step_size));
    let mut acquired = 0usize;
    while acquired < usize_ {
        let step = step_size.min(usize_ - acquired);
        guards.push(BudgetGuard::acquire(budgets.in_flight_bytes.clone(), step as u64));
        acquired += step;
    }

    let bytes = source.range(0, usize_);
    let crc32 = crc::crc32(bytes);
    let compressed = crate::compressor::zstd_entry(bytes, level)?;
    Ok(Compressed {
        method: CompressionMethod::Zstd,
        csize: compressed.len() as u64,
        crc32,
        payload: Payload::Bytes(compressed),
        guards,
    })
}
