//! Parallel ZIP archive assembly: partitions each entry's payload into
//! chunks, compresses them concurrently across a worker pool, and stitches
//! the results into a single bit-exact ZIP file with a correct central
//! directory (including ZIP64 escalation), all while writing entries in
//! submission order.
//!
//! Splicing entries from an existing archive (see [`SourceArchive`]) copies
//! their compressed bytes through verbatim, with no recompression.

mod budget;
mod chooser;
mod compressor;
mod crc;
mod entry;
mod error;
mod format;
mod job;
mod level;
mod platform;
mod planner;
mod splice;
mod writer;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

pub use chooser::{Chooser, Decision, Rule};
pub use entry::{EntrySource, Mode, PendingEntry, SpliceMethod};
pub use error::{CoreError, Result};
pub use level::{CompressionLevel, InvalidCompressionLevel};
pub use splice::{PrecompressedEntry, SourceArchive};

#[cfg(feature = "zstd")]
pub use level::ZstdLevel;

use planner::{AssembledEntry, PlannerConfig};

const DEFAULT_DEFLATE_CHUNK_SIZE: usize = 256 * 1024;
const DEFAULT_ZSTD_CHUNK_SIZE: usize = 1024 * 1024;
const DEFAULT_OPEN_FILE_BUDGET: u64 = 16;

/// Configuration accepted by [`open_archive`]. Construct with
/// [`ArchiveOptions::default`] and adjust with the `with_*` builders.
pub struct ArchiveOptions {
    pub threads: usize,
    pub open_file_budget: u64,
    pub byte_budget: u64,
    pub chooser: Chooser,
    pub deflate_chunk_size: usize,
    pub zstd_chunk_size: usize,
}

impl ArchiveOptions {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_open_file_budget(mut self, budget: u64) -> Self {
        self.open_file_budget = budget;
        self
    }

    pub fn with_byte_budget(mut self, budget: u64) -> Self {
        self.byte_budget = budget;
        self
    }

    pub fn with_chooser(mut self, chooser: Chooser) -> Self {
        self.chooser = chooser;
        self
    }

    pub fn with_deflate_chunk_size(mut self, size: usize) -> Self {
        self.deflate_chunk_size = size;
        self
    }

    pub fn with_zstd_chunk_size(mut self, size: usize) -> Self {
        self.zstd_chunk_size = size;
        self
    }
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        let threads = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            threads,
            open_file_budget: DEFAULT_OPEN_FILE_BUDGET,
            byte_budget: 4 * DEFAULT_DEFLATE_CHUNK_SIZE as u64 * threads as u64,
            chooser: Chooser::default(),
            deflate_chunk_size: DEFAULT_DEFLATE_CHUNK_SIZE,
            zstd_chunk_size: DEFAULT_ZSTD_CHUNK_SIZE,
        }
    }
}

type EntryHandle = Receiver<std::result::Result<AssembledEntry, CoreError>>;

/// A ZIP archive being assembled. One producer (this handle), a pool of
/// compressor workers, and one Writer thread draining entries in
/// submission order.
pub struct Archive {
    pool: Arc<rayon::ThreadPool>,
    budgets: Arc<budget::Budgets>,
    planner_config: Arc<PlannerConfig>,
    entry_queue_tx: Option<Sender<EntryHandle>>,
    writer_thread: Option<JoinHandle<std::result::Result<(), CoreError>>>,
    next_entry_id: AtomicU64,
}

/// Opens a new archive at `path`. The path must not already exist: this
/// engine only ever creates new archives, never appends to or overwrites
/// one.
pub fn open_archive(path: impl AsRef<Path>, options: ArchiveOptions) -> Result<Archive> {
    let writer = writer::Writer::create(path)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads.max(1))
        .build()
        .map_err(|e| CoreError::Inconsistent(e.to_string()))?;

    let budgets = budget::Budgets::new(options.open_file_budget.max(1), options.byte_budget.max(1));
    let planner_config = PlannerConfig {
        deflate_chunk_size: options.deflate_chunk_size,
        zstd_chunk_size: options.zstd_chunk_size,
        chooser: Arc::new(options.chooser),
    };

    let queue_depth = options.threads.max(1) * 4;
    let (tx, rx) = crossbeam_channel::bounded::<EntryHandle>(queue_depth);

    let writer_thread = std::thread::spawn(move || {
        let mut writer = writer;
        match writer.run(rx) {
            Ok(()) => writer.close(),
            Err(e) => {
                writer.abort();
                Err(e)
            }
        }
    });

    Ok(Archive {
        pool: Arc::new(pool),
        budgets: Arc::new(budgets),
        planner_config: Arc::new(planner_config),
        entry_queue_tx: Some(tx),
        writer_thread: Some(writer_thread),
        next_entry_id: AtomicU64::new(0),
    })
}

impl Archive {
    /// Submits an entry for compression and eventual writing. Returns once
    /// the entry has been handed to a planning thread; this does not wait
    /// for compression or disk I/O. Submission itself can block if the
    /// internal entry queue is at capacity (the Writer is behind).
    pub fn write(&self, entry: PendingEntry) -> Result<()> {
        let entry_id = self.next_entry_id.fetch_add(1, Ordering::Relaxed);
        let handle = planner::spawn_plan_entry(
            entry_id,
            entry,
            self.planner_config.clone(),
            self.budgets.clone(),
            self.pool.clone(),
        );
        self.send_handle(handle)
    }

    /// Splices a pre-compressed entry from an existing archive in byte-exact,
    /// with no recompression and no CRC recomputation. See [`SourceArchive`].
    #[allow(clippy::too_many_arguments)]
    pub fn enqueue_precompressed(
        &self,
        name: String,
        method: SpliceMethod,
        source: Arc<dyn SourceArchive>,
        source_offset: u64,
        csize: u64,
        usize: u64,
        crc32: u32,
        mtime: i64,
        mode: Mode,
    ) -> Result<()> {
        let handle = splice::enqueue_precompressed(name, method, source, source_offset, csize, usize, crc32, mtime, mode);
        self.send_handle(handle)
    }

    fn send_handle(&self, handle: EntryHandle) -> Result<()> {
        self.entry_queue_tx
            .as_ref()
            .expect("entry queue only torn down by close(), which consumes self")
            .send(handle)
            .map_err(|_| CoreError::Inconsistent("writer thread is no longer accepting entries".into()))
    }

    /// Waits for all submitted entries to drain, writes the central
    /// directory and EOCD, and returns the first archive-fatal error
    /// encountered, if any. On error the output path no longer exists.
    pub fn close(mut self) -> Result<()> {
        drop(self.entry_queue_tx.take());
        match self.writer_thread.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(CoreError::Inconsistent("writer thread panicked".into()))),
            None => Ok(()),
        }
    }
}
