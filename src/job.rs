//! Chunk-level work items dispatched to the compressor pool, and their
//! results.

use std::sync::Arc;

use memmap2::Mmap;

use crate::level::CompressionLevel;

/// A view onto an entry's source bytes shared across all of its chunk jobs.
/// Memory-mapped files and in-memory blobs are handled uniformly once
/// wrapped here.
#[derive(Clone)]
pub enum SourceRef {
    Mmap(Arc<Mmap>),
    Owned(Arc<Vec<u8>>),
}

impl SourceRef {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            SourceRef::Mmap(map) => &map[..],
            SourceRef::Owned(bytes) => &bytes[..],
        }
    }

    pub fn range(&self, offset: usize, length: usize) -> &[u8] {
        &self.as_slice()[offset..offset + length]
    }
}

/// How a chunk's bytes should be turned into archive payload bytes.
#[derive(Debug, Clone, Copy)]
pub enum ChunkMethod {
    Store,
    Deflate {
        level: CompressionLevel,
        is_final: bool,
    },
}

/// One unit of dispatchable compression work: a byte range of one entry's
/// source, plus enough context for the result to be reassembled in order.
pub struct ChunkJob {
    pub entry_id: u64,
    pub chunk_index: u32,
    pub source: SourceRef,
    pub offset: usize,
    pub length: usize,
    pub method: ChunkMethod,
}

/// The output of compressing one [`ChunkJob`].
pub struct ChunkResult {
    pub entry_id: u64,
    pub chunk_index: u32,
    pub compressed: Vec<u8>,
    pub crc32: u32,
    pub uncompressed_len: u64,
}

impl ChunkJob {
    pub fn run(self) -> Result<ChunkResult, crate::error::CoreError> {
        let bytes = self.source.range(self.offset, self.length);
        let crc32 = crate::crc::crc32(bytes);
        let compressed = match self.method {
            ChunkMethod::Store => bytes.to_vec(),
            ChunkMethod::Deflate { level, is_final } => {
                crate::compressor::deflate_chunk(bytes, level, is_final)?
            }
        };
        Ok(ChunkResult {
            entry_id: self.entry_id,
            chunk_index: self.chunk_index,
            compressed,
            crc32,
            uncompressed_len: self.length as u64,
        })
    }
}
