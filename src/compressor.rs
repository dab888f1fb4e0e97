//! Stateless chunk compression: turns a byte slice into a raw (headerless)
//! compressed stream fragment. Each call constructs its own encoder state,
//! matching the no-cross-chunk-back-references requirement: a chunk's
//! compressed bytes never depend on any other chunk's content, only on its
//! position (first/middle chunks sync-flush, the last chunk finishes the
//! stream).

use flate2::{Compress, Compression, FlushCompress, Status};

use crate::error::CoreError;
use crate::level::CompressionLevel;

/// Compresses one chunk of a DEFLATE-compressed entry.
///
/// `is_final` selects the flush mode: `Sync` emits a byte-aligned block
/// boundary with no output held back, so the next chunk's bytes can be
/// appended directly; `Finish` terminates the deflate stream with the final
/// block marker. Concatenating chunk outputs for a given entry, in
/// `chunk_index` order, with exactly one final chunk, yields a single valid
/// deflate stream.
pub fn deflate_chunk(input: &[u8], level: CompressionLevel, is_final: bool) -> Result<Vec<u8>, CoreError> {
    let flush = if is_final {
        FlushCompress::Finish
    } else {
        FlushCompress::Sync
    };
    let mut compress = Compress::new(Compression::from(level), false);
    run_compress(&mut compress, input, flush)
}

fn run_compress(compress: &mut Compress, input: &[u8], flush: FlushCompress) -> Result<Vec<u8>, CoreError> {
    let mut output = Vec::with_capacity(input.len() + 64);
    let mut buf = [0u8; 64 * 1024];

    loop {
        let offset = compress.total_in() as usize;
        let before_out = compress.total_out();
        let status = compress
            .compress(&input[offset..], &mut buf, flush)
            .map_err(|e| CoreError::CompressorError(e.to_string()))?;
        let written = (compress.total_out() - before_out) as usize;
        output.extend_from_slice(&buf[..written]);

        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                let consumed_all = compress.total_in() as usize >= input.len();
                if consumed_all && written == 0 {
                    break;
                }
            }
        }
    }

    Ok(output)
}

/// Compresses an entire entry's bytes as a single zstd frame. zstd frames
/// aren't sync-flush-combinable the way raw deflate blocks are, so this is
/// only used when an entry is small enough to compress as one unit (see the
/// planner's chunking decision).
#[cfg(feature = "zstd")]
pub fn zstd_entry(input: &[u8], level: crate::level::ZstdLevel) -> Result<Vec<u8>, CoreError> {
    zstd::bulk::compress(input, level.get()).map_err(|e| CoreError::CompressorError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::bufread::DeflateDecoder;
    use std::io::Read;

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut decoder = DeflateDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn single_final_chunk_round_trips() {
        let input = b"hello world, this is a deflate round trip test".repeat(20);
        let compressed = deflate_chunk(&input, CompressionLevel::balanced(), true).unwrap();
        assert_eq!(inflate(&compressed), input);
    }

    #[test]
    fn concatenated_sync_flush_chunks_round_trip() {
        let level = CompressionLevel::balanced();
        let a = b"the quick brown fox ".repeat(100);
        let b = b"jumps over the lazy dog ".repeat(100);

        let mut stream = deflate_chunk(&a, level, false).unwrap();
        stream.extend(deflate_chunk(&b, level, true).unwrap());

        let mut expected = a.clone();
        expected.extend_from_slice(&b);
        assert_eq!(inflate(&stream), expected);
    }

    #[test]
    fn empty_final_chunk_is_valid_empty_stream() {
        let compressed = deflate_chunk(&[], CompressionLevel::none(), true).unwrap();
        assert_eq!(inflate(&compressed), Vec::<u8>::new());
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn zstd_entry_round_trips() {
        let input = b"zstandard round trip payload".repeat(50);
        let compressed = zstd_entry(&input, crate::level::ZstdLevel::balanced()).unwrap();
        let decompressed = zstd::bulk::decompress(&compressed, input.len() * 2).unwrap();
        assert_eq!(decompressed, input);
    }
}
