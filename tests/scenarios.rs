use std::io::{Read, Write};
use std::sync::Arc;

use tempfile::tempdir;
use zipforge::{open_archive, ArchiveOptions, PendingEntry, PrecompressedEntry, SourceArchive, SpliceMethod};

fn read_back(path: &std::path::Path) -> zip::ZipArchive<std::fs::File> {
    let file = std::fs::File::open(path).expect("open output archive");
    zip::ZipArchive::new(file).expect("parse output archive as a valid zip")
}

#[test]
fn scenario1_small_text_entry() {
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("out.zip");

    let archive = open_archive(&out_path, ArchiveOptions::default()).unwrap();
    archive
        .write(
            PendingEntry::from_blob("hello.txt", b"hello".to_vec())
                .unwrap()
                .with_mtime(315_532_800)
                .with_mode(0o100644),
        )
        .unwrap();
    archive.close().unwrap();

    let mut zip = read_back(&out_path);
    assert_eq!(zip.len(), 1);
    let mut entry = zip.by_name("hello.txt").unwrap();
    assert_eq!(entry.size(), 5);
    let mut contents = Vec::new();
    entry.read_to_end(&mut contents).unwrap();
    assert_eq!(contents, b"hello");
    assert_eq!(entry.crc32(), 0x3610_a686);
}

#[test]
fn scenario2_submission_order_preserved() {
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("out.zip");

    let archive = open_archive(&out_path, ArchiveOptions::default()).unwrap();
    // "b" is much smaller and likely finishes compressing before "a".
    archive
        .write(PendingEntry::from_blob("a", vec![b'x'; 2_000_000]).unwrap())
        .unwrap();
    archive.write(PendingEntry::from_blob("b", vec![b'y'; 16]).unwrap()).unwrap();
    archive.close().unwrap();

    let zip = read_back(&out_path);
    let names: Vec<&str> = zip.file_names().collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn scenario3_duplicate_name_keeps_first() {
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("out.zip");

    let archive = open_archive(&out_path, ArchiveOptions::default()).unwrap();
    archive.write(PendingEntry::from_blob("x", b"first".to_vec()).unwrap()).unwrap();
    archive.write(PendingEntry::from_blob("x", b"second".to_vec()).unwrap()).unwrap();
    archive.close().unwrap();

    let mut zip = read_back(&out_path);
    assert_eq!(zip.len(), 1);
    let mut entry = zip.by_name("x").unwrap();
    let mut contents = Vec::new();
    entry.read_to_end(&mut contents).unwrap();
    assert_eq!(contents, b"first");
}

#[test]
fn scenario5_splice_is_byte_exact() {
    struct FixedSource {
        bytes: Vec<u8>,
        crc32: u32,
    }

    impl SourceArchive for FixedSource {
        fn entries(&self) -> Vec<PrecompressedEntry> {
            vec![PrecompressedEntry {
                name: "blob".to_string(),
                method: SpliceMethod::Store,
                crc32: self.crc32,
                csize: self.bytes.len() as u64,
                usize: self.bytes.len() as u64,
                offset: 0,
                mtime: 0,
                mode: 0o100644,
            }]
        }

        fn open_range(&self, offset: u64, length: u64) -> std::io::Result<Box<dyn Read + Send>> {
            let start = offset as usize;
            let end = start + length as usize;
            Ok(Box::new(std::io::Cursor::new(self.bytes[start..end].to_vec())))
        }
    }

    let bytes = b"0123456789".to_vec();
    let crc32 = crc32fast::hash(&bytes);
    let source = Arc::new(FixedSource { bytes: bytes.clone(), crc32 });

    let dir = tempdir().unwrap();
    let out_path = dir.path().join("out.zip");
    let archive = open_archive(&out_path, ArchiveOptions::default()).unwrap();

    let meta = &source.entries()[0];
    archive
        .enqueue_precompressed(
            meta.name.clone(),
            meta.method,
            source.clone(),
            meta.offset,
            meta.csize,
            meta.usize,
            meta.crc32,
            meta.mtime,
            meta.mode,
        )
        .unwrap();
    archive.close().unwrap();

    let mut zip = read_back(&out_path);
    let mut entry = zip.by_name("blob").unwrap();
    assert_eq!(entry.crc32(), crc32);
    let mut contents = Vec::new();
    entry.read_to_end(&mut contents).unwrap();
    assert_eq!(contents, bytes);
}

#[test]
fn scenario6_many_empty_entries_trigger_zip64_entry_count() {
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("out.zip");

    let archive = open_archive(&out_path, ArchiveOptions::default()).unwrap();
    for i in 0..70_000u32 {
        archive.write(PendingEntry::from_blob(format!("f{i}"), Vec::new()).unwrap()).unwrap();
    }
    archive.close().unwrap();

    let zip = read_back(&out_path);
    assert_eq!(zip.len(), 70_000);
}

#[test]
fn zero_length_entry_is_stored_with_zero_crc() {
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("out.zip");

    let archive = open_archive(&out_path, ArchiveOptions::default()).unwrap();
    archive.write(PendingEntry::from_blob("empty.bin", Vec::new()).unwrap()).unwrap();
    archive.close().unwrap();

    let mut zip = read_back(&out_path);
    let entry = zip.by_name("empty.bin").unwrap();
    assert_eq!(entry.size(), 0);
    assert_eq!(entry.crc32(), 0);
}

#[test]
fn pre_existing_output_path_is_rejected() {
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("out.zip");
    std::fs::File::create(&out_path).unwrap().write_all(b"not a zip").unwrap();

    let result = open_archive(&out_path, ArchiveOptions::default());
    assert!(result.is_err());
}

#[test]
fn large_file_round_trips_across_multiple_chunks() {
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("out.zip");

    // Several times the default chunk size, so the entry is split across
    // more than one compressed chunk.
    let payload: Vec<u8> = (0..3_000_000u32).map(|i| (i % 251) as u8).collect();

    let archive = open_archive(&out_path, ArchiveOptions::default().with_deflate_chunk_size(64 * 1024)).unwrap();
    archive.write(PendingEntry::from_blob("big.bin", payload.clone()).unwrap()).unwrap();
    archive.close().unwrap();

    let mut zip = read_back(&out_path);
    let mut entry = zip.by_name("big.bin").unwrap();
    let mut contents = Vec::new();
    entry.read_to_end(&mut contents).unwrap();
    assert_eq!(contents, payload);
    assert_eq!(entry.crc32(), crc32fast::hash(&payload));
}
