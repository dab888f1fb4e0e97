//! End-of-central-directory records: the classic EOCD, and the ZIP64
//! record + locator pair emitted ahead of it when entry count or
//! directory offsets overflow 32 bits.

use std::io::{self, Write};

use super::{END_OF_CENTRAL_DIR_SIGNATURE, VERSION_NEEDED_ZIP64, ZIP64_EOCD_LOCATOR_SIGNATURE, ZIP64_EOCD_RECORD_SIGNATURE};
use crate::platform::VERSION_MADE_BY;

/// Whether the archive as a whole needs the ZIP64 EOCD record + locator:
/// entry count at or beyond `0xFFFF`, or the central directory's size or
/// start offset at or beyond `0xFFFFFFFF`.
pub fn archive_needs_zip64(entry_count: u64, cd_size: u64, cd_start: u64) -> bool {
    entry_count >= 0xFFFF || cd_size >= u32::MAX as u64 || cd_start >= u32::MAX as u64
}

/// Writes the ZIP64 EOCD record followed immediately by the ZIP64 EOCD
/// locator. Call only when [`archive_needs_zip64`] is true, immediately
/// before [`write_eocd`].
pub fn write_zip64_eocd<W: Write>(
    writer: &mut W,
    entry_count: u64,
    cd_size: u64,
    cd_start: u64,
    zip64_eocd_offset: u64,
) -> io::Result<()> {
    // ZIP64 EOCD record: signature(4) + size field itself not counted,
    // remaining fields total 44 bytes -> field_size = 44.
    writer.write_all(&ZIP64_EOCD_RECORD_SIGNATURE.to_le_bytes())?;
    writer.write_all(&44_u64.to_le_bytes())?;
    writer.write_all(&VERSION_MADE_BY.to_le_bytes())?;
    writer.write_all(&VERSION_NEEDED_ZIP64.to_le_bytes())?;
    writer.write_all(&0_u32.to_le_bytes())?; // disk number
    writer.write_all(&0_u32.to_le_bytes())?; // disk with central dir start
    writer.write_all(&entry_count.to_le_bytes())?; // entries on this disk
    writer.write_all(&entry_count.to_le_bytes())?; // entries total
    writer.write_all(&cd_size.to_le_bytes())?;
    writer.write_all(&cd_start.to_le_bytes())?;

    writer.write_all(&ZIP64_EOCD_LOCATOR_SIGNATURE.to_le_bytes())?;
    writer.write_all(&0_u32.to_le_bytes())?; // disk with zip64 eocd record
    writer.write_all(&zip64_eocd_offset.to_le_bytes())?;
    writer.write_all(&1_u32.to_le_bytes())?; // total number of disks

    Ok(())
}

/// Writes the classic EOCD record. `entry_count`/`cd_size`/`cd_start` carry
/// the sentinel `0xFFFF`/`0xFFFFFFFF` values when the archive needed a
/// preceding ZIP64 EOCD record.
pub fn write_eocd<W: Write>(writer: &mut W, entry_count: u64, cd_size: u64, cd_start: u64) -> io::Result<()> {
    let zip64 = archive_needs_zip64(entry_count, cd_size, cd_start);
    let entry_count_field: u16 = if zip64 { 0xFFFF } else { entry_count as u16 };
    let cd_size_field: u32 = if zip64 { u32::MAX } else { cd_size as u32 };
    let cd_start_field: u32 = if zip64 { u32::MAX } else { cd_start as u32 };

    writer.write_all(&END_OF_CENTRAL_DIR_SIGNATURE.to_le_bytes())?;
    writer.write_all(&0_u16.to_le_bytes())?; // disk number
    writer.write_all(&0_u16.to_le_bytes())?; // disk with central dir start
    writer.write_all(&entry_count_field.to_le_bytes())?; // entries on this disk
    writer.write_all(&entry_count_field.to_le_bytes())?; // entries total
    writer.write_all(&cd_size_field.to_le_bytes())?;
    writer.write_all(&cd_start_field.to_le_bytes())?;
    writer.write_all(&0_u16.to_le_bytes())?; // comment length, always empty

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_archive_skips_zip64() {
        assert!(!archive_needs_zip64(10, 1000, 2000));
    }

    #[test]
    fn entry_count_at_sentinel_triggers_zip64() {
        assert!(archive_needs_zip64(0xFFFF, 0, 0));
        assert!(!archive_needs_zip64(0xFFFE, 0, 0));
    }

    #[test]
    fn eocd_uses_sentinels_when_zip64_needed() {
        let mut buf = Vec::new();
        write_eocd(&mut buf, 0x1_0000, 10, 20).unwrap();
        let entry_count = u16::from_le_bytes([buf[8], buf[9]]);
        assert_eq!(entry_count, 0xFFFF);
    }
}
