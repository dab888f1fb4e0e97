//! Pure encoders for the ZIP wire format: local file headers, central
//! directory headers, extra fields, and the end-of-central-directory
//! records. Nothing here touches I/O directly; every function takes a
//! `&mut impl Write` the way the teacher's `to_bytes_*` methods do.

pub mod central_dir;
pub mod eocd;
pub mod extra_field;
pub mod local_header;

pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
pub const CENTRAL_DIR_HEADER_SIGNATURE: u32 = 0x0201_4b50;
pub const END_OF_CENTRAL_DIR_SIGNATURE: u32 = 0x0605_4b50;
pub const ZIP64_EOCD_RECORD_SIGNATURE: u32 = 0x0606_4b50;
pub const ZIP64_EOCD_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;

pub const VERSION_NEEDED_DEFAULT: u16 = 20;
pub const VERSION_NEEDED_ZIP64: u16 = 45;

/// Compression method codes stored in the header's `compression` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Store = 0,
    Deflate = 8,
    Zstd = 93,
}

impl CompressionMethod {
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Converts a signed Unix timestamp into MS-DOS date/time fields, rounded
/// down to an even second, clamped to the representable range
/// (1980-01-01..2107-12-31). Out-of-range values clamp to the epoch date.
pub fn unix_time_to_dos(mtime: i64) -> (u16, u16) {
    use chrono::{Datelike, TimeZone, Timelike, Utc};

    let Some(dt) = Utc.timestamp_opt(mtime, 0).single() else {
        return (0x21, 0);
    };

    let year = dt.year();
    if !(1980..=2107).contains(&year) {
        return (0x21, 0);
    }

    let dos_date = (((year - 1980) as u16) << 9) | ((dt.month() as u16) << 5) | (dt.day() as u16);
    let seconds = dt.second() / 2;
    let dos_time = ((dt.hour() as u16) << 11) | ((dt.minute() as u16) << 5) | (seconds as u16);

    (dos_date, dos_time)
}

/// Whether any of an entry's 64-bit quantities require the ZIP64 extra
/// field (any of them hits the 32-bit sentinel value).
pub fn needs_zip64(usize_: u64, csize: u64, local_header_offset: u64) -> bool {
    usize_ >= u32::MAX as u64 || csize >= u32::MAX as u64 || local_header_offset >= u32::MAX as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_before_1980_clamps() {
        assert_eq!(unix_time_to_dos(0), (0x21, 0));
    }

    #[test]
    fn known_date_round_trips_fields() {
        // 2021-01-01 00:00:00 UTC
        let (date, time) = unix_time_to_dos(1_609_459_200);
        let year = (date >> 9) + 1980;
        let month = (date >> 5) & 0xf;
        let day = date & 0x1f;
        assert_eq!((year, month, day), (2021, 1, 1));
        assert_eq!(time, 0);
    }

    #[test]
    fn needs_zip64_detects_each_field() {
        assert!(needs_zip64(u32::MAX as u64, 0, 0));
        assert!(needs_zip64(0, u32::MAX as u64, 0));
        assert!(needs_zip64(0, 0, u32::MAX as u64));
        assert!(!needs_zip64(100, 50, 0));
    }
}
