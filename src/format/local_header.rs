//! The local file header that precedes each entry's payload.

use std::io::{self, Write};

use super::extra_field::{ExtraField, ExtraFields};
use super::{needs_zip64, unix_time_to_dos, CompressionMethod, LOCAL_FILE_HEADER_SIGNATURE, VERSION_NEEDED_DEFAULT, VERSION_NEEDED_ZIP64};
use crate::entry::needs_utf8_flag;

/// Everything the Writer knows about an entry at the moment it commits the
/// local header: source metadata plus the final compression outcome.
pub struct LocalFileHeader<'a> {
    pub name: &'a str,
    pub method: CompressionMethod,
    pub mtime: i64,
    pub ac_time: Option<i64>,
    pub cr_time: Option<i64>,
    pub crc32: u32,
    pub csize: u64,
    pub usize: u64,
}

impl<'a> LocalFileHeader<'a> {
    /// Writes the signature, fixed fields, name, and extras (UNIX extended
    /// timestamp always, ZIP64 when any of csize/usize overflows 32 bits).
    /// Returns the total number of bytes written, so the caller can track
    /// `local_header_offset` for the next entry without a separate seek.
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<u64> {
        let zip64 = needs_zip64(self.usize, self.csize, 0);
        let version_needed = if zip64 { VERSION_NEEDED_ZIP64 } else { VERSION_NEEDED_DEFAULT };
        let flags: u16 = if needs_utf8_flag(self.name) { 1 << 11 } else { 0 };
        let (dos_date, dos_time) = unix_time_to_dos(self.mtime);

        let mut extras = ExtraFields::default();
        if zip64 {
            extras.values.push(ExtraField::Zip64 {
                usize: (self.usize >= u32::MAX as u64).then_some(self.usize),
                csize: (self.csize >= u32::MAX as u64).then_some(self.csize),
                local_header_offset: None,
            });
        }
        extras.values.push(ExtraField::UnixExtendedTimestamp {
            mod_time: Some(self.mtime as i32),
            ac_time: self.ac_time.map(|t| t as i32),
            cr_time: self.cr_time.map(|t| t as i32),
        });

        let extra_len = extras.data_length(false);
        let name_bytes = self.name.as_bytes();

        writer.write_all(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes())?;
        writer.write_all(&version_needed.to_le_bytes())?;
        writer.write_all(&flags.to_le_bytes())?;
        writer.write_all(&self.method.code().to_le_bytes())?;
        writer.write_all(&dos_time.to_le_bytes())?;
        writer.write_all(&dos_date.to_le_bytes())?;
        writer.write_all(&self.crc32.to_le_bytes())?;
        writer.write_all(&(if zip64 { u32::MAX } else { self.csize as u32 }).to_le_bytes())?;
        writer.write_all(&(if zip64 { u32::MAX } else { self.usize as u32 }).to_le_bytes())?;
        writer.write_all(&(name_bytes.len() as u16).to_le_bytes())?;
        writer.write_all(&extra_len.to_le_bytes())?;
        writer.write_all(name_bytes)?;
        extras.write(writer, false)?;

        Ok(30 + name_bytes.len() as u64 + extra_len as u64)
    }
}
