//! The central directory file header, one per entry, written at `close()`.

use std::io::{self, Write};

use super::extra_field::{ExtraField, ExtraFields};
use super::{needs_zip64, unix_time_to_dos, CompressionMethod, CENTRAL_DIR_HEADER_SIGNATURE, VERSION_NEEDED_DEFAULT, VERSION_NEEDED_ZIP64};
use crate::entry::needs_utf8_flag;
use crate::platform::VERSION_MADE_BY;

pub struct CentralDirectoryHeader<'a> {
    pub name: &'a str,
    pub method: CompressionMethod,
    pub mtime: i64,
    pub crc32: u32,
    pub csize: u64,
    pub usize: u64,
    pub local_header_offset: u64,
    pub external_attributes: u32,
}

impl<'a> CentralDirectoryHeader<'a> {
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<u64> {
        let zip64 = needs_zip64(self.usize, self.csize, self.local_header_offset);
        let version_needed = if zip64 { VERSION_NEEDED_ZIP64 } else { VERSION_NEEDED_DEFAULT };
        let flags: u16 = if needs_utf8_flag(self.name) { 1 << 11 } else { 0 };
        let (dos_date, dos_time) = unix_time_to_dos(self.mtime);

        let mut extras = ExtraFields::default();
        if zip64 {
            extras.values.push(ExtraField::Zip64 {
                usize: (self.usize >= u32::MAX as u64).then_some(self.usize),
                csize: (self.csize >= u32::MAX as u64).then_some(self.csize),
                local_header_offset: (self.local_header_offset >= u32::MAX as u64)
                    .then_some(self.local_header_offset),
            });
        }
        extras.values.push(ExtraField::UnixExtendedTimestamp {
            mod_time: Some(self.mtime as i32),
            ac_time: None,
            cr_time: None,
        });

        let extra_len = extras.data_length(true);
        let name_bytes = self.name.as_bytes();

        writer.write_all(&CENTRAL_DIR_HEADER_SIGNATURE.to_le_bytes())?;
        writer.write_all(&VERSION_MADE_BY.to_le_bytes())?;
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
        writer.write_all(&0_u16.to_le_bytes())?; // comment length, always empty
        writer.write_all(&0_u16.to_le_bytes())?; // disk number start
        writer.write_all(&0_u16.to_le_bytes())?; // internal file attributes
        writer.write_all(&self.external_attributes.to_le_bytes())?;
        writer.write_all(&(if zip64 { u32::MAX } else { self.local_header_offset as u32 }).to_le_bytes())?;
        writer.write_all(name_bytes)?;
        extras.write(writer, true)?;

        Ok(46 + name_bytes.len() as u64 + extra_len as u64)
    }
}
