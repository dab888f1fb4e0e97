//! Extra field records: UNIX extended timestamps and the ZIP64 extension.

use std::io::{self, Write};

const MOD_TIME_PRESENT: u8 = 1;
const AC_TIME_PRESENT: u8 = 1 << 1;
const CR_TIME_PRESENT: u8 = 1 << 2;

const UNIX_EXTENDED_TIMESTAMP_ID: u16 = 0x5455;
const ZIP64_ID: u16 = 0x0001;

/// One extra field record. `write` emits the header id, field size, and
/// payload; `field_size` must match what `write` actually produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraField {
    /// UNIX extended timestamp (id `0x5455`). `ac_time`/`cr_time` are
    /// dropped from the central-directory copy, matching common encoder
    /// practice (they're redundant once the local header carries them).
    UnixExtendedTimestamp {
        mod_time: Option<i32>,
        ac_time: Option<i32>,
        cr_time: Option<i32>,
    },
    /// ZIP64 extended information (id `0x0001`). Fields are emitted in
    /// `usize, csize, local_header_offset` order, only those present; this
    /// crate never emits a `disk_start` field.
    Zip64 {
        usize: Option<u64>,
        csize: Option<u64>,
        local_header_offset: Option<u64>,
    },
}

impl ExtraField {
    fn header_id(&self) -> u16 {
        match self {
            Self::UnixExtendedTimestamp { .. } => UNIX_EXTENDED_TIMESTAMP_ID,
            Self::Zip64 { .. } => ZIP64_ID,
        }
    }

    /// Size of the field's payload, not counting the 4-byte header id +
    /// size prefix. `central_header` selects the UNIX timestamp's
    /// reduced central-directory form.
    pub fn field_size(&self, central_header: bool) -> u16 {
        match self {
            Self::UnixExtendedTimestamp {
                mod_time,
                ac_time,
                cr_time,
            } => {
                let mut size = 1; // flags byte
                size += optional_size::<i32>(mod_time);
                if !central_header {
                    size += optional_size::<i32>(ac_time);
                    size += optional_size::<i32>(cr_time);
                }
                size
            }
            Self::Zip64 {
                usize,
                csize,
                local_header_offset,
            } => {
                optional_size::<u64>(usize)
                    + optional_size::<u64>(csize)
                    + optional_size::<u64>(local_header_offset)
            }
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W, central_header: bool) -> io::Result<()> {
        writer.write_all(&self.header_id().to_le_bytes())?;
        writer.write_all(&self.field_size(central_header).to_le_bytes())?;

        match *self {
            Self::UnixExtendedTimestamp {
                mod_time,
                ac_time,
                cr_time,
            } => {
                let flags = presence_flag(mod_time, MOD_TIME_PRESENT)
                    | presence_flag(ac_time, AC_TIME_PRESENT)
                    | presence_flag(cr_time, CR_TIME_PRESENT);
                writer.write_all(&[flags])?;
                if let Some(mod_time) = mod_time {
                    writer.write_all(&mod_time.to_le_bytes())?;
                }
                if !central_header {
                    if let Some(ac_time) = ac_time {
                        writer.write_all(&ac_time.to_le_bytes())?;
                    }
                    if let Some(cr_time) = cr_time {
                        writer.write_all(&cr_time.to_le_bytes())?;
                    }
                }
            }
            Self::Zip64 {
                usize,
                csize,
                local_header_offset,
            } => {
                if let Some(v) = usize {
                    writer.write_all(&v.to_le_bytes())?;
                }
                if let Some(v) = csize {
                    writer.write_all(&v.to_le_bytes())?;
                }
                if let Some(v) = local_header_offset {
                    writer.write_all(&v.to_le_bytes())?;
                }
            }
        }

        Ok(())
    }
}

fn optional_size<T>(field: &Option<T>) -> u16 {
    match field {
        Some(_) => std::mem::size_of::<T>() as u16,
        None => 0,
    }
}

fn presence_flag(val: Option<i32>, bit: u8) -> u8 {
    if val.is_some() {
        bit
    } else {
        0
    }
}

/// An ordered collection of extra fields, as written after an entry's name
/// in a local or central-directory header.
#[derive(Debug, Clone, Default)]
pub struct ExtraFields {
    pub values: Vec<ExtraField>,
}

impl ExtraFields {
    pub fn data_length(&self, central_header: bool) -> u16 {
        self.values
            .iter()
            .map(|f| 4 + f.field_size(central_header))
            .sum()
    }

    pub fn write<W: Write>(&self, writer: &mut W, central_header: bool) -> io::Result<()> {
        for field in &self.values {
            field.write(writer, central_header)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_timestamp_field_size_drops_ac_cr_in_central_header() {
        let field = ExtraField::UnixExtendedTimestamp {
            mod_time: Some(100),
            ac_time: Some(200),
            cr_time: Some(300),
        };
        assert_eq!(field.field_size(false), 1 + 4 + 4 + 4);
        assert_eq!(field.field_size(true), 1 + 4);
    }

    #[test]
    fn zip64_field_only_counts_present_fields() {
        let field = ExtraField::Zip64 {
            usize: Some(5),
            csize: None,
            local_header_offset: Some(10),
        };
        assert_eq!(field.field_size(false), 8 + 8);

        let mut buf = Vec::new();
        field.write(&mut buf, false).unwrap();
        assert_eq!(buf.len(), 4 + 16);
    }

    #[test]
    fn written_bytes_match_declared_size() {
        let field = ExtraField::UnixExtendedTimestamp {
            mod_time: Some(1),
            ac_time: None,
            cr_time: Some(3),
        };
        let mut buf = Vec::new();
        field.write(&mut buf, false).unwrap();
        assert_eq!(buf.len(), 4 + field.field_size(false) as usize);
    }
}
