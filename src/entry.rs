//! Input entry types submitted to the archive, and the naming invariants
//! every archive name must satisfy before an entry is accepted.

use std::path::PathBuf;

use crate::error::CoreError;

/// Unix file mode bits (the low 16 bits of the external attributes word).
pub type Mode = u32;

/// Where an entry's payload comes from.
#[derive(Debug)]
pub enum EntrySource {
    /// Read from a file on disk; the planner memory-maps it.
    FilePath(PathBuf),
    /// Already resident in memory.
    Blob(Vec<u8>),
}

/// A pending entry submitted by the caller, not yet planned.
#[derive(Debug)]
pub struct PendingEntry {
    pub archive_name: String,
    pub source: EntrySource,
    pub mtime: Option<i64>,
    pub mode: Option<Mode>,
}

impl PendingEntry {
    pub fn from_path(archive_name: impl Into<String>, path: PathBuf) -> Result<Self, CoreError> {
        let archive_name = archive_name.into();
        validate_archive_name(&archive_name)?;
        Ok(Self {
            archive_name,
            source: EntrySource::FilePath(path),
            mtime: None,
            mode: None,
        })
    }

    pub fn from_blob(archive_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, CoreError> {
        let archive_name = archive_name.into();
        validate_archive_name(&archive_name)?;
        Ok(Self {
            archive_name,
            source: EntrySource::Blob(bytes),
            mtime: None,
            mode: None,
        })
    }

    pub fn with_mtime(mut self, mtime: i64) -> Self {
        self.mtime = Some(mtime);
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// A precompressed entry to be spliced in byte-exact from a source archive.
/// See [`crate::splice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceMethod {
    Store,
    Deflate,
    Zstd,
}

/// Validates an archive name against the naming invariants: non-empty,
/// forward slashes only, no leading/trailing space, no NUL, no BOM, no `..`
/// path component.
pub fn validate_archive_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::BadName(name.to_string()));
    }
    if name.starts_with(' ') || name.ends_with(' ') {
        return Err(CoreError::BadName(name.to_string()));
    }
    if name.contains('\\') {
        return Err(CoreError::BadName(name.to_string()));
    }
    if name.contains('\0') {
        return Err(CoreError::BadName(name.to_string()));
    }
    if name.starts_with('\u{feff}') {
        return Err(CoreError::BadName(name.to_string()));
    }
    if name.split('/').any(|component| component == "..") {
        return Err(CoreError::BadName(name.to_string()));
    }
    Ok(())
}

/// Whether `name`'s bytes require the UTF-8 general-purpose bit (any byte
/// outside the 7-bit ASCII range).
pub fn needs_utf8_flag(name: &str) -> bool {
    name.bytes().any(|b| b > 0x7f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        assert!(validate_archive_name("").is_err());
    }

    #[test]
    fn rejects_backslash() {
        assert!(validate_archive_name("dir\\file.txt").is_err());
    }

    #[test]
    fn rejects_leading_trailing_space() {
        assert!(validate_archive_name(" file.txt").is_err());
        assert!(validate_archive_name("file.txt ").is_err());
    }

    #[test]
    fn rejects_dotdot_component() {
        assert!(validate_archive_name("a/../b").is_err());
        assert!(validate_archive_name("..").is_err());
    }

    #[test]
    fn accepts_ordinary_nested_name() {
        assert!(validate_archive_name("assets/images/logo.png").is_ok());
    }

    #[test]
    fn utf8_flag_detection() {
        assert!(!needs_utf8_flag("ascii_name.txt"));
        assert!(needs_utf8_flag("café.txt"));
    }
}
