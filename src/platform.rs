//! Platform-specific stuff

use std::fs::Metadata;

use cfg_if::cfg_if;

/// OS - UNIX, id 3 per Info-Zip spec, specification version 6.3.
/// Always UNIX regardless of build platform: the archives this crate
/// produces encode UNIX mode bits in the external attributes field
/// unconditionally, so `version_made_by` must say so too.
pub(crate) const VERSION_MADE_BY: u16 = (3 << 8) + 63;

pub(crate) const DEFAULT_UNIX_FILE_ATTRS: u32 = 0o100644;
pub(crate) const DEFAULT_UNIX_DIR_ATTRS: u32 = 0o040755;

#[cfg(target_os = "windows")]
pub(crate) const DEFAULT_WINDOWS_FILE_ATTRS: u32 = 128;
#[cfg(target_os = "windows")]
pub(crate) const DEFAULT_WINDOWS_DIR_ATTRS: u32 = 16;

#[inline]
pub(crate) fn attributes_from_fs(metadata: &Metadata) -> u32 {
    cfg_if! {
        if #[cfg(target_os = "windows")] {
            use std::os::windows::fs::MetadataExt;
            metadata.file_attributes()
        } else if #[cfg(target_os = "linux")] {
            use std::os::linux::fs::MetadataExt;
            metadata.st_mode()
        } else if #[cfg(target_os = "macos")] {
            use std::os::unix::fs::MetadataExt;
            metadata.mode()
        } else if #[cfg(unix)] {
            use std::os::unix::fs::PermissionsExt;
            metadata.permissions().mode()
        } else {
            if metadata.is_dir() {
                DEFAULT_UNIX_DIR_ATTRS
            } else {
                DEFAULT_UNIX_FILE_ATTRS
            }
        }
    }
}

/// Seconds since the epoch for mtime/atime/ctime, when the filesystem exposes them.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FsTimes {
    pub(crate) mtime: Option<i64>,
    pub(crate) atime: Option<i64>,
    pub(crate) ctime: Option<i64>,
}

pub(crate) fn times_from_fs(metadata: &Metadata) -> FsTimes {
    cfg_if! {
        if #[cfg(unix)] {
            use std::os::unix::fs::MetadataExt;
            FsTimes {
                mtime: Some(metadata.mtime()),
                atime: Some(metadata.atime()),
                ctime: Some(metadata.ctime()),
            }
        } else {
            let _ = metadata;
            FsTimes::default()
        }
    }
}
