//! Error types for the archive assembly engine

use std::fmt::Display;
use std::io;

/// Result type for the engine's fallible operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors produced while planning, compressing, or writing an archive.
///
/// Variants correspond 1:1 to the error kinds in the engine's error-handling
/// design: `BadName` and `DuplicateName` are rejected/skipped at submission
/// time and never reach [`Archive::close`](crate::Archive::close) as the
/// fatal error; `SourceIO`, `CompressorError`, `OutputIO` and `Inconsistent`
/// are archive-fatal once they reach the Writer.
#[derive(Debug)]
pub enum CoreError {
    /// The archive name violates a naming invariant (empty, backslashes,
    /// leading/trailing space, NUL, BOM, `..` component, or embedded slash
    /// escape ambiguity).
    BadName(String),
    /// An entry with this archive name was already written; this entry was
    /// skipped.
    DuplicateName(String),
    /// Reading or memory-mapping the input failed.
    SourceIO(io::Error),
    /// A compression worker failed.
    CompressorError(String),
    /// Writing to the output archive failed.
    OutputIO(io::Error),
    /// An internal invariant was violated (e.g. chunk count mismatch).
    Inconsistent(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadName(name) => write!(f, "invalid archive entry name: {name:?}"),
            Self::DuplicateName(name) => write!(f, "duplicate archive entry name: {name:?}"),
            Self::SourceIO(e) => write!(f, "error reading input: {e}"),
            Self::CompressorError(msg) => write!(f, "compression worker failed: {msg}"),
            Self::OutputIO(e) => write!(f, "error writing archive: {e}"),
            Self::Inconsistent(msg) => write!(f, "internal invariant violated: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SourceIO(e) | Self::OutputIO(e) => Some(e),
            _ => None,
        }
    }
}

impl CoreError {
    /// Whether this error, once observed by the Writer, is archive-fatal
    /// (closes the output and removes the partial file) as opposed to
    /// per-submission (rejected before being enqueued).
    pub fn is_archive_fatal(&self) -> bool {
        !matches!(self, Self::BadName(_) | Self::DuplicateName(_))
    }
}
