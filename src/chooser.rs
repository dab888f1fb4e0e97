//! Compression method selection: a pure policy from archive name and a
//! sample of the payload to a [`Decision`], plus the post-compression
//! downgrade-to-store check.

use crate::level::CompressionLevel;
#[cfg(feature = "zstd")]
use crate::level::ZstdLevel;

/// What the planner should do with an entry's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No compression; the payload is copied verbatim.
    Store,
    /// DEFLATE at the given level.
    Deflate(CompressionLevel),
    /// zstd at the given level.
    #[cfg(feature = "zstd")]
    Zstd(ZstdLevel),
}

/// A single declarative rule. Rules are evaluated in order; the first whose
/// predicate matches wins.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Matches when the archive name's extension equals `ext`
    /// (case-insensitive, no leading dot).
    Extension(String, Decision),
    /// Matches when `pattern` (a [`glob`] pattern) matches the archive name.
    Glob(glob::Pattern, Decision),
    /// Matches when the sampled payload is smaller than `bytes`.
    MinSize(u64, Decision),
}

impl Rule {
    fn matches(&self, archive_name: &str, sample_len: u64) -> Option<Decision> {
        match self {
            Rule::Extension(ext, decision) => {
                let name_ext = archive_name.rsplit('.').next().unwrap_or("");
                (name_ext.eq_ignore_ascii_case(ext)).then_some(*decision)
            }
            Rule::Glob(pattern, decision) => pattern.matches(archive_name).then_some(*decision),
            Rule::MinSize(bytes, decision) => (sample_len < *bytes).then_some(*decision),
        }
    }
}

/// Extensions already compressed by their own container format; recompressing
/// them with DEFLATE wastes CPU for no size benefit.
const DENSE_EXTENSIONS: &[&str] = &[
    "zip", "gz", "tgz", "bz2", "xz", "7z", "rar", "zst", "lz4", "png", "jpg", "jpeg", "gif",
    "webp", "mp4", "mkv", "mov", "mp3", "m4a", "ogg", "docx", "pptx", "xlsx", "pdf",
];

/// The minimum payload size below which `Store` beats DEFLATE's per-stream
/// overhead.
const MIN_COMPRESSIBLE_SIZE: u64 = 64;

/// Declarative, orderable compression policy.
///
/// Construct with [`Chooser::default`] for the built-in rule table, or
/// [`Chooser::new`] to supply a custom one.
#[derive(Debug, Clone)]
pub struct Chooser {
    rules: Vec<Rule>,
    default: Decision,
}

impl Chooser {
    /// A chooser with no default rules; `default` is used if `rules` never
    /// match.
    pub fn new(rules: Vec<Rule>, default: Decision) -> Self {
        Self { rules, default }
    }

    /// Decide how to compress an entry from its archive name and a sample of
    /// its payload (the planner samples up to 16 KiB).
    pub fn decide(&self, archive_name: &str, sample: &[u8]) -> Decision {
        for rule in &self.rules {
            if let Some(decision) = rule.matches(archive_name, sample.len() as u64) {
                return decision;
            }
        }
        self.default
    }

    /// Applies the downgrade rule: if compression didn't help, re-emit as
    /// `Store`. The caller already has the compressed bytes in hand; this
    /// never triggers recompression, only a choice of which bytes to write.
    pub fn downgrade_if_ineffective(compressed_size: u64, uncompressed_size: u64) -> bool {
        compressed_size >= uncompressed_size
    }
}

impl Default for Chooser {
    fn default() -> Self {
        let mut rules: Vec<Rule> = DENSE_EXTENSIONS
            .iter()
            .map(|ext| Rule::Extension((*ext).to_string(), Decision::Store))
            .collect();
        rules.push(Rule::MinSize(MIN_COMPRESSIBLE_SIZE, Decision::Store));

        Self {
            rules,
            default: Decision::Deflate(CompressionLevel::balanced()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_extension_is_stored() {
        let chooser = Chooser::default();
        assert_eq!(chooser.decide("photo.PNG", b"whatever"), Decision::Store);
        assert_eq!(chooser.decide("archive.zip", &[0u8; 1000]), Decision::Store);
    }

    #[test]
    fn tiny_payload_is_stored() {
        let chooser = Chooser::default();
        assert_eq!(chooser.decide("notes.txt", b"hi"), Decision::Store);
    }

    #[test]
    fn default_is_deflate_balanced() {
        let chooser = Chooser::default();
        let sample = vec![0u8; 4096];
        assert_eq!(
            chooser.decide("readme.txt", &sample),
            Decision::Deflate(CompressionLevel::balanced())
        );
    }

    #[test]
    fn glob_rule_takes_precedence_by_order() {
        let rules = vec![
            Rule::Glob(glob::Pattern::new("logs/**/*.log").unwrap(), Decision::Store),
            Rule::MinSize(64, Decision::Store),
        ];
        let chooser = Chooser::new(rules, Decision::Deflate(CompressionLevel::balanced()));
        let sample = vec![0u8; 4096];
        assert_eq!(chooser.decide("logs/2024/app.log", &sample), Decision::Store);
        assert_eq!(
            chooser.decide("src/main.rs", &sample),
            Decision::Deflate(CompressionLevel::balanced())
        );
    }

    #[test]
    fn downgrade_triggers_when_compression_did_not_help() {
        assert!(Chooser::downgrade_if_ineffective(120, 100));
        assert!(Chooser::downgrade_if_ineffective(100, 100));
        assert!(!Chooser::downgrade_if_ineffective(80, 100));
    }
}
