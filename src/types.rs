//! Data structures for mirror runs.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Storage classes that need a restore before their bytes can be read.
const COLD_STORAGE_CLASSES: &[&str] = &["GLACIER", "DEEP_ARCHIVE"];

/// Marker the store puts in the restore header once a restored copy is readable.
const RESTORE_COMPLETE_MARKER: &str = "ongoing-request=\"false\"";

/// Configuration for mirroring a prefix.
///
/// # Example
///
/// ```
/// use tiermirror::{MirrorConfig, RestoreSpeed};
///
/// let config = MirrorConfig {
///     bucket: "archive-bucket".to_string(),
///     destination_root: "./download".into(),
///     restore_days: 2,
///     restore_speed: RestoreSpeed::Standard,
///     verify_checksums: false,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Bucket to mirror from.
    pub bucket: String,
    /// Local directory that mirrors the key hierarchy (e.g., `"./download"`).
    pub destination_root: PathBuf,
    /// How long a restored copy of a cold object stays readable (default: 2).
    pub restore_days: i32,
    /// Retrieval speed requested for restores (default: standard).
    pub restore_speed: RestoreSpeed,
    /// Compare each download against its ETag when the ETag is a plain MD5
    /// (default: false).
    ///
    /// ETags of multipart uploads and of SSE-KMS encrypted objects are not MD5
    /// digests; multipart ETags are recognised and skipped, KMS ones are not,
    /// so only enable this for buckets without KMS encryption.
    pub verify_checksums: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            destination_root: PathBuf::from("./download"),
            restore_days: 2,
            restore_speed: RestoreSpeed::Standard,
            verify_checksums: false,
        }
    }
}

/// Retrieval speed of a restore request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RestoreSpeed {
    /// Hours; the default.
    #[default]
    Standard,
    /// Cheapest, slowest.
    Bulk,
    /// Minutes, not available for DEEP_ARCHIVE.
    Expedited,
}

impl RestoreSpeed {
    /// Wire name of the retrieval tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreSpeed::Standard => "Standard",
            RestoreSpeed::Bulk => "Bulk",
            RestoreSpeed::Expedited => "Expedited",
        }
    }
}

/// Where an object currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTier {
    /// Regular storage; also assumed when the store reports no class at all.
    Standard,
    /// Archival tier that needs a restore before reads succeed.
    Cold,
    /// Any other class (infrequent access, intelligent tiering, ...), readable directly.
    Other(String),
}

impl StorageTier {
    /// Classifies a provider storage-class name.
    pub fn from_storage_class(storage_class: Option<&str>) -> Self {
        match storage_class {
            None | Some("STANDARD") => StorageTier::Standard,
            Some(class) if COLD_STORAGE_CLASSES.contains(&class) => StorageTier::Cold,
            Some(class) => StorageTier::Other(class.to_string()),
        }
    }
}

/// Restore state of an object, derived from its restore header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStatus {
    /// The object is not in a cold tier.
    NotApplicable,
    /// No restore yet, or a restore that has not finished.
    InProgress,
    /// A restored copy is readable.
    Complete,
}

impl RestoreStatus {
    /// Derives the restore state of an object in `tier`.
    ///
    /// Only an explicit `ongoing-request="false"` counts as restored; a missing
    /// or unrecognised header is treated as still in progress.
    pub fn from_restore_header(tier: &StorageTier, restore: Option<&str>) -> Self {
        if *tier != StorageTier::Cold {
            return RestoreStatus::NotApplicable;
        }
        match restore {
            Some(header) if header.contains(RESTORE_COMPLETE_MARKER) => RestoreStatus::Complete,
            _ => RestoreStatus::InProgress,
        }
    }
}

/// One page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Keys on this page, in store order.
    pub keys: Vec<String>,
    /// Token for the next page, if the store returned one.
    pub next_token: Option<String>,
    /// Whether more pages follow.
    pub is_truncated: bool,
}

/// Object metadata returned by a head request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHead {
    /// Provider storage class (`None` for STANDARD on S3).
    pub storage_class: Option<String>,
    /// Raw restore header, e.g. `ongoing-request="false", expiry-date="..."`.
    pub restore: Option<String>,
    /// Entity tag, quotes stripped.
    pub e_tag: Option<String>,
    /// Object size in bytes.
    pub content_length: Option<u64>,
}

/// Step at which an object was given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// The key cannot be mapped to a local path.
    Path,
    /// Metadata lookup.
    Head,
    /// Restore request.
    Restore,
    /// Fetching or writing the object.
    Download,
    /// Checksum comparison after the download.
    Verify,
}

/// A single object that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectFailure {
    pub key: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Outcome of one mirror run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MirrorReport {
    /// Bucket that was mirrored.
    pub bucket: String,
    /// Prefix that was mirrored.
    pub prefix: String,
    /// Number of keys returned by the listing.
    pub listed: usize,
    /// Keys written to disk.
    pub downloaded: Vec<String>,
    /// Cold keys for which a restore was requested; run again once they are restored.
    pub restore_requested: Vec<String>,
    /// Directory marker keys created as local directories.
    pub directories: Vec<String>,
    /// Keys given up on.
    pub failures: Vec<ObjectFailure>,
    /// Total bytes written.
    pub bytes_written: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl MirrorReport {
    /// An empty report for a run over `bucket`/`prefix`.
    pub fn new(bucket: &str, prefix: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn record_failure(&mut self, key: &str, stage: FailureStage, message: String) {
        self.failures.push(ObjectFailure {
            key: key.to_string(),
            stage,
            message,
        });
    }

    /// True when every listed object was either written or is a directory marker.
    pub fn is_complete(&self) -> bool {
        self.restore_requested.is_empty() && self.failures.is_empty()
    }

    /// Keys that were not written in this run, restore-pending ones first.
    pub fn skipped_keys(&self) -> Vec<&str> {
        self.restore_requested
            .iter()
            .map(String::as_str)
            .chain(self.failures.iter().map(|f| f.key.as_str()))
            .collect()
    }
}
