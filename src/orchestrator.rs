//! Main orchestration logic for mirroring a prefix.

use crate::classify::{classify, request_restore, TierAction};
use crate::client::ObjectStorage;
use crate::download::{create_directory, download_object, is_directory_marker};
use crate::error::MirrorError;
use crate::lister::list_prefix;
use crate::types::{FailureStage, MirrorConfig, MirrorReport};
use crate::verify::verify_download;
use futures_util::{pin_mut, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Mirrors bucket prefixes into a local directory.
///
/// Holds the storage client and the run configuration; every call to
/// [`Mirror::download_prefix`] is an independent, single-pass run.
#[derive(Clone)]
pub struct Mirror {
    client: Arc<dyn ObjectStorage>,
    config: MirrorConfig,
}

impl Mirror {
    /// Creates a mirror over `client`.
    pub fn new(client: Arc<dyn ObjectStorage>, config: MirrorConfig) -> Self {
        Self { client, config }
    }

    /// The configuration this mirror runs with.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Downloads everything under `prefix` into the destination root.
    ///
    /// This is the main entry point. For each listed key it:
    ///
    /// 1. Creates a local directory for directory markers (keys ending in `/`)
    /// 2. Reads the object's metadata to find its storage tier
    /// 3. Requests a restore for cold objects that are not restored yet, and skips them
    /// 4. Streams every other object to `destination_root/key`
    ///
    /// Keys are handled one at a time, in listing order. Objects waiting for a
    /// restore are not polled; run again once the restore has finished.
    ///
    /// # Returns
    ///
    /// The run report. Failures of single objects are recorded in it and do
    /// not fail the run; only a listing failure returns `Err`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use tiermirror::{Mirror, MirrorConfig, S3ObjectStorage, S3Settings};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = S3ObjectStorage::connect(&S3Settings::default()).await?;
    /// let config = MirrorConfig {
    ///     bucket: "archive-bucket".to_string(),
    ///     ..Default::default()
    /// };
    /// let report = Mirror::new(Arc::new(client), config)
    ///     .download_prefix("backup/2024/")
    ///     .await?;
    /// println!("{} downloaded, {} awaiting restore", report.downloaded.len(), report.restore_requested.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn download_prefix(&self, prefix: &str) -> Result<MirrorReport, MirrorError> {
        let mut report = MirrorReport::new(&self.config.bucket, prefix);
        self.download_prefix_into(prefix, &mut report).await?;
        Ok(report)
    }

    /// Like [`Mirror::download_prefix`], but records into a caller-owned report.
    ///
    /// When the listing fails part way, `report` still holds everything done
    /// before the failure (downloaded keys, restore requests, failures).
    pub async fn download_prefix_into(
        &self,
        prefix: &str,
        report: &mut MirrorReport,
    ) -> Result<(), MirrorError> {
        let started = Instant::now();
        let bucket = self.config.bucket.as_str();

        info!(
            "Starting recursive download from bucket '{}' with prefix '{}' into {:?}",
            bucket, prefix, self.config.destination_root
        );

        let keys = list_prefix(self.client.as_ref(), bucket, prefix);
        pin_mut!(keys);

        while let Some(key) = keys.next().await {
            let key = match key {
                Ok(key) => key,
                Err(e) => {
                    report.elapsed = started.elapsed();
                    error!(
                        "Listing failed after {} keys ({} downloaded, {} awaiting restore, {} failed): {}",
                        report.listed,
                        report.downloaded.len(),
                        report.restore_requested.len(),
                        report.failures.len(),
                        e
                    );
                    return Err(e);
                }
            };
            report.listed += 1;
            self.handle_object(&key, report).await;
        }

        report.elapsed = started.elapsed();
        info!(
            "Download process completed for prefix '{}': {} downloaded ({} bytes), {} awaiting restore, {} failed in {}",
            prefix,
            report.downloaded.len(),
            report.bytes_written,
            report.restore_requested.len(),
            report.failures.len(),
            humantime::format_duration(round_to_millis(report.elapsed))
        );
        Ok(())
    }

    /// Processes one key, recording the outcome in `report`.
    async fn handle_object(&self, key: &str, report: &mut MirrorReport) {
        let bucket = self.config.bucket.as_str();
        let root = self.config.destination_root.as_path();

        if is_directory_marker(key) {
            match create_directory(root, key).await {
                Ok(_) => report.directories.push(key.to_string()),
                Err(e) => {
                    error!("Error creating directory for '{}': {}", key, e);
                    report.record_failure(key, FailureStage::Path, e.to_string());
                }
            }
            return;
        }

        let classification = match classify(self.client.as_ref(), bucket, key).await {
            Ok(c) => c,
            Err(e) => {
                error!("Error reading metadata for '{}': {}", key, e);
                report.record_failure(key, FailureStage::Head, e.to_string());
                return;
            }
        };

        if classification.action() == TierAction::Restore {
            match request_restore(self.client.as_ref(), &self.config, key).await {
                Ok(()) => report.restore_requested.push(key.to_string()),
                Err(e) => {
                    error!("Error requesting restore for '{}': {}", key, e);
                    report.record_failure(key, FailureStage::Restore, e.to_string());
                }
            }
            return;
        }

        let downloaded = match download_object(
            self.client.as_ref(),
            bucket,
            key,
            root,
            classification.content_length,
        )
        .await
        {
            Ok(d) => d,
            Err(e) => {
                let stage = match e {
                    MirrorError::UnsafeKey { .. } => FailureStage::Path,
                    _ => FailureStage::Download,
                };
                error!("Error downloading '{}': {}", key, e);
                report.record_failure(key, stage, e.to_string());
                return;
            }
        };

        if self.config.verify_checksums {
            if let Err(e) =
                verify_download(&downloaded.path, key, classification.e_tag.as_deref()).await
            {
                warn!("Discarding '{}': {}", key, e);
                report.record_failure(key, FailureStage::Verify, e.to_string());
                return;
            }
        }

        report.bytes_written += downloaded.bytes;
        report.downloaded.push(key.to_string());
    }
}

/// Drops sub-millisecond noise so elapsed times read `1s 204ms`.
fn round_to_millis(elapsed: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(elapsed.as_millis() as u64)
}
