//! Storage tier classification and restore requests.

use crate::client::ObjectStorage;
use crate::error::MirrorError;
use crate::types::{MirrorConfig, ObjectHead, RestoreStatus, StorageTier};
use tracing::{info, warn};

/// What to do with an object in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierAction {
    /// Bytes are readable; download now.
    Download,
    /// Cold and not restored; request a restore and skip the download.
    Restore,
}

/// Result of classifying a single object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub tier: StorageTier,
    pub restore_status: RestoreStatus,
    /// ETag reported by the head request, reused for checksum verification.
    pub e_tag: Option<String>,
    /// Size reported by the head request, checked against the downloaded bytes.
    pub content_length: Option<u64>,
}

impl Classification {
    /// Derives tier and restore status from head metadata.
    pub fn from_head(head: &ObjectHead) -> Self {
        let tier = StorageTier::from_storage_class(head.storage_class.as_deref());
        let restore_status = RestoreStatus::from_restore_header(&tier, head.restore.as_deref());
        Self {
            tier,
            restore_status,
            e_tag: head.e_tag.clone(),
            content_length: head.content_length,
        }
    }

    /// Applies the restore-or-download decision table.
    pub fn action(&self) -> TierAction {
        match (&self.tier, self.restore_status) {
            (StorageTier::Cold, RestoreStatus::Complete) => TierAction::Download,
            (StorageTier::Cold, _) => TierAction::Restore,
            _ => TierAction::Download,
        }
    }
}

/// Reads the object's metadata and classifies it.
pub async fn classify<C>(client: &C, bucket: &str, key: &str) -> Result<Classification, MirrorError>
where
    C: ObjectStorage + ?Sized,
{
    let head = client.head_object(bucket, key).await?;
    let classification = Classification::from_head(&head);
    info!(
        "Found: {} ({})",
        key,
        head.storage_class.as_deref().unwrap_or("STANDARD")
    );
    Ok(classification)
}

/// Requests a restore of a cold object with the configured retention and speed.
pub async fn request_restore<C>(
    client: &C,
    config: &MirrorConfig,
    key: &str,
) -> Result<(), MirrorError>
where
    C: ObjectStorage + ?Sized,
{
    warn!(
        "Starting restore for '{}' ({} days, {} retrieval)",
        key,
        config.restore_days,
        config.restore_speed.as_str()
    );
    client
        .restore_object(&config.bucket, key, config.restore_days, config.restore_speed)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockObjectStorage;
    use crate::types::RestoreSpeed;
    use mockall::predicate::eq;

    fn head(storage_class: Option<&str>, restore: Option<&str>) -> ObjectHead {
        ObjectHead {
            storage_class: storage_class.map(str::to_string),
            restore: restore.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_standard_and_other_download() {
        let standard = Classification::from_head(&head(Some("STANDARD"), None));
        assert_eq!(standard.action(), TierAction::Download);
        assert_eq!(standard.restore_status, RestoreStatus::NotApplicable);

        let missing_class = Classification::from_head(&head(None, None));
        assert_eq!(missing_class.action(), TierAction::Download);

        let infrequent = Classification::from_head(&head(Some("STANDARD_IA"), None));
        assert_eq!(infrequent.tier, StorageTier::Other("STANDARD_IA".to_string()));
        assert_eq!(infrequent.action(), TierAction::Download);
    }

    #[test]
    fn test_cold_needs_restore_until_complete() {
        for class in ["GLACIER", "DEEP_ARCHIVE"] {
            let unrestored = Classification::from_head(&head(Some(class), None));
            assert_eq!(unrestored.action(), TierAction::Restore);

            let ongoing =
                Classification::from_head(&head(Some(class), Some("ongoing-request=\"true\"")));
            assert_eq!(ongoing.action(), TierAction::Restore);

            let restored =
                Classification::from_head(&head(Some(class), Some("ongoing-request=\"false\"")));
            assert_eq!(restored.action(), TierAction::Download);
        }
    }

    #[test]
    fn test_head_metadata_is_carried() {
        let classification = Classification::from_head(&ObjectHead {
            e_tag: Some("abc-3".to_string()),
            content_length: Some(100),
            ..Default::default()
        });

        assert_eq!(classification.e_tag.as_deref(), Some("abc-3"));
        assert_eq!(classification.content_length, Some(100));
    }

    #[tokio::test]
    async fn test_request_restore_uses_config() {
        let config = MirrorConfig {
            bucket: "archive".to_string(),
            restore_days: 7,
            restore_speed: RestoreSpeed::Bulk,
            ..Default::default()
        };

        let mut client = MockObjectStorage::new();
        client
            .expect_restore_object()
            .with(eq("archive"), eq("old/file.bin"), eq(7), eq(RestoreSpeed::Bulk))
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        request_restore(&client, &config, "old/file.bin").await.unwrap();
    }

    #[tokio::test]
    async fn test_classify_propagates_head_error() {
        let mut client = MockObjectStorage::new();
        client.expect_head_object().times(1).returning(|_, key| {
            Err(MirrorError::Head {
                key: key.to_string(),
                message: "NotFound".to_string(),
            })
        });

        let err = classify(&client, "bucket", "missing").await.unwrap_err();
        assert!(matches!(err, MirrorError::Head { .. }));
    }
}
