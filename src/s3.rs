//! [`ObjectStorage`] over the AWS SDK for Rust.

use crate::client::{ObjectReader, ObjectStorage};
use crate::error::MirrorError;
use crate::types::{ListingPage, ObjectHead, RestoreSpeed};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::types::{GlacierJobParameters, RestoreRequest, Tier};
use aws_sdk_s3::Client;
use tracing::{debug, info};

/// Error code S3 answers with when a restore for the object is already running.
const RESTORE_ALREADY_IN_PROGRESS: &str = "RestoreAlreadyInProgress";

/// Connection settings for S3.
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    /// AWS region (e.g., `"eu-west-1"`).
    pub region: Option<String>,
    /// Named profile from the shared AWS config files.
    pub profile: Option<String>,
    /// Custom endpoint for S3-compatible stores (MinIO, LocalStack, ...).
    pub endpoint_url: Option<String>,
}

/// S3-backed object storage.
#[derive(Debug, Clone)]
pub struct S3ObjectStorage {
    client: Client,
}

impl S3ObjectStorage {
    /// Builds a client from the default credential chain and `settings`.
    pub async fn connect(settings: &S3Settings) -> Result<Self, MirrorError> {
        use aws_config::Region;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &settings.region {
            if region.trim().is_empty() {
                return Err(MirrorError::Config("region must not be blank".to_string()));
            }
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        // Custom endpoints rarely support virtual-hosted addressing.
        let s3_config = if settings.endpoint_url.is_some() {
            builder.force_path_style(true).build()
        } else {
            builder.build()
        };

        info!(
            "S3 client ready (region: {:?}, profile: {:?}, endpoint: {:?})",
            settings.region, settings.profile, settings.endpoint_url
        );
        Ok(Self::from_client(Client::from_conf(s3_config)))
    }

    /// Wraps an already configured SDK client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListingPage, MirrorError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| MirrorError::Listing {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|obj| obj.key())
            .map(str::to_string)
            .collect();

        Ok(ListingPage {
            keys,
            next_token: output.next_continuation_token().map(str::to_string),
            is_truncated: output.is_truncated().unwrap_or(false),
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHead, MirrorError> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| MirrorError::Head {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(ObjectHead {
            storage_class: output.storage_class().map(|c| c.as_str().to_string()),
            restore: output.restore().map(str::to_string),
            e_tag: output.e_tag().map(|t| t.trim_matches('"').to_string()),
            content_length: output
                .content_length()
                .and_then(|len| u64::try_from(len).ok()),
        })
    }

    async fn restore_object(
        &self,
        bucket: &str,
        key: &str,
        days: i32,
        speed: RestoreSpeed,
    ) -> Result<(), MirrorError> {
        let job = GlacierJobParameters::builder()
            .tier(Tier::from(speed.as_str()))
            .build()
            .map_err(|e| MirrorError::Restore {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        let request = RestoreRequest::builder()
            .days(days)
            .glacier_job_parameters(job)
            .build();

        match self
            .client
            .restore_object()
            .bucket(bucket)
            .key(key)
            .restore_request(request)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.code() == Some(RESTORE_ALREADY_IN_PROGRESS) => {
                debug!("Restore for '{}' already in progress", key);
                Ok(())
            }
            Err(e) => Err(MirrorError::Restore {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            }),
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectReader, MirrorError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| MirrorError::Get {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(Box::pin(output.body.into_async_read()))
    }
}
