//! Object storage capability consumed by the mirror.
//!
//! The orchestrator only talks to storage through [`ObjectStorage`], so the
//! S3 adapter in [`crate::s3`] can be swapped for another provider, and tests
//! can use the generated `MockObjectStorage` to assert exactly which calls a
//! run makes.

use crate::error::MirrorError;
use crate::types::{ListingPage, ObjectHead, RestoreSpeed};
use async_trait::async_trait;
use std::pin::Pin;
use tokio::io::AsyncRead;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Streamed body of an object.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// The four storage operations a mirror run needs.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Lists one page of keys under `prefix`, continuing from `continuation_token`.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListingPage, MirrorError>;

    /// Reads storage class and restore state of a single object.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHead, MirrorError>;

    /// Asks the store to make a readable copy of a cold object for `days` days.
    async fn restore_object(
        &self,
        bucket: &str,
        key: &str,
        days: i32,
        speed: RestoreSpeed,
    ) -> Result<(), MirrorError>;

    /// Opens the object body for streaming.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectReader, MirrorError>;
}
