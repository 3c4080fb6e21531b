//! tiermirror - Mirror an object-storage prefix to a local directory, tier aware
//!
//! This library lists every object under a bucket prefix and writes it to the
//! matching path below a local directory. Objects in archival storage classes
//! (`GLACIER`, `DEEP_ARCHIVE`) cannot be read directly: for those a restore is
//! requested instead, and a later run downloads them once the restore is done.
//!
//! # Features
//!
//! - **Paginated Listing**: Follows continuation tokens lazily, page by page
//! - **Tier Aware**: Requests restores for cold objects, downloads restored ones
//! - **Partial Failure Tolerant**: A broken object is reported, the run goes on
//! - **Run Report**: Downloaded, restore-pending and failed keys, as JSON if wanted
//! - **MD5 Verification**: Optional check of downloads against plain-MD5 ETags
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tiermirror::{Mirror, MirrorConfig, S3ObjectStorage, S3Settings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = S3Settings {
//!     region: Some("eu-west-1".to_string()),
//!     ..Default::default()
//! };
//! let client = S3ObjectStorage::connect(&settings).await?;
//! let config = MirrorConfig {
//!     bucket: "archive-bucket".to_string(),
//!     destination_root: "./download".into(),
//!     ..Default::default()
//! };
//!
//! let report = Mirror::new(Arc::new(client), config)
//!     .download_prefix("backup/2024/")
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod cli;
pub mod client;
pub mod download;
pub mod error;
pub mod lister;
pub mod orchestrator;
pub mod s3;
pub mod server;
pub mod types;
mod verify;

pub use client::{ObjectReader, ObjectStorage};
pub use error::MirrorError;
pub use orchestrator::Mirror;
pub use s3::{S3ObjectStorage, S3Settings};
pub use types::{
    FailureStage, ListingPage, MirrorConfig, MirrorReport, ObjectFailure, ObjectHead,
    RestoreSpeed, RestoreStatus, StorageTier,
};

#[cfg(any(test, feature = "test-export-mocks"))]
pub use client::MockObjectStorage;
