//! Command-line front end: `pull` mirrors a prefix once, `serve` exposes the
//! HTTP endpoint.

use crate::orchestrator::Mirror;
use crate::s3::{S3ObjectStorage, S3Settings};
use crate::server;
use crate::types::{MirrorConfig, MirrorReport, RestoreSpeed};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tiermirror")]
#[command(about = "Mirror an S3 prefix to a local directory, restoring Glacier objects on the way", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download everything under a prefix once
    Pull(PullArgs),
    /// Serve `POST /download?prefix=...`
    Serve(ServeArgs),
}

/// Storage and destination options shared by both subcommands.
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// Bucket to mirror from
    #[arg(long, env = "TIERMIRROR_BUCKET")]
    pub bucket: String,

    /// AWS region of the bucket
    #[arg(long, env = "TIERMIRROR_REGION")]
    pub region: Option<String>,

    /// Named AWS profile for credentials
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Custom endpoint for S3-compatible stores
    #[arg(long, env = "TIERMIRROR_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Local directory that receives the objects
    #[arg(long, env = "TIERMIRROR_DOWNLOAD_DIR", default_value = "./download")]
    pub download_dir: PathBuf,

    /// Days a restored copy stays readable
    #[arg(long, env = "TIERMIRROR_RESTORE_DAYS", default_value_t = 2)]
    pub restore_days: i32,

    /// Retrieval speed for restore requests
    #[arg(
        long,
        env = "TIERMIRROR_RESTORE_TIER",
        value_enum,
        default_value_t = RestoreSpeed::Standard
    )]
    pub restore_tier: RestoreSpeed,

    /// Check downloads against plain-MD5 ETags
    #[arg(long, env = "TIERMIRROR_VERIFY")]
    pub verify: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PullArgs {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Key prefix to mirror (e.g. "backup/2024/")
    #[arg(long, env = "TIERMIRROR_PREFIX")]
    pub prefix: Option<String>,

    /// Print the run report as JSON
    #[arg(long, env = "TIERMIRROR_JSON")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Address to bind
    #[arg(long, env = "TIERMIRROR_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "TIERMIRROR_PORT", default_value_t = 8080)]
    pub port: u16,
}

/// A required parameter was missing; reported with the usage text, before any
/// network call.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Missing required parameter: {parameter}")]
pub struct UsageError {
    pub parameter: &'static str,
}

impl StorageArgs {
    /// Rejects a missing or blank region.
    pub fn validate(&self) -> Result<(), UsageError> {
        if is_blank(self.region.as_deref()) {
            return Err(UsageError {
                parameter: "--region",
            });
        }
        Ok(())
    }

    pub fn s3_settings(&self) -> S3Settings {
        S3Settings {
            region: self.region.clone(),
            profile: self.profile.clone(),
            endpoint_url: self.endpoint_url.clone(),
        }
    }

    pub fn mirror_config(&self) -> MirrorConfig {
        MirrorConfig {
            bucket: self.bucket.clone(),
            destination_root: self.download_dir.clone(),
            restore_days: self.restore_days,
            restore_speed: self.restore_tier,
            verify_checksums: self.verify,
        }
    }
}

impl PullArgs {
    /// Returns the prefix, or the first missing required parameter.
    pub fn validate(&self) -> Result<&str, UsageError> {
        let prefix = match self.prefix.as_deref() {
            Some(prefix) if !prefix.trim().is_empty() => prefix,
            _ => return Err(UsageError { parameter: "--prefix" }),
        };
        self.storage.validate()?;
        Ok(prefix)
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Usage text printed after a [`UsageError`].
pub fn usage() -> &'static str {
    "Usage:
  tiermirror pull \\
    --bucket <bucket-name> \\
    --region <region> \\
    [--profile <profile-name>] \\
    --prefix <s3-prefix> \\
    [--download-dir ./download] \\
    [--endpoint-url <url>] \\
    [--restore-days 2] \\
    [--restore-tier standard|bulk|expedited] \\
    [--verify] [--json]

  tiermirror serve \\
    --bucket <bucket-name> \\
    --region <region> \\
    [--profile <profile-name>] \\
    [--download-dir ./download] \\
    [--endpoint-url <url>] \\
    [--restore-days 2] \\
    [--restore-tier standard|bulk|expedited] \\
    [--verify] \\
    [--host 0.0.0.0] [--port 8080]

Every option can also be set through its environment variable
(TIERMIRROR_BUCKET, TIERMIRROR_REGION, AWS_PROFILE, TIERMIRROR_PREFIX,
TIERMIRROR_DOWNLOAD_DIR, TIERMIRROR_ENDPOINT_URL, TIERMIRROR_RESTORE_DAYS,
TIERMIRROR_RESTORE_TIER, TIERMIRROR_VERIFY, TIERMIRROR_JSON, TIERMIRROR_HOST,
TIERMIRROR_PORT)."
}

/// Runs the parsed command line.
///
/// Returns a [`UsageError`] (inside the `anyhow::Error`) when a required
/// parameter is missing; no client is created in that case.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Pull(args) => {
            let prefix = args.validate()?;
            let storage = &args.storage;

            info!("Starting S3 download");
            info!("Profile: {}", storage.profile.as_deref().unwrap_or("default"));
            info!("Region: {}", storage.region.as_deref().unwrap_or_default());
            info!("Bucket: {}", storage.bucket);
            info!("Prefix: {}", prefix);
            info!("Download directory: {:?}", storage.download_dir);

            let client = S3ObjectStorage::connect(&storage.s3_settings()).await?;
            let mirror = Mirror::new(Arc::new(client), storage.mirror_config());
            let mut report = MirrorReport::new(&storage.bucket, prefix);
            if let Err(e) = mirror.download_prefix_into(prefix, &mut report).await {
                if !args.json {
                    println!("Listing failed; partial results:");
                    print_summary(&report);
                }
                return Err(e.into());
            }

            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report);
            }
            Ok(())
        }
        Commands::Serve(args) => {
            args.storage.validate()?;

            let client = S3ObjectStorage::connect(&args.storage.s3_settings()).await?;
            let mirror = Mirror::new(Arc::new(client), args.storage.mirror_config());
            server::serve(mirror, &format!("{}:{}", args.host, args.port)).await
        }
    }
}

fn print_summary(report: &MirrorReport) {
    println!(
        "Mirrored s3://{}/{}: {} listed, {} downloaded ({} bytes), {} awaiting restore, {} failed",
        report.bucket,
        report.prefix,
        report.listed,
        report.downloaded.len(),
        report.bytes_written,
        report.restore_requested.len(),
        report.failures.len()
    );
    for key in &report.restore_requested {
        println!("  restore requested: {}", key);
    }
    for failure in &report.failures {
        println!("  failed ({:?}): {}: {}", failure.stage, failure.key, failure.message);
    }
    if !report.restore_requested.is_empty() {
        println!("Run again once the restores have completed to fetch the remaining objects.");
    }
}
