//! File verification against object ETags (MD5 checksums).

use crate::error::MirrorError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Computes the MD5 hash of a local file.
///
/// This function reads the file in chunks to avoid loading large files
/// entirely into memory. It runs in a blocking task to avoid blocking
/// the async runtime.
///
/// # Arguments
///
/// * `path` - Path to the file
///
/// # Returns
///
/// The MD5 hash as a hexadecimal string, or an error.
pub(crate) async fn compute_file_md5(path: &Path) -> Result<String, MirrorError> {
    let path: PathBuf = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        use md5::{Digest, Md5};
        use std::io::Read;

        let file = std::fs::File::open(&path)?;
        let mut reader = std::io::BufReader::with_capacity(1024 * 1024, file);
        let mut hasher = Md5::new();
        let mut buffer = vec![0u8; 1024 * 1024];

        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok::<String, MirrorError>(format!("{:x}", hasher.finalize()))
    })
    .await
    .map_err(|e| MirrorError::IoError(std::io::Error::other(format!("Task join error: {}", e))))?
}

/// Whether an ETag is a plain MD5 digest of the object bytes.
///
/// Multipart uploads have ETags of the form `<md5-of-md5s>-<parts>`.
pub(crate) fn is_plain_md5(e_tag: &str) -> bool {
    e_tag.len() == 32 && e_tag.chars().all(|c| c.is_ascii_hexdigit())
}

/// Checks a downloaded file against the object's ETag.
///
/// Returns `Ok(true)` when the digest matched, `Ok(false)` when the ETag is
/// absent or not an MD5 and nothing could be checked. On a mismatch the file
/// is deleted and [`MirrorError::ChecksumMismatch`] is returned.
pub(crate) async fn verify_download(
    path: &Path,
    key: &str,
    e_tag: Option<&str>,
) -> Result<bool, MirrorError> {
    let expected = match e_tag {
        Some(tag) if is_plain_md5(tag) => tag.to_ascii_lowercase(),
        Some(tag) => {
            debug!("Skipping MD5 check for '{}' (ETag {} is not an MD5)", key, tag);
            return Ok(false);
        }
        None => {
            debug!("Skipping MD5 check for '{}' (no ETag)", key);
            return Ok(false);
        }
    };

    let actual = compute_file_md5(path).await?;
    if actual != expected {
        let _ = tokio::fs::remove_file(path).await;
        return Err(MirrorError::ChecksumMismatch {
            key: key.to_string(),
            expected,
            actual,
        });
    }

    info!("✅ MD5 verified for {}", key);
    Ok(true)
}
