//! Object download into the local mirror.

use crate::client::ObjectStorage;
use crate::error::MirrorError;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

/// A file written by [`download_object`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedObject {
    /// Local path, `destination_root` joined with the key.
    pub path: PathBuf,
    /// Bytes copied from the object body.
    pub bytes: u64,
}

/// Maps an object key to its path under `destination_root`.
///
/// Each `/`-separated segment of the key becomes a path component. Empty and
/// `.` segments are dropped, so `a//b` and `/a/b` both land at `root/a/b`.
/// Keys containing a `..` segment are rejected, as are keys with no segment
/// left, since no file can be written at the root itself.
pub fn target_path(destination_root: &Path, key: &str) -> Result<PathBuf, MirrorError> {
    match join_key(destination_root, key)? {
        (_, 0) => Err(MirrorError::UnsafeKey {
            key: key.to_string(),
        }),
        (path, _) => Ok(path),
    }
}

/// Joins the key segments onto the root, returning the path and segment count.
fn join_key(destination_root: &Path, key: &str) -> Result<(PathBuf, usize), MirrorError> {
    let mut path = destination_root.to_path_buf();
    let mut segments = 0usize;

    for segment in key.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(MirrorError::UnsafeKey {
                    key: key.to_string(),
                })
            }
            _ => {
                path.push(segment);
                segments += 1;
            }
        }
    }
    Ok((path, segments))
}

/// Whether the key is a zero-byte "folder" object created by consoles and sync tools.
pub fn is_directory_marker(key: &str) -> bool {
    key.ends_with('/')
}

/// Creates the local directory that matches a directory marker key.
///
/// Markers with no segments (`/`, `./`) name the destination root itself.
pub async fn create_directory(destination_root: &Path, key: &str) -> Result<PathBuf, MirrorError> {
    let (path, _) = join_key(destination_root, key)?;
    tokio::fs::create_dir_all(&path).await?;
    debug!("Created directory {:?} for '{}'", path, key);
    Ok(path)
}

/// Streams an object into `destination_root/key`.
///
/// Parent directories are created as needed and an existing file is
/// truncated. The write is not atomic: if the body stream breaks, whatever was
/// copied so far stays on disk. When `expected_size` is known, a body that
/// ends early (or runs long) is reported as [`MirrorError::SizeMismatch`].
///
/// # Arguments
///
/// * `client` - Storage to read from
/// * `bucket` - Bucket holding the object
/// * `key` - Object key
/// * `destination_root` - Root of the local mirror
/// * `expected_size` - Content length from the head request, if any
///
/// # Returns
///
/// The written path and byte count, or an error.
pub async fn download_object<C>(
    client: &C,
    bucket: &str,
    key: &str,
    destination_root: &Path,
    expected_size: Option<u64>,
) -> Result<DownloadedObject, MirrorError>
where
    C: ObjectStorage + ?Sized,
{
    let path = target_path(destination_root, key)?;

    // Create parent directory if needed
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut body = client.get_object(bucket, key).await?;
    let mut file = BufWriter::new(tokio::fs::File::create(&path).await?);

    let bytes = tokio::io::copy(&mut body, &mut file)
        .await
        .map_err(|e| MirrorError::Get {
            key: key.to_string(),
            message: format!("stream interrupted: {}", e),
        })?;
    file.flush().await?;

    match expected_size {
        Some(expected) if expected != bytes => {
            return Err(MirrorError::SizeMismatch {
                key: key.to_string(),
                expected,
                actual: bytes,
            });
        }
        Some(_) => {}
        None => warn!("Content-Length was not reported for {}. Cannot verify size.", key),
    }

    info!("Downloaded: {} ({} bytes)", key, bytes);
    Ok(DownloadedObject { path, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockObjectStorage, ObjectReader};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn body(bytes: &'static [u8]) -> ObjectReader {
        Box::pin(Cursor::new(bytes))
    }

    #[test]
    fn test_target_path_joins_segments() {
        let root = Path::new("/data/mirror");

        assert_eq!(
            target_path(root, "backup/2024/file.txt").unwrap(),
            PathBuf::from("/data/mirror/backup/2024/file.txt")
        );
        assert_eq!(
            target_path(root, "/backup//./file.txt").unwrap(),
            PathBuf::from("/data/mirror/backup/file.txt")
        );
    }

    #[test]
    fn test_target_path_rejects_escape() {
        let root = Path::new("/data/mirror");

        assert!(matches!(
            target_path(root, "backup/../../etc/passwd"),
            Err(MirrorError::UnsafeKey { .. })
        ));
        assert!(matches!(
            target_path(root, "//"),
            Err(MirrorError::UnsafeKey { .. })
        ));
    }

    #[tokio::test]
    async fn test_root_marker_is_the_destination_root() {
        let dir = tempdir().unwrap();

        for key in ["/", "./", "//"] {
            let path = create_directory(dir.path(), key).await.unwrap();
            assert_eq!(path, dir.path());
        }
    }

    #[tokio::test]
    async fn test_short_body_is_size_mismatch() {
        let dir = tempdir().unwrap();
        let mut client = MockObjectStorage::new();
        client
            .expect_get_object()
            .times(1)
            .returning(|_, _| Ok(body(b"short")));

        let err = download_object(&client, "bucket", "big.bin", dir.path(), Some(100))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MirrorError::SizeMismatch {
                expected: 100,
                actual: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_is_directory_marker() {
        assert!(is_directory_marker("backup/2024/"));
        assert!(!is_directory_marker("backup/2024/file.txt"));
    }

    #[tokio::test]
    async fn test_download_creates_parents() {
        let dir = tempdir().unwrap();
        let mut client = MockObjectStorage::new();
        client
            .expect_get_object()
            .times(1)
            .returning(|_, _| Ok(body(b"test content")));

        let downloaded =
            download_object(&client, "bucket", "prefix/nested/file1.txt", dir.path(), Some(12))
                .await
                .unwrap();

        assert_eq!(downloaded.path, dir.path().join("prefix/nested/file1.txt"));
        assert_eq!(downloaded.bytes, 12);
        assert_eq!(
            std::fs::read(&downloaded.path).unwrap(),
            b"test content".to_vec()
        );
    }

    #[tokio::test]
    async fn test_download_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let existing = dir.path().join("prefix/file.txt");
        std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
        std::fs::write(&existing, b"a much longer previous version").unwrap();

        let mut client = MockObjectStorage::new();
        client
            .expect_get_object()
            .times(1)
            .returning(|_, _| Ok(body(b"new")));

        download_object(&client, "bucket", "prefix/file.txt", dir.path(), Some(3))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&existing).unwrap(), b"new".to_vec());
    }

    #[tokio::test]
    async fn test_failed_get_leaves_existing_file() {
        let dir = tempdir().unwrap();
        let existing = dir.path().join("file.txt");
        std::fs::write(&existing, b"old").unwrap();

        let mut client = MockObjectStorage::new();
        client.expect_get_object().times(1).returning(|_, key| {
            Err(MirrorError::Get {
                key: key.to_string(),
                message: "InvalidObjectState".to_string(),
            })
        });

        let err = download_object(&client, "bucket", "file.txt", dir.path(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, MirrorError::Get { .. }));
        assert_eq!(std::fs::read(&existing).unwrap(), b"old".to_vec());
    }

    #[tokio::test]
    async fn test_unsafe_key_never_fetches() {
        let dir = tempdir().unwrap();
        let mut client = MockObjectStorage::new();
        client.expect_get_object().never();

        let err = download_object(&client, "bucket", "../escape.txt", dir.path(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MirrorError::UnsafeKey { .. }));
    }

    #[tokio::test]
    async fn test_create_directory() {
        let dir = tempdir().unwrap();

        let path = create_directory(dir.path(), "prefix/empty/").await.unwrap();

        assert_eq!(path, dir.path().join("prefix/empty"));
        assert!(path.is_dir());
    }
}
