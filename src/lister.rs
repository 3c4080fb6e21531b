//! Paginated listing of a bucket prefix.

use crate::client::ObjectStorage;
use crate::error::MirrorError;
use async_stream::try_stream;
use futures_util::Stream;
use tracing::{debug, warn};

/// Lists every key under `prefix`, following continuation tokens.
///
/// The stream is lazy: a page is only requested once the keys of the previous
/// page have been consumed. A listing error is yielded once and ends the
/// stream. Calling this again starts over from the first page.
///
/// # Example
///
/// ```ignore
/// use futures_util::{pin_mut, StreamExt};
///
/// let keys = list_prefix(&client, "my-bucket", "backup/2024/");
/// pin_mut!(keys);
///
/// while let Some(key) = keys.next().await {
///     println!("Found: {}", key?);
/// }
/// ```
pub fn list_prefix<'a, C>(
    client: &'a C,
    bucket: &'a str,
    prefix: &'a str,
) -> impl Stream<Item = Result<String, MirrorError>> + 'a
where
    C: ObjectStorage + ?Sized,
{
    try_stream! {
        let mut continuation_token: Option<String> = None;
        let mut page_number = 0usize;

        loop {
            let page = client
                .list_objects(bucket, prefix, continuation_token.take())
                .await?;
            page_number += 1;
            debug!(
                "Listing page {} for s3://{}/{}: {} keys (truncated: {})",
                page_number,
                bucket,
                prefix,
                page.keys.len(),
                page.is_truncated
            );

            for key in page.keys {
                yield key;
            }

            if !page.is_truncated {
                break;
            }
            match page.next_token {
                Some(token) => continuation_token = Some(token),
                None => {
                    warn!(
                        "Listing of s3://{}/{} reported more pages without a continuation token; stopping",
                        bucket, prefix
                    );
                    break;
                }
            }
        }
    }
}
