//! Cover blob store trait.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use md5::{Digest, Md5};

/// Trait for cover-image blob storage operations.
///
/// Keys are opaque slash-separated strings chosen by the lifecycle
/// manager (e.g. `covers/{bookId}/{uuid}.jpg`). Methods return pinned
/// boxed futures so the trait stays object-safe.
pub trait CoverStore: Send + Sync {
    /// Store a blob, returning its quoted MD5 ETag.
    fn put(
        &self,
        key: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>>;

    /// Fetch a blob. `Ok(None)` when the key does not exist.
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Bytes>>> + Send + '_>>;

    /// Delete a blob. Idempotent: deleting a missing key succeeds.
    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Whether a blob exists at `key`.
    fn exists(&self, key: &str)
        -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>>;

    /// Build a time-limited URL that grants a read of `key`.
    fn presign_get(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>>;

    /// Build a time-limited URL that grants a write of `key`.
    fn presign_put(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>>;
}

/// Compute the quoted hex MD5 ETag of a blob.
pub fn compute_etag(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    format!("\"{}\"", hex::encode(hasher.finalize()))
}

// ── Tests ───────────────────────────────────────────────────────────
