//! Local filesystem cover store.
//!
//! Blobs are stored as flat files under a configurable root directory,
//! using the cover key directly as a relative path. Writes follow the
//! temp-fsync-rename pattern so a crash never leaves a partial blob at
//! a final path. Presigned URLs are HMAC-signed `/covers/{key}` links
//! served by this process.

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;

use super::sign::UrlSigner;
use super::store::{compute_etag, CoverStore};

/// Stores cover blobs on the local filesystem.
pub struct LocalCoverStore {
    /// Root directory for all stored blobs.
    root: PathBuf,
    /// Signer for the URLs this store hands out.
    signer: UrlSigner,
}

impl LocalCoverStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>, signer: UrlSigner) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        std::fs::create_dir_all(root.join(".tmp"))?;
        Ok(Self { root, signer })
    }

    /// Resolve a cover key to an absolute file path, rejecting keys
    /// that would escape the root directory.
    fn resolve(&self, key: &str) -> anyhow::Result<PathBuf> {
        for component in std::path::Path::new(key).components() {
            if let std::path::Component::ParentDir = component {
                anyhow::bail!("Path traversal detected in cover key: {}", key);
            }
        }
        Ok(self.root.join(key))
    }

    /// Generate a temp file path under .tmp/ for atomic writes.
    fn temp_path(&self) -> PathBuf {
        let id = uuid::Uuid::new_v4();
        self.root.join(".tmp").join(format!("tmp-{}", id))
    }
}

impl CoverStore for LocalCoverStore {
    fn put(
        &self,
        key: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let final_path = self.resolve(&key)?;

            // Keys contain '/' separators.
            if let Some(parent) = final_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let etag = compute_etag(&data);

            // Temp-fsync-rename so readers never see a partial file.
            let tmp_path = self.temp_path();
            if let Some(parent) = tmp_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;
            std::fs::rename(&tmp_path, &final_path)?;

            Ok(etag)
        })
    }

    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Bytes>>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.resolve(&key)?;
            if !path.is_file() {
                return Ok(None);
            }
            Ok(Some(Bytes::from(std::fs::read(&path)?)))
        })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.resolve(&key)?;

            // Idempotent: if the file doesn't exist, that's fine.
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
            Ok(())
        })
    }

    fn exists(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.resolve(&key)?;
            Ok(path.is_file())
        })
    }

    fn presign_get(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.signer.signed_url("GET", &key, expires_in.as_secs())) })
    }

    fn presign_put(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.signer.signed_url("PUT", &key, expires_in.as_secs())) })
    }
}

// ── Tests ───────────────────────────────────────────────────────────
