//! In-memory cover store, used by tests and the `memory` backend.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::RwLock;

use super::store::{compute_etag, CoverStore};

/// Keeps cover blobs in a `HashMap`. Presigned URLs use a fake
/// `memory://` scheme good enough for asserting on in tests.
pub struct MemoryCoverStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl MemoryCoverStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCoverStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverStore for MemoryCoverStore {
    fn put(
        &self,
        key: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let etag = compute_etag(&data);
            let mut blobs = self.blobs.write().await;
            blobs.insert(key, data);
            Ok(etag)
        })
    }

    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Bytes>>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let blobs = self.blobs.read().await;
            Ok(blobs.get(&key).cloned())
        })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let mut blobs = self.blobs.write().await;
            blobs.remove(&key);
            Ok(())
        })
    }

    fn exists(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let blobs = self.blobs.read().await;
            Ok(blobs.contains_key(&key))
        })
    }

    fn presign_get(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            Ok(format!(
                "memory://{key}?method=GET&expires_in={}",
                expires_in.as_secs()
            ))
        })
    }

    fn presign_put(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            Ok(format!(
                "memory://{key}?method=PUT&expires_in={}",
                expires_in.as_secs()
            ))
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip_and_delete() {
        let store = MemoryCoverStore::new();
        let data = Bytes::from_static(b"jpeg");
        store.put("covers/a.jpg", data.clone()).await.unwrap();
        assert_eq!(store.get("covers/a.jpg").await.unwrap(), Some(data));
        assert!(store.exists("covers/a.jpg").await.unwrap());

        store.delete("covers/a.jpg").await.unwrap();
        assert_eq!(store.get("covers/a.jpg").await.unwrap(), None);

        // Idempotent delete.
        store.delete("covers/a.jpg").await.unwrap();
    }

    #[tokio::test]
    async fn test_presigned_urls_encode_method_and_expiry() {
        let store = MemoryCoverStore::new();
        let url = store
            .presign_get("covers/a.jpg", Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(url, "memory://covers/a.jpg?method=GET&expires_in=3600");

        let url = store
            .presign_put("covers/a.jpg", Duration::from_secs(600))
            .await
            .unwrap();
        assert_eq!(url, "memory://covers/a.jpg?method=PUT&expires_in=600");
    }
}
