//! AWS S3 cover store.
//!
//! Proxies cover blob operations to a real S3 bucket (or an
//! S3-compatible endpoint such as MinIO or LocalStack). Presigned URLs
//! come from the SDK, so reads and uploads go straight to the bucket
//! without passing through this server.
//!
//! Credentials are resolved via the standard AWS credential chain
//! (env vars, `~/.aws/credentials`, IAM role, etc.) unless explicit
//! keys are configured.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, info};

use crate::config::AwsCoversConfig;

use super::store::{compute_etag, CoverStore};

/// Cover store that forwards operations to an S3 bucket.
pub struct AwsCoverStore {
    client: Client,
    bucket: String,
    /// Key prefix namespacing all covers in the bucket.
    prefix: String,
}

impl AwsCoverStore {
    /// Create a new S3 cover store from configuration.
    pub async fn new(cfg: &AwsCoversConfig) -> anyhow::Result<Self> {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(cfg.region.clone()));

        if !cfg.endpoint_url.is_empty() {
            config_loader = config_loader.endpoint_url(&cfg.endpoint_url);
        }

        // If explicit credentials are provided, inject them as static credentials.
        if !cfg.access_key_id.is_empty() && !cfg.secret_access_key.is_empty() {
            let creds = aws_sdk_s3::config::Credentials::new(
                &cfg.access_key_id,
                &cfg.secret_access_key,
                None, // session_token
                None, // expiry
                "bookdex-config",
            );
            config_loader = config_loader.credentials_provider(creds);
        }

        let sdk_config = config_loader.load().await;
        let s3_config_builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(cfg.use_path_style);
        let client = Client::from_conf(s3_config_builder.build());

        info!(
            "AWS cover store initialized: bucket={} prefix='{}'",
            cfg.bucket, cfg.prefix
        );

        Ok(Self {
            client,
            bucket: cfg.bucket.clone(),
            prefix: cfg.prefix.clone(),
        })
    }

    /// Map a cover key to an upstream S3 key.
    fn s3_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Map an AWS SDK error to an anyhow error with context.
    fn map_sdk_error(context: &str, err: impl std::fmt::Display) -> anyhow::Error {
        anyhow::anyhow!("AWS S3 {context}: {err}")
    }
}

impl CoverStore for AwsCoverStore {
    fn put(
        &self,
        key: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let s3_key = self.s3_key(&key);

            // Compute MD5 locally for a consistent ETag
            // (AWS may return a different ETag with server-side encryption).
            let etag = compute_etag(&data);

            debug!("AWS put_object: bucket={} key={}", self.bucket, s3_key);

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .content_type("image/jpeg")
                .body(aws_sdk_s3::primitives::ByteStream::from(data))
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("put_object", e))?;

            Ok(etag)
        })
    }

    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Bytes>>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let s3_key = self.s3_key(&key);

            debug!("AWS get_object: bucket={} key={}", self.bucket, s3_key);

            let resp = match self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    let service_err = e.into_service_error();
                    if service_err.is_no_such_key() {
                        return Ok(None);
                    }
                    return Err(Self::map_sdk_error("get_object", service_err));
                }
            };

            let body = resp
                .body
                .collect()
                .await
                .map_err(|e| Self::map_sdk_error("get_object body", e))?
                .into_bytes();

            Ok(Some(body))
        })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let s3_key = self.s3_key(&key);

            debug!("AWS delete_object: bucket={} key={}", self.bucket, s3_key);

            // S3 delete_object is idempotent -- no error for missing keys.
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("delete_object", e))?;

            Ok(())
        })
    }

    fn exists(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let s3_key = self.s3_key(&key);

            debug!("AWS head_object: bucket={} key={}", self.bucket, s3_key);

            match self
                .client
                .head_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .send()
                .await
            {
                Ok(_) => Ok(true),
                Err(e) => {
                    let service_err = e.into_service_error();
                    if service_err.is_not_found() {
                        Ok(false)
                    } else {
                        Err(Self::map_sdk_error("head_object", service_err))
                    }
                }
            }
        })
    }

    fn presign_get(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let s3_key = self.s3_key(&key);
            let presigning = PresigningConfig::expires_in(expires_in)
                .map_err(|e| Self::map_sdk_error("presigning config", e))?;

            let presigned = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .presigned(presigning)
                .await
                .map_err(|e| Self::map_sdk_error("presign get_object", e))?;

            Ok(presigned.uri().to_string())
        })
    }

    fn presign_put(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let s3_key = self.s3_key(&key);
            let presigning = PresigningConfig::expires_in(expires_in)
                .map_err(|e| Self::map_sdk_error("presigning config", e))?;

            let presigned = self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(&s3_key)
                .content_type("image/jpeg")
                .presigned(presigning)
                .await
                .map_err(|e| Self::map_sdk_error("presign put_object", e))?;

            Ok(presigned.uri().to_string())
        })
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // We can't construct a full AwsCoverStore in unit tests without AWS
    // credentials, but the key mapping formula is testable directly.

    #[test]
    fn test_s3_key_mapping() {
        let prefix = "bookdex/";
        let key = "covers/65a1b2c3d4e5f60718293a4b/abc.jpg";
        assert_eq!(
            format!("{prefix}{key}"),
            "bookdex/covers/65a1b2c3d4e5f60718293a4b/abc.jpg"
        );
    }

    #[test]
    fn test_s3_key_mapping_no_prefix() {
        let prefix = "";
        let key = "covers/abc.jpg";
        assert_eq!(format!("{prefix}{key}"), "covers/abc.jpg");
    }
}
