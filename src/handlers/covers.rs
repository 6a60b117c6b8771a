//! Signed cover-blob serving.
//!
//! The local cover store presigns URLs that point back at this server:
//! `/covers/{key}?expires=...&signature=...`. These handlers verify the
//! signature and serve or accept the blob, making locally issued
//! presigned URLs work end to end. Backends that presign against a real
//! object store (AWS) never route through here.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tracing::debug;

use crate::covers::sign::{UrlSigner, VerifyError};
use crate::errors::ApiError;
use crate::AppState;

/// Parse a raw query string into a map. Bare parameters (`?x`) map to
/// empty values.
fn parse_query(raw: Option<String>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Some(qs) = raw {
        for part in qs.split('&') {
            if let Some((k, v)) = part.split_once('=') {
                let decoded_k = percent_encoding::percent_decode_str(k)
                    .decode_utf8_lossy()
                    .into_owned();
                let decoded_v = percent_encoding::percent_decode_str(v)
                    .decode_utf8_lossy()
                    .into_owned();
                map.insert(decoded_k, decoded_v);
            } else if !part.is_empty() {
                let decoded = percent_encoding::percent_decode_str(part)
                    .decode_utf8_lossy()
                    .into_owned();
                map.insert(decoded, String::new());
            }
        }
    }
    map
}

/// Check the signature presented in the query against the signer.
fn check_signature(
    signer: Option<&UrlSigner>,
    method: &str,
    key: &str,
    query: &HashMap<String, String>,
) -> Result<(), ApiError> {
    let signer = signer.ok_or_else(|| ApiError::Forbidden {
        message: "Signed cover URLs are not enabled".to_string(),
    })?;

    let expires: u64 = query
        .get("expires")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| ApiError::Forbidden {
            message: "Missing or malformed 'expires' parameter".to_string(),
        })?;
    let signature = query.get("signature").ok_or_else(|| ApiError::Forbidden {
        message: "Missing 'signature' parameter".to_string(),
    })?;

    match signer.verify(method, key, expires, signature) {
        Ok(()) => Ok(()),
        Err(VerifyError::Expired) => Err(ApiError::Forbidden {
            message: "Signed URL has expired".to_string(),
        }),
        Err(VerifyError::Mismatch) => Err(ApiError::Forbidden {
            message: "Invalid signature".to_string(),
        }),
    }
}

/// `GET /covers/*key` -- serve a cover blob via a signed URL.
#[utoipa::path(
    get,
    path = "/covers/{key}",
    tag = "Covers",
    operation_id = "GetCover",
    params(
        ("key" = String, Path, description = "Cover blob key"),
        ("expires" = u64, Query, description = "Unix expiry timestamp"),
        ("signature" = String, Query, description = "HMAC-SHA256 signature")
    ),
    responses(
        (status = 200, description = "The cover image"),
        (status = 403, description = "Missing, expired, or invalid signature"),
        (status = 404, description = "No blob at this key")
    )
)]
pub async fn get_cover(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    RawQuery(raw_query): RawQuery,
) -> Result<Response, ApiError> {
    let query = parse_query(raw_query);
    check_signature(state.cover_signer.as_ref(), "GET", &key, &query)?;

    let store = state.covers.require()?;
    let data = store.get(&key).await?.ok_or_else(|| ApiError::NotFound {
        resource: "Cover",
        id: key.clone(),
    })?;

    debug!("Serving cover {key} ({} bytes)", data.len());
    Ok((
        StatusCode::OK,
        [("content-type", "image/jpeg")],
        data,
    )
        .into_response())
}

/// `PUT /covers/*key` -- accept a direct cover upload via a signed URL.
#[utoipa::path(
    put,
    path = "/covers/{key}",
    tag = "Covers",
    operation_id = "PutCover",
    params(
        ("key" = String, Path, description = "Cover blob key"),
        ("expires" = u64, Query, description = "Unix expiry timestamp"),
        ("signature" = String, Query, description = "HMAC-SHA256 signature")
    ),
    request_body = Vec<u8>,
    responses(
        (status = 200, description = "Blob stored; ETag header set"),
        (status = 403, description = "Missing, expired, or invalid signature")
    )
)]
pub async fn put_cover(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    RawQuery(raw_query): RawQuery,
    body: Bytes,
) -> Result<Response, ApiError> {
    let query = parse_query(raw_query);
    check_signature(state.cover_signer.as_ref(), "PUT", &key, &query)?;

    let store = state.covers.require()?;
    let etag = store.put(&key, body).await?;

    debug!("Stored cover {key} etag={etag}");
    Ok((StatusCode::OK, [("etag", etag)]).into_response())
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::MemoryCatalogStore;
    use crate::catalog::Catalog;
    use crate::config::Config;
    use crate::covers::local::LocalCoverStore;
    use crate::covers::Covers;

    fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let signer = UrlSigner::new("test-secret", "http://localhost:9310");
        let store =
            LocalCoverStore::new(dir.path(), signer.clone()).expect("failed to create store");
        let state = Arc::new(AppState {
            config: Config::default(),
            catalog: Catalog::Ready(Arc::new(MemoryCatalogStore::new())),
            covers: Covers::Enabled(Arc::new(store)),
            cover_signer: Some(signer),
        });
        (dir, state)
    }

    fn signed_query(state: &AppState, method: &str, key: &str) -> Option<String> {
        let signer = state.cover_signer.as_ref().unwrap();
        let expires = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 60;
        let signature = signer.signature(method, key, expires);
        Some(format!("expires={expires}&signature={signature}"))
    }

    #[tokio::test]
    async fn test_put_then_get_with_valid_signature() {
        let (_dir, state) = test_state();
        let key = "covers/abc.jpg".to_string();

        let response = put_cover(
            State(state.clone()),
            Path(key.clone()),
            RawQuery(signed_query(&state, "PUT", &key)),
            Bytes::from_static(b"jpeg bytes"),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("etag"));

        let response = get_cover(
            State(state.clone()),
            Path(key.clone()),
            RawQuery(signed_query(&state, "GET", &key)),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "image/jpeg"
        );
    }

    #[tokio::test]
    async fn test_missing_signature_is_forbidden() {
        let (_dir, state) = test_state();
        let err = get_cover(
            State(state),
            Path("covers/abc.jpg".to_string()),
            RawQuery(None),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_wrong_method_signature_is_forbidden() {
        let (_dir, state) = test_state();
        let key = "covers/abc.jpg".to_string();
        // A GET signature does not authorize a PUT.
        let err = put_cover(
            State(state.clone()),
            Path(key.clone()),
            RawQuery(signed_query(&state, "GET", &key)),
            Bytes::from_static(b"x"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid signature");
    }

    #[tokio::test]
    async fn test_expired_signature_is_forbidden() {
        let (_dir, state) = test_state();
        let key = "covers/abc.jpg".to_string();
        let signer = state.cover_signer.as_ref().unwrap();
        let expires = 1; // long past
        let signature = signer.signature("GET", &key, expires);
        let err = get_cover(
            State(state.clone()),
            Path(key),
            RawQuery(Some(format!("expires={expires}&signature={signature}"))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Signed URL has expired");
    }

    #[tokio::test]
    async fn test_get_missing_blob_is_not_found() {
        let (_dir, state) = test_state();
        let key = "covers/no-such.jpg".to_string();
        let err = get_cover(
            State(state.clone()),
            Path(key.clone()),
            RawQuery(signed_query(&state, "GET", &key)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), format!("Cover with id {key} not found"));
    }
}
