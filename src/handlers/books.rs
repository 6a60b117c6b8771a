//! Book CRUD handlers.
//!
//! Thin HTTP shims over the lifecycle manager: parse the body, call the
//! operation, render the JSON shape clients expect.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde_json::{json, Value};

use crate::catalog::store::CoverKey;
use crate::errors::ApiError;
use crate::lifecycle::{self, EnrichedBook, UpdateResult};
use crate::AppState;

use super::parse_body;

/// Render a book the way the API exposes it: the cover key is omitted
/// when never set, `null` when explicitly cleared, and accompanied by
/// `coverImageUrl` when present.
fn book_json(book: &EnrichedBook) -> Value {
    let record = &book.record;
    let mut rendered = json!({
        "_id": record.id.to_string(),
        "title": record.title,
        "author": record.author.to_string(),
        "publishDate": record.publish_date.format("%Y-%m-%d").to_string(),
        "pageCount": record.page_count,
        "description": record.description,
    });
    match &record.cover_key {
        CoverKey::Unset => {}
        CoverKey::Cleared => {
            rendered["coverImageS3Key"] = Value::Null;
        }
        CoverKey::Set(key) => {
            rendered["coverImageS3Key"] = json!(key);
            rendered["coverImageUrl"] = match &book.cover_url {
                Some(url) => json!(url),
                None => Value::Null,
            };
        }
    }
    rendered
}

/// `GET /books` -- list all books.
#[utoipa::path(
    get,
    path = "/books",
    tag = "Books",
    operation_id = "ListBooks",
    responses(
        (status = 200, description = "All books"),
        (status = 500, description = "Catalog unavailable")
    )
)]
pub async fn list_books(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let books = lifecycle::list_books(&state).await?;
    let rendered: Vec<_> = books.iter().map(book_json).collect();
    Ok(Json(json!({ "books": rendered })).into_response())
}

/// `POST /books` -- create a book, optionally with an inline cover image.
#[utoipa::path(
    post,
    path = "/books",
    tag = "Books",
    operation_id = "CreateBook",
    request_body = Vec<u8>,
    responses(
        (status = 201, description = "Book created"),
        (status = 400, description = "Missing body or validation failure")
    )
)]
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let payload = parse_body(&body)?;
    let book = lifecycle::create_book(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Book created successfully",
            "book": book_json(&book),
        })),
    )
        .into_response())
}

/// `GET /books/{bookId}` -- fetch one book.
#[utoipa::path(
    get,
    path = "/books/{bookId}",
    tag = "Books",
    operation_id = "GetBook",
    params(("bookId" = String, Path, description = "Book identifier")),
    responses(
        (status = 200, description = "The book"),
        (status = 400, description = "Malformed identifier"),
        (status = 404, description = "No such book")
    )
)]
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Response, ApiError> {
    let book = lifecycle::get_book(&state, &book_id).await?;
    Ok(Json(book_json(&book)).into_response())
}

/// `PUT /books/{bookId}` -- partially update a book.
#[utoipa::path(
    put,
    path = "/books/{bookId}",
    tag = "Books",
    operation_id = "UpdateBook",
    params(("bookId" = String, Path, description = "Book identifier")),
    request_body = Vec<u8>,
    responses(
        (status = 200, description = "Updated, or no change needed"),
        (status = 400, description = "Malformed identifier, validation failure, or bad image data"),
        (status = 404, description = "No such book")
    )
)]
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let payload = parse_body(&body)?;
    match lifecycle::update_book(&state, &book_id, payload).await? {
        UpdateResult::Updated(book) => Ok(Json(json!({
            "message": "Book updated successfully",
            "book": book_json(&book),
        }))
        .into_response()),
        UpdateResult::Unchanged => Ok(Json(json!({
            "message": "Book found, but no changes applied or data was the same.",
            "book_id": book_id,
        }))
        .into_response()),
    }
}

/// `DELETE /books/{bookId}` -- delete a book and its cover blob.
#[utoipa::path(
    delete,
    path = "/books/{bookId}",
    tag = "Books",
    operation_id = "DeleteBook",
    params(("bookId" = String, Path, description = "Book identifier")),
    responses(
        (status = 200, description = "Book deleted"),
        (status = 400, description = "Malformed identifier"),
        (status = 404, description = "No such book")
    )
)]
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Response, ApiError> {
    lifecycle::delete_book(&state, &book_id).await?;
    Ok(Json(json!({
        "message": format!("Book with id {book_id} deleted successfully"),
    }))
    .into_response())
}

/// `GET /books/{bookId}/cover-upload-url` -- presigned direct-upload URL.
#[utoipa::path(
    get,
    path = "/books/{bookId}/cover-upload-url",
    tag = "Books",
    operation_id = "GetCoverUploadUrl",
    params(("bookId" = String, Path, description = "Book identifier")),
    responses(
        (status = 200, description = "Upload grant"),
        (status = 400, description = "Malformed identifier"),
        (status = 404, description = "No such book"),
        (status = 500, description = "Cover storage not configured")
    )
)]
pub async fn cover_upload_url(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Response, ApiError> {
    let grant = lifecycle::cover_upload_url(&state, &book_id).await?;
    Ok(Json(json!({
        "uploadUrl": grant.upload_url,
        "coverImageS3Key": grant.cover_key,
    }))
    .into_response())
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::MemoryCatalogStore;
    use crate::catalog::Catalog;
    use crate::config::Config;
    use crate::covers::memory::MemoryCoverStore;
    use crate::covers::Covers;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            config: Config::default(),
            catalog: Catalog::Ready(Arc::new(MemoryCatalogStore::new())),
            covers: Covers::Enabled(Arc::new(MemoryCoverStore::new())),
            cover_signer: None,
        })
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const DUNE: &[u8] = br#"{
        "title": "Dune",
        "author": "65a1b2c3d4e5f60718293a4b",
        "publishDate": "1965-06-01",
        "pageCount": 412,
        "description": "Melange."
    }"#;

    #[tokio::test]
    async fn test_create_renders_book_without_cover_field() {
        let state = test_state();
        let response = create_book(State(state), Bytes::from_static(DUNE))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Book created successfully");

        let book = &body["book"];
        assert_eq!(book["title"], "Dune");
        assert_eq!(book["publishDate"], "1965-06-01");
        assert_eq!(book["pageCount"], 412);
        // Never-set cover: the field is absent, not null.
        assert!(book.get("coverImageS3Key").is_none());
        assert!(book.get("coverImageUrl").is_none());
    }

    #[tokio::test]
    async fn test_create_with_cover_renders_key_and_url() {
        let state = test_state();
        let body = br#"{
            "title": "Dune",
            "author": "65a1b2c3d4e5f60718293a4b",
            "publishDate": "1965-06-01",
            "pageCount": 412,
            "description": "Melange.",
            "coverImageBase64": "anBlZy1ieXRlcw=="
        }"#;
        let response = create_book(State(state), Bytes::from_static(body))
            .await
            .unwrap();
        let body = body_json(response).await;
        let book = &body["book"];
        assert!(book["coverImageS3Key"].as_str().unwrap().ends_with(".jpg"));
        assert!(book["coverImageUrl"].as_str().unwrap().starts_with("memory://"));
    }

    #[tokio::test]
    async fn test_cleared_cover_renders_as_null() {
        let state = test_state();
        let response = create_book(State(state.clone()), Bytes::from_static(DUNE))
            .await
            .unwrap();
        let id = body_json(response).await["book"]["_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = update_book(
            State(state),
            Path(id),
            Bytes::from_static(br#"{"coverImageBase64": ""}"#),
        )
        .await
        .unwrap();
        let body = body_json(response).await;
        let book = &body["book"];
        assert!(book["coverImageS3Key"].is_null());
        assert!(book.get("coverImageUrl").is_none());
    }

    #[tokio::test]
    async fn test_update_no_change_reports_book_id() {
        let state = test_state();
        let response = create_book(State(state.clone()), Bytes::from_static(DUNE))
            .await
            .unwrap();
        let id = body_json(response).await["book"]["_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = update_book(
            State(state),
            Path(id.clone()),
            Bytes::from_static(br#"{"title": "Dune"}"#),
        )
        .await
        .unwrap();
        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            "Book found, but no changes applied or data was the same."
        );
        assert_eq!(body["book_id"], id.as_str());
    }

    #[tokio::test]
    async fn test_delete_message() {
        let state = test_state();
        let response = create_book(State(state.clone()), Bytes::from_static(DUNE))
            .await
            .unwrap();
        let id = body_json(response).await["book"]["_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = delete_book(State(state), Path(id.clone())).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            format!("Book with id {id} deleted successfully")
        );
    }

    #[tokio::test]
    async fn test_cover_upload_url_body() {
        let state = test_state();
        let response = create_book(State(state.clone()), Bytes::from_static(DUNE))
            .await
            .unwrap();
        let id = body_json(response).await["book"]["_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = cover_upload_url(State(state), Path(id.clone()))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(
            body["coverImageS3Key"],
            format!("covers/{id}/upload.jpg")
        );
        assert!(body["uploadUrl"].as_str().unwrap().contains("method=PUT"));
    }
}
