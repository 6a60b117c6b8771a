//! Author CRUD handlers.
//!
//! Author name uniqueness is a check-then-act lookup, not a storage
//! constraint: two racing creates can both pass the check. The window
//! is accepted, matching how duplicates are handled everywhere else in
//! this API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde_json::json;
use tracing::info;

use crate::catalog::store::{AuthorRecord, UpdateOutcome};
use crate::errors::ApiError;
use crate::ident::DocId;
use crate::AppState;

use super::{parse_body, require_name};

fn parse_author_id(id_str: &str) -> Result<DocId, ApiError> {
    id_str
        .parse()
        .map_err(|_| ApiError::InvalidId { param: "authorId" })
}

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound {
        resource: "Author",
        id: id.to_string(),
    }
}

fn author_json(author: &AuthorRecord) -> serde_json::Value {
    json!({ "_id": author.id.to_string(), "name": author.name })
}

/// `GET /authors` -- list all authors.
#[utoipa::path(
    get,
    path = "/authors",
    tag = "Authors",
    operation_id = "ListAuthors",
    responses(
        (status = 200, description = "All authors"),
        (status = 500, description = "Catalog unavailable")
    )
)]
pub async fn list_authors(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let store = state.catalog.store()?;
    let authors = store.list_authors().await?;
    let rendered: Vec<_> = authors.iter().map(author_json).collect();
    Ok(Json(json!({ "authors": rendered })).into_response())
}

/// `POST /authors` -- create an author.
#[utoipa::path(
    post,
    path = "/authors",
    tag = "Authors",
    operation_id = "CreateAuthor",
    request_body = Vec<u8>,
    responses(
        (status = 201, description = "Author created"),
        (status = 400, description = "Missing or invalid name"),
        (status = 409, description = "Duplicate author name")
    )
)]
pub async fn create_author(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let data = parse_body(&body)?;
    let name = require_name(&data, false)?;

    let store = state.catalog.store()?;
    if store.find_author_by_name(&name, None).await?.is_some() {
        return Err(ApiError::Conflict {
            message: format!("Author with name '{name}' already exists."),
        });
    }

    let author = AuthorRecord {
        id: DocId::generate(),
        name: name.clone(),
    };
    store.insert_author(&author).await?;
    info!("Created author {} ({})", author.id, author.name);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Author created successfully",
            "author_id": author.id.to_string(),
            "name": name,
        })),
    )
        .into_response())
}

/// `GET /authors/{authorId}` -- fetch one author.
#[utoipa::path(
    get,
    path = "/authors/{authorId}",
    tag = "Authors",
    operation_id = "GetAuthor",
    params(("authorId" = String, Path, description = "Author identifier")),
    responses(
        (status = 200, description = "The author"),
        (status = 400, description = "Malformed identifier"),
        (status = 404, description = "No such author")
    )
)]
pub async fn get_author(
    State(state): State<Arc<AppState>>,
    Path(author_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_author_id(&author_id)?;
    let store = state.catalog.store()?;
    let author = store
        .get_author(&id)
        .await?
        .ok_or_else(|| not_found(&author_id))?;
    Ok(Json(author_json(&author)).into_response())
}

/// `PUT /authors/{authorId}` -- rename an author.
#[utoipa::path(
    put,
    path = "/authors/{authorId}",
    tag = "Authors",
    operation_id = "UpdateAuthor",
    params(("authorId" = String, Path, description = "Author identifier")),
    request_body = Vec<u8>,
    responses(
        (status = 200, description = "Renamed, or no change needed"),
        (status = 400, description = "Malformed identifier or name"),
        (status = 404, description = "No such author"),
        (status = 409, description = "Duplicate author name")
    )
)]
pub async fn update_author(
    State(state): State<Arc<AppState>>,
    Path(author_id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let data = parse_body(&body)?;
    let name = require_name(&data, true)?;
    let id = parse_author_id(&author_id)?;

    let store = state.catalog.store()?;
    // Another author may already hold the target name; renaming to the
    // author's own current name is allowed (and reports no change).
    if store
        .find_author_by_name(&name, Some(&id))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict {
            message: format!("Another author with name '{name}' already exists."),
        });
    }

    match store.rename_author(&id, &name).await? {
        UpdateOutcome::Missing => Err(not_found(&author_id)),
        UpdateOutcome::Unchanged => Ok(Json(json!({
            "message": "Author found, but no changes applied (name was already the same).",
            "author_id": author_id,
            "name": name,
        }))
        .into_response()),
        UpdateOutcome::Updated => {
            info!("Renamed author {id} to {name}");
            Ok(Json(json!({
                "message": "Author updated successfully",
                "author_id": author_id,
                "new_name": name,
            }))
            .into_response())
        }
    }
}

/// `DELETE /authors/{authorId}` -- delete an author.
///
/// Books referencing the author are left untouched; their references
/// dangle until the client repoints them.
#[utoipa::path(
    delete,
    path = "/authors/{authorId}",
    tag = "Authors",
    operation_id = "DeleteAuthor",
    params(("authorId" = String, Path, description = "Author identifier")),
    responses(
        (status = 200, description = "Author deleted"),
        (status = 400, description = "Malformed identifier"),
        (status = 404, description = "No such author")
    )
)]
pub async fn delete_author(
    State(state): State<Arc<AppState>>,
    Path(author_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_author_id(&author_id)?;
    let store = state.catalog.store()?;
    if !store.delete_author(&id).await? {
        return Err(not_found(&author_id));
    }
    info!("Deleted author {id}");
    Ok(Json(json!({
        "message": format!("Author with id {author_id} deleted successfully"),
    }))
    .into_response())
}

// ── Tests ───────────────────────────────────────────────────────────
