//! Book lifecycle manager.
//!
//! Orchestrates every book operation end to end: validation, cover
//! image handling against the blob store, catalog writes, and
//! enrichment of records with presigned cover URLs.
//!
//! Cover handling is deliberately asymmetric. On create, a bad inline
//! image is logged and skipped so the book is still created without a
//! cover. On update, the client explicitly asked to change the image,
//! so a bad payload or a failed store write fails the whole request.

use std::time::Duration;

use base64::Engine as _;
use metrics::counter;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::catalog::store::{
    BookPatch, BookRecord, CoverKey, CoverKeyChange, UpdateOutcome, patch_fields,
};
use crate::errors::ApiError;
use crate::ident::DocId;
use crate::metrics::{COVERS_DELETED_TOTAL, COVERS_STORED_TOTAL};
use crate::validation::{self, Mode};
use crate::AppState;

/// A book record together with its presigned cover URL, if any.
#[derive(Debug, Clone)]
pub struct EnrichedBook {
    pub record: BookRecord,
    pub cover_url: Option<String>,
}

/// Result of an update request against an existing book.
#[derive(Debug)]
pub enum UpdateResult {
    /// The record changed; the fresh state is returned.
    Updated(EnrichedBook),
    /// The record matched but nothing changed.
    Unchanged,
}

/// A presigned upload grant for a direct-to-store cover upload.
#[derive(Debug, Clone)]
pub struct CoverUploadGrant {
    pub upload_url: String,
    pub cover_key: String,
}

// ── Operations ──────────────────────────────────────────────────────

/// List all books, enriched with cover URLs.
pub async fn list_books(state: &AppState) -> Result<Vec<EnrichedBook>, ApiError> {
    let store = state.catalog.store()?;
    let records = store.list_books().await?;
    let mut books = Vec::with_capacity(records.len());
    for record in records {
        books.push(enrich(state, record).await);
    }
    Ok(books)
}

/// Fetch a single book by its path identifier.
pub async fn get_book(state: &AppState, id_str: &str) -> Result<EnrichedBook, ApiError> {
    let id = parse_book_id(id_str)?;
    let store = state.catalog.store()?;
    let record = store
        .get_book(&id)
        .await?
        .ok_or_else(|| not_found(&id))?;
    Ok(enrich(state, record).await)
}

/// Create a book from a request payload.
///
/// An inline `coverImageBase64` is handled leniently: if it does not
/// decode or the blob write fails, the book is created without a cover.
pub async fn create_book(
    state: &AppState,
    payload: Map<String, Value>,
) -> Result<EnrichedBook, ApiError> {
    let errors = validation::validate_book(&payload, Mode::Create);
    if !errors.is_empty() {
        return Err(ApiError::Validation { details: errors });
    }

    let mut record = book_from_payload(&payload)?;

    if let Some(covers) = state.covers.enabled() {
        if let Some(Value::String(encoded)) = payload.get("coverImageBase64") {
            if !encoded.is_empty() {
                match base64::engine::general_purpose::STANDARD.decode(encoded) {
                    Err(err) => {
                        warn!("Skipping invalid cover image on create: {err}");
                    }
                    Ok(data) => {
                        let key = format!("covers/{}.jpg", uuid::Uuid::new_v4());
                        match covers.put(&key, data.into()).await {
                            Ok(_) => {
                                counter!(COVERS_STORED_TOTAL).increment(1);
                                record.cover_key = CoverKey::Set(key);
                            }
                            Err(err) => {
                                warn!("Failed to store cover image on create: {err:#}");
                            }
                        }
                    }
                }
            }
        }
    }

    let store = state.catalog.store()?;
    store.insert_book(&record).await?;
    info!("Created book {} ({})", record.id, record.title);

    let record = store
        .get_book(&record.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("book {} vanished after insert", record.id))?;
    Ok(enrich(state, record).await)
}

/// Apply a partial update to a book.
///
/// Image handling runs before the catalog write: a new blob is stored
/// before the old one is deleted, so a crash in between leaves at
/// worst an orphaned blob, never a dangling reference.
pub async fn update_book(
    state: &AppState,
    id_str: &str,
    payload: Map<String, Value>,
) -> Result<UpdateResult, ApiError> {
    let id = parse_book_id(id_str)?;

    let errors = validation::validate_book(&payload, Mode::Update);
    if !errors.is_empty() {
        return Err(ApiError::Validation { details: errors });
    }

    let store = state.catalog.store()?;
    let existing = store
        .get_book(&id)
        .await?
        .ok_or_else(|| not_found(&id))?;

    let mut cover = CoverKeyChange::Keep;
    if let Some(covers) = state.covers.enabled() {
        if let Some(value) = payload.get("coverImageBase64") {
            match value {
                Value::String(encoded) if encoded.is_empty() => {
                    // Explicit clear: delete the old blob, best effort.
                    if let Some(old_key) = existing.cover_key.as_option() {
                        match covers.delete(old_key).await {
                            Ok(()) => counter!(COVERS_DELETED_TOTAL).increment(1),
                            Err(err) => warn!("Failed to delete old cover {old_key}: {err:#}"),
                        }
                    }
                    cover = CoverKeyChange::Clear;
                }
                Value::String(encoded) => {
                    let data = base64::engine::general_purpose::STANDARD
                        .decode(encoded)
                        .map_err(|_| ApiError::InvalidImageData)?;
                    let key = format!("covers/{}/{}.jpg", id, uuid::Uuid::new_v4());
                    covers
                        .put(&key, data.into())
                        .await
                        .map_err(ApiError::Internal)?;
                    counter!(COVERS_STORED_TOTAL).increment(1);
                    // New blob is durable; now drop the old one, best effort.
                    if let Some(old_key) = existing.cover_key.as_option() {
                        match covers.delete(old_key).await {
                            Ok(()) => counter!(COVERS_DELETED_TOTAL).increment(1),
                            Err(err) => warn!("Failed to delete old cover {old_key}: {err:#}"),
                        }
                    }
                    cover = CoverKeyChange::Set(key);
                }
                _ => return Err(ApiError::InvalidImageData),
            }
        }
    }

    let patch = patch_from_payload(&payload, cover)?;

    match store.update_book(&id, &patch).await? {
        // The book existed a moment ago; a concurrent delete wins.
        UpdateOutcome::Missing => Err(not_found(&id)),
        UpdateOutcome::Unchanged => Ok(UpdateResult::Unchanged),
        UpdateOutcome::Updated => {
            info!("Updated book {} fields={:?}", id, patch_fields(&patch));
            let record = store
                .get_book(&id)
                .await?
                .ok_or_else(|| not_found(&id))?;
            Ok(UpdateResult::Updated(enrich(state, record).await))
        }
    }
}

/// Delete a book and its cover blob.
pub async fn delete_book(state: &AppState, id_str: &str) -> Result<DocId, ApiError> {
    let id = parse_book_id(id_str)?;
    let store = state.catalog.store()?;

    let existing = store
        .get_book(&id)
        .await?
        .ok_or_else(|| not_found(&id))?;

    // Blob cleanup is best effort; the catalog row is the source of truth.
    if let Some(covers) = state.covers.enabled() {
        if let Some(key) = existing.cover_key.as_option() {
            match covers.delete(key).await {
                Ok(()) => counter!(COVERS_DELETED_TOTAL).increment(1),
                Err(err) => warn!("Failed to delete cover {key} for book {id}: {err:#}"),
            }
        }
    }

    if !store.delete_book(&id).await? {
        return Err(not_found(&id));
    }
    info!("Deleted book {id}");
    Ok(id)
}

/// Issue a presigned upload URL so a client can push a cover straight
/// to the blob store.
pub async fn cover_upload_url(
    state: &AppState,
    id_str: &str,
) -> Result<CoverUploadGrant, ApiError> {
    let id = parse_book_id(id_str)?;
    let store = state.catalog.store()?;
    if store.get_book(&id).await?.is_none() {
        return Err(not_found(&id));
    }

    let covers = state.covers.require()?;
    let cover_key = format!("covers/{id}/upload.jpg");
    let expires = Duration::from_secs(state.config.covers.upload_url_expiry_seconds);
    let upload_url = covers
        .presign_put(&cover_key, expires)
        .await
        .map_err(ApiError::Internal)?;

    Ok(CoverUploadGrant {
        upload_url,
        cover_key,
    })
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Attach a presigned read URL to a record's cover key, if possible.
/// Presign failures degrade to a missing URL rather than failing the
/// whole request.
pub async fn enrich(state: &AppState, record: BookRecord) -> EnrichedBook {
    let cover_url = match (record.cover_key.as_option(), state.covers.enabled()) {
        (Some(key), Some(covers)) => {
            let expires = Duration::from_secs(state.config.covers.read_url_expiry_seconds);
            match covers.presign_get(key, expires).await {
                Ok(url) => Some(url),
                Err(err) => {
                    warn!("Failed to presign cover URL for {key}: {err:#}");
                    None
                }
            }
        }
        _ => None,
    };
    EnrichedBook { record, cover_url }
}

fn parse_book_id(id_str: &str) -> Result<DocId, ApiError> {
    id_str
        .parse()
        .map_err(|_| ApiError::InvalidId { param: "bookId" })
}

fn not_found(id: &DocId) -> ApiError {
    ApiError::NotFound {
        resource: "Book",
        id: id.to_string(),
    }
}

/// Extract a validated string field. The payload has already passed
/// validation, so a missing or mistyped field here is a bug.
fn string_field(payload: &Map<String, Value>, field: &str) -> anyhow::Result<String> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("validated payload missing string field {field}"))
}

/// Build a new record from a create payload that passed validation.
fn book_from_payload(payload: &Map<String, Value>) -> anyhow::Result<BookRecord> {
    let author = string_field(payload, "author")?
        .parse()
        .map_err(|_| anyhow::anyhow!("validated payload has unparseable author id"))?;
    let publish_date = validation::parse_publish_date(&string_field(payload, "publishDate")?)
        .ok_or_else(|| anyhow::anyhow!("validated payload has unparseable publishDate"))?;
    let page_count = payload
        .get("pageCount")
        .and_then(Value::as_i64)
        .ok_or_else(|| anyhow::anyhow!("validated payload missing pageCount"))?;

    Ok(BookRecord {
        id: DocId::generate(),
        title: string_field(payload, "title")?,
        author,
        publish_date,
        page_count,
        description: string_field(payload, "description")?,
        cover_key: CoverKey::Unset,
    })
}

/// Build a patch from an update payload that passed validation.
fn patch_from_payload(
    payload: &Map<String, Value>,
    cover: CoverKeyChange,
) -> anyhow::Result<BookPatch> {
    let mut patch = BookPatch {
        cover,
        ..Default::default()
    };
    if payload.contains_key("title") {
        patch.title = Some(string_field(payload, "title")?);
    }
    if payload.contains_key("author") {
        patch.author = Some(
            string_field(payload, "author")?
                .parse()
                .map_err(|_| anyhow::anyhow!("validated payload has unparseable author id"))?,
        );
    }
    if payload.contains_key("publishDate") {
        patch.publish_date = Some(
            validation::parse_publish_date(&string_field(payload, "publishDate")?)
                .ok_or_else(|| anyhow::anyhow!("validated payload has unparseable publishDate"))?,
        );
    }
    if payload.contains_key("pageCount") {
        patch.page_count = Some(
            payload
                .get("pageCount")
                .and_then(Value::as_i64)
                .ok_or_else(|| anyhow::anyhow!("validated payload has non-integer pageCount"))?,
        );
    }
    if payload.contains_key("description") {
        patch.description = Some(string_field(payload, "description")?);
    }
    Ok(patch)
}

// ── Tests ───────────────────────────────────────────────────────────
