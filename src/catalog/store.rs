//! Catalog store trait and record types.

use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;

use crate::ident::DocId;

/// An author record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRecord {
    pub id: DocId,
    pub name: String,
}

/// Tri-state cover image reference on a book record.
///
/// `Unset` means the book never had a cover (the field is omitted when
/// rendered), while `Cleared` means a cover was explicitly removed (the
/// field renders as JSON `null`). The distinction survives storage so
/// clients see the same shape they wrote.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CoverKey {
    /// Never assigned.
    #[default]
    Unset,
    /// Explicitly removed.
    Cleared,
    /// Points at an object in the cover store.
    Set(String),
}

impl CoverKey {
    /// The stored key, if one is currently assigned.
    pub fn as_option(&self) -> Option<&str> {
        match self {
            CoverKey::Set(key) => Some(key),
            _ => None,
        }
    }
}

/// A book record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub id: DocId,
    pub title: String,
    pub author: DocId,
    pub publish_date: NaiveDate,
    pub page_count: i64,
    pub description: String,
    pub cover_key: CoverKey,
}

/// Requested change to a book's cover reference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CoverKeyChange {
    /// Leave the current value alone.
    #[default]
    Keep,
    /// Remove the cover reference.
    Clear,
    /// Point at a new stored object.
    Set(String),
}

/// Partial update to a book record. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<DocId>,
    pub publish_date: Option<NaiveDate>,
    pub page_count: Option<i64>,
    pub description: Option<String>,
    pub cover: CoverKeyChange,
}

impl BookPatch {
    /// Apply the patch to `record` in place, returning whether anything
    /// actually changed.
    ///
    /// Clearing a cover that was never set still counts as a change:
    /// it moves the field from omitted to explicit `null`.
    pub fn apply(&self, record: &mut BookRecord) -> bool {
        let mut changed = false;

        if let Some(title) = &self.title {
            if record.title != *title {
                record.title = title.clone();
                changed = true;
            }
        }
        if let Some(author) = self.author {
            if record.author != author {
                record.author = author;
                changed = true;
            }
        }
        if let Some(date) = self.publish_date {
            if record.publish_date != date {
                record.publish_date = date;
                changed = true;
            }
        }
        if let Some(count) = self.page_count {
            if record.page_count != count {
                record.page_count = count;
                changed = true;
            }
        }
        if let Some(description) = &self.description {
            if record.description != *description {
                record.description = description.clone();
                changed = true;
            }
        }
        match &self.cover {
            CoverKeyChange::Keep => {}
            CoverKeyChange::Clear => {
                if record.cover_key != CoverKey::Cleared {
                    record.cover_key = CoverKey::Cleared;
                    changed = true;
                }
            }
            CoverKeyChange::Set(key) => {
                if record.cover_key.as_option() != Some(key.as_str()) {
                    record.cover_key = CoverKey::Set(key.clone());
                    changed = true;
                }
            }
        }

        changed
    }
}

/// Result of an update against an identified record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No record matched the identifier.
    Missing,
    /// A record matched but the update produced no change.
    Unchanged,
    /// The record was modified.
    Updated,
}

/// Trait for catalog persistence operations.
///
/// Implemented by the SQLite store and the in-memory store used in
/// tests. Methods return pinned boxed futures so the trait stays
/// object-safe.
pub trait CatalogStore: Send + Sync {
    /// List all authors ordered by id.
    fn list_authors<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<AuthorRecord>>> + Send + 'a>>;

    /// Fetch a single author.
    fn get_author<'a>(
        &'a self,
        id: &'a DocId,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<AuthorRecord>>> + Send + 'a>>;

    /// Find an author by exact name, optionally excluding one id
    /// (used to allow renaming an author to its own current name).
    fn find_author_by_name<'a>(
        &'a self,
        name: &'a str,
        exclude: Option<&'a DocId>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<AuthorRecord>>> + Send + 'a>>;

    /// Insert a new author record.
    fn insert_author<'a>(
        &'a self,
        author: &'a AuthorRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

    /// Rename an author.
    fn rename_author<'a>(
        &'a self,
        id: &'a DocId,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<UpdateOutcome>> + Send + 'a>>;

    /// Delete an author. Returns whether a record existed.
    fn delete_author<'a>(
        &'a self,
        id: &'a DocId,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + 'a>>;

    /// List all books ordered by id.
    fn list_books<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<BookRecord>>> + Send + 'a>>;

    /// Fetch a single book.
    fn get_book<'a>(
        &'a self,
        id: &'a DocId,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<BookRecord>>> + Send + 'a>>;

    /// Insert a new book record.
    fn insert_book<'a>(
        &'a self,
        book: &'a BookRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

    /// Apply a partial update to a book.
    fn update_book<'a>(
        &'a self,
        id: &'a DocId,
        patch: &'a BookPatch,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<UpdateOutcome>> + Send + 'a>>;

    /// Delete a book. Returns whether a record existed.
    fn delete_book<'a>(
        &'a self,
        id: &'a DocId,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + 'a>>;
}

/// Render a patch summary for logging: changed field names only.
pub fn patch_fields(patch: &BookPatch) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if patch.title.is_some() {
        fields.push("title");
    }
    if patch.author.is_some() {
        fields.push("author");
    }
    if patch.publish_date.is_some() {
        fields.push("publishDate");
    }
    if patch.page_count.is_some() {
        fields.push("pageCount");
    }
    if patch.description.is_some() {
        fields.push("description");
    }
    if patch.cover != CoverKeyChange::Keep {
        fields.push("coverImageS3Key");
    }
    fields
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_book() -> BookRecord {
        BookRecord {
            id: DocId::generate(),
            title: "Dune".to_string(),
            author: DocId::generate(),
            publish_date: NaiveDate::from_ymd_opt(1965, 6, 1).unwrap(),
            page_count: 412,
            description: "Melange.".to_string(),
            cover_key: CoverKey::Unset,
        }
    }

    #[test]
    fn test_empty_patch_changes_nothing() {
        let mut book = sample_book();
        let before = book.clone();
        assert!(!BookPatch::default().apply(&mut book));
        assert_eq!(book, before);
    }

    #[test]
    fn test_identical_values_count_as_unchanged() {
        let mut book = sample_book();
        let patch = BookPatch {
            title: Some("Dune".to_string()),
            page_count: Some(412),
            ..Default::default()
        };
        assert!(!patch.apply(&mut book));
    }

    #[test]
    fn test_field_change_is_detected() {
        let mut book = sample_book();
        let patch = BookPatch {
            title: Some("Dune Messiah".to_string()),
            ..Default::default()
        };
        assert!(patch.apply(&mut book));
        assert_eq!(book.title, "Dune Messiah");
    }

    #[test]
    fn test_clear_on_unset_cover_counts_as_change() {
        let mut book = sample_book();
        assert_eq!(book.cover_key, CoverKey::Unset);
        let patch = BookPatch {
            cover: CoverKeyChange::Clear,
            ..Default::default()
        };
        assert!(patch.apply(&mut book));
        assert_eq!(book.cover_key, CoverKey::Cleared);

        // A second clear is a no-op.
        assert!(!patch.apply(&mut book));
    }

    #[test]
    fn test_set_cover_replaces_value() {
        let mut book = sample_book();
        let patch = BookPatch {
            cover: CoverKeyChange::Set("covers/abc.jpg".to_string()),
            ..Default::default()
        };
        assert!(patch.apply(&mut book));
        assert_eq!(book.cover_key.as_option(), Some("covers/abc.jpg"));

        // Same key again: unchanged.
        assert!(!patch.apply(&mut book));
    }

    #[test]
    fn test_patch_fields_summary() {
        let patch = BookPatch {
            title: Some("x".to_string()),
            cover: CoverKeyChange::Clear,
            ..Default::default()
        };
        assert_eq!(patch_fields(&patch), vec!["title", "coverImageS3Key"]);
    }
}
