//! In-memory catalog store.
//!
//! Keeps all records in `BTreeMap`s behind a `tokio::sync::RwLock`.
//! Used by tests and by the `memory` catalog engine.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::RwLock;

use crate::ident::DocId;

use super::store::{AuthorRecord, BookPatch, BookRecord, CatalogStore, UpdateOutcome};

/// In-memory implementation of [`CatalogStore`].
pub struct MemoryCatalogStore {
    authors: RwLock<BTreeMap<DocId, AuthorRecord>>,
    books: RwLock<BTreeMap<DocId, BookRecord>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self {
            authors: RwLock::new(BTreeMap::new()),
            books: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn list_authors<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<AuthorRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let authors = self.authors.read().await;
            Ok(authors.values().cloned().collect())
        })
    }

    fn get_author<'a>(
        &'a self,
        id: &'a DocId,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<AuthorRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let authors = self.authors.read().await;
            Ok(authors.get(id).cloned())
        })
    }

    fn find_author_by_name<'a>(
        &'a self,
        name: &'a str,
        exclude: Option<&'a DocId>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<AuthorRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let authors = self.authors.read().await;
            Ok(authors
                .values()
                .find(|a| a.name == name && Some(&a.id) != exclude)
                .cloned())
        })
    }

    fn insert_author<'a>(
        &'a self,
        author: &'a AuthorRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut authors = self.authors.write().await;
            authors.insert(author.id, author.clone());
            Ok(())
        })
    }

    fn rename_author<'a>(
        &'a self,
        id: &'a DocId,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<UpdateOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let mut authors = self.authors.write().await;
            match authors.get_mut(id) {
                None => Ok(UpdateOutcome::Missing),
                Some(author) if author.name == name => Ok(UpdateOutcome::Unchanged),
                Some(author) => {
                    author.name = name.to_string();
                    Ok(UpdateOutcome::Updated)
                }
            }
        })
    }

    fn delete_author<'a>(
        &'a self,
        id: &'a DocId,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let mut authors = self.authors.write().await;
            Ok(authors.remove(id).is_some())
        })
    }

    fn list_books<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<BookRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let books = self.books.read().await;
            Ok(books.values().cloned().collect())
        })
    }

    fn get_book<'a>(
        &'a self,
        id: &'a DocId,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<BookRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let books = self.books.read().await;
            Ok(books.get(id).cloned())
        })
    }

    fn insert_book<'a>(
        &'a self,
        book: &'a BookRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut books = self.books.write().await;
            books.insert(book.id, book.clone());
            Ok(())
        })
    }

    fn update_book<'a>(
        &'a self,
        id: &'a DocId,
        patch: &'a BookPatch,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<UpdateOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let mut books = self.books.write().await;
            match books.get_mut(id) {
                None => Ok(UpdateOutcome::Missing),
                Some(book) => {
                    if patch.apply(book) {
                        Ok(UpdateOutcome::Updated)
                    } else {
                        Ok(UpdateOutcome::Unchanged)
                    }
                }
            }
        })
    }

    fn delete_book<'a>(
        &'a self,
        id: &'a DocId,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let mut books = self.books.write().await;
            Ok(books.remove(id).is_some())
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────
