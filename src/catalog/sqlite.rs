//! SQLite-backed catalog store.
//!
//! Uses `rusqlite` with the `bundled` feature so no system SQLite
//! library is required.  All async trait methods are thin wrappers
//! around synchronous rusqlite calls executed under a `Mutex`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::ident::DocId;
use crate::validation::parse_publish_date;

use super::store::{AuthorRecord, BookPatch, BookRecord, CatalogStore, CoverKey, UpdateOutcome};

/// Current schema version. Bumped when migrations are added.
const SCHEMA_VERSION: i64 = 1;

/// Catalog store backed by a single SQLite database file.
pub struct SqliteCatalogStore {
    /// The database connection, guarded by a mutex for Send + Sync.
    conn: Mutex<Connection>,
}

impl SqliteCatalogStore {
    /// Open (or create) the database at `path` and initialize the schema.
    ///
    /// Passing `":memory:"` creates an in-memory database (useful for tests).
    pub fn new(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.apply_pragmas()?;
        store.init_db()?;
        Ok(store)
    }

    /// Apply recommended SQLite pragmas for performance and safety.
    fn apply_pragmas(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("mutex poisoned");
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
        Ok(())
    }

    /// Create the required tables if they do not already exist.
    /// This is idempotent -- safe to call on every startup.
    fn init_db(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("mutex poisoned");
        conn.execute_batch(
            "
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version    INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );

            -- Authors
            CREATE TABLE IF NOT EXISTS authors (
                id    TEXT PRIMARY KEY,
                name  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_authors_name
                ON authors(name);

            -- Books. cover_image_key distinguishes never-assigned (NULL)
            -- from explicitly cleared ('') so the rendered JSON preserves
            -- the absent-vs-null shape.
            CREATE TABLE IF NOT EXISTS books (
                id               TEXT PRIMARY KEY,
                title            TEXT NOT NULL,
                author_id        TEXT NOT NULL,
                publish_date     TEXT NOT NULL,
                page_count       INTEGER NOT NULL,
                description      TEXT NOT NULL,
                cover_image_key  TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_books_author
                ON books(author_id);
            ",
        )?;

        // Record schema version if not already present.
        let existing: Option<i64> = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .optional()?
            .flatten();

        if existing.is_none() || existing.unwrap() < SCHEMA_VERSION {
            let now = chrono::Utc::now().to_rfc3339();
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                params![SCHEMA_VERSION, now],
            )?;
        }

        Ok(())
    }
}

/// Map the stored `cover_image_key` column to the tri-state cover key.
fn cover_from_column(value: Option<String>) -> CoverKey {
    match value {
        None => CoverKey::Unset,
        Some(s) if s.is_empty() => CoverKey::Cleared,
        Some(s) => CoverKey::Set(s),
    }
}

/// Map the tri-state cover key back to the stored column value.
fn cover_to_column(key: &CoverKey) -> Option<String> {
    match key {
        CoverKey::Unset => None,
        CoverKey::Cleared => Some(String::new()),
        CoverKey::Set(s) => Some(s.clone()),
    }
}

/// Raw book row with the canonical column order: id, title, author_id,
/// publish_date, page_count, description, cover_image_key. Ids and the
/// date are parsed separately so rusqlite row mapping stays infallible.
struct BookRow {
    id: String,
    title: String,
    author: String,
    publish_date: String,
    page_count: i64,
    description: String,
    cover: Option<String>,
}

fn book_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookRow> {
    Ok(BookRow {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        publish_date: row.get(3)?,
        page_count: row.get(4)?,
        description: row.get(5)?,
        cover: row.get(6)?,
    })
}

impl BookRow {
    fn into_record(self) -> anyhow::Result<BookRecord> {
        let id = self
            .id
            .parse()
            .map_err(|_| anyhow::anyhow!("corrupt book id in catalog: {}", self.id))?;
        let author = self
            .author
            .parse()
            .map_err(|_| anyhow::anyhow!("corrupt author id in catalog: {}", self.author))?;
        let publish_date = parse_publish_date(&self.publish_date).ok_or_else(|| {
            anyhow::anyhow!("corrupt publish date in catalog: {}", self.publish_date)
        })?;
        Ok(BookRecord {
            id,
            title: self.title,
            author,
            publish_date,
            page_count: self.page_count,
            description: self.description,
            cover_key: cover_from_column(self.cover),
        })
    }
}

impl CatalogStore for SqliteCatalogStore {
    // ── Authors ─────────────────────────────────────────────────────

    fn list_authors<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<AuthorRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let mut stmt = conn.prepare("SELECT id, name FROM authors ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut authors = Vec::new();
            for row in rows {
                let (id, name) = row?;
                let id = id
                    .parse()
                    .map_err(|_| anyhow::anyhow!("corrupt author id in catalog: {id}"))?;
                authors.push(AuthorRecord { id, name });
            }
            Ok(authors)
        })
    }

    fn get_author<'a>(
        &'a self,
        id: &'a DocId,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<AuthorRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let name: Option<String> = conn
                .query_row(
                    "SELECT name FROM authors WHERE id = ?1",
                    params![id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(name.map(|name| AuthorRecord { id: *id, name }))
        })
    }

    fn find_author_by_name<'a>(
        &'a self,
        name: &'a str,
        exclude: Option<&'a DocId>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<AuthorRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let excluded = exclude.map(|id| id.to_string()).unwrap_or_default();
            let found: Option<String> = conn
                .query_row(
                    "SELECT id FROM authors WHERE name = ?1 AND id != ?2",
                    params![name, excluded],
                    |row| row.get(0),
                )
                .optional()?;
            match found {
                None => Ok(None),
                Some(id) => {
                    let id = id
                        .parse()
                        .map_err(|_| anyhow::anyhow!("corrupt author id in catalog: {id}"))?;
                    Ok(Some(AuthorRecord {
                        id,
                        name: name.to_string(),
                    }))
                }
            }
        })
    }

    fn insert_author<'a>(
        &'a self,
        author: &'a AuthorRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            conn.execute(
                "INSERT INTO authors (id, name) VALUES (?1, ?2)",
                params![author.id.to_string(), author.name],
            )?;
            Ok(())
        })
    }

    fn rename_author<'a>(
        &'a self,
        id: &'a DocId,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<UpdateOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let current: Option<String> = conn
                .query_row(
                    "SELECT name FROM authors WHERE id = ?1",
                    params![id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            match current {
                None => Ok(UpdateOutcome::Missing),
                Some(current) if current == name => Ok(UpdateOutcome::Unchanged),
                Some(_) => {
                    conn.execute(
                        "UPDATE authors SET name = ?1 WHERE id = ?2",
                        params![name, id.to_string()],
                    )?;
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
            let conn = self.conn.lock().expect("mutex poisoned");
            let deleted = conn.execute(
                "DELETE FROM authors WHERE id = ?1",
                params![id.to_string()],
            )?;
            Ok(deleted > 0)
        })
    }

    // ── Books ───────────────────────────────────────────────────────

    fn list_books<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<BookRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let mut stmt = conn.prepare(
                "SELECT id, title, author_id, publish_date, page_count, description, cover_image_key
                 FROM books ORDER BY id",
            )?;
            let rows = stmt.query_map([], book_from_row)?;
            let mut books = Vec::new();
            for row in rows {
                books.push(row?.into_record()?);
            }
            Ok(books)
        })
    }

    fn get_book<'a>(
        &'a self,
        id: &'a DocId,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<BookRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let result = conn
                .query_row(
                    "SELECT id, title, author_id, publish_date, page_count, description, cover_image_key
                     FROM books WHERE id = ?1",
                    params![id.to_string()],
                    book_from_row,
                )
                .optional()?;
            match result {
                None => Ok(None),
                Some(row) => Ok(Some(row.into_record()?)),
            }
        })
    }

    fn insert_book<'a>(
        &'a self,
        book: &'a BookRecord,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            conn.execute(
                "INSERT INTO books (id, title, author_id, publish_date, page_count, description, cover_image_key)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    book.id.to_string(),
                    book.title,
                    book.author.to_string(),
                    book.publish_date.format("%Y-%m-%d").to_string(),
                    book.page_count,
                    book.description,
                    cover_to_column(&book.cover_key),
                ],
            )?;
            Ok(())
        })
    }

    fn update_book<'a>(
        &'a self,
        id: &'a DocId,
        patch: &'a BookPatch,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<UpdateOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let tx = conn.unchecked_transaction()?;

            let existing = tx
                .query_row(
                    "SELECT id, title, author_id, publish_date, page_count, description, cover_image_key
                     FROM books WHERE id = ?1",
                    params![id.to_string()],
                    book_from_row,
                )
                .optional()?;

            let mut record = match existing {
                None => return Ok(UpdateOutcome::Missing),
                Some(row) => row.into_record()?,
            };

            if !patch.apply(&mut record) {
                return Ok(UpdateOutcome::Unchanged);
            }

            tx.execute(
                "UPDATE books SET title = ?1, author_id = ?2, publish_date = ?3,
                        page_count = ?4, description = ?5, cover_image_key = ?6
                 WHERE id = ?7",
                params![
                    record.title,
                    record.author.to_string(),
                    record.publish_date.format("%Y-%m-%d").to_string(),
                    record.page_count,
                    record.description,
                    cover_to_column(&record.cover_key),
                    id.to_string(),
                ],
            )?;
            tx.commit()?;
            Ok(UpdateOutcome::Updated)
        })
    }

    fn delete_book<'a>(
        &'a self,
        id: &'a DocId,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            let deleted = conn.execute("DELETE FROM books WHERE id = ?1", params![id.to_string()])?;
            Ok(deleted > 0)
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::store::CoverKeyChange;
    use chrono::NaiveDate;

    fn test_store() -> SqliteCatalogStore {
        SqliteCatalogStore::new(":memory:").unwrap()
    }

    fn sample_book(author: DocId) -> BookRecord {
        BookRecord {
            id: DocId::generate(),
            title: "Dune".to_string(),
            author,
            publish_date: NaiveDate::from_ymd_opt(1965, 6, 1).unwrap(),
            page_count: 412,
            description: "Melange.".to_string(),
            cover_key: CoverKey::Unset,
        }
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let store = test_store();
        store.init_db().unwrap();
        store.init_db().unwrap();
    }

    #[tokio::test]
    async fn test_author_roundtrip() {
        let store = test_store();
        let herbert = AuthorRecord {
            id: DocId::generate(),
            name: "Frank Herbert".to_string(),
        };
        store.insert_author(&herbert).await.unwrap();

        let fetched = store.get_author(&herbert.id).await.unwrap().unwrap();
        assert_eq!(fetched, herbert);

        assert!(store.get_author(&DocId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rename_author_outcomes() {
        let store = test_store();
        let a = AuthorRecord {
            id: DocId::generate(),
            name: "Ursula".to_string(),
        };
        store.insert_author(&a).await.unwrap();

        assert_eq!(
            store.rename_author(&a.id, "Ursula K. Le Guin").await.unwrap(),
            UpdateOutcome::Updated
        );
        assert_eq!(
            store.rename_author(&a.id, "Ursula K. Le Guin").await.unwrap(),
            UpdateOutcome::Unchanged
        );
        assert_eq!(
            store.rename_author(&DocId::generate(), "x").await.unwrap(),
            UpdateOutcome::Missing
        );
    }

    #[tokio::test]
    async fn test_find_author_by_name() {
        let store = test_store();
        let a = AuthorRecord {
            id: DocId::generate(),
            name: "Frank Herbert".to_string(),
        };
        store.insert_author(&a).await.unwrap();

        let found = store.find_author_by_name("Frank Herbert", None).await.unwrap();
        assert_eq!(found.map(|f| f.id), Some(a.id));

        let found = store
            .find_author_by_name("Frank Herbert", Some(&a.id))
            .await
            .unwrap();
        assert!(found.is_none());

        let found = store.find_author_by_name("Nobody", None).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_book_roundtrip_preserves_cover_states() {
        let store = test_store();
        let author = DocId::generate();

        let unset = sample_book(author);
        let mut cleared = sample_book(author);
        cleared.cover_key = CoverKey::Cleared;
        let mut set = sample_book(author);
        set.cover_key = CoverKey::Set("covers/dune.jpg".to_string());

        for book in [&unset, &cleared, &set] {
            store.insert_book(book).await.unwrap();
        }

        assert_eq!(
            store.get_book(&unset.id).await.unwrap().unwrap().cover_key,
            CoverKey::Unset
        );
        assert_eq!(
            store.get_book(&cleared.id).await.unwrap().unwrap().cover_key,
            CoverKey::Cleared
        );
        assert_eq!(
            store.get_book(&set.id).await.unwrap().unwrap().cover_key,
            CoverKey::Set("covers/dune.jpg".to_string())
        );
    }

    #[tokio::test]
    async fn test_update_book_outcomes() {
        let store = test_store();
        let dune = sample_book(DocId::generate());
        store.insert_book(&dune).await.unwrap();

        let patch = BookPatch {
            title: Some("Dune Messiah".to_string()),
            ..Default::default()
        };
        assert_eq!(
            store.update_book(&dune.id, &patch).await.unwrap(),
            UpdateOutcome::Updated
        );
        assert_eq!(
            store.update_book(&dune.id, &patch).await.unwrap(),
            UpdateOutcome::Unchanged
        );
        assert_eq!(
            store.update_book(&DocId::generate(), &patch).await.unwrap(),
            UpdateOutcome::Missing
        );

        let fetched = store.get_book(&dune.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Dune Messiah");
    }

    #[tokio::test]
    async fn test_clear_cover_persists_as_explicit_null() {
        let store = test_store();
        let mut dune = sample_book(DocId::generate());
        dune.cover_key = CoverKey::Set("covers/old.jpg".to_string());
        store.insert_book(&dune).await.unwrap();

        let patch = BookPatch {
            cover: CoverKeyChange::Clear,
            ..Default::default()
        };
        assert_eq!(
            store.update_book(&dune.id, &patch).await.unwrap(),
            UpdateOutcome::Updated
        );
        assert_eq!(
            store.get_book(&dune.id).await.unwrap().unwrap().cover_key,
            CoverKey::Cleared
        );
    }

    #[tokio::test]
    async fn test_delete_book() {
        let store = test_store();
        let dune = sample_book(DocId::generate());
        store.insert_book(&dune).await.unwrap();

        assert!(store.delete_book(&dune.id).await.unwrap());
        assert!(!store.delete_book(&dune.id).await.unwrap());
        assert!(store.get_book(&dune.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_books_ordered_by_id() {
        let store = test_store();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let book = sample_book(DocId::generate());
            ids.push(book.id);
            store.insert_book(&book).await.unwrap();
        }
        ids.sort();
        let listed: Vec<DocId> = store
            .list_books()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(listed, ids);
    }
}
